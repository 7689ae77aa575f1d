//! Named command dispatch.
//!
//! Maps case-sensitive command names to handlers taking one argument
//! string. Incoming event text is `name` or `name=argument`; the split
//! happens on the first `=`. Unknown names are silently ignored: the
//! router is driven by free-text automation rules that may reference
//! commands that do not exist yet, and that must not be an error.
//!
//! Handlers operate on a target value passed to [`Router::dispatch`], so
//! the table itself stays immutable after startup.

use std::collections::HashMap;

/// Boxed command handler.
pub type Handler<T> = Box<dyn Fn(&mut T, &str)>;

/// Command-name to handler table.
pub struct Router<T> {
    handlers: HashMap<String, Handler<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under a command name. Re-registering a name
    /// replaces the previous handler.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&mut T, &str) + 'static,
    ) {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    /// Whether a command name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Decompose `event` on the first `=` and invoke the matching handler.
    /// Returns whether a handler ran; unknown names return `false` without
    /// logging.
    pub fn dispatch(&self, target: &mut T, event: &str) -> bool {
        let (name, arg) = match event.split_once('=') {
            Some((name, arg)) => (name, arg),
            None => (event, ""),
        };
        match self.handlers.get(name) {
            Some(handler) => {
                handler(target, arg);
                true
            }
            None => false,
        }
    }
}

impl<T> std::fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Router").field("commands", &names).finish()
    }
}
