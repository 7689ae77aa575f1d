//! Pin label registry.
//!
//! Maps a logical pin number to the human-readable name of the device wired
//! to it. Populated while devices are constructed at startup, read-only
//! afterwards; used only to render change-log notices.

use std::collections::BTreeMap;

/// Registry of pin display labels.
///
/// Labels are never removed. Registering a second label for the same pin
/// replaces the first, which covers the occasional shared/placeholder pin
/// in the installation table.
#[derive(Debug, Default, Clone)]
pub struct PinNames {
    labels: BTreeMap<u8, String>,
}

impl PinNames {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a label for a pin.
    pub fn register(&mut self, pin: u8, label: impl Into<String>) {
        self.labels.insert(pin, label.into());
    }

    /// Look up the label of a pin.
    pub fn get(&self, pin: u8) -> Option<&str> {
        self.labels.get(&pin).map(String::as_str)
    }

    /// Number of labelled pins.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no pins are labelled.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate labels in ascending pin order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.labels.iter().map(|(&pin, label)| (pin, label.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut names = PinNames::new();
        names.register(9, "podjazd_led");
        names.register(12, "dzwonek");

        assert_eq!(names.get(9), Some("podjazd_led"));
        assert_eq!(names.get(10), None);
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_reregister_replaces() {
        let mut names = PinNames::new();
        names.register(0, "front_led");
        names.register(0, "wiata_przycisk");
        assert_eq!(names.get(0), Some("wiata_przycisk"));
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_iter_sorted() {
        let mut names = PinNames::new();
        names.register(12, "dzwonek");
        names.register(1, "poddasze_led");
        let pins: Vec<u8> = names.iter().map(|(pin, _)| pin).collect();
        assert_eq!(pins, vec![1, 12]);
    }
}
