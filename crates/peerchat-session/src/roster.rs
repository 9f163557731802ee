//! The list of peers currently present.

/// Ordered display names, replaced wholesale on every lobby update.
///
/// The server always sends the full list. [`Roster::replace`] compares it
/// with the current one so the UI is only redrawn when something actually
/// changed. Order counts: the same names in a different order is a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the list. Returns `true` if it differs from the old one.
    pub fn replace(&mut self, names: Vec<String>) -> bool {
        if self.names == names {
            return false;
        }
        self.names = names;
        true
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_update_is_a_change() {
        let mut roster = Roster::new();
        assert!(roster.replace(names(&["a", "b"])));
        assert_eq!(roster.names(), &["a", "b"]);
    }

    #[test]
    fn test_identical_update_is_not_a_change() {
        let mut roster = Roster::new();
        roster.replace(names(&["a", "b"]));
        assert!(!roster.replace(names(&["a", "b"])));
    }

    #[test]
    fn test_reorder_is_a_change() {
        let mut roster = Roster::new();
        roster.replace(names(&["a", "b"]));
        assert!(roster.replace(names(&["b", "a"])));
        assert_eq!(roster.names(), &["b", "a"]);
    }

    #[test]
    fn test_empty_update_on_empty_roster() {
        let mut roster = Roster::new();
        assert!(!roster.replace(Vec::new()));
        assert!(roster.is_empty());
    }
}
