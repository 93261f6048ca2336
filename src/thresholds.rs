//! Per-step threshold assignment.
//!
//! A single CLI value configures thresholds for all steps: a comma separated
//! list is assigned positionally to the lexically sorted step names, a plain
//! value applies to every step.

use std::collections::HashMap;

/// Maps step names to threshold range specs. Specs are kept as strings and
/// evaluated later by [`crate::range::check_levels`].
#[derive(Debug, Default)]
pub struct ThresholdTable {
    specs: HashMap<String, String>,
}

impl ThresholdTable {
    /// Builds the table from the raw CLI value and the ordered step names.
    ///
    /// A value containing commas is split preserving empty fields and zipped
    /// positionally against `ordered_names`; names beyond the list and empty
    /// fields get no threshold. A value without a comma is broadcast to every
    /// name. An empty or missing value yields an empty table.
    pub fn build(raw: Option<&str>, ordered_names: &[String]) -> Self {
        let mut specs = HashMap::new();

        let raw = match raw.map(str::trim) {
            Some(r) if !r.is_empty() => r,
            _ => return Self { specs },
        };

        if raw.contains(',') {
            for (name, field) in ordered_names.iter().zip(raw.split(',')) {
                if !field.is_empty() {
                    specs.insert(name.clone(), field.to_string());
                }
            }
        } else {
            for name in ordered_names {
                specs.insert(name.clone(), raw.to_string());
            }
        }

        Self { specs }
    }

    /// Returns the threshold spec for a step, if one is assigned.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.specs.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_comma_list_assigns_positionally() {
        let names = names(&["00 - y", "01 - z", "03 - x"]);
        let table = ThresholdTable::build(Some("1,2,3"), &names);
        assert_eq!(table.get("00 - y"), Some("1"));
        assert_eq!(table.get("01 - z"), Some("2"));
        assert_eq!(table.get("03 - x"), Some("3"));
    }

    #[test]
    fn test_missing_trailing_entries_get_no_threshold() {
        let names = names(&["a", "b", "c"]);
        let table = ThresholdTable::build(Some("1,2"), &names);
        assert_eq!(table.get("a"), Some("1"));
        assert_eq!(table.get("b"), Some("2"));
        assert_eq!(table.get("c"), None);
    }

    #[test]
    fn test_empty_fields_get_no_threshold() {
        let names = names(&["a", "b", "c"]);
        let table = ThresholdTable::build(Some("1,,3"), &names);
        assert_eq!(table.get("a"), Some("1"));
        assert_eq!(table.get("b"), None);
        assert_eq!(table.get("c"), Some("3"));
    }

    #[test]
    fn test_single_value_broadcasts() {
        let names = names(&["a", "b", "c"]);
        let table = ThresholdTable::build(Some("0.5:2"), &names);
        assert_eq!(table.get("a"), Some("0.5:2"));
        assert_eq!(table.get("b"), Some("0.5:2"));
        assert_eq!(table.get("c"), Some("0.5:2"));
    }

    #[test]
    fn test_empty_value_means_no_thresholds() {
        let names = names(&["a", "b"]);
        assert_eq!(ThresholdTable::build(None, &names).get("a"), None);
        assert_eq!(ThresholdTable::build(Some(""), &names).get("a"), None);
        assert_eq!(ThresholdTable::build(Some("  "), &names).get("b"), None);
    }

    #[test]
    fn test_unknown_name() {
        let table = ThresholdTable::build(Some("1"), &names(&["a"]));
        assert_eq!(table.get("nope"), None);
    }
}
