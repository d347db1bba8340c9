// src/reconstructor/rename.rs

use std::collections::{HashMap, HashSet};

use super::RawFieldTable;
use crate::error::RecordError;

/// Maps selector-derived field names onto the caller's vocabulary.
#[derive(Debug, Clone)]
pub struct FieldRenamer {
    mapping: HashMap<String, String>,
    strict: bool,
}

impl FieldRenamer {
    /// A strict renamer: every field in the table must have a mapping.
    pub fn new(mapping: HashMap<String, String>) -> Self {
        Self { mapping, strict: true }
    }

    /// With `strict` off, unmapped names pass through unchanged.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// The name `field` ends up under, if any.
    pub fn target<'a>(&'a self, field: &'a str) -> Option<&'a str> {
        match self.mapping.get(field) {
            Some(name) => Some(name.as_str()),
            None if !self.strict => Some(field),
            None => None,
        }
    }

    pub fn apply(&self, table: RawFieldTable) -> Result<RawFieldTable, RecordError> {
        let mut seen = HashSet::with_capacity(table.len());
        let mut renamed = RawFieldTable::new();

        for (name, values) in table {
            let target = self
                .target(&name)
                .ok_or_else(|| RecordError::UnknownField { field: name.clone() })?
                .to_string();
            if !seen.insert(target.clone()) {
                return Err(RecordError::DuplicateField { field: target });
            }
            renamed.insert(target, values);
        }
        Ok(renamed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renamer() -> FieldRenamer {
        FieldRenamer::new(HashMap::from([
            (".artistTitle".to_string(), "Artist Title".to_string()),
            (".albumTitle".to_string(), "Album Title".to_string()),
        ]))
    }

    fn table(names: &[&str]) -> RawFieldTable {
        names.iter().map(|n| (*n, vec!["x".to_string()])).collect()
    }

    #[test]
    fn renames_and_keeps_order() {
        let out = renamer().apply(table(&[".albumTitle", ".artistTitle"])).unwrap();
        let names: Vec<_> = out.names().collect();
        assert_eq!(names, vec!["Album Title", "Artist Title"]);
    }

    #[test]
    fn strict_mode_rejects_unmapped_name() {
        let err = renamer().apply(table(&[".albumTitle", ".summaryPoints"])).unwrap_err();
        assert_eq!(err, RecordError::UnknownField { field: ".summaryPoints".into() });
    }

    #[test]
    fn lenient_mode_passes_unmapped_name_through() {
        let out = renamer()
            .strict(false)
            .apply(table(&[".albumTitle", ".summaryPoints"]))
            .unwrap();
        let names: Vec<_> = out.names().collect();
        assert_eq!(names, vec!["Album Title", ".summaryPoints"]);
    }

    #[test]
    fn two_fields_onto_one_name_is_an_error() {
        let err = renamer()
            .strict(false)
            .apply(table(&[".albumTitle", "Album Title"]))
            .unwrap_err();
        assert_eq!(err, RecordError::DuplicateField { field: "Album Title".into() });
    }
}
