// src/reconstructor/coerce.rs

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::{EntityRecord, FieldValue};
use crate::error::RecordError;

static NUMBER_PATTERN: OnceLock<Regex> = OnceLock::new();

fn number_pattern() -> &'static Regex {
    // Allows one thousands separator, e.g. "1,234" but also "1000+".
    NUMBER_PATTERN.get_or_init(|| Regex::new(r"\d*,?\d+").expect("number pattern is valid"))
}

/// The `index`-th number in `text`, with commas removed.
///
/// `parse_num("1,234 jobs found, page 2", 1)` is `Some(2)`.
pub fn parse_num(text: &str, index: usize) -> Option<i64> {
    number_pattern()
        .find_iter(text)
        .nth(index)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

/// Per-field type coercion applied on top of reconstructed records.
///
/// Reconstruction keeps every value as scraped text; callers opt fields in here.
#[derive(Debug, Clone, Default)]
pub struct ValueCoercion {
    numeric_fields: HashSet<String>,
    first_word_fields: HashSet<String>,
    coerce_packed_values: bool,
}

impl ValueCoercion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn numeric<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn first_word<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.first_word_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn packed_values(mut self, enabled: bool) -> Self {
        self.coerce_packed_values = enabled;
        self
    }

    pub fn is_noop(&self) -> bool {
        self.numeric_fields.is_empty() && self.first_word_fields.is_empty() && !self.coerce_packed_values
    }

    /// Coerces `records` in place. `simple_fields` are the page's one-per-entity
    /// fields; every other text field is taken to come from the packed field.
    pub fn apply(&self, records: &mut [EntityRecord], simple_fields: &[&str]) -> Result<(), RecordError> {
        if self.is_noop() {
            return Ok(());
        }
        for record in records.iter_mut() {
            self.apply_one(record, simple_fields)?;
        }
        Ok(())
    }

    fn apply_one(&self, record: &mut EntityRecord, simple_fields: &[&str]) -> Result<(), RecordError> {
        for (name, value) in record.iter_mut() {
            let FieldValue::Text(text) = value else { continue };

            if self.first_word_fields.contains(name) {
                let first = text.split_whitespace().next().unwrap_or_default().to_string();
                *text = first;
            }

            let from_packed = !simple_fields.contains(&name);
            if self.numeric_fields.contains(name) || (self.coerce_packed_values && from_packed) {
                let number = parse_num(text, 0).ok_or_else(|| RecordError::NotNumeric {
                    field: name.to_string(),
                    value: text.clone(),
                })?;
                *value = FieldValue::Number(number);
            }
        }
        Ok(())
    }
}
