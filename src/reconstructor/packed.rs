// src/reconstructor/packed.rs

use crate::error::RecordError;

/// Default label of the token that closes an entity's packed run.
pub const DEFAULT_SENTINEL: &str = "Other";

/// One `"<category> (<value>)"` token from the packed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedToken {
    pub category: String,
    pub value: String,
}

impl PackedToken {
    /// Splits off the trailing parenthesized value; the words before it,
    /// joined by single spaces, are the category.
    pub fn parse(raw: &str, cursor: usize) -> Result<Self, RecordError> {
        let invalid = || RecordError::InvalidPackedToken {
            cursor,
            token: raw.to_string(),
        };

        let mut words: Vec<&str> = raw.split_whitespace().collect();
        let last = words.pop().ok_or_else(invalid)?;
        let value = last
            .strip_prefix('(')
            .and_then(|v| v.strip_suffix(')'))
            .ok_or_else(invalid)?;

        if words.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            category: words.join(" "),
            value: value.to_string(),
        })
    }
}

/// Walks the packed field one entity at a time.
///
/// The cursor lives in the scanner, so every `reconstruct` call starts from
/// a fresh one and nothing carries over between pages.
pub struct RunScanner<'a> {
    tokens: &'a [String],
    sentinel: &'a str,
    cursor: usize,
}

impl<'a> RunScanner<'a> {
    pub fn new(tokens: &'a [String], sentinel: &'a str) -> Self {
        Self { tokens, sentinel, cursor: 0 }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Consumes the run belonging to `entity`, including its sentinel token.
    pub fn next_run(&mut self, entity: usize) -> Result<Vec<PackedToken>, RecordError> {
        let mut run = Vec::new();
        loop {
            let raw = self.tokens.get(self.cursor).ok_or(RecordError::MalformedPackedRun {
                entity,
                cursor: self.cursor,
            })?;
            let token = PackedToken::parse(raw, self.cursor)?;
            self.cursor += 1;

            let done = token.category == self.sentinel;
            run.push(token);
            if done {
                return Ok(run);
            }
        }
    }

    /// Fails if tokens remain after the last entity's run.
    pub fn finish(self) -> Result<(), RecordError> {
        let remaining = self.tokens.len() - self.cursor;
        if remaining > 0 {
            return Err(RecordError::TrailingPackedTokens {
                cursor: self.cursor,
                remaining,
            });
        }
        Ok(())
    }
}
