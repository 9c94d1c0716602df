use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NercError, Result};

/// A labelled half-open byte interval `[start, end)` into an instance's text.
///
/// Offsets are UTF-8 byte offsets and always fall on character boundaries
/// of the text they were produced for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

impl EntitySpan {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Slices the surface text of this span out of `text`.
    ///
    /// # Errors
    ///
    /// Returns `NercError::InvalidSpan` if the span is empty, out of bounds or
    /// not on character boundaries.
    pub fn surface<'t>(&self, text: &'t str) -> Result<&'t str> {
        if self.is_empty() {
            return Err(self.invalid(text));
        }
        text.get(self.start..self.end)
            .ok_or_else(|| self.invalid(text))
    }

    fn invalid(&self, text: &str) -> NercError {
        NercError::InvalidSpan {
            start: self.start,
            end: self.end,
            len: text.len(),
        }
    }
}

impl fmt::Display for EntitySpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {:?})", self.start, self.end, self.label)
    }
}

/// A training instance: reconstructed sentence text plus its entity spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingInstance {
    pub text: String,
    pub entities: Vec<EntitySpan>,
}

impl TrainingInstance {
    pub fn new(text: impl Into<String>, entities: Vec<EntitySpan>) -> Self {
        Self {
            text: text.into(),
            entities,
        }
    }

    /// Checks `0 <= start < end <= len(text)` for every entity.
    pub fn validate(&self) -> Result<()> {
        for entity in &self.entities {
            entity.surface(&self.text)?;
        }
        Ok(())
    }

    /// Distinct entity labels of this instance.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.label.as_str())
    }
}

/// Collects the sorted, de-duplicated label inventory of a dataset.
pub fn collect_labels(instances: &[TrainingInstance]) -> Vec<String> {
    instances
        .iter()
        .flat_map(TrainingInstance::labels)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
