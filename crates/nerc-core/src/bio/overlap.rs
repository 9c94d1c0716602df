//! Removal of overlapping entity spans within an instance.

use std::fmt;
use std::str::FromStr;

use crate::error::NercError;
use crate::types::{EntitySpan, TrainingInstance};

/// Strategy for dropping overlapping entities.
///
/// Both strategies assume entities are ordered by start offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Keeps `entities[i]` only when it ends strictly before `entities[i + 1]`
    /// starts. The last entity is never kept, so instances with fewer than
    /// two entities end up with none.
    #[default]
    Legacy,
    /// Keeps an entity when it starts at or after the end of the last kept one.
    KeepFirst,
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::KeepFirst => write!(f, "keep-first"),
        }
    }
}

impl FromStr for OverlapPolicy {
    type Err = NercError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Self::Legacy),
            "keep-first" => Ok(Self::KeepFirst),
            other => Err(NercError::Configuration(format!(
                "unknown overlap policy {other:?}, use legacy or keep-first"
            ))),
        }
    }
}

/// Filters one instance's entity list.
pub fn resolve_entities(entities: &[EntitySpan], policy: OverlapPolicy) -> Vec<EntitySpan> {
    match policy {
        OverlapPolicy::Legacy => entities
            .windows(2)
            .filter(|pair| pair[0].end < pair[1].start)
            .map(|pair| pair[0].clone())
            .collect(),
        OverlapPolicy::KeepFirst => {
            let mut kept: Vec<EntitySpan> = Vec::with_capacity(entities.len());
            for entity in entities {
                if kept.last().is_none_or(|last| entity.start >= last.end) {
                    kept.push(entity.clone());
                }
            }
            kept
        }
    }
}

/// Replaces every instance's entity list with its resolved version.
pub fn resolve_overlaps(instances: &mut [TrainingInstance], policy: OverlapPolicy) {
    for instance in instances.iter_mut() {
        instance.entities = resolve_entities(&instance.entities, policy);
    }
}
