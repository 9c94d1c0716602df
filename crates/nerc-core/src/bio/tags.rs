//! # BIO Tags for Named Entity Recognition
//!
//! Defines the open tag set used by datasets and by the bundled tagger.
//! Uses the BIO (Begin-Inside-Outside) tagging scheme with free-form labels.

use std::collections::HashMap;
use std::fmt;

use crate::types::EntitySpan;

/// A single BIO tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BioTag {
    /// First token of an entity.
    Begin(String),
    /// Continuation token of an entity.
    Inside(String),
    /// Token outside any entity.
    Outside,
}

impl BioTag {
    /// Parses a dataset tag. An empty tag is read as `O`.
    ///
    /// Returns `None` for anything outside `O`, `B-<LABEL>` and `I-<LABEL>`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "O" {
            return Some(BioTag::Outside);
        }
        if let Some(label) = raw.strip_prefix("B-") {
            return (!label.is_empty()).then(|| BioTag::Begin(label.to_string()));
        }
        if let Some(label) = raw.strip_prefix("I-") {
            return (!label.is_empty()).then(|| BioTag::Inside(label.to_string()));
        }
        None
    }

    /// Check if this is a "Begin" tag.
    pub fn is_begin(&self) -> bool {
        matches!(self, BioTag::Begin(_))
    }

    /// Check if this is an "Inside" tag.
    pub fn is_inside(&self) -> bool {
        matches!(self, BioTag::Inside(_))
    }

    /// Get the entity label carried by this tag.
    pub fn label(&self) -> Option<&str> {
        match self {
            BioTag::Begin(label) | BioTag::Inside(label) => Some(label),
            BioTag::Outside => None,
        }
    }

    /// Check if transitioning from `from` tag to `to` tag is valid.
    ///
    /// `from == None` is the start of a sequence. An `I-X` may only follow
    /// `B-X` or `I-X`.
    pub fn is_valid_transition(from: Option<&BioTag>, to: &BioTag) -> bool {
        match to {
            BioTag::Inside(label) => match from {
                Some(BioTag::Begin(prev)) | Some(BioTag::Inside(prev)) => prev == label,
                _ => false,
            },
            _ => true,
        }
    }
}

impl fmt::Display for BioTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BioTag::Begin(label) => write!(f, "B-{label}"),
            BioTag::Inside(label) => write!(f, "I-{label}"),
            BioTag::Outside => write!(f, "O"),
        }
    }
}

/// Indexed tag inventory for a label set: `O`, then `B-L`/`I-L` per label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagScheme {
    tags: Vec<BioTag>,
    index: HashMap<BioTag, usize>,
}

impl TagScheme {
    /// Builds the scheme for the given labels, in the given order.
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut tags = vec![BioTag::Outside];
        for label in labels {
            let label = label.as_ref();
            let begin = BioTag::Begin(label.to_string());
            if tags.contains(&begin) {
                continue;
            }
            tags.push(begin);
            tags.push(BioTag::Inside(label.to_string()));
        }
        let index = tags
            .iter()
            .enumerate()
            .map(|(i, tag)| (tag.clone(), i))
            .collect();
        Self { tags, index }
    }

    /// Total number of distinct tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Index of the `O` tag.
    pub fn outside(&self) -> usize {
        0
    }

    /// Get the tag index for a tag.
    pub fn index(&self, tag: &BioTag) -> Option<usize> {
        self.index.get(tag).copied()
    }

    /// Get tag from index.
    pub fn tag(&self, idx: usize) -> Option<&BioTag> {
        self.tags.get(idx)
    }

    /// Labels in scheme order.
    pub fn labels(&self) -> Vec<String> {
        self.tags
            .iter()
            .filter(|t| t.is_begin())
            .filter_map(|t| t.label().map(str::to_string))
            .collect()
    }

    /// Validity mask: `mask[prev][curr]`.
    pub fn transition_mask(&self) -> Vec<Vec<bool>> {
        self.tags
            .iter()
            .map(|prev| {
                self.tags
                    .iter()
                    .map(|curr| BioTag::is_valid_transition(Some(prev), curr))
                    .collect()
            })
            .collect()
    }

    /// Validity of each tag at the start of a sequence.
    pub fn start_mask(&self) -> Vec<bool> {
        self.tags
            .iter()
            .map(|t| BioTag::is_valid_transition(None, t))
            .collect()
    }

    /// Turns a decoded tag sequence over token byte ranges into entity spans.
    ///
    /// `tags` and `offsets` are parallel; a span runs from the start of its
    /// `B-` token to the end of its last `I-` token.
    pub fn decode_spans(&self, tags: &[usize], offsets: &[(usize, usize)]) -> Vec<EntitySpan> {
        let mut spans = Vec::new();
        let mut open: Option<EntitySpan> = None;

        for (&tag_idx, &(start, end)) in tags.iter().zip(offsets) {
            match self.tag(tag_idx) {
                Some(BioTag::Begin(label)) => {
                    spans.extend(open.take());
                    open = Some(EntitySpan::new(start, end, label.clone()));
                }
                Some(BioTag::Inside(label)) => {
                    let continues = open.as_ref().is_some_and(|span| span.label == *label);
                    if continues {
                        if let Some(span) = open.as_mut() {
                            span.end = end;
                        }
                    } else {
                        spans.extend(open.take());
                    }
                }
                _ => {
                    spans.extend(open.take());
                }
            }
        }
        spans.extend(open);
        spans
    }
}
