//! # BIO Dataset Conversion
//!
//! Reads line-oriented `token<whitespace>tag` data (blank line = sentence
//! boundary) into [`TrainingInstance`]s whose entity spans are byte offsets
//! into the space-joined token text.

use regex::Regex;
use tracing::debug;

use crate::bio::tags::BioTag;
use crate::error::{NercError, Result};
use crate::types::{EntitySpan, TrainingInstance};

/// Entity being accumulated while its tokens are read.
#[derive(Debug)]
struct OpenEntity {
    text: String,
    label: String,
    start: usize,
}

impl OpenEntity {
    fn into_span(self) -> EntitySpan {
        EntitySpan::new(self.start, self.start + self.text.len(), self.label)
    }
}

/// Accumulators for the sentence currently being read.
#[derive(Debug, Default)]
struct InstanceBuilder {
    text: String,
    entities: Vec<EntitySpan>,
    open: Option<OpenEntity>,
}

impl InstanceBuilder {
    fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    fn close_open(&mut self) {
        if let Some(open) = self.open.take() {
            self.entities.push(open.into_span());
        }
    }

    /// Emits the instance and resets. An entity still open is discarded.
    fn finish(&mut self) -> TrainingInstance {
        let builder = std::mem::take(self);
        if let Some(open) = builder.open {
            debug!(entity = %open.text, label = %open.label, "discarding unterminated entity");
        }
        TrainingInstance::new(builder.text.trim_end(), builder.entities)
    }
}

/// Converter from BIO-tagged lines to training instances.
pub struct BioConverter {
    re_line: Regex,
}

impl BioConverter {
    /// Constructs a new converter with its pre-compiled line pattern.
    ///
    /// # Errors
    ///
    /// Returns `NercError::RegexError` if the pattern fails to compile
    /// (should never happen with the static pattern defined here).
    pub fn new() -> Result<Self> {
        Ok(Self {
            re_line: Regex::new(r"^(.*\S)\s+([-\w]+)$")?,
        })
    }

    /// Splits a trimmed, non-empty line into `(token, tag)` on its last
    /// whitespace run.
    pub fn split_line<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = self.re_line.captures(line)?;
        Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    }

    /// Converts dataset lines into training instances.
    ///
    /// Blank lines end a sentence; consecutive blank lines count as one.
    /// Lines without a whitespace separator are skipped. The last sentence
    /// is emitted even without a trailing blank line.
    ///
    /// # Errors
    ///
    /// Returns `NercError::MalformedTag` on the first tag outside the
    /// `O` / `B-*` / `I-*` vocabulary; no partial result is returned.
    pub fn convert<I, S>(&self, lines: I) -> Result<Vec<TrainingInstance>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut instances = Vec::new();
        let mut builder = InstanceBuilder::default();

        for (idx, line) in lines.into_iter().enumerate() {
            let line = line.as_ref().trim();

            if line.is_empty() {
                if builder.has_text() {
                    instances.push(builder.finish());
                }
                continue;
            }
            if !line.contains(char::is_whitespace) {
                continue;
            }

            let (token, raw_tag) = self.split_line(line).ok_or_else(|| NercError::MalformedTag {
                line: idx + 1,
                tag: line
                    .rsplit(char::is_whitespace)
                    .next()
                    .unwrap_or_default()
                    .to_string(),
            })?;

            let offset = builder.text.len();
            builder.text.push_str(token);
            builder.text.push(' ');

            match BioTag::parse(raw_tag) {
                Some(BioTag::Begin(label)) => {
                    builder.close_open();
                    builder.open = Some(OpenEntity {
                        text: token.to_string(),
                        label,
                        start: offset,
                    });
                }
                Some(BioTag::Inside(_)) => {
                    // The continuation is assumed to match the open entity.
                    if let Some(open) = builder.open.as_mut() {
                        open.text.push(' ');
                        open.text.push_str(token);
                    }
                }
                Some(BioTag::Outside) => builder.close_open(),
                None => {
                    return Err(NercError::MalformedTag {
                        line: idx + 1,
                        tag: raw_tag.to_string(),
                    });
                }
            }
        }

        if builder.has_text() {
            instances.push(builder.finish());
        }

        debug!(instances = instances.len(), "converted BIO lines");
        Ok(instances)
    }
}

/// Rebuilds plain sentences from CoNLL-style lines: the first column of each
/// line, space-joined, one sentence per blank-line-delimited block.
pub fn conll_to_plain_text<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sentences = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in lines {
        let line = line.as_ref();
        match line.split_whitespace().next() {
            Some(token) => current.push(token.to_string()),
            None => {
                if !current.is_empty() {
                    sentences.push(current.join(" "));
                    current.clear();
                }
            }
        }
    }
    if !current.is_empty() {
        sentences.push(current.join(" "));
    }
    sentences
}
