//! Entity count aggregation and the plain-text report.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::Result;
use crate::types::EntitySpan;

/// Occurrence counter that remembers first-seen order, so equal counts
/// rank in the order they were first met.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    pub fn get(&self, key: &str) -> usize {
        self.index.get(key).map_or(0, |&pos| self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of occurrences.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    /// Keys by descending count, ties in first-seen order, at most `n` of them.
    pub fn most_common(&self, n: Option<usize>) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .entries
            .iter()
            .map(|(k, count)| (k.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        if let Some(n) = n {
            ranked.truncate(n);
        }
        ranked
    }
}

/// Entity counts for one analyzed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityReport {
    by_type: Tally,
    by_surface: Vec<(String, Tally)>,
}

impl EntityReport {
    /// Counts `spans` by label and, per label, by surface text.
    pub fn from_spans(text: &str, spans: &[EntitySpan]) -> Result<Self> {
        let mut report = Self::default();
        for span in spans {
            let surface = span.surface(text)?;
            report.by_type.add(&span.label);
            match report.by_surface.iter_mut().find(|(l, _)| *l == span.label) {
                Some((_, tally)) => tally.add(surface),
                None => {
                    let mut tally = Tally::new();
                    tally.add(surface);
                    report.by_surface.push((span.label.clone(), tally));
                }
            }
        }
        Ok(report)
    }

    pub fn type_counts(&self) -> &Tally {
        &self.by_type
    }

    /// Surface counts for one label. Not limited by any top-N.
    pub fn surface_counts(&self, label: &str) -> Option<&Tally> {
        self.by_surface
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, tally)| tally)
    }

    /// Labels in first-seen order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.by_surface.iter().map(|(l, _)| l.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Renders the two report sections, listing at most `top_n` surfaces per
    /// entity type.
    pub fn render(&self, top_n: usize) -> String {
        let mut out = format!(
            "==========\nEntity types:\t{}\n",
            format_counts(&self.by_type.most_common(None))
        );
        out.push_str("==========\nEntities found by type:\n");
        for (label, tally) in &self.by_surface {
            let _ = writeln!(
                out,
                "{label:<10} =>\t{}",
                format_counts(&tally.most_common(Some(top_n)))
            );
        }
        out
    }
}

/// `[('PER', 3), ('LOC', 1)]`, the list-of-pairs notation used in reports.
fn format_counts(counts: &[(&str, usize)]) -> String {
    let items: Vec<String> = counts
        .iter()
        .map(|(key, n)| format!("({}, {n})", quote(key)))
        .collect();
    format!("[{}]", items.join(", "))
}

// Single quotes unless the text holds a single quote and no double quote.
fn quote(text: &str) -> String {
    let delim = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(delim);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}
