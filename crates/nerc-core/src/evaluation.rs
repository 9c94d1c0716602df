//! # Entity-Level Evaluation
//!
//! Micro-averaged precision / recall / F-score over `"<surface>_<label>"`
//! keys. Counts are pooled across all instances before the ratios are taken.
//! Identical mentions within one instance collapse into one key.

use std::collections::HashSet;
use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::NerModel;
use crate::types::{EntitySpan, TrainingInstance};

/// True positive / false positive / false negative counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl AddAssign for MatchCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.true_positives += rhs.true_positives;
        self.false_positives += rhs.false_positives;
        self.false_negatives += rhs.false_negatives;
    }
}

/// Precision, recall and F-score, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationScores {
    pub precision: f64,
    pub recall: f64,
    pub fscore: f64,
}

impl EvaluationScores {
    /// Computes the metrics; every zero denominator yields `0.0`.
    #[must_use]
    pub fn from_counts(counts: MatchCounts) -> Self {
        let tp = counts.true_positives as f64;
        let precision = ratio(tp, tp + counts.false_positives as f64);
        let recall = ratio(tp, tp + counts.false_negatives as f64);
        let fscore = ratio(2.0 * precision * recall, precision + recall);
        Self {
            precision,
            recall,
            fscore,
        }
    }

    /// Named scores in reporting order.
    pub fn list_scores(&self) -> [(&'static str, f64); 3] {
        [
            ("precision", self.precision),
            ("recall", self.recall),
            ("fscore", self.fscore),
        ]
    }
}

impl fmt::Display for EvaluationScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .list_scores()
            .iter()
            .map(|(name, value)| format!("{}:{value:.4}", name.to_uppercase()))
            .collect();
        f.write_str(&parts.join(" "))
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

/// Keys `"<surface>_<label>"` for the spans of one text.
///
/// # Errors
///
/// Returns `NercError::InvalidSpan` if a span does not slice `text`.
pub fn span_keys(text: &str, spans: &[EntitySpan]) -> Result<HashSet<String>> {
    spans
        .iter()
        .map(|span| -> Result<String> { Ok(format!("{}_{}", span.surface(text)?, span.label)) })
        .collect()
}

/// Compares predicted keys against gold keys.
pub fn compare(predicted: &HashSet<String>, gold: &HashSet<String>) -> MatchCounts {
    let true_positives = predicted.intersection(gold).count();
    MatchCounts {
        true_positives,
        false_positives: predicted.len() - true_positives,
        false_negatives: gold.len() - true_positives,
    }
}

/// Pools match counts over all instances using `predict` for each text.
pub fn count_matches<F>(instances: &[TrainingInstance], mut predict: F) -> Result<MatchCounts>
where
    F: FnMut(&str) -> Result<Vec<EntitySpan>>,
{
    let mut total = MatchCounts::default();
    for instance in instances {
        let predictions = predict(&instance.text)?;
        let predicted = span_keys(&instance.text, &predictions)?;
        let gold = span_keys(&instance.text, &instance.entities)?;
        total += compare(&predicted, &gold);
    }
    Ok(total)
}

/// Evaluates an arbitrary prediction function against gold instances.
pub fn evaluate_with<F>(instances: &[TrainingInstance], predict: F) -> Result<EvaluationScores>
where
    F: FnMut(&str) -> Result<Vec<EntitySpan>>,
{
    count_matches(instances, predict).map(EvaluationScores::from_counts)
}

/// Evaluates a model in its current state against gold instances.
pub fn evaluate<M: NerModel + ?Sized>(
    instances: &[TrainingInstance],
    model: &M,
) -> Result<EvaluationScores> {
    evaluate_with(instances, |text| model.predict(text))
}
