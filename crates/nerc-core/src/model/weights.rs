//! Averaged perceptron weight store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-feature weight rows with lazily maintained running totals for
/// weight averaging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AveragedWeights {
    num_tags: usize,
    weights: HashMap<String, Vec<f32>>,
    #[serde(skip)]
    totals: HashMap<String, Vec<f32>>,
    #[serde(skip)]
    stamps: HashMap<String, Vec<u64>>,
    #[serde(skip)]
    clock: u64,
}

impl AveragedWeights {
    pub fn new(num_tags: usize) -> Self {
        Self {
            num_tags,
            ..Default::default()
        }
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    /// Number of features with a weight row.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight row of a feature, if it has ever been updated.
    pub fn row(&self, feature: &str) -> Option<&[f32]> {
        self.weights.get(feature).map(Vec::as_slice)
    }

    /// Adds the rows of `features` into `scores`.
    pub fn score_into<'f>(&self, features: impl IntoIterator<Item = &'f str>, scores: &mut [f32]) {
        for feature in features {
            if let Some(row) = self.weights.get(feature) {
                for (score, w) in scores.iter_mut().zip(row) {
                    *score += w;
                }
            }
        }
    }

    /// Advances the averaging clock by one training example.
    pub fn tick(&mut self) {
        self.clock += 1;
    }

    /// Adds `delta` to the weight of `feature` for `tag`.
    pub fn update(&mut self, feature: &str, tag: usize, delta: f32) {
        let n = self.num_tags;
        let clock = self.clock;
        let row = self
            .weights
            .entry(feature.to_string())
            .or_insert_with(|| vec![0.0; n]);
        let totals = self
            .totals
            .entry(feature.to_string())
            .or_insert_with(|| vec![0.0; n]);
        let stamps = self
            .stamps
            .entry(feature.to_string())
            .or_insert_with(|| vec![0; n]);

        totals[tag] += (clock - stamps[tag]) as f32 * row[tag];
        stamps[tag] = clock;
        row[tag] += delta;
    }

    /// Weights averaged over every tick seen so far.
    ///
    /// Returns a plain copy of the current weights when no tick happened.
    #[must_use]
    pub fn averaged(&self) -> Self {
        if self.clock == 0 {
            return Self {
                num_tags: self.num_tags,
                weights: self.weights.clone(),
                ..Default::default()
            };
        }
        let clock = self.clock as f32;
        let weights = self
            .weights
            .iter()
            .map(|(feature, row)| {
                let totals = self.totals.get(feature);
                let stamps = self.stamps.get(feature);
                let avg = row
                    .iter()
                    .enumerate()
                    .map(|(tag, w)| {
                        let total = totals.map_or(0.0, |t| t[tag]);
                        let stamp = stamps.map_or(0, |s| s[tag]);
                        (total + (self.clock - stamp) as f32 * w) / clock
                    })
                    .collect();
                (feature.clone(), avg)
            })
            .collect();
        Self {
            num_tags: self.num_tags,
            weights,
            ..Default::default()
        }
    }
}
