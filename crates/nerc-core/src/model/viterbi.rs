//! # Viterbi Decoding
//!
//! Finds the highest-scoring tag sequence given per-token emission scores,
//! a transition matrix and BIO validity masks.

use crate::bio::TagScheme;
use crate::error::{NercError, Result};

/// Viterbi decoder with hard BIO constraints.
#[derive(Debug, Clone)]
pub struct ViterbiDecoder {
    num_tags: usize,
    start_mask: Vec<bool>,
    valid_transitions: Vec<Vec<bool>>,
}

impl ViterbiDecoder {
    /// Create a decoder for the given tag scheme.
    pub fn new(scheme: &TagScheme) -> Self {
        Self {
            num_tags: scheme.len(),
            start_mask: scheme.start_mask(),
            valid_transitions: scheme.transition_mask(),
        }
    }

    /// Returns the best allowed tag path for a sentence.
    ///
    /// `emissions` holds one row of tag scores per token; `transitions` is
    /// indexed `[prev][curr]`. Equal scores resolve to the lower tag index.
    pub fn decode(&self, emissions: &[Vec<f32>], transitions: &[Vec<f32>]) -> Result<Vec<usize>> {
        let n = self.num_tags;
        if emissions.iter().any(|row| row.len() != n)
            || transitions.len() != n
            || transitions.iter().any(|row| row.len() != n)
        {
            return Err(NercError::Model(format!(
                "score dimension mismatch: expected {n} tags"
            )));
        }
        let Some((first, rest)) = emissions.split_first() else {
            return Ok(Vec::new());
        };

        let mut scores: Vec<f32> = first
            .iter()
            .zip(&self.start_mask)
            .map(|(&e, &allowed)| if allowed { e } else { f32::NEG_INFINITY })
            .collect();
        let mut history: Vec<Vec<usize>> = Vec::with_capacity(rest.len());

        for row in rest {
            let mut next = vec![f32::NEG_INFINITY; n];
            let mut from = vec![0; n];
            for curr in 0..n {
                let best = (0..n)
                    .filter(|&prev| self.valid_transitions[prev][curr])
                    .map(|prev| (prev, scores[prev] + transitions[prev][curr]))
                    .fold(None, |acc: Option<(usize, f32)>, cand| match acc {
                        Some(a) if a.1 >= cand.1 => Some(a),
                        _ => Some(cand),
                    });
                if let Some((prev, score)) = best {
                    next[curr] = score + row[curr];
                    from[curr] = prev;
                }
            }
            scores = next;
            history.push(from);
        }

        let mut tag = argmax(&scores);
        let mut path = Vec::with_capacity(emissions.len());
        path.push(tag);
        for from in history.iter().rev() {
            tag = from[tag];
            path.push(tag);
        }
        path.reverse();
        Ok(path)
    }
}

fn argmax(scores: &[f32]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &s)| if s > best.1 { (i, s) } else { best })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::BioTag;

    fn scheme() -> TagScheme {
        TagScheme::new(&["PER"])
    }

    fn zero_transitions(n: usize) -> Vec<Vec<f32>> {
        vec![vec![0.0; n]; n]
    }

    #[test]
    fn test_decodes_entity_then_outside() {
        let scheme = scheme();
        let decoder = ViterbiDecoder::new(&scheme);
        let b = scheme.index(&BioTag::Begin("PER".into())).unwrap();
        let i = scheme.index(&BioTag::Inside("PER".into())).unwrap();

        // O, B-PER, I-PER
        let emissions = vec![vec![0.0, 2.0, 0.0], vec![0.0, 0.0, 2.0], vec![1.0, 0.0, 0.0]];
        let path = decoder.decode(&emissions, &zero_transitions(3)).unwrap();
        assert_eq!(path, vec![b, i, scheme.outside()]);
    }

    #[test]
    fn test_inside_never_starts_a_sequence() {
        let scheme = scheme();
        let decoder = ViterbiDecoder::new(&scheme);
        let emissions = vec![vec![0.0, 0.0, 5.0]];
        let path = decoder.decode(&emissions, &zero_transitions(3)).unwrap();
        assert_ne!(scheme.tag(path[0]), Some(&BioTag::Inside("PER".into())));
    }

    #[test]
    fn test_inside_never_follows_outside() {
        let scheme = scheme();
        let decoder = ViterbiDecoder::new(&scheme);
        let emissions = vec![vec![3.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]];
        let path = decoder.decode(&emissions, &zero_transitions(3)).unwrap();
        assert!(!(path[0] == scheme.outside() && path[1] == 2));
    }

    #[test]
    fn test_empty_sentence() {
        let decoder = ViterbiDecoder::new(&scheme());
        let result = decoder.decode(&[], &zero_transitions(3)).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let decoder = ViterbiDecoder::new(&scheme());
        assert!(decoder.decode(&[vec![0.0; 2]], &zero_transitions(3)).is_err());
    }
}
