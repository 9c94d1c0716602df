//! Structured averaged perceptron tagger.
//! Feature-based BIO sequence labelling with constrained Viterbi decoding.
//!
//! This is the bundled, replaceable [`NerModel`] backend. The trainer,
//! evaluator and analysis runner depend only on the trait; any other
//! backend implementing it can be trained and served without changes there.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use oorandom::Rand32;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bio::{BioTag, TagScheme};
use crate::error::{NercError, Result};
use crate::model::NerModel;
use crate::model::tokenizer::{Token, Tokenizer};
use crate::model::viterbi::ViterbiDecoder;
use crate::model::weights::AveragedWeights;
use crate::types::{EntitySpan, Language, TrainingInstance};

pub const META_FILE: &str = "meta.json";
pub const WEIGHTS_FILE: &str = "weights.json";
const FORMAT_VERSION: u32 = 1;

/// Pipeline components of a tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// Splits documents into sentences before tagging.
    Sentencizer,
    /// The entity recognizer itself.
    Ner,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelMeta {
    version: u32,
    lang: Language,
    labels: Vec<String>,
    components: Vec<Component>,
}

/// Seed derived from the system clock.
pub fn entropy_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9E37_79B9_7F4A_7C15)
}

/// BIO tagger trained with the structured perceptron.
pub struct PerceptronTagger {
    lang: Language,
    components: Vec<Component>,
    scheme: TagScheme,
    weights: AveragedWeights,
    decoder: ViterbiDecoder,
    tokenizer: Tokenizer,
    rng: Rand32,
}

impl PerceptronTagger {
    /// A fresh, untrained model with only the `ner` component and no labels.
    pub fn blank(lang: Language) -> Self {
        Self::with_labels(lang, &[] as &[String], vec![Component::Ner], None)
    }

    fn with_labels<S: AsRef<str>>(
        lang: Language,
        labels: &[S],
        components: Vec<Component>,
        weights: Option<AveragedWeights>,
    ) -> Self {
        let scheme = TagScheme::new(labels);
        let weights = weights.unwrap_or_else(|| AveragedWeights::new(scheme.len()));
        Self {
            lang,
            components,
            decoder: ViterbiDecoder::new(&scheme),
            scheme,
            weights,
            tokenizer: Tokenizer::new(),
            rng: Rand32::new(entropy_seed()),
        }
    }

    /// Reseeds the dropout sampler.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Rand32::new(seed);
        self
    }

    /// Loads a model previously written by [`NerModel::save`].
    ///
    /// # Errors
    ///
    /// Returns `NercError::ModelLoad` if the directory lacks the model files
    /// or they are inconsistent.
    pub fn load(dir: &Path) -> Result<Self> {
        let meta_path = dir.join(META_FILE);
        let weights_path = dir.join(WEIGHTS_FILE);
        if !meta_path.is_file() || !weights_path.is_file() {
            return Err(NercError::ModelLoad(format!(
                "{} does not contain {META_FILE} and {WEIGHTS_FILE}",
                dir.display()
            )));
        }

        let meta: ModelMeta = serde_json::from_reader(BufReader::new(File::open(&meta_path)?))
            .map_err(|e| NercError::ModelLoad(format!("{}: {e}", meta_path.display())))?;
        if meta.version != FORMAT_VERSION {
            return Err(NercError::ModelLoad(format!(
                "unsupported model format version {}",
                meta.version
            )));
        }
        let weights: AveragedWeights =
            serde_json::from_reader(BufReader::new(File::open(&weights_path)?))
                .map_err(|e| NercError::ModelLoad(format!("{}: {e}", weights_path.display())))?;

        let model = Self::with_labels(meta.lang, &meta.labels, meta.components, Some(weights));
        if model.weights.num_tags() != model.scheme.len() {
            return Err(NercError::ModelLoad(format!(
                "weights cover {} tags but the label set needs {}",
                model.weights.num_tags(),
                model.scheme.len()
            )));
        }
        debug!(dir = %dir.display(), labels = ?meta.labels, "loaded perceptron tagger");
        Ok(model)
    }

    pub fn lang(&self) -> Language {
        self.lang
    }

    /// Registered entity labels.
    pub fn labels(&self) -> Vec<String> {
        self.scheme.labels()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn has_component(&self, component: Component) -> bool {
        self.components.contains(&component)
    }

    /// Adds a sentencizer in front of the recognizer if there is none.
    pub fn ensure_sentencizer(&mut self) {
        if !self.has_component(Component::Sentencizer) {
            self.components.insert(0, Component::Sentencizer);
        }
    }

    fn features(tokens: &[Token], i: usize) -> Vec<String> {
        let word = &tokens[i].text;
        let lower = word.to_lowercase();
        let chars: Vec<char> = lower.chars().collect();
        let suffix: String = chars[chars.len().saturating_sub(3)..].iter().collect();
        let prefix: String = chars.iter().take(2).collect();

        let prev = i.checked_sub(1).map(|p| tokens[p].text.as_str());
        let next = tokens.get(i + 1).map(|t| t.text.as_str());

        let mut features = vec![
            "bias".to_string(),
            format!("w={lower}"),
            format!("suf={suffix}"),
            format!("pre={prefix}"),
            format!("shape={}", shape(word)),
            format!("p1={}", prev.map_or_else(|| "<s>".to_string(), str::to_lowercase)),
            format!("n1={}", next.map_or_else(|| "</s>".to_string(), str::to_lowercase)),
            format!("p1shape={}", prev.map_or_else(|| "<s>".to_string(), shape)),
            format!("n1shape={}", next.map_or_else(|| "</s>".to_string(), shape)),
        ];
        if word.chars().next().is_some_and(char::is_uppercase) {
            features.push("title".to_string());
            if prev.is_none() {
                features.push("title+first".to_string());
            }
        }
        if word.chars().any(char::is_alphabetic) && !word.chars().any(char::is_lowercase) {
            features.push("upper".to_string());
        }
        if word.chars().any(|c| c.is_ascii_digit()) {
            features.push("digit".to_string());
        }
        features
    }

    fn transition_feature(prev: usize) -> String {
        format!("T:{prev}")
    }

    fn emissions(&self, features: &[Vec<String>]) -> Vec<Vec<f32>> {
        features
            .iter()
            .map(|feats| {
                let mut scores = vec![0.0; self.scheme.len()];
                self.weights
                    .score_into(feats.iter().map(String::as_str), &mut scores);
                scores
            })
            .collect()
    }

    fn transitions(&self) -> Vec<Vec<f32>> {
        (0..self.scheme.len())
            .map(|prev| {
                self.weights
                    .row(&Self::transition_feature(prev))
                    .map_or_else(|| vec![0.0; self.scheme.len()], <[f32]>::to_vec)
            })
            .collect()
    }

    fn decode(&self, features: &[Vec<String>]) -> Result<Vec<usize>> {
        self.decoder
            .decode(&self.emissions(features), &self.transitions())
    }

    /// Gold tag indices for the tokens of an instance. Unregistered labels
    /// and tokens crossing a span boundary are tagged `O`.
    fn gold_tags(&self, instance: &TrainingInstance, tokens: &[Token]) -> Vec<usize> {
        let mut tags = Vec::with_capacity(tokens.len());
        let mut prev_entity: Option<usize> = None;
        for token in tokens {
            let entity = instance
                .entities
                .iter()
                .position(|e| e.start <= token.start && token.end <= e.end);
            let tag = entity.and_then(|idx| {
                let label = instance.entities[idx].label.clone();
                let tag = if prev_entity == Some(idx) {
                    BioTag::Inside(label)
                } else {
                    BioTag::Begin(label)
                };
                self.scheme.index(&tag)
            });
            tags.push(tag.unwrap_or(self.scheme.outside()));
            prev_entity = entity;
        }
        tags
    }

    fn apply_dropout(&mut self, features: Vec<String>, dropout: f32) -> Vec<String> {
        if dropout <= 0.0 {
            return features;
        }
        features
            .into_iter()
            .filter(|f| f == "bias" || self.rng.rand_float() >= dropout)
            .collect()
    }
}

impl NerModel for PerceptronTagger {
    fn predict(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let tokens = self.tokenizer.tokenize(text);
        let groups = if self.has_component(Component::Sentencizer) {
            self.tokenizer.sentences(&tokens)
        } else {
            vec![tokens.as_slice()]
        };

        let mut spans = Vec::new();
        for group in groups {
            if group.is_empty() {
                continue;
            }
            let features: Vec<Vec<String>> =
                (0..group.len()).map(|i| Self::features(group, i)).collect();
            let tags = self.decode(&features)?;
            let offsets: Vec<(usize, usize)> = group.iter().map(|t| (t.start, t.end)).collect();
            spans.extend(self.scheme.decode_spans(&tags, &offsets));
        }
        Ok(spans)
    }

    fn begin_training(&mut self, labels: &[String]) -> Result<()> {
        self.scheme = TagScheme::new(labels);
        self.weights = AveragedWeights::new(self.scheme.len());
        self.decoder = ViterbiDecoder::new(&self.scheme);
        debug!(labels = ?self.scheme.labels(), "initialized tagger for training");
        Ok(())
    }

    fn update(&mut self, batch: &[TrainingInstance], dropout: f32) -> Result<f32> {
        if !(0.0..1.0).contains(&dropout) {
            return Err(NercError::Model(format!(
                "dropout must be in [0, 1), got {dropout}"
            )));
        }

        let mut loss = 0.0;
        for instance in batch {
            let tokens = self.tokenizer.tokenize(&instance.text);
            if tokens.is_empty() {
                continue;
            }
            let gold = self.gold_tags(instance, &tokens);
            let mut features = Vec::with_capacity(tokens.len());
            for i in 0..tokens.len() {
                let feats = Self::features(&tokens, i);
                features.push(self.apply_dropout(feats, dropout));
            }
            let guess = self.decode(&features)?;

            for i in 0..tokens.len() {
                if guess[i] != gold[i] {
                    loss += 1.0;
                    for feature in &features[i] {
                        self.weights.update(feature, gold[i], 1.0);
                        self.weights.update(feature, guess[i], -1.0);
                    }
                }
                if i > 0 && (guess[i - 1], guess[i]) != (gold[i - 1], gold[i]) {
                    self.weights
                        .update(&Self::transition_feature(gold[i - 1]), gold[i], 1.0);
                    self.weights
                        .update(&Self::transition_feature(guess[i - 1]), guess[i], -1.0);
                }
            }
            self.weights.tick();
        }
        Ok(loss)
    }

    fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let meta = ModelMeta {
            version: FORMAT_VERSION,
            lang: self.lang,
            labels: self.scheme.labels(),
            components: self.components.clone(),
        };
        serde_json::to_writer_pretty(BufWriter::new(File::create(dir.join(META_FILE))?), &meta)?;
        serde_json::to_writer(
            BufWriter::new(File::create(dir.join(WEIGHTS_FILE))?),
            &self.weights.averaged(),
        )?;
        Ok(())
    }
}

impl fmt::Debug for PerceptronTagger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerceptronTagger")
            .field("lang", &self.lang)
            .field("components", &self.components)
            .field("labels", &self.scheme.labels())
            .field("features", &self.weights.len())
            .finish()
    }
}

/// Word shape: `X` upper, `x` lower, `d` digit, other characters kept;
/// runs longer than two are collapsed ("Paris" -> "Xxx").
fn shape(word: &str) -> String {
    let mut out = String::new();
    let mut last: Option<char> = None;
    let mut run = 0;
    for c in word.chars() {
        let s = if c.is_uppercase() {
            'X'
        } else if c.is_lowercase() {
            'x'
        } else if c.is_ascii_digit() {
            'd'
        } else {
            c
        };
        if Some(s) == last {
            run += 1;
        } else {
            run = 1;
            last = Some(s);
        }
        if run <= 2 {
            out.push(s);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Vec<TrainingInstance> {
        vec![
            TrainingInstance::new("I live in Paris .", vec![EntitySpan::new(10, 15, "LOC")]),
            TrainingInstance::new(
                "Ana visited Paris today .",
                vec![
                    EntitySpan::new(0, 3, "PER"),
                    EntitySpan::new(12, 17, "LOC"),
                ],
            ),
            TrainingInstance::new("Berlin is big .", vec![EntitySpan::new(0, 6, "LOC")]),
            TrainingInstance::new(
                "They love Ana Lima .",
                vec![EntitySpan::new(10, 18, "PER")],
            ),
        ]
    }

    fn trained() -> PerceptronTagger {
        let data = dataset();
        let mut model = PerceptronTagger::blank(Language::En).with_seed(7);
        model
            .begin_training(&["LOC".to_string(), "PER".to_string()])
            .unwrap();
        for _ in 0..30 {
            model.update(&data, 0.0).unwrap();
        }
        model
    }

    #[test]
    fn shape_collapses_runs() {
        assert_eq!(shape("Paris"), "Xxx");
        assert_eq!(shape("NASA"), "XX");
        assert_eq!(shape("2024"), "dd");
        assert_eq!(shape("U.S."), "X.X.");
    }

    #[test]
    fn blank_model_predicts_nothing() {
        let model = PerceptronTagger::blank(Language::Fr);
        assert!(model.predict("Emmanuel Macron à Paris").unwrap().is_empty());
        assert!(model.labels().is_empty());
        assert_eq!(model.components(), &[Component::Ner]);
    }

    #[test]
    fn learns_training_data() {
        let model = trained();
        assert_eq!(
            model.predict("I live in Paris .").unwrap(),
            vec![EntitySpan::new(10, 15, "LOC")]
        );
        assert_eq!(
            model.predict("They love Ana Lima .").unwrap(),
            vec![EntitySpan::new(10, 18, "PER")]
        );
    }

    #[test]
    fn loss_reaches_zero_on_separable_data() {
        let data = dataset();
        let mut model = PerceptronTagger::blank(Language::En);
        model
            .begin_training(&["LOC".to_string(), "PER".to_string()])
            .unwrap();
        let first = model.update(&data, 0.0).unwrap();
        let mut last = first;
        for _ in 0..30 {
            last = model.update(&data, 0.0).unwrap();
        }
        assert!(first > 0.0);
        assert_eq!(last, 0.0);
    }

    #[test]
    fn rejects_invalid_dropout() {
        let mut model = PerceptronTagger::blank(Language::En);
        assert!(model.update(&dataset(), 1.5).is_err());
    }

    #[test]
    fn gold_tags_follow_spans() {
        let mut model = PerceptronTagger::blank(Language::En);
        model.begin_training(&["PER".to_string()]).unwrap();
        let instance = &dataset()[3];
        let tokens = Tokenizer::new().tokenize(&instance.text);
        let tags: Vec<String> = model
            .gold_tags(instance, &tokens)
            .into_iter()
            .map(|t| model.scheme.tag(t).unwrap().to_string())
            .collect();
        assert_eq!(tags, ["O", "O", "B-PER", "I-PER", "O"]);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = trained();
        model.ensure_sentencizer();
        model.save(dir.path()).unwrap();

        let loaded = PerceptronTagger::load(dir.path()).unwrap();
        assert_eq!(loaded.lang(), Language::En);
        assert_eq!(loaded.labels(), vec!["LOC", "PER"]);
        assert!(loaded.has_component(Component::Sentencizer));
        loaded.predict("I live in Paris . Ana too .").unwrap();
    }

    #[test]
    fn load_missing_files_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = PerceptronTagger::load(dir.path()).unwrap_err();
        assert!(matches!(err, NercError::ModelLoad(_)));
    }

    #[test]
    fn ensure_sentencizer_is_idempotent() {
        let mut model = PerceptronTagger::blank(Language::Es);
        model.ensure_sentencizer();
        model.ensure_sentencizer();
        assert_eq!(model.components(), &[Component::Sentencizer, Component::Ner]);
    }
}
