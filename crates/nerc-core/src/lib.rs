//! # nerc core
//!
//! Named-entity recognition toolkit: converts token-per-line BIO datasets
//! into character-span training instances, resolves overlapping spans,
//! scores predictions with micro-averaged precision/recall/F-score, and runs
//! a bundled perceptron tagger over documents.
//!
//! ## Quick Start
//!
//! ```rust
//! use nerc_core::bio::BioConverter;
//!
//! let converter = BioConverter::new().unwrap();
//! let instances = converter
//!     .convert(["Who O", "is O", "Shaka B-PER", "Khan I-PER", "? O", ""])
//!     .unwrap();
//!
//! assert_eq!(instances[0].text, "Who is Shaka Khan ?");
//! assert_eq!(instances[0].entities[0].start, 7);
//! assert_eq!(instances[0].entities[0].end, 17);
//! assert_eq!(instances[0].entities[0].label, "PER");
//!
//! // An entity still open at a sentence boundary is dropped.
//! let open = converter.convert(["Shaka B-PER", "Khan I-PER", ""]).unwrap();
//! assert!(open[0].entities.is_empty());
//! ```
pub mod analysis;
pub mod archive;
pub mod bio;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod types;

// Re-export primary API
pub use analysis::{analyze, AnalyzeConfig, Analysis, EntityReport, ModelSource};
pub use bio::{conll_to_plain_text, resolve_overlaps, BioConverter, BioTag, OverlapPolicy};
pub use error::{NercError, Result};
pub use evaluation::{evaluate, EvaluationScores};
pub use model::{NerModel, PerceptronTagger};
pub use types::{collect_labels, EntitySpan, Language, TrainingInstance};
