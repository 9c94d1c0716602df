pub mod instance;
pub mod language;

pub use instance::{collect_labels, EntitySpan, TrainingInstance};
pub use language::Language;
