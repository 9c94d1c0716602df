pub mod convert;
pub mod overlap;
pub mod tags;

pub use convert::{conll_to_plain_text, BioConverter};
pub use overlap::{resolve_entities, resolve_overlaps, OverlapPolicy};
pub use tags::{BioTag, TagScheme};
