//! Dataset loading for BIO-tagged training data.

use std::fs;
use std::path::Path;

use anyhow::Context;
use nerc_core::bio::{resolve_overlaps, BioConverter, OverlapPolicy};
use nerc_core::{NercError, TrainingInstance};
use tracing::info;

/// Reads a dataset file into lines.
///
/// Fails with [`NercError::InputNotFound`] (absolute path) when missing.
pub fn read_lines<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(NercError::input_not_found(path).into());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Loads a BIO dataset file as overlap-resolved training instances.
pub fn load_bio_dataset<P: AsRef<Path>>(
    path: P,
    policy: OverlapPolicy,
) -> anyhow::Result<Vec<TrainingInstance>> {
    let path = path.as_ref();
    let lines = read_lines(path)?;
    let converter = BioConverter::new()?;
    let mut instances = converter
        .convert(&lines)
        .with_context(|| format!("converting {}", path.display()))?;
    resolve_overlaps(&mut instances, policy);
    info!(path = %path.display(), instances = instances.len(), "loaded dataset");
    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_bio_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("train.txt");
        fs::write(
            &path,
            "Shaka B-PER\nKhan I-PER\nsings O\n\nParis B-LOC\nis O\nnice O\n\nLyon B-LOC\n",
        )
        .unwrap();

        let instances = load_bio_dataset(&path, OverlapPolicy::KeepFirst).unwrap();
        assert_eq!(instances.len(), 3);
        assert_eq!(instances[0].text, "Shaka Khan sings");
        assert_eq!(instances[0].entities[0].end, 10);
        // Final sentence without trailing blank line; its entity stays open.
        assert_eq!(instances[2].text, "Lyon");
        assert!(instances[2].entities.is_empty());
    }

    #[test]
    fn test_missing_dataset_reports_absolute_path() {
        let err = read_lines("definitely/not/here.txt").unwrap_err();
        match err.downcast_ref::<NercError>() {
            Some(NercError::InputNotFound { path }) => {
                assert!(path.is_absolute());
                assert!(path.ends_with("definitely/not/here.txt"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_tag_is_downcastable() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.txt");
        fs::write(&path, "Paris X-LOC\n").unwrap();
        let err = load_bio_dataset(&path, OverlapPolicy::Legacy).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NercError>(),
            Some(NercError::MalformedTag { line: 1, .. })
        ));
    }
}
