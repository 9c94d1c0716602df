//! # Inference Runner
//!
//! Loads a default or custom model, tags a whole document, and produces the
//! entity report plus a highlighted HTML copy written next to the input.

pub mod html;
pub mod report;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::archive::{self, ScopedDir};
use crate::error::{NercError, Result};
use crate::model::{NerModel, PerceptronTagger};
use crate::types::Language;

pub use html::render_page;
pub use report::{EntityReport, Tally};

/// Suffix appended to the input path for the HTML visualization.
pub const HIGHLIGHT_SUFFIX: &str = "._HIGHLIGHTED.html";

/// Where analysis models come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// The configured default model for a language, under a model home.
    Default { lang: Language, home: PathBuf },
    /// A user-trained model: a directory or a zip archive.
    Custom(PathBuf),
}

impl ModelSource {
    /// Loads the model. Custom models get a sentencizer attached.
    pub fn load(&self) -> Result<PerceptronTagger> {
        match self {
            ModelSource::Default { lang, home } => {
                let path = home.join(lang.default_model_name());
                info!(%lang, path = %path.display(), "loading default model");
                load_packaged(&path)
            }
            ModelSource::Custom(path) => {
                info!(path = %path.display(), "loading custom model");
                let mut model = load_packaged(path)?;
                model.ensure_sentencizer();
                Ok(model)
            }
        }
    }
}

/// Loads a model directory directly, or unpacks `<path>` / `<path>.zip`
/// into a sibling directory named without `.zip` and loads from there.
/// The extracted directory is removed once loading finishes.
fn load_packaged(path: &Path) -> Result<PerceptronTagger> {
    if path.is_dir() {
        return PerceptronTagger::load(path);
    }

    let zip_path = if has_zip_extension(path) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".zip");
        PathBuf::from(name)
    };
    if !zip_path.is_file() {
        return Err(NercError::Configuration(format!(
            "no model directory or archive at {}",
            path.display()
        )));
    }

    let extract_dir = strip_zip_extension(&zip_path);
    if extract_dir.exists() {
        return Err(NercError::Configuration(format!(
            "cannot unpack {} because {} already exists",
            zip_path.display(),
            extract_dir.display()
        )));
    }
    let guard = ScopedDir::new(extract_dir);
    archive::unpack(&zip_path, guard.path())?;
    PerceptronTagger::load(guard.path())
}

fn has_zip_extension(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().ends_with(".zip"))
}

// Model names carry the F-score ("..._fscore0.8123.zip"), so only the final
// ".zip" may be removed.
fn strip_zip_extension(zip_path: &Path) -> PathBuf {
    let name = zip_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".zip").unwrap_or(&name);
    zip_path.with_file_name(stem)
}

/// Default location of per-language models: `<data dir>/nerc/models`.
pub fn default_model_home() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join("nerc").join("models"))
        .ok_or_else(|| {
            NercError::Configuration(
                "no data directory on this platform; pass a model home explicitly".into(),
            )
        })
}

/// Configuration for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub file: PathBuf,
    pub lang: String,
    pub custom_model: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub top_n: usize,
    pub model_home: Option<PathBuf>,
}

impl AnalyzeConfig {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            lang: Language::Fr.code().to_string(),
            custom_model: None,
            output: None,
            top_n: 10,
            model_home: None,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// A custom model overrides the language's default model.
    pub fn with_custom_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.custom_model = Some(path.into());
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_model_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.model_home = Some(home.into());
        self
    }

    /// Validates the language and picks the model source.
    pub fn model_source(&self) -> Result<ModelSource> {
        let lang: Language = self.lang.parse()?;
        match &self.custom_model {
            Some(path) => Ok(ModelSource::Custom(path.clone())),
            None => {
                let home = match &self.model_home {
                    Some(home) => home.clone(),
                    None => default_model_home()?,
                };
                Ok(ModelSource::Default { lang, home })
            }
        }
    }

    /// Path of the HTML visualization: the input path plus [`HIGHLIGHT_SUFFIX`].
    pub fn highlight_path(&self) -> PathBuf {
        let mut path: OsString = self.file.as_os_str().to_owned();
        path.push(HIGHLIGHT_SUFFIX);
        PathBuf::from(path)
    }
}

/// Result of [`analyze`].
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: EntityReport,
    /// The rendered report honoring the configured `top_n`.
    pub rendered: String,
    pub highlight_path: PathBuf,
}

/// Runs a model over the whole input file.
///
/// Writes the rendered report to `output` when configured, and always writes
/// the highlighted HTML page next to the input.
///
/// # Errors
///
/// `Configuration` for an unsupported language (checked first),
/// `InputNotFound` for a missing input file, and model load failures.
pub fn analyze(config: &AnalyzeConfig) -> Result<Analysis> {
    let source = config.model_source()?;
    if !config.file.is_file() {
        return Err(NercError::input_not_found(&config.file));
    }

    let model = source.load()?;
    let content = fs::read_to_string(&config.file)?;
    let spans = model.predict(&content)?;
    info!(entities = spans.len(), file = %config.file.display(), "analyzed document");

    let report = EntityReport::from_spans(&content, &spans)?;
    let rendered = report.render(config.top_n);

    if let Some(output) = &config.output {
        fs::write(output, format!("{rendered}\n"))?;
        info!(path = %output.display(), "wrote report");
    }

    let highlight_path = config.highlight_path();
    fs::write(
        &highlight_path,
        render_page(&content, &spans, model.lang().code())?,
    )?;
    info!(path = %highlight_path.display(), "wrote highlighted HTML; open it with a web browser");

    Ok(Analysis {
        report,
        rendered,
        highlight_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Component;
    use crate::types::{EntitySpan, TrainingInstance};

    fn write_model(dir: &Path) {
        let data = vec![
            TrainingInstance::new("I live in Paris .", vec![EntitySpan::new(10, 15, "LOC")]),
            TrainingInstance::new("Berlin is big .", vec![EntitySpan::new(0, 6, "LOC")]),
            TrainingInstance::new("We saw Paris .", vec![EntitySpan::new(7, 12, "LOC")]),
        ];
        let mut model = PerceptronTagger::blank(Language::En);
        model.begin_training(&["LOC".to_string()]).unwrap();
        for _ in 0..30 {
            model.update(&data, 0.0).unwrap();
        }
        model.save(dir).unwrap();
    }

    #[test]
    fn test_unsupported_language_checked_first() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AnalyzeConfig::new(tmp.path().join("missing.txt")).with_lang("de");
        let err = analyze(&config).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_input_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AnalyzeConfig::new(tmp.path().join("missing.txt"))
            .with_model_home(tmp.path());
        let err = analyze(&config).unwrap_err();
        assert!(matches!(err, NercError::InputNotFound { .. }));
    }

    #[test]
    fn test_missing_default_model() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("doc.txt");
        fs::write(&file, "Paris").unwrap();
        let config = AnalyzeConfig::new(&file)
            .with_lang("es")
            .with_model_home(tmp.path().join("models"));
        let err = analyze(&config).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("nerc-es"));
    }

    #[test]
    fn test_model_source_resolution() {
        let config = AnalyzeConfig::new("doc.txt").with_model_home("/models");
        assert_eq!(
            config.model_source().unwrap(),
            ModelSource::Default {
                lang: Language::Fr,
                home: PathBuf::from("/models"),
            }
        );
        let config = config.with_lang("en").with_custom_model("my_model.zip");
        assert_eq!(
            config.model_source().unwrap(),
            ModelSource::Custom(PathBuf::from("my_model.zip"))
        );
    }

    #[test]
    fn test_strip_zip_extension_keeps_dots() {
        assert_eq!(
            strip_zip_extension(Path::new("out/nerc_model_epoch3_fscore0.8123.zip")),
            PathBuf::from("out/nerc_model_epoch3_fscore0.8123")
        );
    }

    #[test]
    fn test_analyze_with_custom_zip_model() {
        let tmp = tempfile::tempdir().unwrap();
        let model_dir = tmp.path().join("custom");
        write_model(&model_dir);
        let zip_path = tmp.path().join("custom_fscore0.5000.zip");
        archive::pack_dir(&model_dir, &zip_path).unwrap();
        fs::remove_dir_all(&model_dir).unwrap();

        let file = tmp.path().join("doc.txt");
        fs::write(&file, "I live in Paris .").unwrap();
        let output = tmp.path().join("report.txt");

        // Given without the extension: ".zip" is appended.
        let config = AnalyzeConfig::new(&file)
            .with_custom_model(tmp.path().join("custom_fscore0.5000"))
            .with_output(&output)
            .with_top_n(5);
        let analysis = analyze(&config).unwrap();

        assert_eq!(analysis.report.type_counts().get("LOC"), 1);
        assert_eq!(analysis.report.surface_counts("LOC").unwrap().get("Paris"), 1);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            format!("{}\n", analysis.rendered)
        );
        let html = fs::read_to_string(tmp.path().join("doc.txt._HIGHLIGHTED.html")).unwrap();
        assert!(html.contains(">LOC</span></mark>"));
        // Extraction directory is cleaned up.
        assert!(!tmp.path().join("custom_fscore0.5000").exists());
    }

    #[test]
    fn test_analyze_with_default_model_dir() {
        let tmp = tempfile::tempdir().unwrap();
        write_model(&tmp.path().join("models").join("nerc-en"));
        let file = tmp.path().join("doc.txt");
        fs::write(&file, "Berlin is big .").unwrap();

        let config = AnalyzeConfig::new(&file)
            .with_lang("en")
            .with_model_home(tmp.path().join("models"));
        let analysis = analyze(&config).unwrap();
        assert_eq!(analysis.report.type_counts().total(), 1);
        assert!(analysis.highlight_path.is_file());
    }

    #[test]
    fn test_only_custom_models_get_a_sentencizer() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("models");
        write_model(&home.join("nerc-en"));

        let custom = ModelSource::Custom(home.join("nerc-en")).load().unwrap();
        assert!(custom.has_component(Component::Sentencizer));
        assert!(custom.has_component(Component::Ner));

        let default = ModelSource::Default {
            lang: Language::En,
            home,
        }
        .load()
        .unwrap();
        assert!(!default.has_component(Component::Sentencizer));
        assert_eq!(default.components(), &[Component::Ner]);
    }

    #[test]
    fn test_existing_extract_dir_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("m.zip"), b"not really a zip").unwrap();
        fs::create_dir_all(tmp.path().join("m")).unwrap();
        // "m" is a directory, so it loads directly and fails on missing files.
        assert!(matches!(
            ModelSource::Custom(tmp.path().join("m")).load().unwrap_err(),
            NercError::ModelLoad(_)
        ));
        // Pointing at the archive itself refuses to overwrite "m".
        assert!(
            ModelSource::Custom(tmp.path().join("m.zip"))
                .load()
                .unwrap_err()
                .is_configuration()
        );
    }
}
