use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NercError;

/// Languages with a configured default model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Fr,
    Es,
}

impl Language {
    /// Get all supported languages in order.
    pub fn all() -> &'static [Language] {
        &[Language::En, Language::Fr, Language::Es]
    }

    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
            Self::Es => "es",
        }
    }

    /// Name of the default pre-trained model looked up in the model home.
    pub fn default_model_name(self) -> &'static str {
        match self {
            Self::En => "nerc-en",
            Self::Fr => "nerc-fr",
            Self::Es => "nerc-es",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = NercError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "fr" => Ok(Self::Fr),
            "es" => Ok(Self::Es),
            other => Err(NercError::Configuration(format!(
                "the language {other:?} is not valid, use one of: {}",
                Language::all()
                    .iter()
                    .map(|l| l.code())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}
