use std::path::Path;

use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::document::DocumentFormat;
use crate::error::{ErrorKind, Result};
use crate::template::DEFAULT_MISSING_TAG;

/// Environment variable prefix for settings overrides (`SHOTSORT_MISSING_TAG`).
pub const ENV_PREFIX: &str = "SHOTSORT_";

/// Engine settings that aren't part of the pattern or profile documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rendered in place of tags that weren't extracted.
    pub missing_tag: String,
    /// Directory under the destination root that unmatched items go to.
    pub unmatched_dir: String,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            missing_tag: DEFAULT_MISSING_TAG.to_string(),
            unmatched_dir: "unmatched".to_string(),
        }
    }
}
impl Settings {
    /// Layers defaults, then the settings file (if given), then `SHOTSORT_*`
    /// environment variables.
    #[tracing::instrument(level = "debug")]
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(file) = file {
            if !file.is_file() {
                exn::bail!(ErrorKind::Unreadable(file.to_path_buf()));
            }
            figment = match DocumentFormat::from_path(file) {
                DocumentFormat::Yaml => figment.merge(Yaml::file(file)),
                DocumentFormat::Toml => figment.merge(Toml::file(file)),
                DocumentFormat::Json => figment.merge(Json::file(file)),
            };
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract().map_err(|e| ErrorKind::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// The missing tag token must be usable as a path segment, and the
    /// unmatched directory must stay inside the destination root.
    pub fn validate(&self) -> Result<()> {
        let token = self.missing_tag.trim();
        if token.is_empty() || token.contains(['/', '\\', '\0']) || token == "." || token == ".." {
            exn::bail!(ErrorKind::Settings(format!("unusable missing tag token `{}`", self.missing_tag)));
        }
        crate::path::validate(&self.unmatched_dir)
            .or_raise(|| ErrorKind::Settings(format!("unusable unmatched directory `{}`", self.unmatched_dir)))?;
        Ok(())
    }
}
