//! Settings of a standalone live data bridge.

use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::load_data;
use crate::entry_store::DEFAULT_RESULTS_TEMPLATE;
use crate::update::HTML_CONVERSION_KEY;
use crate::{MapTranslator, StaticClassRepository};

/// The settings file looked up when none is given.
pub const DEFAULT_SETTINGS_FILE: &str = "livedata.yml";

/// Bridge settings. Missing keys take their default value. Relative paths
/// are relative to the directory of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Template rendered when a source names neither a template nor a
    /// results page.
    pub default_template: String,
    /// Glob patterns of the Handlebars templates to register.
    pub templates: Vec<String>,
    /// JSON/YAML map of translation keys to translations.
    pub translations: Option<PathBuf>,
    /// JSON/YAML map of class names to class properties.
    pub classes: Option<PathBuf>,
    /// Key listing the fields that need HTML conversion on update.
    pub html_conversion_key: String,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_template: DEFAULT_RESULTS_TEMPLATE.to_string(),
            templates: vec!["templates/*.hbs".to_string()],
            translations: None,
            classes: None,
            html_conversion_key: HTML_CONVERSION_KEY.to_string(),
            base_dir: PathBuf::new(),
        }
    }
}

impl Settings {
    /// Loads settings from the given file, falling back to the default
    /// settings if there is no such file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No settings file {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let mut settings: Self = load_data(path)
            .wrap_err_with(|| format!("invalid settings file {}", path.display()))?;
        settings.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(settings)
    }

    /// The template glob patterns, relative to the settings file.
    pub fn template_patterns(&self) -> Vec<String> {
        self.templates
            .iter()
            .map(|pattern| self.base_dir.join(pattern).to_string_lossy().into_owned())
            .collect()
    }

    pub fn load_translations(&self) -> Result<MapTranslator> {
        match &self.translations {
            Some(path) => load_data(self.base_dir.join(path)),
            None => Ok(MapTranslator::default()),
        }
    }

    pub fn load_classes(&self) -> Result<StaticClassRepository> {
        match &self.classes {
            Some(path) => load_data(self.base_dir.join(path)),
            None => Ok(StaticClassRepository::default()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::parse_data;

    #[test]
    fn missing_keys_take_defaults() {
        let settings: Settings = parse_data("defaultTemplate: results.vm\n", "yml").unwrap();
        assert_eq!(settings.default_template, "results.vm");
        assert_eq!(settings.templates, vec!["templates/*.hbs"]);
        assert_eq!(settings.html_conversion_key, "RequiresHTMLConversion");
        assert_eq!(settings.translations, None);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load("no/such/livedata.yml").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.load_translations().is_ok());
        assert!(settings.load_classes().is_ok());
    }
}
