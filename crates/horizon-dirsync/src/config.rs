//! Controller configuration.
//!
//! Every key is optional; the defaults describe the standard page contract
//! (`lang`/`dir` on the root, `rtl-mode` marker class, `translatePage` hook,
//! a 1 s sweep and a 500 ms widget settle delay).
//!
//! # Example
//!
//! ```
//! use horizon_dirsync::DirectionConfig;
//!
//! let config = DirectionConfig::from_toml_str(r#"
//! rtl_marker_class = "is-rtl"
//! sweep_interval_ms = 250
//!
//! [triggers]
//! widget_watch = false
//! "#).unwrap();
//!
//! assert_eq!(config.rtl_marker_class, "is-rtl");
//! assert_eq!(config.language_attribute, "lang");
//! assert!(!config.triggers.widget_watch);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dom::SelectorList;
use crate::error::{Error, Result};

/// Which triggers a controller starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerConfig {
    /// Reconcile on writes to the language attribute.
    pub attribute_watch: bool,
    /// Periodically correct direction drift.
    pub sweep: bool,
    /// Reconcile after the translation widget appears.
    pub widget_watch: bool,
    /// Forward the switcher control's selection to the language attribute.
    pub switcher: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            attribute_watch: true,
            sweep: true,
            widget_watch: true,
            switcher: true,
        }
    }
}

/// Names, timings and trigger switches for a direction controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectionConfig {
    /// Root attribute holding the declared language.
    pub language_attribute: String,
    /// Root attribute holding the direction.
    pub direction_attribute: String,
    /// Class added to the root while the direction is right-to-left.
    pub rtl_marker_class: String,
    /// Id of the optional language selector control.
    pub switcher_id: String,
    /// Selector identifying the injected translation widget.
    pub widget_marker: String,
    /// Global name of the optional translation hook.
    pub translation_hook: String,
    pub sweep_interval_ms: u64,
    pub widget_settle_delay_ms: u64,
    pub triggers: TriggerConfig,
}

impl Default for DirectionConfig {
    fn default() -> Self {
        Self {
            language_attribute: "lang".to_string(),
            direction_attribute: "dir".to_string(),
            rtl_marker_class: "rtl-mode".to_string(),
            switcher_id: "language-switcher".to_string(),
            widget_marker: ".goog-te-banner-frame".to_string(),
            translation_hook: "translatePage".to_string(),
            sweep_interval_ms: 1000,
            widget_settle_delay_ms: 500,
            triggers: TriggerConfig::default(),
        }
    }
}

impl DirectionConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&source)
    }

    /// Serialize as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The sweep period.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Delay between spotting the widget and reconciling.
    pub fn widget_settle_delay(&self) -> Duration {
        Duration::from_millis(self.widget_settle_delay_ms)
    }

    /// The parsed widget marker selector.
    pub fn widget_marker_selector(&self) -> Result<SelectorList> {
        SelectorList::parse(&self.widget_marker)
    }

    /// Check every value.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("language_attribute", &self.language_attribute),
            ("direction_attribute", &self.direction_attribute),
            ("rtl_marker_class", &self.rtl_marker_class),
            ("switcher_id", &self.switcher_id),
            ("translation_hook", &self.translation_hook),
        ] {
            if value.is_empty() {
                return Err(Error::config(key, "must not be empty"));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(Error::config(key, "must not contain whitespace"));
            }
        }

        if self
            .language_attribute
            .eq_ignore_ascii_case(&self.direction_attribute)
        {
            return Err(Error::config(
                "direction_attribute",
                "must differ from language_attribute",
            ));
        }

        if self.sweep_interval_ms == 0 {
            return Err(Error::config("sweep_interval_ms", "must be greater than zero"));
        }
        if self.widget_settle_delay_ms == 0 {
            return Err(Error::config(
                "widget_settle_delay_ms",
                "must be greater than zero",
            ));
        }

        self.widget_marker_selector()
            .map_err(|e| Error::config("widget_marker", e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DirectionConfig::default();
        assert_eq!(config.language_attribute, "lang");
        assert_eq!(config.direction_attribute, "dir");
        assert_eq!(config.rtl_marker_class, "rtl-mode");
        assert_eq!(config.switcher_id, "language-switcher");
        assert_eq!(config.translation_hook, "translatePage");
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
        assert_eq!(config.widget_settle_delay(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
        assert_eq!(config.widget_marker_selector().unwrap().to_string(), ".goog-te-banner-frame");
    }

    #[test]
    fn test_empty_document_gives_defaults() {
        assert_eq!(
            DirectionConfig::from_toml_str("").unwrap(),
            DirectionConfig::default()
        );
    }

    #[test]
    fn test_partial_override() {
        let config = DirectionConfig::from_toml_str(
            r#"
            translation_hook = "doGTranslate"
            widget_settle_delay_ms = 750

            [triggers]
            sweep = false
            "#,
        )
        .unwrap();
        assert_eq!(config.translation_hook, "doGTranslate");
        assert_eq!(config.widget_settle_delay(), Duration::from_millis(750));
        assert!(!config.triggers.sweep);
        assert!(config.triggers.attribute_watch);
        assert_eq!(config.sweep_interval_ms, 1000);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(matches!(
            DirectionConfig::from_toml_str("sweep_interval = 5"),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            ("rtl_marker_class = \"\"", "rtl_marker_class"),
            ("switcher_id = \"two words\"", "switcher_id"),
            ("direction_attribute = \"LANG\"", "direction_attribute"),
            ("sweep_interval_ms = 0", "sweep_interval_ms"),
            ("widget_settle_delay_ms = 0", "widget_settle_delay_ms"),
            ("widget_marker = \"body > iframe\"", "widget_marker"),
        ];
        for (source, expected_key) in cases {
            match DirectionConfig::from_toml_str(source) {
                Err(Error::Config { key, .. }) => assert_eq!(key, expected_key, "{source}"),
                other => panic!("{source}: expected config error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "language_attribute = \"xml:lang\"").unwrap();
        let config = DirectionConfig::load(file.path()).unwrap();
        assert_eq!(config.language_attribute, "xml:lang");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(matches!(
            DirectionConfig::load(&path),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = DirectionConfig::default();
        config.triggers.switcher = false;
        let text = config.to_toml_string().unwrap();
        assert_eq!(DirectionConfig::from_toml_str(&text).unwrap(), config);
    }
}
