//! Runtime settings
//!
//! `defaults/formread.default.toml` is embedded into the binary so the documented
//! defaults and the runtime behavior cannot drift apart. Callers layer a user file
//! and single-key overrides on top via [`Loader`] before deserializing into
//! [`Settings`].
//!
//! These are knobs of the matching run itself. The per-form layout lives in the
//! layout file, see [`crate::layout`].

use crate::error::SettingsError;
use chrono::format::{Item, StrftimeItems};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/formread.default.toml");

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    pub matching: MatchingSettings,
    pub casting: CastingSettings,
    pub refile: RefileSettings,
    pub page: PageSettings,
}

/// Vertical tolerance band, as fractions of the field height
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MatchingSettings {
    pub band_above: f64,
    pub band_below: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CastingSettings {
    pub date_format: String,
    pub date_output: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RefileSettings {
    pub enabled: bool,
    pub key_field: String,
}

/// The normalized page frame fragments are mapped into
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PageSettings {
    pub width: f64,
    pub height: f64,
    pub transform: PageTransform,
}

/// Applied once to raw extractor coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageTransform {
    Identity,
    /// Rotate boxes by 180 degrees inside the page frame
    Rotate180,
}

impl Default for Settings {
    fn default() -> Self {
        // Mirrors defaults/formread.default.toml
        load_defaults().unwrap_or_else(|_| Settings {
            matching: MatchingSettings {
                band_above: 0.1,
                band_below: 0.75,
            },
            casting: CastingSettings {
                date_format: "%d/%m/%Y".to_string(),
                date_output: "%Y/%m/%d".to_string(),
            },
            refile: RefileSettings {
                enabled: true,
                key_field: "Codice".to_string(),
            },
            page: PageSettings {
                width: 595.2755905511812,
                height: 841.8897637795277,
                transform: PageTransform::Identity,
            },
        })
    }
}

impl Settings {
    /// Reject values the matcher and caster cannot work with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let band = [
            ("matching.band_above", self.matching.band_above),
            ("matching.band_below", self.matching.band_below),
        ];
        for (key, value) in band {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(key, format!("{} is not a non-negative number", value)));
            }
        }
        let formats = [
            ("casting.date_format", &self.casting.date_format),
            ("casting.date_output", &self.casting.date_output),
        ];
        for (key, format) in formats {
            if format.is_empty() || StrftimeItems::new(format).any(|i| i == Item::Error) {
                return Err(invalid(key, format!("'{}' is not a date format", format)));
            }
        }
        if self.refile.key_field.trim().is_empty() {
            return Err(invalid("refile.key_field", "empty key field".to_string()));
        }
        if !(self.page.width > 0.0 && self.page.height > 0.0) {
            return Err(invalid(
                "page",
                format!("{} x {} is not a page size", self.page.width, self.page.height),
            ));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, message: String) -> SettingsError {
    SettingsError::Value { key, message }
}

/// Layers a settings file and command-line overrides over the embedded defaults
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let defaults = File::from_str(DEFAULT_TOML, FileFormat::Toml);
        Self {
            builder: Config::builder().add_source(defaults),
        }
    }

    /// Layer a user TOML file over the defaults. The file must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let user = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(user);
        self
    }

    /// Row field whose value keys re-filed `row_dict` rows
    pub fn key_field(self, name: &str) -> Result<Self, SettingsError> {
        self.set("refile.key_field", name)
    }

    /// Turn re-filing on or off
    pub fn refile(self, enabled: bool) -> Result<Self, SettingsError> {
        self.set("refile.enabled", enabled)
    }

    fn set(mut self, key: &str, value: impl Into<ValueKind>) -> Result<Self, SettingsError> {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge every layer, deserialize and validate
    pub fn build(self) -> Result<Settings, SettingsError> {
        let settings: Settings = self.builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<Settings, SettingsError> {
    Loader::new().build()
}
