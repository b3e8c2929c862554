//! CLI configuration file.
//!
//! ```toml
//! [engine]
//! placeholder = "n/a"
//! decimal_places = 2
//!
//! [logging]
//! level = "info"
//! ```

use std::path::Path;

use serde::Deserialize;

use formwork_eval::EngineConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub engine: EngineConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LoggingSettings {
    /// Base level before `-v` and `RUST_LOG` are applied.
    pub level: Option<String>,
}

/// Load settings from `path`, or defaults when no file is given.
pub(crate) fn load(path: Option<&Path>) -> Result<Settings, String> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading config '{}': {}", path.display(), e))?;
    parse(&text).map_err(|e| format!("invalid config '{}': {}", path.display(), e))
}

fn parse(text: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(text)
}
