//! Settings loading.
//!
//! Loading flow:
//! 1. Start with compiled [`ConveneSettings::default()`]
//! 2. If the settings file exists, merge its values over the defaults
//! 3. Apply `CONVENE_*` environment overrides (highest priority)
//! 4. Validate the result

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use tracing::debug;

use crate::errors::Result;
use crate::types::{ConveneSettings, convene_home};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "CONVENE_";

/// Resolve the path to the settings file (`~/.convene/settings.json`).
pub fn settings_path() -> PathBuf {
    convene_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ConveneSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file is not an error; the defaults stand in for it.
pub fn load_settings_from_path(path: &Path) -> Result<ConveneSettings> {
    if path.exists() {
        debug!(?path, "loading settings from file");
    } else {
        debug!(?path, "settings file not found, using defaults");
    }

    let settings: ConveneSettings = figment(path).extract().map_err(Box::new)?;
    settings.validate()?;
    Ok(settings)
}

fn figment(path: &Path) -> Figment {
    Figment::from(Serialized::defaults(ConveneSettings::default()))
        .merge(Json::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}
