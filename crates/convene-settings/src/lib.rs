//! # convene-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ConveneSettings::default()`]
//! 2. **Settings file**: `~/.convene/settings.json`, or a path given on the
//!    command line (merged key by key over the defaults)
//! 3. **Environment variables**: `CONVENE_*`, nested keys separated by `__`
//!    (e.g. `CONVENE_SERVER__PORT=9000`, `CONVENE_STORE__GROUPS_PATH=/data/g.db`)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::*;
