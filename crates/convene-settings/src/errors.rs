//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A layer could not be read or did not match the settings schema.
    #[error("failed to load settings: {0}")]
    Load(#[from] Box<figment::Error>),
    /// A settings value was invalid.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_display() {
        let err = SettingsError::InvalidValue("pool_size must be at least 1".into());
        assert_eq!(
            err.to_string(),
            "invalid settings value: pool_size must be at least 1"
        );
    }

    #[test]
    fn load_error_from_figment() {
        let err: SettingsError = Box::new(figment::Error::from("bad".to_string())).into();
        assert!(matches!(err, SettingsError::Load(_)));
        assert!(err.to_string().contains("failed to load settings"));
    }
}
