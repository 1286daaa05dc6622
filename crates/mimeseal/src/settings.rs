//! Persistent settings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mimeseal_core::GpgConfig;

/// Settings read from `settings.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The `gpg` executable (defaults to `gpg` on `PATH`).
    pub gpg_program: Option<PathBuf>,
    /// GnuPG home directory.
    pub gpg_homedir: Option<PathBuf>,
    /// Key to sign with when `--sign-as` is not given.
    pub default_signing_key: Option<String>,
    /// Encrypt to recipient keys without a trust check.
    pub always_trust: bool,
}

impl Settings {
    /// Default location: `<config dir>/mimeseal/settings.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mimeseal")
            .join("settings.json")
    }

    /// Loads settings from `path`, or from the default location.
    ///
    /// A missing file at the default location yields default settings; an
    /// explicitly given file must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (settings_path, explicit) = path.map_or_else(
            || (Self::default_path(), false),
            |path| (path.to_path_buf(), true),
        );

        if !explicit && !settings_path.exists() {
            tracing::debug!(path = %settings_path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .with_context(|| format!("Failed to read {}", settings_path.display()))?;
        let settings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", settings_path.display()))?;
        tracing::debug!(path = %settings_path.display(), "Loaded settings");
        Ok(settings)
    }

    /// GnuPG configuration described by these settings.
    #[must_use]
    pub fn gpg_config(&self) -> GpgConfig {
        let mut builder = GpgConfig::builder().always_trust(self.always_trust);
        if let Some(program) = &self.gpg_program {
            builder = builder.program(program);
        }
        if let Some(homedir) = &self.gpg_homedir {
            builder = builder.homedir(homedir);
        }
        builder.build()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "gpg_homedir": "/tmp/gnupg", "always_trust": true }"#).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.gpg_homedir, Some(PathBuf::from("/tmp/gnupg")));
        assert!(settings.always_trust);
        assert_eq!(settings.gpg_program, None);

        let config = settings.gpg_config();
        assert_eq!(config.program, PathBuf::from("gpg"));
        assert_eq!(config.homedir, Some(PathBuf::from("/tmp/gnupg")));
        assert!(config.always_trust);
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn test_invalid_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid settings"));
    }

    #[test]
    fn test_roundtrip() {
        let settings = Settings {
            gpg_program: Some(PathBuf::from("/usr/bin/gpg2")),
            default_signing_key: Some("0x0123456789ABCDEF".to_string()),
            ..Settings::default()
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        assert_eq!(serde_json::from_str::<Settings>(&json).unwrap(), settings);
    }
}
