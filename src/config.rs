//! Runtime configuration for citool services and adapters.
//!
//! Configuration is read from TOML. Every section falls back to the values
//! used by the production deployment, so an empty document is valid.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CitoolConfig {
    /// Shared worker workspace settings.
    pub workspace: WorkspaceConfig,
    /// Durable artifact storage settings.
    pub artifacts: ArtifactConfig,
    /// Secret naming settings for scheduled scans.
    pub secrets: SecretConfig,
    /// Scanning module defaults.
    pub scanning: ScanningConfig,
    /// Load-test module settings.
    pub load_test: LoadTestConfig,
}

/// Shared volume where workers clone repositories and write reports.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Root directory of the worker workspace.
    pub root: String,
}

/// Durable artifact storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Bucket holding uploaded reports.
    pub bucket: String,
    /// Lifetime of presigned download links, in seconds.
    pub presign_expiry_secs: u64,
}

/// Secret naming settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SecretConfig {
    /// Prefix prepended to the schedule id to form the secret name.
    pub prefix: String,
}

/// Scanning module defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Paths always excluded from static analysis.
    pub default_exclude_paths: String,
}

/// Load-test module settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadTestConfig {
    /// Directory where load-test reports are written.
    pub media_root: String,
    /// URL path under which `media_root` is served.
    pub media_url: String,
    /// Public origin prepended to report links.
    pub frontend_server: String,
    /// `JMeter` executable.
    pub jmeter_bin: String,
    /// Parameterised plan used by `CONFIG` runs.
    pub jmx_file: String,
    /// ZAP executable.
    pub zap_bin: String,
    /// ZAP home directory.
    pub zap_home: String,
    /// Raw sample log written by `JMeter`.
    pub result_file: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: "/code/efs".to_owned(),
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            bucket: "citool-scan-result".to_owned(),
            presign_expiry_secs: 3600,
        }
    }
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            prefix: "/CustomResource/".to_owned(),
        }
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            default_exclude_paths: "spec, test, tests, tmp".to_owned(),
        }
    }
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            media_root: "/code/media/".to_owned(),
            media_url: "/media/".to_owned(),
            frontend_server: "http://localhost:8000".to_owned(),
            jmeter_bin: "jmeter".to_owned(),
            jmx_file: "/code/jmeter/config.jmx".to_owned(),
            zap_bin: "zap.sh".to_owned(),
            zap_home: "/code/zap".to_owned(),
            result_file: "result.jtl".to_owned(),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The configuration document is not valid TOML for [`CitoolConfig`].
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl CitoolConfig {
    /// Parses configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is malformed.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(document)?)
    }

    /// Reads and parses configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let document = std::fs::read_to_string(path_ref).map_err(|err| ConfigError::Read {
            path: path_ref.display().to_string(),
            source: err,
        })?;
        Self::from_toml_str(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn empty_document_uses_deployment_defaults() {
        let config = CitoolConfig::from_toml_str("").expect("empty config should parse");

        assert_eq!(config, CitoolConfig::default());
        assert_eq!(config.workspace.root, "/code/efs");
        assert_eq!(config.artifacts.presign_expiry_secs, 3600);
        assert_eq!(config.secrets.prefix, "/CustomResource/");
    }

    #[rstest]
    fn partial_sections_keep_remaining_defaults() {
        let config = CitoolConfig::from_toml_str(
            r#"
            [artifacts]
            bucket = "reports"

            [load_test]
            jmeter_bin = "/opt/jmeter/bin/jmeter"
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.artifacts.bucket, "reports");
        assert_eq!(config.artifacts.presign_expiry_secs, 3600);
        assert_eq!(config.load_test.jmeter_bin, "/opt/jmeter/bin/jmeter");
        assert_eq!(config.load_test.result_file, "result.jtl");
    }

    #[rstest]
    fn malformed_document_is_rejected() {
        let result = CitoolConfig::from_toml_str("[workspace\nroot = 1");

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
