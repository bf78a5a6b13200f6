//! Registry configuration: enumerates the SNOMED container, the per-system
//! database paths, default versions, and the external-package factory
//! list, all loaded from a TOML file or overridden by `SNOMED_*`
//! environment variables, following the same `SNOMED_DATA_PATH` env-var
//! convention this crate's binary has always used.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use snomed_loader::TerminologyError;

/// One SNOMED CT edition to load, identified by the directory holding its
/// RF2 release files.
#[derive(Debug, Clone, Deserialize)]
pub struct SnomedEditionConfig {
    /// Directory containing the RF2 release files.
    pub path: String,
    /// The version tag this edition is served under (a release date or
    /// edition name).
    pub version: String,
    /// Default display language for this edition.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

/// One relational-backed system's database path and default version.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// The system URI this database serves (used only for logging; the
    /// concrete provider factory already knows its own system URI).
    pub system: String,
    /// Path to the SQLite database file.
    pub path: String,
    /// Default version string for this database.
    #[serde(default)]
    pub version: String,
    /// For OMOP, the vocabulary_id this database is scoped to. Ignored by
    /// every other system.
    #[serde(default)]
    pub vocabulary_id: Option<String>,
}

/// Base URL for a remote-backed provider (HGVS).
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// The FHIR server base URL `$validate-code` is called against.
    pub base_url: String,
}

/// A registry configuration: every input the bootstrap needs to build a
/// fully populated [`snomed_provider::ProviderRegistry`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegistryConfig {
    /// SNOMED CT editions to load, possibly more than one.
    #[serde(default)]
    pub snomed: Vec<SnomedEditionConfig>,
    /// Relational-backed system databases (LOINC, RxNorm, NCI, CPT, NDC,
    /// OMOP).
    #[serde(default)]
    pub databases: Vec<DatabaseConfig>,
    /// The HGVS validator endpoint, if configured. `None` skips
    /// registering that provider rather than failing startup.
    #[serde(default)]
    pub hgvs: Option<RemoteConfig>,
    /// External package names contributing additional provider
    /// factories, in load order. Loading an out-of-process factory
    /// package is not something a statically linked Rust binary can do
    /// safely without `dlopen`, so this core records the list and logs a
    /// warning for each entry rather than silently ignoring it.
    #[serde(default)]
    pub external_packages: Vec<String>,
}

impl RegistryConfig {
    /// Parses a configuration from a TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TerminologyError> {
        let text = fs::read_to_string(path).map_err(|e| TerminologyError::BackendFailure(e.to_string()))?;
        toml::from_str(&text).map_err(|e| TerminologyError::BackendFailure(e.to_string()))
    }

    /// Builds a configuration from `SNOMED_*` environment variables when
    /// no configuration file is supplied: `SNOMED_DATA_PATH` (a single
    /// edition directory) and `SNOMED_VERSION`/`SNOMED_LANGUAGE` for its
    /// version and language.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("SNOMED_DATA_PATH") {
            config.snomed.push(SnomedEditionConfig {
                path,
                version: std::env::var("SNOMED_VERSION").unwrap_or_else(|_| "unversioned".to_string()),
                language: std::env::var("SNOMED_LANGUAGE").unwrap_or_else(|_| default_language()),
            });
        }
        config
    }

    /// Loads from `SNOMED_CONFIG_PATH` if set, else falls back to
    /// environment-variable construction.
    pub fn load_default() -> Result<Self, TerminologyError> {
        match std::env::var("SNOMED_CONFIG_PATH") {
            Ok(path) => Self::load(path),
            Err(_) => Ok(Self::from_env()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_toml_document() {
        let toml = r#"
            [[snomed]]
            path = "/data/snomed-2025"
            version = "2025-01-01"

            [[databases]]
            system = "http://loinc.org"
            path = "/data/loinc.db"
            version = "2.78"
        "#;
        let config: RegistryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.snomed.len(), 1);
        assert_eq!(config.snomed[0].language, "en");
        assert_eq!(config.databases[0].system, "http://loinc.org");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let config: RegistryConfig = toml::from_str("").unwrap();
        assert!(config.snomed.is_empty());
        assert!(config.databases.is_empty());
        assert!(config.hgvs.is_none());
    }
}
