//! Provider factory registry: maps a `(system, version)` request to
//! a concrete [`CodeSystemProvider`], applying the version-selection
//! precedence before falling back to whatever the factory itself defaults
//! to.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use snomed_loader::{TerminologyError, TerminologyResult};

use crate::contract::CodeSystemProvider;

/// Builds providers for one code system. A registry holds one factory per
/// system URI; the factory itself may serve several versions (e.g. two
/// loaded SNOMED editions).
pub trait ProviderFactory {
    /// The system URI this factory serves.
    fn system(&self) -> &str;

    /// The version used when a request names no version at all.
    fn default_version(&self) -> &str;

    /// Every fully-qualified version this factory can build a provider
    /// for, in no particular order.
    fn available_versions(&self) -> Vec<String>;

    /// Builds a provider for the given version. `version` is always one
    /// of `available_versions()`'s entries by the time this is called;
    /// the registry performs selection before invoking it.
    fn build(&self, version: &str) -> TerminologyResult<Box<dyn CodeSystemProvider>>;
}

/// Tracks how many times a factory has been asked to build a provider,
/// for diagnostics (not used for eviction — providers here are stateless
/// to build, unlike a caching registry that pools live connections).
#[derive(Debug, Default)]
struct UseCounter(AtomicU64);

impl UseCounter {
    fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

struct Entry {
    factory: Box<dyn ProviderFactory>,
    uses: UseCounter,
}

/// The registry: one factory per system URI, built up at startup and
/// queried once per incoming request.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, Entry>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a factory. Rejects a second factory for a system URI
    /// that's already registered with an overlapping fully-qualified
    /// version — distinct factories serving disjoint versions of the same
    /// system are not supported by this registry (one factory per
    /// system).
    pub fn register(&mut self, factory: Box<dyn ProviderFactory>) -> TerminologyResult<()> {
        let system = factory.system().to_string();
        if self.factories.contains_key(&system) {
            return Err(TerminologyError::VersionMismatch {
                requested: system.clone(),
                loaded: "already registered".to_string(),
            });
        }
        self.factories.insert(
            system,
            Entry {
                factory,
                uses: UseCounter::default(),
            },
        );
        Ok(())
    }

    /// How many times a system's factory has built a provider.
    pub fn use_count(&self, system: &str) -> u64 {
        self.factories.get(system).map(|e| e.uses.get()).unwrap_or(0)
    }

    /// Resolves `(system, requested_version)` to a provider, applying the
    /// precedence: exact match → detailed-variant (requested version is a
    /// prefix of an available one) → partial semver (major.minor match) →
    /// the request's own default rule → the factory's own default.
    pub fn resolve(
        &self,
        system: &str,
        requested_version: Option<&str>,
    ) -> TerminologyResult<Box<dyn CodeSystemProvider>> {
        let entry = self.factories.get(system).ok_or_else(|| TerminologyError::VersionMismatch {
            requested: system.to_string(),
            loaded: "no factory registered".to_string(),
        })?;

        let available = entry.factory.available_versions();
        let chosen = select_version(requested_version, &available, entry.factory.default_version());

        let Some(chosen) = chosen else {
            return Err(TerminologyError::VersionMismatch {
                requested: requested_version.unwrap_or("<none>").to_string(),
                loaded: available.join(", "),
            });
        };

        entry.uses.bump();
        entry.factory.build(&chosen)
    }
}

/// Applies the version-selection precedence in order, returning the first
/// match.
fn select_version(requested: Option<&str>, available: &[String], factory_default: &str) -> Option<String> {
    let Some(requested) = requested else {
        return fallback_default(available, factory_default);
    };

    if let Some(exact) = available.iter().find(|v| v.as_str() == requested) {
        return Some(exact.clone());
    }

    if let Some(detailed) = available.iter().find(|v| v.starts_with(requested)) {
        return Some(detailed.clone());
    }

    if let Some(partial) = available.iter().find(|v| major_minor(v) == major_minor(requested)) {
        return Some(partial.clone());
    }

    fallback_default(available, factory_default)
}

fn fallback_default(available: &[String], factory_default: &str) -> Option<String> {
    if available.iter().any(|v| v == factory_default) {
        Some(factory_default.to_string())
    } else {
        available.first().cloned()
    }
}

/// The `major.minor` prefix of a dotted version string, used for the
/// partial-semver precedence step.
fn major_minor(version: &str) -> &str {
    let mut parts = version.splitn(3, '.');
    let major = parts.next().unwrap_or(version);
    match parts.next() {
        Some(minor) => &version[..major.len() + 1 + minor.len()],
        None => major,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_wins_over_prefix() {
        let available = vec!["2024-01-01".to_string(), "2024-01-01T120000Z".to_string()];
        let chosen = select_version(Some("2024-01-01"), &available, "2024-01-01");
        assert_eq!(chosen.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn detailed_variant_matches_a_prefix_request() {
        let available = vec!["2024-01-01T120000Z".to_string()];
        let chosen = select_version(Some("2024-01-01"), &available, "2024-01-01T120000Z");
        assert_eq!(chosen.as_deref(), Some("2024-01-01T120000Z"));
    }

    #[test]
    fn partial_semver_falls_back_to_major_minor() {
        let available = vec!["2.67.0".to_string()];
        let chosen = select_version(Some("2.67"), &available, "2.67.0");
        assert_eq!(chosen.as_deref(), Some("2.67.0"));
    }

    #[test]
    fn no_requested_version_uses_factory_default() {
        let available = vec!["1.0.0".to_string(), "2.0.0".to_string()];
        let chosen = select_version(None, &available, "2.0.0");
        assert_eq!(chosen.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn unmatched_request_falls_back_to_first_available() {
        let available = vec!["9.9.9".to_string()];
        let chosen = select_version(Some("bogus"), &available, "1.0.0");
        assert_eq!(chosen.as_deref(), Some("9.9.9"));
    }
}
