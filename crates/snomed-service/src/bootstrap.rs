//! Registry bootstrap: turns a [`RegistryConfig`] into a fully populated
//! [`ProviderRegistry`], one [`ProviderFactory`] per system URI, logging
//! each load step with `tracing::info!` as it goes.

use std::collections::HashMap;
use std::sync::Arc;

use snomed_loader::{discover_rf2_files, Rf2Config, SnomedStore, TerminologyError, TerminologyResult};

use snomed_provider::registry::{ProviderFactory, ProviderRegistry};
use snomed_provider::snomed::SnomedProvider;
use snomed_provider::contract::CodeSystemProvider;

use snomed_providers_misc::{HgvsProvider, IetfLanguageProvider, MimeProvider, UriProvider, UsStatesProvider};
use snomed_relational::{CptProvider, LoincProvider, NdcProvider, OmopProvider, RxNormProvider, RxVocabulary};

use crate::config::{DatabaseConfig, RegistryConfig};

const LOINC_SYSTEM: &str = "http://loinc.org";
const RXNORM_SYSTEM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
const NCI_SYSTEM: &str = "http://ncimeta.nci.nih.gov";
const CPT_SYSTEM: &str = "http://www.ama-assn.org/go/cpt";
const NDC_SYSTEM: &str = "http://hl7.org/fhir/sid/ndc";

/// Loads every configured SNOMED edition and registers a factory serving
/// all of them under one system URI, choosing among loaded editions by
/// the registry's usual version-selection precedence.
fn load_snomed_factory(config: &RegistryConfig) -> TerminologyResult<Option<SnomedFactory>> {
    if config.snomed.is_empty() {
        return Ok(None);
    }

    let mut editions = HashMap::new();
    let mut default_version = String::new();
    for edition in &config.snomed {
        tracing::info!(path = %edition.path, version = %edition.version, "loading SNOMED CT edition");
        let files = discover_rf2_files(&edition.path).map_err(TerminologyError::Rf2)?;
        let mut store = SnomedStore::new();
        store.load_all(&files).map_err(TerminologyError::Rf2)?;
        if let Err(e) = store.load_simple_refsets(&edition.path, Rf2Config::default()) {
            tracing::warn!(error = %e, "could not load reference sets for this edition");
        }
        tracing::info!(concepts = store.concept_ids().count(), version = %edition.version, "SNOMED CT edition loaded");
        default_version = edition.version.clone();
        editions.insert(edition.version.clone(), (Arc::new(store), edition.language.clone()));
    }

    Ok(Some(SnomedFactory { editions, default_version }))
}

struct SnomedFactory {
    editions: HashMap<String, (Arc<SnomedStore>, String)>,
    default_version: String,
}

impl ProviderFactory for SnomedFactory {
    fn system(&self) -> &str {
        "http://snomed.info/sct"
    }

    fn default_version(&self) -> &str {
        &self.default_version
    }

    fn available_versions(&self) -> Vec<String> {
        self.editions.keys().cloned().collect()
    }

    fn build(&self, version: &str) -> TerminologyResult<Box<dyn CodeSystemProvider>> {
        let (store, language) = self.editions.get(version).ok_or_else(|| TerminologyError::VersionMismatch {
            requested: version.to_string(),
            loaded: self.editions.keys().cloned().collect::<Vec<_>>().join(", "),
        })?;
        Ok(Box::new(SnomedProvider::new(Arc::clone(store), version.to_string(), language.clone())))
    }
}

/// A relational factory generic over which provider constructor to call,
/// one entry per `(version, db_path)` pair configured for its system.
struct RelationalFactory {
    system: String,
    default_version: String,
    entries: Vec<DatabaseConfig>,
    build_one: Box<dyn Fn(&DatabaseConfig, &str) -> Box<dyn CodeSystemProvider>>,
}

impl ProviderFactory for RelationalFactory {
    fn system(&self) -> &str {
        &self.system
    }

    fn default_version(&self) -> &str {
        &self.default_version
    }

    fn available_versions(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.version.clone()).collect()
    }

    fn build(&self, version: &str) -> TerminologyResult<Box<dyn CodeSystemProvider>> {
        let entry = self.entries.iter().find(|e| e.version == version).ok_or_else(|| TerminologyError::VersionMismatch {
            requested: version.to_string(),
            loaded: self.available_versions().join(", "),
        })?;
        Ok((self.build_one)(entry, version))
    }
}

fn group_by_system(databases: &[DatabaseConfig]) -> HashMap<String, Vec<DatabaseConfig>> {
    let mut groups: HashMap<String, Vec<DatabaseConfig>> = HashMap::new();
    for db in databases {
        groups.entry(db.system.clone()).or_default().push(db.clone());
    }
    groups
}

fn relational_factory(
    system: &str,
    entries: Vec<DatabaseConfig>,
    build_one: impl Fn(&DatabaseConfig, &str) -> Box<dyn CodeSystemProvider> + 'static,
) -> RelationalFactory {
    let default_version = entries.first().map(|e| e.version.clone()).unwrap_or_default();
    RelationalFactory {
        system: system.to_string(),
        default_version,
        entries,
        build_one: Box::new(build_one),
    }
}

/// Registers one factory per database group, dispatching on the group's
/// system URI (or, for anything unrecognised, treating it as an OMOP
/// vocabulary scoped by `vocabulary_id`).
fn register_relational_factories(registry: &mut ProviderRegistry, config: &RegistryConfig) -> TerminologyResult<()> {
    for (system, entries) in group_by_system(&config.databases) {
        let factory: Box<dyn ProviderFactory> = match system.as_str() {
            LOINC_SYSTEM => Box::new(relational_factory(&system, entries, |e, v| {
                Box::new(LoincProvider::new(e.path.clone(), v.to_string()))
            })),
            RXNORM_SYSTEM => Box::new(relational_factory(&system, entries, |e, v| {
                Box::new(RxNormProvider::new(e.path.clone(), v.to_string(), RxVocabulary::RxNorm))
            })),
            NCI_SYSTEM => Box::new(relational_factory(&system, entries, |e, v| {
                Box::new(RxNormProvider::new(e.path.clone(), v.to_string(), RxVocabulary::Nci))
            })),
            CPT_SYSTEM => Box::new(relational_factory(&system, entries, |e, v| {
                Box::new(CptProvider::new(e.path.clone(), v.to_string()))
            })),
            NDC_SYSTEM => Box::new(relational_factory(&system, entries, |e, v| {
                Box::new(NdcProvider::new(e.path.clone(), v.to_string()))
            })),
            _ => {
                let Some(vocabulary_id) = entries.first().and_then(|e| e.vocabulary_id.clone()) else {
                    tracing::warn!(system = %system, "unrecognised database system with no vocabulary_id, skipping");
                    continue;
                };
                Box::new(relational_factory(&system, entries, move |e, v| {
                    Box::new(OmopProvider::new(e.path.clone(), v.to_string(), vocabulary_id.clone()))
                }))
            }
        };
        tracing::info!(system = %system, "registering relational provider factory");
        registry.register(factory)?;
    }
    Ok(())
}

/// A zero-configuration factory for a provider with no database
/// (URI, MIME, IETF language, US states): it builds the same stateless
/// value every time, under a single fixed version `""`.
struct StaticFactory {
    system: String,
    build_one: fn() -> Box<dyn CodeSystemProvider>,
}

impl ProviderFactory for StaticFactory {
    fn system(&self) -> &str {
        &self.system
    }

    fn default_version(&self) -> &str {
        ""
    }

    fn available_versions(&self) -> Vec<String> {
        vec![String::new()]
    }

    fn build(&self, _version: &str) -> TerminologyResult<Box<dyn CodeSystemProvider>> {
        Ok((self.build_one)())
    }
}

struct HgvsFactory {
    base_url: String,
}

impl ProviderFactory for HgvsFactory {
    fn system(&self) -> &str {
        "http://varnomen.hgvs.org"
    }

    fn default_version(&self) -> &str {
        ""
    }

    fn available_versions(&self) -> Vec<String> {
        vec![String::new()]
    }

    fn build(&self, _version: &str) -> TerminologyResult<Box<dyn CodeSystemProvider>> {
        Ok(Box::new(HgvsProvider::new(self.base_url.clone())?))
    }
}

fn register_misc_factories(registry: &mut ProviderRegistry, config: &RegistryConfig) -> TerminologyResult<()> {
    registry.register(Box::new(StaticFactory {
        system: "urn:ietf:rfc:3986".to_string(),
        build_one: || Box::new(UriProvider),
    }))?;
    registry.register(Box::new(StaticFactory {
        system: "urn:ietf:bcp:13".to_string(),
        build_one: || Box::new(MimeProvider),
    }))?;
    registry.register(Box::new(StaticFactory {
        system: "urn:ietf:bcp:47".to_string(),
        build_one: || Box::new(IetfLanguageProvider),
    }))?;
    registry.register(Box::new(StaticFactory {
        system: "https://www.usps.com/".to_string(),
        build_one: || Box::new(UsStatesProvider),
    }))?;

    if let Some(hgvs) = &config.hgvs {
        tracing::info!(base_url = %hgvs.base_url, "registering HGVS validator factory");
        registry.register(Box::new(HgvsFactory { base_url: hgvs.base_url.clone() }))?;
    }

    for package in &config.external_packages {
        tracing::warn!(package = %package, "external package factories are not supported by this build; skipping");
    }

    Ok(())
}

/// Builds a fully populated registry from `config`: loads every
/// configured SNOMED edition, registers every relational-backed system's
/// factory, and registers the fixed set of in-memory providers.
pub fn build_registry(config: &RegistryConfig) -> TerminologyResult<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    if let Some(snomed_factory) = load_snomed_factory(config)? {
        tracing::info!("registering SNOMED CT provider factory");
        registry.register(Box::new(snomed_factory))?;
    }

    register_relational_factories(&mut registry, config)?;
    register_misc_factories(&mut registry, config)?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misc_factories_register_without_a_config_file() {
        let config = RegistryConfig::default();
        let mut registry = ProviderRegistry::new();
        register_misc_factories(&mut registry, &config).unwrap();
        let provider = registry.resolve("https://www.usps.com/", None).unwrap();
        assert!(provider.locate("CA").context.is_some());
    }

    #[test]
    fn relational_factories_group_entries_by_system() {
        let config = RegistryConfig {
            databases: vec![
                DatabaseConfig {
                    system: LOINC_SYSTEM.to_string(),
                    path: ":memory:".to_string(),
                    version: "2.78".to_string(),
                    vocabulary_id: None,
                },
                DatabaseConfig {
                    system: CPT_SYSTEM.to_string(),
                    path: ":memory:".to_string(),
                    version: "2024".to_string(),
                    vocabulary_id: None,
                },
            ],
            ..RegistryConfig::default()
        };
        let mut registry = ProviderRegistry::new();
        register_relational_factories(&mut registry, &config).unwrap();
        assert!(registry.resolve(LOINC_SYSTEM, Some("2.78")).is_ok());
        assert!(registry.resolve(CPT_SYSTEM, Some("2024")).is_ok());
    }

    #[test]
    fn unrecognised_system_without_vocabulary_id_is_skipped() {
        let config = RegistryConfig {
            databases: vec![DatabaseConfig {
                system: "http://example.org/unknown".to_string(),
                path: ":memory:".to_string(),
                version: "1".to_string(),
                vocabulary_id: None,
            }],
            ..RegistryConfig::default()
        };
        let mut registry = ProviderRegistry::new();
        register_relational_factories(&mut registry, &config).unwrap();
        assert!(registry.resolve("http://example.org/unknown", None).is_err());
    }
}
