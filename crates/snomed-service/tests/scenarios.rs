//! End-to-end scenarios driven through the registry bootstrap or
//! directly against the crates it wires together, one per documented
//! scenario.

use std::collections::BTreeSet;

use snomed_loader::SnomedStore;
use snomed_provider::contract::CodeSystemProvider;
use snomed_provider::snomed::SnomedProvider;
use snomed_service::config::{DatabaseConfig, RegistryConfig};
use snomed_service::build_registry;
use snomed_types::{CharacteristicType, DefinitionStatus, DescriptionType, ModifierType, Rf2Concept, Rf2Description, Rf2Relationship};

const IS_A: u64 = 116680003;

fn concept(id: u64) -> Rf2Concept {
    Rf2Concept {
        id,
        effective_time: 20240101,
        active: true,
        module_id: 900000000000207008,
        definition_status_id: DefinitionStatus::PRIMITIVE_ID,
    }
}

fn description(id: u64, concept_id: u64, term: &str) -> Rf2Description {
    Rf2Description {
        id,
        effective_time: 20240101,
        active: true,
        module_id: 900000000000207008,
        concept_id,
        language_code: "en".to_string(),
        type_id: DescriptionType::Fsn.to_id(),
        term: term.to_string(),
        case_significance_id: 900000000000448009,
    }
}

fn is_a(id: u64, source_id: u64, destination_id: u64) -> Rf2Relationship {
    Rf2Relationship {
        id,
        effective_time: 20240101,
        active: true,
        module_id: 900000000000207008,
        source_id,
        destination_id,
        relationship_group: 0,
        type_id: IS_A,
        characteristic_type_id: CharacteristicType::INFERRED_ID,
        modifier_id: ModifierType::EXISTENTIAL_ID,
    }
}

/// A small hierarchy rooted at `138875005 |SNOMED CT Concept|`, with
/// `404684003 |Clinical finding|` → `73211009 |Diabetes mellitus|` on one
/// branch and the two ECL-scenario roots (`19829001`, `301867009`) with a
/// shared descendant on the other, so the ECL intersection scenario has
/// something real to intersect.
fn seeded_store() -> SnomedStore {
    let mut store = SnomedStore::new();
    let ids = [
        138875005,
        404684003,
        73211009,
        19829001,
        301867009,
        64572001,
        40617009,
    ];
    store.insert_concepts(ids.iter().map(|&id| concept(id)));
    store.insert_descriptions([
        description(1388750050, 138875005, "SNOMED CT Concept (SNOMED RT+CTV3)"),
        description(4046840030, 404684003, "Clinical finding (finding)"),
        description(732110090, 73211009, "Diabetes mellitus (disorder)"),
        description(198290010, 19829001, "Disorder of lung (disorder)"),
        description(3018670090, 301867009, "Disorder of respiratory system (disorder)"),
        description(645720010, 64572001, "Disease (disorder)"),
        description(406170090, 40617009, "Pulmonary lesion (disorder)"),
    ]);
    store.insert_relationships([
        is_a(1, 73211009, 404684003),
        is_a(2, 404684003, 138875005),
        is_a(3, 19829001, 64572001),
        is_a(4, 301867009, 64572001),
        is_a(5, 40617009, 19829001),
        is_a(6, 40617009, 301867009),
    ]);
    store
}

#[test]
fn scenario_snomed_simple_lookup() {
    let provider = SnomedProvider::new(std::sync::Arc::new(seeded_store()), "2024-01-01", "en");

    let result = provider.locate("73211009");
    let handle = result.context.expect("73211009 should resolve");
    assert_eq!(provider.display(&handle).as_deref(), Some("Diabetes mellitus (disorder)"));

    let ancestor = provider.locate("404684003").context.expect("404684003 should resolve");
    assert!(provider.subsumes_test(&ancestor, &handle));
}

#[test]
fn scenario_ecl_compound_intersects_two_subtrees() {
    let store = seeded_store();
    let lung_disorders = snomed_ecl::evaluate_str("<< 19829001", &store).unwrap();
    let respiratory_disorders = snomed_ecl::evaluate_str("<< 301867009", &store).unwrap();
    let compound = snomed_ecl::evaluate_str("<< 19829001 AND << 301867009", &store).unwrap();

    let expected: BTreeSet<u64> = lung_disorders.intersection(&respiratory_disorders).copied().collect();
    assert_eq!(compound, expected);
    assert!(compound.contains(&40617009), "the shared descendant must be in both subtrees' intersection");
}

#[test]
fn scenario_loinc_filter_composition_through_the_registry() {
    let dir = std::env::temp_dir().join(format!("snomed-service-loinc-{}.db", std::process::id()));
    {
        let conn = rusqlite::Connection::open(&dir).unwrap();
        snomed_relational::LoincProvider::init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO loinc_concepts (code, long_common_name, status, classtype) VALUES
             ('4548-4', 'Hemoglobin A1c/Hemoglobin.total in Blood', 'ACTIVE', 1),
             ('8302-2', 'Body height', 'ACTIVE', 2),
             ('1234-5', 'Inactive test code', 'DEPRECATED', 1)",
            [],
        )
        .unwrap();
    }

    let config = RegistryConfig {
        databases: vec![DatabaseConfig {
            system: "http://loinc.org".to_string(),
            path: dir.to_string_lossy().to_string(),
            version: "2.78".to_string(),
            vocabulary_id: None,
        }],
        ..RegistryConfig::default()
    };
    let registry = build_registry(&config).unwrap();
    let provider = registry.resolve("http://loinc.org", None).unwrap();

    let mut ctx = provider.prep_context(false);
    provider.filter(&mut ctx, "STATUS", "=", "ACTIVE").unwrap();
    provider.filter(&mut ctx, "CLASSTYPE", "=", "Laboratory class").unwrap();
    provider.execute_filters(&mut ctx).unwrap();

    assert_eq!(ctx.results, vec!["4548-4".to_string()]);
    assert!(provider.filter_locate(&ctx, "4548-4").context.is_some());
    assert!(provider.filter_locate(&ctx, "1234-5").context.is_none());

    let _ = std::fs::remove_file(&dir);
}

#[test]
fn bootstrap_registers_every_built_in_misc_provider() {
    let registry = build_registry(&RegistryConfig::default()).unwrap();
    for system in ["urn:ietf:rfc:3986", "urn:ietf:bcp:13", "urn:ietf:bcp:47", "https://www.usps.com/"] {
        assert!(registry.resolve(system, None).is_ok(), "{system} should always be registered");
    }
}
