//! Registry bootstrap binary: loads a [`snomed_service::RegistryConfig`],
//! builds a provider registry, and drives a handful of representative
//! lookups through it as a smoke test — not a network server, since the
//! transport this core is consumed through is out of scope for it.

use snomed_provider::contract::CodeSystemProvider;
use snomed_service::{build_registry, RegistryConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("loading registry configuration");
    let config = RegistryConfig::load_default()?;

    tracing::info!(
        snomed_editions = config.snomed.len(),
        databases = config.databases.len(),
        "building provider registry"
    );
    let registry = build_registry(&config)?;

    if let Ok(provider) = registry.resolve("http://snomed.info/sct", None) {
        demonstrate_snomed(provider.as_ref());
    } else {
        tracing::info!("no SNOMED edition configured; skipping the SNOMED demonstration");
    }

    if let Ok(provider) = registry.resolve("https://www.usps.com/", None) {
        let result = provider.locate("CA");
        tracing::info!(found = result.context.is_some(), "located USPS state code CA");
    }

    tracing::info!("registry ready");
    Ok(())
}

fn demonstrate_snomed(provider: &dyn CodeSystemProvider) {
    let result = provider.locate("73211009");
    let Some(handle) = result.context else {
        tracing::warn!(message = %result.message, "SNOMED concept 73211009 did not resolve");
        return;
    };
    let display_value = provider.display(&handle);
    tracing::info!(code = "73211009", display = ?display_value, "located SNOMED concept");

    let ancestor = provider.locate("64572001");
    if let Some(ancestor_handle) = ancestor.context {
        let subsumes = provider.subsumes_test(&ancestor_handle, &handle);
        tracing::info!(subsumes, "64572001 |Disease| subsumes 73211009 |Diabetes mellitus|");
    }
}
