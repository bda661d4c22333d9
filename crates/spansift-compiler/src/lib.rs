// Spec compiler - turns declarative provider documents into the compiled
// bundle artifact consumed by the detection/extraction runtime.

pub mod docs;
pub mod error;
pub mod index;
pub mod routing;
pub mod validate;

pub use docs::{load_spec_dir, parse_spec};
pub use error::{CollisionWarning, CompilationError, CompileFailure};

use chrono::Utc;
use spansift_types::{BuildMetadata, CompiledBundle, CompiledProvider, ProviderSpec};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Compiler output: the bundle plus the non-fatal collision diagnostics
/// gathered while building the inverted index.
#[derive(Debug)]
pub struct CompileReport {
    pub bundle: CompiledBundle,
    pub warnings: Vec<CollisionWarning>,
}

/// Compile provider specifications into a single immutable bundle.
///
/// All schema violations across all specs are collected before failing,
/// never fail-fast on the first one. Signature collisions are non-fatal
/// and resolved by confidence (see `index::build_indices`).
pub fn compile(specs: &[ProviderSpec]) -> Result<CompileReport, CompileFailure> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.id.as_str()) {
            errors.push(CompilationError::DuplicateProvider {
                provider: spec.id.clone(),
            });
        }
        errors.extend(validate::validate_spec(spec));
    }

    let mut providers = BTreeMap::new();
    for spec in specs {
        let (routing, routing_errors) = routing::build_routing(spec);
        errors.extend(routing_errors);
        providers.insert(
            spec.id.clone(),
            CompiledProvider {
                rules: spec.rules.clone(),
                mappings: spec.mappings.clone(),
                routing,
                transforms: spec.transforms.clone(),
            },
        );
    }

    if !errors.is_empty() {
        return Err(CompileFailure { errors });
    }

    let (forward, inverted, warnings) = index::build_indices(specs);

    let metadata = BuildMetadata {
        built_at: Utc::now(),
        version: format!("spansift-{}", env!("CARGO_PKG_VERSION")),
        provider_count: providers.len(),
        signature_count: inverted.len(),
    };

    let bundle = CompiledBundle::new(forward, inverted, providers, metadata);
    Ok(CompileReport { bundle, warnings })
}

/// Compile every specification document found in a directory.
pub fn compile_dir(dir: &Path) -> Result<CompileReport, CompileFailure> {
    let specs = load_spec_dir(dir)?;
    compile(&specs)
}
