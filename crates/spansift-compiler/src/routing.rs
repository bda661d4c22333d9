use crate::error::CompilationError;
use spansift_types::{ProviderSpec, RoutingTable};
use std::collections::BTreeSet;

/// Precompute the (instrumentor x base name) -> concrete rule routing
/// table for one provider.
///
/// The instrumentor-prefixed rule `{instrumentor}.{base}` is preferred;
/// a bare `{base}` rule is the shared fallback. Runtime resolution is a
/// pure table lookup, never string composition.
///
/// A required mapping that resolves to nothing for some declared
/// instrumentor is a compilation error; an optional one is simply absent
/// from the table (the field stays unset for that instrumentor).
pub fn build_routing(spec: &ProviderSpec) -> (RoutingTable, Vec<CompilationError>) {
    let mut table = RoutingTable::new();
    let mut errors = Vec::new();

    let instrumentors: BTreeSet<&str> = spec
        .patterns
        .values()
        .map(|p| p.instrumentor.as_str())
        .filter(|tag| !tag.is_empty())
        .collect();

    let sections = [
        ("inputs", &spec.mappings.inputs),
        ("outputs", &spec.mappings.outputs),
        ("config", &spec.mappings.config),
        ("metadata", &spec.mappings.metadata),
    ];

    for instrumentor in instrumentors {
        let routes = table.entry(instrumentor.to_string()).or_default();

        for (section, mappings) in &sections {
            for (field, mapping) in mappings.iter() {
                let Some(base) = &mapping.source else {
                    continue;
                };
                let prefixed = format!("{}.{}", instrumentor, base);
                if spec.rules.contains_key(&prefixed) {
                    routes.insert(base.clone(), prefixed);
                } else if spec.rules.contains_key(base) {
                    routes.insert(base.clone(), base.clone());
                } else if mapping.required {
                    errors.push(CompilationError::UnresolvedRule {
                        provider: spec.id.clone(),
                        field: format!("{}.{}", section, field),
                        base: base.clone(),
                        instrumentor: instrumentor.to_string(),
                    });
                }
            }
        }
    }

    (table, errors)
}
