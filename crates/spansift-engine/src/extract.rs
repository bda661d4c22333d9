use crate::transform::{DirectResolver, TransformResolver};
use serde_json::{Value, json};
use spansift_types::{
    AttributeMap, CompiledBundle, CompiledProvider, ExtractionMethod, ExtractionResult,
    NavigationRule, Section, UNKNOWN_MODEL, rebuild_indexed_array,
};

/// Project a classified attribute map into the canonical four-section
/// record. Pure, no side effects; transforms are compiled per call.
pub fn extract(
    bundle: &CompiledBundle,
    provider_id: &str,
    instrumentor: &str,
    attrs: &AttributeMap,
) -> ExtractionResult {
    extract_with(bundle, provider_id, instrumentor, attrs, &DirectResolver)
}

/// As `extract`, with transform resolution delegated (the runtime layer
/// passes its memoizing cache here).
///
/// Every failure mode degrades: a missing source or failed validator
/// substitutes the rule's fallback, an unknown provider or instrumentor
/// yields only the required floor. Nothing on this path panics.
pub fn extract_with(
    bundle: &CompiledBundle,
    provider_id: &str,
    instrumentor: &str,
    attrs: &AttributeMap,
    resolver: &dyn TransformResolver,
) -> ExtractionResult {
    let mut result = ExtractionResult::default();

    if let Some(provider) = bundle.provider(provider_id) {
        let routes = provider.routing.get(instrumentor);

        for section in Section::ALL {
            let mappings = match section {
                Section::Inputs => &provider.mappings.inputs,
                Section::Outputs => &provider.mappings.outputs,
                Section::Config => &provider.mappings.config,
                Section::Metadata => &provider.mappings.metadata,
            };

            for (field, mapping) in mappings {
                let value = if let Some(base) = &mapping.source {
                    routes
                        .and_then(|table| table.get(base))
                        .and_then(|concrete| provider.rules.get(concrete))
                        .and_then(|rule| apply_rule(rule, attrs))
                } else if let Some(name) = &mapping.transform {
                    provider
                        .transforms
                        .get(name)
                        .and_then(|spec| resolver.resolve(provider_id, name, spec).apply(attrs))
                } else {
                    None
                };

                if let Some(value) = value {
                    result.section_mut(section).insert(field.clone(), value);
                }
            }
        }

        ensure_required(&mut result, provider, provider_id);
    } else {
        required_floor(&mut result, provider_id);
    }

    result
}

/// Apply one navigation rule: extraction method, then validator, then
/// the declared fallback on any miss.
fn apply_rule(rule: &NavigationRule, attrs: &AttributeMap) -> Option<Value> {
    let extracted = apply_method(&rule.method, attrs).filter(|value| {
        rule.validator
            .as_ref()
            .is_none_or(|validator| validator.check(value))
    });
    extracted.or_else(|| rule.fallback.clone())
}

fn apply_method(method: &ExtractionMethod, attrs: &AttributeMap) -> Option<Value> {
    match method {
        ExtractionMethod::Direct { source } => non_null(attrs.get(source)),
        ExtractionMethod::Array { source } => rebuild_indexed_array(attrs, source),
        ExtractionMethod::JsonPointer { source, pointer } => {
            let raw = attrs.get(source)?;
            match raw {
                Value::String(encoded) => {
                    let parsed: Value = serde_json::from_str(encoded).ok()?;
                    non_null(parsed.pointer(pointer))
                }
                // Already-structured attributes project directly.
                other => non_null(other.pointer(pointer)),
            }
        }
        ExtractionMethod::FirstOf { sources } => {
            sources.iter().find_map(|source| non_null(attrs.get(source)))
        }
        ExtractionMethod::Sum { sources } => {
            let mut sum = 0.0;
            let mut present = false;
            for source in sources {
                let Some(value) = attrs.get(source) else {
                    continue;
                };
                present = true;
                // Non-numeric terms contribute zero rather than poisoning
                // the sum.
                sum += value
                    .as_f64()
                    .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                    .unwrap_or(0.0);
            }
            if !present {
                return None;
            }
            if sum.fract() == 0.0 && sum.abs() < i64::MAX as f64 {
                Some(json!(sum as i64))
            } else {
                Some(json!(sum))
            }
        }
    }
}

fn non_null(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

/// The canonical provider and model identifiers are never left absent.
fn ensure_required(result: &mut ExtractionResult, provider: &CompiledProvider, provider_id: &str) {
    result
        .metadata
        .entry("provider".to_string())
        .or_insert_with(|| json!(provider_id));

    if !result.config.contains_key("model") {
        // Prefer the model rule's own declared fallback over the generic
        // sentinel.
        let fallback = provider
            .mappings
            .config
            .get("model")
            .and_then(|mapping| mapping.source.as_ref())
            .and_then(|base| model_rule_fallback(provider, base));
        result.config.insert(
            "model".to_string(),
            fallback.unwrap_or_else(|| json!(UNKNOWN_MODEL)),
        );
    }
}

fn model_rule_fallback(provider: &CompiledProvider, base: &str) -> Option<Value> {
    provider
        .routing
        .values()
        .filter_map(|table| table.get(base))
        .filter_map(|concrete| provider.rules.get(concrete))
        .find_map(|rule| rule.fallback.clone())
}

fn required_floor(result: &mut ExtractionResult, provider_id: &str) {
    result
        .metadata
        .insert("provider".to_string(), json!(provider_id));
    result
        .config
        .insert("model".to_string(), json!(UNKNOWN_MODEL));
}
