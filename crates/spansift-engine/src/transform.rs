//! The runtime transform catalog.
//!
//! A closed set of parameterized transforms compiled from `TransformSpec`
//! data - enum dispatch, never generated or evaluated code. Compiled
//! transforms are pure functions of the attribute map, so memoizing them
//! per (provider, name) key is safe.

use serde_json::{Value, json};
use spansift_types::{AttributeMap, TransformSpec, rebuild_indexed_array};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A transform bound to its catalog kind and parameters.
#[derive(Debug, Clone)]
pub struct CompiledTransform {
    op: Op,
}

#[derive(Debug, Clone)]
enum Op {
    ByRole {
        role: String,
        messages_field: String,
        separator: String,
    },
    FieldFromArray {
        source_field: String,
        extract_field: String,
        flatten: bool,
    },
    NormalizeTable {
        source_field: String,
        table: BTreeMap<String, String>,
        default: Option<String>,
    },
    Cost {
        model_field: String,
        prompt_tokens_field: String,
        completion_tokens_field: String,
        pricing: BTreeMap<String, (f64, f64)>,
        fallback_rate: (f64, f64),
    },
    Instrumentor {
        /// Priority-ordered (tag, required keys) probes.
        candidates: Vec<(String, Vec<String>)>,
    },
    Constant {
        value: Value,
    },
}

impl CompiledTransform {
    pub fn compile(spec: &TransformSpec) -> Self {
        let op = match spec {
            TransformSpec::ExtractByRole {
                role,
                messages_field,
                separator,
            } => Op::ByRole {
                role: role.clone(),
                messages_field: messages_field.clone(),
                separator: separator.clone(),
            },
            TransformSpec::ExtractFieldFromArray {
                source_field,
                extract_field,
                flatten,
            } => Op::FieldFromArray {
                source_field: source_field.clone(),
                extract_field: extract_field.clone(),
                flatten: *flatten,
            },
            TransformSpec::NormalizeByTable {
                source_field,
                table,
                default,
            } => Op::NormalizeTable {
                source_field: source_field.clone(),
                table: table.clone(),
                default: default.clone(),
            },
            TransformSpec::CalculateCost {
                model_field,
                prompt_tokens_field,
                completion_tokens_field,
                pricing,
                fallback_rate,
            } => Op::Cost {
                model_field: model_field.clone(),
                prompt_tokens_field: prompt_tokens_field.clone(),
                completion_tokens_field: completion_tokens_field.clone(),
                pricing: pricing
                    .iter()
                    .map(|(model, rate)| (model.clone(), (rate.input, rate.output)))
                    .collect(),
                fallback_rate: (fallback_rate.input, fallback_rate.output),
            },
            TransformSpec::DetectInstrumentor { candidates } => Op::Instrumentor {
                candidates: candidates
                    .iter()
                    .map(|probe| (probe.instrumentor.clone(), probe.keys.clone()))
                    .collect(),
            },
            TransformSpec::StaticConstant { value } => Op::Constant {
                value: value.clone(),
            },
        };
        CompiledTransform { op }
    }

    /// Apply the transform to the full attribute map. Never errors: an
    /// inapplicable transform simply yields `None`.
    pub fn apply(&self, attrs: &AttributeMap) -> Option<Value> {
        match &self.op {
            Op::ByRole {
                role,
                messages_field,
                separator,
            } => {
                let messages = array_at(attrs, messages_field)?;
                let parts: Vec<&str> = messages
                    .iter()
                    .filter(|m| m.get("role").and_then(Value::as_str) == Some(role))
                    .filter_map(|m| m.get("content").and_then(Value::as_str))
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(Value::String(parts.join(separator)))
                }
            }
            Op::FieldFromArray {
                source_field,
                extract_field,
                flatten,
            } => {
                let elements = array_at(attrs, source_field)?;
                let mut projected = Vec::new();
                for element in &elements {
                    let Some(value) = project(element, extract_field) else {
                        continue;
                    };
                    match value {
                        Value::Array(inner) if *flatten => projected.extend(inner.clone()),
                        other => projected.push(other.clone()),
                    }
                }
                Some(Value::Array(projected))
            }
            Op::NormalizeTable {
                source_field,
                table,
                default,
            } => {
                let raw = attrs.get(source_field).and_then(Value::as_str);
                match raw {
                    Some(raw) => {
                        let normalized = table
                            .get(raw)
                            .cloned()
                            .or_else(|| default.clone())
                            .unwrap_or_else(|| raw.to_string());
                        Some(Value::String(normalized))
                    }
                    None => default.clone().map(Value::String),
                }
            }
            Op::Cost {
                model_field,
                prompt_tokens_field,
                completion_tokens_field,
                pricing,
                fallback_rate,
            } => {
                // Missing token counts cost zero; an unknown model takes
                // the declared fallback rate. Never an error.
                let (input_rate, output_rate) = attrs
                    .get(model_field)
                    .and_then(Value::as_str)
                    .and_then(|model| pricing.get(model).copied())
                    .unwrap_or(*fallback_rate);
                let prompt = number_at(attrs, prompt_tokens_field).unwrap_or(0.0);
                let completion = number_at(attrs, completion_tokens_field).unwrap_or(0.0);
                let cost = prompt / 1e6 * input_rate + completion / 1e6 * output_rate;
                Some(json!(cost))
            }
            Op::Instrumentor { candidates } => candidates
                .iter()
                .find(|(_, keys)| keys.iter().all(|k| attrs.contains_key(k)))
                .map(|(tag, _)| Value::String(tag.clone())),
            Op::Constant { value } => Some(value.clone()),
        }
    }
}

/// Resolves (provider, transform-name) to a compiled transform. The
/// runtime layer backs this with a concurrency-safe memo cache; the
/// direct resolver recompiles per call and exists for tests and
/// resolver-less extraction.
pub trait TransformResolver {
    fn resolve(&self, provider: &str, name: &str, spec: &TransformSpec) -> Arc<CompiledTransform>;
}

pub struct DirectResolver;

impl TransformResolver for DirectResolver {
    fn resolve(&self, _provider: &str, _name: &str, spec: &TransformSpec) -> Arc<CompiledTransform> {
        Arc::new(CompiledTransform::compile(spec))
    }
}

/// Read an array-valued field: flattened indexed keys first, then a
/// verbatim array attribute, then a JSON-encoded string.
fn array_at(attrs: &AttributeMap, field: &str) -> Option<Vec<Value>> {
    if let Some(Value::Array(elements)) = rebuild_indexed_array(attrs, field) {
        return Some(elements);
    }
    match attrs.get(field)? {
        Value::Array(elements) => Some(elements.clone()),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Array(elements)) => Some(elements),
            _ => None,
        },
        _ => None,
    }
}

/// Walk a dotted path into one array element.
fn project<'a>(element: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = element;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    if current.is_null() { None } else { Some(current) }
}

fn number_at(attrs: &AttributeMap, field: &str) -> Option<f64> {
    match attrs.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
