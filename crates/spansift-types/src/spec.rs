//! Declarative per-provider specification documents.
//!
//! One document per provider, authored offline (TOML in the shipped
//! `specs/` directory) and consumed exactly once per build by the compiler.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A named vendor's full configuration: detection patterns, navigation
/// rules, field mappings, and transform parameterizations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub id: String,
    #[serde(default)]
    pub patterns: BTreeMap<String, Pattern>,
    #[serde(default)]
    pub rules: BTreeMap<String, NavigationRule>,
    #[serde(default)]
    pub mappings: SectionMappings,
    #[serde(default)]
    pub transforms: BTreeMap<String, TransformSpec>,
}

/// A detection pattern: the signature keys that identify one
/// provider+instrumentor combination, with a confidence weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Attribute keys that must all be present (set semantics, >= 2 keys).
    pub signature: Vec<String>,
    /// Keys that may also appear but do not affect matching.
    #[serde(default)]
    pub optional: Vec<String>,
    /// Confidence weight in [0, 1].
    pub confidence: f64,
    #[serde(default)]
    pub description: String,
    /// Which instrumentation library produced this attribute convention.
    pub instrumentor: String,
}

/// How to pull one value out of the raw attribute map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Copy the attribute verbatim.
    Direct { source: String },
    /// Rebuild an array from flattened indexed keys under `source`.
    Array { source: String },
    /// Parse a JSON-encoded string attribute, then project a JSON pointer.
    JsonPointer { source: String, pointer: String },
    /// First non-null attribute in the chain.
    FirstOf { sources: Vec<String> },
    /// Numeric sum over the listed attributes; missing terms contribute 0.
    Sum { sources: Vec<String> },
}

/// Value-shape check applied after extraction. Failure substitutes the
/// rule's fallback, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validator {
    NonEmpty,
    Numeric,
    Matches {
        pattern: String,
        #[serde(skip)]
        compiled: OnceCell<Option<Regex>>,
    },
}

impl Validator {
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Validator::NonEmpty => match value {
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                Value::Array(a) => !a.is_empty(),
                Value::Object(o) => !o.is_empty(),
                _ => true,
            },
            Validator::Numeric => value.is_number(),
            Validator::Matches { pattern, compiled } => {
                // Pattern syntax is checked at compile time; a bad pattern
                // that slipped through just fails the value.
                let regex = compiled.get_or_init(|| Regex::new(pattern).ok());
                match (regex, value.as_str()) {
                    (Some(re), Some(s)) => re.is_match(s),
                    _ => false,
                }
            }
        }
    }
}

/// A named navigation rule. Immutable after compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationRule {
    #[serde(flatten)]
    pub method: ExtractionMethod,
    /// Substituted on missing source or failed validation.
    #[serde(default)]
    pub fallback: Option<Value>,
    #[serde(default)]
    pub validator: Option<Validator>,
}

/// Canonical field -> rule-or-transform binding.
///
/// Exactly one of `source` (base rule name) or `transform` must be set;
/// the compiler rejects anything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub transform: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// The four canonical sections of field mappings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionMappings {
    #[serde(default)]
    pub inputs: BTreeMap<String, FieldMapping>,
    #[serde(default)]
    pub outputs: BTreeMap<String, FieldMapping>,
    #[serde(default)]
    pub config: BTreeMap<String, FieldMapping>,
    #[serde(default)]
    pub metadata: BTreeMap<String, FieldMapping>,
}

/// Directional token rates in USD per 1e6 tokens.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PricingRate {
    pub input: f64,
    pub output: f64,
}

/// One priority-ordered probe for instrumentor detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentorProbe {
    pub instrumentor: String,
    /// All of these keys must be present for the probe to fire.
    pub keys: Vec<String>,
}

/// The closed transform catalog. Parameterized data, never user code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSpec {
    /// Join the `content` of messages whose `role` matches.
    ExtractByRole {
        role: String,
        messages_field: String,
        #[serde(default = "default_separator")]
        separator: String,
    },
    /// Project one field out of each element of a flattened array.
    ExtractFieldFromArray {
        source_field: String,
        extract_field: String,
        #[serde(default)]
        flatten: bool,
    },
    /// Table lookup on the string value of an attribute.
    NormalizeByTable {
        source_field: String,
        table: BTreeMap<String, String>,
        #[serde(default)]
        default: Option<String>,
    },
    /// tokens / 1e6 * rate per direction; unknown model uses the fallback
    /// rate, missing token counts cost zero.
    CalculateCost {
        model_field: String,
        prompt_tokens_field: String,
        completion_tokens_field: String,
        #[serde(default)]
        pricing: BTreeMap<String, PricingRate>,
        #[serde(default)]
        fallback_rate: PricingRate,
    },
    /// First candidate whose key subset is present wins.
    DetectInstrumentor { candidates: Vec<InstrumentorProbe> },
    /// A bound constant.
    StaticConstant { value: Value },
}

fn default_separator() -> String {
    "\n".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_spec_parses_from_toml() {
        let doc = r#"
            id = "openai"

            [patterns.chat]
            signature = ["gen_ai.system", "gen_ai.request.model"]
            optional = ["gen_ai.response.id"]
            confidence = 0.9
            description = "OTel GenAI chat"
            instrumentor = "otel_genai"

            [rules."otel_genai.model_name"]
            method = "direct"
            source = "gen_ai.request.model"
            fallback = "unknown"
            validator = { kind = "non_empty" }

            [mappings.config.model]
            source = "model_name"
            required = true

            [transforms.cost]
            kind = "calculate_cost"
            model_field = "gen_ai.request.model"
            prompt_tokens_field = "gen_ai.usage.input_tokens"
            completion_tokens_field = "gen_ai.usage.output_tokens"
            fallback_rate = { input = 1.0, output = 3.0 }

            [transforms.cost.pricing."gpt-4o"]
            input = 2.5
            output = 10.0
        "#;

        let spec: ProviderSpec = toml::from_str(doc).expect("spec parses");
        assert_eq!(spec.id, "openai");
        assert_eq!(spec.patterns["chat"].signature.len(), 2);
        assert!(matches!(
            spec.rules["otel_genai.model_name"].method,
            ExtractionMethod::Direct { .. }
        ));
        assert!(spec.mappings.config["model"].required);
        match &spec.transforms["cost"] {
            TransformSpec::CalculateCost { pricing, .. } => {
                assert_eq!(pricing["gpt-4o"].input, 2.5);
            }
            other => panic!("unexpected transform: {:?}", other),
        }
    }

    #[test]
    fn validators_check_value_shape() {
        assert!(Validator::NonEmpty.check(&json!("x")));
        assert!(!Validator::NonEmpty.check(&json!("")));
        assert!(!Validator::NonEmpty.check(&Value::Null));
        assert!(Validator::Numeric.check(&json!(3)));
        assert!(!Validator::Numeric.check(&json!("3")));

        let matches = Validator::Matches {
            pattern: "^gpt-".to_string(),
            compiled: OnceCell::new(),
        };
        assert!(matches.check(&json!("gpt-4o")));
        assert!(!matches.check(&json!("claude-3")));
        assert!(!matches.check(&json!(42)));
    }
}
