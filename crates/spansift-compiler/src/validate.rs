use crate::error::CompilationError;
use regex::Regex;
use spansift_types::{FieldMapping, ProviderSpec, Validator};

/// Validate one provider specification, collecting every violation.
///
/// Never fails fast: the caller aggregates violations across all specs so
/// the operator sees the full defect list in a single compile attempt.
pub fn validate_spec(spec: &ProviderSpec) -> Vec<CompilationError> {
    let mut errors = Vec::new();

    for (name, pattern) in &spec.patterns {
        let distinct = {
            let mut keys = pattern.signature.clone();
            keys.sort();
            keys.dedup();
            keys.len()
        };
        if distinct < 2 {
            errors.push(CompilationError::SignatureTooSmall {
                provider: spec.id.clone(),
                pattern: name.clone(),
                len: distinct,
            });
        }
        if !(0.0..=1.0).contains(&pattern.confidence) {
            errors.push(CompilationError::ConfidenceOutOfRange {
                provider: spec.id.clone(),
                pattern: name.clone(),
                confidence: pattern.confidence,
            });
        }
        if pattern.instrumentor.trim().is_empty() {
            errors.push(CompilationError::MissingInstrumentor {
                provider: spec.id.clone(),
                pattern: name.clone(),
            });
        }
    }

    for (section, mappings) in [
        ("inputs", &spec.mappings.inputs),
        ("outputs", &spec.mappings.outputs),
        ("config", &spec.mappings.config),
        ("metadata", &spec.mappings.metadata),
    ] {
        for (field, mapping) in mappings {
            validate_mapping(spec, section, field, mapping, &mut errors);
        }
    }

    for (rule_name, rule) in &spec.rules {
        if let Some(Validator::Matches { pattern, .. }) = &rule.validator
            && let Err(err) = Regex::new(pattern)
        {
            errors.push(CompilationError::InvalidValidatorPattern {
                provider: spec.id.clone(),
                rule: rule_name.clone(),
                pattern: pattern.clone(),
                message: err.to_string(),
            });
        }
    }

    errors
}

fn validate_mapping(
    spec: &ProviderSpec,
    section: &str,
    field: &str,
    mapping: &FieldMapping,
    errors: &mut Vec<CompilationError>,
) {
    match (&mapping.source, &mapping.transform) {
        (Some(_), Some(_)) | (None, None) => {
            errors.push(CompilationError::AmbiguousMapping {
                provider: spec.id.clone(),
                section: section.to_string(),
                field: field.to_string(),
            });
        }
        (None, Some(transform)) => {
            if !spec.transforms.contains_key(transform) {
                errors.push(CompilationError::UnresolvedTransform {
                    provider: spec.id.clone(),
                    field: format!("{}.{}", section, field),
                    transform: transform.clone(),
                });
            }
        }
        // Rule-backed mappings are resolved per instrumentor by the
        // routing pass, which reports its own unresolved-rule errors.
        (Some(_), None) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broken_spec() -> ProviderSpec {
        toml::from_str(
            r#"
            id = "broken"

            [patterns.tiny]
            signature = ["only_one"]
            confidence = 1.5
            instrumentor = ""

            [mappings.config.model]
            required = true

            [mappings.outputs.cost]
            transform = "nonexistent"

            [rules.bad_regex]
            method = "direct"
            source = "x"
            validator = { kind = "matches", pattern = "(" }
        "#,
        )
        .unwrap()
    }

    #[test]
    fn all_violations_are_collected_in_one_pass() {
        let errors = validate_spec(&broken_spec());

        // One tiny-signature, one confidence, one instrumentor, one
        // ambiguous mapping, one unresolved transform, one bad regex.
        assert_eq!(errors.len(), 6);
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, CompilationError::SignatureTooSmall { len: 1, .. }))
        );
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, CompilationError::ConfidenceOutOfRange { .. }))
        );
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, CompilationError::InvalidValidatorPattern { .. }))
        );
    }

    #[test]
    fn duplicate_signature_keys_count_once() {
        let spec: ProviderSpec = toml::from_str(
            r#"
            id = "p"

            [patterns.dup]
            signature = ["a", "a"]
            confidence = 0.5
            instrumentor = "x"
        "#,
        )
        .unwrap();

        let errors = validate_spec(&spec);
        assert!(matches!(
            errors.as_slice(),
            [CompilationError::SignatureTooSmall { len: 1, .. }]
        ));
    }
}
