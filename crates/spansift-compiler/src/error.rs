use spansift_types::Signature;
use std::fmt;

/// One schema violation found while compiling provider specifications.
///
/// Violations are collected across the whole input before compilation
/// fails, so operators see the full defect list in one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum CompilationError {
    /// Signature must carry at least two attribute keys.
    SignatureTooSmall {
        provider: String,
        pattern: String,
        len: usize,
    },

    /// Confidence weight outside [0, 1].
    ConfidenceOutOfRange {
        provider: String,
        pattern: String,
        confidence: f64,
    },

    /// Pattern is missing its instrumentor tag.
    MissingInstrumentor { provider: String, pattern: String },

    /// Field mapping must name exactly one of `source` or `transform`.
    AmbiguousMapping {
        provider: String,
        section: String,
        field: String,
    },

    /// A required rule-backed mapping has no concrete rule for an
    /// instrumentor the provider's patterns declare.
    UnresolvedRule {
        provider: String,
        field: String,
        base: String,
        instrumentor: String,
    },

    /// A mapping references a transform the provider does not define.
    UnresolvedTransform {
        provider: String,
        field: String,
        transform: String,
    },

    /// A `matches` validator carries an invalid regular expression.
    InvalidValidatorPattern {
        provider: String,
        rule: String,
        pattern: String,
        message: String,
    },

    /// Two specification documents declare the same provider id.
    DuplicateProvider { provider: String },

    /// A specification document could not be read or parsed.
    Document { file: String, message: String },
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilationError::SignatureTooSmall {
                provider,
                pattern,
                len,
            } => write!(
                f,
                "{}/{}: signature has {} key(s), need at least 2",
                provider, pattern, len
            ),
            CompilationError::ConfidenceOutOfRange {
                provider,
                pattern,
                confidence,
            } => write!(
                f,
                "{}/{}: confidence {} outside [0, 1]",
                provider, pattern, confidence
            ),
            CompilationError::MissingInstrumentor { provider, pattern } => {
                write!(f, "{}/{}: instrumentor tag is empty", provider, pattern)
            }
            CompilationError::AmbiguousMapping {
                provider,
                section,
                field,
            } => write!(
                f,
                "{}/{}.{}: mapping must name exactly one of source or transform",
                provider, section, field
            ),
            CompilationError::UnresolvedRule {
                provider,
                field,
                base,
                instrumentor,
            } => write!(
                f,
                "{}/{}: no rule '{}.{}' or '{}' for required mapping",
                provider, field, instrumentor, base, base
            ),
            CompilationError::UnresolvedTransform {
                provider,
                field,
                transform,
            } => write!(
                f,
                "{}/{}: transform '{}' is not defined",
                provider, field, transform
            ),
            CompilationError::InvalidValidatorPattern {
                provider,
                rule,
                pattern,
                message,
            } => write!(
                f,
                "{}/{}: invalid validator pattern '{}': {}",
                provider, rule, pattern, message
            ),
            CompilationError::DuplicateProvider { provider } => {
                write!(f, "provider '{}' declared more than once", provider)
            }
            CompilationError::Document { file, message } => {
                write!(f, "{}: {}", file, message)
            }
        }
    }
}

/// Aggregate failure carrying every violation found in the pass.
#[derive(Debug)]
pub struct CompileFailure {
    pub errors: Vec<CompilationError>,
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "compilation failed with {} error(s):", self.errors.len())?;
        for err in &self.errors {
            writeln!(f, "  - {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileFailure {}

/// Non-fatal duplicate-signature diagnostic, resolved by confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionWarning {
    pub signature: Signature,
    pub kept_provider: String,
    pub kept_confidence: f64,
    pub dropped_provider: String,
    pub dropped_confidence: f64,
}

impl fmt::Display for CollisionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signature {} collides: kept {} ({}), dropped {} ({})",
            self.signature,
            self.kept_provider,
            self.kept_confidence,
            self.dropped_provider,
            self.dropped_confidence
        )
    }
}
