use serde::{Deserialize, Serialize};

/// Sentinel provider id for unclassifiable attribute sets. A normal
/// terminal outcome, not an error.
pub const UNKNOWN_PROVIDER: &str = "unknown";

/// Fallback model identifier when no model attribute can be extracted.
pub const UNKNOWN_MODEL: &str = "unknown";

/// How a classification was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The full attribute key set was found verbatim in the inverted index.
    Exact,
    /// A known signature was contained in the attribute key set.
    Subset,
    /// No signature matched.
    None,
}

/// Outcome of classifying one attribute key set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub provider: String,
    pub confidence: f64,
    pub kind: MatchKind,
    /// Instrumentor tag of the matched pattern; empty for unknown.
    pub instrumentor: String,
}

impl Match {
    pub fn unknown() -> Self {
        Match {
            provider: UNKNOWN_PROVIDER.to_string(),
            confidence: 0.0,
            kind: MatchKind::None,
            instrumentor: String::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.kind == MatchKind::None
    }
}
