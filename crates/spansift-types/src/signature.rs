use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// An order-irrelevant set of attribute keys used as a hash key.
///
/// Keys are sorted and deduplicated on construction, so two signatures built
/// from the same keys in any order compare and hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(Vec<String>);

impl Signature {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();
        Signature(keys)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    /// True if every key of this signature is present in `attribute_keys`.
    pub fn is_subset_of(&self, attribute_keys: &HashSet<&str>) -> bool {
        self.0.iter().all(|k| attribute_keys.contains(k.as_str()))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.join(", "))
    }
}
