//! The compiled bundle: the immutable artifact the compiler emits and the
//! runtime engines read.
//!
//! In memory the inverted index is a `HashMap<Signature, IndexEntry>` plus a
//! size-bucketed view for the subset fallback. The serialized artifact
//! stores the index as an entry list (signatures are not string map keys)
//! and the bucketed view is rebuilt on deserialize.

use crate::error::{Error, Result};
use crate::signature::Signature;
use crate::spec::{NavigationRule, SectionMappings, TransformSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::path::Path;

/// Signature -> classification payload of the inverted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub provider: String,
    pub confidence: f64,
    pub instrumentor: String,
}

/// instrumentor -> base rule name -> concrete rule name, precomputed at
/// compile time so runtime resolution is a pure table lookup.
pub type RoutingTable = BTreeMap<String, BTreeMap<String, String>>;

/// Everything the extraction engine needs for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledProvider {
    pub rules: BTreeMap<String, NavigationRule>,
    pub mappings: SectionMappings,
    pub routing: RoutingTable,
    pub transforms: BTreeMap<String, TransformSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildMetadata {
    pub built_at: DateTime<Utc>,
    pub version: String,
    pub provider_count: usize,
    pub signature_count: usize,
}

/// Immutable compiled artifact. Built once per compile, read-only
/// thereafter; safe for unsynchronized concurrent reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "BundleArtifact", into = "BundleArtifact")]
pub struct CompiledBundle {
    forward: BTreeMap<String, Vec<Signature>>,
    inverted: HashMap<Signature, IndexEntry>,
    /// Derived view: signature size -> signatures of that size, each
    /// bucket sorted for deterministic scan order.
    buckets: BTreeMap<usize, Vec<Signature>>,
    providers: BTreeMap<String, CompiledProvider>,
    metadata: BuildMetadata,
}

impl CompiledBundle {
    pub fn new(
        forward: BTreeMap<String, Vec<Signature>>,
        inverted: HashMap<Signature, IndexEntry>,
        providers: BTreeMap<String, CompiledProvider>,
        metadata: BuildMetadata,
    ) -> Self {
        let buckets = build_buckets(&inverted);
        CompiledBundle {
            forward,
            inverted,
            buckets,
            providers,
            metadata,
        }
    }

    /// Inverted-index lookup; the exact-match hot path.
    pub fn entry(&self, signature: &Signature) -> Option<&IndexEntry> {
        self.inverted.get(signature)
    }

    /// Size-bucketed view of the inverted index for the subset fallback.
    pub fn buckets(&self) -> &BTreeMap<usize, Vec<Signature>> {
        &self.buckets
    }

    pub fn forward_index(&self) -> &BTreeMap<String, Vec<Signature>> {
        &self.forward
    }

    pub fn provider(&self, id: &str) -> Option<&CompiledProvider> {
        self.providers.get(id)
    }

    pub fn provider_ids(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn metadata(&self) -> &BuildMetadata {
        &self.metadata
    }

    pub fn signature_count(&self) -> usize {
        self.inverted.len()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    // --- Artifact serialization ---

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let bundle: CompiledBundle = serde_json::from_reader(reader)?;
        if bundle.inverted.is_empty() {
            return Err(Error::Artifact(
                "bundle artifact contains no signatures".to_string(),
            ));
        }
        Ok(bundle)
    }

    pub fn write_artifact(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_writer(std::io::BufWriter::new(file))
    }

    pub fn read_artifact(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }
}

fn build_buckets(inverted: &HashMap<Signature, IndexEntry>) -> BTreeMap<usize, Vec<Signature>> {
    let mut buckets: BTreeMap<usize, Vec<Signature>> = BTreeMap::new();
    for signature in inverted.keys() {
        buckets
            .entry(signature.len())
            .or_default()
            .push(signature.clone());
    }
    for bucket in buckets.values_mut() {
        bucket.sort();
    }
    buckets
}

/// Serialized mirror of `CompiledBundle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BundleArtifact {
    metadata: BuildMetadata,
    forward: BTreeMap<String, Vec<Signature>>,
    entries: Vec<ArtifactEntry>,
    providers: BTreeMap<String, CompiledProvider>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArtifactEntry {
    signature: Signature,
    #[serde(flatten)]
    entry: IndexEntry,
}

impl From<BundleArtifact> for CompiledBundle {
    fn from(artifact: BundleArtifact) -> Self {
        let inverted: HashMap<Signature, IndexEntry> = artifact
            .entries
            .into_iter()
            .map(|e| (e.signature, e.entry))
            .collect();
        CompiledBundle::new(
            artifact.forward,
            inverted,
            artifact.providers,
            artifact.metadata,
        )
    }
}

impl From<CompiledBundle> for BundleArtifact {
    fn from(bundle: CompiledBundle) -> Self {
        let mut entries: Vec<ArtifactEntry> = bundle
            .inverted
            .into_iter()
            .map(|(signature, entry)| ArtifactEntry { signature, entry })
            .collect();
        // Stable artifact bytes for identical bundles.
        entries.sort_by(|a, b| a.signature.cmp(&b.signature));
        BundleArtifact {
            metadata: bundle.metadata,
            forward: bundle.forward,
            entries,
            providers: bundle.providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> CompiledBundle {
        let sig_a = Signature::new(["gen_ai.system", "gen_ai.request.model"]);
        let sig_b = Signature::new(["llm.vendor", "llm.model", "llm.request_id"]);

        let mut forward = BTreeMap::new();
        forward.insert("openai".to_string(), vec![sig_a.clone()]);
        forward.insert("anthropic".to_string(), vec![sig_b.clone()]);

        let mut inverted = HashMap::new();
        inverted.insert(
            sig_a,
            IndexEntry {
                provider: "openai".to_string(),
                confidence: 0.9,
                instrumentor: "otel_genai".to_string(),
            },
        );
        inverted.insert(
            sig_b,
            IndexEntry {
                provider: "anthropic".to_string(),
                confidence: 0.85,
                instrumentor: "openinference".to_string(),
            },
        );

        let providers = BTreeMap::new();
        let metadata = BuildMetadata {
            built_at: Utc::now(),
            version: "test".to_string(),
            provider_count: 2,
            signature_count: 2,
        };
        CompiledBundle::new(forward, inverted, providers, metadata)
    }

    #[test]
    fn buckets_group_by_signature_size() {
        let bundle = sample_bundle();
        assert_eq!(bundle.buckets().len(), 2);
        assert_eq!(bundle.buckets()[&2].len(), 1);
        assert_eq!(bundle.buckets()[&3].len(), 1);
    }

    #[test]
    fn artifact_round_trip_preserves_index() {
        let bundle = sample_bundle();
        let mut buf = Vec::new();
        bundle.to_writer(&mut buf).unwrap();
        let restored = CompiledBundle::from_reader(buf.as_slice()).unwrap();

        assert_eq!(restored.signature_count(), bundle.signature_count());
        let sig = Signature::new(["gen_ai.request.model", "gen_ai.system"]);
        assert_eq!(restored.entry(&sig), bundle.entry(&sig));
        assert_eq!(restored.metadata(), bundle.metadata());
    }

    #[test]
    fn empty_artifact_is_rejected() {
        let artifact = r#"{"metadata":{"built_at":"2026-01-01T00:00:00Z","version":"x","provider_count":0,"signature_count":0},"forward":{},"entries":[],"providers":{}}"#;
        assert!(CompiledBundle::from_reader(artifact.as_bytes()).is_err());
    }
}
