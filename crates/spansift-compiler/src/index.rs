use crate::error::CollisionWarning;
use spansift_types::{IndexEntry, ProviderSpec, Signature};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Build the forward and inverted indices over every pattern.
///
/// The forward index (provider -> signatures) exists for diagnostics and
/// uniqueness checks only; detection reads the inverted index. Duplicate
/// signatures are non-fatal: the higher-confidence entry wins, ties break
/// lexicographically on provider id then instrumentor, and every collision
/// (same-provider self-collisions and ties included) is logged and
/// reported.
pub fn build_indices(
    specs: &[ProviderSpec],
) -> (
    BTreeMap<String, Vec<Signature>>,
    HashMap<Signature, IndexEntry>,
    Vec<CollisionWarning>,
) {
    let mut forward: BTreeMap<String, Vec<Signature>> = BTreeMap::new();
    let mut inverted: HashMap<Signature, IndexEntry> = HashMap::new();
    let mut warnings = Vec::new();

    // Specs sorted by provider id, patterns by name (BTreeMap), so the
    // index build order is stable across runs.
    let mut ordered: Vec<&ProviderSpec> = specs.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    for spec in ordered {
        for pattern in spec.patterns.values() {
            let signature = Signature::new(pattern.signature.iter().cloned());
            forward
                .entry(spec.id.clone())
                .or_default()
                .push(signature.clone());

            let candidate = IndexEntry {
                provider: spec.id.clone(),
                confidence: pattern.confidence,
                instrumentor: pattern.instrumentor.clone(),
            };

            match inverted.entry(signature) {
                Entry::Vacant(slot) => {
                    slot.insert(candidate);
                }
                Entry::Occupied(mut slot) => {
                    let dropped = if beats(&candidate, slot.get()) {
                        std::mem::replace(slot.get_mut(), candidate)
                    } else {
                        candidate
                    };
                    let kept = slot.get().clone();
                    let warning = CollisionWarning {
                        signature: slot.key().clone(),
                        kept_provider: kept.provider,
                        kept_confidence: kept.confidence,
                        dropped_provider: dropped.provider,
                        dropped_confidence: dropped.confidence,
                    };
                    warn!(%warning, "signature collision");
                    warnings.push(warning);
                }
            }
        }
    }

    for signatures in forward.values_mut() {
        signatures.sort();
    }

    (forward, inverted, warnings)
}

/// Collision winner: higher confidence, then lexicographic provider id,
/// then instrumentor id. Deterministic across runs and platforms.
fn beats(candidate: &IndexEntry, existing: &IndexEntry) -> bool {
    if candidate.confidence != existing.confidence {
        return candidate.confidence > existing.confidence;
    }
    if candidate.provider != existing.provider {
        return candidate.provider < existing.provider;
    }
    candidate.instrumentor < existing.instrumentor
}
