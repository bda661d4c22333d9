use spansift_types::{AttributeMap, CompiledBundle, IndexEntry, Match, MatchKind, Signature};
use std::collections::HashSet;

/// Subset scanning stops once the best scaled confidence clears this.
const EARLY_EXIT_CONFIDENCE: f64 = 0.9;

/// Classify an attribute map into a provider. Pure, no side effects.
pub fn detect(bundle: &CompiledBundle, attrs: &AttributeMap) -> Match {
    let keys: HashSet<&str> = attrs.keys().map(String::as_str).collect();
    detect_keys(bundle, &keys)
}

/// Classify a bare attribute-key set.
///
/// 1. Exact: the full key set looked up verbatim in the inverted index.
/// 2. Subset fallback: distinct signature sizes, largest first, sizes
///    larger than the key set skipped; containment scales confidence by
///    |signature| / |keys|.
///
/// The fallback is bounded by (distinct signature sizes) x (patterns per
/// size bucket). That is a practical optimization, not a logarithmic
/// bound: many same-size signatures still mean a linear scan of that
/// bucket, which is why the early exit above exists.
pub fn detect_keys(bundle: &CompiledBundle, keys: &HashSet<&str>) -> Match {
    if keys.is_empty() {
        return Match::unknown();
    }

    let live = Signature::new(keys.iter().copied());
    if let Some(entry) = bundle.entry(&live) {
        return Match {
            provider: entry.provider.clone(),
            confidence: entry.confidence,
            kind: MatchKind::Exact,
            instrumentor: entry.instrumentor.clone(),
        };
    }

    let mut best: Option<(f64, &IndexEntry)> = None;

    'sizes: for (&size, signatures) in bundle.buckets().iter().rev() {
        if size > keys.len() {
            continue;
        }
        for signature in signatures {
            if !signature.is_subset_of(keys) {
                continue;
            }
            let Some(entry) = bundle.entry(signature) else {
                continue;
            };
            let scaled = (size as f64 / keys.len() as f64) * entry.confidence;
            if is_better(scaled, entry, &best) {
                best = Some((scaled, entry));
                if scaled > EARLY_EXIT_CONFIDENCE {
                    break 'sizes;
                }
            }
        }
    }

    match best {
        None => Match::unknown(),
        Some((confidence, entry)) => Match {
            provider: entry.provider.clone(),
            confidence,
            kind: MatchKind::Subset,
            instrumentor: entry.instrumentor.clone(),
        },
    }
}

/// Higher scaled confidence wins; equal confidence breaks on
/// lexicographic provider id so iteration order never leaks into the
/// result.
fn is_better(scaled: f64, entry: &IndexEntry, best: &Option<(f64, &IndexEntry)>) -> bool {
    match best {
        None => true,
        Some((best_scaled, best_entry)) => {
            if scaled != *best_scaled {
                scaled > *best_scaled
            } else {
                entry.provider < best_entry.provider
            }
        }
    }
}
