use crate::loader::BundleLoader;
use serde_json::json;
use spansift_types::{
    AttributeMap, BuildMetadata, ExtractionResult, Match, UNKNOWN_MODEL,
};

/// The runtime surface consumed by the owning tracer.
///
/// Every call degrades instead of failing: if the bundle never loaded,
/// `detect` returns the unknown sentinel and `extract` the required
/// floor, so the host application's telemetry emission is never
/// interrupted by this subsystem.
pub struct Classifier {
    loader: BundleLoader,
}

impl Classifier {
    pub fn new(loader: BundleLoader) -> Self {
        Classifier { loader }
    }

    /// Classify an attribute map into a provider. Unknown on degraded
    /// loader, always safe to call.
    pub fn detect(&self, attrs: &AttributeMap) -> Match {
        match self.loader.load() {
            Ok(bundle) => spansift_engine::detect(&bundle, attrs),
            Err(_) => Match::unknown(),
        }
    }

    /// Project an attribute map into the canonical four-section record
    /// for an already-classified provider/instrumentor pair.
    pub fn extract(
        &self,
        provider: &str,
        instrumentor: &str,
        attrs: &AttributeMap,
    ) -> ExtractionResult {
        match self.loader.load_snapshot() {
            Ok((bundle, resolver)) => {
                spansift_engine::extract_with(&bundle, provider, instrumentor, attrs, &resolver)
            }
            Err(_) => degraded_result(provider),
        }
    }

    /// Detect and extract in one call.
    pub fn classify(&self, attrs: &AttributeMap) -> (Match, ExtractionResult) {
        let detection = self.detect(attrs);
        let result = self.extract(&detection.provider, &detection.instrumentor, attrs);
        (detection, result)
    }

    /// Metadata of the loaded bundle; `None` while degraded or unloaded.
    pub fn build_metadata(&self) -> Option<BuildMetadata> {
        // Trigger the initial load so first-call metadata works, but
        // swallow the failure like every other entry point.
        let _ = self.loader.load();
        self.loader.build_metadata()
    }

    pub fn loader(&self) -> &BundleLoader {
        &self.loader
    }
}

fn degraded_result(provider: &str) -> ExtractionResult {
    let mut result = ExtractionResult::default();
    result
        .metadata
        .insert("provider".to_string(), json!(provider));
    result
        .config
        .insert("model".to_string(), json!(UNKNOWN_MODEL));
    result
}
