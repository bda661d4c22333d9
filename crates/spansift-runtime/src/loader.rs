use crate::error::{Error, Result};
use dashmap::DashMap;
use spansift_engine::{CompiledTransform, TransformResolver};
use spansift_types::{BuildMetadata, CompiledBundle, TransformSpec};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Where the compiled bundle comes from.
#[derive(Debug, Clone)]
pub enum BundleSource {
    /// A serialized bundle artifact on disk (production path).
    Artifact(PathBuf),
    /// A directory of provider specification documents, compiled at load
    /// time (development mode).
    SpecDir(PathBuf),
    /// An already-built bundle (tests, embedding).
    Prebuilt(Arc<CompiledBundle>),
}

enum LoadState {
    NotLoaded,
    /// Bundle plus the generation number assigned when it was installed.
    Loaded(Arc<CompiledBundle>, u64),
    /// Terminal for the process absent an explicit reload.
    Degraded(String),
}

/// Loads the bundle once per process and caches metadata plus
/// lazily-resolved transform implementations.
///
/// The bundle itself is immutable and shared as an `Arc`; the lock only
/// guards the state transition and the pointer swap on reload, so hot-path
/// readers take a brief read lock to clone the `Arc` and never block on
/// I/O. Transform cache entries are keyed by the generation of the bundle
/// they were compiled from, so an extraction still running on a pre-reload
/// bundle can only populate (and read) its own generation's entries. Two
/// threads racing on the same key may both compile, but compilation is a
/// pure function of one bundle's spec data, so the results are equivalent
/// and one of them wins the insert.
pub struct BundleLoader {
    source: BundleSource,
    state: RwLock<LoadState>,
    generation: AtomicU64,
    transforms: DashMap<(u64, String, String), Arc<CompiledTransform>>,
}

impl BundleLoader {
    pub fn new(source: BundleSource) -> Self {
        BundleLoader {
            source,
            state: RwLock::new(LoadState::NotLoaded),
            generation: AtomicU64::new(0),
            transforms: DashMap::new(),
        }
    }

    pub fn from_artifact(path: impl Into<PathBuf>) -> Self {
        Self::new(BundleSource::Artifact(path.into()))
    }

    pub fn from_spec_dir(path: impl Into<PathBuf>) -> Self {
        Self::new(BundleSource::SpecDir(path.into()))
    }

    pub fn from_bundle(bundle: CompiledBundle) -> Self {
        Self::new(BundleSource::Prebuilt(Arc::new(bundle)))
    }

    /// Load the bundle, memoized. The first failure moves the loader to
    /// Degraded and repeat calls report that state without retrying.
    pub fn load(&self) -> Result<Arc<CompiledBundle>> {
        self.load_pinned().map(|(bundle, _)| bundle)
    }

    /// As `load`, additionally handing out a transform resolver pinned to
    /// the returned bundle's generation. Pass both to the extraction
    /// engine together: the resolver can never serve a transform compiled
    /// from any other bundle than the one it was snapshotted with.
    pub fn load_snapshot(&self) -> Result<(Arc<CompiledBundle>, BundleResolver<'_>)> {
        let (bundle, generation) = self.load_pinned()?;
        Ok((
            bundle,
            BundleResolver {
                loader: self,
                generation,
            },
        ))
    }

    fn load_pinned(&self) -> Result<(Arc<CompiledBundle>, u64)> {
        if let Some(outcome) = self.peek() {
            return outcome;
        }

        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Another thread may have finished the transition while we waited.
        match &*state {
            LoadState::Loaded(bundle, generation) => {
                return Ok((Arc::clone(bundle), *generation));
            }
            LoadState::Degraded(msg) => return Err(Error::Degraded(msg.clone())),
            LoadState::NotLoaded => {}
        }

        match fetch(&self.source) {
            Ok(bundle) => {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                debug!(
                    providers = bundle.provider_count(),
                    signatures = bundle.signature_count(),
                    generation,
                    "bundle loaded"
                );
                *state = LoadState::Loaded(Arc::clone(&bundle), generation);
                Ok((bundle, generation))
            }
            Err(err) => {
                warn!(error = %err, "bundle load failed, entering degraded state");
                *state = LoadState::Degraded(err.to_string());
                Err(err)
            }
        }
    }

    fn peek(&self) -> Option<Result<(Arc<CompiledBundle>, u64)>> {
        let state = match self.state.read() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        match &*state {
            LoadState::NotLoaded => None,
            LoadState::Loaded(bundle, generation) => Some(Ok((Arc::clone(bundle), *generation))),
            LoadState::Degraded(msg) => Some(Err(Error::Degraded(msg.clone()))),
        }
    }

    /// Current bundle, if the loader is in the Loaded state. Never
    /// triggers I/O.
    pub fn bundle(&self) -> Option<Arc<CompiledBundle>> {
        self.peek()
            .and_then(|outcome| outcome.ok())
            .map(|(bundle, _)| bundle)
    }

    /// Build metadata of the loaded bundle. O(1) after the first load;
    /// never re-reads the artifact.
    pub fn build_metadata(&self) -> Option<BuildMetadata> {
        self.bundle().map(|bundle| bundle.metadata().clone())
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.peek(), Some(Err(_)))
    }

    /// Re-fetch the bundle and swap it in atomically. Readers holding the
    /// old `Arc` keep it until their reference drops; a failed reload
    /// leaves the current state untouched.
    pub fn reload(&self) -> Result<Arc<CompiledBundle>> {
        let bundle = fetch(&self.source)?;
        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        *state = LoadState::Loaded(Arc::clone(&bundle), generation);
        // Prune transforms compiled from earlier bundles. An extraction
        // still running on a pre-reload bundle may re-insert under its old
        // generation key afterwards; that entry is invisible to snapshots
        // of the new generation.
        self.transforms.retain(|(g, _, _), _| *g >= generation);
        debug!(
            providers = bundle.provider_count(),
            signatures = bundle.signature_count(),
            generation,
            "bundle reloaded"
        );
        Ok(bundle)
    }
}

/// A transform resolver pinned to one loaded bundle generation.
///
/// Handed out by `BundleLoader::load_snapshot` alongside the bundle
/// `Arc`; compiles on first request per (provider, name) key within that
/// generation, memoized thereafter.
pub struct BundleResolver<'a> {
    loader: &'a BundleLoader,
    generation: u64,
}

impl TransformResolver for BundleResolver<'_> {
    fn resolve(&self, provider: &str, name: &str, spec: &TransformSpec) -> Arc<CompiledTransform> {
        self.loader
            .transforms
            .entry((self.generation, provider.to_string(), name.to_string()))
            .or_insert_with(|| Arc::new(CompiledTransform::compile(spec)))
            .clone()
    }
}

fn fetch(source: &BundleSource) -> Result<Arc<CompiledBundle>> {
    match source {
        BundleSource::Artifact(path) => Ok(Arc::new(CompiledBundle::read_artifact(path)?)),
        BundleSource::SpecDir(path) => {
            let report =
                spansift_compiler::compile_dir(path).map_err(|err| Error::Compile(err.to_string()))?;
            Ok(Arc::new(report.bundle))
        }
        BundleSource::Prebuilt(bundle) => Ok(Arc::clone(bundle)),
    }
}
