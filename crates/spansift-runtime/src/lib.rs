// Runtime layer - owns the compiled bundle for the process lifetime and
// exposes the graceful-degradation facade the owning tracer consumes.

pub mod classifier;
pub mod error;
pub mod loader;

pub use classifier::Classifier;
pub use error::{Error, Result};
pub use loader::{BundleLoader, BundleResolver, BundleSource};
