// Detection and extraction runtime - classifies an attribute set against
// the compiled bundle and projects it into the canonical schema.

pub mod detect;
pub mod extract;
pub mod transform;

pub use detect::{detect, detect_keys};
pub use extract::{extract, extract_with};
pub use transform::{CompiledTransform, DirectResolver, TransformResolver};
