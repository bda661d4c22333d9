pub mod attr;
pub mod bundle;
pub mod detection;
pub mod error;
pub mod record;
pub mod signature;
pub mod spec;

pub use attr::{AttributeMap, rebuild_indexed_array};
pub use bundle::{BuildMetadata, CompiledBundle, CompiledProvider, IndexEntry, RoutingTable};
pub use detection::{Match, MatchKind, UNKNOWN_MODEL, UNKNOWN_PROVIDER};
pub use error::{Error, Result};
pub use record::{ExtractionResult, Section};
pub use signature::Signature;
pub use spec::{
    ExtractionMethod, FieldMapping, InstrumentorProbe, NavigationRule, Pattern, PricingRate,
    ProviderSpec, SectionMappings, TransformSpec, Validator,
};
