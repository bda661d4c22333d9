use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The four canonical sections of an extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Inputs,
    Outputs,
    Config,
    Metadata,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Inputs,
        Section::Outputs,
        Section::Config,
        Section::Metadata,
    ];
}

/// The canonical four-section record produced by extraction.
///
/// Created fresh per call, owned by the caller, discarded after the
/// telemetry payload is emitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl ExtractionResult {
    pub fn section_mut(&mut self, section: Section) -> &mut BTreeMap<String, Value> {
        match section {
            Section::Inputs => &mut self.inputs,
            Section::Outputs => &mut self.outputs,
            Section::Config => &mut self.config,
            Section::Metadata => &mut self.metadata,
        }
    }

    pub fn section(&self, section: Section) -> &BTreeMap<String, Value> {
        match section {
            Section::Inputs => &self.inputs,
            Section::Outputs => &self.outputs,
            Section::Config => &self.config,
            Section::Metadata => &self.metadata,
        }
    }

    pub fn field_count(&self) -> usize {
        Section::ALL.iter().map(|s| self.section(*s).len()).sum()
    }
}
