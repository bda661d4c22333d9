use crate::error::{CompilationError, CompileFailure};
use spansift_types::ProviderSpec;
use std::path::Path;

/// Load every `*.toml` provider specification document in a directory.
///
/// Read/parse failures are collected per file and reported together, so a
/// directory with three broken documents produces three errors in one pass.
pub fn load_spec_dir(dir: &Path) -> Result<Vec<ProviderSpec>, CompileFailure> {
    let entries = std::fs::read_dir(dir).map_err(|err| CompileFailure {
        errors: vec![CompilationError::Document {
            file: dir.display().to_string(),
            message: err.to_string(),
        }],
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    let mut specs = Vec::new();
    let mut errors = Vec::new();

    for path in paths {
        let file = path.display().to_string();
        match std::fs::read_to_string(&path) {
            Err(err) => errors.push(CompilationError::Document {
                file,
                message: err.to_string(),
            }),
            Ok(content) => match parse_spec(&content) {
                Ok(spec) => specs.push(spec),
                Err(message) => errors.push(CompilationError::Document { file, message }),
            },
        }
    }

    if errors.is_empty() {
        Ok(specs)
    } else {
        Err(CompileFailure { errors })
    }
}

/// Parse one provider specification document.
pub fn parse_spec(content: &str) -> Result<ProviderSpec, String> {
    let spec: ProviderSpec = toml::from_str(content).map_err(|err| err.to_string())?;
    if spec.id.trim().is_empty() {
        return Err("provider id is empty".to_string());
    }
    Ok(spec)
}
