//! Conversion preset loading.

use std::collections::BTreeMap;
use std::path::Path;

use ::config::{Config, File};
use serde::Deserialize;
use tracing::info;
use transcode_models::{Conversion, ConversionPresets};

use crate::error::{WorkerError, WorkerResult};

#[derive(Debug, Deserialize)]
struct PresetsFile {
    conversions: BTreeMap<String, Conversion>,
}

/// Load conversion presets from `path`, or the built-in set when `None`.
///
/// The file format follows its extension (TOML, JSON or YAML) and holds one
/// `conversions.<name>` table per preset. A file replaces the built-ins
/// entirely.
pub fn load_presets(path: Option<&str>) -> WorkerResult<ConversionPresets> {
    let Some(path) = path else {
        return Ok(ConversionPresets::builtin());
    };

    let file: PresetsFile = Config::builder()
        .add_source(File::from(Path::new(path)).required(true))
        .build()
        .and_then(Config::try_deserialize)
        .map_err(|e| WorkerError::config_error(format!("failed to load presets from {path}: {e}")))?;

    let presets = ConversionPresets::from_map(file.conversions)
        .map_err(|e| WorkerError::config_error(format!("invalid presets in {path}: {e}")))?;

    info!(path, names = ?presets.names().collect::<Vec<_>>(), "Loaded conversion presets");
    Ok(presets)
}
