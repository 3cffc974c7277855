//! Conversion presets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Default audio codec. FFmpeg's native AAC encoder is always available,
/// unlike `libfdk_aac` which needs a non-free build.
pub const DEFAULT_AUDIO_CODEC: &str = "aac";

/// Target scale and bitrates for one output type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// FFmpeg scale expression (e.g. "-2:320")
    pub scale: String,
    /// Video bitrate in kbit/s
    pub video_kilobit_rate: u32,
    /// Audio bitrate in kbit/s
    pub audio_kilobit_rate: u32,
    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
}

fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}

impl Conversion {
    pub fn new(scale: impl Into<String>, video_kilobit_rate: u32, audio_kilobit_rate: u32) -> Self {
        Self {
            scale: scale.into(),
            video_kilobit_rate,
            audio_kilobit_rate,
            audio_codec: default_audio_codec(),
        }
    }

    /// Returns a conversion using a different audio codec.
    pub fn with_audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.audio_codec = codec.into();
        self
    }

    /// Rate-control buffer size, twice the video bitrate.
    pub fn buffer_kilobits(&self) -> u32 {
        self.video_kilobit_rate.saturating_mul(2)
    }

    fn validate(&self, name: &str) -> ModelResult<()> {
        if self.scale.trim().is_empty() {
            return Err(ModelError::invalid_conversion(name, "scale is empty"));
        }
        if self.video_kilobit_rate == 0 {
            return Err(ModelError::invalid_conversion(name, "video_kilobit_rate must be positive"));
        }
        if self.audio_kilobit_rate == 0 {
            return Err(ModelError::invalid_conversion(name, "audio_kilobit_rate must be positive"));
        }
        Ok(())
    }
}

/// Named conversions, keyed by the request's `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionPresets {
    pub conversions: BTreeMap<String, Conversion>,
}

impl Default for ConversionPresets {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ConversionPresets {
    /// Presets used when no presets file is configured.
    pub fn builtin() -> Self {
        let conversions = [
            ("240p", Conversion::new("-2:240", 400, 64)),
            ("320p", Conversion::new("-2:320", 700, 96)),
            ("480p", Conversion::new("-2:480", 1200, 128)),
            ("720p", Conversion::new("-2:720", 2500, 128)),
        ]
        .into_iter()
        .map(|(name, conversion)| (name.to_string(), conversion))
        .collect();

        Self { conversions }
    }

    /// Build presets from a map, validating every entry.
    pub fn from_map(conversions: BTreeMap<String, Conversion>) -> ModelResult<Self> {
        let presets = Self { conversions };
        presets.validate()?;
        Ok(presets)
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.conversions.is_empty() {
            return Err(ModelError::invalid_conversion("*", "no conversions defined"));
        }
        for (name, conversion) in &self.conversions {
            conversion.validate(name)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> ModelResult<&Conversion> {
        self.conversions
            .get(name)
            .ok_or_else(|| ModelError::UnknownConversion(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.conversions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.conversions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversions.is_empty()
    }
}
