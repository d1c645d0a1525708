//! The `CAF_AnimData` JSON document written by the Blender exporter.

use std::io::Read;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::convert::{Sample, SampledAnimation};
use crate::{Error, Result};

pub const FORMAT_TAG: &str = "CAF_AnimData";
pub const FORMAT_VERSION: u32 = 1;
const DEFAULT_FPS: u16 = 60;
const DEFAULT_MOTION_NAME: &str = "custom_animation";

fn default_version() -> u32 {
    FORMAT_VERSION
}

fn default_fps() -> u16 {
    DEFAULT_FPS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeDocument {
    pub format: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub source_app: Option<String>,
    #[serde(default)]
    pub source_version: Option<String>,
    #[serde(default)]
    pub source_coords: Option<String>,
    #[serde(default)]
    pub action_name: Option<String>,
    #[serde(default)]
    pub armature_name: Option<String>,
    #[serde(default = "default_fps")]
    pub fps: u16,
    pub frame_count: usize,
    #[serde(default)]
    pub frame_start: Option<i64>,
    #[serde(default)]
    pub frame_end: Option<i64>,
    pub bone_count: usize,
    pub bones: Vec<String>,
    #[serde(default)]
    pub has_positions: bool,
    /// `data[frame][bone]` is `[qx, qy, qz, qw, px, py, pz]`.
    pub data: Vec<Vec<Vec<f32>>>,
}

impl ExchangeDocument {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_reader(reader).map_err(|e| Error::Schema(format!("not a JSON document: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| Error::Schema(format!("not a JSON document: {}", e)))?;
        Self::from_value(value)
    }

    /// The format tag is checked before any other field.
    fn from_value(value: serde_json::Value) -> Result<Self> {
        match value.get("format").and_then(|f| f.as_str()) {
            Some(FORMAT_TAG) => {}
            other => {
                return Err(Error::Schema(format!(
                    "expected format {:?}, found {:?}",
                    FORMAT_TAG,
                    other.unwrap_or("nothing")
                )))
            }
        }
        let doc: ExchangeDocument = serde_json::from_value(value).map_err(|e| Error::Schema(e.to_string()))?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(Error::Schema(format!(
                "unsupported {} version {}",
                FORMAT_TAG, self.version
            )));
        }
        if self.frame_count == 0 {
            return Err(Error::Schema("frame_count must be at least 1".into()));
        }
        if self.fps == 0 {
            return Err(Error::Schema("fps must be positive".into()));
        }
        if self.bone_count != self.bones.len() {
            return Err(Error::Schema(format!(
                "bone_count is {} but {} bones are listed",
                self.bone_count,
                self.bones.len()
            )));
        }
        for (f, frame) in self.data.iter().enumerate() {
            for (b, values) in frame.iter().enumerate() {
                if values.len() != 7 {
                    return Err(Error::Schema(format!(
                        "frame {} bone {}: expected 7 numbers, found {}",
                        f,
                        b,
                        values.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Action name with spaces replaced, as the engine expects.
    pub fn motion_name(&self) -> String {
        self.action_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_MOTION_NAME)
            .replace(' ', "_")
    }

    /// Frames past the shorter of `frame_count` and `data` are dropped.
    pub fn to_sampled(&self) -> SampledAnimation {
        let frames = self.frame_count.min(self.data.len());
        if frames < self.frame_count {
            warn!(
                "document declares {} frames but carries {}",
                self.frame_count,
                self.data.len()
            );
        }
        let bone_count = self.bones.len();
        let frames = self.data[..frames]
            .iter()
            .map(|frame| {
                (0..bone_count)
                    .map(|b| frame.get(b).and_then(|v| Sample::from_slice(v)))
                    .collect()
            })
            .collect();
        SampledAnimation {
            name: self.motion_name(),
            frame_rate: self.fps,
            bones: self.bones.clone(),
            has_positions: self.has_positions,
            frames,
        }
    }
}
