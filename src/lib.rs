//! Reader and writer for RE Engine `motlist`/`mot` animation containers and `motbank`
//! registries.
//!
//! Writing goes through two stages: [`layout::MotLayout`] computes every section offset from
//! the clip's counts, then the serializers in `write` emit bytes at exactly those offsets.
//! Reading is an independent bounds-checked walk, so `decode(encode(x))` is a meaningful test.

#[macro_use]
extern crate lazy_static;

pub mod const_table;
pub mod convert;
pub mod dump;
mod error;
pub mod exchange;
pub mod format;
pub mod hash;
pub mod inspect;
pub mod layout;
pub mod quantize;
pub mod read;
pub mod resolve;
mod write;

pub use cgmath::{Quaternion, Vector3};
pub use error::{Error, Result};
pub use hash::bone_name_hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationEncoding {
    /// 4 bytes per key, quantized XYZW with per-track scale/base.
    Compressed4Byte,
    /// 12 bytes per key, XYZ floats. W is rebuilt by the reader.
    Uncompressed12Byte,
}

impl Default for RotationEncoding {
    fn default() -> Self {
        RotationEncoding::Compressed4Byte
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe<T> {
    pub frame: u16,
    pub value: T,
}

impl<T> Keyframe<T> {
    pub fn new(frame: u16, value: T) -> Self {
        Self { frame, value }
    }
}

/// One skeletal joint's animation within a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneTrack {
    /// Containers only store the hash, so decoded bones may be unnamed.
    pub name: Option<String>,
    pub skeleton_index: u16,
    pub name_hash: u32,
    pub rotations: Vec<Keyframe<Quaternion<f32>>>,
    pub positions: Option<Vec<Keyframe<Vector3<f32>>>>,
}

impl BoneTrack {
    pub fn new(name: &str, skeleton_index: u16) -> Self {
        Self {
            name: Some(name.to_string()),
            skeleton_index,
            name_hash: bone_name_hash(name),
            rotations: vec![],
            positions: None,
        }
    }

    pub fn has_rotation(&self) -> bool {
        !self.rotations.is_empty()
    }

    pub fn has_position(&self) -> bool {
        self.positions.as_ref().map(|p| !p.is_empty()).unwrap_or(false)
    }
}

/// A single motion ("mot entry").
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub frame_count: u32,
    pub frame_rate: u16,
    pub bones: Vec<BoneTrack>,
    pub rotation_encoding: RotationEncoding,
}

impl AnimationClip {
    pub fn new(name: &str, frame_count: u32, frame_rate: u16) -> Self {
        Self {
            name: name.to_string(),
            frame_count,
            frame_rate,
            bones: vec![],
            rotation_encoding: RotationEncoding::default(),
        }
    }

    pub fn bone(&self, name: &str) -> Option<&BoneTrack> {
        let hash = bone_name_hash(name);
        self.bones.iter().find(|b| b.name_hash == hash)
    }

    /// Attaches names to unnamed bones whose hash matches one of `names`.
    pub fn name_bones<'a, I: IntoIterator<Item = &'a str>>(&mut self, names: I) -> usize {
        let mut named = 0;
        for name in names {
            let hash = bone_name_hash(name);
            for bone in self.bones.iter_mut().filter(|b| b.name.is_none()) {
                if bone.name_hash == hash {
                    bone.name = Some(name.to_string());
                    named += 1;
                }
            }
        }
        named
    }

    /// Checks the invariants the writer depends on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidClip {
            clip: self.name.clone(),
            reason,
        };
        if self.frame_count == 0 {
            return Err(invalid("frame count must be at least 1".into()));
        }
        if self.frame_count > i16::MAX as u32 + 1 {
            return Err(invalid(format!(
                "frame count {} does not fit 16-bit frame indices",
                self.frame_count
            )));
        }
        if self.frame_rate == 0 {
            return Err(invalid("frame rate must be positive".into()));
        }
        if self.bones.len() > u16::MAX as usize {
            return Err(invalid(format!("{} bones exceed the u16 count", self.bones.len())));
        }
        let mut seen = std::collections::HashSet::new();
        for bone in &self.bones {
            if !seen.insert(bone.skeleton_index) {
                return Err(invalid(format!(
                    "skeleton index {} is used by more than one bone",
                    bone.skeleton_index
                )));
            }
            let label = bone
                .name
                .clone()
                .unwrap_or_else(|| format!("{:08x}", bone.name_hash));
            let rotation_frames = bone.rotations.iter().map(|k| k.frame);
            check_frames(rotation_frames, self.frame_count)
                .map_err(|e| invalid(format!("bone `{}` rotation: {}", label, e)))?;
            if let Some(positions) = &bone.positions {
                if !positions.is_empty() && !bone.rotations.is_empty() && positions.len() != bone.rotations.len() {
                    return Err(invalid(format!(
                        "bone `{}` has {} position keys for {} rotation keys",
                        label,
                        positions.len(),
                        bone.rotations.len()
                    )));
                }
                check_frames(positions.iter().map(|k| k.frame), self.frame_count)
                    .map_err(|e| invalid(format!("bone `{}` position: {}", label, e)))?;
            }
        }
        Ok(())
    }

    /// Bones in the order they are serialized.
    pub(crate) fn sorted_bones(&self) -> Vec<&BoneTrack> {
        let mut bones: Vec<&BoneTrack> = self.bones.iter().collect();
        bones.sort_by_key(|b| b.skeleton_index);
        bones
    }
}

fn check_frames<I: Iterator<Item = u16>>(frames: I, frame_count: u32) -> std::result::Result<(), String> {
    let mut prev: Option<u16> = None;
    for frame in frames {
        if frame as u32 >= frame_count {
            return Err(format!("frame {} is past the last frame {}", frame, frame_count - 1));
        }
        if let Some(p) = prev {
            if frame <= p {
                return Err(format!("frame {} follows frame {}", frame, p));
            }
        }
        prev = Some(frame);
    }
    Ok(())
}

/// A `motlist` file: a named, ordered list of clips.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationContainer {
    pub name: String,
    pub clips: Vec<AnimationClip>,
}

impl AnimationContainer {
    pub fn new(name: &str, clips: Vec<AnimationClip>) -> Self {
        Self {
            name: name.to_string(),
            clips,
        }
    }
}

/// One `motbank` record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BankEntry {
    pub motlist_path: String,
    pub bank_id: u32,
    /// 0 when the entry is not weapon specific.
    pub weapon_id: u32,
    /// 0 for the default layer.
    pub layer_mask: u32,
}

/// A `motbank` file, mapping identifiers to motlist resource paths.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BankContainer {
    pub entries: Vec<BankEntry>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validate_rejects_unordered_frames() {
        let mut clip = AnimationClip::new("walk", 10, 30);
        let mut bone = BoneTrack::new("root", 0);
        bone.rotations = vec![
            Keyframe::new(3, Quaternion::new(1., 0., 0., 0.)),
            Keyframe::new(2, Quaternion::new(1., 0., 0., 0.)),
        ];
        clip.bones.push(bone);
        assert!(matches!(clip.validate(), Err(Error::InvalidClip { .. })));
    }

    #[test]
    fn validate_rejects_frame_past_end() {
        let mut clip = AnimationClip::new("walk", 10, 30);
        let mut bone = BoneTrack::new("root", 0);
        bone.rotations = vec![Keyframe::new(10, Quaternion::new(1., 0., 0., 0.))];
        clip.bones.push(bone);
        assert!(clip.validate().is_err());
    }

    #[test]
    fn validate_rejects_uneven_channels() {
        let mut clip = AnimationClip::new("walk", 10, 30);
        let mut bone = BoneTrack::new("root", 0);
        bone.rotations = (0..10).map(|f| Keyframe::new(f, Quaternion::new(1., 0., 0., 0.))).collect();
        bone.positions = Some(vec![Keyframe::new(0, Vector3::new(0., 0., 0.))]);
        clip.bones.push(bone);
        assert!(matches!(clip.validate(), Err(Error::InvalidClip { .. })));

        // A position-only bone is fine.
        clip.bones[0].rotations.clear();
        assert!(clip.validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_index() {
        let mut clip = AnimationClip::new("walk", 10, 30);
        clip.bones.push(BoneTrack::new("root", 4));
        clip.bones.push(BoneTrack::new("hips", 4));
        assert!(clip.validate().is_err());
    }

    #[test]
    fn name_bones_fills_only_matches() {
        let mut clip = AnimationClip::new("walk", 1, 30);
        let mut bone = BoneTrack::new("spine_0", 0);
        bone.name = None;
        clip.bones.push(bone);
        assert_eq!(clip.name_bones(vec!["head", "spine_0"]), 1);
        assert_eq!(clip.bones[0].name.as_deref(), Some("spine_0"));
    }
}
