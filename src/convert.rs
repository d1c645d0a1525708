//! Sampled animation to [`AnimationClip`].
//!
//! Both input loaders ([`crate::exchange`] and [`crate::dump`]) produce a [`SampledAnimation`]:
//! one optional transform per bone per frame. [`build_clip`] turns that into keyed tracks,
//! correcting data-quality problems in place and tallying them in a [`QualityReport`].

use log::{debug, info, warn};

use crate::resolve::BoneIndexMap;
use crate::*;

/// Quaternions at or below this magnitude are not normalized.
const MIN_QUAT_MAGNITUDE: f32 = 0.001;

/// One bone's transform on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// `[x, y, z, w]`
    pub rotation: [f32; 4],
    pub position: [f32; 3],
}

impl Sample {
    pub const IDENTITY: Sample = Sample {
        rotation: [0.0, 0.0, 0.0, 1.0],
        position: [0.0, 0.0, 0.0],
    };

    /// From `[qx, qy, qz, qw, px, py, pz]`.
    pub fn from_slice(v: &[f32]) -> Option<Self> {
        match *v {
            [qx, qy, qz, qw, px, py, pz] => Some(Sample {
                rotation: [qx, qy, qz, qw],
                position: [px, py, pz],
            }),
            _ => None,
        }
    }

    /// Blender Z-up right-handed to engine Y-up.
    pub fn to_y_up(self) -> Self {
        let [qx, qy, qz, qw] = self.rotation;
        let [px, py, pz] = self.position;
        Sample {
            rotation: [qx, qz, -qy, qw],
            position: [px, pz, -py],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampledAnimation {
    pub name: String,
    pub frame_rate: u16,
    pub bones: Vec<String>,
    pub has_positions: bool,
    /// `frames[frame][bone]`, `None` where the source had no transform.
    pub frames: Vec<Vec<Option<Sample>>>,
}

impl SampledAnimation {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn sample(&self, frame: usize, bone: usize) -> Option<Sample> {
        self.frames.get(frame).and_then(|f| f.get(bone)).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Replaces the sampled animation's name.
    pub motion_name: Option<String>,
    pub rotation_encoding: RotationEncoding,
    /// Position tracks are written only when this is set and the source has positions.
    pub include_positions: bool,
    pub axis_convert: bool,
    /// Bones whose name starts with any of these are left out.
    pub skip_prefixes: Vec<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            motion_name: None,
            rotation_encoding: RotationEncoding::default(),
            include_positions: true,
            axis_convert: false,
            skip_prefixes: vec![],
        }
    }
}

impl ConvertOptions {
    /// Camera, light and prop attachment bones carried by captured dumps.
    pub fn dump_skip_prefixes() -> Vec<String> {
        vec!["cam_root".into(), "light_".into(), "setProp_".into()]
    }
}

/// Data-quality corrections made while building a clip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityReport {
    /// Keys negated so consecutive rotations stay in one hemisphere.
    pub sign_flips: usize,
    /// Bone/frame pairs with no sample, filled with the identity transform.
    pub missing_samples: usize,
    /// Near-zero quaternions replaced by the identity.
    pub degenerate_rotations: usize,
    pub skipped_bones: Vec<String>,
}

impl QualityReport {
    pub fn is_clean(&self) -> bool {
        self.sign_flips == 0 && self.missing_samples == 0 && self.degenerate_rotations == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub clip: AnimationClip,
    pub quality: QualityReport,
}

fn normalize(rotation: [f32; 4], quality: &mut QualityReport) -> [f32; 4] {
    let [x, y, z, w] = rotation;
    let mag = (x * x + y * y + z * z + w * w).sqrt();
    if mag > MIN_QUAT_MAGNITUDE {
        [x / mag, y / mag, z / mag, w / mag]
    } else {
        quality.degenerate_rotations += 1;
        Sample::IDENTITY.rotation
    }
}

fn dot(a: [f32; 4], b: [f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

/// Builds one clip from sampled frames, placing bones at the slots in `indices`.
pub fn build_clip(sampled: &SampledAnimation, indices: &BoneIndexMap, options: &ConvertOptions) -> Result<Conversion> {
    let name = options
        .motion_name
        .clone()
        .unwrap_or_else(|| sampled.name.clone());
    let frame_count = sampled.frame_count();
    if frame_count == 0 || frame_count > i16::MAX as usize + 1 {
        return Err(Error::InvalidClip {
            clip: name,
            reason: format!("{} sampled frames, expected 1..=32768", frame_count),
        });
    }
    let with_positions = sampled.has_positions && options.include_positions;

    let mut clip = AnimationClip::new(&name, frame_count as u32, sampled.frame_rate);
    clip.rotation_encoding = options.rotation_encoding;
    let mut quality = QualityReport::default();

    for (b, bone_name) in sampled.bones.iter().enumerate() {
        if options.skip_prefixes.iter().any(|p| bone_name.starts_with(p.as_str())) {
            debug!("skipping bone `{}`", bone_name);
            quality.skipped_bones.push(bone_name.clone());
            continue;
        }
        let index = indices
            .get(bone_name)
            .ok_or_else(|| Error::Schema(format!("bone `{}` has no skeleton index", bone_name)))?;

        let mut rotations: Vec<Keyframe<Quaternion<f32>>> = Vec::with_capacity(frame_count);
        let mut positions: Vec<Keyframe<Vector3<f32>>> = Vec::with_capacity(frame_count);
        let mut prev: Option<[f32; 4]> = None;
        for f in 0..frame_count {
            let (rotation, position) = match sampled.sample(f, b) {
                Some(sample) => {
                    let sample = if options.axis_convert { sample.to_y_up() } else { sample };
                    let mut rotation = normalize(sample.rotation, &mut quality);
                    if let Some(p) = prev {
                        if dot(p, rotation) < 0.0 {
                            rotation = [-rotation[0], -rotation[1], -rotation[2], -rotation[3]];
                            quality.sign_flips += 1;
                        }
                    }
                    (rotation, sample.position)
                }
                None => {
                    quality.missing_samples += 1;
                    (Sample::IDENTITY.rotation, Sample::IDENTITY.position)
                }
            };
            prev = Some(rotation);
            let frame = f as u16;
            rotations.push(Keyframe::new(frame, quantize::from_components(rotation)));
            if with_positions {
                let [x, y, z] = position;
                positions.push(Keyframe::new(frame, Vector3::new(x, y, z)));
            }
        }

        let mut bone = BoneTrack::new(bone_name, index);
        bone.rotations = rotations;
        bone.positions = if with_positions { Some(positions) } else { None };
        clip.bones.push(bone);
    }

    clip.bones.sort_by_key(|b| b.skeleton_index);
    clip.validate()?;

    if quality.sign_flips > 0 {
        warn!("`{}`: fixed {} quaternion sign flips", name, quality.sign_flips);
    }
    if quality.missing_samples > 0 {
        warn!("`{}`: {} missing samples set to identity", name, quality.missing_samples);
    }
    if quality.degenerate_rotations > 0 {
        warn!("`{}`: {} near-zero rotations set to identity", name, quality.degenerate_rotations);
    }
    info!(
        "built `{}`: {} bones, {} frames @ {}fps, positions: {}",
        name,
        clip.bones.len(),
        frame_count,
        clip.frame_rate,
        if with_positions { "yes" } else { "no" }
    );
    Ok(Conversion { clip, quality })
}
