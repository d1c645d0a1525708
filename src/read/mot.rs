use log::{debug, warn};
use nom::bytes::complete::take;
use nom::combinator::map;
use nom::number::complete::{le_f32, le_i16};
use nom::sequence::tuple;
use nom::IResult;

use super::{Deserialize, Reader};
use crate::const_table::known_bone_name;
use crate::format::*;
use crate::quantize::{unpack_xyz, QuantizationParams};
use crate::*;

impl Deserialize for QuantizationParams {
    const SIZE: usize = UNPACK_DATA_SIZE;

    fn parse(i: &[u8]) -> IResult<&[u8], Self> {
        let (i, (s0, s1, s2, s3)) = tuple((le_f32, le_f32, le_f32, le_f32))(i)?;
        let (i, (b0, b1, b2, b3)) = tuple((le_f32, le_f32, le_f32, le_f32))(i)?;
        Ok((
            i,
            QuantizationParams {
                scale: [s0, s1, s2, s3],
                base: [b0, b1, b2, b3],
            },
        ))
    }
}

fn vec3(i: &[u8]) -> IResult<&[u8], [f32; 3]> {
    map(tuple((le_f32, le_f32, le_f32)), |(x, y, z)| [x, y, z])(i)
}

fn packed(i: &[u8]) -> IResult<&[u8], [u8; 4]> {
    map(take(4usize), |b: &[u8]| [b[0], b[1], b[2], b[3]])(i)
}

fn frame_count(header: &MotHeader, at: usize) -> Result<u32> {
    let max = header.max_frame;
    if !max.is_finite() || max < 0.0 || max > i16::MAX as f32 {
        return Err(Error::Format {
            what: "mot max frame",
            offset: at + 0x58,
            expected: "a frame number in 0..=32767".into(),
            found: max.to_string(),
        });
    }
    Ok(max.round() as u32 + 1)
}

fn frames(r: Reader, at: usize, track: &TrackHeader) -> Result<Vec<u16>> {
    let raw = r.table(
        "frame indices",
        track.frame_index_offset as usize,
        track.key_count as usize,
        2,
        le_i16,
    )?;
    raw.into_iter()
        .map(|f| {
            if f < 0 {
                Err(Error::Format {
                    what: "frame index",
                    offset: r.base() + at,
                    expected: "a non-negative frame".into(),
                    found: f.to_string(),
                })
            } else {
                Ok(f as u16)
            }
        })
        .collect()
}

fn unknown_flags(r: Reader, at: usize, flags: u32) -> Error {
    Error::Format {
        what: "track flags",
        offset: r.base() + at,
        expected: format!(
            "{:#010x}, {:#010x} or {:#010x}",
            FLAG_POS_UNCOMPRESSED, FLAG_ROT_COMPRESSED, FLAG_ROT_UNCOMPRESSED
        ),
        found: format!("{:#010x}", flags),
    }
}

fn read_bone(r: Reader, clip: &BoneClipHeader, encoding: &mut Option<RotationEncoding>) -> Result<BoneTrack> {
    let first = clip.track_header_offset as usize;
    let headers: Vec<TrackHeader> = r.records("track headers", first, clip.track_count())?;
    let mut bone = BoneTrack {
        name: known_bone_name(clip.name_hash).map(str::to_string),
        skeleton_index: clip.bone_index,
        name_hash: clip.name_hash,
        rotations: vec![],
        positions: None,
    };

    let channels = [CHANNEL_POSITION, CHANNEL_ROTATION, CHANNEL_SCALE]
        .iter()
        .copied()
        .filter(|c| clip.channels & c != 0);
    for (i, (channel, track)) in channels.zip(headers.iter()).enumerate() {
        let at = first + i * TRACK_HEADER_SIZE;
        if channel == CHANNEL_SCALE {
            warn!("bone {:08x}: skipping scale track", clip.name_hash);
            continue;
        }
        let kind = TrackKind::from_flags(track.flags).ok_or_else(|| unknown_flags(r, at, track.flags))?;
        if kind.is_rotation() != (channel == CHANNEL_ROTATION) {
            return Err(Error::Format {
                what: "track flags",
                offset: r.base() + at,
                expected: if channel == CHANNEL_ROTATION {
                    "a rotation track".into()
                } else {
                    "a position track".into()
                },
                found: format!("{:?}", kind),
            });
        }

        let n = track.key_count as usize;
        let data = track.frame_data_offset as usize;
        let frames = frames(r, at, track)?;
        match kind {
            TrackKind::Position => {
                let values = r.table("position data", data, n, 12, vec3)?;
                bone.positions = Some(
                    frames
                        .into_iter()
                        .zip(values)
                        .map(|(f, [x, y, z])| Keyframe::new(f, Vector3::new(x, y, z)))
                        .collect(),
                );
            }
            TrackKind::CompressedRotation => {
                let params: QuantizationParams = r.record("unpack data", track.unpack_offset as usize)?;
                let values = r.table("rotation data", data, n, 4, packed)?;
                bone.rotations = frames
                    .into_iter()
                    .zip(values)
                    .map(|(f, b)| Keyframe::new(f, params.decode(b)))
                    .collect();
            }
            TrackKind::UncompressedRotation => {
                let values = r.table("rotation data", data, n, 12, vec3)?;
                bone.rotations = frames
                    .into_iter()
                    .zip(values)
                    .map(|(f, xyz)| Keyframe::new(f, unpack_xyz(xyz)))
                    .collect();
            }
        }

        if kind.is_rotation() {
            let found = if kind == TrackKind::CompressedRotation {
                RotationEncoding::Compressed4Byte
            } else {
                RotationEncoding::Uncompressed12Byte
            };
            match *encoding {
                None => *encoding = Some(found),
                Some(e) if e != found => {
                    warn!("bone {:08x}: {:?} track in a {:?} clip", clip.name_hash, found, e)
                }
                _ => {}
            }
        }
    }
    Ok(bone)
}

impl AnimationClip {
    /// Decodes a standalone mot entry.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        Self::read(Reader::new(buf))
    }

    pub(crate) fn read(r: Reader) -> Result<Self> {
        r.check_tag("mot header", MOT_MAGIC, MOT_VERSION)?;
        let header: MotHeader = r.record("mot header", 0)?;
        let name = r.wide_string("motion name", header.name_offset as usize)?;
        let frame_count = frame_count(&header, r.base())?;
        let clips: Vec<BoneClipHeader> = r.records(
            "bone clip table",
            header.bone_clip_offset as usize,
            header.bone_clip_count as usize,
        )?;

        let mut clip = AnimationClip::new(&name, frame_count, header.frame_rate);
        let mut encoding = None;
        for bone_clip in &clips {
            clip.bones.push(read_bone(r, bone_clip, &mut encoding)?);
        }
        clip.rotation_encoding = encoding.unwrap_or_default();
        debug!(
            "decoded `{}` at {:#x}: {} frames, {} bones",
            clip.name,
            r.base(),
            clip.frame_count,
            clip.bones.len()
        );
        Ok(clip)
    }
}
