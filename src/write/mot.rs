use cookie_factory::bytes::*;
use cookie_factory::combinator::slice;
use cookie_factory::multi::all;
use cookie_factory::sequence::tuple;
use cookie_factory::*;
use log::debug;

use super::{pad_to, wide_string};
use crate::format::*;
use crate::layout::{BoneShape, MotLayout, TrackLayout};
use crate::quantize::{pack_xyz, QuantizationParams};
use crate::*;

use std::io;

enum Keys<'a> {
    Position(&'a [Keyframe<Vector3<f32>>]),
    Rotation(&'a [Keyframe<Quaternion<f32>>]),
}

/// One track's keys matched with its planned offsets.
struct Track<'a> {
    layout: &'a TrackLayout,
    keys: Keys<'a>,
    params: Option<QuantizationParams>,
}

impl<'a> Track<'a> {
    fn frames(&self) -> Vec<u16> {
        match self.keys {
            Keys::Position(keys) => keys.iter().map(|k| k.frame).collect(),
            Keys::Rotation(keys) => keys.iter().map(|k| k.frame).collect(),
        }
    }
}

fn prepare<'a>(bones: &[&'a BoneTrack], layout: &'a MotLayout) -> Vec<Track<'a>> {
    let mut layouts = layout.tracks.iter();
    let mut tracks = vec![];
    for bone in bones.iter().copied() {
        if let Some(positions) = bone.positions.as_ref().filter(|p| !p.is_empty()) {
            if let Some(layout) = layouts.next() {
                tracks.push(Track {
                    layout,
                    keys: Keys::Position(positions),
                    params: None,
                });
            }
        }
        if bone.has_rotation() {
            if let Some(layout) = layouts.next() {
                let params = if layout.kind.has_unpack_data() {
                    Some(QuantizationParams::derive(bone.rotations.iter().map(|k| &k.value)))
                } else {
                    None
                };
                tracks.push(Track {
                    layout,
                    keys: Keys::Rotation(&bone.rotations),
                    params,
                });
            }
        }
    }
    tracks
}

fn bone_clip<W: io::Write>(bone: &BoneTrack, channels: u8, track_offset: usize) -> impl SerializeFn<W> {
    tuple((
        le_u16(bone.skeleton_index),
        le_u8(channels),
        le_u8(0),
        le_u32(bone.name_hash),
        le_f32(BONE_CLIP_MARKER),
        le_u32(0),
        le_u64(track_offset as u64),
    ))
}

fn track_header<'a, W: io::Write + 'a>(
    track: &'a Track<'a>,
    frame_rate: u16,
    max_frame: f32,
) -> impl SerializeFn<W> + 'a {
    let layout = track.layout;
    tuple((
        le_u32(layout.kind.flags()),
        le_u32(layout.key_count as u32),
        le_u32(frame_rate as u32),
        le_f32(max_frame),
        le_u64(layout.frame_indices.offset as u64),
        le_u64(layout.frame_data.offset as u64),
        le_u64(layout.unpack.map(|u| u.offset).unwrap_or(0) as u64),
    ))
}

fn vec3<W: io::Write>(x: f32, y: f32, z: f32) -> impl SerializeFn<W> {
    tuple((le_f32(x), le_f32(y), le_f32(z)))
}

fn frame_data<'a, W: io::Write + 'a>(track: &'a Track<'a>) -> impl SerializeFn<W> + 'a {
    move |out: WriteContext<W>| match (&track.keys, &track.params) {
        (Keys::Position(keys), _) => all(keys.iter().map(|k| vec3(k.value.x, k.value.y, k.value.z)))(out),
        (Keys::Rotation(keys), Some(params)) => {
            all(keys.iter().map(move |k| slice(params.encode(&k.value))))(out)
        }
        (Keys::Rotation(keys), None) => all(keys.iter().map(|k| {
            let [x, y, z] = pack_xyz(&k.value);
            vec3(x, y, z)
        }))(out),
    }
}

fn unpack_data<W: io::Write>(params: QuantizationParams) -> impl SerializeFn<W> {
    let [s0, s1, s2, s3] = params.scale;
    let [b0, b1, b2, b3] = params.base;
    tuple((
        le_f32(s0),
        le_f32(s1),
        le_f32(s2),
        le_f32(s3),
        le_f32(b0),
        le_f32(b1),
        le_f32(b2),
        le_f32(b3),
    ))
}

fn frame_indices<'a, W: io::Write + 'a>(track: &'a Track<'a>) -> impl SerializeFn<W> + 'a {
    move |out: WriteContext<W>| {
        let frames = track.frames();
        tuple((
            pad_to(track.layout.frame_indices.offset),
            all(frames.into_iter().map(|f| le_i16(f as i16))),
        ))(out)
    }
}

impl AnimationClip {
    fn write_header<W: io::Write>(&self, layout: &MotLayout) -> impl SerializeFn<W> {
        let max_frame = (self.frame_count - 1) as f32;
        let bone_count = self.bones.len() as u16;
        tuple((
            le_u32(MOT_VERSION),
            slice(MOT_MAGIC),
            le_u32(0),
            le_u32(0),
            le_u64(layout.bone_header_stub.offset as u64),
            le_u64(layout.bone_clips.offset as u64),
            slice([0u8; 48]),
            le_u64(layout.name.offset as u64),
            le_f32(max_frame),
            le_f32(MOT_SENTINEL),
            le_f32(0.0),
            le_f32(max_frame),
            le_u16(bone_count),
            le_u16(bone_count),
            le_u8(0),
            le_u8(0),
            le_u16(self.frame_rate),
            le_u16(0),
            le_u16(0),
        ))
    }

    fn write<'a, W: io::Write + 'a>(
        &'a self,
        layout: &'a MotLayout,
        bones: &'a [&'a BoneTrack],
        tracks: &'a [Track<'a>],
    ) -> impl SerializeFn<W> + 'a {
        let max_frame = (self.frame_count - 1) as f32;
        let encoding = self.rotation_encoding;
        let clips = bones.iter().zip(layout.bone_tracks.iter()).map(move |(bone, offset)| {
            bone_clip(bone, BoneShape::of(bone, encoding).channels(), *offset)
        });
        let frame_rate = self.frame_rate;
        tuple((
            self.write_header(layout),
            wide_string(&self.name),
            pad_to(layout.bone_clips.offset),
            all(clips),
            pad_to(layout.track_headers.offset),
            all(tracks.iter().map(move |t| track_header(t, frame_rate, max_frame))),
            all(tracks
                .iter()
                .map(|t| tuple((pad_to(t.layout.frame_data.offset), frame_data(t))))),
            all(tracks.iter().filter_map(|t| {
                let unpack = t.layout.unpack?;
                Some(tuple((pad_to(unpack.offset), unpack_data(t.params?))))
            })),
            all(tracks.iter().map(|t| frame_indices(t))),
            pad_to(layout.bone_header_stub.offset),
            le_u64(BONE_HEADER_STUB_SIZE as u64),
            le_u64(0),
            pad_to(layout.size),
        ))
    }

    /// Serializes the clip as a standalone mot entry.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let layout = MotLayout::for_clip(self);
        let bones = self.sorted_bones();
        let tracks = prepare(&bones, &layout);
        debug!(
            "encoding `{}`: {} bones, {} tracks, {} bytes",
            self.name,
            bones.len(),
            tracks.len(),
            layout.size
        );
        let buf = gen_simple(self.write(&layout, &bones, &tracks), Vec::with_capacity(layout.size))?;
        if buf.len() != layout.size {
            return Err(Error::Serialize(format!(
                "wrote {} bytes for a {} byte layout",
                buf.len(),
                layout.size
            )));
        }
        Ok(buf)
    }

    /// Size of the encoded entry, without encoding it.
    pub fn encoded_len(&self) -> usize {
        MotLayout::for_clip(self).size
    }
}
