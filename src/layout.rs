//! Section offsets for the writers.
//!
//! Every planner here is a pure function of counts and lengths. Nothing is written, so the
//! planners double as "how big would this be" queries. The writers pad up to the offsets
//! computed here and never decide an offset on their own.

use log::trace;

use crate::format::*;
use crate::hash::utf16le;
use crate::{AnimationClip, BoneTrack, RotationEncoding};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Section {
    pub offset: usize,
    pub len: usize,
}

impl Section {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn overlaps(&self, other: &Section) -> bool {
        self.len > 0 && other.len > 0 && self.offset < other.end() && other.offset < self.end()
    }
}

/// Byte length of a NUL-terminated UTF-16LE string.
pub fn wide_len(s: &str) -> usize {
    utf16le(s).len() + 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackShape {
    pub kind: TrackKind,
    pub key_count: usize,
}

/// The tracks one bone contributes, position before rotation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoneShape {
    pub tracks: Vec<TrackShape>,
}

impl BoneShape {
    pub fn of(bone: &BoneTrack, encoding: RotationEncoding) -> Self {
        let mut tracks = vec![];
        if let Some(positions) = bone.positions.as_ref().filter(|p| !p.is_empty()) {
            tracks.push(TrackShape {
                kind: TrackKind::Position,
                key_count: positions.len(),
            });
        }
        if !bone.rotations.is_empty() {
            let kind = match encoding {
                RotationEncoding::Compressed4Byte => TrackKind::CompressedRotation,
                RotationEncoding::Uncompressed12Byte => TrackKind::UncompressedRotation,
            };
            tracks.push(TrackShape {
                kind,
                key_count: bone.rotations.len(),
            });
        }
        Self { tracks }
    }

    pub fn channels(&self) -> u8 {
        self.tracks.iter().fold(0, |acc, t| {
            acc | match t.kind {
                TrackKind::Position => CHANNEL_POSITION,
                _ => CHANNEL_ROTATION,
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackLayout {
    pub kind: TrackKind,
    pub key_count: usize,
    pub header: Section,
    pub frame_data: Section,
    pub unpack: Option<Section>,
    pub frame_indices: Section,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Header,
    Name,
    BoneClips,
    TrackHeaders,
    FrameData,
    UnpackData,
    FrameIndices,
    BoneHeaderStub,
}

/// Offsets of everything inside one mot entry, relative to the entry start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotLayout {
    pub name: Section,
    pub bone_clips: Section,
    pub track_headers: Section,
    /// Offset of each bone's first track header, in bone order.
    pub bone_tracks: Vec<usize>,
    pub tracks: Vec<TrackLayout>,
    pub bone_header_stub: Section,
    pub size: usize,
}

impl MotLayout {
    pub fn plan(name_len: usize, bones: &[BoneShape]) -> Self {
        let name = Section::new(MOT_HEADER_SIZE, name_len);
        let bone_clips = Section::new(align_up(name.end(), 16), bones.len() * BONE_CLIP_SIZE);

        let track_count: usize = bones.iter().map(|b| b.tracks.len()).sum();
        let track_headers = Section::new(
            align_up(bone_clips.end(), 8),
            track_count * TRACK_HEADER_SIZE,
        );

        let mut bone_tracks = Vec::with_capacity(bones.len());
        let mut tracks = Vec::with_capacity(track_count);
        let mut header = track_headers.offset;
        for bone in bones {
            bone_tracks.push(header);
            for shape in &bone.tracks {
                tracks.push(TrackLayout {
                    kind: shape.kind,
                    key_count: shape.key_count,
                    header: Section::new(header, TRACK_HEADER_SIZE),
                    frame_data: Section::default(),
                    unpack: None,
                    frame_indices: Section::default(),
                });
                header += TRACK_HEADER_SIZE;
            }
        }

        let mut cursor = align_up(track_headers.end(), 16);
        for track in tracks.iter_mut() {
            let len = track.key_count * track.kind.bytes_per_key();
            track.frame_data = Section::new(cursor, len);
            cursor += len;
        }

        cursor = align_up(cursor, 4);
        for track in tracks.iter_mut().filter(|t| t.kind.has_unpack_data()) {
            track.unpack = Some(Section::new(cursor, UNPACK_DATA_SIZE));
            cursor += UNPACK_DATA_SIZE;
        }

        cursor = align_up(cursor, 4);
        for track in tracks.iter_mut() {
            track.frame_indices = Section::new(cursor, track.key_count * 2);
            cursor = align_up(cursor + track.key_count * 2, 2);
        }

        let bone_header_stub = Section::new(align_up(cursor, 8), BONE_HEADER_STUB_SIZE);
        let size = align_up(bone_header_stub.end(), 16);
        trace!(
            "mot layout: {} bones, {} tracks, clips {:#x}, tracks {:#x}, stub {:#x}, size {:#x}",
            bones.len(),
            track_count,
            bone_clips.offset,
            track_headers.offset,
            bone_header_stub.offset,
            size
        );

        Self {
            name,
            bone_clips,
            track_headers,
            bone_tracks,
            tracks,
            bone_header_stub,
            size,
        }
    }

    /// Layout of `clip` once its bones are sorted by skeleton index.
    pub fn for_clip(clip: &AnimationClip) -> Self {
        let shapes: Vec<BoneShape> = clip
            .sorted_bones()
            .into_iter()
            .map(|b| BoneShape::of(b, clip.rotation_encoding))
            .collect();
        Self::plan(wide_len(&clip.name), &shapes)
    }

    /// Every section with the alignment its start must satisfy.
    pub fn sections(&self) -> Vec<(SectionKind, Section, usize)> {
        let mut out = vec![
            (SectionKind::Header, Section::new(0, MOT_HEADER_SIZE), 16),
            (SectionKind::Name, self.name, 2),
            (SectionKind::BoneClips, self.bone_clips, 16),
            (SectionKind::TrackHeaders, self.track_headers, 8),
        ];
        for (i, track) in self.tracks.iter().enumerate() {
            let align = if i == 0 { 16 } else { 4 };
            out.push((SectionKind::FrameData, track.frame_data, align));
        }
        for unpack in self.tracks.iter().filter_map(|t| t.unpack) {
            out.push((SectionKind::UnpackData, unpack, 4));
        }
        for (i, track) in self.tracks.iter().enumerate() {
            let align = if i == 0 { 4 } else { 2 };
            out.push((SectionKind::FrameIndices, track.frame_indices, align));
        }
        out.push((SectionKind::BoneHeaderStub, self.bone_header_stub, 8));
        out
    }
}

/// Offsets inside a motlist file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotlistLayout {
    pub name: Section,
    pub pointers: Section,
    pub entries: Vec<Section>,
    pub collection: Section,
    pub size: usize,
}

impl MotlistLayout {
    pub fn plan(name_len: usize, entry_sizes: &[usize]) -> Self {
        let name = Section::new(MOTLIST_HEADER_SIZE, name_len);
        let pointers = Section::new(align_up(name.end(), 8), entry_sizes.len() * 8);
        let mut cursor = align_up(pointers.end(), 16);
        let entries = entry_sizes
            .iter()
            .map(|len| {
                let entry = Section::new(align_up(cursor, 16), *len);
                cursor = entry.end();
                entry
            })
            .collect();
        let collection = Section::new(align_up(cursor, 16), COLLECTION_SIZE);
        Self {
            name,
            pointers,
            entries,
            size: collection.end(),
            collection,
        }
    }
}

/// Offsets inside a motbank file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotbankLayout {
    pub entries: Section,
    pub paths: Vec<Section>,
    pub size: usize,
}

impl MotbankLayout {
    pub fn plan(path_lens: &[usize]) -> Self {
        let entries = Section::new(
            align_up(MOTBANK_HEADER_SIZE, 16),
            path_lens.len() * MOTBANK_ENTRY_SIZE,
        );
        let mut cursor = align_up(entries.end(), 8);
        let paths = path_lens
            .iter()
            .map(|len| {
                let path = Section::new(cursor, *len);
                cursor += len;
                path
            })
            .collect();
        Self {
            entries,
            paths,
            size: align_up(cursor, 16),
        }
    }
}
