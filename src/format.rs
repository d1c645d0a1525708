//! On-disk constants and fixed-size records.

pub const MOTLIST_VERSION: u32 = 85;
pub const MOTLIST_MAGIC: &[u8; 4] = b"mlst";
pub const MOTLIST_HEADER_SIZE: usize = 0x34;
/// Trailing collection block; the entry count sits at byte 10.
pub const COLLECTION_SIZE: usize = 24;
pub const COLLECTION_COUNT_OFFSET: usize = 10;

pub const MOT_VERSION: u32 = 65;
pub const MOT_MAGIC: &[u8; 4] = b"mot ";
pub const MOT_HEADER_SIZE: usize = 0x74;
pub const BONE_CLIP_SIZE: usize = 24;
pub const TRACK_HEADER_SIZE: usize = 40;
pub const UNPACK_DATA_SIZE: usize = 32;
pub const BONE_HEADER_STUB_SIZE: usize = 16;
/// Value of the float at 0x5C, -1.0 in every shipped clip.
pub const MOT_SENTINEL: f32 = -1.0;
/// Value of the per-bone float, 1.0 in every shipped clip.
pub const BONE_CLIP_MARKER: f32 = 1.0;

pub const MOTBANK_VERSION: u32 = 1;
pub const MOTBANK_MAGIC: &[u8; 4] = b"mbnk";
pub const MOTBANK_HEADER_SIZE: usize = 0x24;
pub const MOTBANK_ENTRY_SIZE: usize = 24;

pub const FLAG_ROT_COMPRESSED: u32 = 0x0043_0112;
pub const FLAG_ROT_UNCOMPRESSED: u32 = 0x004B_0112;
pub const FLAG_POS_UNCOMPRESSED: u32 = 0x0040_00F2;

pub const CHANNEL_POSITION: u8 = 0x01;
pub const CHANNEL_ROTATION: u8 = 0x02;
pub const CHANNEL_SCALE: u8 = 0x04;

/// Round `value` up to a multiple of `align` (a power of two).
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Position,
    CompressedRotation,
    UncompressedRotation,
}

impl TrackKind {
    pub fn flags(self) -> u32 {
        match self {
            TrackKind::Position => FLAG_POS_UNCOMPRESSED,
            TrackKind::CompressedRotation => FLAG_ROT_COMPRESSED,
            TrackKind::UncompressedRotation => FLAG_ROT_UNCOMPRESSED,
        }
    }

    pub fn from_flags(flags: u32) -> Option<Self> {
        match flags {
            FLAG_POS_UNCOMPRESSED => Some(TrackKind::Position),
            FLAG_ROT_COMPRESSED => Some(TrackKind::CompressedRotation),
            FLAG_ROT_UNCOMPRESSED => Some(TrackKind::UncompressedRotation),
            _ => None,
        }
    }

    pub fn bytes_per_key(self) -> usize {
        match self {
            TrackKind::CompressedRotation => 4,
            TrackKind::Position | TrackKind::UncompressedRotation => 12,
        }
    }

    pub fn has_unpack_data(self) -> bool {
        self == TrackKind::CompressedRotation
    }

    pub fn is_rotation(self) -> bool {
        self != TrackKind::Position
    }
}

/// The first 0x74 bytes of a mot entry. Offsets are relative to the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MotHeader {
    pub version: u32,
    pub magic: [u8; 4],
    pub mot_size: u32,
    pub bone_header_offset: u64,
    pub bone_clip_offset: u64,
    pub name_offset: u64,
    pub max_frame: f32,
    pub sentinel: f32,
    pub secondary_max_frame: f32,
    pub bone_count: u16,
    pub bone_clip_count: u16,
    pub frame_rate: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneClipHeader {
    pub bone_index: u16,
    pub channels: u8,
    pub name_hash: u32,
    pub marker: f32,
    pub track_header_offset: u64,
}

impl BoneClipHeader {
    pub fn track_count(&self) -> usize {
        [CHANNEL_POSITION, CHANNEL_ROTATION, CHANNEL_SCALE]
            .iter()
            .filter(|bit| self.channels & **bit != 0)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackHeader {
    pub flags: u32,
    pub key_count: u32,
    pub frame_rate: u32,
    pub max_frame: f32,
    pub frame_index_offset: u64,
    pub frame_data_offset: u64,
    pub unpack_offset: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotlistHeader {
    pub version: u32,
    pub magic: [u8; 4],
    pub pointer_table_offset: u64,
    pub collection_offset: u64,
    pub name_offset: u64,
    pub entry_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotbankHeader {
    pub version: u32,
    pub magic: [u8; 4],
    pub entry_table_offset: u64,
    pub aux_string_offset: u64,
    pub entry_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotbankRecord {
    pub path_offset: u64,
    pub bank_id: u32,
    pub weapon_id: u32,
    pub layer_mask: u32,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn align() {
        assert_eq!(align_up(0x74, 16), 0x80);
        assert_eq!(align_up(0x80, 16), 0x80);
        assert_eq!(align_up(3, 2), 4);
        assert_eq!(align_up(0, 8), 0);
    }

    #[test]
    fn track_count_from_channels() {
        let mut clip = BoneClipHeader {
            bone_index: 0,
            channels: CHANNEL_POSITION | CHANNEL_ROTATION,
            name_hash: 0,
            marker: 1.0,
            track_header_offset: 0,
        };
        assert_eq!(clip.track_count(), 2);
        clip.channels = CHANNEL_ROTATION;
        assert_eq!(clip.track_count(), 1);
    }

    #[test]
    fn flags_roundtrip() {
        for kind in &[
            TrackKind::Position,
            TrackKind::CompressedRotation,
            TrackKind::UncompressedRotation,
        ] {
            assert_eq!(TrackKind::from_flags(kind.flags()), Some(*kind));
        }
        assert_eq!(TrackKind::from_flags(0), None);
    }
}
