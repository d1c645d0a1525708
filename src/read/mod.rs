//! Bounds-checked decoding.
//!
//! Every record is sliced out of the buffer by [`Reader`] before a parser touches it, so a
//! truncated or corrupt file fails with [`Error::Bounds`] instead of a panic.

use nom::bytes::complete::take;
use nom::multi::count;
use nom::number::complete::*;
use nom::sequence::tuple;
use nom::IResult;

use crate::format::*;
use crate::{Error, Result};

mod mot;
mod motbank;
mod motlist;
pub(crate) mod utilities;

use utilities::*;

/// A fixed-size little-endian record.
pub trait Deserialize: Sized {
    const SIZE: usize;

    fn parse(i: &[u8]) -> IResult<&[u8], Self>;
}

impl Deserialize for MotHeader {
    const SIZE: usize = MOT_HEADER_SIZE;

    fn parse(i: &[u8]) -> IResult<&[u8], Self> {
        let (i, (version, magic, mot_size, _, bone_header_offset, bone_clip_offset, _)) =
            tuple((le_u32, magic, le_u32, le_u32, le_u64, le_u64, take(48usize)))(i)?;
        let (i, (name_offset, max_frame, sentinel, _, secondary_max_frame)) =
            tuple((le_u64, le_f32, le_f32, le_f32, le_f32))(i)?;
        let (i, (bone_count, bone_clip_count, _, _, frame_rate, _, _)) =
            tuple((le_u16, le_u16, le_u8, le_u8, le_u16, le_u16, le_u16))(i)?;
        Ok((
            i,
            MotHeader {
                version,
                magic,
                mot_size,
                bone_header_offset,
                bone_clip_offset,
                name_offset,
                max_frame,
                sentinel,
                secondary_max_frame,
                bone_count,
                bone_clip_count,
                frame_rate,
            },
        ))
    }
}

impl Deserialize for BoneClipHeader {
    const SIZE: usize = BONE_CLIP_SIZE;

    fn parse(i: &[u8]) -> IResult<&[u8], Self> {
        let (i, (bone_index, channels, _, name_hash, marker, _, track_header_offset)) =
            tuple((le_u16, le_u8, le_u8, le_u32, le_f32, le_u32, le_u64))(i)?;
        Ok((
            i,
            BoneClipHeader {
                bone_index,
                channels,
                name_hash,
                marker,
                track_header_offset,
            },
        ))
    }
}

impl Deserialize for TrackHeader {
    const SIZE: usize = TRACK_HEADER_SIZE;

    fn parse(i: &[u8]) -> IResult<&[u8], Self> {
        let (i, (flags, key_count, frame_rate, max_frame)) = tuple((le_u32, le_u32, le_u32, le_f32))(i)?;
        let (i, (frame_index_offset, frame_data_offset, unpack_offset)) = tuple((le_u64, le_u64, le_u64))(i)?;
        Ok((
            i,
            TrackHeader {
                flags,
                key_count,
                frame_rate,
                max_frame,
                frame_index_offset,
                frame_data_offset,
                unpack_offset,
            },
        ))
    }
}

impl Deserialize for MotlistHeader {
    const SIZE: usize = MOTLIST_HEADER_SIZE;

    fn parse(i: &[u8]) -> IResult<&[u8], Self> {
        let (i, (version, magic, _, pointer_table_offset, collection_offset, name_offset, _, entry_count)) =
            tuple((le_u32, magic, le_u64, le_u64, le_u64, le_u64, le_u64, le_u32))(i)?;
        Ok((
            i,
            MotlistHeader {
                version,
                magic,
                pointer_table_offset,
                collection_offset,
                name_offset,
                entry_count,
            },
        ))
    }
}

impl Deserialize for MotbankHeader {
    const SIZE: usize = MOTBANK_HEADER_SIZE;

    fn parse(i: &[u8]) -> IResult<&[u8], Self> {
        let (i, (version, magic, _, entry_table_offset, aux_string_offset, entry_count)) =
            tuple((le_u32, magic, le_u64, le_u64, le_u64, le_u32))(i)?;
        Ok((
            i,
            MotbankHeader {
                version,
                magic,
                entry_table_offset,
                aux_string_offset,
                entry_count,
            },
        ))
    }
}

impl Deserialize for MotbankRecord {
    const SIZE: usize = MOTBANK_ENTRY_SIZE;

    fn parse(i: &[u8]) -> IResult<&[u8], Self> {
        let (i, (path_offset, bank_id, weapon_id, layer_mask, _)) =
            tuple((le_u64, le_u32, le_u32, le_u32, le_u32))(i)?;
        Ok((
            i,
            MotbankRecord {
                path_offset,
                bank_id,
                weapon_id,
                layer_mask,
            },
        ))
    }
}

/// A view of a file, or of one entry within it.
///
/// Offsets handed to a reader are relative to its base; errors report absolute offsets.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    file: &'a [u8],
    base: usize,
}

impl<'a> Reader<'a> {
    pub fn new(file: &'a [u8]) -> Self {
        Self { file, base: 0 }
    }

    /// A reader whose offsets start at `offset`.
    pub fn entry(&self, what: &'static str, offset: usize) -> Result<Self> {
        self.bytes(what, offset, 0)?;
        Ok(Self {
            file: self.file,
            base: self.base + offset,
        })
    }

    pub fn base(&self) -> usize {
        self.base
    }

    fn bounds(&self, what: &'static str, offset: usize, len: usize) -> Error {
        Error::Bounds {
            what,
            offset: self.base.saturating_add(offset),
            len,
            size: self.file.len(),
        }
    }

    pub fn bytes(&self, what: &'static str, offset: usize, len: usize) -> Result<&'a [u8]> {
        let start = self
            .base
            .checked_add(offset)
            .ok_or_else(|| self.bounds(what, offset, len))?;
        let end = start.checked_add(len).ok_or_else(|| self.bounds(what, offset, len))?;
        if end > self.file.len() {
            return Err(self.bounds(what, offset, len));
        }
        Ok(&self.file[start..end])
    }

    pub fn parse<O, F>(&self, what: &'static str, offset: usize, len: usize, f: F) -> Result<O>
    where
        F: Fn(&'a [u8]) -> IResult<&'a [u8], O>,
    {
        let bytes = self.bytes(what, offset, len)?;
        f(bytes).map(|(_, o)| o).map_err(|_| self.bounds(what, offset, len))
    }

    pub fn record<T: Deserialize>(&self, what: &'static str, offset: usize) -> Result<T> {
        self.parse(what, offset, T::SIZE, T::parse)
    }

    /// `n` consecutive records of `size` bytes each.
    pub fn table<O, F>(&self, what: &'static str, offset: usize, n: usize, size: usize, f: F) -> Result<Vec<O>>
    where
        F: Fn(&'a [u8]) -> IResult<&'a [u8], O>,
    {
        let len = n.checked_mul(size).ok_or_else(|| self.bounds(what, offset, usize::MAX))?;
        self.parse(what, offset, len, count(f, n))
    }

    pub fn records<T: Deserialize>(&self, what: &'static str, offset: usize, n: usize) -> Result<Vec<T>> {
        self.table(what, offset, n, T::SIZE, T::parse)
    }

    /// A NUL-terminated UTF-16LE string.
    pub fn wide_string(&self, what: &'static str, offset: usize) -> Result<String> {
        let start = self.base.saturating_add(offset);
        let rest = self.bytes(what, offset, 0).map(|_| &self.file[start..])?;
        let (_, units) = wide_units(rest).map_err(|_| self.bounds(what, offset, rest.len()))?;
        String::from_utf16(&units).map_err(|_| Error::Format {
            what,
            offset: start,
            expected: "UTF-16LE text".into(),
            found: "an unpaired surrogate".into(),
        })
    }

    /// Checks the magic, then the version, before any other field is trusted.
    pub fn check_tag(&self, what: &'static str, magic: &[u8; 4], version: u32) -> Result<()> {
        let (found_version, found_magic) = self.parse(what, 0, 8, tuple((le_u32, utilities::magic)))?;
        if &found_magic != magic {
            return Err(Error::magic(what, self.base + 4, magic, &found_magic));
        }
        if found_version != version {
            return Err(Error::version(what, self.base, version, found_version));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytes_are_bounds_checked() {
        let file = [0u8; 16];
        let r = Reader::new(&file);
        assert_eq!(r.bytes("x", 8, 8).unwrap().len(), 8);
        match r.bytes("x", 8, 9) {
            Err(Error::Bounds { offset, len, size, .. }) => {
                assert_eq!((offset, len, size), (8, 9, 16));
            }
            other => panic!("{:?}", other),
        }
        assert!(r.bytes("x", usize::MAX, 1).is_err());
    }

    #[test]
    fn entry_offsets_are_relative() {
        let mut file = vec![0u8; 8];
        file.extend_from_slice(&[b'o', 0, b'k', 0, 0, 0]);
        let r = Reader::new(&file).entry("entry", 8).unwrap();
        assert_eq!(r.wide_string("name", 0).unwrap(), "ok");
        match r.bytes("x", 4, 4) {
            Err(Error::Bounds { offset, .. }) => assert_eq!(offset, 12),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn table_rejects_overflowing_counts() {
        let file = [0u8; 16];
        let r = Reader::new(&file);
        assert!(r.table("x", 0, usize::MAX, 8, le_u64).is_err());
        assert_eq!(r.table("x", 0, 2, 8, le_u64).unwrap(), vec![0, 0]);
    }

    #[test]
    fn unterminated_string_is_bounds_error() {
        let file = [b'a', 0, b'b', 0];
        assert!(matches!(
            Reader::new(&file).wide_string("name", 0),
            Err(Error::Bounds { .. })
        ));
    }

    #[test]
    fn magic_is_checked_before_version() {
        let file = b"\x03\x00\x00\x00xxxx";
        match Reader::new(&file[..]).check_tag("motlist", MOTLIST_MAGIC, 85) {
            Err(Error::Format { offset, expected, .. }) => {
                assert_eq!(offset, 4);
                assert!(expected.contains("mlst"));
            }
            other => panic!("{:?}", other),
        }
        let file = b"\x03\x00\x00\x00mlst";
        match Reader::new(&file[..]).check_tag("motlist", MOTLIST_MAGIC, 85) {
            Err(Error::Format { expected, found, .. }) => assert_eq!((expected.as_str(), found.as_str()), ("85", "3")),
            other => panic!("{:?}", other),
        }
    }
}
