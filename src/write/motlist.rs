use cookie_factory::bytes::*;
use cookie_factory::combinator::slice;
use cookie_factory::multi::all;
use cookie_factory::sequence::tuple;
use cookie_factory::*;
use log::info;

use super::{pad_to, wide_string};
use crate::format::*;
use crate::layout::{wide_len, MotlistLayout};
use crate::*;

use std::io;

impl AnimationContainer {
    fn write<'a, W: io::Write + 'a>(
        &'a self,
        layout: &'a MotlistLayout,
        entries: &'a [Vec<u8>],
    ) -> impl SerializeFn<W> + 'a {
        let count = entries.len();
        tuple((
            le_u32(MOTLIST_VERSION),
            slice(MOTLIST_MAGIC),
            le_u64(0),
            le_u64(layout.pointers.offset as u64),
            le_u64(layout.collection.offset as u64),
            le_u64(layout.name.offset as u64),
            le_u64(0),
            le_u32(count as u32),
            wide_string(&self.name),
            pad_to(layout.pointers.offset),
            all(layout.entries.iter().map(|e| le_u64(e.offset as u64))),
            all(layout
                .entries
                .iter()
                .zip(entries.iter())
                .map(|(e, bytes)| tuple((pad_to(e.offset), slice(bytes))))),
            pad_to(layout.collection.offset),
            slice([0u8; COLLECTION_COUNT_OFFSET]),
            le_u16(count as u16),
            slice([0u8; COLLECTION_SIZE - COLLECTION_COUNT_OFFSET - 2]),
        ))
    }

    /// Serializes the container and every clip it owns.
    ///
    /// Nothing is returned unless every clip encodes, so callers never see a partial file.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.clips.is_empty() {
            return Err(Error::InvalidClip {
                clip: self.name.clone(),
                reason: "a motlist needs at least one clip".into(),
            });
        }
        if self.clips.len() > u16::MAX as usize {
            return Err(Error::InvalidClip {
                clip: self.name.clone(),
                reason: format!("{} clips exceed the u16 count", self.clips.len()),
            });
        }
        let entries = self
            .clips
            .iter()
            .map(AnimationClip::encode)
            .collect::<Result<Vec<_>>>()?;
        let sizes: Vec<usize> = entries.iter().map(Vec::len).collect();
        let layout = MotlistLayout::plan(wide_len(&self.name), &sizes);
        let buf = gen_simple(self.write(&layout, &entries), Vec::with_capacity(layout.size))?;
        info!(
            "motlist `{}`: {} clip(s), {} bytes",
            self.name,
            entries.len(),
            buf.len()
        );
        Ok(buf)
    }

    pub fn encoded_len(&self) -> usize {
        let sizes: Vec<usize> = self.clips.iter().map(AnimationClip::encoded_len).collect();
        MotlistLayout::plan(wide_len(&self.name), &sizes).size
    }
}
