use cookie_factory::bytes::*;
use cookie_factory::combinator::slice;
use cookie_factory::multi::all;
use cookie_factory::sequence::tuple;
use cookie_factory::*;

use super::{pad_to, wide_string};
use crate::format::*;
use crate::layout::{wide_len, MotbankLayout};
use crate::*;

use std::io;

fn record<W: io::Write>(entry: &BankEntry, path_offset: usize) -> impl SerializeFn<W> {
    tuple((
        le_u64(path_offset as u64),
        le_u32(entry.bank_id),
        le_u32(entry.weapon_id),
        le_u32(entry.layer_mask),
        le_u32(0),
    ))
}

impl BankContainer {
    fn write<'a, W: io::Write + 'a>(&'a self, layout: &'a MotbankLayout) -> impl SerializeFn<W> + 'a {
        tuple((
            le_u32(MOTBANK_VERSION),
            slice(MOTBANK_MAGIC),
            le_u64(0),
            le_u64(layout.entries.offset as u64),
            le_u64(0),
            le_u32(self.entries.len() as u32),
            pad_to(layout.entries.offset),
            all(self
                .entries
                .iter()
                .zip(layout.paths.iter())
                .map(|(entry, path)| record(entry, path.offset))),
            all(self
                .entries
                .iter()
                .zip(layout.paths.iter())
                .map(|(entry, path)| tuple((pad_to(path.offset), wide_string(&entry.motlist_path))))),
            pad_to(layout.size),
        ))
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let lens: Vec<usize> = self.entries.iter().map(|e| wide_len(&e.motlist_path)).collect();
        let layout = MotbankLayout::plan(&lens);
        Ok(gen_simple(self.write(&layout), Vec::with_capacity(layout.size))?)
    }
}
