use log::info;

use super::utilities::offset;
use super::Reader;
use crate::format::*;
use crate::*;

impl AnimationContainer {
    /// Decodes a motlist and every clip it points to.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let r = Reader::new(buf);
        r.check_tag("motlist header", MOTLIST_MAGIC, MOTLIST_VERSION)?;
        let header: MotlistHeader = r.record("motlist header", 0)?;
        let name = r.wide_string("motlist name", header.name_offset as usize)?;
        let pointers = r.table(
            "pointer table",
            header.pointer_table_offset as usize,
            header.entry_count as usize,
            8,
            offset,
        )?;
        let clips = pointers
            .into_iter()
            .map(|at| r.entry("mot entry", at).and_then(AnimationClip::read))
            .collect::<Result<Vec<_>>>()?;
        info!("motlist `{}`: decoded {} clip(s)", name, clips.len());
        Ok(AnimationContainer { name, clips })
    }
}
