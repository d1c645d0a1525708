use cookie_factory::combinator::slice;
use cookie_factory::*;

use crate::hash::utf16le;

use std::io;

mod mot;
mod motbank;
mod motlist;

/// Zero fill up to `offset`. Fails if the writer is already past it.
pub(crate) fn pad_to<W: io::Write>(offset: usize) -> impl SerializeFn<W> {
    move |out: WriteContext<W>| {
        let pos = out.position as usize;
        if pos > offset {
            return Err(GenError::InvalidOffset);
        }
        slice(vec![0u8; offset - pos])(out)
    }
}

/// NUL-terminated UTF-16LE.
pub(crate) fn wide_string<W: io::Write>(s: &str) -> impl SerializeFn<W> {
    let mut bytes = utf16le(s);
    bytes.extend_from_slice(&[0, 0]);
    slice(bytes)
}
