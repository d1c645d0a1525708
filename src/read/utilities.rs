use nom::bytes::complete::take;
use nom::combinator::map;
use nom::error::ParseError;
use nom::number::complete::{le_u16, le_u64};
use nom::IResult;

/// A 64-bit on-disk offset.
pub(crate) fn offset(i: &[u8]) -> IResult<&[u8], usize> {
    map(le_u64, |n| n as usize)(i)
}

pub(crate) fn magic(i: &[u8]) -> IResult<&[u8], [u8; 4]> {
    map(take(4usize), |b: &[u8]| [b[0], b[1], b[2], b[3]])(i)
}

/// Applies `f` until it yields `v`, which is consumed but not returned.
pub fn many_until<I, O, E, F>(f: F, v: O) -> impl Fn(I) -> IResult<I, Vec<O>, E>
where
    I: Clone,
    O: PartialEq,
    F: Fn(I) -> IResult<I, O, E>,
    E: ParseError<I>,
{
    move |i: I| {
        let mut res = Vec::new();
        let mut i = i;
        loop {
            let (i1, val) = f(i.clone())?;
            i = i1;
            if val == v {
                break;
            }
            res.push(val);
        }
        Ok((i, res))
    }
}

/// UTF-16LE code units up to the NUL terminator.
pub(crate) fn wide_units(i: &[u8]) -> IResult<&[u8], Vec<u16>> {
    many_until(le_u16, 0)(i)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_until_terminator() {
        let i = &[b'h', 0, b'i', 0, 0, 0, 0xAA][..];
        let (rest, units) = wide_units(i).unwrap();
        assert_eq!(String::from_utf16(&units).unwrap(), "hi");
        assert_eq!(rest, &[0xAA]);
    }

    #[test]
    fn unterminated_is_an_error() {
        assert!(wide_units(&[b'h', 0, b'i'][..]).is_err());
    }

    #[test]
    fn reads_magic_and_offset() {
        let i = b"mlst\x10\0\0\0\0\0\0\0";
        let (i, m) = magic(&i[..]).unwrap();
        assert_eq!(&m, b"mlst");
        assert_eq!(offset(i).unwrap().1, 0x10);
    }
}
