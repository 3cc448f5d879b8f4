//! Big-endian primitives of the JKS container

use mocknifi_core::{Error, Result};

/// Cursor over keystore bytes
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                Error::MalformedKeystore(format!(
                    "truncated while reading {what} at offset {}",
                    self.pos
                ))
            })?;

        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    pub(crate) fn read_u16(&mut self, what: &str) -> Result<u16> {
        self.take_array(what).map(u16::from_be_bytes)
    }

    pub(crate) fn read_u32(&mut self, what: &str) -> Result<u32> {
        self.take_array(what).map(u32::from_be_bytes)
    }

    pub(crate) fn read_u64(&mut self, what: &str) -> Result<u64> {
        self.take_array(what).map(u64::from_be_bytes)
    }

    /// u32 length-prefixed byte string
    pub(crate) fn read_bytes(&mut self, what: &str) -> Result<&'a [u8]> {
        let len = self.read_u32(what)?;
        let len = usize::try_from(len)
            .map_err(|_| Error::MalformedKeystore(format!("{what} length {len} overflows")))?;
        self.take(len, what)
    }

    /// u16 length-prefixed Java modified UTF-8 string
    pub(crate) fn read_utf(&mut self, what: &str) -> Result<String> {
        let len = self.read_u16(what)?;
        let bytes = self.take(usize::from(len), what)?;
        decode_modified_utf8(bytes)
            .ok_or_else(|| Error::MalformedKeystore(format!("{what} is not valid modified UTF-8")))
    }
}

/// Decode Java's modified UTF-8 (CESU-8 with `C0 80` for NUL)
fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let continuation = |b: u8| (b & 0xc0 == 0x80).then_some(u16::from(b & 0x3f));

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let (unit, width) = match b {
            0x01..=0x7f => (u16::from(b), 1),
            0xc0..=0xdf => {
                let b1 = continuation(*bytes.get(i + 1)?)?;
                ((u16::from(b & 0x1f) << 6) | b1, 2)
            }
            0xe0..=0xef => {
                let b1 = continuation(*bytes.get(i + 1)?)?;
                let b2 = continuation(*bytes.get(i + 2)?)?;
                ((u16::from(b & 0x0f) << 12) | (b1 << 6) | b2, 3)
            }
            _ => return None,
        };
        units.push(unit);
        i += width;
    }

    String::from_utf16(&units).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let bytes = [0x00, 0x02, 0x00, 0x00, 0x00, 0x03, b'a', b'b', b'c', 0x00, 0x02, b'h', b'i'];
        let mut reader = Reader::new(&bytes);

        assert_eq!(reader.read_u16("u16").unwrap(), 2);
        assert_eq!(reader.read_bytes("blob").unwrap(), b"abc");
        assert_eq!(reader.read_utf("alias").unwrap(), "hi");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_truncated_read() {
        let mut reader = Reader::new(&[0x00, 0x00, 0x00, 0x09, 0x01]);
        let err = reader.read_bytes("certificate").unwrap_err();
        assert!(matches!(err, Error::MalformedKeystore(_)));
        assert!(err.to_string().contains("certificate"));
    }

    #[test]
    fn test_modified_utf8() {
        // "é" as two bytes, NUL as C0 80, U+1F600 as a CESU-8 surrogate pair
        let bytes = [
            0xc3, 0xa9, 0xc0, 0x80, 0xed, 0xa0, 0xbd, 0xed, 0xb8, 0x80,
        ];
        assert_eq!(
            decode_modified_utf8(&bytes).as_deref(),
            Some("é\u{0}\u{1F600}")
        );
        assert_eq!(decode_modified_utf8(&[0xff]), None);
        assert_eq!(decode_modified_utf8(&[0xc3]), None);
    }
}
