//! Length-prefixed little-endian primitives shared by the encoders

use bytes::{Buf, BufMut, Bytes, BytesMut};

use aema_core::{AemaError, AemaResult};

/// Append-only encoder
#[derive(Default)]
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    pub fn fixed(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Bytes with a u16 length prefix. Callers validate the length first.
    pub fn short_bytes(&mut self, data: &[u8]) {
        debug_assert!(data.len() <= u16::MAX as usize);
        self.buf.put_u16_le(data.len() as u16);
        self.buf.put_slice(data);
    }

    /// Bytes with a u32 length prefix
    pub fn long_bytes(&mut self, data: &[u8]) {
        debug_assert!(data.len() <= u32::MAX as usize);
        self.buf.put_u32_le(data.len() as u32);
        self.buf.put_slice(data);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Bounds-checked decoder over a borrowed buffer
pub struct Reader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader {
            buf,
            total: buf.len(),
        }
    }

    fn need(&self, n: usize) -> AemaResult<()> {
        if self.buf.remaining() < n {
            return Err(AemaError::BufferTooShort {
                expected: self.consumed() + n,
                actual: self.total,
            });
        }
        Ok(())
    }

    pub fn consumed(&self) -> usize {
        self.total - self.buf.remaining()
    }

    pub fn u8(&mut self) -> AemaResult<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u64(&mut self) -> AemaResult<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn array<const N: usize>(&mut self) -> AemaResult<[u8; N]> {
        self.need(N)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    pub fn short_bytes(&mut self) -> AemaResult<Bytes> {
        self.need(2)?;
        let len = self.buf.get_u16_le() as usize;
        self.need(len)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    pub fn long_bytes(&mut self) -> AemaResult<Bytes> {
        self.need(4)?;
        let len = self.buf.get_u32_le() as usize;
        self.need(len)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    /// Fail if anything is left over
    pub fn finish(self) -> AemaResult<()> {
        if self.buf.has_remaining() {
            return Err(AemaError::InvalidWireFormat(format!(
                "{} trailing bytes",
                self.buf.remaining()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_read_reports_lengths() {
        let mut reader = Reader::new(&[1, 2, 3]);
        assert_eq!(reader.u8().unwrap(), 1);
        match reader.u64() {
            Err(AemaError::BufferTooShort { expected, actual }) => {
                assert_eq!(expected, 9);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut writer = Writer::default();
        writer.short_bytes(b"key");
        writer.u8(0);
        let data = writer.finish();

        let mut reader = Reader::new(&data);
        assert_eq!(&reader.short_bytes().unwrap()[..], b"key");
        assert!(reader.finish().is_err());
    }
}
