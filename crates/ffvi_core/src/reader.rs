use std::io::{self, Read, Seek, SeekFrom};

pub struct LittleEndianReader<R> {
    inner: R,
}

impl<R: Read + Seek> LittleEndianReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_u24(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 3];
        self.inner.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes([buf[0], buf[1], buf[2], 0]))
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_f32(&mut self) -> io::Result<f32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    pub fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a fixed-width string field, trimming at the first null byte.
    pub fn read_fixed_string(&mut self, n: usize) -> io::Result<String> {
        let bytes = self.read_bytes(n)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(n);
        String::from_utf8(bytes[..end].to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn skip(&mut self, n: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Current(n as i64))?;
        Ok(())
    }

    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn len(&mut self) -> io::Result<u64> {
        let cur = self.position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(cur))?;
        Ok(end)
    }

    pub fn is_empty(&mut self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::LittleEndianReader;

    #[test]
    fn reads_little_endian_scalars() {
        let bytes = [0x34, 0x12, 0x78, 0x56, 0x01, 0xAB];
        let mut r = LittleEndianReader::new(Cursor::new(bytes.as_slice()));
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u24().unwrap(), 0x015678);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
    }

    #[test]
    fn fixed_string_stops_at_null() {
        let bytes = b"TERRA\0extra";
        let mut r = LittleEndianReader::new(Cursor::new(bytes.as_slice()));
        assert_eq!(r.read_fixed_string(6).unwrap(), "TERRA");
        // cursor advanced past the whole field
        assert_eq!(r.position().unwrap(), 6);
    }
}
