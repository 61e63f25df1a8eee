use byteorder::{ByteOrder, LittleEndian};
use std::io::Result;

/// Trait abstracting random access to database files.
///
/// Implementations must support positional reads without mutating shared
/// state, so a single source can serve many concurrent lookups. The trait is
/// blanket-implemented for platform-specific `FileExt` handles.
pub trait ReadAt {
    /// Fills `buf` with the bytes starting at absolute `offset`.
    ///
    /// Implementations must return an error whenever the requested range
    /// cannot be satisfied in full.
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> Result<()>;
}

#[cfg(unix)]
impl<T: std::os::unix::fs::FileExt> ReadAt for T {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        std::os::unix::fs::FileExt::read_exact_at(self, buf, offset)
    }
}

#[cfg(windows)]
impl<T: std::os::windows::fs::FileExt> ReadAt for T {
    fn read_exact_at(&self, mut buf: &mut [u8], mut offset: u64) -> Result<()> {
        while !buf.is_empty() {
            match self.seek_read(buf, offset)? {
                0 => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "failed to read enough bytes",
                    ))
                }
                n => {
                    buf = &mut buf[n..];
                    offset += n as u64;
                }
            }
        }
        Ok(())
    }
}

/// Reads a little-endian `(u32, u32)` pair, the encoding shared by directory
/// entries, hash-table slots, and record headers.
pub(crate) fn read_pair<R: ReadAt + ?Sized>(source: &R, offset: u64) -> Result<(u32, u32)> {
    let mut buf = [0u8; 8];
    source.read_exact_at(&mut buf, offset)?;
    Ok((
        LittleEndian::read_u32(&buf[..4]),
        LittleEndian::read_u32(&buf[4..]),
    ))
}

/// Reads `len` bytes at `offset` into a fresh buffer.
pub(crate) fn read_vec<R: ReadAt + ?Sized>(source: &R, offset: u64, len: u32) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len as usize];
    source.read_exact_at(&mut buf, offset)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_read_at() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&[1, 0, 0, 0, 2, 0, 0, 0, 0xaa, 0xbb]).unwrap();

        assert_eq!(read_pair(&file, 0).unwrap(), (1, 2));
        assert_eq!(read_vec(&file, 8, 2).unwrap(), vec![0xaa, 0xbb]);
        read_pair(&file, 8).unwrap_err();
    }
}
