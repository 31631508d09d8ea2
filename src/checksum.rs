//! Checksum primitives.
//!
//! MD5 digests cover payloads and the region after the header; the header itself
//! carries a standard (zlib) CRC-32.

use std::fmt;
use std::io;

use md5::{Digest, Md5};

/// A 128-bit MD5 digest as stored in the image.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Md5Digest(pub [u8; 16]);

impl Md5Digest {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Display for Md5Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Md5Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Md5Digest({})", self.to_hex())
    }
}

/// Incremental MD5 over several buffers.
#[derive(Default)]
pub struct Md5Hasher {
    inner: Md5,
}

impl Md5Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> Md5Digest {
        let mut out = [0u8; 16];
        out.copy_from_slice(&self.inner.finalize());
        Md5Digest(out)
    }
}

impl io::Write for Md5Hasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// MD5 of a whole buffer.
pub fn md5_of(data: &[u8]) -> Md5Digest {
    let mut hasher = Md5Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// CRC-32 (IEEE polynomial, zero initial value) of a byte range.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_known_vectors() {
        assert_eq!(md5_of(b"").to_hex(), "D41D8CD98F00B204E9800998ECF8427E");
        assert_eq!(md5_of(b"abc").to_hex(), "900150983CD24FB0D6963F7D28E17F72");
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut hasher = Md5Hasher::new();
        hasher.update(b"ab");
        hasher.update(b"c");
        assert_eq!(hasher.finalize(), md5_of(b"abc"));
    }

    #[test]
    fn hasher_as_writer() {
        let mut hasher = Md5Hasher::new();
        std::io::copy(&mut &b"abc"[..], &mut hasher).unwrap();
        assert_eq!(hasher.finalize(), md5_of(b"abc"));
    }

    #[test]
    fn crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }
}
