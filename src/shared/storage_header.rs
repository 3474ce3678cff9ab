use crc32fast::Hasher as Crc32Hasher;
use std::io::{Read, Write};

/// Fixed-size header in front of every versioned binary payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryHeader {
    pub magic: [u8; 8],
    pub version: u16,
    pub flags: u16,
    pub reserved: u32,
    pub header_crc32: u32,
}

impl BinaryHeader {
    pub const LEN_WITHOUT_CRC: usize = 8 + 2 + 2 + 4;
    pub const TOTAL_LEN: usize = Self::LEN_WITHOUT_CRC + 4;

    pub fn new(magic: [u8; 8], version: u16, flags: u16) -> Self {
        let mut header = Self {
            magic,
            version,
            flags,
            reserved: 0,
            header_crc32: 0,
        };
        header.header_crc32 = header.compute_crc32();
        header
    }

    fn compute_crc32(&self) -> u32 {
        let mut hasher = Crc32Hasher::new();
        hasher.update(&self.magic);
        hasher.update(&self.version.to_le_bytes());
        hasher.update(&self.flags.to_le_bytes());
        hasher.update(&self.reserved.to_le_bytes());
        hasher.finalize()
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        w.write_all(&self.magic)?;
        w.write_all(&self.version.to_le_bytes())?;
        w.write_all(&self.flags.to_le_bytes())?;
        w.write_all(&self.reserved.to_le_bytes())?;
        w.write_all(&self.header_crc32.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut r: R) -> std::io::Result<Self> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;

        let mut v = [0u8; 2];
        r.read_exact(&mut v)?;
        let version = u16::from_le_bytes(v);

        let mut f = [0u8; 2];
        r.read_exact(&mut f)?;
        let flags = u16::from_le_bytes(f);

        let mut res = [0u8; 4];
        r.read_exact(&mut res)?;
        let reserved = u32::from_le_bytes(res);

        let mut c = [0u8; 4];
        r.read_exact(&mut c)?;
        let header_crc32 = u32::from_le_bytes(c);

        let hdr = Self {
            magic,
            version,
            flags,
            reserved,
            header_crc32,
        };
        let expected = hdr.compute_crc32();
        if expected != header_crc32 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "header CRC mismatch",
            ));
        }
        Ok(hdr)
    }
}

/// A binary format identified by its magic. Readers accept any version at or
/// above `MIN_VERSION`; fields added by newer writers are appended after the
/// payload and skipped.
pub trait MagicFile {
    const MAGIC: [u8; 8];
    const VERSION: u16 = 1;
    const MIN_VERSION: u16 = 1;

    fn write_header<W: Write>(writer: &mut W) -> std::io::Result<()> {
        let header = BinaryHeader::new(Self::MAGIC, Self::VERSION, 0);
        header.write_to(writer)
    }

    fn read_and_validate_header<R: Read>(reader: &mut R) -> std::io::Result<BinaryHeader> {
        let header = BinaryHeader::read_from(reader)?;
        if header.magic != Self::MAGIC {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "invalid magic",
            ));
        }
        if header.version < Self::MIN_VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "unsupported version",
            ));
        }
        Ok(header)
    }

    /// Header, then `len:u32 | crc32:u32 | payload`.
    fn write_framed<W: Write>(writer: &mut W, payload: &[u8]) -> std::io::Result<()> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "payload too large")
        })?;
        Self::write_header(writer)?;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&crc32fast::hash(payload).to_le_bytes())?;
        writer.write_all(payload)?;
        Ok(())
    }

    /// Reads one framed payload, verifying both CRCs. Bytes after the payload
    /// are left unread.
    fn read_framed<R: Read>(reader: &mut R) -> std::io::Result<(BinaryHeader, Vec<u8>)> {
        let header = Self::read_and_validate_header(reader)?;

        let mut len = [0u8; 4];
        reader.read_exact(&mut len)?;
        let len = u32::from_le_bytes(len) as usize;

        let mut crc = [0u8; 4];
        reader.read_exact(&mut crc)?;
        let crc = u32::from_le_bytes(crc);

        // `len` is untrusted; grow with the bytes actually present.
        let mut payload = Vec::new();
        reader.by_ref().take(len as u64).read_to_end(&mut payload)?;
        if payload.len() != len {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "payload truncated",
            ));
        }
        if crc32fast::hash(&payload) != crc {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "payload CRC mismatch",
            ));
        }
        Ok((header, payload))
    }
}
