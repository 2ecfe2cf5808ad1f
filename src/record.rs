use crate::codec::{Reader, Writer};
use anyhow::{Context, Result};

/// The file was deleted on the claiming device; the record is a tombstone.
pub const FLAG_DELETED: u32 = 1 << 12;

/// The record is unusable (scan failure, policy); it is stored but never
/// referenced from a global version list.
pub const FLAG_INVALID: u32 = 1 << 13;

// The low 12 flag bits carry unix permission bits. The index stores them
// without interpretation.
pub const FLAG_PERM_MASK: u32 = 0xFFF;

/// One content block of a file. Opaque to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub size: u32,
    pub hash: Vec<u8>,
}

/// The stored description of a file as claimed by one device.
///
/// Encoding v1:
///   name          u32 len + bytes
///   flags         u32
///   modified      i64
///   version       u64
///   local_version u64
///   blocks        u32 count, then per block: size u32, hash u32 len + bytes
///
/// All integers network byte order. The truncated form stops before
/// `blocks`, so both forms decode from the same stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileRecord {
    pub name: String,
    pub flags: u32,
    pub modified: i64,
    pub version: u64,
    pub local_version: u64,
    pub blocks: Vec<BlockInfo>,
}

impl FileRecord {
    pub fn is_deleted(&self) -> bool {
        self.flags & FLAG_DELETED != 0
    }

    pub fn is_invalid(&self) -> bool {
        self.flags & FLAG_INVALID != 0
    }

    /// Total content size in bytes, summed over the blocks.
    pub fn size(&self) -> u64 {
        self.blocks.iter().map(|b| u64::from(b.size)).sum()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(40 + self.name.len() + self.blocks.len() * 40);
        w.put_bytes(self.name.as_bytes());
        w.put_u32(self.flags);
        w.put_i64(self.modified);
        w.put_u64(self.version);
        w.put_u64(self.local_version);
        w.put_u32(self.blocks.len() as u32);
        for b in &self.blocks {
            w.put_u32(b.size);
            w.put_bytes(&b.hash);
        }
        w.into_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let head = decode_head(&mut r)?;

        let n = r.u32().context("decode record: block count")? as usize;
        let mut blocks = Vec::with_capacity(n.min(1024));
        for i in 0..n {
            let size = r.u32().with_context(|| format!("decode record: block {i} size"))?;
            let hash = r
                .bytes()
                .with_context(|| format!("decode record: block {i} hash"))?
                .to_vec();
            blocks.push(BlockInfo { size, hash });
        }

        Ok(Self {
            name: head.name,
            flags: head.flags,
            modified: head.modified,
            version: head.version,
            local_version: head.local_version,
            blocks,
        })
    }
}

/// A record decoded without its content metadata. Strict prefix of the full
/// encoding, used by iterators that do not need block lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TruncatedRecord {
    pub name: String,
    pub flags: u32,
    pub modified: i64,
    pub version: u64,
    pub local_version: u64,
}

impl TruncatedRecord {
    pub fn is_deleted(&self) -> bool {
        self.flags & FLAG_DELETED != 0
    }

    pub fn is_invalid(&self) -> bool {
        self.flags & FLAG_INVALID != 0
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        decode_head(&mut r)
    }
}

impl From<FileRecord> for TruncatedRecord {
    fn from(f: FileRecord) -> Self {
        Self {
            name: f.name,
            flags: f.flags,
            modified: f.modified,
            version: f.version,
            local_version: f.local_version,
        }
    }
}

fn decode_head(r: &mut Reader<'_>) -> Result<TruncatedRecord> {
    let name = r.bytes().context("decode record: name")?;
    let name = std::str::from_utf8(name)
        .context("decode record: name is not UTF-8")?
        .to_string();
    let flags = r.u32().context("decode record: flags")?;
    let modified = r.i64().context("decode record: modified")?;
    let version = r.u64().context("decode record: version")?;
    let local_version = r.u64().context("decode record: local_version")?;
    Ok(TruncatedRecord {
        name,
        flags,
        modified,
        version,
        local_version,
    })
}

/// A record in either shape, as produced by [`decode_any`]. Iterators that
/// take a `truncate` flag deliver this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyRecord {
    Full(FileRecord),
    Truncated(TruncatedRecord),
}

impl AnyRecord {
    pub fn name(&self) -> &str {
        match self {
            AnyRecord::Full(f) => &f.name,
            AnyRecord::Truncated(t) => &t.name,
        }
    }

    pub fn flags(&self) -> u32 {
        match self {
            AnyRecord::Full(f) => f.flags,
            AnyRecord::Truncated(t) => t.flags,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            AnyRecord::Full(f) => f.version,
            AnyRecord::Truncated(t) => t.version,
        }
    }

    pub fn local_version(&self) -> u64 {
        match self {
            AnyRecord::Full(f) => f.local_version,
            AnyRecord::Truncated(t) => t.local_version,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.flags() & FLAG_DELETED != 0
    }

    pub fn is_invalid(&self) -> bool {
        self.flags() & FLAG_INVALID != 0
    }
}

/// Decode stored bytes in full or truncated shape.
pub fn decode_any(bytes: &[u8], truncate: bool) -> Result<AnyRecord> {
    if truncate {
        Ok(AnyRecord::Truncated(TruncatedRecord::decode(bytes)?))
    } else {
        Ok(AnyRecord::Full(FileRecord::decode(bytes)?))
    }
}
