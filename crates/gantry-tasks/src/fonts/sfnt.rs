//! Minimal sfnt (TrueType/OpenType) table directory reader.

use std::fmt;

/// `0x00010000`: TrueType outlines.
pub const TRUETYPE: u32 = 0x0001_0000;
/// `true`: legacy Apple TrueType.
pub const APPLE_TRUETYPE: u32 = u32::from_be_bytes(*b"true");
/// `OTTO`: CFF outlines.
pub const CFF: u32 = u32::from_be_bytes(*b"OTTO");

const HEADER_LEN: usize = 12;
const RECORD_LEN: usize = 16;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SfntError {
    #[error("file is truncated")]
    Truncated,

    #[error("unknown sfnt version {0:#010x}")]
    UnknownFlavor(u32),

    #[error("font has no tables")]
    Empty,

    #[error("table '{tag}' lies outside the file")]
    TableBounds { tag: Tag },
}

/// Four-byte table tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const GLYF: Tag = Tag(*b"glyf");
    pub const LOCA: Tag = Tag(*b"loca");
    pub const HEAD: Tag = Tag(*b"head");
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// A table borrowed from the font file.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    pub tag: Tag,
    pub checksum: u32,
    pub data: &'a [u8],
}

/// A parsed font: its flavor and tables sorted by tag.
#[derive(Debug, Clone)]
pub struct Font<'a> {
    pub flavor: u32,
    pub tables: Vec<Table<'a>>,
}

impl<'a> Font<'a> {
    /// Parse the table directory of a single (non-collection) font.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, SfntError> {
        let flavor = read_u32(bytes, 0)?;
        if ![TRUETYPE, APPLE_TRUETYPE, CFF].contains(&flavor) {
            return Err(SfntError::UnknownFlavor(flavor));
        }

        let count = read_u16(bytes, 4)? as usize;
        if count == 0 {
            return Err(SfntError::Empty);
        }

        let mut tables = Vec::with_capacity(count);

        for i in 0..count {
            let record = HEADER_LEN + i * RECORD_LEN;
            let tag = Tag(
                bytes
                    .get(record..record + 4)
                    .and_then(|t| t.try_into().ok())
                    .ok_or(SfntError::Truncated)?,
            );
            let checksum = read_u32(bytes, record + 4)?;
            let offset = read_u32(bytes, record + 8)? as usize;
            let length = read_u32(bytes, record + 12)? as usize;

            let data = offset
                .checked_add(length)
                .and_then(|end| bytes.get(offset..end))
                .ok_or(SfntError::TableBounds { tag })?;

            tables.push(Table {
                tag,
                checksum,
                data,
            });
        }

        tables.sort_by_key(|t| t.tag);

        Ok(Self { flavor, tables })
    }

    pub fn table(&self, tag: Tag) -> Option<&Table<'a>> {
        self.tables.iter().find(|t| t.tag == tag)
    }

    /// `fontRevision` from `head`, split into major and minor parts.
    pub fn revision(&self) -> (u16, u16) {
        self.table(Tag::HEAD)
            .and_then(|head| Some((read_u16(head.data, 4).ok()?, read_u16(head.data, 6).ok()?)))
            .unwrap_or((1, 0))
    }

    /// Size of the font when laid out as a plain sfnt file.
    pub fn sfnt_size(&self) -> u32 {
        let tables: usize = self.tables.iter().map(|t| pad4(t.data.len())).sum();
        (HEADER_LEN + RECORD_LEN * self.tables.len() + tables) as u32
    }
}

/// Round up to the next multiple of four.
pub fn pad4(len: usize) -> usize {
    (len + 3) & !3
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16, SfntError> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(SfntError::Truncated)
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, SfntError> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(SfntError::Truncated)
}

/// Build an sfnt file from `(tag, data)` pairs; used by tests.
#[cfg(test)]
pub(crate) fn build(flavor: u32, tables: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&flavor.to_be_bytes());
    out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&[0; 6]);

    let mut offset = HEADER_LEN + RECORD_LEN * tables.len();
    for (tag, data) in tables {
        out.extend_from_slice(*tag);
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        offset += pad4(data.len());
    }
    for (_, data) in tables {
        out.extend_from_slice(data);
        out.resize(pad4(out.len()), 0);
    }

    out
}
