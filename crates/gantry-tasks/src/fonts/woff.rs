//! WOFF 1.0 encoder: each table zlib-compressed on its own.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::sfnt::{pad4, Font};

const SIGNATURE: &[u8; 4] = b"wOFF";
const HEADER_LEN: usize = 44;
const ENTRY_LEN: usize = 20;

/// Wrap a parsed font into a WOFF file.
pub fn encode(font: &Font<'_>) -> std::io::Result<Vec<u8>> {
    let mut blobs = Vec::with_capacity(font.tables.len());

    for table in &font.tables {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(table.data)?;
        let compressed = encoder.finish()?;

        // Tables that do not shrink are stored as-is
        if compressed.len() < table.data.len() {
            blobs.push(compressed);
        } else {
            blobs.push(table.data.to_vec());
        }
    }

    let mut offset = HEADER_LEN + ENTRY_LEN * font.tables.len();
    let total: usize = offset + blobs.iter().map(|b| pad4(b.len())).sum::<usize>();
    let (major, minor) = font.revision();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(SIGNATURE);
    out.extend_from_slice(&font.flavor.to_be_bytes());
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.extend_from_slice(&(font.tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&font.sfnt_size().to_be_bytes());
    out.extend_from_slice(&major.to_be_bytes());
    out.extend_from_slice(&minor.to_be_bytes());
    // No metadata or private block
    out.extend_from_slice(&[0; 20]);

    for (table, blob) in font.tables.iter().zip(&blobs) {
        out.extend_from_slice(&table.tag.0);
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(blob.len() as u32).to_be_bytes());
        out.extend_from_slice(&(table.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&table.checksum.to_be_bytes());
        offset += pad4(blob.len());
    }

    for blob in &blobs {
        out.extend_from_slice(blob);
        out.resize(pad4(out.len()), 0);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::sfnt::{build, TRUETYPE};
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_be_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn writes_header_and_directory() {
        let glyf = vec![7u8; 400];
        let sfnt = build(TRUETYPE, &[(b"glyf", &glyf), (b"cmap", b"xyz")]);
        let font = Font::parse(&sfnt).unwrap();

        let woff = encode(&font).unwrap();

        assert_eq!(&woff[..4], b"wOFF");
        assert_eq!(u32_at(&woff, 4), TRUETYPE);
        assert_eq!(u32_at(&woff, 8) as usize, woff.len());
        assert_eq!(u32_at(&woff, 16), font.sfnt_size());
        assert_eq!(woff.len() % 4, 0);

        // cmap is tiny and stored raw; glyf compresses
        let cmap = HEADER_LEN;
        assert_eq!(&woff[cmap..cmap + 4], b"cmap");
        assert_eq!(u32_at(&woff, cmap + 8), 3);
        assert_eq!(u32_at(&woff, cmap + 12), 3);

        let glyf_entry = HEADER_LEN + ENTRY_LEN;
        let offset = u32_at(&woff, glyf_entry + 4) as usize;
        let comp = u32_at(&woff, glyf_entry + 8) as usize;
        assert!(comp < 400);

        let mut restored = Vec::new();
        ZlibDecoder::new(&woff[offset..offset + comp])
            .read_to_end(&mut restored)
            .unwrap();
        assert_eq!(restored, glyf);
    }
}
