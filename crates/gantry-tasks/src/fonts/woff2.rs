//! WOFF 2.0 encoder.
//!
//! Tables are concatenated and compressed as a single brotli stream. No
//! table transforms are applied; `glyf` and `loca` carry the null
//! transform version.

use std::io::Write;

use brotli::CompressorWriter;

use super::sfnt::{Font, Tag};

const SIGNATURE: &[u8; 4] = b"wOF2";
const HEADER_LEN: usize = 48;

const BROTLI_BUFFER: usize = 4096;
const BROTLI_QUALITY: u32 = 11;
const BROTLI_WINDOW: u32 = 22;

/// Flag index meaning "tag follows explicitly".
const ARBITRARY_TAG: u8 = 63;

/// Null transform for `glyf`/`loca` (version 0 means transformed).
const NULL_GLYF_TRANSFORM: u8 = 3 << 6;

/// Tags with a one-byte shorthand, in index order.
const KNOWN_TAGS: [&[u8; 4]; 63] = [
    b"cmap", b"head", b"hhea", b"hmtx", b"maxp", b"name", b"OS/2", b"post", b"cvt ", b"fpgm",
    b"glyf", b"loca", b"prep", b"CFF ", b"VORG", b"EBDT", b"EBLC", b"gasp", b"hdmx", b"kern",
    b"LTSH", b"PCLT", b"VDMX", b"vhea", b"vmtx", b"BASE", b"GDEF", b"GPOS", b"GSUB", b"EBSC",
    b"JSTF", b"MATH", b"CBDT", b"CBLC", b"COLR", b"CPAL", b"SVG ", b"sbix", b"acnt", b"avar",
    b"bdat", b"bloc", b"bsln", b"cvar", b"fdsc", b"feat", b"fmtx", b"fvar", b"gvar", b"hsty",
    b"just", b"lcar", b"mort", b"morx", b"opbd", b"prop", b"trak", b"Zapf", b"Silf", b"Glat",
    b"Gloc", b"Feat", b"Sill",
];

/// Wrap a parsed font into a WOFF2 file.
pub fn encode(font: &Font<'_>) -> std::io::Result<Vec<u8>> {
    let mut stream = Vec::with_capacity(font.tables.iter().map(|t| t.data.len()).sum());
    for table in &font.tables {
        stream.extend_from_slice(table.data);
    }

    let mut writer = CompressorWriter::new(Vec::new(), BROTLI_BUFFER, BROTLI_QUALITY, BROTLI_WINDOW);
    writer.write_all(&stream)?;
    writer.flush()?;
    let compressed = writer.into_inner();

    let mut directory = Vec::new();
    for table in &font.tables {
        write_entry(&mut directory, table.tag, table.data.len() as u32);
    }

    let total = HEADER_LEN + directory.len() + compressed.len();
    let (major, minor) = font.revision();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(SIGNATURE);
    out.extend_from_slice(&font.flavor.to_be_bytes());
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.extend_from_slice(&(font.tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&font.sfnt_size().to_be_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
    out.extend_from_slice(&major.to_be_bytes());
    out.extend_from_slice(&minor.to_be_bytes());
    // No metadata or private block
    out.extend_from_slice(&[0; 20]);

    out.extend_from_slice(&directory);
    out.extend_from_slice(&compressed);

    Ok(out)
}

fn write_entry(out: &mut Vec<u8>, tag: Tag, length: u32) {
    let index = KNOWN_TAGS.iter().position(|known| **known == tag.0);

    let transform = if tag == Tag::GLYF || tag == Tag::LOCA {
        NULL_GLYF_TRANSFORM
    } else {
        0
    };

    match index {
        Some(i) => out.push(i as u8 | transform),
        None => {
            out.push(ARBITRARY_TAG | transform);
            out.extend_from_slice(&tag.0);
        }
    }

    write_base128(out, length);
}

/// Big-endian base-128 varint with continuation bits.
fn write_base128(out: &mut Vec<u8>, mut value: u32) {
    let mut digits = Vec::with_capacity(5);
    loop {
        digits.push((value & 0x7f) as u8);
        value >>= 7;
        if value == 0 {
            break;
        }
    }

    for (i, digit) in digits.iter().enumerate().rev() {
        out.push(if i == 0 { *digit } else { digit | 0x80 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::sfnt::{build, TRUETYPE};
    use std::io::Read;

    #[test]
    fn encodes_base128() {
        let mut out = Vec::new();
        write_base128(&mut out, 0);
        write_base128(&mut out, 127);
        write_base128(&mut out, 128);
        write_base128(&mut out, 16384);

        assert_eq!(out, [0x00, 0x7f, 0x81, 0x00, 0x81, 0x80, 0x00]);
    }

    #[test]
    fn uses_tag_shorthands() {
        let mut out = Vec::new();
        write_entry(&mut out, Tag(*b"cmap"), 10);
        write_entry(&mut out, Tag::GLYF, 10);
        write_entry(&mut out, Tag(*b"ZZZZ"), 10);

        assert_eq!(out, [0, 10, 10 | 0xc0, 10, 63, b'Z', b'Z', b'Z', b'Z', 10]);
    }

    #[test]
    fn compresses_the_table_stream() {
        let glyf = vec![1u8; 300];
        let sfnt = build(TRUETYPE, &[(b"cmap", b"abcd"), (b"glyf", &glyf), (b"loca", b"\0\0")]);
        let font = Font::parse(&sfnt).unwrap();

        let woff2 = encode(&font).unwrap();

        assert_eq!(&woff2[..4], b"wOF2");
        let length = u32::from_be_bytes(woff2[8..12].try_into().unwrap()) as usize;
        assert_eq!(length, woff2.len());

        // cmap, glyf (2-byte varint), loca
        let directory_len = 2 + 3 + 2;
        let compressed = &woff2[HEADER_LEN + directory_len..];
        let declared = u32::from_be_bytes(woff2[20..24].try_into().unwrap()) as usize;
        assert_eq!(declared, compressed.len());

        let mut stream = Vec::new();
        brotli::Decompressor::new(compressed, 4096)
            .read_to_end(&mut stream)
            .unwrap();

        let mut expected = b"abcd".to_vec();
        expected.extend_from_slice(&glyf);
        expected.extend_from_slice(b"\0\0");
        assert_eq!(stream, expected);
    }
}
