// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Chunk container codecs.
//!
//! Content chunks arrive from the CDN wrapped in one of three container
//! formats, each identified by its leading signature: a zstd container,
//! an LZMA container, or a plain ZIP archive holding a single entry.
//! The framed formats carry a trailer with the CRC32 and byte length of
//! the decompressed payload; both are validated before any bytes are
//! handed back.

use std::io;

use thiserror::Error;

pub mod vzip;
pub mod zip;
pub mod zstd;

/// Leading signature of the zstd container format
pub const ZSTD_MAGIC: &[u8] = b"VSZa";

/// Leading signature of the LZMA container format
pub const VZIP_MAGIC: &[u8] = b"VZa";

/// Standard local-file-header signature of a ZIP archive
pub const PKZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Unpack a chunk container, auto-detecting the format from its
/// signature. Pure, CPU-bound transform.
pub fn unpack(data: &[u8]) -> Result<Vec<u8>, Error> {
    if data.starts_with(ZSTD_MAGIC) {
        zstd::decompress(data)
    } else if data.starts_with(VZIP_MAGIC) {
        vzip::decompress(data)
    } else if data.starts_with(PKZIP_MAGIC) {
        zip::decompress(data)
    } else {
        let mut signature = [0u8; 4];
        let len = data.len().min(4);
        signature[..len].copy_from_slice(&data[..len]);
        Err(Error::UnknownFormat { signature })
    }
}

/// Container format a chunk was wrapped in, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    Zstd,
    Vzip,
    Zip,
}

/// Check the decompressed payload against the trailer's declared size
/// and CRC32. The trailer is authoritative for both framed formats.
pub(crate) fn validate(
    plain: Vec<u8>,
    declared_size: usize,
    declared_crc: u32,
    format: Format,
) -> Result<Vec<u8>, Error> {
    if plain.len() != declared_size {
        return Err(Error::SizeMismatch {
            format,
            got: plain.len(),
            declared: declared_size,
        });
    }

    let crc = crc32fast::hash(&plain);
    if crc != declared_crc {
        return Err(Error::ChecksumMismatch {
            format,
            got: crc,
            expected: declared_crc,
        });
    }

    Ok(plain)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown chunk container signature {signature:02x?}")]
    UnknownFormat { signature: [u8; 4] },
    #[error("{0}: container shorter than its framing")]
    Truncated(Format),
    #[error("{0}: container framing magic missing")]
    BadFraming(Format),
    #[error("{format}: decompressed {got} bytes, trailer declares {declared}")]
    SizeMismatch {
        format: Format,
        got: usize,
        declared: usize,
    },
    #[error("{format}: CRC mismatch on decompressed data: got {got:08x}, expected {expected:08x}")]
    ChecksumMismatch {
        format: Format,
        got: u32,
        expected: u32,
    },
    #[error("lzma codec")]
    Lzma(#[from] lzma_rs::error::Error),
    #[error("zip archive")]
    Archive(#[from] ::zip::result::ZipError),
    #[error("io")]
    Io(#[from] io::Error),
}
