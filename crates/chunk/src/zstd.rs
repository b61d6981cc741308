// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The zstd chunk container: 4 byte magic, 4 reserved bytes, compressed
//! payload, then a 15 byte trailer of CRC32, declared decompressed size,
//! 4 more reserved bytes and the `zsv` suffix.

use crate::{Error, Format, ZSTD_MAGIC};

const HEADER_SIZE: usize = 8;
const TRAILER_SIZE: usize = 15;
const TRAILER_MAGIC: &[u8] = b"zsv";

pub fn decompress(data: &[u8]) -> Result<Vec<u8>, Error> {
    if data.len() < HEADER_SIZE + TRAILER_SIZE {
        return Err(Error::Truncated(Format::Zstd));
    }

    let payload = &data[HEADER_SIZE..data.len() - TRAILER_SIZE];
    let trailer = &data[data.len() - TRAILER_SIZE..];

    let declared_crc = u32::from_le_bytes(trailer[0..4].try_into().expect("4 bytes"));
    let declared_size = u32::from_le_bytes(trailer[4..8].try_into().expect("4 bytes")) as usize;
    if &trailer[12..] != TRAILER_MAGIC {
        return Err(Error::BadFraming(Format::Zstd));
    }

    let plain = zstd::bulk::decompress(payload, declared_size)?;

    crate::validate(plain, declared_size, declared_crc, Format::Zstd)
}

/// Frame `plain` into the zstd container
pub fn compress(plain: &[u8]) -> Result<Vec<u8>, Error> {
    let payload = zstd::bulk::compress(plain, zstd::DEFAULT_COMPRESSION_LEVEL)?;

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    out.extend_from_slice(ZSTD_MAGIC);
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&payload);
    out.extend_from_slice(&crc32fast::hash(plain).to_le_bytes());
    out.extend_from_slice(&(plain.len() as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(TRAILER_MAGIC);
    Ok(out)
}
