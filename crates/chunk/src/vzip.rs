// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The LZMA chunk container: 3 byte magic, 4 reserved bytes, the raw
//! 5 byte LZMA properties blob, compressed payload, then a 10 byte
//! trailer of CRC32, declared size and the `zv` suffix. The payload is
//! a headerless LZMA stream; decoding rebuilds the standard LZMA-alone
//! header from the stored properties and the trailer's declared size.

use std::io::Cursor;

use lzma_rs::compress::{Options, UnpackedSize};

use crate::{Error, Format, VZIP_MAGIC};

const PROPERTIES_SIZE: usize = 5;
const HEADER_SIZE: usize = 3 + 4 + PROPERTIES_SIZE;
const TRAILER_SIZE: usize = 10;
const TRAILER_MAGIC: &[u8] = b"zv";

/// Size of the LZMA-alone header: properties plus a u64 length field
const LZMA_HEADER_SIZE: usize = PROPERTIES_SIZE + 8;

pub fn decompress(data: &[u8]) -> Result<Vec<u8>, Error> {
    if data.len() < HEADER_SIZE + TRAILER_SIZE {
        return Err(Error::Truncated(Format::Vzip));
    }

    let properties = &data[HEADER_SIZE - PROPERTIES_SIZE..HEADER_SIZE];
    let payload = &data[HEADER_SIZE..data.len() - TRAILER_SIZE];
    let trailer = &data[data.len() - TRAILER_SIZE..];

    let declared_crc = u32::from_le_bytes(trailer[0..4].try_into().expect("4 bytes"));
    let declared_size = u32::from_le_bytes(trailer[4..8].try_into().expect("4 bytes")) as usize;
    if &trailer[8..] != TRAILER_MAGIC {
        return Err(Error::BadFraming(Format::Vzip));
    }

    // LZMA-alone header: properties, then the uncompressed size as a
    // little-endian u64 with the high half zero
    let mut stream = Vec::with_capacity(LZMA_HEADER_SIZE + payload.len());
    stream.extend_from_slice(properties);
    stream.extend_from_slice(&(declared_size as u64).to_le_bytes());
    stream.extend_from_slice(payload);

    let mut plain = Vec::with_capacity(declared_size);
    lzma_rs::lzma_decompress(&mut Cursor::new(stream), &mut plain)?;

    crate::validate(plain, declared_size, declared_crc, Format::Vzip)
}

/// Frame `plain` into the LZMA container
pub fn compress(plain: &[u8]) -> Result<Vec<u8>, Error> {
    let mut stream = Vec::new();
    lzma_rs::lzma_compress_with_options(
        &mut Cursor::new(plain),
        &mut stream,
        &Options {
            unpacked_size: UnpackedSize::WriteToHeader(Some(plain.len() as u64)),
        },
    )?;

    // The container carries its own framing; drop the LZMA-alone header
    // and keep only the properties blob
    let properties = &stream[..PROPERTIES_SIZE];
    let payload = &stream[LZMA_HEADER_SIZE..];

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    out.extend_from_slice(VZIP_MAGIC);
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(properties);
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc32fast::hash(plain).to_le_bytes());
    out.extend_from_slice(&(plain.len() as u32).to_le_bytes());
    out.extend_from_slice(TRAILER_MAGIC);
    Ok(out)
}
