// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io::{self, Cursor, Read};

use prost::Message;
use thiserror::Error;

use crate::proto;
use crate::Manifest;

/// Section magics, little endian on the wire
pub const PAYLOAD_MAGIC: u32 = 0x71F6_17D0;
pub const METADATA_MAGIC: u32 = 0x1F48_12BE;
pub const SIGNATURE_MAGIC: u32 = 0x1B81_B817;
pub const END_MAGIC: u32 = 0x32C4_15AB;
/// Marks the older manifest generation, which this codec does not read
pub const LEGACY_MAGIC: u32 = 0x1634_9781;

/// Decode a manifest byte stream into a [`Manifest`].
///
/// Sections may appear in any order; parsing stops at the end marker or
/// when the stream is exhausted. Missing payload or metadata sections
/// leave an empty file list or zeroed metadata rather than failing.
pub fn parse(bytes: &[u8]) -> Result<Manifest, Error> {
    let mut reader = Cursor::new(bytes);
    let mut payload = None;
    let mut metadata = None;

    while (reader.position() as usize) < bytes.len() {
        let offset = reader.position();
        match read_u32(&mut reader)? {
            PAYLOAD_MAGIC => {
                let blob = read_section(&mut reader)?;
                payload = Some(proto::Payload::decode(blob.as_slice())?);
            }
            METADATA_MAGIC => {
                let blob = read_section(&mut reader)?;
                metadata = Some(proto::Metadata::decode(blob.as_slice())?);
            }
            SIGNATURE_MAGIC => {
                // Present but not semantically used
                read_section(&mut reader)?;
            }
            END_MAGIC => break,
            LEGACY_MAGIC => return Err(Error::LegacyManifest),
            magic => return Err(Error::UnknownMagic { magic, offset }),
        }
    }

    Ok(Manifest::from_wire(
        metadata.unwrap_or_default(),
        payload.unwrap_or_default(),
    ))
}

fn read_u32(reader: &mut Cursor<&[u8]>) -> Result<u32, Error> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_section(reader: &mut Cursor<&[u8]>) -> Result<Vec<u8>, Error> {
    let length = read_u32(reader)? as usize;
    let mut blob = vec![0u8; length];
    reader.read_exact(&mut blob)?;
    Ok(blob)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown section magic {magic:08x} at offset {offset}")]
    UnknownMagic { magic: u32, offset: u64 },
    #[error("legacy manifest containers are not supported")]
    LegacyManifest,
    #[error("manifest truncated mid-section")]
    Truncated,
    #[error("section record decode")]
    Record(#[from] prost::DecodeError),
    #[error("io")]
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => Error::Truncated,
            _ => Error::Io(error),
        }
    }
}
