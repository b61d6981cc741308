// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Depot manifest codec.
//!
//! A manifest is a sequence of magic-delimited sections wrapping
//! serialized records: a payload section with the file list, a metadata
//! section with depot-level scalars, an ignored signature section and an
//! end marker. Decoding yields a typed [`Manifest`] with directory
//! entries dropped and every file's chunks ordered by offset, ready for
//! the download pipeline.

pub use self::manifest::{Chunk, DecryptError, FileEntry, FileFlags, Manifest};
pub use self::read::{
    parse, Error, END_MAGIC, LEGACY_MAGIC, METADATA_MAGIC, PAYLOAD_MAGIC, SIGNATURE_MAGIC,
};

mod manifest;
pub mod proto;
mod read;
