// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bitflags::bitflags;
use thiserror::Error;

use crypto::Key;

use crate::proto;

bitflags! {
    /// Attribute bits carried on every file entry
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileFlags: u32 {
        const USER_CONFIG = 1;
        const VERSIONED_USER_CONFIG = 1 << 1;
        const ENCRYPTED = 1 << 2;
        const READ_ONLY = 1 << 3;
        const HIDDEN = 1 << 4;
        const EXECUTABLE = 1 << 5;
        const DIRECTORY = 1 << 6;
        const CUSTOM_EXECUTABLE = 1 << 7;
        const INSTALL_SCRIPT = 1 << 8;
        const SYMLINK = 1 << 9;
    }
}

/// A fully decoded depot manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub depot_id: u64,
    pub manifest_id: u64,
    pub creation_time: u32,
    /// Set while file paths are still ciphertext; cleared by the one-time
    /// [`Manifest::decrypt_filenames`] pass
    pub filenames_encrypted: bool,
    pub files: Vec<FileEntry>,
}

/// One logical file, its chunks ordered by offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub filename: String,
    pub size: u64,
    pub flags: FileFlags,
    pub chunks: Vec<Chunk>,
}

/// Reference to one content-addressed unit of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Content SHA1 as lowercase hex; doubles as the CDN path segment
    /// and the post-decompression integrity check
    pub sha: String,
    pub offset: u64,
    pub uncompressed_size: u32,
    pub compressed_size: u32,
}

impl Manifest {
    /// Typed transform from the wire records. Directory entries are
    /// dropped and never reach scheduling.
    pub(crate) fn from_wire(metadata: proto::Metadata, payload: proto::Payload) -> Self {
        let files = payload
            .mappings
            .into_iter()
            .map(FileEntry::from_wire)
            .filter(|entry| !entry.flags.contains(FileFlags::DIRECTORY))
            .collect();

        Self {
            depot_id: metadata.depot_id.unwrap_or_default(),
            manifest_id: metadata.manifest_id.unwrap_or_default(),
            creation_time: metadata.creation_time.unwrap_or_default(),
            filenames_encrypted: metadata.filenames_encrypted.unwrap_or_default(),
            files,
        }
    }

    /// Decrypt every entry's filename in place: base64, then the
    /// symmetric cipher (no HMAC), truncated at the first NUL and read
    /// as UTF-8. Clears `filenames_encrypted` so the pass runs at most
    /// once per manifest.
    pub fn decrypt_filenames(&mut self, key: &Key) -> Result<(), DecryptError> {
        if !self.filenames_encrypted {
            return Ok(());
        }

        for file in &mut self.files {
            let ciphertext = BASE64.decode(file.filename.as_bytes())?;
            let plain = crypto::symmetric_decrypt(&ciphertext, key, false)?;
            let end = plain.iter().position(|b| *b == 0).unwrap_or(plain.len());
            file.filename = String::from_utf8(plain[..end].to_vec())?;
        }

        self.filenames_encrypted = false;
        Ok(())
    }
}

impl FileEntry {
    fn from_wire(mapping: proto::FileMapping) -> Self {
        let mut chunks: Vec<_> = mapping.chunks.into_iter().map(Chunk::from_wire).collect();
        chunks.sort_by_key(|chunk| chunk.offset);

        Self {
            filename: mapping.filename.unwrap_or_default(),
            size: mapping.size.unwrap_or_default(),
            flags: FileFlags::from_bits_truncate(mapping.flags.unwrap_or_default()),
            chunks,
        }
    }
}

impl Chunk {
    fn from_wire(chunk: proto::ChunkData) -> Self {
        Self {
            sha: hex::encode(chunk.sha.unwrap_or_default()),
            offset: chunk.offset.unwrap_or_default(),
            uncompressed_size: chunk.uncompressed_size.unwrap_or_default(),
            compressed_size: chunk.compressed_size.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("encrypted filename is not valid base64")]
    Base64(#[from] base64::DecodeError),
    #[error("filename decryption")]
    Crypto(#[from] crypto::Error),
    #[error("decrypted filename is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
