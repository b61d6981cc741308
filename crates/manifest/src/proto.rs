// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Wire records embedded in the manifest's payload and metadata
//! sections.
//!
//! These follow proto2 `optional` semantics: a field absent from the
//! wire decodes to `None`, while an explicitly encoded default decodes
//! to `Some(0)` (or equivalent). That distinction is meaningful to the
//! format and must survive decoding; [`prost`] provides it natively.

/// Body of the payload section: the depot's file list
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Payload {
    #[prost(message, repeated, tag = "1")]
    pub mappings: Vec<FileMapping>,
}

/// One file of the depot
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileMapping {
    /// Relative path; base64-wrapped ciphertext while filenames are
    /// encrypted
    #[prost(string, optional, tag = "1")]
    pub filename: Option<String>,
    /// Total size in bytes of the reconstructed file
    #[prost(uint64, optional, tag = "2")]
    pub size: Option<u64>,
    #[prost(uint32, optional, tag = "3")]
    pub flags: Option<u32>,
    /// SHA1 of the (lowercased) filename
    #[prost(bytes = "vec", optional, tag = "4")]
    pub sha_filename: Option<Vec<u8>>,
    /// SHA1 of the whole file's content
    #[prost(bytes = "vec", optional, tag = "5")]
    pub sha_content: Option<Vec<u8>>,
    #[prost(message, repeated, tag = "6")]
    pub chunks: Vec<ChunkData>,
    #[prost(string, optional, tag = "7")]
    pub link_target: Option<String>,
}

/// One content-addressed unit of a file
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChunkData {
    /// 20 byte content SHA1, doubling as the CDN address
    #[prost(bytes = "vec", optional, tag = "1")]
    pub sha: Option<Vec<u8>>,
    #[prost(fixed32, optional, tag = "2")]
    pub crc: Option<u32>,
    /// Byte offset of this chunk within the reconstructed file
    #[prost(uint64, optional, tag = "3")]
    pub offset: Option<u64>,
    #[prost(uint32, optional, tag = "4")]
    pub uncompressed_size: Option<u32>,
    #[prost(uint32, optional, tag = "5")]
    pub compressed_size: Option<u32>,
}

/// Body of the metadata section: depot-level scalars
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metadata {
    #[prost(uint64, optional, tag = "1")]
    pub depot_id: Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    pub manifest_id: Option<u64>,
    #[prost(uint32, optional, tag = "3")]
    pub creation_time: Option<u32>,
    #[prost(bool, optional, tag = "4")]
    pub filenames_encrypted: Option<bool>,
    #[prost(uint64, optional, tag = "5")]
    pub original_size: Option<u64>,
    #[prost(uint64, optional, tag = "6")]
    pub compressed_size: Option<u64>,
    #[prost(uint32, optional, tag = "7")]
    pub unique_chunks: Option<u32>,
}

/// Body of the signature section. Parsed only by tooling; the download
/// pipeline skips it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Signature {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub signature: Option<Vec<u8>>,
}
