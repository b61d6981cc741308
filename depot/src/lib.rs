// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Depot download client.
//!
//! Maps a decoded manifest onto a bounded-concurrency sequence of CDN
//! chunk fetches and reconstructs the depot's files on disk, resuming
//! over anything already fully written.

pub use self::client::{Client, Config, DownloadRequest, Event, Summary};
pub use self::server::{HttpsSupport, Pool, Server};

pub mod client;
pub mod environment;
pub mod request;
pub mod server;
