// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::Lazy;
use thiserror::Error;
use url::Url;

/// Shared client for tcp socket reuse and connection limit
static CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::ClientBuilder::new()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .expect("build reqwest client")
});

/// An opaque "fetch bytes from a URL" capability.
///
/// [`Http`] is the production implementation; tests substitute an
/// in-memory transport so runs stay hermetic.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: Url) -> Result<Bytes, Error>;
}

/// Transport backed by the shared [`reqwest`] client. `file://` URLs
/// dispatch to the local filesystem for mirror setups.
#[derive(Debug, Clone, Copy, Default)]
pub struct Http;

#[async_trait]
impl Transport for Http {
    async fn fetch(&self, url: Url) -> Result<Bytes, Error> {
        match url_file(&url) {
            Some(path) => read(path).await,
            _ => fetch(url).await,
        }
    }
}

async fn fetch(url: Url) -> Result<Bytes, Error> {
    let response = CLIENT.get(url).send().await?;
    Ok(response.error_for_status()?.bytes().await?)
}

async fn read(path: PathBuf) -> Result<Bytes, Error> {
    Ok(tokio::fs::read(path).await.map(Bytes::from)?)
}

fn url_file(url: &Url) -> Option<PathBuf> {
    if url.scheme() == "file" {
        url.to_file_path().ok()
    } else {
        None
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("fetch error: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("read error: {0}")]
    Read(#[from] io::Error),
}
