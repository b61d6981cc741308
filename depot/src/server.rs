// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

//! CDN server directory and round-robin selection.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::warn;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::environment;
use crate::request::{self, Transport};

/// One CDN endpoint from the directory service
#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub https_support: HttpsSupport,
}

impl Server {
    /// Scheme chunks are fetched with from this server
    pub fn scheme(&self) -> &'static str {
        match self.https_support {
            HttpsSupport::Mandatory => "https",
            HttpsSupport::Optional | HttpsSupport::None => "http",
        }
    }

    /// Address of one content chunk on this server
    pub fn chunk_url(&self, depot_id: u64, sha: &str) -> Result<Url, Error> {
        Ok(Url::parse(&format!(
            "{}://{}/depot/{depot_id}/chunk/{sha}",
            self.scheme(),
            self.host
        ))?)
    }
}

/// Transport security advertised by a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpsSupport {
    Mandatory,
    Optional,
    None,
}

#[derive(Deserialize)]
struct Directory {
    response: DirectoryBody,
}

#[derive(Deserialize)]
struct DirectoryBody {
    servers: Vec<Server>,
}

/// Fixed pool of CDN servers, cycled per chunk to spread load
#[derive(Debug)]
pub struct Pool {
    servers: Vec<Server>,
    cursor: AtomicUsize,
}

impl Pool {
    pub fn new(servers: Vec<Server>) -> Result<Self, Error> {
        if servers.is_empty() {
            return Err(Error::EmptyPool);
        }
        Ok(Self {
            servers,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Resolve the pool from the directory service, bounded to
    /// `max_servers` entries
    pub async fn resolve(transport: &dyn Transport, max_servers: usize) -> Result<Self, Error> {
        let mut url = Url::parse(environment::SERVER_DIRECTORY_URL)?;
        url.query_pairs_mut()
            .append_pair("max_servers", &max_servers.to_string());

        let body = transport.fetch(url).await?;
        let directory: Directory = serde_json::from_slice(&body)?;

        let servers: Vec<_> = directory
            .response
            .servers
            .into_iter()
            .take(max_servers)
            .collect();
        if servers.len() < max_servers {
            warn!("directory returned {} of {max_servers} servers", servers.len());
        }

        Self::new(servers)
    }

    /// Next server in round-robin order. Shared by every in-flight chunk
    /// fetch; the atomic add keeps the index in bounds under races, and
    /// strict fairness is not required.
    pub fn next(&self) -> &Server {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.servers.len();
        &self.servers[index]
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("server directory returned no servers")]
    EmptyPool,
    #[error("invalid server url")]
    InvalidUrl(#[from] url::ParseError),
    #[error("directory response decode")]
    Decode(#[from] serde_json::Error),
    #[error("request")]
    Request(#[from] request::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    fn server(host: &str, https_support: HttpsSupport) -> Server {
        Server {
            host: host.into(),
            https_support,
        }
    }

    #[test]
    fn round_robin_wraps() {
        let pool = Pool::new(vec![
            server("one.cdn", HttpsSupport::Optional),
            server("two.cdn", HttpsSupport::Optional),
        ])
        .expect("non-empty");

        let hosts: Vec<_> = (0..5).map(|_| pool.next().host.clone()).collect();
        assert_eq!(hosts, ["one.cdn", "two.cdn", "one.cdn", "two.cdn", "one.cdn"]);
    }

    #[test]
    fn empty_pool_is_an_error() {
        assert!(matches!(Pool::new(vec![]), Err(Error::EmptyPool)));
    }

    #[test]
    fn scheme_follows_https_support() {
        assert_eq!(server("a", HttpsSupport::Mandatory).scheme(), "https");
        assert_eq!(server("a", HttpsSupport::Optional).scheme(), "http");
        assert_eq!(server("a", HttpsSupport::None).scheme(), "http");
    }

    #[test]
    fn chunk_url_shape() {
        let url = server("cache1-fra2.cdn", HttpsSupport::Mandatory)
            .chunk_url(1007, &"ab".repeat(20))
            .expect("valid url");
        assert_eq!(
            url.as_str(),
            format!("https://cache1-fra2.cdn/depot/1007/chunk/{}", "ab".repeat(20))
        );
    }

    #[test]
    fn directory_records_decode() {
        let body = r#"{
            "response": {
                "servers": [
                    {"host": "cache1.cdn", "https_support": "mandatory"},
                    {"host": "cache2.cdn", "https_support": "optional"},
                    {"host": "cache3.cdn", "https_support": "none"}
                ]
            }
        }"#;

        let directory: Directory = serde_json::from_str(body).expect("decodes");
        assert_eq!(directory.response.servers.len(), 3);
        assert_eq!(
            directory.response.servers[0].https_support,
            HttpsSupport::Mandatory
        );
    }
}
