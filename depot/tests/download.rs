// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

//! End-to-end download runs against an in-memory CDN.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use prost::Message;
use sha1::{Digest, Sha1};
use url::Url;

use crypto::Key;
use depot::client::{Client, Config, DownloadRequest, Event, Summary};
use depot::environment;
use depot::request::{self, Transport};
use manifest::proto;

const DEPOT_ID: u64 = 57;

fn key() -> Key {
    Key::from_bytes([7; 32])
}

#[derive(Default)]
struct Counters {
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Serves directory and chunk URLs from a map, tracking the number of
/// concurrently in-flight fetches
struct MemoryTransport {
    responses: HashMap<String, Bytes>,
    counters: Arc<Counters>,
}

impl MemoryTransport {
    fn new(responses: HashMap<String, Bytes>) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            Self {
                responses,
                counters: counters.clone(),
            },
            counters,
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, url: Url) -> Result<Bytes, request::Error> {
        self.counters.fetches.fetch_add(1, Ordering::SeqCst);
        let current = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(current, Ordering::SeqCst);

        // Yield so concurrent fetches overlap
        tokio::time::sleep(Duration::from_millis(2)).await;

        let response = self.responses.get(url.as_str()).cloned().ok_or_else(|| {
            request::Error::Read(io::Error::new(io::ErrorKind::NotFound, url.to_string()))
        });

        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

fn directory_url(max_servers: usize) -> String {
    format!(
        "{}?max_servers={max_servers}",
        environment::SERVER_DIRECTORY_URL
    )
}

fn directory_json(hosts: &[&str]) -> Bytes {
    let servers = hosts
        .iter()
        .map(|host| format!(r#"{{"host": "{host}", "https_support": "optional"}}"#))
        .collect::<Vec<_>>()
        .join(",");
    Bytes::from(format!(r#"{{"response": {{"servers": [{servers}]}}}}"#))
}

/// Pack and encrypt `plain` the way the CDN stores it, returning its
/// content address and body
fn chunk_body(plain: &[u8]) -> (String, Bytes) {
    let sha = hex::encode(Sha1::digest(plain));
    let packed = chunk::zstd::compress(plain).expect("compress");
    (sha, Bytes::from(crypto::symmetric_encrypt(&packed, &key(), &[9; 16])))
}

fn file_mapping(filename: &str, chunks: &[(&str, u64, &[u8])]) -> proto::FileMapping {
    proto::FileMapping {
        filename: Some(filename.into()),
        size: Some(chunks.iter().map(|(_, _, plain)| plain.len() as u64).sum()),
        chunks: chunks
            .iter()
            .map(|(sha, offset, plain)| proto::ChunkData {
                sha: Some(hex::decode(sha).expect("hex sha")),
                offset: Some(*offset),
                uncompressed_size: Some(plain.len() as u32),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn section(magic: u32, body: &[u8]) -> Vec<u8> {
    let mut bytes = magic.to_le_bytes().to_vec();
    bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
    bytes.extend_from_slice(body);
    bytes
}

fn manifest_bytes(metadata: proto::Metadata, payload: proto::Payload) -> Vec<u8> {
    let mut bytes = section(manifest::PAYLOAD_MAGIC, &payload.encode_to_vec());
    bytes.extend(section(manifest::METADATA_MAGIC, &metadata.encode_to_vec()));
    bytes.extend(manifest::END_MAGIC.to_le_bytes());
    bytes
}

fn metadata() -> proto::Metadata {
    proto::Metadata {
        depot_id: Some(DEPOT_ID),
        ..Default::default()
    }
}

struct Run {
    dir: tempfile::TempDir,
    client: Client,
    counters: Arc<Counters>,
    manifest_path: std::path::PathBuf,
}

fn setup(
    max_servers: usize,
    bytes: Vec<u8>,
    responses: HashMap<String, Bytes>,
) -> Run {
    let dir = tempfile::tempdir().expect("tempdir");
    let manifest_path = dir.path().join("test.manifest");
    std::fs::write(&manifest_path, bytes).expect("write manifest");

    let (transport, counters) = MemoryTransport::new(responses);
    let client = Client::with_transport(
        Config {
            output_dir: dir.path().join("depots"),
            max_servers,
        },
        transport,
    );

    Run {
        dir,
        client,
        counters,
        manifest_path,
    }
}

#[tokio::test]
async fn downloads_single_chunk_file() {
    let plain = b"data";
    let (sha, body) = chunk_body(plain);

    let payload = proto::Payload {
        mappings: vec![
            proto::FileMapping {
                filename: Some("game".into()),
                flags: Some(manifest::FileFlags::DIRECTORY.bits()),
                ..Default::default()
            },
            file_mapping("game/save.dat", &[(&sha, 0, plain)]),
        ],
    };

    let mut responses = HashMap::new();
    responses.insert(directory_url(2), directory_json(&["one.cdn", "two.cdn"]));
    for host in ["one.cdn", "two.cdn"] {
        responses.insert(
            format!("http://{host}/depot/{DEPOT_ID}/chunk/{sha}"),
            body.clone(),
        );
    }

    let run = setup(2, manifest_bytes(metadata(), payload), responses);

    let events = Mutex::new(Vec::new());
    let summary = run
        .client
        .download(
            DownloadRequest {
                manifest_path: run.manifest_path.clone(),
                key: key(),
            },
            |event| {
                if let Event::Progress(text) = event {
                    events.lock().unwrap().push(text.to_owned());
                }
            },
        )
        .await
        .expect("run succeeds");

    assert!(matches!(
        summary,
        Summary::Completed {
            depot_id: DEPOT_ID,
            files: 1,
            ..
        }
    ));
    let written =
        std::fs::read(run.dir.path().join("depots/57/game/save.dat")).expect("file exists");
    assert_eq!(written, plain);
    assert!(!events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn complete_files_mean_nothing_to_do() {
    let plain = b"already here";
    let (sha, _) = chunk_body(plain);

    let payload = proto::Payload {
        mappings: vec![file_mapping("data.bin", &[(&sha, 0, plain)])],
    };

    // No CDN responses registered: nothing may be fetched
    let run = setup(2, manifest_bytes(metadata(), payload), HashMap::new());

    let target = run.dir.path().join("depots/57/data.bin");
    std::fs::create_dir_all(target.parent().unwrap()).expect("mkdir");
    std::fs::write(&target, plain).expect("pre-write");

    let summary = run
        .client
        .download(
            DownloadRequest {
                manifest_path: run.manifest_path.clone(),
                key: key(),
            },
            |_| {},
        )
        .await
        .expect("run succeeds");

    assert_eq!(
        summary,
        Summary::NothingToDo {
            depot_id: DEPOT_ID
        }
    );
    assert_eq!(run.counters.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn multi_chunk_files_reassemble_in_offset_order() {
    let parts: [&[u8]; 3] = [&[0xaa; 16], &[0xbb; 16], &[0xcc; 8]];
    let bodies: Vec<_> = parts.iter().map(|part| chunk_body(part)).collect();

    // Chunks listed out of offset order on the wire
    let payload = proto::Payload {
        mappings: vec![file_mapping(
            "big.bin",
            &[
                (&bodies[2].0, 32, parts[2]),
                (&bodies[0].0, 0, parts[0]),
                (&bodies[1].0, 16, parts[1]),
            ],
        )],
    };

    let mut responses = HashMap::new();
    responses.insert(directory_url(2), directory_json(&["one.cdn", "two.cdn"]));
    for (sha, body) in &bodies {
        for host in ["one.cdn", "two.cdn"] {
            responses.insert(
                format!("http://{host}/depot/{DEPOT_ID}/chunk/{sha}"),
                body.clone(),
            );
        }
    }

    let run = setup(2, manifest_bytes(metadata(), payload), responses);

    // A stale partial file must be re-downloaded
    let target = run.dir.path().join("depots/57/big.bin");
    std::fs::create_dir_all(target.parent().unwrap()).expect("mkdir");
    std::fs::write(&target, b"stale").expect("pre-write");

    run.client
        .download(
            DownloadRequest {
                manifest_path: run.manifest_path.clone(),
                key: key(),
            },
            |_| {},
        )
        .await
        .expect("run succeeds");

    let expected: Vec<u8> = parts.concat();
    assert_eq!(std::fs::read(&target).expect("file exists"), expected);
}

#[tokio::test]
async fn chunk_hash_mismatch_aborts_the_run() {
    let plain = b"expected content";
    let (sha, _) = chunk_body(plain);
    // The CDN returns a valid container holding the wrong content
    let (_, wrong_body) = chunk_body(b"malicious content");

    let payload = proto::Payload {
        mappings: vec![file_mapping("data.bin", &[(&sha, 0, plain)])],
    };

    let mut responses = HashMap::new();
    responses.insert(directory_url(1), directory_json(&["one.cdn"]));
    responses.insert(
        format!("http://one.cdn/depot/{DEPOT_ID}/chunk/{sha}"),
        wrong_body,
    );

    let run = setup(1, manifest_bytes(metadata(), payload), responses);

    let failed = Mutex::new(false);
    let result = run
        .client
        .download(
            DownloadRequest {
                manifest_path: run.manifest_path.clone(),
                key: key(),
            },
            |event| {
                if let Event::Failed(_) = event {
                    *failed.lock().unwrap() = true;
                }
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(depot::client::Error::ChunkHashMismatch { .. })
    ));
    assert!(*failed.lock().unwrap());
    assert!(!run.dir.path().join("depots/57/data.bin").exists());
}

#[tokio::test]
async fn fetches_never_exceed_the_pool_size() {
    let max_servers = 2;
    let hosts = ["one.cdn", "two.cdn"];

    let mut responses = HashMap::new();
    responses.insert(directory_url(max_servers), directory_json(&hosts));

    let mut mappings = Vec::new();
    for index in 0..12u8 {
        let plain = vec![index; 32];
        let (sha, body) = chunk_body(&plain);
        for host in hosts {
            responses.insert(
                format!("http://{host}/depot/{DEPOT_ID}/chunk/{sha}"),
                body.clone(),
            );
        }
        mappings.push(file_mapping(&format!("files/{index}.bin"), &[(&sha, 0, &plain)]));
    }

    let run = setup(
        max_servers,
        manifest_bytes(metadata(), proto::Payload { mappings }),
        responses,
    );

    run.client
        .download(
            DownloadRequest {
                manifest_path: run.manifest_path.clone(),
                key: key(),
            },
            |_| {},
        )
        .await
        .expect("run succeeds");

    assert!(run.counters.peak.load(Ordering::SeqCst) <= max_servers);
    for index in 0..12u8 {
        assert!(run
            .dir
            .path()
            .join(format!("depots/57/files/{index}.bin"))
            .exists());
    }
}

#[tokio::test]
async fn encrypted_filenames_are_decrypted_before_scheduling() {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    let plain = b"hidden";
    let (sha, body) = chunk_body(plain);

    // NUL padded before encryption, as on the wire
    let mut padded = b"secret/hidden.bin".to_vec();
    padded.resize(padded.len() + 4, 0);
    let encrypted_name = BASE64.encode(crypto::symmetric_encrypt(&padded, &key(), &[3; 16]));

    let payload = proto::Payload {
        mappings: vec![file_mapping(&encrypted_name, &[(&sha, 0, plain)])],
    };
    let metadata = proto::Metadata {
        depot_id: Some(DEPOT_ID),
        filenames_encrypted: Some(true),
        ..Default::default()
    };

    let mut responses = HashMap::new();
    responses.insert(directory_url(1), directory_json(&["one.cdn"]));
    responses.insert(
        format!("http://one.cdn/depot/{DEPOT_ID}/chunk/{sha}"),
        body,
    );

    let run = setup(1, manifest_bytes(metadata, payload), responses);

    run.client
        .download(
            DownloadRequest {
                manifest_path: run.manifest_path.clone(),
                key: key(),
            },
            |_| {},
        )
        .await
        .expect("run succeeds");

    let written =
        std::fs::read(run.dir.path().join("depots/57/secret/hidden.bin")).expect("file exists");
    assert_eq!(written, plain);
}
