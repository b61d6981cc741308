// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;
use std::time::Duration;

use clap::{arg, ArgMatches, Command};
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use crypto::Key;
use depot::client::{Client, Config, DownloadRequest, Event};

pub fn command() -> Command {
    Command::new("download")
        .about("Download a depot")
        .long_about("Reconstruct every file described by a depot manifest from the CDN")
        .arg(
            arg!(-m --manifest <PATH> "manifest file path")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(arg!(-k --key <HEX> "depot decryption key, hex encoded"))
        .arg(arg!(-o --output [DIR] "output directory").value_parser(clap::value_parser!(PathBuf)))
        .arg(
            arg!(--"max-servers" [NUM] "CDN server pool size")
                .value_parser(clap::value_parser!(usize)),
        )
}

/// Handle execution of `depot download`
pub async fn handle(args: &ArgMatches) -> Result<(), Error> {
    let manifest_path = args.get_one::<PathBuf>("manifest").unwrap().clone();
    let key = Key::from_hex(args.get_one::<String>("key").unwrap())?;

    let mut config = Config::default();
    if let Some(output_dir) = args.get_one::<PathBuf>("output") {
        config.output_dir = output_dir.clone();
    }
    if let Some(max_servers) = args.get_one::<usize>("max-servers") {
        config.max_servers = *max_servers;
    }

    let progress = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap()
            .tick_chars("--=≡■≡=--"),
    );
    progress.enable_steady_tick(Duration::from_millis(150));

    let summary = Client::new(config)
        .download(DownloadRequest { manifest_path, key }, |event| {
            if let Event::Progress(text) = event {
                progress.set_message(text.to_owned());
            }
        })
        .await;
    progress.finish_and_clear();

    println!("{} {}", "Finished".green(), summary?);

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid key")]
    Key(#[from] crypto::Error),

    #[error("download failed")]
    Client(#[from] depot::client::Error),
}
