// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fs;
use std::path::PathBuf;

use clap::{arg, ArgMatches, Command};
use crossterm::style::Stylize;
use thiserror::Error;

use crypto::Key;

pub fn command() -> Command {
    Command::new("inspect")
        .about("Examine raw manifest files")
        .long_about("Show detailed information on local depot manifest files")
        .arg(arg!(<PATH> ... "manifests to inspect").value_parser(clap::value_parser!(PathBuf)))
        .arg(arg!(-k --key [HEX] "decryption key for encrypted filenames"))
}

/// Handle execution of `depot inspect`
pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    let paths = args
        .get_many::<PathBuf>("PATH")
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();
    let key = args
        .get_one::<String>("key")
        .map(|hex_key| Key::from_hex(hex_key))
        .transpose()?;

    for path in paths {
        let bytes = fs::read(path)?;
        let mut parsed = manifest::parse(&bytes)?;

        if parsed.filenames_encrypted {
            match &key {
                Some(key) => parsed.decrypt_filenames(key)?,
                None => println!("{}", "filenames encrypted, pass --key to decrypt".yellow()),
            }
        }

        println!(
            "{path:?} = depot {} manifest {} ({} files)",
            parsed.depot_id,
            parsed.manifest_id,
            parsed.files.len()
        );
        for file in &parsed.files {
            println!(
                " - {} [{} bytes, {} chunks, {:?}]",
                file.filename,
                file.size,
                file.chunks.len(),
                file.flags
            );
        }
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid key")]
    Key(#[from] crypto::Error),

    #[error("manifest format")]
    Format(#[from] manifest::Error),

    #[error("filename decryption")]
    Decrypt(#[from] manifest::DecryptError),

    #[error("io")]
    Io(#[from] std::io::Error),
}
