// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{Arg, ArgAction, Command};
use thiserror::Error;

mod download;
mod inspect;
mod version;

/// Generate the CLI command structure
fn command() -> Command {
    Command::new("depot")
        .about("Depot content delivery client")
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::SetTrue),
        )
        .arg_required_else_help(true)
        .subcommand(download::command())
        .subcommand(inspect::command())
        .subcommand(version::command())
}

/// Process all CLI arguments
pub async fn process() -> Result<(), Error> {
    let matches = command().get_matches();
    if matches.get_flag("version") {
        version::print();
        return Ok(());
    }
    match matches.subcommand() {
        Some(("download", args)) => download::handle(args).await.map_err(Error::Download),
        Some(("inspect", args)) => inspect::handle(args).map_err(Error::Inspect),
        Some(("version", _)) => {
            version::print();
            Ok(())
        }
        _ => unreachable!(),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("download")]
    Download(#[source] download::Error),

    #[error("inspect")]
    Inspect(#[source] inspect::Error),
}
