// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Directory service queried once per run for the CDN server pool
pub const SERVER_DIRECTORY_URL: &str =
    "https://api.steampowered.com/IContentServerDirectoryService/GetServersForSteamPipe/v1";
/// Default server pool size; the pool size also bounds concurrent
/// chunk fetches
pub const DEFAULT_MAX_SERVERS: usize = 8;
