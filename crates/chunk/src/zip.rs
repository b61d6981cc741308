// SPDX-FileCopyrightText: Copyright © 2025-2026 Depot Tools Developers
//
// SPDX-License-Identifier: MPL-2.0

//! ZIP chunk containers. The archive holds exactly one logical payload
//! in this protocol's usage, so only the first entry is extracted; the
//! archive's own per-entry CRC covers integrity.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{Error, Format};

pub fn decompress(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    if archive.len() == 0 {
        return Err(Error::BadFraming(Format::Zip));
    }

    let mut entry = archive.by_index(0)?;
    let mut plain = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut plain)?;
    Ok(plain)
}

/// Archive `plain` as the sole entry of a ZIP container
pub fn compress(plain: &[u8]) -> Result<Vec<u8>, Error> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file("chunk", options)?;
    writer.write_all(plain)?;

    Ok(writer.finish()?.into_inner())
}
