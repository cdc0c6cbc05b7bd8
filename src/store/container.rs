//! Container file format
//!
//! Persists every array of a [`MemoryStore`](super::MemoryStore) into a single
//! file. The file is rewritten as a whole on flush.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Header (16 bytes)                                           │
//! │   Magic: "AVLT" (4) | Version: u16 (2) | ByteOrder: u8 (1)  │
//! │   Reserved: u8 (1) | ArrayCount: u64 (8)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Body (variable)                                             │
//! │   bincode: name → { type, shape, bytes, heap }              │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Footer (8 bytes)                                            │
//! │   BodyCRC: u32 (4) | Padding (4)                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//! Array bytes are in host byte order; a container written on a host of the
//! other byte order is rejected rather than reinterpreted. Every array is
//! checked for internal consistency on load, so a file with a valid
//! checksum but an impossible type or heap reference is still corruption.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{MarshalError, Result};

use super::StoredArray;

/// Magic bytes identifying an arrayvault container
pub const MAGIC: &[u8; 4] = b"AVLT";

/// Current container format version
pub const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + ByteOrder (1) + Reserved (1) + Count (8)
pub const HEADER_SIZE: usize = 16;

/// Footer size: BodyCRC (4) + Padding (4)
pub const FOOTER_SIZE: usize = 8;

const LITTLE_ENDIAN: u8 = 1;
const BIG_ENDIAN: u8 = 2;

fn host_byte_order() -> u8 {
    if cfg!(target_endian = "little") {
        LITTLE_ENDIAN
    } else {
        BIG_ENDIAN
    }
}

/// Write all arrays to `path`
///
/// The file is staged next to `path` and renamed into place, so a crash
/// mid-write leaves the previous container intact.
pub fn write_container(
    path: &Path,
    arrays: &BTreeMap<String, StoredArray>,
    sync: bool,
) -> Result<()> {
    let body = bincode::serialize(arrays)?;
    let crc = crc32fast::hash(&body);

    let staging = staging_path(path);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&staging)?;
    let mut writer = BufWriter::new(file);

    // Header
    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&[host_byte_order(), 0])?;
    writer.write_all(&(arrays.len() as u64).to_le_bytes())?;

    // Body + footer
    writer.write_all(&body)?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(&[0u8; 4])?;

    writer.flush()?;
    let file: File = writer
        .into_inner()
        .map_err(|e| MarshalError::Io(e.into_error()))?;
    if sync {
        file.sync_all()?;
    }
    drop(file);

    fs::rename(&staging, path)?;
    Ok(())
}

/// Read all arrays from `path`
pub fn read_container(path: &Path, verify_checksum: bool) -> Result<BTreeMap<String, StoredArray>> {
    let data = fs::read(path)?;

    if data.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(MarshalError::Corruption(format!(
            "container is {} bytes, smaller than header and footer",
            data.len()
        )));
    }

    if &data[0..4] != MAGIC {
        return Err(MarshalError::Corruption(format!(
            "invalid magic: expected AVLT, got {:?}",
            &data[0..4]
        )));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != VERSION {
        return Err(MarshalError::Corruption(format!(
            "unsupported container version: {}",
            version
        )));
    }

    if data[6] != host_byte_order() {
        return Err(MarshalError::Corruption(format!(
            "container byte order {} does not match host byte order {}",
            data[6],
            host_byte_order()
        )));
    }

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&data[8..16]);
    let count = u64::from_le_bytes(count_bytes);

    let body_end = data.len() - FOOTER_SIZE;
    let body = &data[HEADER_SIZE..body_end];

    if verify_checksum {
        let stored_crc = u32::from_le_bytes([
            data[body_end],
            data[body_end + 1],
            data[body_end + 2],
            data[body_end + 3],
        ]);
        let actual_crc = crc32fast::hash(body);
        if stored_crc != actual_crc {
            return Err(MarshalError::Corruption(format!(
                "checksum mismatch: stored {:08x}, computed {:08x}",
                stored_crc, actual_crc
            )));
        }
    }

    let arrays: BTreeMap<String, StoredArray> = bincode::deserialize(body)?;
    if arrays.len() as u64 != count {
        return Err(MarshalError::Corruption(format!(
            "header declares {} arrays, body holds {}",
            count,
            arrays.len()
        )));
    }

    for (name, array) in &arrays {
        array.validate().map_err(|e| match e {
            MarshalError::Corruption(msg) => {
                MarshalError::Corruption(format!("array '{}': {}", name, msg))
            }
            other => other,
        })?;
    }

    Ok(arrays)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
