//! Snapshot files.
//!
//! A snapshot file is a fixed header followed by a bincode payload:
//!
//! ```text
//! magic    8 bytes  "SEMSNAP\0"
//! version  u32 LE
//! length   u64 LE   payload length in bytes
//! checksum u32 LE   crc32 of the payload
//! payload  bincode(ServiceSnapshot)
//! ```
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! crash mid-write never leaves a truncated snapshot at `path`.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{info, warn};

use crate::error::{Result, SemsearchError};
use crate::service::ServiceSnapshot;

const MAGIC: &[u8; 8] = b"SEMSNAP\0";
const FORMAT_VERSION: u32 = 1;

/// Write `snapshot` to `path`, creating parent directories as needed.
pub fn save_snapshot<P: AsRef<Path>>(path: P, snapshot: &ServiceSnapshot) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let payload = bincode::serialize(snapshot)?;
    let temp_path = temp_path_for(path);
    let written = write_file(&temp_path, &payload).and_then(|()| Ok(fs::rename(&temp_path, path)?));
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            warn!("could not remove {}: {cleanup}", temp_path.display());
        }
        return Err(e);
    }

    info!(
        "saved snapshot with {} documents to {} ({} bytes)",
        snapshot.len(),
        path.display(),
        payload.len()
    );
    Ok(())
}

/// Read and verify a snapshot written by [`save_snapshot`].
///
/// A bad magic, unknown version, length mismatch, checksum mismatch or
/// undecodable payload is reported as `Serialization`.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<ServiceSnapshot> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let snapshot = read_snapshot(&mut reader)?;
    info!(
        "loaded snapshot with {} documents from {}",
        snapshot.len(),
        path.display()
    );
    Ok(snapshot)
}

/// Sibling path the snapshot is staged at, e.g. `index.bin.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_file(path: &Path, payload: &[u8]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_snapshot(&mut writer, payload)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn write_snapshot<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    writer.write_u64::<LittleEndian>(payload.len() as u64)?;
    writer.write_u32::<LittleEndian>(crc32fast::hash(payload))?;
    writer.write_all(payload)?;
    Ok(())
}

fn read_snapshot<R: Read>(reader: &mut R) -> Result<ServiceSnapshot> {
    let truncated = |_| SemsearchError::serialization("snapshot header is truncated");

    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic).map_err(truncated)?;
    if &magic != MAGIC {
        return Err(SemsearchError::serialization("not a snapshot file"));
    }

    let version = reader.read_u32::<LittleEndian>().map_err(truncated)?;
    if version != FORMAT_VERSION {
        return Err(SemsearchError::serialization(format!(
            "unsupported snapshot version {version}"
        )));
    }
    let length = reader.read_u64::<LittleEndian>().map_err(truncated)?;
    let expected_checksum = reader.read_u32::<LittleEndian>().map_err(truncated)?;

    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;
    if payload.len() as u64 != length {
        return Err(SemsearchError::serialization(format!(
            "snapshot payload is {} bytes, header says {length}",
            payload.len()
        )));
    }
    let checksum = crc32fast::hash(&payload);
    if checksum != expected_checksum {
        return Err(SemsearchError::serialization(format!(
            "checksum mismatch: stored {expected_checksum:#010x}, computed {checksum:#010x}"
        )));
    }

    let snapshot: ServiceSnapshot = bincode::deserialize(&payload)?;
    snapshot.validate()?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Vector;
    use crate::vector::index::VectorIndexConfig;
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample() -> ServiceSnapshot {
        ServiceSnapshot {
            created_at: Utc::now(),
            embedder: "lookup".to_string(),
            index: VectorIndexConfig::flat(2),
            vectors: vec![Vector::new(vec![1.0, 0.0]), Vector::new(vec![0.0, 1.0])],
            documents: vec!["east".to_string(), "north".to_string()],
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("index.bin");

        let snapshot = sample();
        save_snapshot(&path, &snapshot).unwrap();
        assert!(!temp_path_for(&path).exists());

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_target_with_tmp_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.tmp");

        save_snapshot(&path, &sample()).unwrap();
        assert_eq!(temp_path_for(&path), temp_dir.path().join("index.tmp.tmp"));
        assert!(!temp_path_for(&path).exists());
        assert_eq!(load_snapshot(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_failed_rename_removes_staged_file() {
        let temp_dir = TempDir::new().unwrap();
        // A non-empty directory at the target makes the final rename fail.
        let path = temp_dir.path().join("index.bin");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupant"), b"x").unwrap();

        assert!(save_snapshot(&path, &sample()).is_err());
        assert!(!temp_path_for(&path).exists());
        assert!(path.is_dir());
    }

    #[test]
    fn test_flipped_payload_byte_fails_checksum() {
        let mut bytes = Vec::new();
        let payload = bincode::serialize(&sample()).unwrap();
        write_snapshot(&mut bytes, &payload).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        match read_snapshot(&mut bytes.as_slice()) {
            Err(SemsearchError::Serialization(msg)) => assert!(msg.contains("checksum")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(
            read_snapshot(&mut &b"NOTASNAPSHOT"[..]),
            Err(SemsearchError::Serialization(_))
        ));
        assert!(matches!(
            read_snapshot(&mut &b"SEM"[..]),
            Err(SemsearchError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            load_snapshot(temp_dir.path().join("absent.bin")),
            Err(SemsearchError::Io(_))
        ));
    }
}
