use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Read a gzip-compressed CBOR value.
/// A missing file is a miss (`Ok(None)`), not an error.
pub fn read_compressed<T>(path: &Path) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    let reader = GzDecoder::new(BufReader::new(file));
    let value = serde_cbor::from_reader(reader)?;
    Ok(Some(value))
}

/// Read a store entry, treating every failure as a miss.
///
/// A truncated or corrupt entry is logged and reported as absent so the caller
/// rebuilds it and overwrites the broken file.
pub fn read_cached<T>(path: &Path) -> Option<T>
where
    T: DeserializeOwned,
{
    match read_compressed(path) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring unreadable store entry {}: {}", path.display(), e);
            None
        }
    }
}

/// Write a value as gzip-compressed CBOR.
/// The value lands in a temporary sibling first and is renamed into place,
/// so readers never observe a partial file.
pub fn write_compressed<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    let tmp = path.with_extension(format!("tmp-{}", std::process::id()));
    {
        let file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
        // 速度優先で圧縮レベルは低め
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::fast());
        serde_cbor::to_writer(&mut encoder, value)?;
        let mut writer = encoder.finish().map_err(|e| Error::io(&tmp, e))?;
        writer.flush().map_err(|e| Error::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let value: Option<Vec<u32>> = read_compressed(&dir.path().join("nothing.cbor.gz")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn written_value_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("value.cbor.gz");
        write_compressed(&path, &vec![("a".to_string(), 1.5_f64)]).unwrap();
        let value: Option<Vec<(String, f64)>> = read_compressed(&path).unwrap();
        assert_eq!(value, Some(vec![("a".to_string(), 1.5)]));
    }

    #[test]
    fn corrupt_entry_is_a_miss_and_can_be_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.cbor.gz");
        fs::write(&path, b"not gzip at all").unwrap();
        assert!(read_compressed::<Vec<u32>>(&path).is_err());
        assert_eq!(read_cached::<Vec<u32>>(&path), None);

        write_compressed(&path, &vec![7_u32]).unwrap();
        assert_eq!(read_cached::<Vec<u32>>(&path), Some(vec![7]));
    }

    #[test]
    fn empty_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.cbor.gz");
        fs::write(&path, b"").unwrap();
        assert_eq!(read_cached::<Vec<u32>>(&path), None);
    }
}
