//! File helpers shared by the config and the local workspace store.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `data` through a tempfile in the target directory, then rename it
/// into place. Readers see the old file or the new one, never a mix.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Parse a YAML document. `None` when the file does not exist.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    Ok(Some(serde_yaml::from_str(&data)?))
}

pub fn write_yaml<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let data = serde_yaml::to_string(value)?;
    atomic_write(path, data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".roadmap/nested/workspace.yaml");
        atomic_write(&path, b"boards: []").unwrap();
        atomic_write(&path, b"boards: [a]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "boards: [a]");
    }

    #[test]
    fn yaml_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let value: Option<BTreeMap<String, u32>> =
            read_yaml(&dir.path().join("absent.yaml")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn yaml_written_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sizes.yaml");
        let sizes = BTreeMap::from([("small".to_string(), 1u32), ("large".to_string(), 8)]);
        write_yaml(&path, &sizes).unwrap();
        let back: BTreeMap<String, u32> = read_yaml(&path).unwrap().unwrap();
        assert_eq!(back["large"], 8);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "boards: [").unwrap();
        assert!(read_yaml::<BTreeMap<String, Vec<String>>>(&path).is_err());
    }
}
