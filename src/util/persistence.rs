use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Error as SerdeError;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "FlipLeadDesk";
const APP_NAME: &str = "FlipLeadDesk";

/// Default location of the record snapshot in the platform data directory.
pub fn default_data_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.data_dir().join("records.json"))
}

/// Reads a JSON snapshot. A missing file is `Ok(None)`; a corrupt one is an error.
pub fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_str(&data)?))
}

/// Writes a JSON snapshot through a temporary file so readers never see a
/// half-written document.
pub fn save_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_snapshot_is_none() {
        let path = std::env::temp_dir().join(format!("absent-{}.json", uuid::Uuid::new_v4()));
        let loaded: Option<Vec<u32>> = load_snapshot(&path).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn snapshot_survives_save_and_load() {
        let dir = std::env::temp_dir().join(format!("flip-desk-{}", uuid::Uuid::new_v4()));
        let path = dir.join("state.json");

        save_snapshot(&path, &vec![1_u32, 2, 3]).unwrap();
        let loaded: Option<Vec<u32>> = load_snapshot(&path).unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));
        assert!(!path.with_extension("json.tmp").exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let path = std::env::temp_dir().join(format!("corrupt-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, "{not json").unwrap();
        let loaded: Result<Option<Vec<u32>>, _> = load_snapshot(&path);
        assert!(matches!(loaded, Err(PersistError::Serde(_))));
        let _ = fs::remove_file(path);
    }
}
