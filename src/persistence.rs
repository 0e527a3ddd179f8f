/**
 * Key-value storage for JSON values, and the location of the application's data
 * directory.
 *
 * The history store only ever talks to the `Storage` trait. On disk every key is one
 * pretty-printed JSON file; tests use the in-memory version.
 */
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::Value;

use super::common::{McqError, Result};


/// Environment variable that overrides the default data directory.
pub const DIR_ENV_VAR: &str = "MCQ_DIR";


pub trait Storage {
    /// Return the value stored under `key`, or `None` if nothing has been stored.
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&mut self, key: &str, value: &Value) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}


#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: HashMap<String, Value>,
}


impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}


impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        self.values.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}


/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}


impl FileStorage {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(McqError::InvalidId(key.to_string()));
        }

        let mut builder = self.dir.clone();
        builder.push(format!("{}.json", key));
        Ok(builder)
    }
}


impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path).map_err(McqError::Io)?;
        let value = serde_json::from_str(&data).map_err(McqError::Json)?;
        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        let path = self.path_for(key)?;
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(McqError::Io)?;
        }

        let serialized = serde_json::to_string_pretty(value).map_err(McqError::Json)?;
        fs::write(&path, serialized).or(Err(McqError::CannotWriteToFile(path.clone())))?;
        debug!("wrote {}", path.to_string_lossy());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(&path).map_err(McqError::Io)?;
        }
        Ok(())
    }
}


/// Return the path to the application directory: `directory` if given, then the
/// `MCQ_DIR` environment variable, then the platform data directory.
pub fn get_app_dir_path(directory: Option<&Path>) -> PathBuf {
    if let Some(directory) = directory {
        return directory.to_path_buf();
    }

    if let Ok(directory) = env::var(DIR_ENV_VAR) {
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }
    }

    if let Some(mut dirpath) = dirs::data_dir() {
        dirpath.push("mcq");
        dirpath
    } else {
        let mut dirpath = dirs::home_dir().unwrap_or_else(PathBuf::new);
        dirpath.push(".mcq");
        dirpath
    }
}


/// Create the application directory and its subdirectories if they do not exist.
pub fn require_app_dir_path(dirpath: &Path) -> Result<()> {
    for path in [get_courses_dir_path(dirpath), get_storage_dir_path(dirpath)].iter() {
        if !path.exists() {
            fs::create_dir_all(path)
                .or(Err(McqError::CannotMakeAppDir(dirpath.to_path_buf())))?;
        }
    }
    Ok(())
}


pub fn get_courses_dir_path(dirpath: &Path) -> PathBuf {
    dirpath.join("courses")
}


pub fn get_storage_dir_path(dirpath: &Path) -> PathBuf {
    dirpath.join("storage")
}


#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn memory_storage_round_trip() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get("history").unwrap(), None);

        storage.set("history", &json!({"a": 1})).unwrap();
        assert_eq!(storage.get("history").unwrap(), Some(json!({"a": 1})));

        storage.remove("history").unwrap();
        assert_eq!(storage.get("history").unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let storage_dir = dir.path().join("storage");

        let mut storage = FileStorage::new(&storage_dir);
        storage.set("mcq_user_history", &json!({"cog_psy/week1": {}})).unwrap();

        let reopened = FileStorage::new(&storage_dir);
        assert_eq!(
            reopened.get("mcq_user_history").unwrap(),
            Some(json!({"cog_psy/week1": {}}))
        );
        assert!(storage_dir.join("mcq_user_history.json").exists());
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path());
        assert!(matches!(storage.get("../escape"), Err(McqError::InvalidId(_))));
        assert!(matches!(storage.set("a/b", &json!(1)), Err(McqError::InvalidId(_))));
        assert!(matches!(storage.get(""), Err(McqError::InvalidId(_))));
    }

    #[test]
    fn explicit_directory_wins() {
        let path = Path::new("/tmp/somewhere");
        assert_eq!(get_app_dir_path(Some(path)), PathBuf::from("/tmp/somewhere"));
    }

    #[test]
    fn app_dir_is_created_with_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("data");
        require_app_dir_path(&app_dir).unwrap();
        assert!(get_courses_dir_path(&app_dir).is_dir());
        assert!(get_storage_dir_path(&app_dir).is_dir());
    }
}
