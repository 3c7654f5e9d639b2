use super::store::{SeriesBackend, StorageError};
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;

/// File-per-key JSON blobs under a data directory. Writes go through a temp
/// file and rename so a crashed writer never leaves a truncated series.
pub struct LocalStorage {
    data_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: &str) -> Result<Self, StorageError> {
        let data_dir = PathBuf::from(base_dir);
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl SeriesBackend for LocalStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn save(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &path)?;
        tracing::debug!("💾 Saved {} ({} bytes)", path.display(), payload.len());
        Ok(())
    }
}
