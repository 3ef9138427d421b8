use opendal::Operator;
use redolog_core::reader::RedoError;

use crate::object_store::BackendConfig;

/// Thin wrapper over an OpenDAL operator: list, read, write.
///
/// The reader only mirrors whole files, so nothing fancier than full-object
/// reads is needed. `write` exists for the writer side and for seeding
/// stores in tests.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    /// Optional extra prefix for key joining (used by the memory backend)
    root_prefix: String,
    op: Operator,
}

impl ObjectStore {
    pub fn new(cfg: BackendConfig) -> Result<ObjectStore, RedoError> {
        let (op, root_prefix) = cfg.build_operator()?;
        Ok(ObjectStore { root_prefix, op })
    }

    /// List the paths of all objects under `prefix`, recursively.
    pub async fn walk(&self, prefix: &str) -> Result<Vec<String>, RedoError> {
        let key = self.join(prefix);
        let entries = self
            .op
            .list_with(&key)
            .recursive(true)
            .await
            .map_err(|e| RedoError::ObjectStore(format!("list {}: {}", key, e)))?;
        Ok(entries
            .into_iter()
            .filter(|e| e.metadata().mode().is_file())
            .map(|e| self.unjoin(e.path()))
            .collect())
    }

    /// Read a whole object.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>, RedoError> {
        let key = self.join(path);
        let data = self
            .op
            .read(&key)
            .await
            .map_err(|e| RedoError::ObjectStore(format!("read {}: {}", key, e)))?;
        Ok(data.to_vec())
    }

    /// Write a whole object, replacing any existing one.
    pub async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), RedoError> {
        let key = self.join(path);
        self.op
            .write(&key, bytes.to_vec())
            .await
            .map_err(|e| RedoError::ObjectStore(format!("write {}: {}", key, e)))?;
        Ok(())
    }

    fn join(&self, path: &str) -> String {
        let p = path.trim_matches('/');
        if self.root_prefix.is_empty() {
            if p.is_empty() {
                // the operator's root; only used when listing
                "/".to_string()
            } else {
                p.to_string()
            }
        } else if p.is_empty() {
            format!("{}/", self.root_prefix.trim_matches('/'))
        } else {
            format!("{}/{}", self.root_prefix.trim_matches('/'), p)
        }
    }

    fn unjoin<'a>(&self, key: &'a str) -> String {
        if self.root_prefix.is_empty() {
            return key.to_string();
        }
        let prefix = format!("{}/", self.root_prefix.trim_matches('/'));
        key.strip_prefix(&prefix).unwrap_or(key).to_string()
    }
}
