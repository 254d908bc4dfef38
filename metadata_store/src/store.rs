use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sale_core::{MetadataLookup, TraitMetadata};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::index::MetadataIndex;
use crate::{MetadataError, Result};

/// Lazily loaded plot dataset. `initialize` may be called any number of times, from any
/// number of tasks; the file is read once and the index is shared read-only afterwards.
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    index: OnceCell<MetadataIndex>,
}

impl MetadataStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            index: OnceCell::new(),
        }
    }

    /// A store that is already initialized with `index`
    pub fn from_index(index: MetadataIndex) -> Self {
        Self {
            path: PathBuf::new(),
            index: OnceCell::new_with(Some(index)),
        }
    }

    pub async fn initialize(&self) -> Result<&MetadataIndex> {
        self.index
            .get_or_try_init(|| async {
                info!("Loading plot metadata from {}", self.path.display());
                let json = tokio::fs::read_to_string(&self.path)
                    .await
                    .map_err(|source| MetadataError::Io {
                        path: self.path.display().to_string(),
                        source,
                    })?;
                let index = MetadataIndex::from_json_str(&json)?;
                if index.is_empty() {
                    return Err(MetadataError::InvalidDataset(format!(
                        "{} contains no usable entries",
                        self.path.display()
                    )));
                }
                Ok(index)
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.index.initialized()
    }

    pub async fn get(&self, token_id: &str) -> Result<Option<TraitMetadata>> {
        let index = self.initialize().await?;
        let found = index.get(token_id).cloned();
        if found.is_none() {
            debug!("No metadata found for token {}", token_id);
        }
        Ok(found)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<TraitMetadata>> {
        let index = self.initialize().await?;
        Ok(index.by_name(name).cloned())
    }
}

#[async_trait]
impl MetadataLookup for MetadataStore {
    async fn get_metadata_for_token(
        &self,
        token_id: &str,
    ) -> sale_core::Result<Option<TraitMetadata>> {
        Ok(self.get(token_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn dataset_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data/metadata.json")
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent_across_tasks() {
        let store = Arc::new(MetadataStore::new(dataset_path()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.initialize().await.map(|i| i.token_count()) })
            })
            .collect();

        let mut counts = Vec::new();
        for handle in handles {
            counts.push(handle.await.unwrap().unwrap());
        }
        assert!(counts.iter().all(|c| *c == counts[0] && *c > 0));
        assert!(store.is_initialized());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error_and_can_retry() {
        let store = MetadataStore::new("/nonexistent/metadata.json");
        assert!(matches!(store.initialize().await, Err(MetadataError::Io { .. })));
        assert!(!store.is_initialized());
        assert!(store.get("1").await.is_err());
    }

    #[tokio::test]
    async fn test_lookup_trait_impl() {
        let store = MetadataStore::new(dataset_path());
        let lookup: &dyn MetadataLookup = &store;
        let meta = lookup.get_metadata_for_token("1").await.unwrap().unwrap();
        assert_eq!(meta.name, "Nexus 0001");
        assert!(lookup.get_metadata_for_token("999999").await.unwrap().is_none());
    }
}
