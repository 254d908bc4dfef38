use std::collections::HashMap;
use std::sync::Arc;

use sale_core::TraitMetadata;
use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::Result;

/// Read-only lookup over the plot dataset, keyed by token id, tag and plot name
#[derive(Debug, Default)]
pub struct MetadataIndex {
    by_token_id: HashMap<String, Arc<TraitMetadata>>,
    by_tag: HashMap<String, Arc<TraitMetadata>>,
    /// Tags in dataset order, scanned for the substring fallback
    tags: Vec<String>,
    by_name: HashMap<String, Arc<TraitMetadata>>,
    skipped: usize,
}

impl MetadataIndex {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(json)?;
        Ok(Self::from_dataset(dataset))
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        let mut index = Self::default();

        for entry in dataset.nfts {
            let label = entry.tag().or_else(|| entry.token_id()).unwrap_or_default();
            match entry.into_metadata() {
                Some(metadata) => index.insert(metadata),
                None => {
                    warn!("Missing metadata or attributes for tag {}", label);
                    index.skipped += 1;
                }
            }
        }

        info!(
            "Metadata initialized with {} tokenID entries and {} tag entries ({} skipped)",
            index.by_token_id.len(),
            index.by_tag.len(),
            index.skipped
        );
        index
    }

    /// Later entries with the same key replace earlier ones
    pub fn insert(&mut self, metadata: TraitMetadata) {
        let metadata = Arc::new(metadata);
        if let Some(token_id) = &metadata.token_id {
            self.by_token_id.insert(token_id.clone(), metadata.clone());
        }
        if let Some(tag) = &metadata.tag {
            if self.by_tag.insert(tag.clone(), metadata.clone()).is_none() {
                self.tags.push(tag.clone());
            }
        }
        if !metadata.name.is_empty() {
            self.by_name.insert(metadata.name.clone(), metadata.clone());
        }
    }

    /// Exact token id, then the first tag (in dataset order) that contains or is contained
    /// in the token id
    pub fn get(&self, token_id: &str) -> Option<&TraitMetadata> {
        let token_id = token_id.trim();
        if token_id.is_empty() {
            return None;
        }
        if let Some(metadata) = self.by_token_id.get(token_id) {
            return Some(metadata.as_ref());
        }
        self.matching_tag(token_id)
            .and_then(|tag| self.by_tag.get(tag))
            .map(|m| m.as_ref())
    }

    fn matching_tag(&self, token_id: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| token_id.contains(tag.as_str()) || tag.contains(token_id))
            .map(String::as_str)
    }

    /// Exact plot name
    pub fn by_name(&self, name: &str) -> Option<&TraitMetadata> {
        self.by_name.get(name.trim()).map(|m| m.as_ref())
    }

    pub fn by_tag(&self, tag: &str) -> Option<&TraitMetadata> {
        self.by_tag.get(tag.trim()).map(|m| m.as_ref())
    }

    pub fn token_count(&self) -> usize {
        self.by_token_id.len()
    }

    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token_id.is_empty() && self.by_tag.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "nfts": [
            {
                "tag": "NX-0112",
                "tokenID": "5521",
                "metadata": {
                    "name": "Nexus 112",
                    "attributes": [
                        { "trait_type": "Neighborhood", "value": "Nexus" },
                        { "trait_type": "Zoning Type", "value": "Mixed Use" },
                        { "trait_type": "Plot Size", "value": "Large" }
                    ],
                    "image": "ar://img-112",
                    "animation_url": "ar://anim-112"
                }
            },
            {
                "tag": 8830,
                "metadata": {
                    "name": "Cyberpunk 8830",
                    "attributes": [{ "trait_type": "Neighborhood", "value": "Cyberpunk" }]
                }
            },
            { "tag": "BROKEN", "tokenID": "7", "metadata": { "name": "no attributes" } }
        ]
    }"#;

    #[test]
    fn test_exact_token_id() {
        let index = MetadataIndex::from_json_str(DATASET).unwrap();
        let meta = index.get("5521").unwrap();
        assert_eq!(meta.name, "Nexus 112");
        assert_eq!(meta.zoning_type, "Mixed Use");
        assert_eq!(meta.image, "https://arweave.net/img-112");
        assert_eq!(index.token_count(), 1);
        assert_eq!(index.tag_count(), 2);
    }

    #[test]
    fn test_substring_tag_fallback() {
        let index = MetadataIndex::from_json_str(DATASET).unwrap();
        // numeric tags are stored as strings
        assert_eq!(index.get("8830").unwrap().neighborhood, "Cyberpunk");
        assert_eq!(index.get("18830").unwrap().name, "Cyberpunk 8830");
        assert_eq!(index.get("883").unwrap().name, "Cyberpunk 8830");
        assert_eq!(index.get("8830").unwrap().zoning_type, "Unknown");
        assert!(index.get("4242").is_none());
        assert!(index.get("").is_none());
    }

    #[test]
    fn test_entries_without_attributes_are_skipped() {
        let index = MetadataIndex::from_json_str(DATASET).unwrap();
        assert!(index.get("7").is_none());
        assert!(index.by_tag("BROKEN").is_none());
    }

    #[test]
    fn test_lookup_by_name() {
        let index = MetadataIndex::from_json_str(DATASET).unwrap();
        assert_eq!(index.by_name("Nexus 112").unwrap().tag.as_deref(), Some("NX-0112"));
        assert!(index.by_name("nexus 112").is_none());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(MetadataIndex::from_json_str("{ nope").is_err());
    }
}
