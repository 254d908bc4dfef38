//! On-disk shape of `metadata.json`: `{ "nfts": [{ "tag", "tokenID", "metadata": {...} }] }`.

use sale_core::{TraitAttribute, TraitMetadata};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub nfts: Vec<DatasetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEntry {
    #[serde(default)]
    pub tag: Value,
    #[serde(default, rename = "tokenID")]
    pub token_id: Value,
    pub metadata: Option<DatasetMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetMetadata {
    #[serde(default)]
    pub name: String,
    pub attributes: Option<Vec<DatasetAttribute>>,
    pub image: Option<String>,
    pub animation_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetAttribute {
    pub trait_type: String,
    #[serde(default)]
    pub value: Value,
}

/// Identifiers appear as strings or bare numbers in the dataset
pub(crate) fn key_string(value: &Value) -> Option<String> {
    let key = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!key.is_empty()).then_some(key)
}

fn value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl DatasetEntry {
    pub fn tag(&self) -> Option<String> {
        key_string(&self.tag)
    }

    pub fn token_id(&self) -> Option<String> {
        key_string(&self.token_id)
    }

    /// `None` when the entry carries no attribute list
    pub fn into_metadata(self) -> Option<TraitMetadata> {
        let tag = self.tag();
        let token_id = self.token_id();
        let metadata = self.metadata?;
        let attributes = metadata
            .attributes?
            .into_iter()
            .map(|a| TraitAttribute {
                trait_type: a.trait_type,
                value: value_string(&a.value),
            })
            .collect();

        Some(TraitMetadata::from_attributes(
            token_id,
            tag,
            metadata.name,
            attributes,
            metadata.image,
            metadata.animation_url,
        ))
    }
}
