use serde::{Deserialize, Serialize};

pub const UNKNOWN_TRAIT: &str = "Unknown";

const NEIGHBORHOOD_KEYS: &[&str] = &["neighborhood"];
const ZONING_KEYS: &[&str] = &["zoning type", "zoning", "zone"];
const SIZE_KEYS: &[&str] = &["plot size", "size"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitAttribute {
    pub trait_type: String,
    pub value: String,
}

/// Trait record of one plot, validated once at ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitMetadata {
    pub token_id: Option<String>,
    pub tag: Option<String>,
    pub name: String,
    pub neighborhood: String,
    pub zoning_type: String,
    pub plot_size: Option<String>,
    /// Attributes in dataset order
    pub attributes: Vec<TraitAttribute>,
    pub image: String,
    pub animation_url: String,
    /// True when no dataset entry existed and this record was synthesized
    #[serde(default)]
    pub placeholder: bool,
}

impl TraitMetadata {
    /// Build from raw attributes, pulling the well-known traits out by name
    pub fn from_attributes(
        token_id: Option<String>,
        tag: Option<String>,
        name: String,
        attributes: Vec<TraitAttribute>,
        image: Option<String>,
        animation_url: Option<String>,
    ) -> Self {
        let neighborhood = find_trait(&attributes, NEIGHBORHOOD_KEYS)
            .unwrap_or(UNKNOWN_TRAIT)
            .to_string();
        let zoning_type = find_trait(&attributes, ZONING_KEYS)
            .unwrap_or(UNKNOWN_TRAIT)
            .to_string();
        let plot_size = find_trait(&attributes, SIZE_KEYS).map(str::to_string);

        Self {
            token_id,
            tag,
            name,
            neighborhood,
            zoning_type,
            plot_size,
            attributes,
            image: image.map(|i| normalize_media_uri(&i)).unwrap_or_default(),
            animation_url: animation_url
                .map(|a| normalize_media_uri(&a))
                .unwrap_or_default(),
            placeholder: false,
        }
    }

    /// Stand-in used when the dataset has no entry for a token
    pub fn placeholder(token_id: &str) -> Self {
        Self {
            token_id: Some(token_id.to_string()),
            tag: None,
            name: format!("Plot #{}", token_id),
            neighborhood: UNKNOWN_TRAIT.to_string(),
            zoning_type: UNKNOWN_TRAIT.to_string(),
            plot_size: None,
            attributes: Vec::new(),
            image: String::new(),
            animation_url: String::new(),
            placeholder: true,
        }
    }

    pub fn trait_value(&self, trait_type: &str) -> Option<&str> {
        find_trait(&self.attributes, &[trait_type])
    }
}

fn find_trait<'a>(attributes: &'a [TraitAttribute], keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        attributes
            .iter()
            .find(|a| a.trait_type.trim().eq_ignore_ascii_case(key))
            .map(|a| a.value.as_str())
    })
}

/// Rewrite `ar://` and `ipfs://` references to public gateways
pub fn normalize_media_uri(uri: &str) -> String {
    if let Some(rest) = uri.strip_prefix("ar://") {
        format!("https://arweave.net/{}", rest)
    } else if let Some(rest) = uri.strip_prefix("ipfs://") {
        format!("https://ipfs.io/ipfs/{}", rest)
    } else {
        uri.to_string()
    }
}
