//! Item records extracted from catalog pages

use serde::Serialize;

/// Placeholder stored when a categorical attribute is missing from a page
pub const UNKNOWN: &str = "Unknown";

/// Placeholder stored when a gradient color stop is missing from a page
pub const NO_COLOR: &str = "None";

/// One item's extracted attributes for a given sequence number
///
/// Field names follow the export/table column names so the record can be
/// serialized straight into a CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRecord {
    /// Lower-cased collection name
    pub name: String,
    /// Sequence number within the collection
    pub number: u64,
    /// Model name
    #[serde(rename = "m")]
    pub model: String,
    /// Backdrop name
    #[serde(rename = "bd")]
    pub backdrop: String,
    /// Symbol name
    #[serde(rename = "s")]
    pub symbol: String,
    /// Model rarity, percent scaled by 100
    #[serde(rename = "mchance")]
    pub model_rarity: u32,
    /// Backdrop rarity, percent scaled by 100
    #[serde(rename = "bdchance")]
    pub backdrop_rarity: u32,
    /// Symbol rarity, percent scaled by 100
    #[serde(rename = "schance")]
    pub symbol_rarity: u32,
    /// First gradient stop (`#rrggbb` or "None")
    pub hex1: String,
    /// Second gradient stop (`#rrggbb` or "None")
    pub hex2: String,
    /// Bucket label assigned by the pattern distributor
    #[serde(rename = "s_in_dir")]
    pub bucket_label: Option<String>,
}

impl ItemRecord {
    /// Creates a record with every attribute at its default
    pub fn unknown(name: &str, number: u64) -> Self {
        Self {
            name: name.to_string(),
            number,
            model: UNKNOWN.to_string(),
            backdrop: UNKNOWN.to_string(),
            symbol: UNKNOWN.to_string(),
            model_rarity: 0,
            backdrop_rarity: 0,
            symbol_rarity: 0,
            hex1: NO_COLOR.to_string(),
            hex2: NO_COLOR.to_string(),
            bucket_label: None,
        }
    }
}

/// The three categorical attributes shown on an item page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Model,
    Backdrop,
    Symbol,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Model, Category::Backdrop, Category::Symbol];

    /// Row header text identifying this category on the page
    pub fn header(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Backdrop => "backdrop",
            Self::Symbol => "symbol",
        }
    }
}

/// Result of fetching one item page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was served and parsed
    Parsed(ItemRecord),
    /// The site answered with a non-success status; the item is not published
    Unavailable { status: u16 },
}

impl PageOutcome {
    pub fn into_record(self) -> Option<ItemRecord> {
        match self {
            Self::Parsed(record) => Some(record),
            Self::Unavailable { .. } => None,
        }
    }
}
