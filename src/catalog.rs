//! Catalog addressing
//!
//! Every collection lives under a URL prefix derived from a configured template;
//! item pages are addressed by appending the sequence number to that prefix.

use url::Url;

/// Placeholder substituted with the lower-cased collection name
pub const COLLECTION_PLACEHOLDER: &str = "{collection}";

/// Sequence number of the page used to probe the collection size
pub const PROBE_NUMBER: u64 = 1;

/// URL prefix of one collection's item pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogUrl {
    collection: String,
    prefix: String,
}

impl CatalogUrl {
    /// Builds the catalog prefix for a collection from a URL template
    ///
    /// # Example
    ///
    /// ```
    /// use gift_harvest::catalog::CatalogUrl;
    ///
    /// let catalog = CatalogUrl::new("https://t.me/nft/{collection}-", "PlushPepe").unwrap();
    /// assert_eq!(catalog.item_url(12), "https://t.me/nft/plushpepe-12");
    /// ```
    pub fn new(template: &str, collection: &str) -> Result<Self, url::ParseError> {
        let collection = collection.to_lowercase();
        let prefix = template.replace(COLLECTION_PLACEHOLDER, &collection);
        Url::parse(&format!("{prefix}{PROBE_NUMBER}"))?;
        Ok(Self { collection, prefix })
    }

    /// Lower-cased collection name, also used as the table name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// URL of the item page with the given sequence number
    pub fn item_url(&self, number: u64) -> String {
        format!("{}{}", self.prefix, number)
    }

    /// URL of the page carrying the collection summary table
    pub fn probe_url(&self) -> String {
        self.item_url(PROBE_NUMBER)
    }
}
