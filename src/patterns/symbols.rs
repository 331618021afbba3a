//! Symbol to pattern image map
//!
//! The map is kept as a JSON object in a side file next to the buckets. Values
//! are image paths relative to the patterns directory, e.g. `"3f/3fQx7a.png"`.

use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Durable mapping from symbol name to its stored pattern image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolMap {
    entries: BTreeMap<String, String>,
}

impl SymbolMap {
    /// Reads the map, starting empty if the file does not exist yet
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("{} not found, starting with an empty map", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let entries: BTreeMap<String, String> = serde_json::from_str(&content)?;
        tracing::info!("Read {} symbols from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    /// Rewrites the whole file as indented JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.entries.serialize(&mut serializer)?;

        fs::write(path, buf)?;
        tracing::info!("Saved {} symbols to {}", self.entries.len(), path.display());
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.entries.get(symbol).map(String::as_str)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn insert(&mut self, symbol: impl Into<String>, path: impl Into<String>) {
        self.entries.insert(symbol.into(), path.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bucket label of a mapped symbol: the image file name without extension
    ///
    /// # Example
    ///
    /// ```
    /// use gift_harvest::patterns::SymbolMap;
    ///
    /// let mut map = SymbolMap::default();
    /// map.insert("Star", "3f/3fQx7a.png");
    /// assert_eq!(map.label_for("Star").as_deref(), Some("3fQx7a"));
    /// ```
    pub fn label_for(&self, symbol: &str) -> Option<String> {
        let path = Path::new(self.get(symbol)?);
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
    }
}
