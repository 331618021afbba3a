//! Flat-file export of crawled items
//!
//! Every collection is mirrored into a CSV file whose columns match the
//! collection table. A full crawl truncates the file and rewrites the header;
//! each batch afterwards appends its rows.

use crate::crawler::BatchSink;
use crate::record::ItemRecord;
use crate::Result;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Column header of the export file
pub const EXPORT_COLUMNS: [&str; 11] = [
    "name", "number", "m", "bd", "s", "mchance", "bdchance", "schance", "hex1", "hex2",
    "s_in_dir",
];

/// CSV export of one collection
#[derive(Debug, Clone)]
pub struct CsvExport {
    path: PathBuf,
}

impl CsvExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncates the file and writes the header row
    pub fn reset(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(EXPORT_COLUMNS)?;
        writer.flush()?;

        tracing::debug!("Reset export file {}", self.path.display());
        Ok(())
    }

    /// Appends records to the end of the file
    pub fn append(&self, records: &[ItemRecord]) -> Result<usize> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        Ok(records.len())
    }
}

impl BatchSink for CsvExport {
    fn name(&self) -> &str {
        "export"
    }

    fn write_batch(&self, records: &[ItemRecord]) -> Result<usize> {
        self.append(records)
    }
}
