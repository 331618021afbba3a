//! Pattern distribution
//!
//! Many items share one symbol, and every symbol has a single pattern image.
//! The distributor stores each image once, in the least-loaded bucket, and
//! labels every row carrying that symbol with the image's file stem.

use crate::catalog::CatalogUrl;
use crate::media::MediaSource;
use crate::patterns::buckets::BucketPool;
use crate::patterns::symbols::SymbolMap;
use crate::storage::ItemStore;
use crate::Result;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Counters for one distribution run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionReport {
    /// Already mapped symbols whose rows were relabelled
    pub backfilled: usize,
    /// Symbols whose image was downloaded and placed in a bucket
    pub assigned: usize,
    /// Symbols that could not be processed
    pub failed: usize,
}

/// Stores one pattern image per unmapped symbol and labels the rows
///
/// # Arguments
///
/// * `catalog` - Address of the collection
/// * `store` - The item store holding the crawled collection
/// * `source` - Where pattern images are fetched from
/// * `patterns_dir` - Directory holding the buckets
/// * `map_path` - Location of the symbol map side file
///
/// # Returns
///
/// * `Ok(DistributionReport)` - The run finished and the map was saved
/// * `Err(HarvestError)` - The rows, the buckets or the map could not be read or written
pub async fn distribute_patterns(
    catalog: &CatalogUrl,
    store: &dyn ItemStore,
    source: &dyn MediaSource,
    patterns_dir: &Path,
    map_path: &Path,
) -> Result<DistributionReport> {
    let table = catalog.collection();
    let mut map = SymbolMap::load(map_path)?;
    let rows = store.symbol_rows(table, table)?;

    let mut backfill = BTreeSet::new();
    let mut seen = HashSet::new();
    let mut unmapped = Vec::new();

    for row in &rows {
        if map.contains(&row.symbol) {
            if row.bucket_label.is_none() {
                backfill.insert(row.symbol.clone());
            }
        } else if seen.insert(row.symbol.clone()) {
            // Rows come in id order, so the first one seen is the representative
            unmapped.push((row.symbol.clone(), row.number));
        }
    }

    tracing::info!(
        "{}: {} rows, {} symbols to backfill, {} unmapped symbols",
        table,
        rows.len(),
        backfill.len(),
        unmapped.len()
    );

    let mut report = DistributionReport::default();

    for symbol in &backfill {
        let Some(label) = map.label_for(symbol) else {
            continue;
        };
        match store.set_bucket_label_for_symbol(table, table, symbol, &label) {
            Ok(updated) => {
                tracing::debug!("Backfilled '{}' on {} rows", symbol, updated);
                report.backfilled += 1;
            }
            Err(e) => {
                tracing::error!("Failed to backfill symbol '{}': {}", symbol, e);
                report.failed += 1;
            }
        }
    }

    if !unmapped.is_empty() {
        let mut pool = BucketPool::load(patterns_dir)?;

        for (symbol, number) in unmapped {
            match place_symbol(catalog, store, source, &mut pool, &mut map, &symbol, number).await
            {
                Ok(label) => {
                    tracing::info!("Symbol '{}' stored as {}", symbol, label);
                    report.assigned += 1;
                }
                Err(e) => {
                    tracing::error!(
                        "Error processing symbol '{}' (#{}): {}",
                        symbol,
                        number,
                        e
                    );
                    report.failed += 1;
                }
            }
        }
    }

    map.save(map_path)?;
    Ok(report)
}

/// Downloads one symbol's image into the least-loaded bucket and labels its rows
async fn place_symbol(
    catalog: &CatalogUrl,
    store: &dyn ItemStore,
    source: &dyn MediaSource,
    pool: &mut BucketPool,
    map: &mut SymbolMap,
    symbol: &str,
    number: u64,
) -> Result<String> {
    let table = catalog.collection();

    let bucket = match pool.select() {
        Some(bucket) => bucket,
        None => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no pattern buckets available",
            )
            .into())
        }
    };
    let file_name = pool.new_asset_name(&bucket);

    let image = source
        .fetch_pattern_image(&catalog.item_url(number))
        .await?;
    tokio::fs::write(pool.bucket_dir(&bucket).join(&file_name), image).await?;

    map.insert(symbol, format!("{bucket}/{file_name}"));
    pool.record(&bucket);

    let label = map.label_for(symbol).unwrap_or_default();
    match store.set_bucket_label_for_symbol(table, table, symbol, &label) {
        Ok(updated) => tracing::debug!("Labelled {} rows with {}", updated, label),
        Err(e) => tracing::error!("Failed to label rows of symbol '{}': {}", symbol, e),
    }

    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ItemRecord;
    use crate::storage::SqliteStore;
    use crate::HarvestError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serves a tiny image for every page except those of item 4
    #[derive(Default)]
    struct FakeSource {
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MediaSource for FakeSource {
        async fn fetch_model_animation(&self, _page_url: &str) -> crate::Result<Vec<u8>> {
            unreachable!("patterns never fetch animations")
        }

        async fn fetch_pattern_image(&self, page_url: &str) -> crate::Result<Vec<u8>> {
            self.requested.lock().unwrap().push(page_url.to_string());
            if page_url.ends_with("-4") {
                return Err(HarvestError::NotFound {
                    field: "pattern".to_string(),
                    url: page_url.to_string(),
                });
            }
            Ok(b"\x89PNG".to_vec())
        }
    }

    fn item(number: u64, symbol: &str) -> ItemRecord {
        ItemRecord {
            symbol: symbol.to_string(),
            ..ItemRecord::unknown("plushpepe", number)
        }
    }

    #[tokio::test]
    async fn test_distribute_patterns() {
        let dir = TempDir::new().unwrap();
        let patterns_dir = dir.path().join("patterns");
        let map_path = patterns_dir.join("symbols.json");

        let mut existing = SymbolMap::default();
        existing.insert("Moon", "ab/abMOON.png");
        existing.save(&map_path).unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        store.create_collection("plushpepe").unwrap();
        store
            .insert_batch(
                "plushpepe",
                &[
                    item(1, "Star"),
                    item(2, "Moon"),
                    item(3, "Star"),
                    item(4, "Comet"),
                    item(5, "Comet"),
                ],
            )
            .unwrap();

        let catalog = CatalogUrl::new("https://t.me/nft/{collection}-", "plushpepe").unwrap();
        let source = FakeSource::default();
        let report = distribute_patterns(&catalog, &store, &source, &patterns_dir, &map_path)
            .await
            .unwrap();

        assert_eq!(
            report,
            DistributionReport {
                backfilled: 1,
                assigned: 1,
                failed: 1
            }
        );

        // One request per unmapped symbol, using its lowest-id row
        let mut requested = source.requested.lock().unwrap().clone();
        requested.sort();
        assert_eq!(
            requested,
            vec![
                "https://t.me/nft/plushpepe-1".to_string(),
                "https://t.me/nft/plushpepe-4".to_string()
            ]
        );

        let map = SymbolMap::load(&map_path).unwrap();
        assert_eq!(map.len(), 2);
        let star_label = map.label_for("Star").unwrap();
        assert_eq!(star_label.len(), 6);
        assert!(star_label.starts_with("ab"));
        assert!(patterns_dir.join("ab").join(format!("{star_label}.png")).exists());

        let rows = store.symbol_rows("plushpepe", "plushpepe").unwrap();
        let labels: Vec<Option<&str>> = rows.iter().map(|r| r.bucket_label.as_deref()).collect();
        assert_eq!(
            labels,
            vec![
                Some(star_label.as_str()),
                Some("abMOON"),
                Some(star_label.as_str()),
                None,
                None
            ]
        );
    }

    #[tokio::test]
    async fn test_second_run_fetches_nothing_new() {
        let dir = TempDir::new().unwrap();
        let patterns_dir = dir.path().join("patterns");
        let map_path = patterns_dir.join("symbols.json");

        let store = SqliteStore::open_in_memory().unwrap();
        store.create_collection("plushpepe").unwrap();
        store
            .insert_batch("plushpepe", &[item(1, "Star"), item(2, "Star")])
            .unwrap();

        let catalog = CatalogUrl::new("https://t.me/nft/{collection}-", "plushpepe").unwrap();
        let source = FakeSource::default();
        distribute_patterns(&catalog, &store, &source, &patterns_dir, &map_path)
            .await
            .unwrap();
        let report = distribute_patterns(&catalog, &store, &source, &patterns_dir, &map_path)
            .await
            .unwrap();

        assert_eq!(report, DistributionReport::default());
        assert_eq!(source.requested.lock().unwrap().len(), 1);
    }
}
