//! Model animation download
//!
//! Each distinct model of a collection is downloaded once, from the first item
//! carrying it. The raw sticker is kept as `tgs/<model>.tgs` and its
//! decompressed Lottie document as `anim/<model>.json`.

use crate::catalog::CatalogUrl;
use crate::media::MediaSource;
use crate::storage::ItemStore;
use crate::Result;
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Counters for one model download run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDownloadReport {
    pub downloaded: usize,
    pub failed: usize,
}

/// Downloads the animation of every distinct model stored for a collection
///
/// Failures are logged per model and do not stop the run.
///
/// # Arguments
///
/// * `catalog` - Address of the collection
/// * `store` - The item store holding the crawled collection
/// * `source` - Where assets are fetched from
/// * `models_dir` - Directory receiving the `tgs/` and `anim/` subdirectories
pub async fn download_models(
    catalog: &CatalogUrl,
    store: &dyn ItemStore,
    source: &dyn MediaSource,
    models_dir: &Path,
) -> Result<ModelDownloadReport> {
    let table = catalog.collection();
    let models = store.first_number_per_model(table, table)?;

    let tgs_dir = models_dir.join("tgs");
    let anim_dir = models_dir.join("anim");
    fs::create_dir_all(&tgs_dir)?;
    fs::create_dir_all(&anim_dir)?;

    tracing::info!("Downloading {} models of {}", models.len(), table);

    let mut report = ModelDownloadReport::default();
    for (model, number) in models {
        let page_url = catalog.item_url(number);
        let stem = file_stem(&model);

        let result = match source.fetch_model_animation(&page_url).await {
            Ok(data) => {
                let tgs_path = tgs_dir.join(format!("{stem}.tgs"));
                let json_path = anim_dir.join(format!("{stem}.json"));
                match tokio::task::spawn_blocking(move || {
                    save_animation(&data, &tgs_path, &json_path)
                })
                .await
                {
                    Ok(saved) => saved,
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!("Saved model '{}' (#{})", model, number);
                report.downloaded += 1;
            }
            Err(e) => {
                tracing::error!("Failed to download model '{}' (#{}): {}", model, number, e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Writes the raw sticker and its gunzipped JSON
fn save_animation(data: &[u8], tgs_path: &Path, json_path: &Path) -> Result<()> {
    fs::write(tgs_path, data)?;

    let mut json = Vec::new();
    GzDecoder::new(data).read_to_end(&mut json)?;
    fs::write(json_path, json)?;

    Ok(())
}

/// File name for a model, with path separators replaced
fn file_stem(model: &str) -> String {
    model
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}
