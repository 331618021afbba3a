//! Bucket directories holding pattern images
//!
//! Buckets are the two-character subdirectories of the patterns directory.
//! New images always go to the bucket currently holding the fewest files.

use crate::Result;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Bucket created when the patterns directory has none
pub const DEFAULT_BUCKET: &str = "ab";

/// Random characters appended to the bucket prefix in a file name
const NAME_SUFFIX_LEN: usize = 4;

/// Extension of stored pattern images
pub const ASSET_EXTENSION: &str = "png";

/// File counts of every bucket, keyed by bucket name
#[derive(Debug, Clone)]
pub struct BucketPool {
    root: PathBuf,
    counts: BTreeMap<String, usize>,
}

fn is_bucket_name(name: &str) -> bool {
    name.chars().count() == 2
}

impl BucketPool {
    /// Scans `root` for bucket directories and counts their files
    ///
    /// When no bucket exists, the default bucket is created so the pool is
    /// never empty.
    pub fn load(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;

        let mut counts = BTreeMap::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if is_bucket_name(&name) {
                let files = fs::read_dir(entry.path())?.count();
                counts.insert(name, files);
            }
        }

        if counts.is_empty() {
            tracing::warn!(
                "No buckets in {}, creating '{}'",
                root.display(),
                DEFAULT_BUCKET
            );
            fs::create_dir_all(root.join(DEFAULT_BUCKET))?;
            counts.insert(DEFAULT_BUCKET.to_string(), 0);
        }

        Ok(Self {
            root: root.to_path_buf(),
            counts,
        })
    }

    /// Builds a pool from known counts without touching the filesystem
    pub fn from_counts<I, S>(root: impl Into<PathBuf>, counts: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        Self {
            root: root.into(),
            counts: counts.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// The least-loaded bucket, ties going to the smallest name
    ///
    /// # Example
    ///
    /// ```
    /// use gift_harvest::patterns::BucketPool;
    ///
    /// let pool = BucketPool::from_counts("patterns", [("aa", 3), ("bb", 1), ("cc", 2)]);
    /// assert_eq!(pool.select().as_deref(), Some("bb"));
    /// ```
    pub fn select(&self) -> Option<String> {
        // BTreeMap iterates in name order and min_by_key keeps the first minimum
        self.counts
            .iter()
            .min_by_key(|(_, count)| **count)
            .map(|(name, _)| name.clone())
    }

    /// Records one more file stored in `bucket`
    pub fn record(&mut self, bucket: &str) {
        *self.counts.entry(bucket.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, bucket: &str) -> Option<usize> {
        self.counts.get(bucket).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    /// Picks a file name in `bucket` that is not taken yet
    pub fn new_asset_name(&self, bucket: &str) -> String {
        let dir = self.bucket_dir(bucket);
        loop {
            let name = asset_file_name(bucket);
            if !dir.join(&name).exists() {
                return name;
            }
        }
    }
}

/// Generates `<bucket prefix><4 random alphanumerics>.png`
pub fn asset_file_name(bucket: &str) -> String {
    let prefix: String = bucket.chars().take(2).collect();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{prefix}{suffix}.{ASSET_EXTENSION}")
}

/// Creates `count` bucket directories named `00`, `01`, ... in hex
///
/// Existing directories are kept. Returns the number of buckets present
/// afterwards.
pub fn scaffold_buckets(root: &Path, count: u32) -> Result<usize> {
    let count = count.min(256);
    for index in 0..count {
        fs::create_dir_all(root.join(format!("{index:02x}")))?;
    }
    Ok(count as usize)
}
