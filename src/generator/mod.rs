use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::Rng;
use tempfile::TempDir;
use tracing::info;

const OBJECT_NAME_PREFIX: &str = "image-sync-";
const CONTENT_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A scratch directory of generated objects. Dropping it removes the
/// directory and everything in it.
pub struct ObjectSet {
    scratch_dir: TempDir,
    files: Vec<PathBuf>,
}

impl ObjectSet {
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Bare object names, as they should appear in a bucket listing.
    pub fn object_names(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .collect()
    }

    pub fn scratch_path(&self) -> &std::path::Path {
        self.scratch_dir.path()
    }
}

/// Creates `count` files of `size` random ASCII-letter bytes in a fresh
/// scratch directory. Partial output on failure is fine; the directory is
/// removed as a whole on drop.
pub fn generate_objects(count: usize, size: usize) -> Result<ObjectSet> {
    info!(count = count, size = size, "generate local objects.");

    let scratch_dir = tempfile::Builder::new()
        .prefix("objects")
        .tempdir()
        .context("failed to create scratch directory")?;

    let mut rng = rand::thread_rng();
    let mut files = Vec::with_capacity(count);

    for index in 0..count {
        let path = scratch_dir
            .path()
            .join(format!("{OBJECT_NAME_PREFIX}{index:04}.txt"));
        let mut file = fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        let content: Vec<u8> = (0..size)
            .map(|_| CONTENT_CHARSET[rng.gen_range(0..CONTENT_CHARSET.len())])
            .collect();
        file.write_all(&content)
            .with_context(|| format!("failed to write {}", path.display()))?;

        files.push(path);
    }

    Ok(ObjectSet { scratch_dir, files })
}
