//
// batch.rs
// medimage-utils
//
// Folder-mode driver: applies an operation to every NIfTI file in a folder sequentially,
// reporting per-file failures and continuing with the rest.
//

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::models::OutputFormat;

/// NIfTI files directly inside `dir`, sorted for a stable processing order.
pub fn nifti_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Folder {:?} does not exist", dir);
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && OutputFormat::from_path(p).is_some())
        .collect();
    files.sort();
    Ok(files)
}

/// Applies `op` to every NIfTI file in `dir`. A failing file is reported and skipped;
/// the run only errors when there is nothing to process or every file failed.
pub fn process_folder<F>(dir: &Path, mut op: F) -> Result<()>
where
    F: FnMut(&Path) -> Result<()>,
{
    let files = nifti_files(dir)?;
    if files.is_empty() {
        bail!("No NIfTI files found in {:?}", dir);
    }
    info!("Processing {} file(s) in {:?}", files.len(), dir);

    let mut failures = 0usize;
    for path in &files {
        if let Err(e) = op(path) {
            failures += 1;
            error!("Error processing {:?}: {:#}", path, e);
        }
    }

    if failures == files.len() {
        bail!("All {} file(s) in {:?} failed", failures, dir);
    }
    if failures > 0 {
        warn!("{} of {} file(s) failed", failures, files.len());
    } else {
        info!("Processed {} file(s) successfully", files.len());
    }
    Ok(())
}
