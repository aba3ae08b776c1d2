use std::{fs, path::{Path, PathBuf}};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Create the directory if it doesn't exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("[common::fs] Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("[common::fs] Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Extracts the given `.zip` file to the target directory.
pub(crate) fn extract_zip(zip_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = fs::File::open(zip_path)
        .with_context(|| format!("[common::fs] Failed to open {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("[common::fs] Failed to read zip archive {}", zip_path.display()))?;
    archive.extract(dest_dir)
        .with_context(|| format!("[common::fs] Failed to extract {} to {}", zip_path.display(), dest_dir.display()))
}

/// Every file under `root` with the given extension (ignoring case), sorted by path.
pub(crate) fn find_files_with_extension(root: &Path, ext: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)))
        .collect();
    files.sort();
    files
}
