//! Zip packing of model directories and scoped cleanup of scratch
//! directories.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;
use zip::write::{FileOptions, ZipWriter};

use crate::error::{NercError, Result};

/// Packs the contents of `dir` into the zip file `zip_path`.
///
/// Entry names are relative to `dir`, so unpacking recreates the directory
/// contents rather than the directory itself.
pub fn pack_dir(dir: &Path, zip_path: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(NercError::input_not_found(dir));
    }
    let mut zip = ZipWriter::new(BufWriter::new(File::create(zip_path)?));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    for path in files {
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if path.is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            io::copy(&mut BufReader::new(File::open(&path)?), &mut zip)?;
        }
    }
    zip.finish()?;
    debug!(from = %dir.display(), to = %zip_path.display(), "packed directory");
    Ok(())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            out.push(path.clone());
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Extracts `zip_path` into `dest`, creating it if needed.
pub fn unpack(zip_path: &Path, dest: &Path) -> Result<()> {
    if !zip_path.is_file() {
        return Err(NercError::input_not_found(zip_path));
    }
    let mut archive = ZipArchive::new(BufReader::new(File::open(zip_path)?))?;
    fs::create_dir_all(dest)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let outpath = dest.join(file.mangled_name());
        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&outpath)?;
            io::copy(&mut file, &mut out)?;
        }
    }
    debug!(from = %zip_path.display(), to = %dest.display(), "unpacked archive");
    Ok(())
}

/// Removes a directory tree when dropped, on success and error paths alike.
#[derive(Debug)]
pub struct ScopedDir {
    path: PathBuf,
}

impl ScopedDir {
    /// Takes ownership of `path`; nothing is created.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove directory");
        }
    }
}
