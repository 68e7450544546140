//! Native archive extraction (no external tools needed).
//!
//! Archives are unpacked into a staging directory next to the destination.
//! When the archive holds a single top-level directory (GitHub's
//! `repo-v1.2.3/` layout) its contents become the destination; otherwise
//! the archive root does.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use super::error::ExecuteError;

/// Archive formats understood by [`extract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    TarGz,
    TarXz,
    TarBz2,
    TarZst,
    Tar,
    Zip,
}

/// Detect archive format from a filename or URL.
pub fn detect_format(name: &str) -> Option<Format> {
    let name = name.split('?').next().unwrap_or(name).to_lowercase();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(Format::TarGz)
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        Some(Format::TarXz)
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        Some(Format::TarBz2)
    } else if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
        Some(Format::TarZst)
    } else if name.ends_with(".zip") {
        Some(Format::Zip)
    } else if name.ends_with(".tar") {
        Some(Format::Tar)
    } else {
        None
    }
}

fn fail(archive: &Path, reason: impl std::fmt::Display) -> ExecuteError {
    ExecuteError::source_unavailable(&archive.display().to_string(), reason)
}

/// Extract `archive` into `dest`, stripping a lone top-level directory.
///
/// `dest` must not exist or be empty.
pub fn extract(archive: &Path, format: Format, dest: &Path) -> Result<(), ExecuteError> {
    let parent = dest.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(parent)?;

    let file = File::open(archive).map_err(|e| fail(archive, e))?;
    let reader = BufReader::new(file);
    match format {
        Format::TarGz => unpack_tar(archive, flate2::read::GzDecoder::new(reader), staging.path())?,
        Format::TarXz => unpack_tar(archive, xz2::read::XzDecoder::new(reader), staging.path())?,
        Format::TarBz2 => unpack_tar(archive, bzip2::read::BzDecoder::new(reader), staging.path())?,
        Format::TarZst => {
            let decoder = zstd::stream::read::Decoder::new(reader).map_err(|e| fail(archive, e))?;
            unpack_tar(archive, decoder, staging.path())?
        }
        Format::Tar => unpack_tar(archive, reader, staging.path())?,
        Format::Zip => unpack_zip(archive, staging.path())?,
    }

    let root = single_top_level_dir(staging.path())?.unwrap_or_else(|| staging.path().to_path_buf());
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(&root)? {
        let entry = entry?;
        std::fs::rename(entry.path(), dest.join(entry.file_name()))?;
    }
    Ok(())
}

fn single_top_level_dir(dir: &Path) -> Result<Option<PathBuf>, ExecuteError> {
    let entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    match entries.as_slice() {
        [only] if only.file_type()?.is_dir() => Ok(Some(only.path())),
        _ => Ok(None),
    }
}

/// Lexically normalize a path without touching the filesystem.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in path.components() {
        match c {
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn is_unsafe(path: &Path) -> bool {
    path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
}

fn unpack_tar<R: Read>(archive: &Path, reader: R, dest: &Path) -> Result<(), ExecuteError> {
    let mut tar = tar::Archive::new(reader);
    let entries = tar.entries().map_err(|e| fail(archive, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| fail(archive, e))?;
        let path = entry.path().map_err(|e| fail(archive, e))?.into_owned();

        if is_unsafe(&path) {
            return Err(fail(archive, format!("unsafe path in archive: {}", path.display())));
        }
        if path.as_os_str().is_empty() || path == Path::new(".") {
            continue;
        }

        let full_path = dest.join(&path);
        let kind = entry.header().entry_type();
        if kind == tar::EntryType::Symlink || kind == tar::EntryType::Link {
            let target = entry
                .link_name()
                .map_err(|e| fail(archive, e))?
                .ok_or_else(|| fail(archive, format!("link without target: {}", path.display())))?;
            let parent = full_path.parent().unwrap_or(dest);
            let resolved = normalize_lexical(&parent.join(&target));
            if target.is_absolute() || !resolved.starts_with(normalize_lexical(dest)) {
                return Err(fail(
                    archive,
                    format!("link escapes destination: {} -> {}", path.display(), target.display()),
                ));
            }
        }

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry
            .unpack(&full_path)
            .map_err(|e| fail(archive, format!("unpack error for {}: {}", path.display(), e)))?;
    }

    Ok(())
}

fn unpack_zip(archive: &Path, dest: &Path) -> Result<(), ExecuteError> {
    let file = File::open(archive).map_err(|e| fail(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| fail(archive, e))?;

    for i in 0..zip.len() {
        let mut file = zip.by_index(i).map_err(|e| fail(archive, e))?;
        let Some(rel) = file.enclosed_name() else {
            return Err(fail(archive, format!("unsafe path in archive: {}", file.name())));
        };
        let outpath = dest.join(rel);

        if file.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        std::io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
            }
        }
    }

    Ok(())
}
