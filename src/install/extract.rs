//! Package extraction for the two distribution formats
//!
//! `.tar.gz` packages are read frame by frame through a gzip decoder;
//! `.zip` packages are walked by index. Both reproduce directories and
//! regular files under the destination and skip everything else.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use log::{debug, info};
use tar::{Archive, EntryType};
use zip::ZipArchive;

use super::error::{InstallerError, Result};

/// Mode used for directories the archive does not describe itself
const DEFAULT_DIR_MODE: u32 = 0o755;

/// Mode used for files whose header carries no permission bits
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Package formats, chosen by file name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFormat {
    TarGz,
    Zip,
}

impl PackageFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| InstallerError::UnsupportedArchive(path.to_path_buf()))?;

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(InstallerError::UnsupportedArchive(path.to_path_buf()))
        }
    }
}

/// What an extraction run produced
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub directories: usize,
    pub files: usize,
    pub skipped: usize,
    pub bytes: u64,
}

/// Extract a package into `dest_dir`, dispatching on its suffix.
pub fn extract_package(package: &Path, dest_dir: &Path) -> Result<ExtractSummary> {
    match PackageFormat::from_path(package)? {
        PackageFormat::TarGz => extract_tar_gz(package, dest_dir),
        PackageFormat::Zip => extract_zip(package, dest_dir),
    }
}

/// Extract a gzip-compressed tar archive into `dest_dir`.
///
/// Entries are handled in archive order and each file is fully written and
/// closed before the next header is read. The first error stops the run;
/// entries already written stay on disk.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<ExtractSummary> {
    let file = File::open(archive_path).map_err(|e| InstallerError::io(archive_path, e))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut summary = ExtractSummary::default();

    let entries = archive
        .entries()
        .map_err(|e| InstallerError::io(archive_path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| InstallerError::io(archive_path, e))?;
        let raw_path = entry
            .path()
            .map_err(|e| InstallerError::io(archive_path, e))?
            .into_owned();
        let header = entry.header();
        let entry_type = header.entry_type();

        let Some(target) = resolve_entry_path(dest_dir, &raw_path)? else {
            continue;
        };

        match entry_type {
            EntryType::Directory => {
                create_dir(&target)?;
                summary.directories += 1;
            }
            EntryType::Regular | EntryType::Continuous => {
                let mode = header.mode().unwrap_or(DEFAULT_FILE_MODE);
                let written = write_file(&target, mode, &mut entry)?;
                debug!("untar {} ({written} bytes)", target.display());
                summary.files += 1;
                summary.bytes += written;
            }
            other => {
                debug!("skipping {} ({other:?})", raw_path.display());
                summary.skipped += 1;
            }
        }
    }

    info!(
        "extracted {} directories and {} files from {}",
        summary.directories,
        summary.files,
        archive_path.display()
    );
    Ok(summary)
}

/// Extract a zip archive into `dest_dir` with the same entry rules as tar.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<ExtractSummary> {
    let file = File::open(archive_path).map_err(|e| InstallerError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| zip_error(archive_path, e))?;
    let mut summary = ExtractSummary::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| zip_error(archive_path, e))?;
        let raw_path = PathBuf::from(entry.name());

        let Some(target) = resolve_entry_path(dest_dir, &raw_path)? else {
            continue;
        };

        if entry.is_dir() {
            create_dir(&target)?;
            summary.directories += 1;
        } else if entry.is_file() {
            let mode = entry.unix_mode().map_or(DEFAULT_FILE_MODE, |m| m & 0o7777);
            let written = write_file(&target, mode, &mut entry)?;
            debug!("unzip {} ({written} bytes)", target.display());
            summary.files += 1;
            summary.bytes += written;
        } else {
            debug!("skipping {}", raw_path.display());
            summary.skipped += 1;
        }
    }

    info!(
        "extracted {} directories and {} files from {}",
        summary.directories,
        summary.files,
        archive_path.display()
    );
    Ok(summary)
}

/// Join an entry path onto `dest_dir`, refusing anything that could land
/// outside it. Returns `None` for entries that name the root itself.
fn resolve_entry_path(dest_dir: &Path, entry_path: &Path) -> Result<Option<PathBuf>> {
    let mut relative = PathBuf::new();

    for component in entry_path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(InstallerError::UnsafeEntryPath(entry_path.to_path_buf()));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Ok(None);
    }
    Ok(Some(dest_dir.join(relative)))
}

fn create_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DEFAULT_DIR_MODE);
    }
    builder.create(path).map_err(|e| InstallerError::io(path, e))
}

/// Copy one entry's content into `path`, applying `mode` exactly.
fn write_file(path: &Path, mode: u32, content: &mut impl io::Read) -> Result<u64> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut out = options.open(path).map_err(|e| InstallerError::io(path, e))?;
    let written = io::copy(content, &mut out).map_err(|e| InstallerError::io(path, e))?;

    // the creation mode is filtered through the umask and ignored for
    // files that already existed
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        out.set_permissions(fs::Permissions::from_mode(mode))
            .map_err(|e| InstallerError::io(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(written)
}

fn zip_error(path: &Path, err: zip::result::ZipError) -> InstallerError {
    InstallerError::io(path, io::Error::other(err))
}
