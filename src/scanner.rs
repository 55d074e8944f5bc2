//! Expands the command line's paths into the flat list of files to archive.
//!
//! A regular-file argument is stored under its verbatim name; a directory
//! argument is walked recursively and every regular file below it is stored
//! under its `/`-joined path relative to that directory. Directories are
//! never stored, so empty directories do not survive a round trip. Anything
//! that is neither a regular file nor a directory is refused.

use crate::errors::{Error, ErrorKind};
use crate::path::ArchivePath;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// One file to be written into the archive.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// The directory root this entry was found under, or `None` for a
    /// standalone file argument.
    pub source_dir: Option<PathBuf>,
    /// The name the file will carry inside the archive.
    pub archive_path: ArchivePath,
    /// Size snapshot taken at scan time.
    pub uncompressed_size: u64,
}

impl FileEntry {
    /// The on-disk location of this entry's contents.
    pub fn fs_path(&self) -> PathBuf {
        match &self.source_dir {
            Some(dir) => dir.join(self.archive_path.as_str()),
            None => PathBuf::from(self.archive_path.as_str()),
        }
    }
}

/// Expands every input path into `FileEntry`s, in input order. Iteration
/// order within a directory is whatever the OS yields.
pub fn scan_inputs<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<FileEntry>, Error> {
    let mut entries = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        let path = Path::new(input);
        let metadata =
            fs::symlink_metadata(path).map_err(|err| Error::io_path(err, path))?;
        let file_type = metadata.file_type();

        if file_type.is_file() {
            entries.push(FileEntry {
                source_dir: None,
                archive_path: ArchivePath::new(input)?,
                uncompressed_size: metadata.len(),
            });
        } else if file_type.is_dir() {
            scan_directory(path, &mut entries)?;
        } else {
            return Err(Error::from(ErrorKind::UnsupportedFileType {
                path: path.to_path_buf(),
                kind: describe_file_type(&file_type),
            }));
        }
    }
    Ok(entries)
}

fn scan_directory(root: &Path, entries: &mut Vec<FileEntry>) -> Result<(), Error> {
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|err| {
            let path = err.path().map(Path::to_path_buf);
            let io_err = std::io::Error::from(err);
            match path {
                Some(path) => Error::io_path(io_err, path),
                None => Error::io(io_err),
            }
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            return Err(Error::from(ErrorKind::UnsupportedFileType {
                path: entry.path().to_path_buf(),
                kind: describe_file_type(&file_type),
            }));
        }

        let metadata = entry
            .metadata()
            .map_err(|err| Error::io_path(std::io::Error::from(err), entry.path()))?;

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path());
        entries.push(FileEntry {
            source_dir: Some(root.to_path_buf()),
            archive_path: joined_components(relative)?,
            uncompressed_size: metadata.len(),
        });
    }
    Ok(())
}

/// Rebuilds an archive name from path components, which keeps platform
/// separators and any `.`/`..` parts out of the stored name.
fn joined_components(relative: &Path) -> Result<ArchivePath, Error> {
    let mut name = String::new();
    for component in relative.components() {
        let part = match component {
            Component::Normal(part) => part,
            _ => continue,
        };
        let part = part
            .to_str()
            .ok_or_else(|| ErrorKind::InvalidUtf8Path(relative.to_path_buf()))
            .map_err(Error::from)?;
        if !name.is_empty() {
            name.push('/');
        }
        name.push_str(part);
    }
    ArchivePath::new(name)
}

fn describe_file_type(file_type: &fs::FileType) -> &'static str {
    if file_type.is_symlink() {
        "symlink"
    } else {
        "not a regular file or directory"
    }
}
