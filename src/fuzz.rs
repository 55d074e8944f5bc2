//! Pieces of the differential fuzz harness.
//!
//! The harness is deterministic end to end: a persisted decimal seed drives a
//! [`StdRng`], the generator lays out a staging tree, the writer and an
//! external extractor run as child processes, and the staging and extracted
//! trees are compared byte for byte. On any failure the seed file is left
//! untouched so the failing tree can be regenerated exactly.

use crate::errors::{Error, ErrorKind};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Upper bound on one generated tree's total file bytes.
const MAX_TREE_BYTES: u64 = 1024 * 1024;
/// Upper bound on a single generated file.
const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_DEPTH: usize = 5;
const MAX_DIR_ENTRIES: u32 = 1000;
const COMPARE_BUF: usize = 4096;
const RANDOM_WRITE_CHUNK: usize = 64 * 1024;

/// Longest seed file accepted, well past any 64-bit decimal plus a newline.
const MAX_SEED_FILE_BYTES: u64 = 100;

/// Digits, both letter cases, and the punctuation that is safe in file names
/// on every filesystem the archiver targets. 84 characters.
const NAME_ALPHABET: &[u8; 84] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&'()+,-.;=@[]^_{}~";

/// Maps a monotonic index to a file name: all one-character names first, then
/// all two-character names, and so on, positional base-84 within each length
/// bucket. The two indices that would produce `.` and `..` are remapped to
/// sentinels built from a character outside the alphabet, so they can never
/// collide with another generated name.
pub fn entry_name(index: u64) -> String {
    let base = NAME_ALPHABET.len() as u64;
    let mut length = 1usize;
    let mut bucket = base;
    let mut offset = index;
    while offset >= bucket {
        offset -= bucket;
        bucket = bucket.saturating_mul(base);
        length += 1;
    }

    let mut digits = vec![0u8; length];
    let mut value = offset;
    for slot in digits.iter_mut().rev() {
        *slot = NAME_ALPHABET[(value % base) as usize];
        value /= base;
    }

    let name: String = digits.iter().map(|&b| char::from(b)).collect();
    match name.as_str() {
        "." => String::from("`dot`"),
        ".." => String::from("`dotdot`"),
        _ => name,
    }
}

/// What [`generate_tree`] produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub files: u64,
    pub directories: u64,
    pub bytes: u64,
}

/// Populates `root` (which must already exist) with a reproducible random
/// tree: total file bytes drawn uniformly from `[0, 1 MiB]`, nesting at most
/// five directories deep, at most 1000 entries per directory.
///
/// Directories are only created on disk once a file lands inside them; a
/// subdirectory the random walk enters and leaves empty never materializes,
/// because the archiver would not preserve it anyway.
pub fn generate_tree(root: &Path, seed: u64) -> Result<TreeStats, Error> {
    let mut rng = StdRng::seed_from_u64(seed);
    let target = rng.gen_range(0..=MAX_TREE_BYTES);

    let mut stats = TreeStats::default();
    let mut name_index = 0u64;
    let mut stack: Vec<(PathBuf, u32)> = vec![(root.to_path_buf(), 0)];

    while stats.bytes < target {
        let depth = stack.len() - 1;
        if stack[depth].1 >= MAX_DIR_ENTRIES {
            if depth == 0 {
                break;
            }
            stack.pop();
            continue;
        }

        // 0 = file, 1 = subdirectory, 2 = return to parent. The root cannot
        // be returned from; the deepest level cannot nest further.
        let action = if depth == 0 {
            rng.gen_range(0..2u32)
        } else if depth == MAX_DEPTH {
            if rng.gen_range(0..2u32) == 0 {
                0
            } else {
                2
            }
        } else {
            rng.gen_range(0..3u32)
        };

        match action {
            0 => {
                let name = entry_name(name_index);
                name_index += 1;
                let size = rng.gen_range(0..=MAX_FILE_BYTES.min(target - stats.bytes));
                fs::create_dir_all(&stack[depth].0)
                    .map_err(|err| Error::io_path(err, &stack[depth].0))?;
                let path = stack[depth].0.join(name);
                write_random_file(&path, size, &mut rng)?;
                stack[depth].1 += 1;
                stats.files += 1;
                stats.bytes += size;
            }
            1 => {
                let name = entry_name(name_index);
                name_index += 1;
                let path = stack[depth].0.join(name);
                stack[depth].1 += 1;
                stats.directories += 1;
                stack.push((path, 0));
            }
            _ => {
                stack.pop();
            }
        }
    }

    Ok(stats)
}

fn write_random_file(path: &Path, size: u64, rng: &mut StdRng) -> Result<(), Error> {
    let file = File::create(path).map_err(|err| Error::io_path(err, path))?;
    let mut out = BufWriter::new(file);
    let mut chunk = [0u8; RANDOM_WRITE_CHUNK];
    let mut remaining = size;
    while remaining > 0 {
        let take = (remaining as usize).min(RANDOM_WRITE_CHUNK);
        rng.fill_bytes(&mut chunk[..take]);
        out.write_all(&chunk[..take])
            .map_err(|err| Error::io_path(err, path))?;
        remaining -= take as u64;
    }
    out.flush().map_err(|err| Error::io_path(err, path))?;
    Ok(())
}

/// Reads the persisted seed, creating the file with seed 0 when absent.
/// Accepts a decimal integer optionally followed by `\n` or `\r\n`.
pub fn read_seed(path: &Path) -> Result<u64, Error> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            write_seed(path, 0)?;
            return Ok(0);
        }
        Err(err) => return Err(Error::io_path(err, path)),
    };

    if bytes.len() as u64 > MAX_SEED_FILE_BYTES {
        return Err(Error::from(ErrorKind::InvalidSeedFile {
            path: path.to_path_buf(),
            reason: "file is too long to be a seed",
        }));
    }

    let text = std::str::from_utf8(&bytes).map_err(|_| {
        Error::from(ErrorKind::InvalidSeedFile {
            path: path.to_path_buf(),
            reason: "not valid UTF-8",
        })
    })?;
    let digits = text
        .strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text);
    digits.parse::<u64>().map_err(|_| {
        Error::from(ErrorKind::InvalidSeedFile {
            path: path.to_path_buf(),
            reason: "not a decimal integer",
        })
    })
}

/// Persists `seed` and verifies the write by reading it back.
pub fn write_seed(path: &Path, seed: u64) -> Result<(), Error> {
    fs::write(path, format!("{}\n", seed)).map_err(|err| Error::io_path(err, path))?;
    let persisted = read_seed(path)?;
    if persisted != seed {
        return Err(Error::from(ErrorKind::InvalidSeedFile {
            path: path.to_path_buf(),
            reason: "read-back does not match what was written",
        }));
    }
    Ok(())
}

/// Location of the archive-writer binary: next to the currently running
/// executable.
pub fn writer_binary() -> Result<PathBuf, Error> {
    let exe = std::env::current_exe().map_err(Error::io)?;
    let dir = exe.parent().ok_or_else(|| {
        Error::io(io::Error::new(
            io::ErrorKind::NotFound,
            "executable has no parent directory",
        ))
    })?;
    Ok(dir.join(format!("zip{}", std::env::consts::EXE_SUFFIX)))
}

/// Runs a child to completion, discarding its stdout. Non-zero exit and
/// death by signal are both failures.
pub fn run_tool(program: impl AsRef<OsStr>, args: &[&OsStr]) -> Result<(), Error> {
    let program = program.as_ref();
    let display = program.to_string_lossy().into_owned();
    let status = Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .status()
        .map_err(|err| {
            Error::from(ErrorKind::ChildFailed {
                program: display.clone(),
                detail: format!("failed to start: {}", err),
            })
        })?;

    if !status.success() {
        let detail = match status.code() {
            Some(code) => format!("exit status {}", code),
            None => String::from("terminated by signal"),
        };
        return Err(Error::from(ErrorKind::ChildFailed {
            program: display,
            detail,
        }));
    }
    Ok(())
}

fn mismatch(path: &Path, detail: impl Into<String>) -> Error {
    Error::from(ErrorKind::TreeMismatch {
        path: path.to_path_buf(),
        detail: detail.into(),
    })
}

/// Verifies that `stage` and `extracted` hold equal directory trees.
///
/// Pass 1 walks the staging side: every regular file must exist on the
/// extracted side with identical size and contents (compared in 4096-byte
/// blocks, with EOF confirmed on both), every directory is descended into,
/// and anything else is a bug in the harness itself. Pass 2 walks the
/// extracted side and flags entries the staging side does not have.
pub fn compare_trees(stage: &Path, extracted: &Path) -> Result<(), Error> {
    for entry in fs::read_dir(stage).map_err(|err| Error::io_path(err, stage))? {
        let entry = entry.map_err(|err| Error::io_path(err, stage))?;
        let stage_path = entry.path();
        let other_path = extracted.join(entry.file_name());
        let kind = entry
            .file_type()
            .map_err(|err| Error::io_path(err, &stage_path))?;

        if kind.is_file() {
            compare_file_contents(&stage_path, &other_path)?;
        } else if kind.is_dir() {
            compare_trees(&stage_path, &other_path)?;
        } else {
            return Err(mismatch(&stage_path, "staging entry is not a file or directory"));
        }
    }

    let extracted_entries = match fs::read_dir(extracted) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(mismatch(extracted, "directory missing from extracted tree"));
        }
        Err(err) => return Err(Error::io_path(err, extracted)),
    };
    for entry in extracted_entries {
        let entry = entry.map_err(|err| Error::io_path(err, extracted))?;
        let counterpart = stage.join(entry.file_name());
        if fs::symlink_metadata(&counterpart).is_err() {
            return Err(mismatch(&entry.path(), "extra entry in extracted tree"));
        }
    }

    Ok(())
}

fn compare_file_contents(stage_path: &Path, other_path: &Path) -> Result<(), Error> {
    let stage_meta =
        fs::metadata(stage_path).map_err(|err| Error::io_path(err, stage_path))?;
    let other_meta = match fs::metadata(other_path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(mismatch(other_path, "file missing from extracted tree"));
        }
        Err(err) => return Err(Error::io_path(err, other_path)),
    };

    if !other_meta.is_file() {
        return Err(mismatch(other_path, "extracted entry is not a regular file"));
    }
    if stage_meta.len() != other_meta.len() {
        return Err(mismatch(
            other_path,
            format!("size {} differs from {}", other_meta.len(), stage_meta.len()),
        ));
    }

    let mut stage_file =
        File::open(stage_path).map_err(|err| Error::io_path(err, stage_path))?;
    let mut other_file =
        File::open(other_path).map_err(|err| Error::io_path(err, other_path))?;
    let mut stage_buf = [0u8; COMPARE_BUF];
    let mut other_buf = [0u8; COMPARE_BUF];

    loop {
        let stage_read = read_block(&mut stage_file, &mut stage_buf)
            .map_err(|err| Error::io_path(err, stage_path))?;
        let other_read = read_block(&mut other_file, &mut other_buf)
            .map_err(|err| Error::io_path(err, other_path))?;
        if stage_read != other_read {
            return Err(mismatch(other_path, "file has bytes beyond the expected size"));
        }
        if stage_read == 0 {
            return Ok(());
        }
        if stage_buf[..stage_read] != other_buf[..other_read] {
            return Err(mismatch(other_path, "contents differ"));
        }
    }
}

/// Fills as much of `buf` as the reader will give before EOF.
fn read_block(reader: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = reader.read(&mut buf[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}
