use std::path::PathBuf;

/// The error type for archive creation and the fuzz harness.
///
/// Every failure is fatal to the operation that produced it; callers are
/// expected to print the single-line message and exit.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn io(err: std::io::Error) -> Error {
        Error::from(ErrorKind::Io(err))
    }

    pub(crate) fn io_path(err: std::io::Error, path: impl Into<PathBuf>) -> Error {
        Error::from(ErrorKind::IoPath {
            source: err,
            path: path.into(),
        })
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

#[derive(Debug)]
pub enum ErrorKind {
    /// An I/O failure with no more specific location than the operation itself.
    Io(std::io::Error),

    /// An I/O failure on a known file or directory.
    IoPath {
        source: std::io::Error,
        path: PathBuf,
    },

    /// An input was neither a regular file nor a directory.
    UnsupportedFileType {
        path: PathBuf,
        kind: &'static str,
    },

    /// A name is not safe to store in an archive.
    UnsafeName {
        name: String,
        reason: &'static str,
    },

    /// A path contains bytes that are not valid UTF-8.
    InvalidUtf8Path(PathBuf),

    /// A size or offset does not fit the archive's 32-bit fields.
    TooLargeFor32Bit {
        what: &'static str,
        value: u64,
    },

    /// More entries than the end record's 16-bit counts can hold.
    TooManyEntries(usize),

    /// A record did not start with the expected signature.
    InvalidSignature {
        expected: u32,
        actual: u32,
    },

    /// A record was truncated.
    Eof,

    /// The persisted fuzz seed file is unusable.
    InvalidSeedFile {
        path: PathBuf,
        reason: &'static str,
    },

    /// A child process exited non-zero or was killed by a signal.
    ChildFailed {
        program: String,
        detail: String,
    },

    /// The staging and extracted trees differ.
    TreeMismatch {
        path: PathBuf,
        detail: String,
    },
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(err) => Some(err),
            ErrorKind::IoPath { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::Io(err) => err.fmt(f),
            ErrorKind::IoPath { source, path } => {
                write!(f, "{}: {}", path.display(), source)
            }
            ErrorKind::UnsupportedFileType { path, kind } => {
                write!(f, "unsupported file kind ({}): {}", kind, path.display())
            }
            ErrorKind::UnsafeName { name, reason } => {
                write!(f, "unsafe archive name {:?}: {}", name, reason)
            }
            ErrorKind::InvalidUtf8Path(path) => {
                write!(f, "path is not valid UTF-8: {}", path.display())
            }
            ErrorKind::TooLargeFor32Bit { what, value } => {
                write!(f, "{} ({}) exceeds the 32-bit archive limit", what, value)
            }
            ErrorKind::TooManyEntries(count) => {
                write!(f, "too many entries for one archive: {}", count)
            }
            ErrorKind::InvalidSignature { expected, actual } => {
                write!(
                    f,
                    "invalid signature: expected 0x{:08x}, got 0x{:08x}",
                    expected, actual
                )
            }
            ErrorKind::Eof => write!(f, "unexpected end of record"),
            ErrorKind::InvalidSeedFile { path, reason } => {
                write!(f, "bad seed file {}: {}", path.display(), reason)
            }
            ErrorKind::ChildFailed { program, detail } => {
                write!(f, "{} failed: {}", program, detail)
            }
            ErrorKind::TreeMismatch { path, detail } => {
                write!(f, "tree mismatch at {}: {}", path.display(), detail)
            }
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error { kind }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::io(err)
    }
}
