//! Archive-internal name policy.
//!
//! Names stored in an archive are always `/`-separated, relative, and free of
//! parent-directory escapes. Unlike a reader, which has to normalize whatever
//! hostile bytes it finds, this writer simply refuses anything unsafe: the
//! only way an unsafe name reaches us is a bad standalone CLI argument, and
//! failing loudly beats storing a name some extractor will misinterpret.

use crate::errors::{Error, ErrorKind};

/// A validated archive-internal file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchivePath {
    name: String,
}

impl ArchivePath {
    /// Validates `name` and wraps it. Fails with the first rule the name
    /// breaks: empty, absolute, backslashes, or a `..` segment.
    pub fn new(name: impl Into<String>) -> Result<ArchivePath, Error> {
        let name = name.into();
        match unsafe_reason(&name) {
            None => Ok(ArchivePath { name }),
            Some(reason) => Err(Error::from(ErrorKind::UnsafeName { name, reason })),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl AsRef<str> for ArchivePath {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

fn unsafe_reason(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("empty name");
    }
    if name.starts_with('/') || name.starts_with('\\') {
        return Some("absolute path");
    }
    if name.contains('\\') {
        return Some("contains a backslash");
    }
    if name.split('/').any(|segment| segment == "..") {
        return Some("contains a parent-directory segment");
    }
    None
}
