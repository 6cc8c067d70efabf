//! Deferred IO interfaces.
//!
//! Reads are performed on a reactor job, so a read never completes within the
//! call that requested it.

use std::fs;
use std::io;
use std::path::Path;

use crate::runtime::Reactor;
use crate::{Deferred, Error};

/// How the bytes of a read are decoded into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Strict UTF-8. Invalid input fails the read with
    /// [`io::ErrorKind::InvalidData`].
    #[default]
    Utf8,
    /// UTF-8, replacing invalid sequences with `U+FFFD`.
    Utf8Lossy,
}

impl Encoding {
    fn decode(self, bytes: Vec<u8>) -> io::Result<String> {
        match self {
            Self::Utf8 => {
                String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
            }
            Self::Utf8Lossy => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

/// A source of file contents.
pub trait IoService {
    /// Read everything at `locator`, decoded with `encoding`. Rejects with
    /// [`Error::Io`] if the read fails.
    fn read_all(&self, locator: &Path, encoding: Encoding) -> Deferred<String>;
}

/// The [`IoService`] backed by the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystem;

impl IoService for FileSystem {
    fn read_all(&self, locator: &Path, encoding: Encoding) -> Deferred<String> {
        let content = Deferred::pending();
        let resolver = content.clone();
        let path = locator.to_path_buf();
        Reactor::current().schedule(move || match read_to_string(&path, encoding) {
            Ok(text) => {
                tracing::debug!(path = %path.display(), bytes = text.len(), "read file");
                resolver.resolve(text)
            }
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "read failed");
                resolver.reject(Error::from(err))
            }
        });
        content
    }
}

/// Read everything at `locator` from the local file system.
pub fn read_all(locator: impl AsRef<Path>, encoding: Encoding) -> Deferred<String> {
    FileSystem.read_all(locator.as_ref(), encoding)
}

fn read_to_string(path: &Path, encoding: Encoding) -> io::Result<String> {
    encoding.decode(fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime;

    #[test]
    fn decodes_lossy_and_strict() {
        let bytes = vec![b'o', b'k', 0xff];
        assert_eq!(Encoding::Utf8Lossy.decode(bytes.clone()).unwrap(), "ok\u{fffd}");
        let err = Encoding::Utf8.decode(bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn read_is_deferred() {
        let content = read_all(file!(), Encoding::Utf8);
        assert!(content.is_pending());
        runtime::run_until_stalled();
        assert!(content.value().unwrap().contains("fn read_is_deferred"));
    }

    #[test]
    fn invalid_utf8_depends_on_encoding() {
        let path = std::env::temp_dir().join(format!("deferred-io-{}.bin", std::process::id()));
        fs::write(&path, [b'h', b'i', 0xff]).unwrap();

        let strict = read_all(&path, Encoding::Utf8);
        let lossy = read_all(&path, Encoding::Utf8Lossy);
        runtime::run_until_stalled();
        fs::remove_file(&path).unwrap();

        assert_eq!(strict.reason().and_then(|e| e.io_kind()), Some(io::ErrorKind::InvalidData));
        assert_eq!(lossy.value().as_deref(), Some("hi\u{fffd}"));
    }
}
