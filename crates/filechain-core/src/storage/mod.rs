//! Storage backend seam.
//!
//! The executor only ever lists a location and opens listed objects. Any
//! object store or filesystem that can do both plugs in here.

pub mod location;
pub mod memory;

pub use location::Location;
pub use memory::MemoryStorage;

use crate::errors::ExError;
use crate::glob::GlobPattern;
use crate::model::FileRef;
use std::io::Read;

pub trait StorageBackend: Send + Sync {
    /// List the objects under `location`, sorted by path.
    ///
    /// When `pattern` is given it is matched against each object's path
    /// relative to the location.
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` if the location cannot be listed, `InvalidInput`
    /// if it is malformed or uses a scheme the backend does not serve.
    fn list(&self, location: &str, pattern: Option<&GlobPattern>) -> Result<Vec<FileRef>, ExError>;

    /// Open the exact object version a FileRef describes.
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` if the object (or that version of it) cannot be read.
    fn open(&self, file: &FileRef) -> Result<Box<dyn Read + Send>, ExError>;

    /// Read a whole object into memory.
    ///
    /// # Errors
    ///
    /// As for [`StorageBackend::open`], plus `StorageUnavailable` on read failure.
    fn read_all(&self, file: &FileRef) -> Result<Vec<u8>, ExError> {
        let mut reader = self.open(file)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map_err(|e| {
            ExError::new(crate::errors::ExErrorKind::StorageUnavailable)
                .with_op("read")
                .with_row(file.source.as_str(), file.path.as_str())
                .with_message(e.to_string())
        })?;
        Ok(buf)
    }
}
