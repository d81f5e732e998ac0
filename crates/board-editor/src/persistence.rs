//! Persistence collaborator.
//!
//! The engine hands a [`SceneDocument`] to a backend and never waits on it
//! for correctness: a failed save is reported but the in-memory scene
//! stays as it is.

use crate::error::PersistenceError;
use board_core::document::SceneDocument;
use std::path::{Path, PathBuf};

pub trait PersistenceBackend {
    fn save(&mut self, doc: &SceneDocument) -> Result<(), PersistenceError>;

    fn load(&mut self) -> Result<SceneDocument, PersistenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    MessagePack,
}

impl Encoding {
    /// `.json` is JSON; anything else is MessagePack.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Encoding::Json,
            _ => Encoding::MessagePack,
        }
    }

    pub fn encode(self, doc: &SceneDocument) -> Result<Vec<u8>, PersistenceError> {
        Ok(match self {
            Encoding::Json => doc.to_json()?.into_bytes(),
            Encoding::MessagePack => doc.to_msgpack()?,
        })
    }

    pub fn decode(self, bytes: &[u8]) -> Result<SceneDocument, PersistenceError> {
        Ok(match self {
            Encoding::Json => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| PersistenceError::Backend(format!("document is not utf-8: {e}")))?;
                SceneDocument::from_json(text)?
            }
            Encoding::MessagePack => SceneDocument::from_msgpack(bytes)?,
        })
    }
}

/// A single document file on disk.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    encoding: Encoding,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let encoding = Encoding::for_path(&path);
        Self { path, encoding }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceBackend for FileBackend {
    fn save(&mut self, doc: &SceneDocument) -> Result<(), PersistenceError> {
        let bytes = self.encoding.encode(doc)?;
        // Write beside the target and rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        log::debug!("saved {} elements to {}", doc.elements.len(), self.path.display());
        Ok(())
    }

    fn load(&mut self) -> Result<SceneDocument, PersistenceError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(PersistenceError::Missing),
            Err(e) => return Err(e.into()),
        };
        self.encoding.decode(&bytes)
    }
}

/// In-memory backend, encoded like a file. `fail_saves` makes every save
/// fail, for exercising error paths.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    encoding: Encoding,
    stored: Option<Vec<u8>>,
    pub fail_saves: bool,
    pub saves: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(Encoding::MessagePack)
    }
}

impl MemoryBackend {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            stored: None,
            fail_saves: false,
            saves: 0,
        }
    }

    pub fn stored(&self) -> Option<&[u8]> {
        self.stored.as_deref()
    }
}

impl PersistenceBackend for MemoryBackend {
    fn save(&mut self, doc: &SceneDocument) -> Result<(), PersistenceError> {
        if self.fail_saves {
            return Err(PersistenceError::Backend("storage unavailable".into()));
        }
        self.stored = Some(self.encoding.encode(doc)?);
        self.saves += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<SceneDocument, PersistenceError> {
        let bytes = self.stored.as_deref().ok_or(PersistenceError::Missing)?;
        self.encoding.decode(bytes)
    }
}
