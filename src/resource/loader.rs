//! Resource loaders
//!
//! The runtime core never touches the filesystem itself. Audio and costume
//! data come through [`ResourceLoader`]: [`FsLoader`] reads a content
//! directory, [`MemoryLoader`] serves data registered up front (tests,
//! tools, generated content).
//!
//! # Layout
//! ```text
//! <content>/audio/talkies/<line>.wav
//! <content>/audio/sfx/<effect>.wav
//! <content>/audio/music/<song>.ogg
//! <content>/costumes/<name>.json   (+ sheet images next to it)
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::costume::{CostumeAsset, CostumeDescriptor, CostumeError};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("i/o error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid resource path: {0}")]
    InvalidPath(String),
    #[error("bad costume '{path}': {source}")]
    Costume {
        path: String,
        #[source]
        source: CostumeError,
    },
    #[error("bad image '{path}': {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

pub type LoaderResult<T> = Result<T, LoaderError>;

/// Synchronous access to game data, keyed by content-relative path
pub trait ResourceLoader {
    fn load_audio(&self, path: &str) -> LoaderResult<Vec<u8>>;

    fn load_costume(&self, path: &str) -> LoaderResult<CostumeAsset>;
}

/// Loads from a content directory on disk
#[derive(Debug, Clone)]
pub struct FsLoader {
    base: PathBuf,
}

impl FsLoader {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    fn resolve(&self, relative: &str) -> LoaderResult<PathBuf> {
        if relative.split(['/', '\\']).any(|part| part == "..") {
            return Err(LoaderError::InvalidPath(format!(
                "path traversal not allowed: {}",
                relative
            )));
        }
        let full = self.base.join(relative);
        if !full.is_file() {
            return Err(LoaderError::NotFound(relative.to_string()));
        }
        Ok(full)
    }
}

impl ResourceLoader for FsLoader {
    fn load_audio(&self, path: &str) -> LoaderResult<Vec<u8>> {
        let full = self.resolve(path)?;
        fs::read(&full).map_err(|source| LoaderError::Io {
            path: path.to_string(),
            source,
        })
    }

    fn load_costume(&self, path: &str) -> LoaderResult<CostumeAsset> {
        let full = self.resolve(path)?;
        let json = fs::read_to_string(&full).map_err(|source| LoaderError::Io {
            path: path.to_string(),
            source,
        })?;
        let descriptor = CostumeDescriptor::parse(&json).map_err(|source| LoaderError::Costume {
            path: path.to_string(),
            source,
        })?;

        let stem = full
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let dir = Path::new(path).parent().unwrap_or(Path::new(""));

        let mut names = descriptor.image_names();
        if names.is_empty() && matches!(descriptor, CostumeDescriptor::Single(_)) {
            names.push(format!("{}.png", stem));
        }

        let mut images = HashMap::new();
        for name in names {
            let relative = dir.join(&name);
            let relative = relative.to_string_lossy();
            let image_path = match self.resolve(&relative) {
                Ok(found) => found,
                Err(LoaderError::NotFound(missing)) => {
                    log::warn!("costume '{}': image '{}' not found", path, missing);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let image = image::open(&image_path).map_err(|source| LoaderError::Image {
                path: relative.to_string(),
                source,
            })?;
            images.insert(name, image.to_rgba8());
        }

        log::debug!("loaded costume '{}' ({} images)", path, images.len());
        Ok(CostumeAsset {
            name: stem,
            descriptor,
            images,
        })
    }
}

/// Serves data registered with `insert_*`
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    audio: HashMap<String, Vec<u8>>,
    costumes: HashMap<String, CostumeAsset>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_audio(&mut self, path: impl Into<String>, data: Vec<u8>) {
        self.audio.insert(path.into(), data);
    }

    pub fn insert_costume(&mut self, path: impl Into<String>, asset: CostumeAsset) {
        self.costumes.insert(path.into(), asset);
    }
}

impl ResourceLoader for MemoryLoader {
    fn load_audio(&self, path: &str) -> LoaderResult<Vec<u8>> {
        self.audio
            .get(path)
            .cloned()
            .ok_or_else(|| LoaderError::NotFound(path.to_string()))
    }

    fn load_costume(&self, path: &str) -> LoaderResult<CostumeAsset> {
        self.costumes
            .get(path)
            .cloned()
            .ok_or_else(|| LoaderError::NotFound(path.to_string()))
    }
}
