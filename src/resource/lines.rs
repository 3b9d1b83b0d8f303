//! Line table: dialogue keys to talkie files and subtitles
//!
//! Stored as a property file, one line per entry:
//!
//! ```text
//! putt_0001 = putt_0001.wav | Nice day for a walk.
//! goat_bleat = goat_bleat.wav
//! ```
//!
//! A key that is not in the table is used as the file name itself, with
//! no subtitle.

use std::collections::HashMap;
use std::path::Path;

use super::loader::{LoaderError, LoaderResult};
use super::propfile::parse_propfile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEntry {
    pub file: String,
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LineTable {
    entries: HashMap<String, LineEntry>,
}

impl LineTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(data: &str) -> Self {
        let mut table = Self::new();
        parse_propfile(data, &mut |key, value| {
            let (file, subtitle) = match value.split_once('|') {
                Some((file, text)) => (file.trim(), Some(text.trim())),
                None => (value, None),
            };
            let subtitle = subtitle.filter(|s| !s.is_empty());
            table.insert(key, file, subtitle);
        });
        table
    }

    pub fn load<P: AsRef<Path>>(path: P) -> LoaderResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&data))
    }

    pub fn insert(&mut self, key: impl Into<String>, file: impl Into<String>, subtitle: Option<&str>) {
        self.entries.insert(
            key.into(),
            LineEntry {
                file: file.into(),
                subtitle: subtitle.map(str::to_string),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&LineEntry> {
        self.entries.get(key)
    }

    /// File and subtitle for `key`, falling back to the key as file name
    pub fn resolve(&self, key: &str) -> LineEntry {
        self.entries.get(key).cloned().unwrap_or_else(|| LineEntry {
            file: key.to_string(),
            subtitle: None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
