// Property files: `key = value` lines with `#` comments.
// Used for engine settings and line tables.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::loader::{LoaderError, LoaderResult};

/// Walk `data`, calling `handler` for each `key = value` entry in order.
/// Text after `#` is a comment; keys and values are trimmed; lines without
/// `=` are skipped with a warning.
pub fn parse_propfile(data: &str, handler: &mut dyn FnMut(&str, &str)) {
    for (number, raw) in data.lines().enumerate() {
        let line = match raw.find('#') {
            Some(hash) => &raw[..hash],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            log::warn!("propfile line {}: key without value", number + 1);
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            log::warn!("propfile line {}: empty key", number + 1);
            continue;
        }
        handler(key, value.trim());
    }
}

/// Parsed property file; keys are case-insensitive
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyFile {
    properties: HashMap<String, String>,
}

impl PropertyFile {
    pub fn parse(data: &str) -> Self {
        let mut properties = HashMap::new();
        parse_propfile(data, &mut |key, value| {
            properties.insert(key.to_lowercase(), value.to_string());
        });
        Self { properties }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> LoaderResult<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&data))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get(key)?.parse().ok()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.properties.insert(key.to_lowercase(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
