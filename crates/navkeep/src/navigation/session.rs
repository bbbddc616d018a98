//! Per-session persistence of navigation state.
//!
//! The record lives under one fixed key in a string key/value store that
//! outlives page reloads but not the browsing session.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::stack::NavigationStack;
use crate::result::{NavkeepError, NavkeepResult};

/// Session-scoped string key/value storage
pub trait SessionStorage {
    /// Read a value
    fn get_item(&self, key: &str) -> NavkeepResult<Option<String>>;

    /// Write a value
    fn set_item(&self, key: &str, value: &str) -> NavkeepResult<()>;

    /// Delete a value
    fn remove_item(&self, key: &str) -> NavkeepResult<()>;
}

/// In-memory storage; clones share the same map, so a handle kept across
/// navigator instances behaves like a tab surviving reloads
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// No stored keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> NavkeepResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> NavkeepResult<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> NavkeepResult<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Storage backed by a JSON object file, one string value per key
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at `path`; the file is created on first write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> NavkeepResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            NavkeepError::storage(format!("{} is not a storage file: {e}", self.path.display()))
        })
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> NavkeepResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(items)?)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> NavkeepResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> NavkeepResult<()> {
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }

    fn remove_item(&self, key: &str) -> NavkeepResult<()> {
        let mut items = self.read_all()?;
        if items.remove(key).is_some() {
            self.write_all(&items)?;
        }
        Ok(())
    }
}

/// Persisted navigation state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Visited levels
    pub navigation_stack: NavigationStack,
    /// Last settled scroll offset per derived element selector
    #[serde(default)]
    pub scroll_positions: BTreeMap<String, f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredShape {
    Composite(SessionRecord),
    Legacy(NavigationStack),
}

impl SessionRecord {
    /// Parse either the composite shape or the legacy bare stack array
    pub fn parse(raw: &str) -> NavkeepResult<Self> {
        let shape: StoredShape =
            serde_json::from_str(raw).map_err(|e| NavkeepError::SessionRecord {
                message: e.to_string(),
            })?;
        Ok(match shape {
            StoredShape::Composite(record) => record,
            StoredShape::Legacy(navigation_stack) => Self {
                navigation_stack,
                scroll_positions: BTreeMap::new(),
            },
        })
    }

    /// Serialize the full composite value
    pub fn to_json(&self) -> NavkeepResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Read the record under `key`.
    ///
    /// Missing, unreadable and corrupt records all yield `None`; the latter
    /// two are logged.
    pub fn load(storage: &dyn SessionStorage, key: &str) -> Option<Self> {
        let raw = match storage.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "session storage unreadable, starting empty");
                return None;
            }
        };
        match Self::parse(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key, error = %e, "corrupt session record, starting empty");
                None
            }
        }
    }

    /// Write the full record under `key`
    pub fn store(&self, storage: &dyn SessionStorage, key: &str) -> NavkeepResult<()> {
        storage.set_item(key, &self.to_json()?)
    }
}
