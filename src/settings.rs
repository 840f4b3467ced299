//! Flat key/value settings store.
//!
//! Keys are `"entity.property"` or plain `"property"`. Values are
//! [`SettingValue`]s. A store may be backed by a [`PersistentStore`]; persistent
//! values are always mirrored in memory, and failures to read or write the
//! backing files are logged and swallowed because every caller has a
//! computed default to fall back on.

use crate::model::{SettingType, SettingValue};
use crate::persist::PersistentStore;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Default, Debug)]
pub struct SettingsStore {
    values: BTreeMap<String, SettingValue>,
    persistent: Option<PersistentStore>,
}

/// The key `key` becomes when entity `old` is renamed to `new`, if it refers to `old`.
fn renamed_key(key: &str, old: &str, new: &str) -> Option<String> {
    if key == old {
        return Some(new.to_string());
    }
    let prefix = format!("{old}.");
    let suffix = format!(".{old}");
    let infix = format!(".{old}.");

    let mut renamed = key.to_string();
    let mut changed = false;
    if let Some(rest) = renamed.strip_prefix(&prefix) {
        renamed = format!("{new}.{rest}");
        changed = true;
    }
    if let Some(head) = renamed.strip_suffix(&suffix) {
        renamed = format!("{head}.{new}");
        changed = true;
    }
    if renamed.contains(&infix) {
        renamed = renamed.replace(&infix, &format!(".{new}."));
        changed = true;
    }
    changed.then_some(renamed)
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persistence(dir: &Path) -> Self {
        Self { values: BTreeMap::new(), persistent: Some(PersistentStore::open(dir)) }
    }

    pub fn persistent_store(&self) -> Option<&PersistentStore> {
        self.persistent.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    pub fn get_typed<T: SettingType>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(T::from_setting)
    }

    /// The stored value if it converts to `T`, otherwise `default`. Never stores.
    pub fn get_or<T: SettingType>(&self, key: &str, default: T) -> T {
        self.get_typed(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn store(&mut self, key: &str, value: SettingValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn store_as<T: SettingType>(&mut self, key: &str, value: T) {
        self.store(key, value.into_setting());
    }

    pub fn clear(&mut self, key: &str) -> Option<SettingValue> {
        self.values.remove(key)
    }

    /// Memory first, then the backing file. The loaded value is cached in memory.
    pub fn get_persistent(&mut self, key: &str) -> Option<SettingValue> {
        if let Some(value) = self.values.get(key) {
            return Some(value.clone());
        }
        let loaded = match self.persistent.as_ref()?.load(key) {
            Ok(value) => value?,
            Err(e) => {
                debug!("[SETTINGS] Ignoring unreadable preference '{}': {:#}", key, e);
                return None;
            }
        };
        self.values.insert(key.to_string(), loaded.clone());
        Some(loaded)
    }

    pub fn store_persistent(&mut self, key: &str, value: SettingValue) {
        if let Some(persistent) = &self.persistent {
            if let Err(e) = persistent.save(key, &value) {
                warn!("[SETTINGS] Failed to persist '{}': {:#}", key, e);
            }
        }
        self.values.insert(key.to_string(), value);
    }

    /// Whether a backing file exists, regardless of what is cached in memory.
    pub fn has_persistent(&self, key: &str) -> bool {
        self.persistent.as_ref().is_some_and(|p| p.exists(key))
    }

    /// Move every key that refers to entity `old` over to `new`: the key itself,
    /// `old.*`, `*.old` and `*.old.*`. Backing files are left alone.
    /// Returns the number of keys moved.
    pub fn rename_entity(&mut self, old: &str, new: &str) -> usize {
        if old == new {
            return 0;
        }
        let moves: Vec<(String, String)> = self
            .values
            .keys()
            .filter_map(|key| renamed_key(key, old, new).map(|renamed| (key.clone(), renamed)))
            .collect();
        let mut moved = Vec::with_capacity(moves.len());
        for (from, to) in &moves {
            if let Some(value) = self.values.remove(from) {
                moved.push((to.clone(), value));
            }
        }
        for (to, value) in moved {
            self.values.insert(to, value);
        }
        debug!("[SETTINGS] Renamed '{}' to '{}' across {} keys", old, new, moves.len());
        moves.len()
    }

    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.values
            .range(prefix.to_string()..)
            .map(|(k, _)| k.as_str())
            .take_while(move |k| k.starts_with(prefix))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn snapshot(&self) -> BTreeMap<String, SettingValue> {
        self.values.clone()
    }

    /// Upsert every entry of `values`.
    pub fn merge(&mut self, values: BTreeMap<String, SettingValue>) {
        self.values.extend(values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
