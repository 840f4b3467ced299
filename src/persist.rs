use crate::color::{Color, ColorGradient};
use crate::model::{GraphType, Property, SettingValue};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const FILE_EXTENSION: &str = "json";
const SCHEMA_MARKER: &str = "_schema_version";
pub const SCHEMA_VERSION: u32 = 2;

/// Preference files, one per key, under a fixed directory.
#[derive(Clone, Debug)]
pub struct PersistentStore {
    dir: PathBuf,
}

/// Keys become file names: anything outside `[A-Za-z0-9.-]` is percent-encoded.
pub fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

pub fn decode_key(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

impl PersistentStore {
    /// The directory is created lazily on the first save.
    pub fn open(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{FILE_EXTENSION}", encode_key(key)))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    /// Load one value. A missing file is `Ok(None)`; unreadable or malformed
    /// files are errors.
    pub fn load(&self, key: &str) -> Result<Option<SettingValue>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read preference file {:?}", path))?;
        let value = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse preference file {:?}", path))?;
        Ok(Some(value))
    }

    /// Write one value, replacing the previous file in a single rename.
    pub fn save(&self, key: &str, value: &SettingValue) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create preference directory {:?}", self.dir))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {:?}", path))?;
        debug!("[PERSIST] Saved '{}' to {:?}", key, path);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
        Ok(true)
    }

    /// All keys that currently have a preference file.
    pub fn keys(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {:?}", self.dir))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match decode_key(stem) {
                Some(key) => keys.push(key),
                None => warn!("[PERSIST] Skipping undecodable preference file {:?}", path),
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Delete every preference file. Returns the removed keys.
    pub fn remove_all(&self) -> Result<Vec<String>> {
        let keys = self.keys()?;
        for key in &keys {
            self.remove(key)?;
        }
        info!("[PERSIST] Removed {} preference files from {:?}", keys.len(), self.dir);
        Ok(keys)
    }

    fn schema_version(&self) -> u32 {
        fs::read_to_string(self.dir.join(SCHEMA_MARKER))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1)
    }

    /// Check if the legacy migration still has to run
    pub fn needs_migration(&self) -> bool {
        self.dir.is_dir() && self.schema_version() < SCHEMA_VERSION
    }

    fn mark_migration_complete(&self) -> Result<()> {
        fs::write(self.dir.join(SCHEMA_MARKER), SCHEMA_VERSION.to_string())
            .context("Failed to write schema marker")?;
        Ok(())
    }

    /// Rewrite files saved by older versions into the current format:
    /// gradients stored as a bare array of colors, and graph types stored as
    /// integer codes. Runs once per directory. Returns the number of files
    /// rewritten.
    pub fn migrate(&self) -> Result<usize> {
        if !self.needs_migration() {
            return Ok(0);
        }
        let mut migrated = 0;
        for key in self.keys()? {
            let path = self.path_for(&key);
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            let Some(value) = upgrade_legacy(&key, &json) else {
                continue;
            };
            self.save(&key, &value)?;
            migrated += 1;
        }
        self.mark_migration_complete()?;
        info!("[PERSIST] Migrated {} legacy preference files in {:?}", migrated, self.dir);
        Ok(migrated)
    }
}

/// The current-format value for a legacy file, or `None` if it needs no change.
fn upgrade_legacy(key: &str, json: &str) -> Option<SettingValue> {
    if let Ok(colors) = serde_json::from_str::<Vec<Color>>(json) {
        return ColorGradient::from_legacy_colors(&colors).map(SettingValue::Gradient);
    }
    if key.ends_with(&format!(".{}", Property::GraphType.as_str())) {
        if let Ok(SettingValue::Int(code)) = serde_json::from_str::<SettingValue>(json) {
            match GraphType::from_legacy_code(code) {
                Some(graph) => return Some(SettingValue::Text(graph.as_str().to_string())),
                None => warn!("[PERSIST] Unknown legacy graph type {} for '{}'", code, key),
            }
        }
    }
    None
}
