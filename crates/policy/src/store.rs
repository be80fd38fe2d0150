// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed store for custom policy profiles.
//!
//! Custom profiles persist as JSON files under a directory; an in-memory
//! cache of compiled profiles is invalidated on writes. Presets resolve
//! without touching the store and are protected from mutation.

use crate::evaluate::CompiledProfile;
use crate::presets;
use crate::profile::PolicyProfile;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Profile store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("profile '{0}' not found")]
    NotFound(String),
    #[error("'{0}' is a built-in preset and cannot be modified")]
    PresetMutation(String),
    #[error("invalid profile name '{0}'")]
    InvalidName(String),
    #[error("io error for profile '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed profile file '{name}': {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Directory-backed profile store with a compiled-profile cache.
pub struct ProfileStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Arc<CompiledProfile>>>,
}

impl ProfileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            name: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir, cache: Mutex::new(HashMap::new()) })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        // Names become file names; reject separators and empties.
        if name.is_empty() || name.contains(['/', '\\', '\0']) || name.starts_with('.') {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }

    /// Resolve a profile: presets first, then custom profiles.
    ///
    /// Returns the compiled form; patterns compile once per cache fill.
    pub fn get(&self, name: &str) -> Result<Arc<CompiledProfile>, StoreError> {
        if let Some(cached) = self.cache.lock().get(name) {
            return Ok(Arc::clone(cached));
        }
        let profile = if let Some(preset) = presets::preset(name) {
            preset.clone()
        } else {
            let path = self.path_for(name)?;
            let text = std::fs::read_to_string(&path).map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    StoreError::NotFound(name.to_string())
                } else {
                    StoreError::Io { name: name.to_string(), source }
                }
            })?;
            serde_json::from_str(&text)
                .map_err(|source| StoreError::Malformed { name: name.to_string(), source })?
        };
        let compiled = Arc::new(CompiledProfile::new(profile));
        self.cache.lock().insert(name.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Persist a custom profile, replacing any previous version.
    ///
    /// Writing invalidates the cache entry. Preset names are protected.
    pub fn put(&self, profile: &PolicyProfile) -> Result<(), StoreError> {
        if presets::is_preset(&profile.name) {
            return Err(StoreError::PresetMutation(profile.name.clone()));
        }
        let path = self.path_for(&profile.name)?;
        let json = serde_json::to_string_pretty(profile).map_err(|source| {
            StoreError::Malformed { name: profile.name.clone(), source }
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .and_then(|()| std::fs::rename(&tmp, &path))
            .map_err(|source| StoreError::Io { name: profile.name.clone(), source })?;
        self.cache.lock().remove(&profile.name);
        tracing::debug!(profile = %profile.name, "stored custom policy profile");
        Ok(())
    }

    /// Delete a custom profile. Idempotent: deleting an absent profile
    /// returns `Ok(false)`. Presets are protected.
    pub fn delete(&self, name: &str) -> Result<bool, StoreError> {
        if presets::is_preset(name) {
            return Err(StoreError::PresetMutation(name.to_string()));
        }
        let path = self.path_for(name)?;
        self.cache.lock().remove(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { name: name.to_string(), source }),
        }
    }

    /// Names of all profiles: presets followed by sorted custom profiles.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> =
            presets::preset_names().into_iter().map(String::from).collect();
        let mut custom = Vec::new();
        let entries = std::fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            name: self.dir.display().to_string(),
            source,
        })?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".json") {
                if !presets::is_preset(stem) {
                    custom.push(stem.to_string());
                }
            }
        }
        custom.sort();
        names.extend(custom);
        Ok(names)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
