//! # Path store
//!
//! Generated paths saved as JSON files keyed by name, so a routine can reuse a path instead of
//! generating it again on every run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

// Internal
use super::{Path, PathError, PathParams, Waypoint};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A directory of saved paths.
#[derive(Debug, Clone)]
pub struct PathStore {
    dir: PathBuf,
}

/// Contents of a saved path file, the path plus what it was generated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPath {
    pub waypoints: Vec<Waypoint>,
    pub params: PathParams,
    pub path: Path,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathStoreError {
    #[error("Cannot access path file {0:?}: {1}")]
    IoError(PathBuf, std::io::Error),

    #[error("Cannot (de)serialise path file {0:?}: {1}")]
    JsonError(PathBuf, serde_json::Error),

    #[error("Cannot generate the path: {0}")]
    PathError(#[from] PathError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathStore {
    /// Use `dir` as the store, it is created on the first save.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Location of the file for the named path.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Whether a path with this name has been saved.
    pub fn contains(&self, name: &str) -> bool {
        self.file_path(name).is_file()
    }

    /// Save a path under `name`, replacing any existing one.
    pub fn save(&self, name: &str, stored: &StoredPath) -> Result<PathBuf, PathStoreError> {
        let file_path = self.file_path(name);

        fs::create_dir_all(&self.dir)
            .map_err(|e| PathStoreError::IoError(self.dir.clone(), e))?;

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&file_path)
            .map_err(|e| PathStoreError::IoError(file_path.clone(), e))?;

        serde_json::to_writer(file, stored)
            .map_err(|e| PathStoreError::JsonError(file_path.clone(), e))?;

        debug!("Saved path \"{}\" to {:?}", name, file_path);

        Ok(file_path)
    }

    /// Load the path saved under `name`.
    pub fn load(&self, name: &str) -> Result<StoredPath, PathStoreError> {
        let file_path = self.file_path(name);

        let contents = fs::read_to_string(&file_path)
            .map_err(|e| PathStoreError::IoError(file_path.clone(), e))?;

        serde_json::from_str(&contents).map_err(|e| PathStoreError::JsonError(file_path, e))
    }

    /// Load the named path if it was generated from the same waypoints and parameters, otherwise
    /// generate it and save it under that name.
    pub fn generate_or_load(
        &self,
        name: &str,
        waypoints: &[Waypoint],
        params: &PathParams,
    ) -> Result<Path, PathStoreError> {
        if self.contains(name) {
            let stored = self.load(name)?;
            if stored.waypoints.as_slice() == waypoints && stored.params == *params {
                debug!("Loaded path \"{}\" from the store", name);
                return Ok(stored.path);
            }
            info!("Stored path \"{}\" is out of date, regenerating", name);
        }

        let path = Path::generate(waypoints, params)?;

        self.save(
            name,
            &StoredPath {
                waypoints: waypoints.to_vec(),
                params: *params,
                path: path.clone(),
            },
        )?;

        Ok(path)
    }
}
