//! Persistence of a population together with its training statistics.
//!
//! [`JsonFileStore`] keeps everything in one JSON document:
//!
//! ```json
//! {
//!   "savedAt": "2025-01-01T00:00:00Z",
//!   "population": [{ "config": { "inputSize": 9, "outputSize": 9 }, "nodes": [] }],
//!   "trainingStats": { "battleCount": 0, "generation": 0 }
//! }
//! ```
//!
//! Each population entry is a network document as described in
//! [`oxo_neural::format`].

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use oxo_neural::{Network, NetworkFormatError, NetworkRecord};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::stats::TrainingStats;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StorageError {
    #[display("failed to {action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[error(source)]
        error: io::Error,
    },
    #[display("malformed population file {}", path.display())]
    Json {
        path: PathBuf,
        #[error(source)]
        error: serde_json::Error,
    },
    #[display("invalid network #{index} in {}", path.display())]
    Network {
        path: PathBuf,
        index: usize,
        #[error(source)]
        error: NetworkFormatError,
    },
}

/// A population read back from storage.
#[derive(Debug, Clone)]
pub struct SavedTraining {
    pub saved_at: DateTime<Utc>,
    pub population: Vec<Network>,
    /// Absent in files that only carry networks.
    pub stats: Option<TrainingStats>,
}

/// Where the training loop keeps its population between sessions.
pub trait PopulationStore {
    fn save(&self, population: &[Network], stats: &TrainingStats) -> Result<(), StorageError>;

    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&self, rng: &mut dyn RngCore) -> Result<Option<SavedTraining>, StorageError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedDocumentRef<'a> {
    saved_at: DateTime<Utc>,
    population: Vec<NetworkRecord>,
    training_stats: &'a TrainingStats,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedDocument {
    #[serde(default = "Utc::now")]
    saved_at: DateTime<Utc>,
    population: Vec<NetworkRecord>,
    #[serde(default)]
    training_stats: Option<TrainingStats>,
}

/// Stores the population as a single JSON file.
///
/// Writes go to a sibling `*.tmp` file that is renamed over the target, so a
/// crash mid-save leaves the previous file intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, action: &'static str, error: io::Error) -> StorageError {
        StorageError::Io {
            action,
            path: self.path.clone(),
            error,
        }
    }
}

impl PopulationStore for JsonFileStore {
    fn save(&self, population: &[Network], stats: &TrainingStats) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error("create directory for", e))?;
        }

        let document = SavedDocumentRef {
            saved_at: Utc::now(),
            population: population.iter().map(Network::to_record).collect(),
            training_stats: stats,
        };
        let temp_path = self.temp_path();
        let file = File::create(&temp_path).map_err(|e| self.io_error("create", e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &document).map_err(|error| StorageError::Json {
            path: self.path.clone(),
            error,
        })?;
        writer.flush().map_err(|e| self.io_error("write", e))?;
        drop(writer);
        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error("replace", e))?;
        Ok(())
    }

    fn load(&self, rng: &mut dyn RngCore) -> Result<Option<SavedTraining>, StorageError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error("open", e)),
        };
        let document: SavedDocument =
            serde_json::from_reader(BufReader::new(file)).map_err(|error| StorageError::Json {
                path: self.path.clone(),
                error,
            })?;

        let population = document
            .population
            .iter()
            .enumerate()
            .map(|(index, record)| {
                record.to_network(rng).map_err(|error| StorageError::Network {
                    path: self.path.clone(),
                    index,
                    error,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(SavedTraining {
            saved_at: document.saved_at,
            population,
            stats: document.training_stats,
        }))
    }
}
