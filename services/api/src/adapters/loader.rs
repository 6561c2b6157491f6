//! services/api/src/adapters/loader.rs
//!
//! Bulk loads the data directory into the in-memory store before the server
//! starts. Files are processed in name order; the entity type is picked by a
//! `users_`, `locations_` or `visits_` fragment in the file name, and each
//! file holds one JSON array under the matching key. An `options.txt` file
//! carries the reference timestamp used by age filters on its first line.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, info};

use super::memory::{MemoryAdapter, StoreCounts};
use crate::web::protocol::{LocationRecord, UserRecord, VisitRecord};

const OPTIONS_FILE: &str = "options.txt";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Cannot read data directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed data file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid reference timestamp in {}: {value:?}", .path.display())]
    Options { path: PathBuf, value: String },
}

/// What a bulk load put into the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub files: usize,
    pub counts: StoreCounts,
    /// Timestamp from `options.txt`, when the directory has one.
    pub reference_time: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataKind {
    Users,
    Locations,
    Visits,
}

impl DataKind {
    fn from_file_name(name: &str) -> Option<Self> {
        if name.contains("users_") {
            Some(DataKind::Users)
        } else if name.contains("locations_") {
            Some(DataKind::Locations)
        } else if name.contains("visits_") {
            Some(DataKind::Visits)
        } else {
            None
        }
    }
}

#[derive(Deserialize)]
struct UsersFile {
    #[serde(alias = "Users")]
    users: Vec<UserRecord>,
}

#[derive(Deserialize)]
struct LocationsFile {
    #[serde(alias = "Locations")]
    locations: Vec<LocationRecord>,
}

#[derive(Deserialize)]
struct VisitsFile {
    #[serde(alias = "Visits")]
    visits: Vec<VisitRecord>,
}

/// Loads every data file in `dir` into `store`.
pub async fn load_data_dir(store: &MemoryAdapter, dir: &Path) -> Result<LoadSummary, LoadError> {
    let started = Instant::now();
    let directory_error = |source| LoadError::Directory {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(directory_error)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(directory_error)? {
        let is_file = entry
            .file_type()
            .await
            .map_err(directory_error)?
            .is_file();
        if is_file {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut summary = LoadSummary::default();
    for path in paths {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if name == OPTIONS_FILE {
            summary.reference_time = Some(read_reference_time(&path).await?);
            continue;
        }
        let Some(kind) = DataKind::from_file_name(name) else {
            debug!("Skipping unrecognised file {}", path.display());
            continue;
        };

        let raw = tokio::fs::read(&path).await.map_err(|source| LoadError::Read {
            path: path.clone(),
            source,
        })?;
        let loaded = load_file(store, kind, &raw)
            .await
            .map_err(|source| LoadError::Parse {
                path: path.clone(),
                source,
            })?;
        debug!("Loaded {} records from {}", loaded, path.display());
        summary.files += 1;
    }

    summary.counts = store.counts().await;
    info!(
        "Loaded {} users, {} locations and {} visits from {} files in {:?}",
        summary.counts.users,
        summary.counts.locations,
        summary.counts.visits,
        summary.files,
        started.elapsed()
    );
    Ok(summary)
}

async fn load_file(
    store: &MemoryAdapter,
    kind: DataKind,
    raw: &[u8],
) -> Result<usize, serde_json::Error> {
    let loaded = match kind {
        DataKind::Users => {
            let file: UsersFile = serde_json::from_slice(raw)?;
            let count = file.users.len();
            for record in file.users {
                store.upsert_user(record.to_domain()).await;
            }
            count
        }
        DataKind::Locations => {
            let file: LocationsFile = serde_json::from_slice(raw)?;
            let count = file.locations.len();
            for record in file.locations {
                store.upsert_location(record.to_domain()).await;
            }
            count
        }
        DataKind::Visits => {
            let file: VisitsFile = serde_json::from_slice(raw)?;
            let count = file.visits.len();
            for record in file.visits {
                store.upsert_visit(record.to_domain()).await;
            }
            count
        }
    };
    Ok(loaded)
}

async fn read_reference_time(path: &Path) -> Result<i64, LoadError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let first_line = text.lines().next().unwrap_or_default().trim();
    first_line.parse::<i64>().map_err(|_| LoadError::Options {
        path: path.to_path_buf(),
        value: first_line.to_string(),
    })
}
