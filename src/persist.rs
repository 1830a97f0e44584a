//! # Snapshot persistence
//!
//! Reviews and the submission ledger are mirrored to two JSON documents,
//! `reviews.json` and `ips.json`. Every accepted submission rewrites both in
//! full; there is no append log.
//!
//! ## Writes
//!
//! - Writes never block the HTTP response. The store hands each snapshot to a
//!   single background task over an unbounded channel.
//! - One task means snapshots land on disk in the order they were taken, so an
//!   older snapshot can never overwrite a newer one.
//! - Each file is written to a `.tmp` sibling and renamed into place.
//! - A failed write is logged and dropped. The accepted review stays in memory
//!   and is lost on restart unless a later snapshot succeeds.
//!
//! ## Loads
//!
//! A missing, unreadable or non-array document loads as empty. Array elements
//! that do not decode are skipped.
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::{fs, sync::mpsc, task::JoinHandle};
use tracing::{error, info, warn};

use crate::{error::ReviewError, models::review::StoredReview};

/// Full copy of the store state at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub reviews: Vec<StoredReview>,
    pub ledger: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SnapshotFiles {
    pub reviews_path: PathBuf,
    pub ledger_path: PathBuf,
}

impl SnapshotFiles {
    pub fn new(reviews_path: impl Into<PathBuf>, ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            reviews_path: reviews_path.into(),
            ledger_path: ledger_path.into(),
        }
    }

    /// Reads both documents. Never fails; corrupt state loads as empty.
    pub async fn load(&self) -> Snapshot {
        let reviews = load_array(&self.reviews_path).await;
        let ledger = load_array(&self.ledger_path).await;
        info!(
            "Loaded {} reviews and {} ledger entries",
            reviews.len(),
            ledger.len()
        );
        Snapshot { reviews, ledger }
    }

    /// Overwrites both documents with `snapshot`, reviews first.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), ReviewError> {
        write_json(&self.reviews_path, &snapshot.reviews).await?;
        write_json(&self.ledger_path, &snapshot.ledger).await?;
        Ok(())
    }
}

async fn load_array<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    match read_array(path).await {
        Ok(items) => items,
        Err(ReviewError::LoadCorruption { path, reason }) if reason == NOT_FOUND => {
            info!("No stored state at {path}, starting empty");
            Vec::new()
        }
        Err(err) => {
            warn!("{err}, starting empty");
            Vec::new()
        }
    }
}

const NOT_FOUND: &str = "file not found";

async fn read_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ReviewError> {
    let corruption = |reason: String| ReviewError::LoadCorruption {
        path: path.display().to_string(),
        reason,
    };

    let raw = fs::read_to_string(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => corruption(NOT_FOUND.to_string()),
        _ => corruption(e.to_string()),
    })?;

    let elements = match serde_json::from_str::<Value>(&raw).map_err(|e| corruption(e.to_string()))? {
        Value::Array(elements) => elements,
        _ => return Err(corruption("expected a JSON array".to_string())),
    };

    let total = elements.len();
    let items: Vec<T> = elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| match serde_json::from_value(element) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping entry {index} in {}: {e}", path.display());
                None
            }
        })
        .collect();

    if items.len() != total {
        warn!(
            "Kept {} of {} entries from {}",
            items.len(),
            total,
            path.display()
        );
    }

    Ok(items)
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ReviewError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let body = serde_json::to_vec_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, body).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Handle to the background snapshot writer.
#[derive(Debug, Clone)]
pub struct Persister {
    sender: mpsc::UnboundedSender<Snapshot>,
}

impl Persister {
    /// Spawns the writer task on the current tokio runtime.
    pub fn spawn(files: SnapshotFiles) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Snapshot>();

        let handle = tokio::spawn(async move {
            while let Some(snapshot) = receiver.recv().await {
                match files.save(&snapshot).await {
                    Ok(()) => info!(
                        "Persisted {} reviews to {}",
                        snapshot.reviews.len(),
                        files.reviews_path.display()
                    ),
                    Err(err) => error!("Snapshot write failed: {err}"),
                }
            }
            info!("Snapshot writer stopped");
        });

        (Self { sender }, handle)
    }

    /// Queues `snapshot` for writing. Fails only when the writer task is gone.
    pub fn enqueue(&self, snapshot: Snapshot) -> Result<(), ReviewError> {
        self.sender
            .send(snapshot)
            .map_err(|_| ReviewError::PersistenceFailure("snapshot writer is not running".into()))
    }
}
