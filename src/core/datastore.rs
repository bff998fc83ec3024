//! Vector datastore
//!
//! [`VectorStore`] is the boundary the persistence coordinator talks to.
//! [`LocalVectorStore`] is the bundled implementation: collections live in
//! memory and each one is written through to `<data_dir>/<name>.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::models::{AppError, AppResult};
use crate::utils::sanitize_filename;

/// Collection listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: usize,
    pub point_count: usize,
}

/// Point written by `upsert`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

/// Point returned by `get_points` and `query`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: u64,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<PointRecord>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn list_collections(&self) -> AppResult<Vec<CollectionInfo>>;

    async fn create_collection(&self, name: &str, dimension: usize) -> AppResult<()>;

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> AppResult<()>;

    async fn get_points(&self, collection: &str, ids: &[u64]) -> AppResult<Vec<PointRecord>>;

    async fn query(&self, query: &str) -> AppResult<QueryResponse>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPoint {
    vector: Vec<f32>,
    payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCollection {
    name: String,
    dimension: usize,
    points: BTreeMap<u64, StoredPoint>,
}

/// Parsed form of the supported query language
#[derive(Debug, Clone, PartialEq)]
pub struct SelectAll {
    pub collection: String,
    pub limit: Option<usize>,
}

fn select_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*select\s+\*\s+from\s+([A-Za-z0-9_-]+)(?:\s+limit\s+(\d+))?\s*;?\s*$")
            .expect("static regex")
    })
}

/// Only `SELECT * FROM <collection> [LIMIT n]` is understood.
pub fn parse_query(query: &str) -> AppResult<SelectAll> {
    let captures = select_regex()
        .captures(query)
        .ok_or_else(|| AppError::Datastore(format!("Unsupported query: {}", query.trim())))?;

    let collection = captures[1].to_string();
    let limit = match captures.get(2) {
        Some(m) => Some(
            m.as_str()
                .parse()
                .map_err(|e| AppError::Datastore(format!("Invalid LIMIT: {}", e)))?,
        ),
        None => None,
    };

    Ok(SelectAll { collection, limit })
}

pub struct LocalVectorStore {
    data_dir: Option<PathBuf>,
    collections: DashMap<String, StoredCollection>,
    write_lock: Mutex<()>,
}

impl LocalVectorStore {
    /// Store without disk backing
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            collections: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Open (or create) a store rooted at `data_dir`, loading every collection file.
    pub async fn open(data_dir: impl AsRef<Path>) -> AppResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&data_dir).await?;

        let collections = DashMap::new();
        let mut entries = tokio::fs::read_dir(&data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<StoredCollection>(&content) {
                Ok(collection) => {
                    debug!(
                        "Loaded collection {} ({} points)",
                        collection.name,
                        collection.points.len()
                    );
                    collections.insert(collection.name.clone(), collection);
                }
                Err(e) => warn!("Skipping unreadable collection file {:?}: {}", path, e),
            }
        }

        info!(
            "📦 Opened vector store at {:?} with {} collections",
            data_dir,
            collections.len()
        );

        Ok(Self {
            data_dir: Some(data_dir),
            collections,
            write_lock: Mutex::new(()),
        })
    }

    fn collection_path(&self, name: &str) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", sanitize_filename(name))))
    }

    /// Write one collection file. Callers hold `write_lock`.
    async fn persist(&self, collection: &StoredCollection) -> AppResult<()> {
        let Some(path) = self.collection_path(&collection.name) else {
            return Ok(());
        };

        let content = serde_json::to_string(collection)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn list_collections(&self) -> AppResult<Vec<CollectionInfo>> {
        let mut collections: Vec<CollectionInfo> = self
            .collections
            .iter()
            .map(|entry| CollectionInfo {
                name: entry.name.clone(),
                dimension: entry.dimension,
                point_count: entry.points.len(),
            })
            .collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(collections)
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> AppResult<()> {
        if name.is_empty() || sanitize_filename(name) != name {
            return Err(AppError::Datastore(format!(
                "Invalid collection name: {:?}",
                name
            )));
        }
        if dimension == 0 {
            return Err(AppError::Datastore(
                "Collection dimension must be greater than 0".to_string(),
            ));
        }
        let _write = self.write_lock.lock().await;
        if self.collections.contains_key(name) {
            return Err(AppError::Datastore(format!(
                "Collection already exists: {}",
                name
            )));
        }

        let collection = StoredCollection {
            name: name.to_string(),
            dimension,
            points: BTreeMap::new(),
        };
        // Only a collection that reached disk becomes visible
        self.persist(&collection).await?;
        self.collections.insert(name.to_string(), collection);
        info!("📁 Created collection {} (dimension {})", name, dimension);
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> AppResult<()> {
        let _write = self.write_lock.lock().await;

        let mut updated = self
            .collections
            .get(collection)
            .map(|stored| stored.clone())
            .ok_or_else(|| AppError::Datastore(format!("Unknown collection: {}", collection)))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != updated.dimension) {
            return Err(AppError::Datastore(format!(
                "Point {} has dimension {}, collection {} expects {}",
                bad.id,
                bad.vector.len(),
                collection,
                updated.dimension
            )));
        }

        for point in points {
            updated.points.insert(
                point.id,
                StoredPoint {
                    vector: point.vector,
                    payload: point.payload,
                },
            );
        }

        // A failed write leaves the stored collection as it was
        self.persist(&updated).await?;
        self.collections.insert(collection.to_string(), updated);
        Ok(())
    }

    async fn get_points(&self, collection: &str, ids: &[u64]) -> AppResult<Vec<PointRecord>> {
        let stored = self
            .collections
            .get(collection)
            .ok_or_else(|| AppError::Datastore(format!("Unknown collection: {}", collection)))?;

        Ok(ids
            .iter()
            .filter_map(|id| {
                stored.points.get(id).map(|point| PointRecord {
                    id: *id,
                    payload: point.payload.clone(),
                })
            })
            .collect())
    }

    async fn query(&self, query: &str) -> AppResult<QueryResponse> {
        let select = parse_query(query)?;
        let stored = self.collections.get(&select.collection).ok_or_else(|| {
            AppError::Datastore(format!("Unknown collection: {}", select.collection))
        })?;

        let limit = select.limit.unwrap_or(usize::MAX);
        let results = stored
            .points
            .iter()
            .take(limit)
            .map(|(id, point)| PointRecord {
                id: *id,
                payload: point.payload.clone(),
            })
            .collect();

        Ok(QueryResponse { results })
    }
}
