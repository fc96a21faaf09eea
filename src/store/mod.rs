//! Persistent vector store using SQLite and sqlite-vec.
//!
//! A store lives in its own directory; the directory holds a single
//! database file. Whether the directory exists is what tells a first
//! synchronization run apart from an update run.
use rusqlite::{Connection, OptionalExtension, params};
use sqlite_vec::sqlite3_vec_init;
use std::path::{Path, PathBuf};
use std::sync::Once;
use thiserror::Error;
use tracing::info;

pub mod chunks;
pub mod models;
pub mod search;

/// File name of the database inside the store directory.
pub const STORE_FILE: &str = "store.sqlite3";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    page INTEGER,
    position INTEGER NOT NULL,
    content TEXT NOT NULL,
    indexed_at DATETIME NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
"#;

/// Errors raised by the vector store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("vector store not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to create store directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("embedding dimension mismatch: store holds {stored}-d vectors, got {actual}-d")]
    DimensionMismatch { stored: usize, actual: usize },

    #[error("{chunks} chunks but {embeddings} embeddings")]
    LengthMismatch { chunks: usize, embeddings: usize },

    #[error("corrupt store metadata: {0}")]
    CorruptMeta(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

static INIT_VEC: Once = Once::new();

/// Initialize the sqlite-vec extension. Safe to call multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// A SQLite connection holding chunks, their metadata and their embeddings.
pub struct VectorStore {
    pub(crate) conn: Connection,
    dimensions: usize,
    created: bool,
}

impl VectorStore {
    /// Open the store in `dir`, creating an empty one if the directory does
    /// not exist yet.
    pub fn open_or_create<P: AsRef<Path>>(dir: P, dimensions: usize) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        let created = !dir.exists();

        if created {
            info!(
                "Store directory {} not found, creating a new store",
                dir.display()
            );
            std::fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        } else {
            info!("Loading existing store from {}", dir.display());
        }

        let conn = open_connection(&dir.join(STORE_FILE))?;
        let mut store = Self::init(conn, dimensions)?;
        store.created = created;
        Ok(store)
    }

    /// Open a store that must already exist.
    pub fn open_existing<P: AsRef<Path>>(dir: P, dimensions: usize) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        let file = dir.join(STORE_FILE);
        if !dir.is_dir() || !file.is_file() {
            return Err(StoreError::NotFound(dir.to_path_buf()));
        }

        info!("Loading store from {}", dir.display());
        let conn = open_connection(&file)?;
        Self::init(conn, dimensions)
    }

    /// Open an in-memory store (useful for testing).
    pub fn open_in_memory(dimensions: usize) -> Result<Self, StoreError> {
        init_sqlite_vec();
        let conn = Connection::open_in_memory()?;
        let mut store = Self::init(conn, dimensions)?;
        store.created = true;
        Ok(store)
    }

    fn init(conn: Connection, dimensions: usize) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;

        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'dimensions'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            Some(value) => {
                let stored: usize = value
                    .parse()
                    .map_err(|_| StoreError::CorruptMeta(format!("dimensions = {value:?}")))?;
                if stored != dimensions {
                    return Err(StoreError::DimensionMismatch {
                        stored,
                        actual: dimensions,
                    });
                }
            }
            None => {
                conn.execute(
                    "INSERT INTO store_meta (key, value) VALUES ('dimensions', ?)",
                    params![dimensions.to_string()],
                )?;
            }
        }

        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS vec_chunks USING vec0(embedding FLOAT[{dimensions}]);"
        ))?;

        Ok(Self {
            conn,
            dimensions,
            created: false,
        })
    }

    /// Embedding dimensionality this store was created with.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Whether this handle created the store (first run).
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.created
    }
}

fn open_connection(path: &Path) -> Result<Connection, StoreError> {
    init_sqlite_vec();
    let conn = Connection::open(path)?;

    let vec_version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
    info!("sqlite-vec version: {}", vec_version);

    Ok(conn)
}

/// Helper to serialize a float32 vector into bytes for vec0 virtual table
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}
