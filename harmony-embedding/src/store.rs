//! SQLite storage for participant texts and embeddings using rusqlite

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use harmony_core::{FieldEmbeddingSet, ParticipantId};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tracing::{debug, info, instrument};

use crate::{
    error::{EmbeddingError, Result},
    source::{EmbeddingDataSource, ParticipantDataSource},
    types::{ParticipantEmbeddingRow, ParticipantTextRow},
};

/// Participant embeddings ready to be persisted
#[derive(Debug, Clone)]
pub struct StoredEmbeddings {
    pub id: ParticipantId,
    pub name: String,
    pub embeddings: FieldEmbeddingSet,
}

/// SQLite store for participant data
///
/// Texts and embeddings live in separate tables and are read through the two
/// independent data-source traits; both share the participant id space.
pub struct EmbeddingStore {
    conn: Arc<Mutex<Connection>>,
}

impl EmbeddingStore {
    /// Create a new embedding store
    ///
    /// # Arguments
    /// * `database_path` - Path to SQLite database file
    #[instrument(skip(database_path))]
    pub fn new<P: AsRef<Path> + std::fmt::Debug>(database_path: P) -> Result<Self> {
        info!("Opening participant database: {:?}", database_path.as_ref());

        if let Some(parent) = database_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EmbeddingError::Database(format!("Failed to create data directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(database_path.as_ref())
            .map_err(|e| EmbeddingError::Database(format!("Failed to open database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.init_tables()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            EmbeddingError::Database(format!("Failed to create in-memory DB: {}", e))
        })?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.init_tables()?;
        Ok(store)
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS participants (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                image_url TEXT,
                job_title TEXT NOT NULL,
                academic TEXT NOT NULL,
                professional TEXT NOT NULL,
                personal TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS participant_embeddings (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                job_title_embedding TEXT,
                academic_embedding TEXT,
                professional_embedding TEXT,
                personal_embedding TEXT,
                profile_embedding TEXT,
                model TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        // Databases created before profile pictures were stored
        let has_image_url = conn
            .prepare("SELECT 1 FROM pragma_table_info('participants') WHERE name = 'image_url'")?
            .exists([])?;
        if !has_image_url {
            conn.execute("ALTER TABLE participants ADD COLUMN image_url TEXT", [])?;
            info!("Added image_url column to participants table");
        }

        debug!("Participant database tables initialized");
        Ok(())
    }

    /// Replace the whole dataset in one transaction
    ///
    /// Ingestion re-embeds everything, so stale rows from a previous, larger
    /// dataset must not survive.
    #[instrument(skip(self, texts, embeddings), fields(texts = texts.len(), embeddings = embeddings.len()))]
    pub fn replace_dataset(
        &self,
        texts: &[ParticipantTextRow],
        embeddings: &[StoredEmbeddings],
        model: &str,
    ) -> Result<()> {
        let now = Utc::now().timestamp();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM participants", [])?;
        tx.execute("DELETE FROM participant_embeddings", [])?;

        for row in texts {
            tx.execute(
                "INSERT INTO participants
                 (id, name, image_url, job_title, academic, professional, personal, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.id,
                    row.name,
                    row.image_url,
                    row.job_title,
                    row.academic,
                    row.professional,
                    row.personal,
                    now,
                ],
            )?;
        }

        for stored in embeddings {
            let set = &stored.embeddings;
            tx.execute(
                "INSERT INTO participant_embeddings
                 (id, name, job_title_embedding, academic_embedding, professional_embedding,
                  personal_embedding, profile_embedding, model, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    stored.id,
                    stored.name,
                    encode_vector(set.job.as_deref())?,
                    encode_vector(set.academic.as_deref())?,
                    encode_vector(set.professional.as_deref())?,
                    encode_vector(set.personal.as_deref())?,
                    encode_vector(set.global.as_deref())?,
                    model,
                    now,
                ],
            )?;
        }

        tx.commit()?;
        info!(
            "Stored {} participants and {} embedding rows",
            texts.len(),
            embeddings.len()
        );
        Ok(())
    }

    /// Load all participant text rows ordered by id
    pub fn load_all_texts(&self) -> Result<Vec<ParticipantTextRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, image_url, job_title, academic, professional, personal
             FROM participants
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ParticipantTextRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    image_url: row.get(2)?,
                    job_title: row.get(3)?,
                    academic: row.get(4)?,
                    professional: row.get(5)?,
                    personal: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Loaded {} participant text rows", rows.len());
        Ok(rows)
    }

    /// Load all raw embedding rows ordered by id
    pub fn load_all_embedding_rows(&self) -> Result<Vec<ParticipantEmbeddingRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, job_title_embedding, academic_embedding, professional_embedding,
                    personal_embedding, profile_embedding
             FROM participant_embeddings
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ParticipantEmbeddingRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    job_title_embedding: row.get(2)?,
                    academic_embedding: row.get(3)?,
                    professional_embedding: row.get(4)?,
                    personal_embedding: row.get(5)?,
                    profile_embedding: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Loaded {} participant embedding rows", rows.len());
        Ok(rows)
    }
}

#[async_trait]
impl ParticipantDataSource for EmbeddingStore {
    async fn load_texts(&self) -> Result<Vec<ParticipantTextRow>> {
        self.load_all_texts()
    }
}

#[async_trait]
impl EmbeddingDataSource for EmbeddingStore {
    async fn load_embeddings(&self) -> Result<Vec<ParticipantEmbeddingRow>> {
        self.load_all_embedding_rows()
    }
}

fn encode_vector(vector: Option<&[f32]>) -> Result<Option<String>> {
    vector
        .map(|v| serde_json::to_string(v).map_err(EmbeddingError::from))
        .transpose()
}
