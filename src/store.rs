//! store.rs — file-backed dedup store: previously-seen mixes keyed by id,
//! plus an append-only log of publish events.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::source::Mix;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UpdateEvent {
    pub update_type: String,
    pub description: String,
    pub timestamp: String,
}

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening store at {}", path.display()))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        ",
        )?;

        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory store")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS mixes (
                mix_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                published TEXT NOT NULL DEFAULT '',
                thumbnail TEXT NOT NULL DEFAULT '',
                duration TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '[]',
                play_count INTEGER NOT NULL DEFAULT 0,
                favorite_count INTEGER NOT NULL DEFAULT 0,
                first_seen_at TEXT NOT NULL,
                is_featured INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS updates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                update_type TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                timestamp TEXT NOT NULL
            );
            "#,
        )
        .context("initializing store schema")?;
        Ok(())
    }

    pub fn mix_exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM mixes WHERE mix_id = ?1", params![id], |r| {
                r.get(0)
            })
            .optional()
            .context("querying mix existence")?;
        Ok(found.is_some())
    }

    /// Persist a mix. Returns false (and logs) on any failure, duplicate
    /// key included — a rejected insert is not fatal to the batch.
    pub fn add_mix(&self, mix: &Mix) -> bool {
        match self.insert_mix(mix) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = ?e, id = %mix.id, "failed to persist mix");
                false
            }
        }
    }

    fn insert_mix(&self, mix: &Mix) -> Result<()> {
        let tags = serde_json::to_string(&mix.tags).context("encoding tags")?;
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            r#"
            INSERT INTO mixes (
                mix_id, title, url, description, published,
                thumbnail, duration, tags, play_count, favorite_count,
                first_seen_at, is_featured
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                mix.id,
                mix.title,
                mix.url,
                mix.description,
                mix.published,
                mix.thumbnail,
                mix.duration,
                tags,
                mix.play_count,
                mix.favorite_count,
                Utc::now().to_rfc3339(),
                mix.is_featured,
            ],
        )
        .context("inserting mix")?;
        Ok(())
    }

    /// Most recently added mixes, insertion order descending.
    pub fn recent_mixes(&self, limit: usize) -> Result<Vec<Mix>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            r#"
            SELECT mix_id, title, url, description, published,
                   thumbnail, duration, tags, play_count, favorite_count,
                   first_seen_at, is_featured
            FROM mixes
            ORDER BY rowid DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let tags_json: String = row.get(7)?;
            Ok(Mix {
                id: row.get(0)?,
                title: row.get(1)?,
                url: row.get(2)?,
                description: row.get(3)?,
                published: row.get(4)?,
                thumbnail: row.get(5)?,
                duration: row.get(6)?,
                tags: serde_json::from_str(&tags_json).unwrap_or_default(),
                play_count: row.get(8)?,
                favorite_count: row.get(9)?,
                first_seen_at: Some(row.get(10)?),
                is_featured: row.get(11)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("reading mix row")?);
        }
        Ok(out)
    }

    /// Append an audit event; no uniqueness constraint.
    pub fn log_update(&self, update_type: &str, description: &str) -> Result<()> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO updates (update_type, description, timestamp) VALUES (?1, ?2, ?3)",
            params![update_type, description, Utc::now().to_rfc3339()],
        )
        .context("appending update event")?;
        Ok(())
    }

    /// Most recent audit events, newest first.
    pub fn recent_updates(&self, limit: usize) -> Result<Vec<UpdateEvent>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT update_type, description, timestamp FROM updates ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(UpdateEvent {
                update_type: row.get(0)?,
                description: row.get(1)?,
                timestamp: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("reading update row")?);
        }
        Ok(out)
    }
}
