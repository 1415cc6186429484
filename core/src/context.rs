//! Context manager: enforces at-most-one active author-intent context.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextType {
    External,
    Assisted,
    Review,
}

impl ContextType {
    /// Accepted aliases: `external|ext`, `assisted|ai`, `review|rev`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "external" | "ext" => Some(Self::External),
            "assisted" | "ai" => Some(Self::Assisted),
            "review" | "rev" => Some(Self::Review),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Assisted => "assisted",
            Self::Review => "review",
        }
    }

    fn from_stored(s: &str) -> Option<Self> {
        match s {
            "external" => Some(Self::External),
            "assisted" => Some(Self::Assisted),
            "review" => Some(Self::Review),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub id: u64,
    pub context_type: ContextType,
    pub start_ns: i64,
    pub end_ns: Option<i64>,
    pub note: String,
}

pub struct ContextManager {
    conn: Connection,
}

impl ContextManager {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS contexts (
                id INTEGER PRIMARY KEY,
                context_type TEXT NOT NULL,
                start_ns INTEGER NOT NULL,
                end_ns INTEGER,
                note TEXT NOT NULL
             );",
        )?;
        Ok(Self { conn })
    }

    pub fn begin(&mut self, context_type: ContextType, note: &str, now_ns: i64) -> Result<u64> {
        if self.active()?.is_some() {
            return Err(Error::Conflict("a context is already active".into()));
        }
        self.conn.execute(
            "INSERT INTO contexts (context_type, start_ns, end_ns, note) VALUES (?1, ?2, NULL, ?3)",
            params![context_type.as_str(), now_ns, note],
        )?;
        Ok(self.conn.last_insert_rowid() as u64)
    }

    pub fn end(&mut self, now_ns: i64) -> Result<()> {
        let active_id: Option<u64> = self
            .conn
            .query_row(
                "SELECT id FROM contexts WHERE end_ns IS NULL ORDER BY id DESC LIMIT 1",
                [],
                |r| r.get(0),
            )
            .optional()?;
        let Some(id) = active_id else {
            return Err(Error::Conflict("no active context".into()));
        };
        self.conn
            .execute("UPDATE contexts SET end_ns = ?1 WHERE id = ?2", params![now_ns, id])?;
        Ok(())
    }

    pub fn active(&self) -> Result<Option<Marker>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, context_type, start_ns, end_ns, note FROM contexts WHERE end_ns IS NULL ORDER BY id DESC LIMIT 1",
                [],
                |r| {
                    let type_str: String = r.get(1)?;
                    Ok((r.get::<_, u64>(0)?, type_str, r.get::<_, i64>(2)?, r.get::<_, String>(4)?))
                },
            )
            .optional()?;
        Ok(row.map(|(id, type_str, start_ns, note)| Marker {
            id,
            context_type: ContextType::from_stored(&type_str).expect("stored context_type is always valid"),
            start_ns,
            end_ns: None,
            note,
        }))
    }
}
