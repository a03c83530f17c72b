//! Local chat transcript cache.
//!
//! One SQLite table of messages keyed by profile id. This is the only thing
//! the crate persists; losing the file only loses chat history.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(anyhow!("unknown transcript role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub profile_id: String,
    pub role: Role,
    pub content: String,
    pub ts: i64,
}

pub struct TranscriptStore {
    conn: Connection,
}

impl TranscriptStore {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self { conn: Connection::open(path)? })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS transcript (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                ts INTEGER NOT NULL,
                context_hash INTEGER
            );
            CREATE INDEX IF NOT EXISTS transcript_profile ON transcript (profile_id, id);
            COMMIT;",
        )?;
        // files written before context_hash existed
        let has_context: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('transcript') WHERE name = 'context_hash'",
            [],
            |row| row.get(0),
        )?;
        if has_context == 0 {
            self.conn
                .execute_batch("ALTER TABLE transcript ADD COLUMN context_hash INTEGER;")?;
        }
        Ok(())
    }

    pub fn append(&mut self, profile_id: &str, role: Role, content: &str, ts: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO transcript (profile_id, role, content, ts) VALUES (?1, ?2, ?3, ?4)",
            params![profile_id, role.as_str(), content, ts],
        )?;
        Ok(())
    }

    /// Store a question and its answer atomically. `context_hash` fingerprints
    /// the portfolio the answer was given for.
    pub fn append_exchange(
        &mut self,
        profile_id: &str,
        question: &str,
        answer: &str,
        context_hash: u64,
        ts: i64,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (role, content) in [(Role::User, question), (Role::Assistant, answer)] {
            tx.execute(
                "INSERT INTO transcript (profile_id, role, content, ts, context_hash) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![profile_id, role.as_str(), content, ts, context_hash as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// The newest `limit` messages for a profile, oldest first.
    pub fn recent(&self, profile_id: &str, limit: usize) -> Result<Vec<TranscriptEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT profile_id, role, content, ts FROM transcript
             WHERE profile_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![profile_id, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (profile_id, role, content, ts) = row?;
            entries.push(TranscriptEntry {
                profile_id,
                role: role.parse()?,
                content,
                ts,
            });
        }
        entries.reverse();
        Ok(entries)
    }

    /// Find a previous answer to exactly this question, given for the same
    /// portfolio context.
    pub fn cached_answer(&self, profile_id: &str, question: &str, context_hash: u64) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.content FROM transcript q
             JOIN transcript a ON a.id = q.id + 1 AND a.profile_id = q.profile_id AND a.role = 'assistant'
             WHERE q.profile_id = ?1 AND q.role = 'user' AND q.content = ?2 AND q.context_hash = ?3
             ORDER BY q.id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query(params![profile_id, question, context_hash as i64])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Delete a profile's transcript, returning the number of messages removed.
    pub fn clear(&mut self, profile_id: &str) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM transcript WHERE profile_id = ?1", params![profile_id])?)
    }
}
