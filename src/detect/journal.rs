//! SQLite journal of non-healthy classifications.

use crate::detect::{AnomalyRecord, Issue, Severity};
use crate::storage::Pool;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use serde::Serialize;
use uuid::Uuid;

/// A journaled anomaly with its storage id.
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: AnomalyRecord,
}

#[derive(Clone)]
pub struct AnomalyJournal {
    pool: Pool,
}

impl AnomalyJournal {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Persist `record` if it is an anomaly. Healthy records are skipped and
    /// yield `None`.
    pub fn record(&self, record: &AnomalyRecord) -> Result<Option<Uuid>> {
        if !record.is_anomaly() {
            return Ok(None);
        }

        let conn = self.pool.get()?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO anomalies (id, device_id, severity, confidence, issue, recommendation, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                record.device_id,
                record.severity.as_str(),
                record.confidence,
                record.issue.map(|i| i.label()),
                record.recommendation,
                record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )
        .context("Failed to insert anomaly")?;

        Ok(Some(id))
    }

    /// Most recent anomalies first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, device_id, severity, confidence, issue, recommendation, created_at
             FROM anomalies ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u8>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut entries = Vec::new();
        for r in rows {
            let (id, device_id, severity, confidence, issue, recommendation, created_at) = r?;
            entries.push(JournalEntry {
                id: Uuid::parse_str(&id).with_context(|| format!("bad anomaly id '{}'", id))?,
                record: AnomalyRecord {
                    device_id,
                    severity: severity.parse::<Severity>()?,
                    confidence,
                    issue: issue.as_deref().and_then(Issue::from_label),
                    recommendation,
                    timestamp: DateTime::parse_from_rfc3339(&created_at)
                        .with_context(|| format!("bad timestamp '{}'", created_at))?
                        .with_timezone(&Utc),
                },
            });
        }
        Ok(entries)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.pool.get()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM anomalies", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}
