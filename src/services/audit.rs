//! Best-effort audit trail for lifecycle operations.
//!
//! Entries are recorded after the operation they describe has committed. A
//! sink never reports failure to its caller.

use crate::{db::DbPool, models::audit_log};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Who did what to which record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(actor_id: Uuid, action: &str, entity_type: &str, entity_id: Option<Uuid>) -> Self {
        Self {
            actor_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}

/// Persists entries into `audit_logs`.
pub struct DatabaseAuditSink {
    db_pool: Arc<DbPool>,
}

impl DatabaseAuditSink {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AuditSink for DatabaseAuditSink {
    async fn record(&self, entry: AuditEntry) {
        let row = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            actor_id: Set(entry.actor_id),
            action: Set(entry.action.clone()),
            entity_type: Set(entry.entity_type.clone()),
            entity_id: Set(entry.entity_id),
            details: Set(entry.details.clone()),
            created_at: Set(entry.timestamp),
        };

        if let Err(e) = row.insert(self.db_pool.as_ref()).await {
            warn!(
                actor_id = %entry.actor_id,
                action = %entry.action,
                error = %e,
                "Failed to persist audit entry"
            );
        }
    }
}

/// Writes entries to the log only.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) {
        info!(
            actor_id = %entry.actor_id,
            action = %entry.action,
            entity_type = %entry.entity_type,
            entity_id = ?entry.entity_id,
            details = ?entry.details,
            timestamp = %entry.timestamp.to_rfc3339(),
            "audit_log"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracing_sink_accepts_entries() {
        let entry = AuditEntry::new(Uuid::new_v4(), "tender.create", "tender", None)
            .with_details(serde_json::json!({"tender_number": "T-1"}));
        assert_eq!(entry.details.as_ref().unwrap()["tender_number"], "T-1");
        TracingAuditSink.record(entry).await;
    }
}
