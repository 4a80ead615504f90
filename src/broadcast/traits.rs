use async_trait::async_trait;

use crate::broadcast::types::{ChatCategory, Destination, SendMode};

/// Read-only lookup of known broadcast destinations.
#[async_trait]
pub trait DestinationCatalog: Send + Sync {
    async fn list_active(&self) -> anyhow::Result<Vec<Destination>>;
    async fn list_by_category(&self, category: ChatCategory) -> anyhow::Result<Vec<Destination>>;
}

/// Stored operator credentials, keyed by Telegram user id.
#[async_trait]
pub trait PinVault: Send + Sync {
    async fn verify_pin(&self, admin_id: i64, candidate: &str) -> anyhow::Result<bool>;
}

/// Aggregate outcome of one completed broadcast, handed to the recorder.
#[derive(Clone, Debug)]
pub struct BroadcastRecord {
    pub admin_id: i64,
    pub total: i64,
    pub success: i64,
    pub failed: i64,
    pub mode: SendMode,
    pub message_type: &'static str,
    pub message_text: Option<String>,
}

/// Persists per-broadcast statistics. The engine only writes; aggregation
/// and history queries belong to the store.
#[async_trait]
pub trait StatsRecorder: Send + Sync {
    async fn record(&self, record: &BroadcastRecord) -> anyhow::Result<()>;
}
