use crate::models::DebtorRecord;
use crate::tax_id::{format_tax_id, validate_tax_id};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Where the current table came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    Empty,
    Upload,
    Demo { seed: u64 },
}

impl TableSource {
    pub fn describe(&self) -> String {
        match self {
            TableSource::Empty => "empty".to_string(),
            TableSource::Upload => "upload".to_string(),
            TableSource::Demo { seed } => format!("demo(seed={})", seed),
        }
    }
}

/// Debtor table owned by a single session.
///
/// Rows only ever grow through [`DebtorTable::insert_validated`]; loading a
/// new dataset replaces the table as a whole. Duplicate tax IDs are allowed.
#[derive(Debug, Clone)]
pub struct DebtorTable {
    rows: Vec<DebtorRecord>,
    source: TableSource,
    loaded_at: DateTime<Utc>,
}

impl DebtorTable {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            source: TableSource::Empty,
            loaded_at: Utc::now(),
        }
    }

    pub fn from_rows(rows: Vec<DebtorRecord>, source: TableSource) -> Self {
        Self {
            rows,
            source,
            loaded_at: Utc::now(),
        }
    }

    pub fn rows(&self) -> &[DebtorRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn source(&self) -> &TableSource {
        &self.source
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Swaps in a freshly loaded dataset.
    pub fn replace(&mut self, rows: Vec<DebtorRecord>, source: TableSource) {
        *self = Self::from_rows(rows, source);
    }

    /// Appends `record` if its tax ID passes the CNPJ check.
    ///
    /// On success the tax ID is stored in display form and true is returned.
    /// On failure the table is untouched and false is returned.
    pub fn insert_validated(&mut self, mut record: DebtorRecord) -> bool {
        if !validate_tax_id(&record.tax_id) {
            return false;
        }
        if let Some(formatted) = format_tax_id(&record.tax_id) {
            record.tax_id = formatted;
        }
        self.rows.push(record);
        true
    }
}

impl Default for DebtorTable {
    fn default() -> Self {
        Self::new()
    }
}

pub type SessionHandle = Arc<RwLock<DebtorTable>>;

/// In-memory sessions keyed by UUID.
///
/// Each entry expires after the configured TTL; nothing is persisted.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<Uuid, SessionHandle>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let sessions = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .build();
        Self { sessions, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Opens a session with an empty table.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .insert(id, Arc::new(RwLock::new(DebtorTable::new())))
            .await;
        tracing::debug!("Session {} created", id);
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.get(id).await
    }

    /// Ends a session, dropping its table. Returns false if it did not exist.
    pub async fn end(&self, id: &Uuid) -> bool {
        let removed = self.sessions.remove(id).await.is_some();
        if removed {
            tracing::debug!("Session {} ended", id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rating, Sector};
    use bigdecimal::BigDecimal;

    fn record(tax_id: &str) -> DebtorRecord {
        DebtorRecord {
            legal_name: "Alfa Comércio Ltda".to_string(),
            tax_id: tax_id.to_string(),
            sector: Sector::Retail,
            initial_rating: Rating::B,
            current_rating: Rating::B,
            credit_limit: BigDecimal::from(1000),
            current_exposure: BigDecimal::from(400),
            utilization_pct: BigDecimal::from(40),
            days_past_due: 0,
            credit_score: 600,
            has_protests: 0,
            has_lawsuits: 0,
            has_bureau_restriction: 0,
        }
    }

    #[test]
    fn test_insert_validated_formats_tax_id() {
        let mut table = DebtorTable::new();
        assert!(table.insert_validated(record("11222333000181")));
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].tax_id, "11.222.333/0001-81");
    }

    #[test]
    fn test_invalid_tax_id_leaves_table_untouched() {
        let mut table = DebtorTable::from_rows(vec![record("11.222.333/0001-81")], TableSource::Upload);
        let before = table.rows().to_vec();

        assert!(!table.insert_validated(record("00.000.000/0000-00")));
        assert!(!table.insert_validated(record("123")));
        assert_eq!(table.rows(), before.as_slice());
    }

    #[test]
    fn test_duplicate_tax_ids_allowed() {
        let mut table = DebtorTable::new();
        assert!(table.insert_validated(record("11.222.333/0001-81")));
        assert!(table.insert_validated(record("11.222.333/0001-81")));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_replace_resets_source() {
        let mut table = DebtorTable::new();
        table.replace(vec![record("11.222.333/0001-81")], TableSource::Demo { seed: 7 });
        assert_eq!(table.source(), &TableSource::Demo { seed: 7 });
        assert_eq!(table.source().describe(), "demo(seed=7)");
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = SessionStore::new(Duration::from_secs(60), 100);
        let id = store.create().await;

        let handle = store.get(&id).await.expect("session should exist");
        assert!(handle.read().await.is_empty());

        handle.write().await.insert_validated(record("12345678000195"));
        let again = store.get(&id).await.unwrap();
        assert_eq!(again.read().await.len(), 1);

        assert!(store.end(&id).await);
        assert!(store.get(&id).await.is_none());
        assert!(!store.end(&id).await);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(Duration::from_secs(60), 100);
        let a = store.create().await;
        let b = store.create().await;

        store
            .get(&a)
            .await
            .unwrap()
            .write()
            .await
            .insert_validated(record("11.222.333/0001-81"));

        assert_eq!(store.get(&a).await.unwrap().read().await.len(), 1);
        assert!(store.get(&b).await.unwrap().read().await.is_empty());
    }
}
