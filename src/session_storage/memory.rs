use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tower_sessions::{
    session::{Id, Record},
    session_store, SessionStore,
};

const SHARD_COUNT: usize = 16;

type Shard = RwLock<HashMap<i128, Record>>;

/// In-memory session store.
///
/// Records are sharded by session id so mutations lock one shard, never the
/// whole store: invalidating one session cannot serialize requests for
/// another. Critical sections hold no awaits.
#[derive(Clone)]
pub struct MemoryStore {
    shards: Arc<Vec<Shard>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shards: Arc::new((0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect()),
        }
    }

    fn shard(&self, session_id: &Id) -> &Shard {
        &self.shards[(session_id.0 as u128 % SHARD_COUNT as u128) as usize]
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        loop {
            let mut shard = self.shard(&record.id).write().await;
            if !shard.contains_key(&record.id.0) {
                shard.insert(record.id.0, record.clone());
                return Ok(());
            }
            drop(shard);
            record.id = Id::default();
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.shard(&record.id)
            .write()
            .await
            .insert(record.id.0, record.clone());

        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let shard = self.shard(session_id).read().await;

        Ok(shard
            .get(&session_id.0)
            .filter(|record| is_active(record.expiry_date))
            .cloned())
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.shard(session_id).write().await.remove(&session_id.0);

        Ok(())
    }
}

fn is_active(expiry_date: OffsetDateTime) -> bool {
    expiry_date > OffsetDateTime::now_utc()
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn test_record() -> Record {
        Record {
            id: Id::default(),
            data: Default::default(),
            expiry_date: OffsetDateTime::now_utc() + Duration::minutes(30),
        }
    }

    #[tokio::test]
    async fn test_create_load_roundtrip() {
        let store = MemoryStore::new();
        let mut record = test_record();

        store.create(&mut record).await.unwrap();
        let loaded = store.load(&record.id).await.unwrap();

        assert_eq!(Some(record), loaded);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = MemoryStore::new();
        let mut record = test_record();
        store.create(&mut record).await.unwrap();

        record
            .data
            .insert("key".to_string(), serde_json::json!("value"));
        store.save(&record).await.unwrap();

        let loaded = store.load(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.data.get("key"), Some(&serde_json::json!("value")));
    }

    #[tokio::test]
    async fn test_expired_record_is_not_loaded() {
        let store = MemoryStore::new();
        let mut record = test_record();
        record.expiry_date = OffsetDateTime::now_utc() - Duration::seconds(10);

        store.create(&mut record).await.unwrap();

        assert_eq!(None, store.load(&record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let mut record = test_record();
        store.create(&mut record).await.unwrap();

        assert!(store.delete(&record.id).await.is_ok());
        assert_eq!(None, store.load(&record.id).await.unwrap());

        // Deleting a session that is already gone is a no-op, not an error.
        assert!(store.delete(&record.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_resolves_id_collision() {
        let store = MemoryStore::new();
        let mut record1 = test_record();
        store.create(&mut record1).await.unwrap();

        let mut record2 = test_record();
        record2.id = record1.id;
        store.create(&mut record2).await.unwrap();

        assert_ne!(record1.id, record2.id);
        assert!(store.load(&record1.id).await.unwrap().is_some());
        assert!(store.load(&record2.id).await.unwrap().is_some());
    }
}
