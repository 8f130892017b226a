//! Test doubles shared by the decorator tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use arepo_core::cache::{Cache, CacheError, Result as CacheResult};
use arepo_core::storage::{
    Filter, InsertManyResult, InsertOneResult, Repository, RepositoryError, Result, Update,
};
use arepo_core::ObjectId;

use crate::repository::StoreRepository;
use crate::storage::InMemoryStore;

pub const TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<ObjectId>,
    pub name: String,
}

pub fn person(name: &str) -> Person {
    Person {
        id: None,
        name: name.to_string(),
    }
}

// Repository that counts reads, can be switched to fail them and can stall
// writes forever.
pub struct CountingRepository {
    inner: StoreRepository<InMemoryStore, Person>,
    failing: AtomicBool,
    stalled: AtomicBool,
    pub get_calls: AtomicUsize,
    pub find_one_calls: AtomicUsize,
    pub find_calls: AtomicUsize,
}

impl CountingRepository {
    pub fn new() -> Self {
        Self {
            inner: StoreRepository::new(Arc::new(InMemoryStore::new())),
            failing: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
            get_calls: AtomicUsize::new(0),
            find_one_calls: AtomicUsize::new(0),
            find_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_reads(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn stall_writes(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    async fn wait_unless_stalled(&self) {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::ConnectionFailed(
                "store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository<Person> for CountingRepository {
    async fn get_by_id(&self, id: ObjectId) -> Result<Person> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.get_by_id(id).await
    }

    async fn find_one(&self, filter: &Filter) -> Result<Person> {
        self.find_one_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.find_one(filter).await
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Person>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.find(filter).await
    }

    async fn insert_one(&self, document: &Person) -> Result<InsertOneResult> {
        self.inner.insert_one(document).await
    }

    async fn insert_many(&self, documents: &[Person]) -> Result<InsertManyResult> {
        self.inner.insert_many(documents).await
    }

    async fn update_one_by_id(&self, id: ObjectId, update: &Update) -> Result<()> {
        self.wait_unless_stalled().await;
        self.inner.update_one_by_id(id, update).await
    }

    async fn delete_one_by_id(&self, id: ObjectId) -> Result<()> {
        self.wait_unless_stalled().await;
        self.inner.delete_one_by_id(id).await
    }
}

// Mock cache that records TTLs and can fail, panic or lag on demand.
pub struct MockCache {
    store: RwLock<HashMap<String, (Vec<u8>, Option<Duration>)>>,
    fail_gets: AtomicBool,
    fail_writes: AtomicBool,
    panic_writes: AtomicBool,
    write_delay: std::sync::Mutex<Option<Duration>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            fail_gets: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            panic_writes: AtomicBool::new(false),
            write_delay: std::sync::Mutex::new(None),
        }
    }

    pub fn fail_gets(&self) {
        self.fail_gets.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn panic_writes(&self, enabled: bool) {
        self.panic_writes.store(enabled, Ordering::SeqCst);
    }

    /// Delays every `set` and `delete` by `delay`.
    pub fn delay_writes(&self, delay: Duration) {
        if let Ok(mut slot) = self.write_delay.lock() {
            *slot = Some(delay);
        }
    }

    async fn before_write(&self, op: &str) -> CacheResult<()> {
        let delay = self.write_delay.lock().ok().and_then(|slot| *slot);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_writes.load(Ordering::SeqCst) {
            panic!("cache {op} exploded");
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::OperationFailed(format!("{op} rejected")));
        }
        Ok(())
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.store.read().await.contains_key(key)
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.store.read().await.keys().cloned().collect()
    }

    /// TTL of a stored key; `None` when the key is absent.
    pub async fn ttl_of(&self, key: &str) -> Option<Option<Duration>> {
        self.store.read().await.get(key).map(|(_, ttl)| *ttl)
    }
}

#[async_trait]
impl Cache for MockCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(CacheError::ConnectionFailed("cache unavailable".to_string()));
        }
        Ok(self
            .store
            .read()
            .await
            .get(key)
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> CacheResult<()> {
        self.before_write("set").await?;
        self.store
            .write()
            .await
            .insert(key.to_string(), (value.to_vec(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.before_write("delete").await?;
        self.store.write().await.remove(key);
        Ok(())
    }
}

/// Waits until background cache maintenance has stored (or removed) `key`.
pub async fn wait_for_key(cache: &MockCache, key: &str, present: bool) {
    for _ in 0..200 {
        if cache.contains(key).await == present {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {key} (present = {present})");
}
