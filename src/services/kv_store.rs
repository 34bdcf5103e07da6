//! Key-value persistence.
//!
//! Everything the bot keeps is a small JSON string, hash field or set member,
//! so the store surface is a thin slice of Redis. `RedisStore` is used in
//! production; `MemoryStore` backs `REDIS_URL=memory://` and the tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

pub type SharedStore = Arc<dyn KvStore>;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn ping(&self) -> Result<(), String>;

    async fn get(&self, key: &str) -> Result<Option<String>, String>;
    async fn set(&self, key: &str, value: &str) -> Result<(), String>;
    async fn del(&self, key: &str) -> Result<(), String>;
    async fn exists(&self, key: &str) -> Result<bool, String>;

    /// `SET key value NX EX ttl`. Returns true when this call created the key.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, String>;

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, String>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), String>;
    async fn hdel(&self, key: &str, field: &str) -> Result<(), String>;
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, String>;

    async fn sadd(&self, key: &str, member: &str) -> Result<(), String>;
    async fn srem(&self, key: &str, member: &str) -> Result<(), String>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>, String>;
    async fn sismember(&self, key: &str, member: &str) -> Result<bool, String>;
}

/// Opens the store named by `REDIS_URL`.
pub async fn connect(url: &str) -> Result<SharedStore, String> {
    if url.starts_with("memory://") {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = RedisStore::connect(url).await?;
    Ok(Arc::new(store))
}

// ---------------- Redis ----------------

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, String> {
        let client = redis::Client::open(url).map_err(|e| e.to_string())?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn ping(&self) -> Result<(), String> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(|e| e.to_string())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await.map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), String> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await.map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, String> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(|e| e.to_string())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, String> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| e.to_string())?;
        Ok(reply.is_some())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, String> {
        let mut conn = self.conn.clone();
        conn.hget(key, field).await.map_err(|e| e.to_string())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), String> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.hset(key, field, value).await.map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<(), String> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.hdel(key, field).await.map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, String> {
        let mut conn = self.conn.clone();
        conn.hgetall(key).await.map_err(|e| e.to_string())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), String> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.sadd(key, member).await.map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), String> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.srem(key, member).await.map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, String> {
        let mut conn = self.conn.clone();
        conn.smembers(key).await.map_err(|e| e.to_string())
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, String> {
        let mut conn = self.conn.clone();
        conn.sismember(key, member).await.map_err(|e| e.to_string())
    }
}

// ---------------- In-memory ----------------

enum Entry {
    Str {
        value: String,
        expires_at: Option<Instant>,
    },
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut HashMap<String, Entry>) -> R) -> Result<R, String> {
        let mut map = self.inner.lock().map_err(|_| "memory store poisoned".to_string())?;
        let now = Instant::now();
        map.retain(|_, e| match e {
            Entry::Str {
                expires_at: Some(at),
                ..
            } => *at > now,
            _ => true,
        });
        Ok(f(&mut map))
    }

    /// Evicts every key whose TTL ends within `ttl` from now, as if that
    /// much time had already passed.
    pub fn expire_within(&self, ttl: Duration) -> Result<(), String> {
        let cutoff = Instant::now() + ttl;
        self.with(|map| {
            map.retain(|_, e| match e {
                Entry::Str {
                    expires_at: Some(at),
                    ..
                } => *at > cutoff,
                _ => true,
            })
        })
    }
}

fn wrong_type(key: &str) -> String {
    format!("WRONGTYPE operation against key {key}")
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn ping(&self) -> Result<(), String> {
        self.with(|_| ())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        self.with(|map| match map.get(key) {
            None => Ok(None),
            Some(Entry::Str { value, .. }) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type(key)),
        })?
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.with(|map| {
            map.insert(
                key.to_string(),
                Entry::Str {
                    value: value.to_string(),
                    expires_at: None,
                },
            );
        })
    }

    async fn del(&self, key: &str) -> Result<(), String> {
        self.with(|map| {
            map.remove(key);
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, String> {
        self.with(|map| map.contains_key(key))
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, String> {
        self.with(|map| {
            if map.contains_key(key) {
                return false;
            }
            map.insert(
                key.to_string(),
                Entry::Str {
                    value: value.to_string(),
                    expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs.max(1))),
                },
            );
            true
        })
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, String> {
        self.with(|map| match map.get(key) {
            None => Ok(None),
            Some(Entry::Hash(h)) => Ok(h.get(field).cloned()),
            Some(_) => Err(wrong_type(key)),
        })?
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), String> {
        self.with(|map| {
            let entry = map
                .entry(key.to_string())
                .or_insert_with(|| Entry::Hash(BTreeMap::new()));
            match entry {
                Entry::Hash(h) => {
                    h.insert(field.to_string(), value.to_string());
                    Ok(())
                }
                _ => Err(wrong_type(key)),
            }
        })?
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<(), String> {
        self.with(|map| {
            let emptied = match map.get_mut(key) {
                Some(Entry::Hash(h)) => {
                    h.remove(field);
                    h.is_empty()
                }
                Some(_) => return Err(wrong_type(key)),
                None => false,
            };
            if emptied {
                map.remove(key);
            }
            Ok(())
        })?
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, String> {
        self.with(|map| match map.get(key) {
            None => Ok(HashMap::new()),
            Some(Entry::Hash(h)) => Ok(h.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            Some(_) => Err(wrong_type(key)),
        })?
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), String> {
        self.with(|map| {
            let entry = map
                .entry(key.to_string())
                .or_insert_with(|| Entry::Set(BTreeSet::new()));
            match entry {
                Entry::Set(s) => {
                    s.insert(member.to_string());
                    Ok(())
                }
                _ => Err(wrong_type(key)),
            }
        })?
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), String> {
        self.with(|map| {
            let emptied = match map.get_mut(key) {
                Some(Entry::Set(s)) => {
                    s.remove(member);
                    s.is_empty()
                }
                Some(_) => return Err(wrong_type(key)),
                None => false,
            };
            if emptied {
                map.remove(key);
            }
            Ok(())
        })?
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, String> {
        self.with(|map| match map.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Set(s)) => Ok(s.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        })?
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, String> {
        self.with(|map| match map.get(key) {
            None => Ok(false),
            Some(Entry::Set(s)) => Ok(s.contains(member)),
            Some(_) => Err(wrong_type(key)),
        })?
    }
}
