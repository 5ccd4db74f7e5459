//! In-process store with Redis semantics for the commands crawl state uses.
//!
//! Expired keys are dropped lazily on access, lists vanish once empty, and
//! `KEYS` understands `*`, `?`, `[...]` and backslash escapes. Handy for
//! single-process crawls, tests and benchmarks.

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::store::{RemoteStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    List(VecDeque<Vec<u8>>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable server: every command fails until re-enabled.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of live keys, across all prefixes.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

/// Drop `key` if its TTL has passed, then hand back the live entry.
fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    let now = Instant::now();
    if entries.get(key).map_or(false, |e| e.is_expired(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

/// Expiry instant `ttl` from now; a TTL past the clock's range never expires.
fn expiry_after(ttl: Duration) -> Option<Instant> {
    Instant::now().checked_add(ttl)
}

/// Translate a Redis glob into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex, StoreError> {
    let mut out = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                }
            }
            '[' => {
                let mut class = String::from("[");
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    match inner {
                        '^' if class.len() == 1 => class.push('^'),
                        // Ranges pass through, other class syntax is literal.
                        '\\' | '[' | '&' | '~' => {
                            class.push('\\');
                            class.push(inner);
                        }
                        _ => class.push(inner),
                    }
                }
                class.push(']');
                out.push_str(&class);
            }
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).map_err(|e| StoreError::Unavailable(format!("bad pattern {}: {}", pattern, e)))
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.check_online()?;
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, e| !e.is_expired(now));
        Ok(entries
            .keys()
            .filter(|k| matcher.is_match(k))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock();
        match live(&mut entries, key) {
            None => Ok(None),
            Some(Entry { value: Value::Str(s), .. }) => Ok(Some(s.clone())),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        expiration: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        let entry = Entry {
            value: Value::Str(value.to_string()),
            expires_at: expiration.and_then(expiry_after),
        };
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        self.check_online()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn exists(&self, keys: &[String]) -> Result<u64, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock();
        // Repeated keys count once per mention, like Redis.
        Ok(keys
            .iter()
            .filter(|k| live(&mut entries, k).is_some())
            .count() as u64)
    }

    async fn expire(&self, key: &str, expiration: Duration) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock();
        match live(&mut entries, key) {
            Some(entry) => {
                entry.expires_at = expiry_after(expiration);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn lpush(&self, key: &str, values: &[Vec<u8>]) -> Result<u64, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock();
        if live(&mut entries, key).is_none() {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::List(VecDeque::new()),
                    expires_at: None,
                },
            );
        }
        match entries.get_mut(key) {
            Some(Entry { value: Value::List(list), .. }) => {
                for value in values {
                    list.push_front(value.clone());
                }
                Ok(list.len() as u64)
            }
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn rpop(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock();
        let (popped, now_empty) = match live(&mut entries, key) {
            None => return Ok(None),
            Some(Entry { value: Value::List(list), .. }) => {
                let popped = list.pop_back();
                (popped, list.is_empty())
            }
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
        };
        if now_empty {
            entries.remove(key);
        }
        Ok(popped)
    }

    async fn llen(&self, key: &str) -> Result<u64, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock();
        match live(&mut entries, key) {
            None => Ok(0),
            Some(Entry { value: Value::List(list), .. }) => Ok(list.len() as u64),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }
}
