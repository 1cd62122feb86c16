// Archive cache: decoded per-day records, bounded, least-recently-touched eviction

use std::collections::HashMap;
use tracing::info;

use crate::core::format::Sample;

#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub records: Vec<Sample>,
    /// Logical touch time; strictly increasing across the cache.
    pub last_touched: u64,
}

#[derive(Debug, Clone)]
pub struct ArchiveCache {
    entries: HashMap<String, ArchiveEntry>,
    capacity: usize,
    clock: u64,
}

impl ArchiveCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Lookup that refreshes the entry's touch time on a hit.
    pub fn get(&mut self, day_key: &str) -> Option<&ArchiveEntry> {
        let now = self.tick();
        let entry = self.entries.get_mut(day_key)?;
        entry.last_touched = now;
        Some(entry)
    }

    /// Lookup without touching; used when compositing a view.
    pub fn peek(&self, day_key: &str) -> Option<&ArchiveEntry> {
        self.entries.get(day_key)
    }

    pub fn has(&self, day_key: &str) -> bool {
        self.entries.contains_key(day_key)
    }

    /// Insert a day, evicting the least recently touched entry when full.
    /// Returns the evicted key, if any.
    pub fn put(&mut self, day_key: &str, records: Vec<Sample>) -> Option<String> {
        let mut evicted = None;
        if !self.entries.contains_key(day_key) && self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_touched)
                .map(|(k, _)| k.clone());
            if let Some(key) = oldest {
                self.entries.remove(&key);
                info!("Evicted archive {} from cache", key);
                evicted = Some(key);
            }
        }

        let now = self.tick();
        self.entries.insert(
            day_key.to_string(),
            ArchiveEntry {
                records,
                last_touched: now,
            },
        );
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached day keys, sorted.
    pub fn days(&self) -> Vec<String> {
        let mut days: Vec<String> = self.entries.keys().cloned().collect();
        days.sort();
        days
    }
}
