//! In-memory key-value store.

use crate::error::StorageError;
use crate::{DEFAULT_MAX_ENTRIES, DEFAULT_MAX_VALUE_LEN};
use std::collections::BTreeMap;

/// Limits enforced by [`KeyValueStore`].
///
/// Inserting a new key once `max_entries` keys exist is a hard failure, as
/// is any value longer than `max_value_len` bytes. Nothing is truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_entries: usize,
    pub max_value_len: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_value_len: DEFAULT_MAX_VALUE_LEN,
        }
    }
}

impl StoreLimits {
    pub fn new(max_entries: usize, max_value_len: usize) -> Self {
        Self {
            max_entries,
            max_value_len,
        }
    }

    fn check_value(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if value.len() > self.max_value_len {
            return Err(StorageError::ValueTooLarge {
                key: key.to_string(),
                len: value.len(),
                max: self.max_value_len,
            });
        }
        Ok(())
    }
}

/// Key-value mapping mutated only by applying committed writes.
///
/// Iteration order is not part of the contract; this implementation happens
/// to iterate in key order.
#[derive(Debug, Clone, Default)]
pub struct KeyValueStore {
    entries: BTreeMap<String, String>,
    limits: StoreLimits,
}

impl KeyValueStore {
    /// Creates an empty store with the given limits.
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            entries: BTreeMap::new(),
            limits,
        }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Checks whether [`apply_set`](Self::apply_set) would succeed, without
    /// changing the store.
    pub fn check_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.limits.check_value(key, value)?;
        if !self.entries.contains_key(key) && self.entries.len() >= self.limits.max_entries {
            return Err(StorageError::Capacity {
                max: self.limits.max_entries,
            });
        }
        Ok(())
    }

    /// Inserts or overwrites `key`.
    pub fn apply_set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_set(key, value)?;
        match self.entries.get_mut(key) {
            Some(existing) => *existing = value.to_string(),
            None => {
                self.entries.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Replaces the whole contents of the store.
    ///
    /// Later duplicates of a key overwrite earlier ones. If any entry
    /// violates the limits the store is left unchanged.
    pub fn load<I>(&mut self, entries: I) -> Result<(), StorageError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut fresh = KeyValueStore::new(self.limits);
        for (key, value) in entries {
            fresh.apply_set(&key, &value)?;
        }
        self.entries = fresh.entries;
        Ok(())
    }

    /// Iterates over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the entries as a map.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
