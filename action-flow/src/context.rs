use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;

/// Session-wide data shared by every action a user runs
#[derive(Clone, Debug)]
pub struct Context {
    data: Arc<DashMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        self.set_sync(key, value)
    }

    pub fn set_sync(&self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.data.insert(key.into(), value);
        Ok(())
    }

    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_sync(key)
    }

    pub fn get_sync<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.data.remove(key).map(|(_, v)| v)
    }

    pub async fn clear(&self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Independent copy; writes to it do not reach `self`.
    pub fn detached(&self) -> Self {
        Self {
            data: Arc::new(
                self.data
                    .iter()
                    .map(|entry| (entry.key().clone(), entry.value().clone()))
                    .collect(),
            ),
        }
    }

    /// Point-in-time copy, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.data
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for Context {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Context {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(Self {
            data: Arc::new(entries.into_iter().collect()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_a_json_round_trip() {
        let context = Context::new();
        context.set("name", "Ada").await.unwrap();
        context.set("age", 36).await.unwrap();

        let json = serde_json::to_string(&context).unwrap();
        let restored: Context = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.get::<String>("name").await.as_deref(), Some("Ada"));
        assert_eq!(restored.get::<u32>("age").await, Some(36));
        assert_eq!(restored.len(), 2);
    }

    #[tokio::test]
    async fn detached_copy_does_not_share_writes() {
        let context = Context::new();
        context.set("step", 1).await.unwrap();

        let copy = context.detached();
        copy.set("step", 2).await.unwrap();
        copy.set("charged", true).await.unwrap();

        assert_eq!(context.get::<u32>("step").await, Some(1));
        assert_eq!(context.get::<bool>("charged").await, None);
        assert_eq!(copy.get::<u32>("step").await, Some(2));
    }
}
