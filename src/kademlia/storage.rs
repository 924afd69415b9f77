// src/kademlia/storage.rs
//
// The local key-value store. No TTL, no persistence: `store` overwrites.

use std::collections::HashMap;

use tokio::sync::Mutex;

use super::id::Id;

pub struct Storage {
    values: Mutex<HashMap<Id, Vec<u8>>>,
}

impl Storage {
    pub fn new() -> Self {
        Self { values: Mutex::new(HashMap::new()) }
    }

    pub async fn store(&self, key: Id, value: Vec<u8>) {
        self.values.lock().await.insert(key, value);
    }

    pub async fn get(&self, key: &Id) -> Option<Vec<u8>> {
        self.values.lock().await.get(key).cloned()
    }

    pub async fn exist(&self, key: &Id) -> bool {
        self.values.lock().await.contains_key(key)
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let storage = Storage::new();
        let key = Id::random();
        storage.store(key, b"hi".to_vec()).await;
        assert_eq!(storage.get(&key).await, Some(b"hi".to_vec()));
        assert!(storage.exist(&key).await);
    }

    #[tokio::test]
    async fn get_on_miss_is_none() {
        let storage = Storage::new();
        assert_eq!(storage.get(&Id::random()).await, None);
    }

    #[tokio::test]
    async fn store_overwrites() {
        let storage = Storage::new();
        let key = Id::random();
        storage.store(key, b"first".to_vec()).await;
        storage.store(key, b"second".to_vec()).await;
        assert_eq!(storage.get(&key).await, Some(b"second".to_vec()));
    }
}
