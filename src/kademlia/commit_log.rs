// src/kademlia/commit_log.rs
//
// A content-addressed commit log built entirely on `store`/`find_value`:
// `commit` writes a JSON record keyed by its own hash and repoints a
// sentinel head key (all-zero) at it; `get_latest_commit` follows that
// pointer. Per the spec's Design Note (flagged, not replicated): the
// reference implementation keeps one running hasher on the service and
// feeds every commit into it, contaminating later hashes with earlier
// state. Here a fresh `Sha1` is instantiated per call.

use serde::Serialize;
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::NodeError;
use crate::kademlia::id::{Id, ID_LEN};
use crate::kademlia::service::Service;

#[derive(Serialize)]
struct CommitRecord {
    data: Value,
    lstcommit: Vec<Id>,
    time: u64,
    author: Id,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs()
}

/// Constructs `{data, lstcommit: [], time, author}`, hashes the UTF-8
/// JSON encoding with a fresh SHA-1, stores the record under that hash,
/// and repoints the head pointer (key `0x00*20`) at it. The commit body
/// is always cached locally; `cached` governs only the head pointer,
/// matching the original's `store(commit_id, commit_data)` (default
/// `cached=True`) vs. `store(b"\x00"*20, commit_id, cached)`. Returns
/// the commit's id.
pub async fn commit(service: &Service, data: Value, cached: bool) -> Id {
    let record = CommitRecord {
        data,
        lstcommit: Vec::new(),
        time: unix_now(),
        author: service.local().id,
    };
    let bytes = serde_json::to_vec(&record).expect("CommitRecord always serializes");

    let mut hasher = Sha1::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    let mut id_bytes = [0u8; ID_LEN];
    id_bytes.copy_from_slice(&digest);
    let commit_id = Id::from_bytes(id_bytes);

    service.store(commit_id, bytes, true).await;
    service.store(Id::zero(), commit_id.as_bytes().to_vec(), cached).await;
    commit_id
}

/// Follows the head pointer and decodes the commit it names. `None` if
/// no commit has ever been made and reachable from this node's view of
/// the table.
pub async fn get_latest_commit(service: &Service) -> Result<Option<(Id, Value)>, NodeError> {
    let Some(pointer_bytes) = service.find_value(Id::zero()).await else {
        return Ok(None);
    };
    if pointer_bytes.len() != ID_LEN {
        return Err(NodeError::Other(format!(
            "head pointer has wrong length: expected {ID_LEN}, got {}",
            pointer_bytes.len()
        )));
    }
    let mut buf = [0u8; ID_LEN];
    buf.copy_from_slice(&pointer_bytes);
    let commit_id = Id::from_bytes(buf);

    let Some(payload) = service.find_value(commit_id).await else {
        return Ok(None);
    };
    let value: Value = serde_json::from_slice(&payload)
        .map_err(|e| NodeError::Other(format!("decoding commit record: {e}")))?;
    Ok(Some((commit_id, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_loader::{CallConfig, DebugConfig, EventConfig, KBucketConfig, NodeConfig, NodeIdentity, QueryConfig, ServerConfig};

    fn config() -> NodeConfig {
        NodeConfig {
            node: NodeIdentity { id: None },
            server: ServerConfig { host: "127.0.0.1".into(), port: 0 },
            kbucket: KBucketConfig { ksize: 20 },
            query: QueryConfig { alpha: 3 },
            call: CallConfig::default(),
            event: EventConfig::default(),
            debug: DebugConfig::default(),
        }
    }

    #[tokio::test]
    async fn commit_then_get_latest_round_trips() {
        let service = Service::new(&config()).unwrap();
        let data = serde_json::json!({"msg": "hello"});
        let commit_id = commit(&service, data.clone(), false).await;

        let (latest_id, record) = get_latest_commit(&service).await.unwrap().unwrap();
        assert_eq!(latest_id, commit_id);
        assert_eq!(record["data"], data);
        assert_eq!(record["lstcommit"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn get_latest_commit_before_any_commit_is_none() {
        let service = Service::new(&config()).unwrap();
        assert!(get_latest_commit(&service).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn successive_commits_advance_the_head_pointer() {
        let service = Service::new(&config()).unwrap();
        let first = commit(&service, serde_json::json!({"n": 1}), false).await;
        let second = commit(&service, serde_json::json!({"n": 2}), false).await;
        assert_ne!(first, second);

        let (latest_id, record) = get_latest_commit(&service).await.unwrap().unwrap();
        assert_eq!(latest_id, second);
        assert_eq!(record["data"]["n"], 2);
    }
}
