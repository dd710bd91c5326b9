//! Server event long-poll loop.
//!
//! A single task POSTs `/sc?sn=<ssn>&sid=<sid>` with an empty body and
//! reconciles the resulting add/update/delete events into the tree
//! under the filesystem lock. Errors never stop the loop; they are
//! logged and polling resumes.

use std::time::Duration;

use serde::Deserialize;

use crate::api::decode_error_code;
use crate::api::proto::FileNode;
use crate::client::Mega;
use crate::crypto::attr::decrypt_attr;
use crate::error::ErrorCode;
use crate::fs::BAD_ATTRIBUTE;

const POLL_PAUSE: Duration = Duration::from_millis(10);

#[derive(Debug, Default, Deserialize)]
struct EventBatch {
    /// Wait URL: the server has nothing pending and asks us to block on
    /// this before polling again.
    #[serde(default)]
    w: Option<String>,
    /// Advanced server-state sequence number.
    #[serde(default)]
    sn: Option<String>,
    #[serde(default, rename = "a")]
    events: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct AddedNodes {
    #[serde(default, rename = "f")]
    files: Vec<FileNode>,
}

#[derive(Debug, Default, Deserialize)]
struct NodeEvent {
    #[serde(default, rename = "a")]
    cmd: String,
    #[serde(default)]
    t: AddedNodes,
    #[serde(default)]
    n: String,
    #[serde(default, rename = "at")]
    attr: String,
    #[serde(default)]
    ts: i64,
}

pub(crate) async fn run(mega: Mega, mut ssn: String) {
    let api = mega.api();
    loop {
        let sid = api.session_id().unwrap_or_default();
        let url = format!("{}/sc?sn={}&sid={}", api.base_url(), ssn, sid);

        let resp = match api.http().post(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(_) | Err(_) => {
                tokio::time::sleep(POLL_PAUSE).await;
                continue;
            }
        };
        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(_) => {
                tokio::time::sleep(POLL_PAUSE).await;
                continue;
            }
        };

        let batch: EventBatch = match serde_json::from_slice(&body) {
            Ok(batch) => batch,
            Err(_) => {
                match decode_error_code(&body) {
                    Some(code) if ErrorCode::from_code(code) == ErrorCode::Again => {
                        tokio::time::sleep(POLL_PAUSE).await;
                    }
                    Some(code) => {
                        tracing::warn!(code, "event poll returned server error");
                    }
                    None => {
                        tracing::warn!("unparseable event poll response");
                    }
                }
                continue;
            }
        };

        // no events arrive together with a wait URL
        if let Some(wait_url) = batch.w {
            if !batch.events.is_empty() {
                tracing::warn!("unexpected events alongside wait url");
            }
            if api.http().get(&wait_url).send().await.is_err() {
                tokio::time::sleep(POLL_PAUSE).await;
            }
            continue;
        }

        if let Some(sn) = batch.sn {
            ssn = sn;
        }

        for raw in batch.events {
            // a bare number inside the array is an error message
            if let Some(code) = raw.as_i64() {
                tracing::warn!(code, "error event from server");
                continue;
            }
            match serde_json::from_value::<NodeEvent>(raw) {
                Ok(event) => apply(&mega, &event).await,
                Err(e) => tracing::warn!(error = %e, "unparseable event"),
            }
        }
    }
}

async fn apply(mega: &Mega, event: &NodeEvent) {
    match event.cmd.as_str() {
        // node addition
        "t" => {
            let Ok(session) = mega.session() else { return };
            let mut fs = mega.filesystem().lock().await;
            for rec in &event.t.files {
                if let Err(e) = fs.ingest(rec, &session.master_key) {
                    tracing::warn!(error = %e, hash = %rec.hash, "failed to ingest added node");
                }
            }
        }
        // node attribute update
        "u" => {
            let mut fs = mega.filesystem().lock().await;
            let Some(node) = fs.node_mut(&event.n) else {
                tracing::warn!(hash = %event.n, "update event for unknown node");
                return;
            };
            node.name = match node.meta().attr_key() {
                Some(key) => match decrypt_attr(&key, &event.attr) {
                    Ok(attr) => attr.name,
                    Err(_) => BAD_ATTRIBUTE.to_string(),
                },
                None => BAD_ATTRIBUTE.to_string(),
            };
            node.ts = event.ts;
        }
        // node deletion
        "d" => {
            let mut fs = mega.filesystem().lock().await;
            if !fs.remove_node(&event.n) {
                tracing::debug!(hash = %event.n, "delete event for unknown node");
            }
        }
        // shares, contacts, crypto requests, file/user attributes,
        // account state, pending contacts, public handles, chat: all
        // observed but not acted on
        "s" | "s2" | "c" | "k" | "fa" | "ua" | "psts" | "ipc" | "opc" | "upci" | "upco"
        | "ph" | "se" | "mcc" | "mcna" | "uac" => {}
        other => {
            tracing::debug!(cmd = %other, "unknown event command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_batch_with_wait_url() {
        let batch: EventBatch = serde_json::from_str(r#"{"w":"https://wait.example"}"#).unwrap();
        assert_eq!(batch.w.as_deref(), Some("https://wait.example"));
        assert!(batch.events.is_empty());
        assert!(batch.sn.is_none());
    }

    #[test]
    fn test_event_batch_with_events() {
        let raw = r#"{"sn":"next","a":[{"a":"d","n":"h1"},{"a":"u","n":"h2","at":"blob","ts":5}]}"#;
        let batch: EventBatch = serde_json::from_str(raw).unwrap();
        assert_eq!(batch.sn.as_deref(), Some("next"));
        assert_eq!(batch.events.len(), 2);

        let first: NodeEvent = serde_json::from_value(batch.events[0].clone()).unwrap();
        assert_eq!(first.cmd, "d");
        assert_eq!(first.n, "h1");

        let second: NodeEvent = serde_json::from_value(batch.events[1].clone()).unwrap();
        assert_eq!(second.cmd, "u");
        assert_eq!(second.attr, "blob");
        assert_eq!(second.ts, 5);
    }

    #[test]
    fn test_add_event_carries_node_records() {
        let raw = r#"{"a":"t","t":{"f":[{"h":"h3","p":"root","t":0,"s":9}]}}"#;
        let event: NodeEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.cmd, "t");
        assert_eq!(event.t.files.len(), 1);
        assert_eq!(event.t.files[0].hash, "h3");
    }
}
