//! Realtime change-feed client.
//!
//! One websocket connection carries every channel. Subscribing sends a
//! `{"action":"subscribe","table":...,"filter":...}` frame; the server pushes
//! row-level [`ChangeEvent`]s which a reader task routes to subscribers by
//! table. A [`Subscription`] is a scoped resource: dropping it (or calling
//! [`Subscription::close`]) deregisters the receiver and, once the table has
//! no listeners left, tells the server to stop pushing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use ldhingram_model::ChangeEvent;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::Config;
use crate::error::SubscriptionError;

type Registry = Arc<Mutex<HashMap<String, Vec<(u64, UnboundedSender<ChangeEvent>)>>>>;

pub struct RealtimeClient {
    out: UnboundedSender<WsMessage>,
    registry: Registry,
    next_id: AtomicU64,
}

impl RealtimeClient {
    /// Open the change-feed socket and spawn the reader and writer tasks.
    pub async fn connect(config: &Config) -> Result<Self, SubscriptionError> {
        let url = config.realtime_url();
        let (socket, _) = connect_async(&url).await?;
        let (mut sink, mut stream) = socket.split();

        let (out, mut out_rx) = unbounded_channel::<WsMessage>();
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let registry: Registry = Arc::new(Mutex::new(HashMap::new()));
        let reader_registry = registry.clone();
        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => {
                        match serde_json::from_str::<ChangeEvent>(&text) {
                            Ok(event) => dispatch(&reader_registry, event),
                            Err(err) => debug!("ignoring non-event frame: {err}"),
                        }
                    }
                    Ok(WsMessage::Close(_)) => break,
                    Err(err) => {
                        error!("change feed read failed: {err}");
                        break;
                    }
                    _ => {}
                }
            }
            // connection gone; wake every subscriber with channel-closed
            reader_registry.lock().clear();
        });

        Ok(Self {
            out,
            registry,
            next_id: AtomicU64::new(1),
        })
    }

    /// Subscribe to every change on a table.
    pub fn subscribe(&self, table: &str) -> Subscription {
        self.subscribe_filtered(table, None)
    }

    /// Subscribe with a server-side row filter.
    pub fn subscribe_filtered(&self, table: &str, filter: Option<String>) -> Subscription {
        let (tx, rx) = unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .lock()
            .entry(table.to_string())
            .or_default()
            .push((id, tx));
        let frame = json!({ "action": "subscribe", "table": table, "filter": filter });
        let _ = self.out.send(WsMessage::Text(frame.to_string()));
        Subscription {
            table: table.to_string(),
            id,
            rx,
            out: self.out.clone(),
            registry: self.registry.clone(),
            released: false,
        }
    }

    pub fn subscribe_posts(&self) -> Subscription {
        self.subscribe("posts")
    }

    pub fn subscribe_likes(&self) -> Subscription {
        self.subscribe("likes")
    }

    pub fn subscribe_comments(&self) -> Subscription {
        self.subscribe("comments")
    }

    /// Message changes touching the given user, filtered server-side.
    pub fn subscribe_messages(&self, user_id: Uuid) -> Subscription {
        self.subscribe_filtered(
            "messages",
            Some(format!(
                "or(sender_id.eq.{user_id},receiver_id.eq.{user_id})"
            )),
        )
    }
}

fn dispatch(registry: &Registry, event: ChangeEvent) {
    let mut guard = registry.lock();
    if let Some(subs) = guard.get_mut(&event.table) {
        subs.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}

/// A live channel onto one table's change feed. Held by the observing
/// screen for exactly as long as it is mounted.
pub struct Subscription {
    table: String,
    id: u64,
    rx: UnboundedReceiver<ChangeEvent>,
    out: UnboundedSender<WsMessage>,
    registry: Registry,
    released: bool,
}

impl Subscription {
    /// Wait for the next change event. `Closed` once the feed is gone.
    pub async fn next_event(&mut self) -> Result<ChangeEvent, SubscriptionError> {
        self.rx.recv().await.ok_or(SubscriptionError::Closed)
    }

    /// Stop observing. Also happens automatically on drop.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut guard = self.registry.lock();
        let table_empty = if let Some(subs) = guard.get_mut(&self.table) {
            subs.retain(|(id, _)| *id != self.id);
            subs.is_empty()
        } else {
            false
        };
        if table_empty {
            guard.remove(&self.table);
            let frame = json!({ "action": "unsubscribe", "table": self.table });
            let _ = self.out.send(WsMessage::Text(frame.to_string()));
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
