//! The command dispatcher.
//!
//! Outgoing commands are assigned monotonically increasing correlation
//! ids and correlated to their responses through single-shot router
//! subscriptions on `response:<id>` topics. The subscription is
//! registered before the frame is written, so a fast reply cannot race
//! the registration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use router::{Router, SubscriptionId};
use serde_json::{json, Value};
use tokio::io::AsyncWrite;
use tokio::sync::{oneshot, Mutex};
use wire::{Command, CommandId, OutgoingFrame, WireWriter};

/// Protocol domains enabled at connect time, in order.
const ENABLE_SEQUENCE: [&str; 3] = ["Console", "Runtime", "Debugger"];

pub(crate) struct CommandClient<W> {
    writer: Mutex<WireWriter<W>>,
    router: Router<Value>,
    next_id: AtomicU64,
    /// Router subscriptions for commands still awaiting a response,
    /// keyed by correlation id.
    pending: Arc<StdMutex<HashMap<CommandId, SubscriptionId>>>,
    command_timeout: Option<Duration>,
}

impl<W> CommandClient<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub(crate) fn new(
        writer: WireWriter<W>,
        router: Router<Value>,
        command_timeout: Option<Duration>,
    ) -> Self {
        Self {
            writer: Mutex::new(writer),
            router,
            // correlation ids start at 1 and are never reused
            next_id: AtomicU64::new(1),
            pending: Arc::new(StdMutex::new(HashMap::new())),
            command_timeout,
        }
    }

    /// Send a command and wait for its correlated response.
    ///
    /// A response carrying an `error` field rejects with that payload;
    /// otherwise the `result` payload is returned. Without a configured
    /// timeout a command with no response waits indefinitely.
    #[tracing::instrument(skip(self, params))]
    pub(crate) async fn send(&self, method: &str, params: Option<Value>) -> eyre::Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = oneshot::channel();
        let tx = StdMutex::new(Some(tx));
        let pending = Arc::clone(&self.pending);
        // register the single-shot subscription before transmitting to
        // avoid a race with a fast reply
        let subscription = self
            .router
            .once(&format!("^response:{id}$"), move |response: &Value| {
                pending.lock().unwrap().remove(&id);
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(response.clone());
                }
            })
            .wrap_err("registering response subscription")?;
        self.pending.lock().unwrap().insert(id, subscription);

        {
            let mut writer = self.writer.lock().await;
            writer
                .send(OutgoingFrame::Command(Command {
                    id,
                    method: method.to_string(),
                    params,
                }))
                .await
                .wrap_err_with(|| format!("sending {method} command"))?;
        }
        tracing::debug!(id, "command sent");

        let response = match self.command_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(received) => received,
                Err(_) => {
                    // drop the orphaned subscription before reporting
                    if let Some(sub) = self.pending.lock().unwrap().remove(&id) {
                        self.router.unsubscribe(sub);
                    }
                    eyre::bail!("command {method} (id {id}) timed out");
                }
            },
            None => rx.await,
        }
        .wrap_err_with(|| format!("connection closed awaiting response to {method} (id {id})"))?;

        if let Some(error) = response.get("error") {
            eyre::bail!("{method} failed: {error}");
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Enable the protocol domains in their fixed order, waiting for each
    /// response before issuing the next.
    ///
    /// The first failure aborts the sequence; domains already enabled are
    /// not rolled back.
    pub(crate) async fn enable(&self) -> eyre::Result<()> {
        for domain in ENABLE_SEQUENCE {
            self.send(&format!("{domain}.enable"), Some(json!({})))
                .await
                .wrap_err_with(|| format!("enabling {domain} domain"))?;
            tracing::debug!(domain, "domain enabled");
        }
        Ok(())
    }

    /// Fail every command still awaiting a response.
    ///
    /// Dropping the subscriptions drops their response senders, which
    /// wakes each waiting caller with a connection-closed error.
    pub(crate) fn fail_pending(&self) {
        let orphaned: Vec<SubscriptionId> =
            self.pending.lock().unwrap().drain().map(|(_, sub)| sub).collect();
        if !orphaned.is_empty() {
            tracing::debug!(count = orphaned.len(), "failing pending commands");
        }
        for sub in orphaned {
            self.router.unsubscribe(sub);
        }
    }
}
