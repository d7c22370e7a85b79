//! High level debug session facade.

use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use futures::StreamExt;
use router::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wire::{classify, Classification, WireReader, WireTransport, WireWriter};

use crate::client::CommandClient;
use crate::enrich;
use crate::events::ProtocolEvent;
use crate::internals::SessionInternals;
use crate::session::{SessionEvent, SessionEventReceiver};
use crate::state::ExecutionState;
use crate::types::{Breakpoint, CallFrame, EvaluateResult, RemoteObject, Script};

type BoxedRead = Box<dyn AsyncRead + Unpin + Send>;
type BoxedWrite = Box<dyn AsyncWrite + Unpin + Send>;

/// Connection options for a debug session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectOptions {
    /// Deadline for each command's response. `None` (the default) waits
    /// indefinitely, matching the observed protocol behavior; when set,
    /// an unanswered command fails with a timeout error.
    #[serde(default)]
    pub command_timeout: Option<Duration>,
}

/// A live debug session over the remote-debug wire protocol.
///
/// Owns the connection: a reader task decodes frames, a processor task
/// classifies them, correlates responses to in-flight commands through
/// the router, and drives the session state machine. All state mutation
/// is serialized through that single owner.
pub struct Debugger {
    client: Arc<CommandClient<BoxedWrite>>,
    internals: Arc<SessionInternals>,
    router: Router<Value>,
    events: SessionEventReceiver,
    cancel_token: CancellationToken,

    // task handles for cleanup
    reader_handle: Option<JoinHandle<()>>,
    processor_handle: Option<JoinHandle<()>>,
}

impl Debugger {
    /// Connect to a debug target over TCP and enable the protocol
    /// domains.
    #[tracing::instrument(skip(addr, options))]
    pub async fn connect(addr: impl ToSocketAddrs, options: ConnectOptions) -> eyre::Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .wrap_err("connecting to debug target")?;
        Self::from_transport(stream, options).await
    }

    /// Create a session from an existing transport (useful for testing).
    pub async fn from_transport<T: WireTransport>(
        transport: T,
        options: ConnectOptions,
    ) -> eyre::Result<Self> {
        let (read, write) = transport.into_split();
        let reader = WireReader::new(Box::new(read) as BoxedRead);
        let writer = WireWriter::new(Box::new(write) as BoxedWrite);

        let router: Router<Value> = Router::new();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();

        let internals = Arc::new(SessionInternals::new(router.clone(), event_tx));
        let client = Arc::new(CommandClient::new(
            writer,
            router.clone(),
            options.command_timeout,
        ));

        let reader_handle = Self::spawn_reader_task(reader, message_tx, cancel_token.clone());
        let processor_handle = Self::spawn_processor_task(
            message_rx,
            router.clone(),
            Arc::clone(&internals),
            Arc::clone(&client),
            cancel_token.clone(),
        );

        // the transport is open
        internals.on_open();

        let debugger = Self {
            client,
            internals,
            router,
            events: SessionEventReceiver::new(event_rx),
            cancel_token,
            reader_handle: Some(reader_handle),
            processor_handle: Some(processor_handle),
        };

        // ordered domain enablement; a failure here aborts the remaining
        // enables and surfaces to the caller
        debugger
            .client
            .enable()
            .await
            .wrap_err("enabling protocol domains")?;

        Ok(debugger)
    }

    fn spawn_reader_task(
        mut reader: WireReader<BoxedRead>,
        message_tx: mpsc::UnboundedSender<Value>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("reader task cancelled");
                        break;
                    }
                    msg = reader.next() => {
                        match msg {
                            Some(Ok(message)) => {
                                tracing::trace!(?message, "received message");
                                if message_tx.send(message).is_err() {
                                    tracing::debug!("message channel closed");
                                    break;
                                }
                            }
                            Some(Err(e)) => {
                                tracing::error!(error = %e, "transport error");
                                break;
                            }
                            None => {
                                tracing::debug!("transport closed");
                                break;
                            }
                        }
                    }
                }
            }
            // dropping message_tx wakes the processor into its
            // disconnect path
        })
    }

    fn spawn_processor_task(
        mut message_rx: mpsc::UnboundedReceiver<Value>,
        router: Router<Value>,
        internals: Arc<SessionInternals>,
        client: Arc<CommandClient<BoxedWrite>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("processor task cancelled");
                        break;
                    }
                    msg = message_rx.recv() => {
                        match msg {
                            Some(message) => {
                                Self::route_message(&router, &internals, &client, message);
                            }
                            None => {
                                internals.on_disconnect();
                                client.fail_pending();
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    /// Classify one inbound message and dispatch it.
    ///
    /// Responses are published on their correlation topic; events are
    /// published on their raw method topic and then applied to the
    /// session state machine. Invalid shapes are logged and dropped.
    fn route_message(
        router: &Router<Value>,
        internals: &Arc<SessionInternals>,
        client: &Arc<CommandClient<BoxedWrite>>,
        message: Value,
    ) {
        match classify(&message) {
            Classification::Response { id } => {
                let handled = router.publish(&format!("response:{id}"), &message);
                if handled == 0 {
                    // stray or duplicate response; not an error
                    tracing::debug!(id, "response with no pending command");
                }
            }
            Classification::Event { method } => {
                router.publish(&method, &message);

                let params = message
                    .get("params")
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                match ProtocolEvent::parse(&method, params) {
                    Ok(event) => {
                        if let Some(request) = internals.handle_event(event) {
                            // enrichment runs as its own task so the
                            // processor keeps draining messages; stale
                            // results are discarded on commit
                            let client = Arc::clone(client);
                            let internals = Arc::clone(internals);
                            tokio::spawn(async move {
                                enrich::render_frame(&client, &internals, request).await;
                            });
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, method, "dropping malformed event");
                    }
                }
            }
            Classification::Ambiguous => {
                tracing::warn!(%message, "message has both id and method; dropping");
            }
            Classification::Unknown => {
                tracing::warn!(%message, "message has neither id nor method; dropping");
            }
        }
    }

    /// The subscription surface for external consumers.
    ///
    /// UI code subscribes here to the derived topics (`debugger:paused`,
    /// `debugger:resumed`, `debugger:script:parsed`, `debugger:console`)
    /// or to raw protocol method names.
    pub fn router(&self) -> Router<Value> {
        self.router.clone()
    }

    /// Receiver for typed session events.
    pub fn events(&mut self) -> &mut SessionEventReceiver {
        &mut self.events
    }

    /// Send a raw protocol command and await its result payload.
    pub async fn send(&self, method: &str, params: Option<Value>) -> eyre::Result<Value> {
        self.client.send(method, params).await
    }

    /// Ask the target to pause at the next opportunity.
    pub async fn pause(&self) -> eyre::Result<()> {
        self.client.send("Debugger.pause", Some(json!({}))).await?;
        Ok(())
    }

    /// Resume execution of the target.
    pub async fn resume(&self) -> eyre::Result<()> {
        self.client.send("Debugger.resume", Some(json!({}))).await?;
        Ok(())
    }

    /// Step over the current statement.
    pub async fn step_over(&self) -> eyre::Result<()> {
        self.client
            .send("Debugger.stepOver", Some(json!({})))
            .await?;
        Ok(())
    }

    /// Step into the current statement.
    pub async fn step_into(&self) -> eyre::Result<()> {
        self.client
            .send("Debugger.stepInto", Some(json!({})))
            .await?;
        Ok(())
    }

    /// Step out of the current function.
    pub async fn step_out(&self) -> eyre::Result<()> {
        self.client
            .send("Debugger.stepOut", Some(json!({})))
            .await?;
        Ok(())
    }

    /// Register a breakpoint with the target.
    #[tracing::instrument(skip(self))]
    pub async fn set_breakpoint(&self, url: &str, line: i64) -> eyre::Result<Breakpoint> {
        let result = self
            .client
            .send(
                "Debugger.setBreakpointByUrl",
                Some(json!({"url": url, "lineNumber": line})),
            )
            .await?;

        let id = result
            .get("breakpointId")
            .and_then(Value::as_str)
            .ok_or_else(|| eyre::eyre!("setBreakpointByUrl response missing breakpointId"))?
            .to_string();

        let breakpoint = Breakpoint {
            id,
            url: url.to_string(),
            line,
            enabled: true,
        };
        self.internals.record_breakpoint(breakpoint.clone());
        Ok(breakpoint)
    }

    /// Remove a previously registered breakpoint.
    #[tracing::instrument(skip(self))]
    pub async fn remove_breakpoint(&self, id: &str) -> eyre::Result<()> {
        let breakpoint = self.internals.forget_breakpoint(id)?;
        self.client
            .send(
                "Debugger.removeBreakpoint",
                Some(json!({"breakpointId": breakpoint.id})),
            )
            .await?;
        Ok(())
    }

    /// Breakpoints currently registered through this session.
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.internals.breakpoints()
    }

    /// Evaluate an expression, against the selected call frame when
    /// paused, otherwise in the global context.
    pub async fn evaluate(&self, expression: &str) -> eyre::Result<EvaluateResult> {
        let frame_id = self.internals.with_state(|state| {
            (state.execution() == ExecutionState::Paused)
                .then(|| state.selected().map(|frame| frame.call_frame_id.clone()))
                .flatten()
                .filter(|id| !id.is_empty())
        });

        let result = match frame_id {
            Some(call_frame_id) => {
                self.client
                    .send(
                        "Debugger.evaluateOnCallFrame",
                        Some(json!({"callFrameId": call_frame_id, "expression": expression})),
                    )
                    .await?
            }
            None => {
                self.client
                    .send("Runtime.evaluate", Some(json!({"expression": expression})))
                    .await?
            }
        };

        let object: RemoteObject = result
            .get("result")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();
        let error = result
            .get("wasThrown")
            .and_then(Value::as_bool)
            .unwrap_or(false)
            || result.get("exceptionDetails").is_some();

        Ok(EvaluateResult {
            output: object.display(),
            error,
        })
    }

    /// Select a different call frame of the current pause and re-resolve
    /// its source preview and scopes.
    ///
    /// Fails while not paused, or when the index is out of range. Does
    /// not alter the call-frame sequence itself.
    pub async fn select_call_frame(&self, index: usize) -> eyre::Result<()> {
        let request = self.internals.select_frame(index)?;
        enrich::render_frame(&self.client, &self.internals, request).await;
        Ok(())
    }

    /// Current execution state of the target.
    pub fn execution_state(&self) -> ExecutionState {
        self.internals.with_state(|state| state.execution())
    }

    /// Call frames of the current pause, empty while running.
    pub fn call_frames(&self) -> Vec<CallFrame> {
        self.internals
            .with_state(|state| state.call_frames().to_vec())
    }

    /// Every script the registry has seen.
    pub fn scripts(&self) -> Vec<Script> {
        self.internals
            .with_state(|state| state.scripts().cloned().collect())
    }

    /// Look up one script by id.
    pub fn script(&self, id: &str) -> Option<Script> {
        self.internals.with_state(|state| state.script(id).cloned())
    }

    /// Shut down the session, cancelling the background tasks.
    pub async fn shutdown(mut self) -> eyre::Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.processor_handle.take() {
            let _ = handle.await;
        }

        Ok(())
    }
}

impl Drop for Debugger {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
