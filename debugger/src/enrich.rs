//! Call-frame and scope resolution.
//!
//! For the selected frame two enrichments are computed, each
//! independently fallible: the single source line at the frame's
//! location, and the name/value listing of every scope in the chain.
//! Failures degrade to a partial view; they never fail the frame render
//! as a whole.
//!
//! Enrichment runs as its own task while the session keeps processing
//! messages, so a resume or a new pause can land mid-fetch. Each request
//! carries the pause generation it belongs to and
//! [`SessionInternals::commit_frame_view`] discards stale results.

use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWrite;

use crate::client::CommandClient;
use crate::internals::{EnrichmentRequest, SessionInternals};
use crate::types::{CallFrame, FrameView, Location, PropertyView, RemoteObject, ScopeView};

#[derive(Debug, Deserialize)]
struct PropertyDescriptor {
    name: String,
    #[serde(default)]
    value: Option<RemoteObject>,
}

/// Resolve the request's frame and hand the finished view to the render
/// sink, unless it went stale while the fetches were in flight.
pub(crate) async fn render_frame<W>(
    client: &CommandClient<W>,
    internals: &SessionInternals,
    request: EnrichmentRequest,
) where
    W: AsyncWrite + Unpin + Send,
{
    let view = build_frame_view(client, &request.frame).await;
    internals.commit_frame_view(request.generation, view);
}

async fn build_frame_view<W>(client: &CommandClient<W>, frame: &CallFrame) -> FrameView
where
    W: AsyncWrite + Unpin + Send,
{
    let source_preview = fetch_source_line(client, &frame.location).await;

    let mut scopes = Vec::with_capacity(frame.scope_chain.len());
    for scope in &frame.scope_chain {
        scopes.push(resolve_scope(client, scope).await);
    }

    FrameView {
        function_name: frame.function_name.clone(),
        location: frame.location.clone(),
        // protocol line numbers are 0-based, displayed ones 1-based
        display_line: frame.location.line_number + 1,
        source_preview,
        scopes,
    }
}

/// Fetch the full source for the frame's script and extract the single
/// line at its location. Any failure, including an out-of-range line
/// index, produces no preview.
async fn fetch_source_line<W>(client: &CommandClient<W>, location: &Location) -> Option<String>
where
    W: AsyncWrite + Unpin + Send,
{
    let result = match client
        .send(
            "Debugger.getScriptSource",
            Some(json!({"scriptId": location.script_id})),
        )
        .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::debug!(error = %e, script_id = %location.script_id, "source unavailable");
            return None;
        }
    };

    let source = result.get("scriptSource")?.as_str()?;
    let line = usize::try_from(location.line_number).ok()?;
    source.lines().nth(line).map(str::to_string)
}

/// Render one scope's enumerable own properties. A fetch failure is
/// reported inline for this scope only and does not abort the rest of
/// the chain.
async fn resolve_scope<W>(client: &CommandClient<W>, scope: &crate::types::Scope) -> ScopeView
where
    W: AsyncWrite + Unpin + Send,
{
    let Some(object_id) = scope
        .object
        .as_ref()
        .and_then(|object| object.object_id.as_deref())
    else {
        return ScopeView {
            kind: scope.kind,
            properties: Vec::new(),
            error: None,
        };
    };

    let result = match client
        .send(
            "Runtime.getProperties",
            Some(json!({"objectId": object_id, "ownProperties": true})),
        )
        .await
    {
        Ok(result) => result,
        Err(e) => {
            return ScopeView {
                kind: scope.kind,
                properties: Vec::new(),
                error: Some(e.to_string()),
            };
        }
    };

    let descriptors: Vec<PropertyDescriptor> = result
        .get("result")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();

    let properties = descriptors
        .into_iter()
        .map(|descriptor| PropertyView {
            name: descriptor.name,
            // absent values display as the undefined literal, not omitted
            value: descriptor
                .value
                .map(|value| value.display())
                .unwrap_or_else(|| "undefined".to_string()),
        })
        .collect();

    ScopeView {
        kind: scope.kind,
        properties,
        error: None,
    }
}
