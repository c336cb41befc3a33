//! Per-request data made available to error rendering.

use std::future::Future;

tokio::task_local! {
    static REQUEST: RequestContext;
}

/// Facts about the request being served.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RequestContext {
    /// `X-Request-ID` supplied by the client, if any.
    pub(crate) request_id: Option<String>,
    /// Request path without the query string.
    pub(crate) path: String,
}

/// Runs `future` with `context` installed for the current task.
pub(crate) async fn scope<F: Future>(context: RequestContext, future: F) -> F::Output {
    REQUEST.scope(context, future).await
}

/// Context of the current request; empty outside a request scope.
pub(crate) fn current() -> RequestContext {
    REQUEST.try_with(Clone::clone).unwrap_or_default()
}
