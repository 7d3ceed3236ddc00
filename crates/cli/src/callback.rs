// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-use loopback listener that receives the identity provider's
//! redirect at the end of the browser login.
//!
//! The listener answers every redirect with a static page, but only the
//! first one is published to the coordinator, through a oneshot channel.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Host the browser is redirected to. Only hosts registered for the client
/// are accepted by the provider: `localhost` works, `127.0.0.1` does not.
const REDIRECT_HOST: &str = "localhost";

/// How long `close` waits for an in-flight page write before aborting.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
	<meta charset="utf-8" />
	<meta http-equiv="refresh" content="10;url=https://docs.microsoft.com/cli/azure/">
	<title>Login successfully</title>
</head>
<body>
	<h4>You have logged into Microsoft Azure!</h4>
	<p>You can close this window, or we will redirect you to the <a href="https://docs.microsoft.com/cli/azure/">Azure CLI documents</a> in 10 seconds.</p>
</body>
</html>
"#;

const FAILURE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
	<meta charset="utf-8" />
	<title>Login failed</title>
</head>
<body>
	<h4>Some failures occurred during the authentication</h4>
	<p>Return to the terminal for details, then run the login again.</p>
</body>
</html>
"#;

/// Redirect URI of the local listener: `http://localhost:<port>`.
///
/// The host is fixed; the only input is the port the OS assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectUri {
    port: u16,
}

impl RedirectUri {
    fn new(port: u16) -> Self {
        Self { port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for RedirectUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "http://{REDIRECT_HOST}:{}", self.port)
    }
}

/// Query parameters of a redirect, keyed in arrival order. A key may carry
/// several values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues(IndexMap<String, Vec<String>>);

impl QueryValues {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut map: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, value) in pairs {
            map.entry(key.into()).or_default().push(value.into());
        }
        Self(map)
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|values| values.first()).map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Transport-level failure of the listener.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct CallbackError(String);

impl CallbackError {
    fn server(err: std::io::Error) -> Self {
        Self(format!("login server stopped: {err}"))
    }

    pub(crate) fn closed() -> Self {
        Self("login server closed before a redirect arrived".to_owned())
    }
}

/// What the listener publishes: the redirect's query, or a transport error.
pub type CallbackResult = Result<QueryValues, CallbackError>;

/// Write-once slot holding the sender half of the notification channel.
type Slot = Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>;

fn publish(slot: &Slot, result: CallbackResult) -> bool {
    match slot.lock().take() {
        Some(tx) => {
            let _ = tx.send(result);
            true
        }
        None => false,
    }
}

/// Ephemeral HTTP listener for the OAuth redirect.
///
/// Owned by one login attempt. [`CallbackServer::close`] must run on every
/// exit path; dropping the server without closing aborts the serve task.
pub struct CallbackServer {
    redirect_uri: RedirectUri,
    local_addr: SocketAddr,
    listener: Option<TcpListener>,
    slot: Slot,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind on the loopback host with an OS-assigned port.
    ///
    /// Returns the server and the receiver on which the single
    /// [`CallbackResult`] arrives.
    pub async fn bind() -> std::io::Result<(Self, oneshot::Receiver<CallbackResult>)> {
        let listener = TcpListener::bind((REDIRECT_HOST, 0)).await?;
        let local_addr = listener.local_addr()?;
        if local_addr.port() == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "unable to allocate login server port",
            ));
        }

        let (tx, rx) = oneshot::channel();
        let server = Self {
            redirect_uri: RedirectUri::new(local_addr.port()),
            local_addr,
            listener: Some(listener),
            slot: Arc::new(Mutex::new(Some(tx))),
            shutdown: CancellationToken::new(),
            task: None,
        };
        debug!(addr = %local_addr, "login server bound");
        Ok((server, rx))
    }

    pub fn redirect_uri(&self) -> RedirectUri {
        self.redirect_uri
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start accepting on a background task. Returns immediately; calling it
    /// twice, or after `close`, does nothing.
    pub fn serve(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let router = Router::new()
            .route("/", get(handle_redirect))
            .with_state(Arc::clone(&self.slot));
        let slot = Arc::clone(&self.slot);
        let shutdown = self.shutdown.clone();

        self.task = Some(tokio::spawn(async move {
            let result =
                axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await;
            if let Err(e) = result {
                warn!("login server error: {e}");
                publish(&slot, Err(CallbackError::server(e)));
            }
        }));
    }

    /// Stop the listener and release its port. Idempotent, and safe when
    /// `serve` never ran or never accepted a connection.
    pub async fn close(&mut self) {
        self.shutdown.cancel();
        self.listener = None;

        let Some(mut task) = self.task.take() else {
            return;
        };
        if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
            debug!("login server still draining, aborting");
            task.abort();
            let _ = task.await;
        }
        debug!(addr = %self.local_addr, "login server closed");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Publishes before the page is written: axum sends the body after the
/// handler returns, so a failed page write is never reported to the
/// coordinator.
async fn handle_redirect(
    State(slot): State<Slot>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Html<&'static str> {
    let values = match query {
        Ok(Query(pairs)) => QueryValues::from_pairs(pairs),
        Err(e) => {
            warn!("unreadable login redirect query: {e}");
            QueryValues::default()
        }
    };

    let page = if values.contains_key("code") { SUCCESS_HTML } else { FAILURE_HTML };
    if !publish(&slot, Ok(values)) {
        debug!("login redirect already handled, ignoring");
    }
    Html(page)
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
