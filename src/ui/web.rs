use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse};
use axum::routing::{delete, get, post};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ChatSession, Reply};
use crate::app::App;
use crate::error::{Error, Result};

const INDEX_HTML: &str = include_str!("index.html");

/// Sessions untouched for this long are dropped.
const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct SessionSlot {
    session: Arc<Mutex<ChatSession>>,
    last_used: Instant,
}

/// Shared by every request: the app plus one chat session per browser.
pub struct WebState {
    app: Arc<App>,
    sessions: Mutex<HashMap<Uuid, SessionSlot>>,
    idle_timeout: Duration,
}

impl WebState {
    pub fn new(app: Arc<App>) -> Self {
        Self::with_idle_timeout(app, SESSION_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(app: Arc<App>, idle_timeout: Duration) -> Self {
        Self {
            app,
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Looks up a session and marks it used.
    async fn session(&self, id: Uuid) -> Option<Arc<Mutex<ChatSession>>> {
        let mut sessions = self.sessions.lock().await;
        let slot = sessions.get_mut(&id)?;
        slot.last_used = Instant::now();
        Some(Arc::clone(&slot.session))
    }

    /// Drops sessions idle past the timeout. A session with a turn in
    /// flight is kept.
    fn evict_idle(&self, sessions: &mut HashMap<Uuid, SessionSlot>) {
        let before = sessions.len();
        sessions.retain(|id, slot| {
            let idle = slot.last_used.elapsed() > self.idle_timeout;
            let busy = slot.session.try_lock().is_err();
            if idle && !busy {
                info!("session {id} expired");
            }
            !idle || busy
        });
        if sessions.len() < before {
            debug!("evicted {} idle sessions", before - sessions.len());
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    ready: bool,
    tools: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SessionCreated {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct MessageRequest {
    text: String,
}

pub fn router(state: Arc<WebState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route("/api/sessions", post(create_session_handler))
        .route("/api/sessions/{id}", delete(delete_session_handler))
        .route("/api/sessions/{id}/messages", post(message_handler))
        .with_state(state)
}

pub async fn serve(app: Arc<App>, addr: SocketAddr) -> Result<()> {
    let state = Arc::new(WebState::new(app));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;
    info!("serving on http://{addr}");
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "OK")
}

async fn status_handler(State(state): State<Arc<WebState>>) -> Json<StatusResponse> {
    let tools: Vec<String> = state
        .app
        .registry()
        .descriptors()
        .iter()
        .map(|t| t.name.clone())
        .collect();
    Json(StatusResponse {
        ready: !tools.is_empty(),
        tools,
    })
}

async fn create_session_handler(
    State(state): State<Arc<WebState>>,
) -> (StatusCode, Json<SessionCreated>) {
    let id = Uuid::new_v4();
    let session = state.app.new_session();
    let mut sessions = state.sessions.lock().await;
    state.evict_idle(&mut sessions);
    sessions.insert(
        id,
        SessionSlot {
            session: Arc::new(Mutex::new(session)),
            last_used: Instant::now(),
        },
    );
    info!("session {id} started ({} active)", sessions.len());
    (StatusCode::CREATED, Json(SessionCreated { id }))
}

async fn delete_session_handler(
    State(state): State<Arc<WebState>>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    match state.sessions.lock().await.remove(&id) {
        Some(_) => {
            info!("session {id} ended");
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn message_handler(
    State(state): State<Arc<WebState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MessageRequest>,
) -> std::result::Result<Json<Reply>, ApiError> {
    let session = state
        .session(id)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("no session {id}")))?;
    // One turn in flight per session.
    let mut session = session.try_lock_owned().map_err(|_| {
        api_error(
            StatusCode::TOO_MANY_REQUESTS,
            "still working on the previous question, please wait",
        )
    })?;
    debug!("session {id}: new message");
    // The turn owns the session lock and runs to completion even if the
    // client goes away.
    let turn = tokio::spawn(async move { session.on_submit(&payload.text).await });
    match turn.await {
        Ok(Some(reply)) => Ok(Json(reply)),
        Ok(None) => Err(api_error(StatusCode::BAD_REQUEST, "query cannot be empty")),
        Err(e) => Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("turn aborted: {e}"),
        )),
    }
}
