//! axum server exposing boards, tags and drag gestures as JSON endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard, oneshot};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::error::ApiError;
use crate::board::{BoardController, BoardDirectory, BoardState, LoadState};
use crate::error::{BoardError, BoardResult};
use crate::gateway::PersistenceGateway;
use crate::notify::Notification;
use crate::reorder::DragItem;
use crate::types::{Board, Tag};

type ApiResult<T> = Result<T, ApiError>;

/// Shared server state: the gateway, the board directory and one controller
/// per board that has been opened.
#[derive(Clone)]
pub struct ApiServer {
    gateway: Arc<dyn PersistenceGateway>,
    directory: Arc<BoardDirectory>,
    controllers: Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<BoardController>>>>>,
    default_owner: String,
}

impl ApiServer {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        default_owner: impl Into<String>,
        default_columns: Vec<String>,
    ) -> Self {
        Self {
            directory: Arc::new(BoardDirectory::new(Arc::clone(&gateway), default_columns)),
            gateway,
            controllers: Arc::new(std::sync::Mutex::new(HashMap::new())),
            default_owner: default_owner.into(),
        }
    }

    fn cached(&self, board_id: &str) -> Option<Arc<Mutex<BoardController>>> {
        self.controllers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(board_id)
            .cloned()
    }

    /// The controller for a board, opening it on first use.
    async fn controller(&self, board_id: &str) -> ApiResult<Arc<Mutex<BoardController>>> {
        if let Some(controller) = self.cached(board_id) {
            return Ok(controller);
        }

        let opened = BoardController::open(Arc::clone(&self.gateway), board_id).await?;
        let mut controllers = self
            .controllers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let controller = controllers
            .entry(board_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(opened)));
        Ok(Arc::clone(controller))
    }

    /// Lock a board's controller, retrying the load if the last one failed.
    async fn board(&self, board_id: &str) -> ApiResult<OwnedMutexGuard<BoardController>> {
        let controller = self.controller(board_id).await?;
        let mut guard = controller.lock_owned().await;
        if guard.state().is_none() {
            let reloaded = guard.refresh().await.map(|_| ());
            if let Err(err) = reloaded {
                let notifications = guard.take_notifications();
                return Err(ApiError::from(err).with_notifications(notifications));
            }
        }
        Ok(guard)
    }
}

/// Board snapshot returned by every board-scoped endpoint.
#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub status: LoadState,
    pub board: Option<BoardState>,
    pub notifications: Vec<Notification>,
    /// Operation-specific payload: a created entity or a drag outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

fn respond<T: Serialize>(
    controller: &mut BoardController,
    result: BoardResult<T>,
) -> ApiResult<Json<BoardResponse>> {
    let notifications = controller.take_notifications();
    match result {
        Ok(value) => Ok(Json(BoardResponse {
            status: controller.load_state().clone(),
            board: controller.state().cloned(),
            notifications,
            result: serde_json::to_value(value).ok().filter(|v| !v.is_null()),
        })),
        Err(err) => Err(ApiError::from(err).with_notifications(notifications)),
    }
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Deserialize)]
struct OwnerQuery {
    owner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewBoard {
    title: String,
    owner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TitleBody {
    title: String,
}

#[derive(Debug, Deserialize)]
struct NewTask {
    title: String,
    description: Option<String>,
}

/// Omitted fields keep their current value; an empty description clears it.
#[derive(Debug, Deserialize)]
struct TaskPatch {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DragEnd {
    #[serde(default)]
    over: Option<DragItem>,
}

#[derive(Debug, Deserialize)]
struct NewTag {
    name: String,
    color: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_boards(
    State(server): State<ApiServer>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<Vec<Board>>> {
    let owner = query.owner.unwrap_or_else(|| server.default_owner.clone());
    Ok(Json(server.directory.list_boards(&owner).await?))
}

async fn create_board(
    State(server): State<ApiServer>,
    Json(body): Json<NewBoard>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    let owner = body.owner.unwrap_or_else(|| server.default_owner.clone());
    let board = server.directory.create_board(&owner, &body.title).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

/// Reload a board from storage, unless a gesture is in flight on it.
async fn get_board(
    State(server): State<ApiServer>,
    Path(board_id): Path<String>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let result = if board.is_dragging() {
        Ok(())
    } else {
        board.refresh().await.map(|_| ())
    };
    respond(&mut board, result)
}

async fn rename_board(
    State(server): State<ApiServer>,
    Path(board_id): Path<String>,
    Json(body): Json<TitleBody>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let result = board.rename_board(&body.title).await;
    respond(&mut board, result)
}

async fn add_column(
    State(server): State<ApiServer>,
    Path(board_id): Path<String>,
    Json(body): Json<TitleBody>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let result = board.add_column(&body.title).await;
    respond(&mut board, result)
}

async fn rename_column(
    State(server): State<ApiServer>,
    Path((board_id, column_id)): Path<(String, String)>,
    Json(body): Json<TitleBody>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let result = board.rename_column(&column_id, &body.title).await;
    respond(&mut board, result)
}

async fn delete_column(
    State(server): State<ApiServer>,
    Path((board_id, column_id)): Path<(String, String)>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let result = board.delete_column(&column_id).await;
    respond(&mut board, result)
}

async fn add_task(
    State(server): State<ApiServer>,
    Path((board_id, column_id)): Path<(String, String)>,
    Json(body): Json<NewTask>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let result = match board.add_task(&column_id, &body.title).await {
        Ok(task) => match body.description.as_deref() {
            Some(description) => board
                .update_task(&task.id, &task.title, Some(description))
                .await
                .map(|()| {
                    board
                        .state()
                        .and_then(|s| s.task(&task.id))
                        .cloned()
                        .unwrap_or(task)
                }),
            None => Ok(task),
        },
        Err(err) => Err(err),
    };
    respond(&mut board, result)
}

async fn update_task(
    State(server): State<ApiServer>,
    Path((board_id, task_id)): Path<(String, String)>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let current = board
        .state()
        .and_then(|s| s.task(&task_id))
        .cloned()
        .ok_or_else(|| ApiError::from(BoardError::not_found("task", &task_id)))?;

    let title = patch.title.unwrap_or(current.title);
    let description = patch.description.or(current.description);
    let result = board
        .update_task(&task_id, &title, description.as_deref())
        .await;
    respond(&mut board, result)
}

async fn delete_task(
    State(server): State<ApiServer>,
    Path((board_id, task_id)): Path<(String, String)>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let result = board.delete_task(&task_id).await;
    respond(&mut board, result)
}

async fn attach_tag(
    State(server): State<ApiServer>,
    Path((board_id, task_id, tag_id)): Path<(String, String, String)>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let result = board.attach_tag(&task_id, &tag_id).await;
    respond(&mut board, result)
}

async fn detach_tag(
    State(server): State<ApiServer>,
    Path((board_id, task_id, tag_id)): Path<(String, String, String)>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let result = board.detach_tag(&task_id, &tag_id).await;
    respond(&mut board, result)
}

async fn drag_start(
    State(server): State<ApiServer>,
    Path(board_id): Path<String>,
    Json(item): Json<DragItem>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let result = board.drag_start(item);
    respond(&mut board, result)
}

async fn drag_over(
    State(server): State<ApiServer>,
    Path(board_id): Path<String>,
    Json(over): Json<DragItem>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    board.drag_over(&over);
    respond(&mut board, Ok(()))
}

async fn drag_end(
    State(server): State<ApiServer>,
    Path(board_id): Path<String>,
    Json(body): Json<DragEnd>,
) -> ApiResult<Json<BoardResponse>> {
    let mut board = server.board(&board_id).await?;
    let result = board.drag_end(body.over).await;
    respond(&mut board, result)
}

async fn list_tags(State(server): State<ApiServer>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(server.directory.list_tags().await?))
}

async fn create_tag(
    State(server): State<ApiServer>,
    Json(body): Json<NewTag>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    let tag = server.directory.create_tag(&body.name, &body.color).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// Build the router with all routes.
pub fn build_router(state: ApiServer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/boards", get(list_boards).post(create_board))
        .route("/api/boards/{board_id}", get(get_board).patch(rename_board))
        .route("/api/boards/{board_id}/columns", post(add_column))
        .route(
            "/api/boards/{board_id}/columns/{column_id}",
            patch(rename_column).delete(delete_column),
        )
        .route(
            "/api/boards/{board_id}/columns/{column_id}/tasks",
            post(add_task),
        )
        .route(
            "/api/boards/{board_id}/tasks/{task_id}",
            patch(update_task).delete(delete_task),
        )
        .route(
            "/api/boards/{board_id}/tasks/{task_id}/tags/{tag_id}",
            post(attach_tag).delete(detach_tag),
        )
        .route("/api/boards/{board_id}/drag/start", post(drag_start))
        .route("/api/boards/{board_id}/drag/over", post(drag_over))
        .route("/api/boards/{board_id}/drag/end", post(drag_end))
        .route("/api/tags", get(list_tags).post(create_tag))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the specified port.
///
/// Returns a oneshot sender that can be used to signal shutdown,
/// and the actual address the server is bound to.
pub async fn start_server(
    state: ApiServer,
    port: u16,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Board API listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Board API shutting down");
            })
            .await
        {
            tracing::error!("Board API server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
