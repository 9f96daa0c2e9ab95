use crate::client::{BackendClient, CatalogSource, OrderStore};
use crate::error::ReconcileError;
use crate::service::{CatalogIndex, SessionWorkflow, SubmitOutcome, DEFAULT_SEARCH_LIMIT};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// 共享状态: 上游客户端 + 会话注册表
/// 一个打开的单据对应一个工作流实例, 会话之间互不可见
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<BackendClient>,
    pub sessions: Arc<DashMap<Uuid, Arc<SessionWorkflow<BackendClient>>>>,
}

impl AppState {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self {
            backend,
            sessions: Arc::new(DashMap::new()),
        }
    }
}

/// 通用响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub success: bool,
    pub message: String,
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct StageFileQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub item: String,
    pub candidate: String,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub item: String,
    pub chosen: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
}

/// 错误分类 -> 状态码
/// 本地操作错误按语义映射, 上游协作方失败统一 502
fn status_for(err: &ReconcileError) -> StatusCode {
    match err {
        ReconcileError::Validation(_) => StatusCode::BAD_REQUEST,
        ReconcileError::NotFound(_) => StatusCode::NOT_FOUND,
        ReconcileError::Conflict(_) => StatusCode::CONFLICT,
        ReconcileError::Transport(_)
        | ReconcileError::Extraction(_)
        | ReconcileError::MatchService(_)
        | ReconcileError::Persistence(_) => StatusCode::BAD_GATEWAY,
        ReconcileError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: ReconcileError) -> Response {
    let response = ApiResponse {
        success: false,
        message: format!("Error: {}", err),
    };
    (status_for(&err), Json(response)).into_response()
}

fn ok_response(message: impl Into<String>) -> Response {
    let response = ApiResponse {
        success: true,
        message: message.into(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

fn session(
    state: &AppState,
    id: Uuid,
) -> Result<Arc<SessionWorkflow<BackendClient>>, Response> {
    state
        .sessions
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| error_response(ReconcileError::NotFound(format!("session {}", id))))
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 开启评审会话, 目录在此时拉取一次, 会话内只读共享
pub async fn create_session(State(state): State<AppState>) -> Response {
    let products = match state.backend.fetch_catalog().await {
        Ok(products) => products,
        Err(e) => return error_response(e),
    };
    let catalog = CatalogIndex::new(products);
    let workflow = Arc::new(SessionWorkflow::new(state.backend.clone(), catalog.clone()));

    let id = Uuid::new_v4();
    state.sessions.insert(id, workflow);
    info!("session {}: created, catalog holds {} products", id, catalog.len());
    let response = CreateSessionResponse {
        success: true,
        message: "session created".to_string(),
        session_id: id,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// 暂存单据文件, 同时清空上一轮的派生状态
pub async fn stage_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StageFileQuery>,
    body: Bytes,
) -> Response {
    let workflow = match session(&state, id) {
        Ok(workflow) => workflow,
        Err(resp) => return resp,
    };
    workflow.select_file(&query.name, body.to_vec()).await;
    ok_response(format!("staged {}", query.name))
}

/// 跑一轮 上传 -> 抽取 -> 匹配
pub async fn submit(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let workflow = match session(&state, id) {
        Ok(workflow) => workflow,
        Err(resp) => return resp,
    };
    match workflow.submit().await {
        Ok(SubmitOutcome::Ready) => ok_response("ready for review"),
        Ok(SubmitOutcome::Superseded) => {
            let response = ApiResponse {
                success: false,
                message: "submission superseded by a newer file".to_string(),
            };
            (StatusCode::CONFLICT, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// 会话快照: 阶段 + 视图行 + 候选列表
pub async fn session_state(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let workflow = match session(&state, id) {
        Ok(workflow) => workflow,
        Err(resp) => return resp,
    };
    (StatusCode::OK, Json(workflow.snapshot().await)).into_response()
}

/// 下拉选择
pub async fn select_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectRequest>,
) -> Response {
    let workflow = match session(&state, id) {
        Ok(workflow) => workflow,
        Err(resp) => return resp,
    };
    match workflow.select_candidate(&req.item, &req.candidate).await {
        Ok(()) => ok_response(format!("selected {} for {}", req.candidate, req.item)),
        Err(e) => error_response(e),
    }
}

/// 人工覆盖 (目录搜索确认)
pub async fn manual_override(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OverrideRequest>,
) -> Response {
    let workflow = match session(&state, id) {
        Ok(workflow) => workflow,
        Err(resp) => return resp,
    };
    match workflow.apply_manual_override(&req.item, &req.chosen).await {
        Ok(()) => ok_response(format!("overrode {} with {}", req.item, req.chosen)),
        Err(e) => error_response(e),
    }
}

/// 目录搜索
pub async fn search_catalog(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let workflow = match session(&state, id) {
        Ok(workflow) => workflow,
        Err(resp) => return resp,
    };
    let results =
        workflow.search_catalog(&query.q, query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
    (StatusCode::OK, Json(SearchResponse { results })).into_response()
}

/// CSV 投影下载
pub async fn export_csv(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let workflow = match session(&state, id) {
        Ok(workflow) => workflow,
        Err(resp) => return resp,
    };
    match workflow.export_csv().await {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// 组装订单载荷并提交上游持久化
pub async fn export_order(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let workflow = match session(&state, id) {
        Ok(workflow) => workflow,
        Err(resp) => return resp,
    };
    let order = match workflow.export_order().await {
        Ok(order) => order,
        Err(e) => return error_response(e),
    };
    match state.backend.save_order(&order).await {
        Ok(saved) => {
            let response = ExportResponse {
                success: true,
                message: format!("order saved as {}", saved.id),
                id: saved.id,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// 订单列表 (看板)
pub async fn list_orders(State(state): State<AppState>) -> Response {
    match state.backend.list_orders().await {
        Ok(orders) => (
            StatusCode::OK,
            Json(serde_json::json!({ "orders": orders })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// 订单详情
pub async fn get_order(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.backend.get_order(id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => error_response(e),
    }
}
