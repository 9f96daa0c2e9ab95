use axum::{
    routing::{get, post, put},
    Router,
};
use po_reconcile_rust::{api, AppConfig, BackendClient};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    // 上游单据服务客户端 (上传/抽取/匹配/目录/订单共用)
    let backend = Arc::new(BackendClient::new(&config.backend.url)?);
    let state = api::AppState::new(backend);

    // 构建路由
    let app = Router::new()
        .route("/health", get(api::health_check))
        .route("/api/session", post(api::create_session))
        .route("/api/session/:id", get(api::session_state))
        .route("/api/session/:id/file", put(api::stage_file))
        .route("/api/session/:id/submit", post(api::submit))
        .route("/api/session/:id/select", post(api::select_candidate))
        .route("/api/session/:id/override", post(api::manual_override))
        .route("/api/session/:id/search", get(api::search_catalog))
        .route("/api/session/:id/export.csv", get(api::export_csv))
        .route("/api/session/:id/export", post(api::export_order))
        .route("/api/orders", get(api::list_orders))
        .route("/api/orders/:id", get(api::get_order))
        .with_state(state)
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/session                 - open a review session");
    info!("  PUT  /api/session/:id/file        - stage a document");
    info!("  POST /api/session/:id/submit      - upload -> extract -> match");
    info!("  GET  /api/session/:id             - phase + reconciliation rows");
    info!("  POST /api/session/:id/select      - dropdown selection");
    info!("  POST /api/session/:id/override    - manual catalog override");
    info!("  GET  /api/session/:id/search      - catalog search");
    info!("  GET  /api/session/:id/export.csv  - CSV projection");
    info!("  POST /api/session/:id/export      - persist reconciled order");
    info!("  GET  /api/orders                  - order dashboard");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
