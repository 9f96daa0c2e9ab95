use crate::client::{CatalogSource, DocumentGateway, OrderStore, StagedFile, UploadReceipt};
use crate::error::{ReconcileError, ReconcileResult};
use crate::models::{LineItem, MatchCandidate, Order, OrderSummary, SavedOrder};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 上游单据服务 HTTP 客户端
/// 上传/抽取/匹配/目录/订单 走同一个后端, JSON 收发
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    filename: &'a str,
}

#[derive(Debug, Serialize)]
struct MatchRequest<'a> {
    items: &'a [String],
}

#[derive(Debug, Deserialize)]
struct MatchResponse {
    results: HashMap<String, Vec<MatchCandidate>>,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    products: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OrdersResponse {
    orders: Vec<OrderSummary>,
}

impl BackendClient {
    pub fn new(base_url: &str) -> ReconcileResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ReconcileError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// 尽力读取上游错误正文, 读不到也不二次报错
async fn error_body(resp: reqwest::Response) -> String {
    resp.text()
        .await
        .unwrap_or_else(|_| "<no response body>".to_string())
}

#[async_trait]
impl DocumentGateway for BackendClient {
    async fn upload(&self, file: &StagedFile) -> ReconcileResult<UploadReceipt> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone());
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;

        match resp.status() {
            status if status.is_success() => resp
                .json::<UploadReceipt>()
                .await
                .map_err(|e| ReconcileError::Validation(format!("upload response shape: {}", e))),
            // 上游用 4xx 表达不支持的文件类型等输入问题
            StatusCode::BAD_REQUEST | StatusCode::UNSUPPORTED_MEDIA_TYPE => {
                Err(ReconcileError::Validation(error_body(resp).await))
            }
            status => Err(ReconcileError::Transport(format!(
                "upload failed with status {}: {}",
                status,
                error_body(resp).await
            ))),
        }
    }

    async fn extract(&self, filename: &str) -> ReconcileResult<Vec<LineItem>> {
        let resp = self
            .http
            .post(self.url("/extract"))
            .json(&ExtractRequest { filename })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ReconcileError::Extraction(format!(
                "extract failed with status {}: {}",
                resp.status(),
                error_body(resp).await
            )));
        }
        resp.json::<Vec<LineItem>>()
            .await
            .map_err(|e| ReconcileError::Validation(format!("extract response shape: {}", e)))
    }

    async fn match_items(
        &self,
        item_names: &[String],
    ) -> ReconcileResult<HashMap<String, Vec<MatchCandidate>>> {
        let resp = self
            .http
            .post(self.url("/local_match"))
            .json(&MatchRequest { items: item_names })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ReconcileError::MatchService(format!(
                "match failed with status {}: {}",
                resp.status(),
                error_body(resp).await
            )));
        }
        let body: MatchResponse = resp
            .json()
            .await
            .map_err(|e| ReconcileError::Validation(format!("match response shape: {}", e)))?;
        Ok(body.results)
    }
}

#[async_trait]
impl CatalogSource for BackendClient {
    async fn fetch_catalog(&self) -> ReconcileResult<Vec<String>> {
        let resp = self.http.get(self.url("/get_catalog")).send().await?;
        if !resp.status().is_success() {
            return Err(ReconcileError::Transport(format!(
                "catalog fetch failed with status {}",
                resp.status()
            )));
        }
        let body: CatalogResponse = resp
            .json()
            .await
            .map_err(|e| ReconcileError::Validation(format!("catalog response shape: {}", e)))?;
        Ok(body.products)
    }
}

#[async_trait]
impl OrderStore for BackendClient {
    async fn save_order(&self, order: &Order) -> ReconcileResult<SavedOrder> {
        let resp = self
            .http
            .post(self.url("/save_order"))
            .json(order)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ReconcileError::Persistence(format!(
                "save order failed with status {}: {}",
                resp.status(),
                error_body(resp).await
            )));
        }
        resp.json::<SavedOrder>()
            .await
            .map_err(|e| ReconcileError::Validation(format!("save order response shape: {}", e)))
    }

    async fn list_orders(&self) -> ReconcileResult<Vec<OrderSummary>> {
        let resp = self.http.get(self.url("/get_orders")).send().await?;
        if !resp.status().is_success() {
            return Err(ReconcileError::Persistence(format!(
                "list orders failed with status {}",
                resp.status()
            )));
        }
        let body: OrdersResponse = resp
            .json()
            .await
            .map_err(|e| ReconcileError::Validation(format!("orders response shape: {}", e)))?;
        Ok(body.orders)
    }

    async fn get_order(&self, id: i64) -> ReconcileResult<Order> {
        let resp = self
            .http
            .get(self.url(&format!("/get_order/{}", id)))
            .send()
            .await?;

        match resp.status() {
            status if status.is_success() => resp
                .json::<Order>()
                .await
                .map_err(|e| ReconcileError::Validation(format!("order response shape: {}", e))),
            StatusCode::NOT_FOUND => Err(ReconcileError::NotFound(format!("order {}", id))),
            status => Err(ReconcileError::Persistence(format!(
                "get order failed with status {}",
                status
            ))),
        }
    }
}
