pub mod http;

pub use http::BackendClient;

use crate::error::ReconcileResult;
use crate::models::{LineItem, MatchCandidate, Order, OrderSummary, SavedOrder};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// 暂存待上传的单据文件
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 上传回执
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub filename: String,
}

/// 单据通道: 上传 -> 抽取 -> 匹配 三个上游调用
/// 文本抽取与相似度打分都发生在上游, 本服务只消费结果
#[async_trait]
pub trait DocumentGateway: Send + Sync {
    async fn upload(&self, file: &StagedFile) -> ReconcileResult<UploadReceipt>;

    async fn extract(&self, filename: &str) -> ReconcileResult<Vec<LineItem>>;

    async fn match_items(
        &self,
        item_names: &[String],
    ) -> ReconcileResult<HashMap<String, Vec<MatchCandidate>>>;
}

/// 产品目录来源, 每个会话拉取一次
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> ReconcileResult<Vec<String>>;
}

/// 订单持久化
/// 不保证幂等, 去重由调用方负责
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn save_order(&self, order: &Order) -> ReconcileResult<SavedOrder>;

    async fn list_orders(&self) -> ReconcileResult<Vec<OrderSummary>>;

    async fn get_order(&self, id: i64) -> ReconcileResult<Order>;
}
