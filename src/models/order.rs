use crate::models::ReconciliationRow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 导出成功后生成的销售订单, 生成后不可变
/// 行数据在载荷里叫 "data", 与订单服务的存量接口保持一致
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub filename: String,
    #[serde(rename = "data")]
    pub rows: Vec<ReconciliationRow>,
    pub upload_date: DateTime<Utc>,
}

/// 订单列表摘要 (看板视图)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: i64,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
}

/// 订单保存回执
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedOrder {
    pub id: i64,
}
