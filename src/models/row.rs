use crate::models::Amount;
use serde::{Deserialize, Serialize};

/// 对账视图行 (派生数据, 不持有状态)
/// score 三态: 百分比文本 / "Manual" / "-"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRow {
    pub request_item: String,
    pub amount: Amount,
    pub selected: String,
    pub score: String,
}
