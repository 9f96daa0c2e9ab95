use crate::error::{ReconcileError, ReconcileResult};
use crate::models::{Order, ReconciliationRow};
use chrono::{DateTime, Utc};

/// CSV 表头, 与下游订单模板字段对齐; 表头行不加引号
pub const CSV_HEADER: &str = "Request Item,Amount,Selected Match,Match Score";

/// 导出 CSV 文本
/// 表头一行 + 每行四个字段全部加引号, \n 分隔, 无结尾换行;
/// 相同输入必须产出字节一致的文本
pub fn to_csv(rows: &[ReconciliationRow]) -> ReconcileResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    for row in rows {
        let amount = row.amount.to_string();
        writer.write_record([
            row.request_item.as_str(),
            amount.as_str(),
            row.selected.as_str(),
            row.score.as_str(),
        ])?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| ReconcileError::Export(e.to_string()))?;
    let body = String::from_utf8(body).map_err(|e| ReconcileError::Export(e.to_string()))?;

    let mut out = String::with_capacity(CSV_HEADER.len() + body.len() + 1);
    out.push_str(CSV_HEADER);
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body.trim_end_matches('\n'));
    }
    Ok(out)
}

/// 组装订单载荷 (纯变换)
/// 持久化调用由上游 OrderStore 负责, 这里只打包
pub fn to_order_payload(
    filename: &str,
    rows: Vec<ReconciliationRow>,
    upload_date: DateTime<Utc>,
) -> Order {
    Order {
        filename: filename.to_string(),
        rows,
        upload_date,
    }
}
