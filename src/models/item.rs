use crate::error::{ReconcileError, ReconcileResult};
use serde::{Deserialize, Serialize};

/// 抽取服务返回的请求行项目
/// 字段名沿用上游约定: "Request Item" / "Amount"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "Request Item")]
    pub name: String,
    #[serde(rename = "Amount")]
    pub amount: Amount,
}

/// 数量字段: 上游可能给数字也可能给字符串, 全程原样透传
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Amount::Int(v) => write!(f, "{}", v),
            Amount::Float(v) => write!(f, "{}", v),
            Amount::Text(v) => write!(f, "{}", v),
        }
    }
}

/// 目录候选匹配项 (模糊匹配服务给出)
/// 字段名沿用上游约定: "match" / "score"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    #[serde(rename = "match")]
    pub name: String,
    pub score: f64,
}

impl MatchCandidate {
    /// 置信度必须落在 [0,1], 入口处校验
    pub fn validate(&self) -> ReconcileResult<()> {
        if !self.score.is_finite() || !(0.0..=1.0).contains(&self.score) {
            return Err(ReconcileError::Validation(format!(
                "candidate {} has invalid score {}",
                self.name, self.score
            )));
        }
        Ok(())
    }
}
