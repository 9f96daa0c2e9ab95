use crate::error::{ReconcileError, ReconcileResult};
use crate::models::{LineItem, MatchCandidate, ReconciliationRow};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// 人工覆盖行的展示分值
pub const SCORE_MANUAL: &str = "Manual";
/// 当前选择没有对应候选时的展示分值
pub const SCORE_NONE: &str = "-";

/// 对账引擎
/// 持有一轮抽取的行项目、各行候选列表、当前选择与人工覆盖标记,
/// 展示分值和导出行都由当前状态纯函数派生
#[derive(Debug, Default)]
pub struct ReconciliationEngine {
    /// 行项目, 按抽取顺序保序, name 唯一
    items: IndexMap<String, LineItem>,
    /// 行项目 -> 候选列表, 保持匹配服务返回的顺序, 从不重排
    candidates: HashMap<String, Vec<MatchCandidate>>,
    /// 行项目 -> 当前选中的目录名, 空串表示未解决
    selections: HashMap<String, String>,
    /// 被人工搜索覆盖过的行项目
    overrides: HashSet<String>,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 载入抽取结果, 整体替换上一轮数据
    /// 空集合和重名行项目直接拒绝, 拒绝时不触碰现有状态
    pub fn load_extraction(&mut self, items: Vec<LineItem>) -> ReconcileResult<()> {
        if items.is_empty() {
            return Err(ReconcileError::Validation(
                "extraction returned no line items".to_string(),
            ));
        }

        let mut staged: IndexMap<String, LineItem> = IndexMap::with_capacity(items.len());
        for item in items {
            if item.name.trim().is_empty() {
                return Err(ReconcileError::Validation(
                    "extraction returned a line item with an empty name".to_string(),
                ));
            }
            let name = item.name.clone();
            if staged.insert(name.clone(), item).is_some() {
                return Err(ReconcileError::Validation(format!(
                    "duplicate line item name: {}",
                    name
                )));
            }
        }

        self.items = staged;
        self.candidates.clear();
        self.selections.clear();
        self.overrides.clear();
        Ok(())
    }

    /// 应用匹配结果 (自动选择阶段)
    /// 每个行项目默认选中首个候选, 无候选或结果缺失则置空;
    /// 候选分值在入口处整体校验, 任一非法全部拒绝
    pub fn apply_matches(
        &mut self,
        mut results: HashMap<String, Vec<MatchCandidate>>,
    ) -> ReconcileResult<()> {
        for list in results.values() {
            for candidate in list {
                candidate.validate()?;
            }
        }

        self.candidates.clear();
        self.selections.clear();
        let names: Vec<String> = self.items.keys().cloned().collect();
        for name in names {
            let list = results.remove(&name).unwrap_or_default();
            let first = list.first().map(|c| c.name.clone()).unwrap_or_default();
            self.selections.insert(name.clone(), first);
            self.candidates.insert(name, list);
        }
        Ok(())
    }

    /// 下拉选择 (非人工搜索)
    /// 已被人工覆盖的行不允许再用下拉改动
    pub fn select_candidate(&mut self, item_name: &str, candidate_name: &str) -> ReconcileResult<()> {
        if !self.items.contains_key(item_name) {
            return Err(ReconcileError::NotFound(format!("line item {}", item_name)));
        }
        if self.overrides.contains(item_name) {
            return Err(ReconcileError::Conflict(format!(
                "line item {} was overridden manually",
                item_name
            )));
        }
        self.selections
            .insert(item_name.to_string(), candidate_name.to_string());
        Ok(())
    }

    /// 人工覆盖: 选择来自目录搜索, 不要求出现在候选列表中
    pub fn apply_manual_override(&mut self, item_name: &str, chosen_name: &str) -> ReconcileResult<()> {
        if !self.items.contains_key(item_name) {
            return Err(ReconcileError::NotFound(format!("line item {}", item_name)));
        }
        self.selections
            .insert(item_name.to_string(), chosen_name.to_string());
        self.overrides.insert(item_name.to_string());
        Ok(())
    }

    /// 派生单行视图 (纯读)
    pub fn derive_row(&self, item_name: &str) -> ReconcileResult<ReconciliationRow> {
        let item = self
            .items
            .get(item_name)
            .ok_or_else(|| ReconcileError::NotFound(format!("line item {}", item_name)))?;
        Ok(self.row_for(item))
    }

    /// 全部视图行, 按抽取顺序
    pub fn all_rows(&self) -> Vec<ReconciliationRow> {
        self.items.values().map(|item| self.row_for(item)).collect()
    }

    /// 行项目 -> 候选列表 (展示层渲染下拉用)
    pub fn candidates(&self) -> &HashMap<String, Vec<MatchCandidate>> {
        &self.candidates
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// 整体清空 (选择新文件时调用, 调用方视角原子)
    pub fn clear(&mut self) {
        self.items.clear();
        self.candidates.clear();
        self.selections.clear();
        self.overrides.clear();
    }

    fn row_for(&self, item: &LineItem) -> ReconciliationRow {
        let selected = self
            .selections
            .get(&item.name)
            .cloned()
            .unwrap_or_default();
        let score = if self.overrides.contains(&item.name) {
            SCORE_MANUAL.to_string()
        } else {
            self.candidates
                .get(&item.name)
                .and_then(|list| list.iter().find(|c| c.name == selected))
                .map(|c| format!("{:.1}", c.score * 100.0))
                .unwrap_or_else(|| SCORE_NONE.to_string())
        };
        ReconciliationRow {
            request_item: item.name.clone(),
            amount: item.amount.clone(),
            selected,
            score,
        }
    }
}
