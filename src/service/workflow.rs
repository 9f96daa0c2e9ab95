use crate::client::{DocumentGateway, StagedFile};
use crate::error::{ReconcileError, ReconcileResult};
use crate::models::{MatchCandidate, Order, ReconciliationRow};
use crate::service::catalog::CatalogIndex;
use crate::service::engine::ReconciliationEngine;
use crate::service::export;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// 会话所处的流水线阶段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "cause", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Uploading,
    Extracting,
    Matching,
    Ready,
    Failed(String),
}

/// submit 的终态: 正常完成, 或中途被新一轮文件选择取代
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ready,
    Superseded,
}

/// 会话状态快照, 供展示层一次取全
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub phase: SessionPhase,
    pub filename: Option<String>,
    pub rows: Vec<ReconciliationRow>,
    pub candidates: HashMap<String, Vec<MatchCandidate>>,
}

/// 会话内部状态
/// 临界区只做内存读写, 从不跨上游调用持锁
#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    staged: Option<StagedFile>,
    /// 上传回执里的文件名
    filename: Option<String>,
    engine: ReconciliationEngine,
    /// 单调递增的轮次号, 迟到的上游响应按它丢弃
    cycle: u64,
}

/// 会话工作流控制器
/// 串行驱动 上传 -> 抽取 -> 匹配, 每次只允许一条流水线在途;
/// 选择新文件开启新一轮并使在途响应全部失效
pub struct SessionWorkflow<G> {
    gateway: Arc<G>,
    catalog: CatalogIndex,
    state: Mutex<SessionState>,
}

impl<G: DocumentGateway> SessionWorkflow<G> {
    pub fn new(gateway: Arc<G>, catalog: CatalogIndex) -> Self {
        Self {
            gateway,
            catalog,
            state: Mutex::new(SessionState {
                phase: SessionPhase::Idle,
                staged: None,
                filename: None,
                engine: ReconciliationEngine::new(),
                cycle: 0,
            }),
        }
    }

    /// 暂存一个新文件: 清空全部派生状态并开启新一轮
    pub async fn select_file(&self, filename: &str, bytes: Vec<u8>) {
        let mut state = self.state.lock().await;
        state.cycle += 1;
        state.phase = SessionPhase::Idle;
        state.staged = Some(StagedFile {
            filename: filename.to_string(),
            bytes,
        });
        state.filename = None;
        state.engine.clear();
        info!("cycle {}: staged file {}", state.cycle, filename);
    }

    /// 跑一轮 上传 -> 抽取 -> 匹配
    /// 只允许从 Idle 发起; 每步完成后重新拿锁并核对轮次,
    /// 轮次不符说明已被新文件取代, 丢弃响应不落状态
    pub async fn submit(&self) -> ReconcileResult<SubmitOutcome> {
        // 1. 校验状态并进入 Uploading
        let (cycle, file) = {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Idle {
                return Err(ReconcileError::Conflict(format!(
                    "submit rejected while pipeline is in {:?}",
                    state.phase
                )));
            }
            let Some(file) = state.staged.clone() else {
                return Err(ReconcileError::Validation("no file staged".to_string()));
            };
            state.phase = SessionPhase::Uploading;
            (state.cycle, file)
        };
        info!("cycle {}: uploading {}", cycle, file.filename);

        // 2. 上传
        let receipt = match self.gateway.upload(&file).await {
            Ok(receipt) => receipt,
            Err(e) => return self.fail_step(cycle, e).await,
        };
        {
            let mut state = self.state.lock().await;
            if state.cycle != cycle {
                return Ok(SubmitOutcome::Superseded);
            }
            state.filename = Some(receipt.filename.clone());
            state.phase = SessionPhase::Extracting;
        }

        // 3. 抽取
        let items = match self.gateway.extract(&receipt.filename).await {
            Ok(items) => items,
            Err(e) => return self.fail_step(cycle, e).await,
        };
        let item_names: Vec<String> = items.iter().map(|i| i.name.clone()).collect();
        {
            let mut state = self.state.lock().await;
            if state.cycle != cycle {
                return Ok(SubmitOutcome::Superseded);
            }
            if let Err(e) = state.engine.load_extraction(items) {
                state.phase = SessionPhase::Failed(e.to_string());
                return Err(e);
            }
            state.phase = SessionPhase::Matching;
        }
        info!("cycle {}: extracted {} line items", cycle, item_names.len());

        // 4. 匹配
        let results = match self.gateway.match_items(&item_names).await {
            Ok(results) => results,
            Err(e) => return self.fail_step(cycle, e).await,
        };
        let mut state = self.state.lock().await;
        if state.cycle != cycle {
            warn!(
                "cycle {}: match response discarded, current cycle is {}",
                cycle, state.cycle
            );
            return Ok(SubmitOutcome::Superseded);
        }
        if let Err(e) = state.engine.apply_matches(results) {
            state.phase = SessionPhase::Failed(e.to_string());
            return Err(e);
        }
        state.phase = SessionPhase::Ready;
        info!("cycle {}: ready for review", cycle);
        Ok(SubmitOutcome::Ready)
    }

    /// 某一步上游调用失败
    /// 轮次仍有效就记下失败原因, 已完成步骤的状态原样保留;
    /// 轮次失效则按取代处理, 什么都不写
    async fn fail_step(&self, cycle: u64, err: ReconcileError) -> ReconcileResult<SubmitOutcome> {
        let mut state = self.state.lock().await;
        if state.cycle != cycle {
            warn!(
                "cycle {}: failure discarded ({}), current cycle is {}",
                cycle, err, state.cycle
            );
            return Ok(SubmitOutcome::Superseded);
        }
        warn!("cycle {}: pipeline failed: {}", cycle, err);
        state.phase = SessionPhase::Failed(err.to_string());
        Err(err)
    }

    /// 评审操作门槛: Ready, 或失败但已有抽取结果可看
    fn ensure_reviewable(state: &SessionState) -> ReconcileResult<()> {
        match &state.phase {
            SessionPhase::Ready => Ok(()),
            SessionPhase::Failed(_) if state.engine.has_items() => Ok(()),
            phase => Err(ReconcileError::Conflict(format!(
                "review operation not allowed while pipeline is in {:?}",
                phase
            ))),
        }
    }

    /// 下拉选择
    pub async fn select_candidate(&self, item: &str, candidate: &str) -> ReconcileResult<()> {
        let mut state = self.state.lock().await;
        Self::ensure_reviewable(&state)?;
        state.engine.select_candidate(item, candidate)
    }

    /// 人工覆盖 (目录搜索弹窗的确认动作)
    pub async fn apply_manual_override(&self, item: &str, chosen: &str) -> ReconcileResult<()> {
        let mut state = self.state.lock().await;
        Self::ensure_reviewable(&state)?;
        state.engine.apply_manual_override(item, chosen)
    }

    /// 目录搜索; 目录只读共享, 不进临界区
    pub fn search_catalog(&self, query: &str, limit: usize) -> Vec<String> {
        self.catalog.search(query, limit)
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase.clone()
    }

    pub async fn rows(&self) -> Vec<ReconciliationRow> {
        self.state.lock().await.engine.all_rows()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            phase: state.phase.clone(),
            filename: state.staged.as_ref().map(|f| f.filename.clone()),
            rows: state.engine.all_rows(),
            candidates: state.engine.candidates().clone(),
        }
    }

    /// 当前视图行的 CSV 投影
    pub async fn export_csv(&self) -> ReconcileResult<String> {
        let state = self.state.lock().await;
        Self::ensure_reviewable(&state)?;
        export::to_csv(&state.engine.all_rows())
    }

    /// 组装待持久化的订单载荷, 保存动作由调用方走 OrderStore
    pub async fn export_order(&self) -> ReconcileResult<Order> {
        let state = self.state.lock().await;
        Self::ensure_reviewable(&state)?;
        let filename = state
            .filename
            .clone()
            .or_else(|| state.staged.as_ref().map(|f| f.filename.clone()))
            .ok_or_else(|| ReconcileError::Validation("no document in session".to_string()))?;
        Ok(export::to_order_payload(
            &filename,
            state.engine.all_rows(),
            Utc::now(),
        ))
    }
}
