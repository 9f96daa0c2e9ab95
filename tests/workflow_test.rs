//! Session workflow integration suite
//!
//! Drives a full reconciliation cycle against an in-process fake document
//! gateway, covering:
//! 1. Happy path: upload -> extract -> match -> ready, default selections
//! 2. Step failures: pipeline stops, completed steps stay visible
//! 3. Pipeline exclusivity: a second submit is rejected mid-flight
//! 4. Stale-cycle guard: a new file supersedes an in-flight match response
//! 5. Review actions and export projections through the controller

use async_trait::async_trait;
use po_reconcile_rust::client::{DocumentGateway, StagedFile, UploadReceipt};
use po_reconcile_rust::error::{ReconcileError, ReconcileResult};
use po_reconcile_rust::models::{Amount, LineItem, MatchCandidate};
use po_reconcile_rust::service::{CatalogIndex, SessionPhase, SessionWorkflow, SubmitOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

// ─── Fixtures ──────────────────────────────────────────────────────

/// 可编程假网关: 固定返回预置数据, 各步可注入失败;
/// gate_match 打开时 match 步挂起, 等测试放行, 用来制造在途窗口
struct FakeGateway {
    items: Vec<LineItem>,
    results: HashMap<String, Vec<MatchCandidate>>,
    fail_upload: bool,
    fail_match: bool,
    gate_match: bool,
    match_entered: Notify,
    match_release: Notify,
}

impl FakeGateway {
    fn new(items: Vec<LineItem>, results: HashMap<String, Vec<MatchCandidate>>) -> Self {
        Self {
            items,
            results,
            fail_upload: false,
            fail_match: false,
            gate_match: false,
            match_entered: Notify::new(),
            match_release: Notify::new(),
        }
    }
}

#[async_trait]
impl DocumentGateway for FakeGateway {
    async fn upload(&self, file: &StagedFile) -> ReconcileResult<UploadReceipt> {
        if self.fail_upload {
            return Err(ReconcileError::Transport("upload refused".to_string()));
        }
        Ok(UploadReceipt {
            filename: file.filename.clone(),
        })
    }

    async fn extract(&self, _filename: &str) -> ReconcileResult<Vec<LineItem>> {
        Ok(self.items.clone())
    }

    async fn match_items(
        &self,
        _item_names: &[String],
    ) -> ReconcileResult<HashMap<String, Vec<MatchCandidate>>> {
        if self.gate_match {
            self.match_entered.notify_one();
            self.match_release.notified().await;
        }
        if self.fail_match {
            return Err(ReconcileError::MatchService("matcher offline".to_string()));
        }
        Ok(self.results.clone())
    }
}

fn item(name: &str, amount: i64) -> LineItem {
    LineItem {
        name: name.to_string(),
        amount: Amount::Int(amount),
    }
}

fn cand(name: &str, score: f64) -> MatchCandidate {
    MatchCandidate {
        name: name.to_string(),
        score,
    }
}

fn widget_items() -> Vec<LineItem> {
    vec![item("Widget A", 5), item("Widget B", 2)]
}

fn widget_results() -> HashMap<String, Vec<MatchCandidate>> {
    let mut results = HashMap::new();
    results.insert(
        "Widget A".to_string(),
        vec![cand("Widget A Pro", 0.97), cand("Widget A Lite", 0.91)],
    );
    results.insert("Widget B".to_string(), vec![]);
    results
}

fn catalog() -> CatalogIndex {
    CatalogIndex::new(vec![
        "Widget A Pro".to_string(),
        "Widget A Lite".to_string(),
        "Widget Z".to_string(),
    ])
}

fn workflow(gateway: FakeGateway) -> (Arc<FakeGateway>, Arc<SessionWorkflow<FakeGateway>>) {
    let gateway = Arc::new(gateway);
    let workflow = Arc::new(SessionWorkflow::new(gateway.clone(), catalog()));
    (gateway, workflow)
}

// ─── Scenarios ─────────────────────────────────────────────────────

#[tokio::test]
async fn full_pipeline_reaches_ready_with_default_selections() {
    let (_, wf) = workflow(FakeGateway::new(widget_items(), widget_results()));

    wf.select_file("po_june.pdf", b"%PDF".to_vec()).await;
    let outcome = wf.submit().await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Ready);
    assert_eq!(wf.phase().await, SessionPhase::Ready);

    let rows = wf.rows().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].request_item, "Widget A");
    assert_eq!(rows[0].amount, Amount::Int(5));
    assert_eq!(rows[0].selected, "Widget A Pro");
    assert_eq!(rows[0].score, "97.0");
    assert_eq!(rows[1].selected, "");
    assert_eq!(rows[1].score, "-");
}

#[tokio::test]
async fn upload_failure_marks_session_failed() {
    let mut gateway = FakeGateway::new(widget_items(), widget_results());
    gateway.fail_upload = true;
    let (_, wf) = workflow(gateway);

    wf.select_file("po_june.pdf", b"%PDF".to_vec()).await;
    let err = wf.submit().await.unwrap_err();
    assert!(matches!(err, ReconcileError::Transport(_)));
    assert!(matches!(wf.phase().await, SessionPhase::Failed(_)));
    assert!(wf.rows().await.is_empty());
}

#[tokio::test]
async fn match_failure_preserves_extracted_items_unmatched() {
    let mut gateway = FakeGateway::new(widget_items(), widget_results());
    gateway.fail_match = true;
    let (_, wf) = workflow(gateway);

    wf.select_file("po_june.pdf", b"%PDF".to_vec()).await;
    let err = wf.submit().await.unwrap_err();
    assert!(matches!(err, ReconcileError::MatchService(_)));
    assert!(matches!(wf.phase().await, SessionPhase::Failed(_)));

    // 抽取成果留给用户看, 未匹配的行分值只能是 "-"
    let rows = wf.rows().await;
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row.selected, "");
        assert_eq!(row.score, "-");
    }
}

#[tokio::test]
async fn submit_without_staged_file_is_rejected() {
    let (_, wf) = workflow(FakeGateway::new(widget_items(), widget_results()));
    let err = wf.submit().await.unwrap_err();
    assert!(matches!(err, ReconcileError::Validation(_)));
}

#[tokio::test]
async fn second_submit_mid_flight_is_conflict() {
    let mut gateway = FakeGateway::new(widget_items(), widget_results());
    gateway.gate_match = true;
    let (gw, wf) = workflow(gateway);

    wf.select_file("po_june.pdf", b"%PDF".to_vec()).await;
    let in_flight = tokio::spawn({
        let wf = wf.clone();
        async move { wf.submit().await }
    });
    gw.match_entered.notified().await;

    let err = wf.submit().await.unwrap_err();
    assert!(matches!(err, ReconcileError::Conflict(_)));

    gw.match_release.notify_one();
    assert_eq!(in_flight.await.unwrap().unwrap(), SubmitOutcome::Ready);
}

#[tokio::test]
async fn review_actions_are_disabled_while_matching() {
    let mut gateway = FakeGateway::new(widget_items(), widget_results());
    gateway.gate_match = true;
    let (gw, wf) = workflow(gateway);

    wf.select_file("po_june.pdf", b"%PDF".to_vec()).await;
    let in_flight = tokio::spawn({
        let wf = wf.clone();
        async move { wf.submit().await }
    });
    gw.match_entered.notified().await;

    let err = wf
        .select_candidate("Widget A", "Widget A Lite")
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Conflict(_)));
    let err = wf
        .apply_manual_override("Widget A", "Widget Z")
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Conflict(_)));

    gw.match_release.notify_one();
    in_flight.await.unwrap().unwrap();
}

#[tokio::test]
async fn new_file_during_matching_discards_stale_response() {
    let mut gateway = FakeGateway::new(widget_items(), widget_results());
    gateway.gate_match = true;
    let (gw, wf) = workflow(gateway);

    wf.select_file("po_june.pdf", b"%PDF".to_vec()).await;
    let in_flight = tokio::spawn({
        let wf = wf.clone();
        async move { wf.submit().await }
    });
    gw.match_entered.notified().await;

    // 匹配在途时换文件, 开启新一轮
    wf.select_file("po_july.pdf", b"%PDF".to_vec()).await;
    gw.match_release.notify_one();

    let outcome = in_flight.await.unwrap().unwrap();
    assert_eq!(outcome, SubmitOutcome::Superseded);

    // 迟到的匹配响应不得污染新一轮: 状态回到 Idle 且没有任何行
    let snapshot = wf.snapshot().await;
    assert_eq!(snapshot.phase, SessionPhase::Idle);
    assert_eq!(snapshot.filename.as_deref(), Some("po_july.pdf"));
    assert!(snapshot.rows.is_empty());
}

#[tokio::test]
async fn override_then_export_projects_manual_rows() {
    let (_, wf) = workflow(FakeGateway::new(widget_items(), widget_results()));

    wf.select_file("po_june.pdf", b"%PDF".to_vec()).await;
    wf.submit().await.unwrap();
    wf.apply_manual_override("Widget A", "Widget Z").await.unwrap();

    let csv = wf.export_csv().await.unwrap();
    assert_eq!(
        csv,
        "Request Item,Amount,Selected Match,Match Score\n\
         \"Widget A\",\"5\",\"Widget Z\",\"Manual\"\n\
         \"Widget B\",\"2\",\"\",\"-\""
    );
}

#[tokio::test]
async fn export_order_wraps_current_rows_with_filename() {
    let (_, wf) = workflow(FakeGateway::new(widget_items(), widget_results()));

    wf.select_file("po_june.pdf", b"%PDF".to_vec()).await;
    wf.submit().await.unwrap();
    wf.select_candidate("Widget A", "Widget A Lite").await.unwrap();

    let order = wf.export_order().await.unwrap();
    assert_eq!(order.filename, "po_june.pdf");
    assert_eq!(order.rows.len(), 2);
    assert_eq!(order.rows[0].selected, "Widget A Lite");
    assert_eq!(order.rows[0].score, "91.0");
}

#[tokio::test]
async fn export_is_rejected_before_pipeline_completes() {
    let (_, wf) = workflow(FakeGateway::new(widget_items(), widget_results()));
    wf.select_file("po_june.pdf", b"%PDF".to_vec()).await;

    let err = wf.export_csv().await.unwrap_err();
    assert!(matches!(err, ReconcileError::Conflict(_)));
}

#[tokio::test]
async fn catalog_search_is_available_in_any_phase() {
    let (_, wf) = workflow(FakeGateway::new(widget_items(), widget_results()));

    assert_eq!(
        wf.search_catalog("widget a", 10),
        vec!["Widget A Pro", "Widget A Lite"]
    );
    assert!(wf.search_catalog("", 10).is_empty());
}
