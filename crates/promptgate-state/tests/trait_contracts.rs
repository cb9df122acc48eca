//! Trait contract tests for TemplateRegistry, GoldenDatasetStore,
//! EvaluationReportStore and DraftStore.
//!
//! These tests verify the behavioral contracts of the storage traits
//! using in-memory fakes. Any conforming implementation must pass these.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use promptgate_state::fakes::{
    MemoryDatasetStore, MemoryDraftStore, MemoryReportStore, MemoryTemplateRegistry,
};
use promptgate_state::storage_traits::*;
use promptgate_state::{
    AggregateScore, DraftAuthor, DraftContent, DraftReview, DraftStatus, EvaluationReport,
    GoldenDataset, GoldenSample, NewTemplate, ReportDraft, SampleInput, ScoreTriple,
    StorageError,
};

fn new_template(name: &str, task: &str, body: &str) -> NewTemplate {
    NewTemplate {
        name: name.to_string(),
        task: task.to_string(),
        body: body.to_string(),
        default_parameters: BTreeMap::new(),
    }
}

// ===========================================================================
// TemplateRegistry contract tests
// ===========================================================================

#[tokio::test]
async fn create_version_numbers_monotonically_per_name() {
    let registry = MemoryTemplateRegistry::new();
    let v1 = registry
        .create_version(new_template("job-analysis", "job_analysis", "a"))
        .await
        .unwrap();
    let v2 = registry
        .create_version(new_template("job-analysis", "job_analysis", "b"))
        .await
        .unwrap();
    let other = registry
        .create_version(new_template("employer-rating", "employer_rating", "c"))
        .await
        .unwrap();

    assert_eq!(v1.version, 1);
    assert_eq!(v2.version, 2);
    assert_eq!(other.version, 1);
}

#[tokio::test]
async fn create_version_leaves_only_newest_active() {
    let registry = MemoryTemplateRegistry::new();
    for body in ["a", "b", "c"] {
        registry
            .create_version(new_template("job-analysis", "job_analysis", body))
            .await
            .unwrap();
    }

    let versions = registry.versions("job-analysis").await.unwrap();
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[0].version, 3);
    let active: Vec<_> = versions.iter().filter(|t| t.active).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].version, 3);
}

#[tokio::test]
async fn activate_switches_the_single_active_version() {
    let registry = MemoryTemplateRegistry::new();
    let v1 = registry
        .create_version(new_template("job-analysis", "job_analysis", "a"))
        .await
        .unwrap();
    registry
        .create_version(new_template("job-analysis", "job_analysis", "b"))
        .await
        .unwrap();

    let activated = registry.activate(&v1.template_id).await.unwrap();
    assert!(activated.active);

    let active = registry.active_for_task("job_analysis").await.unwrap().unwrap();
    assert_eq!(active.template_id, v1.template_id);
    let versions = registry.versions("job-analysis").await.unwrap();
    assert_eq!(versions.iter().filter(|t| t.active).count(), 1);
}

#[tokio::test]
async fn activate_unknown_id_is_not_found() {
    let registry = MemoryTemplateRegistry::new();
    let err = registry.activate("missing").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn activate_does_not_touch_other_names() {
    let registry = MemoryTemplateRegistry::new();
    let job = registry
        .create_version(new_template("job-analysis", "job_analysis", "a"))
        .await
        .unwrap();
    let employer = registry
        .create_version(new_template("employer-rating", "employer_rating", "b"))
        .await
        .unwrap();

    registry.activate(&job.template_id).await.unwrap();

    let still_active = registry.get(&employer.template_id).await.unwrap().unwrap();
    assert!(still_active.active);
    assert_eq!(registry.list_active().await.unwrap().len(), 2);
}

#[tokio::test]
async fn concurrent_activations_leave_exactly_one_active() {
    let registry = Arc::new(MemoryTemplateRegistry::new());
    let mut ids = Vec::new();
    for i in 0..5 {
        let record = registry
            .create_version(new_template("job-analysis", "job_analysis", &format!("v{i}")))
            .await
            .unwrap();
        ids.push(record.template_id);
    }

    let mut handles = Vec::new();
    for id in ids {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move { registry.activate(&id).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let versions = registry.versions("job-analysis").await.unwrap();
    assert_eq!(versions.iter().filter(|t| t.active).count(), 1);
}

#[tokio::test]
async fn active_for_task_missing_is_none() {
    let registry = MemoryTemplateRegistry::new();
    assert!(registry.active_for_task("nothing").await.unwrap().is_none());
}

// ===========================================================================
// GoldenDatasetStore contract tests
// ===========================================================================

fn golden(id: &str) -> GoldenSample {
    GoldenSample {
        sample_id: format!("golden-{id}"),
        input: SampleInput {
            title: format!("Job {id}"),
            description: "desc".to_string(),
            skills: vec!["Rust".to_string()],
        },
        expected: ScoreTriple::new(5.0, 6.0, 7.0),
    }
}

#[tokio::test]
async fn dataset_load_empty_is_none() {
    let store = MemoryDatasetStore::new();
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn dataset_replace_discards_prior_set() {
    let store = MemoryDatasetStore::new();
    store
        .replace(GoldenDataset::new(vec![golden("1"), golden("2")], Utc::now()))
        .await
        .unwrap();
    let second = GoldenDataset::new(vec![golden("3")], Utc::now());
    store.replace(second.clone()).await.unwrap();

    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded, second);
    assert_eq!(loaded.len(), 1);
}

// ===========================================================================
// EvaluationReportStore contract tests
// ===========================================================================

fn report(id: &str, offset_secs: i64) -> EvaluationReport {
    EvaluationReport {
        report_id: id.to_string(),
        timestamp: Utc::now() + Duration::seconds(offset_secs),
        chosen_template: None,
        aggregate: AggregateScore::empty(),
        template_scores: Vec::new(),
        recommendations: Vec::new(),
        report_ideas: Vec::new(),
        dataset_digest: None,
    }
}

#[tokio::test]
async fn report_latest_is_greatest_timestamp() {
    let store = MemoryReportStore::new();
    store.append(report("old", -60)).await.unwrap();
    store.append(report("new", 0)).await.unwrap();
    store.append(report("older", -120)).await.unwrap();

    let latest = store.latest().await.unwrap().unwrap();
    assert_eq!(latest.report_id, "new");

    let all = store.list().await.unwrap();
    let ids: Vec<_> = all.iter().map(|r| r.report_id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old", "older"]);
}

#[tokio::test]
async fn report_append_rejects_duplicate_id() {
    let store = MemoryReportStore::new();
    store.append(report("r1", 0)).await.unwrap();
    let err = store.append(report("r1", 5)).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));

    let stored = store.get("r1").await.unwrap().unwrap();
    assert_eq!(store.list().await.unwrap().len(), 1);
    assert!(stored.timestamp <= Utc::now());
}

#[tokio::test]
async fn report_latest_empty_is_none() {
    let store = MemoryReportStore::new();
    assert!(store.latest().await.unwrap().is_none());
}

// ===========================================================================
// DraftStore contract tests
// ===========================================================================

fn content(title: &str) -> DraftContent {
    DraftContent {
        title: title.to_string(),
        description: "desc".to_string(),
        category: "Technology".to_string(),
        audience: "Freelancers".to_string(),
        insights: vec!["insight".to_string()],
        sources: vec!["Internal analytics".to_string()],
        body: "# Report".to_string(),
        estimated_demand: Some(8.0),
    }
}

fn review(status: DraftStatus) -> DraftReview {
    DraftReview {
        status,
        reviewed_at: Utc::now(),
        reviewer: Some("editor".to_string()),
        comment: None,
    }
}

async fn approved_draft(store: &MemoryDraftStore) -> ReportDraft {
    let draft = store
        .create(ReportDraft::new(
            content("AI Skills"),
            DraftAuthor::System,
            "eval-1",
            Utc::now(),
        ))
        .await
        .unwrap();
    store
        .update_status(&draft.draft_id, DraftStatus::Draft, review(DraftStatus::Review))
        .await
        .unwrap();
    store
        .update_status(
            &draft.draft_id,
            DraftStatus::Review,
            review(DraftStatus::Approved),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn draft_update_status_applies_review_stamp() {
    let store = MemoryDraftStore::new();
    let draft = store
        .create(ReportDraft::new(
            content("T"),
            DraftAuthor::Human,
            "eval-1",
            Utc::now(),
        ))
        .await
        .unwrap();

    let updated = store
        .update_status(&draft.draft_id, DraftStatus::Draft, review(DraftStatus::Review))
        .await
        .unwrap();
    assert_eq!(updated.status, DraftStatus::Review);
    assert_eq!(updated.reviewer.as_deref(), Some("editor"));
    assert!(updated.reviewed_at.is_some());
}

#[tokio::test]
async fn draft_update_status_rejects_stale_expected() {
    let store = MemoryDraftStore::new();
    let draft = approved_draft(&store).await;

    let err = store
        .update_status(
            &draft.draft_id,
            DraftStatus::Review,
            review(DraftStatus::Rejected),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::StatusConflict { .. }));

    let current = store.get(&draft.draft_id).await.unwrap().unwrap();
    assert_eq!(current.status, DraftStatus::Approved);
}

#[tokio::test]
async fn draft_update_status_missing_is_not_found() {
    let store = MemoryDraftStore::new();
    let err = store
        .update_status("missing", DraftStatus::Draft, review(DraftStatus::Review))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn draft_list_filters_by_status() {
    let store = MemoryDraftStore::new();
    approved_draft(&store).await;
    store
        .create(ReportDraft::new(
            content("Fresh"),
            DraftAuthor::System,
            "eval-1",
            Utc::now(),
        ))
        .await
        .unwrap();

    assert_eq!(store.list(None).await.unwrap().len(), 2);
    let approved = store.list(Some(DraftStatus::Approved)).await.unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].content.title, "AI Skills");
}

#[tokio::test]
async fn publish_requires_approved() {
    let store = MemoryDraftStore::new();
    let draft = store
        .create(ReportDraft::new(
            content("T"),
            DraftAuthor::System,
            "eval-1",
            Utc::now(),
        ))
        .await
        .unwrap();

    let err = store
        .publish(&draft.draft_id, "editor", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::StatusConflict { .. }));
    assert!(store.list_reports().await.unwrap().is_empty());
}

#[tokio::test]
async fn publish_stamps_draft_and_creates_report() {
    let store = MemoryDraftStore::new();
    let draft = approved_draft(&store).await;

    let published = store
        .publish(&draft.draft_id, "editor", Utc::now())
        .await
        .unwrap();
    assert_eq!(published.draft_id, draft.draft_id);
    assert_eq!(published.content, draft.content);

    let stored = store.get(&draft.draft_id).await.unwrap().unwrap();
    assert_eq!(stored.status, DraftStatus::Published);
    assert_eq!(stored.published_by.as_deref(), Some("editor"));
    assert!(stored.published_at.is_some());

    let fetched = store.get_report(&published.report_id).await.unwrap().unwrap();
    assert_eq!(fetched, published);
}

#[tokio::test]
async fn concurrent_publish_creates_exactly_one_report() {
    let store = Arc::new(MemoryDraftStore::new());
    let draft = approved_draft(&store).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        let id = draft.draft_id.clone();
        handles.push(tokio::spawn(async move {
            store.publish(&id, &format!("editor-{i}"), Utc::now()).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert!(matches!(err, StorageError::StatusConflict { .. })),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(store.list_reports().await.unwrap().len(), 1);
}
