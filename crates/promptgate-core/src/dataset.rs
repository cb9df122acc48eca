//! Reference Dataset Manager.
//!
//! Builds the golden dataset from verified source records. A build always
//! replaces the stored dataset wholesale.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use promptgate_state::{GoldenDataset, GoldenDatasetStore, GoldenSample, SampleInput, SourceRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::Result;

/// Outcome of [`ReferenceDatasetManager::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetBuildSummary {
    pub dataset: GoldenDataset,
    /// Source records dropped because they carry no reference ratings.
    pub skipped: usize,
}

/// Sample id for a source record.
pub fn golden_sample_id(source_id: &str) -> String {
    format!("golden-{source_id}")
}

/// Select up to `sample_size` rated records, in input order.
pub fn select_samples(records: &[SourceRecord], sample_size: usize) -> (Vec<GoldenSample>, usize) {
    let mut samples = Vec::new();
    let mut skipped = 0;

    for record in records {
        let Some(expected) = record.ratings else {
            skipped += 1;
            debug!(source_id = %record.id, "skipping source record without ratings");
            continue;
        };
        if samples.len() >= sample_size {
            continue;
        }
        samples.push(GoldenSample {
            sample_id: golden_sample_id(&record.id),
            input: SampleInput {
                title: record.title.clone(),
                description: record.description.clone(),
                skills: record.skills.clone(),
            },
            expected,
        });
    }

    (samples, skipped)
}

pub struct ReferenceDatasetManager {
    store: Arc<dyn GoldenDatasetStore>,
}

impl ReferenceDatasetManager {
    pub fn new(store: Arc<dyn GoldenDatasetStore>) -> Self {
        Self { store }
    }

    /// Build a new dataset from `records` and replace the stored one.
    pub async fn build(
        &self,
        records: &[SourceRecord],
        sample_size: usize,
    ) -> Result<DatasetBuildSummary> {
        let (samples, skipped) = select_samples(records, sample_size);
        let dataset = GoldenDataset::new(samples, Utc::now());
        self.store.replace(dataset.clone()).await?;

        info!(
            event = "dataset.built",
            dataset_id = %dataset.dataset_id,
            samples = dataset.len(),
            skipped = skipped,
            digest = %dataset.digest.short(),
        );
        Ok(DatasetBuildSummary { dataset, skipped })
    }

    /// The stored dataset, if one has been built.
    pub async fn current(&self) -> Result<Option<GoldenDataset>> {
        Ok(self.store.load().await?)
    }
}

/// Read a JSON array of [`SourceRecord`] from `path`.
pub async fn load_source_records(path: impl AsRef<Path>) -> Result<Vec<SourceRecord>> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptgate_state::fakes::MemoryDatasetStore;
    use promptgate_state::ScoreTriple;

    fn record(id: &str, rated: bool) -> SourceRecord {
        SourceRecord {
            id: id.to_string(),
            title: format!("Job {id}"),
            description: "desc".to_string(),
            skills: vec!["Rust".to_string()],
            ratings: rated.then(|| ScoreTriple::new(5.0, 6.0, 7.0)),
        }
    }

    #[test]
    fn selects_rated_records_up_to_size() {
        let records = vec![
            record("1", true),
            record("2", false),
            record("3", true),
            record("4", true),
        ];
        let (samples, skipped) = select_samples(&records, 2);
        let ids: Vec<_> = samples.iter().map(|s| s.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["golden-1", "golden-3"]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn zero_size_yields_empty_selection() {
        let (samples, _) = select_samples(&[record("1", true)], 0);
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn build_replaces_prior_dataset() {
        let manager = ReferenceDatasetManager::new(Arc::new(MemoryDatasetStore::new()));
        manager
            .build(&[record("1", true), record("2", true)], 10)
            .await
            .unwrap();
        let second = manager.build(&[record("3", true)], 10).await.unwrap();

        let current = manager.current().await.unwrap().unwrap();
        assert_eq!(current, second.dataset);
        assert_eq!(current.samples[0].sample_id, "golden-3");
    }

    #[tokio::test]
    async fn loads_source_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "a", "title": "Rust dev", "description": "Systems", "skills": ["Rust"],
                 "ratings": {"difficulty": 7, "prospects": 8, "fun": 6}},
                {"id": "b", "title": "QA", "description": "Testing"}
            ]"#,
        )
        .unwrap();

        let records = load_source_records(&path).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].ratings.is_some());
        assert!(records[1].ratings.is_none());
        assert!(records[1].skills.is_empty());
    }
}
