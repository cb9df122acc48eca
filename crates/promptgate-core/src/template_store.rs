//! Template Version Store.
//!
//! Wraps a [`TemplateRegistry`] with input validation, per-name
//! serialization of version changes, and rendering.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use promptgate_state::{NewTemplate, TemplateRecord, TemplateRegistry};
use tracing::{info, warn};

use crate::domain::template::{merge_params, render_body, Params};
use crate::domain::{PipelineError, Result};

/// A built-in template installed by [`TemplateVersionStore::seed_defaults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultTemplate {
    pub name: &'static str,
    pub task: &'static str,
    pub body: &'static str,
}

pub const JOB_ANALYSIS_TASK: &str = "job_analysis";

pub const DEFAULT_TEMPLATES: [DefaultTemplate; 3] = [
    DefaultTemplate {
        name: "job-analysis",
        task: JOB_ANALYSIS_TASK,
        body: r#"Analyze this job posting and provide ratings on a scale of 1-10 for difficulty, career prospects, and fun factor.

Job Title: {{title}}
Description: {{description}}
Required Skills: {{skills}}

Please respond with ONLY a JSON object in this exact format:
{
  "difficulty": <number 1-10>,
  "prospects": <number 1-10>,
  "fun": <number 1-10>
}"#,
    },
    DefaultTemplate {
        name: "employer-rating",
        task: "employer_rating",
        body: r#"Rate this employer based on the job posting information.

Employer: {{employer}}
Job Description: {{description}}

Rate on a scale of 1-10 for credit score, salary fairness, attitude, and career prospects.

Respond with ONLY JSON:
{
  "credit": <number 1-10>,
  "salary": <number 1-10>,
  "attitude": <number 1-10>,
  "prospects": <number 1-10>
}"#,
    },
    DefaultTemplate {
        name: "report-generation",
        task: "report_generation",
        body: r#"Generate a comprehensive market analysis report based on the following data:

Skills: {{skills}}
Region: {{region}}
Experience Level: {{experienceLevel}}

Focus on:
1. Salary trends
2. Demand analysis
3. Career prospects
4. Market insights

Provide detailed analysis with data-driven insights."#,
    },
];

/// Versioned templates with one active version per name.
///
/// Version changes for a name are serialized per instance, so a process
/// shares one store. Across processes the registry's own atomic writes keep
/// a single active version and reject a losing write with a conflict.
pub struct TemplateVersionStore {
    registry: Arc<dyn TemplateRegistry>,
    name_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TemplateVersionStore {
    pub fn new(registry: Arc<dyn TemplateRegistry>) -> Self {
        Self {
            registry,
            name_locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .name_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    /// Create the next version of `name` and make it the active one.
    pub async fn create_version(
        &self,
        name: &str,
        task: &str,
        body: &str,
        default_parameters: Params,
    ) -> Result<TemplateRecord> {
        for (field, value) in [("name", name), ("task", task), ("body", body)] {
            if value.trim().is_empty() {
                return Err(PipelineError::InvalidTemplate(format!(
                    "{field} must not be empty"
                )));
            }
        }

        let lock = self.lock_for(name);
        let _guard = lock.lock().await;
        let record = self
            .registry
            .create_version(NewTemplate {
                name: name.to_string(),
                task: task.to_string(),
                body: body.to_string(),
                default_parameters,
            })
            .await?;

        info!(
            event = "template.version_created",
            name = %record.name,
            version = record.version,
            task = %record.task,
            digest = %record.body_digest.short(),
        );
        Ok(record)
    }

    /// Promote (or roll back to) `template_id`.
    pub async fn activate(&self, template_id: &str) -> Result<TemplateRecord> {
        let target = self
            .registry
            .get(template_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("template", template_id))?;

        let lock = self.lock_for(&target.name);
        let _guard = lock.lock().await;
        let record = self.registry.activate(template_id).await?;

        info!(
            event = "template.activated",
            name = %record.name,
            version = record.version,
        );
        Ok(record)
    }

    /// The active template for `task`.
    pub async fn get_active(&self, task: &str) -> Result<TemplateRecord> {
        self.registry
            .active_for_task(task)
            .await?
            .ok_or_else(|| PipelineError::not_found("active template for task", task))
    }

    pub async fn get(&self, template_id: &str) -> Result<TemplateRecord> {
        self.registry
            .get(template_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("template", template_id))
    }

    /// All versions of `name`, newest first.
    pub async fn versions(&self, name: &str) -> Result<Vec<TemplateRecord>> {
        Ok(self.registry.versions(name).await?)
    }

    pub async fn list_active(&self) -> Result<Vec<TemplateRecord>> {
        Ok(self.registry.list_active().await?)
    }

    /// Distinct tasks with an active template, sorted by key.
    pub async fn active_tasks(&self) -> Result<Vec<String>> {
        let tasks: BTreeSet<String> = self
            .registry
            .list_active()
            .await?
            .into_iter()
            .map(|t| t.task)
            .collect();
        Ok(tasks.into_iter().collect())
    }

    /// Render `template` with its defaults overlaid by `params`.
    ///
    /// Unresolved placeholders are left in place and logged.
    pub fn render(&self, template: &TemplateRecord, params: &Params) -> String {
        let merged = merge_params(&template.default_parameters, params);
        let rendered = render_body(&template.body, &merged);
        if !rendered.unresolved.is_empty() {
            warn!(
                template = %template.template_ref(),
                unresolved = ?rendered.unresolved,
                "template rendered with unresolved placeholders"
            );
        }
        rendered.text
    }

    /// Fetch the active template for `task` and render it.
    pub async fn render_active(
        &self,
        task: &str,
        params: &Params,
    ) -> Result<(TemplateRecord, String)> {
        let template = self.get_active(task).await?;
        let text = self.render(&template, params);
        Ok((template, text))
    }

    /// Install [`DEFAULT_TEMPLATES`] whose names have no versions yet.
    pub async fn seed_defaults(&self) -> Result<Vec<TemplateRecord>> {
        let mut created = Vec::new();
        for default in DEFAULT_TEMPLATES {
            if !self.registry.versions(default.name).await?.is_empty() {
                continue;
            }
            created.push(
                self.create_version(default.name, default.task, default.body, Params::new())
                    .await?,
            );
        }
        Ok(created)
    }
}
