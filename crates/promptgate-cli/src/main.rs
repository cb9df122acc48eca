//! promptgate - prompt regression and publication CLI
//!
//! ## Commands
//!
//! - `template`: Create, activate, list and render instruction templates
//! - `dataset`: Build the golden dataset from verified source records
//! - `eval`: Run the full evaluation (exits non-zero when quality gates fail)
//! - `draft`: Generate, review and publish report drafts

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use promptgate_core::config::DEFAULT_DATASET_SIZE;
use promptgate_core::{
    load_source_records, passes_quality_gates, render_summary, write_report_json,
    write_summary_md, DraftWorkflow, EvaluationOrchestrator, InferenceClient, Params,
    PipelineConfig, ReferenceDatasetManager, TemplateVersionStore,
};
use promptgate_state::{DraftStatus, SurrealHandle, SurrealStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "promptgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Prompt regression gate and report publication pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Inference model identifier
    #[arg(long, global = true, env = "PROMPTGATE_MODEL")]
    model: Option<String>,

    /// Inference server URL
    #[arg(long, global = true, env = "PROMPTGATE_INFERENCE_URL")]
    inference_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage versioned instruction templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Build or inspect the golden dataset
    Dataset {
        #[command(subcommand)]
        action: DatasetAction,
    },

    /// Run or inspect evaluations
    Eval {
        #[command(subcommand)]
        action: EvalAction,
    },

    /// Review and publish report drafts
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Create a new version (it becomes the active one)
    Create {
        /// Logical template name shared by all versions
        #[arg(long)]
        name: String,

        /// Task key the template serves
        #[arg(long)]
        task: String,

        /// Template body with {{key}} placeholders
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,

        /// Read the template body from a file
        #[arg(long)]
        body_file: Option<PathBuf>,

        /// Default parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },

    /// Promote (or roll back to) a specific version
    Activate {
        /// Template version id
        template_id: String,
    },

    /// List every version of a template, newest first
    Versions {
        /// Template name
        name: String,
    },

    /// Show active templates
    Active {
        /// Only show the template serving this task
        #[arg(long)]
        task: Option<String>,
    },

    /// Render the active template of a task
    Render {
        /// Task key
        task: String,

        /// Call-time parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },

    /// Install the built-in templates that do not exist yet
    Seed,
}

#[derive(Subcommand)]
enum DatasetAction {
    /// Replace the golden dataset from a JSON array of source records
    Build {
        /// Source records file
        #[arg(long)]
        source: PathBuf,

        /// Maximum number of samples
        #[arg(long, env = "PROMPTGATE_DATASET_SIZE", default_value_t = DEFAULT_DATASET_SIZE)]
        size: usize,
    },

    /// Show the current golden dataset
    Show,
}

#[derive(Subcommand)]
enum EvalAction {
    /// Run the full evaluation; fails when the quality gates fail
    Run {
        /// Write the report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the markdown summary
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Ask the model for report ideas after scoring
        #[arg(long)]
        ideas: bool,
    },

    /// Show the most recent evaluation report
    Latest,
}

#[derive(Subcommand)]
enum DraftAction {
    /// Expand the report ideas of an evaluation into drafts
    Generate {
        /// Evaluation report id
        evaluation_id: String,
    },

    /// List drafts
    List {
        /// Only drafts in this status (draft, review, approved, published, rejected)
        #[arg(long)]
        status: Option<DraftStatus>,
    },

    /// Show one draft
    Show {
        draft_id: String,
    },

    /// Move a draft to review, approved or rejected
    Transition {
        draft_id: String,

        /// Target status
        status: DraftStatus,

        #[arg(long)]
        reviewer: Option<String>,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Publish an approved draft
    Publish {
        draft_id: String,

        /// Publisher name
        #[arg(long)]
        by: String,
    },

    /// List published reports
    Reports,
}

/// Everything a command needs: storage, inference and settings.
struct App {
    store: Arc<SurrealStore>,
    templates: Arc<TemplateVersionStore>,
    inference: Arc<dyn InferenceClient>,
    config: PipelineConfig,
}

impl App {
    fn new(
        store: Arc<SurrealStore>,
        inference: Arc<dyn InferenceClient>,
        config: PipelineConfig,
    ) -> Self {
        let templates = Arc::new(TemplateVersionStore::new(store.clone()));
        Self {
            store,
            templates,
            inference,
            config,
        }
    }

    /// The process-wide template store; its per-name locks only serialize
    /// callers that share it.
    fn templates(&self) -> Arc<TemplateVersionStore> {
        Arc::clone(&self.templates)
    }

    fn datasets(&self) -> ReferenceDatasetManager {
        ReferenceDatasetManager::new(self.store.clone())
    }

    fn orchestrator(&self, ideas: bool) -> EvaluationOrchestrator {
        EvaluationOrchestrator::new(
            self.templates(),
            self.store.clone(),
            self.store.clone(),
            self.inference.clone(),
            self.config.model.clone(),
            self.config.inference_timeout,
        )
        .with_ideas(ideas)
    }

    fn drafts(&self) -> DraftWorkflow {
        DraftWorkflow::new(
            self.store.clone(),
            self.store.clone(),
            self.inference.clone(),
            self.config.model.clone(),
            self.config.inference_timeout,
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    promptgate_core::init_tracing(cli.json, level);

    let mut config = PipelineConfig::from_env().context("invalid promptgate configuration")?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(url) = cli.inference_url {
        config.inference_url = url;
    }

    // Initialize database connection
    let handle = SurrealHandle::setup_from_env()
        .await
        .context("Failed to connect to promptgate database")?;
    let inference = config
        .inference_client()
        .context("Failed to create inference client")?;
    let app = App::new(
        Arc::new(SurrealStore::new(Arc::new(handle))),
        inference,
        config,
    );

    run(&app, cli.command).await
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Template { action } => match action {
            TemplateAction::Create {
                name,
                task,
                body,
                body_file,
                params,
            } => {
                cmd_template_create(
                    app,
                    &name,
                    &task,
                    body.as_deref(),
                    body_file.as_deref(),
                    params.as_deref(),
                )
                .await
            }
            TemplateAction::Activate { template_id } => {
                cmd_template_activate(app, &template_id).await
            }
            TemplateAction::Versions { name } => cmd_template_versions(app, &name).await,
            TemplateAction::Active { task } => cmd_template_active(app, task.as_deref()).await,
            TemplateAction::Render { task, params } => {
                cmd_template_render(app, &task, params.as_deref()).await
            }
            TemplateAction::Seed => cmd_template_seed(app).await,
        },
        Commands::Dataset { action } => match action {
            DatasetAction::Build { source, size } => cmd_dataset_build(app, &source, size).await,
            DatasetAction::Show => cmd_dataset_show(app).await,
        },
        Commands::Eval { action } => match action {
            EvalAction::Run {
                output,
                summary,
                ideas,
            } => cmd_eval_run(app, output.as_deref(), summary.as_deref(), ideas).await,
            EvalAction::Latest => cmd_eval_latest(app).await,
        },
        Commands::Draft { action } => match action {
            DraftAction::Generate { evaluation_id } => {
                cmd_draft_generate(app, &evaluation_id).await
            }
            DraftAction::List { status } => cmd_draft_list(app, status).await,
            DraftAction::Show { draft_id } => cmd_draft_show(app, &draft_id).await,
            DraftAction::Transition {
                draft_id,
                status,
                reviewer,
                comment,
            } => cmd_draft_transition(app, &draft_id, status, reviewer, comment).await,
            DraftAction::Publish { draft_id, by } => cmd_draft_publish(app, &draft_id, &by).await,
            DraftAction::Reports => cmd_draft_reports(app).await,
        },
    }
}

fn parse_params(raw: Option<&str>) -> Result<Params> {
    match raw {
        None => Ok(Params::new()),
        Some(raw) => serde_json::from_str(raw).context("--params must be a JSON object"),
    }
}

fn short(id: &str) -> &str {
    &id[..8.min(id.len())]
}

// ========== Template Commands ==========

/// Create a new template version
async fn cmd_template_create(
    app: &App,
    name: &str,
    task: &str,
    body: Option<&str>,
    body_file: Option<&Path>,
    params: Option<&str>,
) -> Result<()> {
    let body = match (body, body_file) {
        (Some(body), _) => body.to_string(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read template body from {:?}", path))?,
        (None, None) => bail!("either --body or --body-file is required"),
    };
    let params = parse_params(params)?;

    let template = app
        .templates()
        .create_version(name, task, &body, params)
        .await
        .context("Failed to create template version")?;

    println!(
        "Created {} ({}) for task '{}' [{}]",
        template.template_ref(),
        template.template_id,
        template.task,
        template.body_digest.short()
    );
    Ok(())
}

async fn cmd_template_activate(app: &App, template_id: &str) -> Result<()> {
    let template = app
        .templates()
        .activate(template_id)
        .await
        .with_context(|| format!("Failed to activate template '{}'", template_id))?;
    println!("Activated {}", template.template_ref());
    Ok(())
}

async fn cmd_template_versions(app: &App, name: &str) -> Result<()> {
    let versions = app.templates().versions(name).await?;

    if versions.is_empty() {
        println!("No versions found for '{}'", name);
        return Ok(());
    }

    for template in versions {
        let prefix = if template.active { "* " } else { "  " };
        println!(
            "{}v{} {} {} {}",
            prefix,
            template.version,
            short(&template.template_id),
            template.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            template.body_digest.short()
        );
    }
    Ok(())
}

async fn cmd_template_active(app: &App, task: Option<&str>) -> Result<()> {
    let templates = app.templates();
    let active = match task {
        Some(task) => vec![templates.get_active(task).await?],
        None => templates.list_active().await?,
    };

    if active.is_empty() {
        println!("No active templates. Run 'promptgate template seed' first.");
        return Ok(());
    }

    for template in active {
        println!(
            "{} -> {} ({})",
            template.task,
            template.template_ref(),
            short(&template.template_id)
        );
    }
    Ok(())
}

async fn cmd_template_render(app: &App, task: &str, params: Option<&str>) -> Result<()> {
    let params = parse_params(params)?;
    let (_, text) = app.templates().render_active(task, &params).await?;
    println!("{}", text);
    Ok(())
}

async fn cmd_template_seed(app: &App) -> Result<()> {
    let created = app.templates().seed_defaults().await?;
    if created.is_empty() {
        println!("Built-in templates already present");
    }
    for template in created {
        println!("Seeded {} for task '{}'", template.template_ref(), template.task);
    }
    Ok(())
}

// ========== Dataset Commands ==========

async fn cmd_dataset_build(app: &App, source: &Path, size: usize) -> Result<()> {
    let records = load_source_records(source)
        .await
        .with_context(|| format!("Failed to load source records from {:?}", source))?;
    let summary = app.datasets().build(&records, size).await?;

    println!(
        "Built dataset {} with {} samples ({} unrated records skipped)",
        short(&summary.dataset.dataset_id),
        summary.dataset.len(),
        summary.skipped
    );
    println!("Digest: {}", summary.dataset.digest.as_str());
    Ok(())
}

async fn cmd_dataset_show(app: &App) -> Result<()> {
    let Some(dataset) = app.datasets().current().await? else {
        println!("No golden dataset. Run 'promptgate dataset build' first.");
        return Ok(());
    };

    println!(
        "Dataset {} built {} ({} samples)",
        short(&dataset.dataset_id),
        dataset.built_at.to_rfc3339(),
        dataset.len()
    );
    for sample in &dataset.samples {
        println!(
            "  {} {:?} -> d={} p={} f={}",
            sample.sample_id,
            sample.input.title,
            sample.expected.difficulty,
            sample.expected.prospects,
            sample.expected.fun
        );
    }
    Ok(())
}

// ========== Evaluation Commands ==========

/// Run the full evaluation as a release gate
async fn cmd_eval_run(
    app: &App,
    output: Option<&Path>,
    summary: Option<&Path>,
    ideas: bool,
) -> Result<()> {
    let report = app
        .orchestrator(ideas)
        .run_full_evaluation()
        .await
        .context("Evaluation failed")?;

    println!("{}", render_summary(&report));
    if let Some(path) = output {
        write_report_json(path, &report)?;
    }
    if let Some(path) = summary {
        write_summary_md(path, &report)?;
    }

    if !passes_quality_gates(&report) {
        bail!("quality gates failed for report {}", report.report_id);
    }
    Ok(())
}

async fn cmd_eval_latest(app: &App) -> Result<()> {
    match app.orchestrator(false).latest_report().await? {
        Some(report) => println!("{}", render_summary(&report)),
        None => println!("No evaluation reports yet. Run 'promptgate eval run' first."),
    }
    Ok(())
}

// ========== Draft Commands ==========

async fn cmd_draft_generate(app: &App, evaluation_id: &str) -> Result<()> {
    let drafts = app
        .drafts()
        .generate_from_evaluation(evaluation_id)
        .await
        .with_context(|| format!("Failed to generate drafts for '{}'", evaluation_id))?;

    if drafts.is_empty() {
        println!("Evaluation {} has no report ideas", evaluation_id);
        return Ok(());
    }
    for draft in drafts {
        println!("Created draft {} {:?}", draft.draft_id, draft.content.title);
    }
    Ok(())
}

async fn cmd_draft_list(app: &App, status: Option<DraftStatus>) -> Result<()> {
    let drafts = app.drafts().list(status).await?;

    if drafts.is_empty() {
        println!("No drafts found");
        return Ok(());
    }
    for draft in drafts {
        println!(
            "{} [{}] {} {:?}",
            short(&draft.draft_id),
            draft.status,
            draft.created_at.format("%Y-%m-%d %H:%M"),
            draft.content.title
        );
    }
    Ok(())
}

async fn cmd_draft_show(app: &App, draft_id: &str) -> Result<()> {
    let draft = app.drafts().get(draft_id).await?;
    println!("{}", serde_json::to_string_pretty(&draft)?);
    Ok(())
}

async fn cmd_draft_transition(
    app: &App,
    draft_id: &str,
    status: DraftStatus,
    reviewer: Option<String>,
    comment: Option<String>,
) -> Result<()> {
    let draft = app
        .drafts()
        .transition(draft_id, status, reviewer, comment)
        .await
        .with_context(|| format!("Failed to move draft '{}' to {}", draft_id, status))?;
    println!("Draft {} is now {}", short(&draft.draft_id), draft.status);
    Ok(())
}

async fn cmd_draft_publish(app: &App, draft_id: &str, by: &str) -> Result<()> {
    let report = app
        .drafts()
        .publish(draft_id, by)
        .await
        .with_context(|| format!("Failed to publish draft '{}'", draft_id))?;
    println!(
        "Published {} as report {} by {}",
        short(draft_id),
        report.report_id,
        report.published_by
    );
    Ok(())
}

async fn cmd_draft_reports(app: &App) -> Result<()> {
    let reports = app.drafts().list_published().await?;

    if reports.is_empty() {
        println!("No published reports");
        return Ok(());
    }
    for report in reports {
        println!(
            "{} {} {:?} by {}",
            report.published_at.to_rfc3339(),
            short(&report.report_id),
            report.content.title,
            report.published_by
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptgate_core::inference::fakes::{ScriptedInference, ScriptedReply};
    use promptgate_state::EvaluationReportStore;
    use serde_json::json;

    async fn app(inference: ScriptedInference) -> App {
        let handle = SurrealHandle::setup_db().await.unwrap();
        App::new(
            Arc::new(SurrealStore::new(Arc::new(handle))),
            Arc::new(inference),
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn commands_share_one_template_store() {
        let app = app(ScriptedInference::new()).await;
        assert!(Arc::ptr_eq(&app.templates(), &app.templates()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let templates = app.templates();
            handles.push(tokio::spawn(async move {
                templates
                    .create_version(
                        "job-analysis",
                        "job_analysis",
                        &format!("body {i} {{{{title}}}}"),
                        Params::new(),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let versions = app.templates().versions("job-analysis").await.unwrap();
        let numbers: Vec<u32> = versions.iter().map(|t| t.version).collect();
        assert_eq!(numbers, vec![4, 3, 2, 1]);
        assert_eq!(versions.iter().filter(|t| t.active).count(), 1);
    }

    fn write_sources(dir: &Path) -> PathBuf {
        let path = dir.join("sources.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "1", "title": "Backend engineer", "description": "APIs", "skills": ["Rust"],
                 "ratings": {"difficulty": 5, "prospects": 5, "fun": 5}},
                {"id": "2", "title": "Unrated listing", "description": "n/a"}
            ]"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn parses_eval_run_flags() {
        let cli = Cli::try_parse_from([
            "promptgate", "--json", "eval", "run", "--output", "report.json", "--ideas",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Eval {
                action: EvalAction::Run { output, ideas, .. },
            } => {
                assert_eq!(output, Some(PathBuf::from("report.json")));
                assert!(ideas);
            }
            _ => panic!("expected eval run"),
        }
    }

    #[test]
    fn parses_draft_status_argument() {
        let cli = Cli::try_parse_from([
            "promptgate", "draft", "transition", "d-1", "approved", "--reviewer", "sam",
        ])
        .unwrap();
        match cli.command {
            Commands::Draft {
                action: DraftAction::Transition { status, reviewer, .. },
            } => {
                assert_eq!(status, DraftStatus::Approved);
                assert_eq!(reviewer.as_deref(), Some("sam"));
            }
            _ => panic!("expected draft transition"),
        }

        assert!(Cli::try_parse_from(["promptgate", "draft", "transition", "d-1", "done"]).is_err());
    }

    #[test]
    fn template_body_flags_conflict() {
        let result = Cli::try_parse_from([
            "promptgate", "template", "create", "--name", "n", "--task", "t", "--body", "x",
            "--body-file", "body.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_params_rejects_non_objects() {
        assert!(parse_params(Some("[1, 2]")).is_err());
        let params = parse_params(Some(r#"{"tone": "formal"}"#)).unwrap();
        assert_eq!(params["tone"], json!("formal"));
        assert!(parse_params(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn eval_run_passes_gate_and_writes_artifacts() {
        let app = app(ScriptedInference::new().with_default(ScriptedReply::Json(
            json!({"difficulty": 5, "prospects": 5, "fun": 5}),
        )))
        .await;
        let dir = tempfile::tempdir().unwrap();

        cmd_template_create(
            &app,
            "job-analysis",
            "job_analysis",
            Some("Rate {{title}}"),
            None,
            None,
        )
        .await
        .unwrap();
        cmd_dataset_build(&app, &write_sources(dir.path()), 10)
            .await
            .unwrap();

        let output = dir.path().join("report.json");
        let summary = dir.path().join("summary.md");
        cmd_eval_run(&app, Some(&output), Some(&summary), false)
            .await
            .unwrap();

        assert!(output.exists());
        assert!(std::fs::read_to_string(&summary)
            .unwrap()
            .contains("quality gates: PASS"));
    }

    #[tokio::test]
    async fn eval_run_fails_when_gate_fails() {
        let app = app(ScriptedInference::new().with_default(ScriptedReply::Json(
            json!({"difficulty": 9, "prospects": 5, "fun": 9}),
        )))
        .await;
        let dir = tempfile::tempdir().unwrap();

        cmd_template_seed(&app).await.unwrap();
        cmd_dataset_build(&app, &write_sources(dir.path()), 10)
            .await
            .unwrap();

        let err = cmd_eval_run(&app, None, None, false).await.unwrap_err();
        assert!(err.to_string().contains("quality gates failed"));

        // The failing report is still recorded.
        let latest = app.store.latest().await.unwrap();
        assert!(latest.is_some_and(|r| !r.aggregate.pass));
    }

    #[tokio::test]
    async fn create_requires_a_body() {
        let app = app(ScriptedInference::new()).await;
        let err = cmd_template_create(&app, "n", "t", None, None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--body"));
    }
}
