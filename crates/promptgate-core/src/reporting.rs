use anyhow::{Context, Result};
use promptgate_state::EvaluationReport;
use std::path::Path;

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Render a markdown summary of an evaluation report for terminals and CI
/// comments.
pub fn render_summary(report: &EvaluationReport) -> String {
    let mut out = String::new();
    out.push_str("# Evaluation Summary\n\n");
    out.push_str(&format!("- report: `{}`\n", report.report_id));
    out.push_str(&format!("- timestamp: {}\n", report.timestamp.to_rfc3339()));
    match &report.chosen_template {
        Some(t) => out.push_str(&format!("- chosen template: {}\n", t)),
        None => out.push_str("- chosen template: none\n"),
    }
    out.push_str(&format!(
        "- samples: {}\n- accuracy: {}\n- consistency: {}\n- quality gates: {}\n",
        report.aggregate.sample_count,
        pct(report.aggregate.mean_accuracy),
        pct(report.aggregate.mean_consistency),
        if report.aggregate.pass { "PASS" } else { "FAIL" },
    ));

    if !report.template_scores.is_empty() {
        out.push_str("\n## Templates\n");
        for score in &report.template_scores {
            out.push_str(&format!(
                "- {} [{}]: accuracy {}, consistency {}, {} samples, {} errors, {}\n",
                score.template,
                score.task,
                pct(score.mean_accuracy),
                pct(score.mean_consistency),
                score.sample_count,
                score.error_count,
                if score.passed { "pass" } else { "fail" },
            ));
        }
    }

    if !report.recommendations.is_empty() {
        out.push_str("\n## Recommendations\n");
        for rec in &report.recommendations {
            out.push_str(&format!("- {}\n", rec));
        }
    }

    if !report.report_ideas.is_empty() {
        out.push_str("\n## Report Ideas\n");
        for idea in &report.report_ideas {
            out.push_str(&format!("- {}", idea.title));
            if !idea.category.is_empty() {
                out.push_str(&format!(" ({})", idea.category));
            }
            out.push('\n');
        }
    }
    out
}

/// Write the report as pretty JSON (CI artifact).
pub fn write_report_json(path: &Path, report: &EvaluationReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize evaluation report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Write the markdown summary next to the JSON artifact.
pub fn write_summary_md(path: &Path, report: &EvaluationReport) -> Result<()> {
    std::fs::write(path, render_summary(report)).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
