//! Recommendation text and report-idea suggestions for evaluation reports.

use promptgate_state::{ReportIdea, TemplateScore};
use serde_json::Value;

use crate::inference::InferenceError;

pub fn accuracy_recommendation(name: &str, accuracy: f64) -> String {
    format!(
        "Improve accuracy for {} (current: {:.1}%)",
        name,
        accuracy * 100.0
    )
}

pub fn consistency_recommendation(name: &str, consistency: f64) -> String {
    format!(
        "Improve consistency for {} (current: {:.1}%)",
        name,
        consistency * 100.0
    )
}

pub fn evaluation_error_recommendation(name: &str) -> String {
    format!("Fix evaluation errors for {}", name)
}

/// Instruction asking the model for report ideas, given this run's scores.
pub fn idea_prompt(scores: &[TemplateScore], recommendations: &[String]) -> String {
    let mut lines = Vec::new();
    for score in scores {
        lines.push(format!(
            "- {} ({}): accuracy {:.1}%, consistency {:.1}%, {} samples",
            score.template,
            score.task,
            score.mean_accuracy * 100.0,
            score.mean_consistency * 100.0,
            score.sample_count,
        ));
    }
    let scores_block = if lines.is_empty() {
        "- no templates were evaluated".to_string()
    } else {
        lines.join("\n")
    };
    let recs_block = if recommendations.is_empty() {
        "- none".to_string()
    } else {
        recommendations
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are an analyst for a freelance job marketplace. Based on the latest prompt evaluation, suggest market reports that users would pay for.

Evaluation results:
{scores_block}

Open recommendations:
{recs_block}

Respond with ONLY a JSON object of the form:
{{\"reportIdeas\": [{{\"title\": string, \"description\": string, \"category\": string, \"estimatedDemand\": number 1-10, \"reason\": string}}]}}"
    )
}

/// Read the `reportIdeas` array from a structured model reply. Entries
/// without a usable title are dropped.
pub fn parse_report_ideas(output: &Value) -> Result<Vec<ReportIdea>, InferenceError> {
    let items = output
        .get("reportIdeas")
        .or_else(|| output.get("report_ideas"))
        .and_then(Value::as_array)
        .ok_or_else(|| InferenceError::MalformedOutput("missing `reportIdeas` array".to_string()))?;

    Ok(items
        .iter()
        .filter_map(|item| serde_json::from_value::<ReportIdea>(item.clone()).ok())
        .filter(|idea| !idea.title.trim().is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recommendation_formats() {
        assert_eq!(
            accuracy_recommendation("job-analysis", 0.72),
            "Improve accuracy for job-analysis (current: 72.0%)"
        );
        assert_eq!(
            consistency_recommendation("job-analysis", 0.8333),
            "Improve consistency for job-analysis (current: 83.3%)"
        );
        assert_eq!(
            evaluation_error_recommendation("employer-rating"),
            "Fix evaluation errors for employer-rating"
        );
    }

    #[test]
    fn parses_ideas_and_drops_untitled() {
        let ideas = parse_report_ideas(&json!({
            "reportIdeas": [
                {"title": "Remote Rust Rates", "category": "Technology", "estimatedDemand": 7},
                {"description": "no title"},
                {"title": ""}
            ]
        }))
        .unwrap();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].title, "Remote Rust Rates");
        assert_eq!(ideas[0].estimated_demand, Some(7.0));
    }

    #[test]
    fn missing_array_is_malformed() {
        let err = parse_report_ideas(&json!({"ideas": []})).unwrap_err();
        assert!(matches!(err, InferenceError::MalformedOutput(_)));
    }

    #[test]
    fn idea_prompt_lists_recommendations() {
        let prompt = idea_prompt(&[], &["Fix evaluation errors for x".to_string()]);
        assert!(prompt.contains("- Fix evaluation errors for x"));
        assert!(prompt.contains("reportIdeas"));
    }
}
