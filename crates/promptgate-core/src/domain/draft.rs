//! Draft review state machine and idea expansion.
//!
//! Allowed edges: `draft -> review`, `review -> approved`, `review -> rejected`.
//! `approved -> published` happens only through publish, never through a
//! plain transition.

use promptgate_state::{DraftContent, DraftStatus, ReportIdea};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::inference::InferenceError;

/// Audience used when the model does not name one.
pub const DEFAULT_AUDIENCE: &str = "Freelancers and business decision makers";

/// Sources used when the model does not list any.
pub const DEFAULT_SOURCES: [&str; 2] = ["Internal analytics", "Market research"];

/// Whether `transition` may move a draft from `from` to `to`.
pub fn is_allowed_transition(from: DraftStatus, to: DraftStatus) -> bool {
    matches!(
        (from, to),
        (DraftStatus::Draft, DraftStatus::Review)
            | (DraftStatus::Review, DraftStatus::Approved)
            | (DraftStatus::Review, DraftStatus::Rejected)
    )
}

/// A model's expansion of a [`ReportIdea`]. Every field is optional; absent
/// fields are filled by [`DraftExpansion::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftExpansion {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub audience: Option<String>,
    pub insights: Option<Vec<String>>,
    pub sources: Option<Vec<String>>,
    pub body: Option<String>,
    pub estimated_demand: Option<f64>,
}

fn text_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn list_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<Vec<String>> {
    keys.iter().filter_map(|k| obj.get(*k)).find_map(|v| {
        v.as_array().map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect()
        })
    })
}

fn number_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|v| v.is_finite())
}

impl DraftExpansion {
    /// Read an expansion from a structured model reply. Fields with the
    /// wrong type are treated as absent; only a non-object reply fails.
    pub fn from_value(output: &Value) -> Result<Self, InferenceError> {
        let obj = output.as_object().ok_or_else(|| {
            InferenceError::MalformedOutput("expected a JSON object".to_string())
        })?;

        Ok(Self {
            title: text_field(obj, &["title"]),
            description: text_field(obj, &["description"]),
            category: text_field(obj, &["category"]),
            audience: text_field(obj, &["targetAudience", "target_audience", "audience"]),
            insights: list_field(obj, &["keyInsights", "key_insights", "insights"]),
            sources: list_field(obj, &["dataSources", "data_sources", "sources"]),
            body: text_field(obj, &["content", "body"]),
            estimated_demand: number_field(obj, &["estimatedDemand", "estimated_demand"]),
        })
    }

    /// Fill absent fields: title, description, category and demand fall back
    /// to the idea; the rest use fixed defaults.
    pub fn resolve(self, idea: &ReportIdea) -> DraftContent {
        DraftContent {
            title: self.title.unwrap_or_else(|| idea.title.clone()),
            description: self.description.unwrap_or_else(|| idea.description.clone()),
            category: self.category.unwrap_or_else(|| idea.category.clone()),
            audience: self
                .audience
                .unwrap_or_else(|| DEFAULT_AUDIENCE.to_string()),
            insights: self.insights.unwrap_or_default(),
            sources: self
                .sources
                .unwrap_or_else(|| DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()),
            body: self.body.unwrap_or_default(),
            estimated_demand: self.estimated_demand.or(idea.estimated_demand),
        }
    }
}

/// Instruction asking the model to expand `idea` into a full draft.
pub fn expansion_prompt(idea: &ReportIdea) -> String {
    let demand = idea
        .estimated_demand
        .map(|d| format!("{d}/10"))
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "You are a professional data analyst and content writer. Expand the following report idea into a complete report draft.

Report idea:
- Title: {title}
- Description: {description}
- Category: {category}
- Estimated demand: {demand}
- Reason: {reason}

The draft should cover: introduction and background, data analysis and findings, key insights and trends, recommendations and conclusions, target audience, and data sources.

Respond with ONLY a JSON object with these fields:
- title: report title
- description: detailed description
- category: report category
- targetAudience: target audience description
- keyInsights: array of 3-5 key insights
- dataSources: array of data sources
- content: the full report in Markdown
- estimatedDemand: demand score (1-10)",
        title = idea.title,
        description = idea.description,
        category = idea.category,
        reason = idea.reason,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn idea() -> ReportIdea {
        ReportIdea {
            title: "AI Skills Demand 2025".to_string(),
            description: "Which AI skills clients pay for".to_string(),
            category: "Technology".to_string(),
            estimated_demand: Some(8.0),
            reason: "Growing interest".to_string(),
        }
    }

    #[test]
    fn only_forward_edges_are_allowed() {
        use DraftStatus::*;
        assert!(is_allowed_transition(Draft, Review));
        assert!(is_allowed_transition(Review, Approved));
        assert!(is_allowed_transition(Review, Rejected));

        assert!(!is_allowed_transition(Review, Draft));
        assert!(!is_allowed_transition(Approved, Review));
        assert!(!is_allowed_transition(Draft, Approved));
        assert!(!is_allowed_transition(Approved, Published));
        assert!(!is_allowed_transition(Rejected, Review));
        assert!(!is_allowed_transition(Published, Draft));
    }

    #[test]
    fn empty_expansion_falls_back_to_idea_and_defaults() {
        let content = DraftExpansion::default().resolve(&idea());
        assert_eq!(content.title, "AI Skills Demand 2025");
        assert_eq!(content.category, "Technology");
        assert_eq!(content.audience, DEFAULT_AUDIENCE);
        assert!(content.insights.is_empty());
        assert_eq!(content.sources, vec!["Internal analytics", "Market research"]);
        assert_eq!(content.body, "");
        assert_eq!(content.estimated_demand, Some(8.0));
    }

    #[test]
    fn model_fields_override_idea() {
        let expansion = DraftExpansion::from_value(&json!({
            "title": "AI Skills: 2025 Outlook",
            "targetAudience": "Hiring managers",
            "keyInsights": ["LLM ops is rising", "Prompt work is commoditizing"],
            "content": "# Outlook",
            "estimatedDemand": "9"
        }))
        .unwrap();
        let content = expansion.resolve(&idea());

        assert_eq!(content.title, "AI Skills: 2025 Outlook");
        assert_eq!(content.description, "Which AI skills clients pay for");
        assert_eq!(content.audience, "Hiring managers");
        assert_eq!(content.insights.len(), 2);
        assert_eq!(content.body, "# Outlook");
        assert_eq!(content.estimated_demand, Some(9.0));
    }

    #[test]
    fn blank_or_mistyped_fields_count_as_absent() {
        let expansion = DraftExpansion::from_value(&json!({
            "title": "   ",
            "category": 42,
            "dataSources": "not a list"
        }))
        .unwrap();
        assert_eq!(expansion, DraftExpansion::default());
    }

    #[test]
    fn non_object_reply_is_malformed() {
        let err = DraftExpansion::from_value(&json!("just text")).unwrap_err();
        assert!(matches!(err, InferenceError::MalformedOutput(_)));
    }

    #[test]
    fn prompt_mentions_idea_fields() {
        let prompt = expansion_prompt(&idea());
        assert!(prompt.contains("AI Skills Demand 2025"));
        assert!(prompt.contains("8/10"));
        assert!(prompt.contains("keyInsights"));
    }
}
