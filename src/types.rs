use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time capture of a browser page. Created fresh on every
/// extraction, never mutated, superseded by the next capture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    /// Plain-text body content. Capped when rendered into a prompt,
    /// not at capture time.
    pub text: String,
    /// Raw markup. Kept for callers that need it; never sent to the model.
    pub html: String,
    /// Interactive elements in document order at capture time. The
    /// ordering is not stable across snapshots.
    pub elements: Vec<ElementDescriptor>,
}

/// One interactive DOM node, as serialized by the in-page extraction
/// script. Used only for prompting and selector discovery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub tag: String,
    #[serde(rename = "type")]
    pub type_attr: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub placeholder: Option<String>,
    pub text: Option<String>,
    pub href: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default, rename = "isVisible")]
    pub is_visible: bool,
}

/// A single directive proposed by the model. The flat record mirrors the
/// wire shape the model emits; `kind` carries the discriminant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// CSS locator. Required for click/fill/select.
    #[serde(default)]
    pub selector: Option<String>,
    /// Fill text, select option, navigate URL, or wait seconds.
    #[serde(default)]
    pub value: Option<String>,
    /// Advisory only.
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Fill,
    Select,
    Navigate,
    Wait,
}

impl Action {
    /// Short human-readable form for logs and failure messages.
    pub fn describe(&self) -> String {
        if let Some(desc) = &self.description {
            return desc.clone();
        }
        match &self.selector {
            Some(sel) => format!("{:?} on {sel}", self.kind),
            None => format!("{:?}", self.kind),
        }
    }

    /// click/fill/select act on an element and are meaningless without
    /// a selector.
    pub fn requires_selector(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::Click | ActionKind::Fill | ActionKind::Select
        )
    }
}

/// Model verdict on whether a snapshot satisfies a target state.
/// Defaults are deliberate: partial model JSON still decodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub missing_requirements: Vec<String>,
}

impl VerificationResult {
    /// The definitive negative result used when the model response could
    /// not be interpreted.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            confidence: 0.0,
            missing_requirements: vec![reason.into()],
        }
    }
}

/// Ordered action sequence proposed to reach a target state or complete
/// a form. One plan is consumed per loop iteration, then discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationPlan {
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub message: Option<String>,
    /// Present on form-fill plans: the control to click once every field
    /// action has been applied.
    #[serde(default)]
    pub submit_selector: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Success,
    /// Any status the model emits other than "success" is treated as a
    /// refusal to plan.
    #[default]
    #[serde(other)]
    Error,
}

impl NavigationPlan {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: PlanStatus::Error,
            actions: Vec::new(),
            message: Some(message.into()),
            submit_selector: None,
        }
    }
}

/// Terminal result of one goal-directed navigation call.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NavigationOutcome {
    Succeeded { message: String, confidence: f64 },
    /// The model reported an error-status plan. Terminal for this
    /// invocation; the message is surfaced verbatim.
    PlanFailed { message: String },
    /// The attempt ceiling was reached without satisfying the target.
    Exhausted { attempts: u32, message: String },
}

impl NavigationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, NavigationOutcome::Succeeded { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            NavigationOutcome::Succeeded { message, .. } => message,
            NavigationOutcome::PlanFailed { message } => message,
            NavigationOutcome::Exhausted { message, .. } => message,
        }
    }
}

/// Terminal result of one form-fill-and-submit call.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FormOutcome {
    Submitted {
        message: String,
        submitted_at: DateTime<Utc>,
    },
    Failed {
        message: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        missing_fields: Vec<String>,
    },
}

impl FormOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FormOutcome::Submitted { .. })
    }

    pub(crate) fn failed(message: impl Into<String>) -> Self {
        FormOutcome::Failed {
            message: message.into(),
            missing_fields: Vec::new(),
        }
    }
}

/// Applicant data handed in by the orchestration layer. File paths are
/// passed through to the model as-is; parsing their contents is out of
/// scope here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationData {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub resume_path: String,
    #[serde(default)]
    pub cover_letter_path: Option<String>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_decodes_from_model_wire_shape() {
        let action: Action = serde_json::from_str(
            r#"{"type":"fill","selector":"input[name=q]","value":"rust engineer","description":"enter query"}"#,
        )
        .unwrap();
        assert_eq!(action.kind, ActionKind::Fill);
        assert_eq!(action.selector.as_deref(), Some("input[name=q]"));
    }

    #[test]
    fn action_tolerates_missing_optional_fields() {
        let action: Action = serde_json::from_str(r#"{"type":"wait"}"#).unwrap();
        assert_eq!(action.kind, ActionKind::Wait);
        assert!(action.selector.is_none());
        assert!(!action.requires_selector());
    }

    #[test]
    fn unknown_plan_status_reads_as_error() {
        let plan: NavigationPlan =
            serde_json::from_str(r#"{"status":"partial","actions":[]}"#).unwrap();
        assert_eq!(plan.status, PlanStatus::Error);
    }

    #[test]
    fn verification_defaults_to_failure() {
        let v: VerificationResult = serde_json::from_str("{}").unwrap();
        assert!(!v.success);
        assert_eq!(v.confidence, 0.0);
    }
}
