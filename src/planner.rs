//! Plan generation: ask the model for an ordered action sequence toward a
//! target state, or for filling a form against applicant data. Never
//! errors; an unusable model response becomes an error-status plan with
//! no actions.

use std::sync::Arc;
use tracing::{info, warn};

use crate::codec;
use crate::llm::InferenceClient;
use crate::types::{ApplicationData, NavigationPlan, PageSnapshot, PlanStatus};

pub struct Planner {
    llm: Arc<dyn InferenceClient>,
}

impl Planner {
    pub fn new(llm: Arc<dyn InferenceClient>) -> Self {
        Self { llm }
    }

    pub async fn plan_navigation(
        &self,
        snapshot: &PageSnapshot,
        target_state: &str,
    ) -> NavigationPlan {
        let prompt = codec::render_navigation_plan(snapshot, target_state);
        self.request_plan(&prompt).await
    }

    /// Form-fill plans reuse the same envelope and additionally carry the
    /// submit selector.
    pub async fn plan_form_fill(
        &self,
        snapshot: &PageSnapshot,
        data: &ApplicationData,
    ) -> NavigationPlan {
        let prompt = codec::render_form_fill(snapshot, data);
        self.request_plan(&prompt).await
    }

    async fn request_plan(&self, prompt: &str) -> NavigationPlan {
        let response = match self.llm.complete(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("plan request failed: {e}");
                return NavigationPlan::error(e.to_string());
            }
        };

        match codec::parse_plan(&response) {
            Ok(plan) => {
                if plan.status == PlanStatus::Success {
                    info!("plan with {} action(s)", plan.actions.len());
                }
                plan
            }
            Err(failure) => {
                warn!("unparsable plan response: {failure}");
                NavigationPlan::error(failure.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockInference;
    use crate::types::ActionKind;

    #[tokio::test]
    async fn usable_plan_is_returned_in_order() {
        let llm = MockInference::new().with_plan(
            r#"{"status": "success", "actions": [
                {"type": "navigate", "value": "https://example.com/apply"},
                {"type": "click", "selector": "a.apply"}
            ]}"#,
        );
        let planner = Planner::new(Arc::new(llm));
        let plan = planner
            .plan_navigation(&PageSnapshot::default(), "application form page")
            .await;
        assert_eq!(plan.status, PlanStatus::Success);
        assert_eq!(plan.actions[0].kind, ActionKind::Navigate);
    }

    #[tokio::test]
    async fn model_refusal_becomes_error_plan() {
        let llm = MockInference::new()
            .with_plan(r#"{"status": "error", "message": "page has no interactive elements"}"#);
        let planner = Planner::new(Arc::new(llm));
        let plan = planner
            .plan_navigation(&PageSnapshot::default(), "application form page")
            .await;
        assert_eq!(plan.status, PlanStatus::Error);
        assert!(plan.actions.is_empty());
        assert_eq!(
            plan.message.as_deref(),
            Some("page has no interactive elements")
        );
    }

    #[tokio::test]
    async fn unparsable_response_becomes_error_plan() {
        let llm = MockInference::new().with_plan("I would click the apply button first.");
        let planner = Planner::new(Arc::new(llm));
        let plan = planner
            .plan_navigation(&PageSnapshot::default(), "application form page")
            .await;
        assert_eq!(plan.status, PlanStatus::Error);
        assert!(plan.actions.is_empty());
    }

    #[tokio::test]
    async fn form_plan_carries_submit_selector() {
        let llm = MockInference::new().with_plan(
            r##"{"status": "success", "actions": [
                {"type": "fill", "selector": "#name", "value": "Ada Lovelace"}
            ], "submit_selector": "button[type=submit]"}"##,
        );
        let planner = Planner::new(Arc::new(llm));
        let plan = planner
            .plan_form_fill(&PageSnapshot::default(), &ApplicationData::default())
            .await;
        assert_eq!(plan.submit_selector.as_deref(), Some("button[type=submit]"));
    }
}
