//! The closed control loop: snapshot -> verify -> plan -> execute ->
//! re-verify, bounded by the attempt ceiling, plus the linear
//! fill-and-submit flow for application forms. Collaborators arrive by
//! injection; nothing here reaches for ambient state.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::browser::{BrowserSession, settle};
use crate::config::NavigatorConfig;
use crate::executor;
use crate::llm::InferenceClient;
use crate::planner::Planner;
use crate::snapshot::capture;
use crate::types::{
    Action, ActionKind, ApplicationData, FormOutcome, NavigationOutcome, PlanStatus,
};
use crate::verifier::Verifier;

/// Target-state description used to confirm a page is an application form
/// before filling it.
const FORM_TARGET_STATE: &str = "job application form page";

pub struct Navigator<S: BrowserSession> {
    session: S,
    verifier: Verifier,
    planner: Planner,
    config: NavigatorConfig,
}

impl<S: BrowserSession> Navigator<S> {
    pub fn new(session: S, llm: Arc<dyn InferenceClient>, config: NavigatorConfig) -> Self {
        Self {
            session,
            verifier: Verifier::new(llm.clone()),
            planner: Planner::new(llm),
            config,
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Drive the page toward a natural-language target state. Each attempt
    /// captures a fresh snapshot, verifies, and if the target is not yet
    /// reached requests and executes a new plan; plans are never reused
    /// across attempts. A failed action is skipped, not fatal; later
    /// actions may still be independently reachable. Reaching the target
    /// mid-plan short-circuits immediately.
    pub async fn navigate_to_state(&self, target_state: &str) -> NavigationOutcome {
        for attempt in 1..=self.config.max_attempts {
            let snapshot = capture(&self.session, &self.config).await;
            let check = self
                .verifier
                .verify(&snapshot, target_state, &self.config)
                .await;
            if check.success {
                return self.reached(target_state, check.confidence);
            }
            info!(
                attempt,
                ceiling = self.config.max_attempts,
                "target not reached, requesting plan"
            );

            let plan = self.planner.plan_navigation(&snapshot, target_state).await;
            if plan.status == PlanStatus::Error {
                return NavigationOutcome::PlanFailed {
                    message: plan
                        .message
                        .unwrap_or_else(|| "planner returned an error without a message".into()),
                };
            }

            for action in &plan.actions {
                if !executor::execute(&self.session, action, &self.config).await {
                    warn!("skipping failed action: {}", action.describe());
                    continue;
                }
                let snapshot = capture(&self.session, &self.config).await;
                let check = self
                    .verifier
                    .verify(&snapshot, target_state, &self.config)
                    .await;
                if check.success {
                    return self.reached(target_state, check.confidence);
                }
            }
        }

        NavigationOutcome::Exhausted {
            attempts: self.config.max_attempts,
            message: format!(
                "Failed to reach target state after {} attempts",
                self.config.max_attempts
            ),
        }
    }

    fn reached(&self, target_state: &str, confidence: f64) -> NavigationOutcome {
        info!(confidence, "reached target state: {target_state}");
        NavigationOutcome::Succeeded {
            message: format!("Reached target state: {target_state}"),
            confidence,
        }
    }

    /// Fill and submit the application form on the current page. This is a
    /// linear sequence, not a retrying loop: form fields are usually
    /// interdependent, so the first failed action aborts the whole plan,
    /// and each stage reports its own failure message. Retries, if
    /// desired, belong to the caller as a new top-level invocation.
    pub async fn submit_form(&self, data: &ApplicationData) -> FormOutcome {
        let snapshot = capture(&self.session, &self.config).await;
        let on_form = self
            .verifier
            .verify(&snapshot, FORM_TARGET_STATE, &self.config)
            .await;
        if !on_form.success {
            return FormOutcome::failed("Not on an application form page");
        }

        let plan = self.planner.plan_form_fill(&snapshot, data).await;
        if plan.status == PlanStatus::Error {
            return FormOutcome::failed(
                plan.message
                    .unwrap_or_else(|| "form-fill planning failed without a message".into()),
            );
        }

        for action in &plan.actions {
            if !executor::execute(&self.session, action, &self.config).await {
                return FormOutcome::failed(format!(
                    "Failed to execute form action: {}",
                    action.describe()
                ));
            }
        }

        settle(&self.session, &self.config).await;
        let completion_target = format!(
            "application form completed with the applicant's data: {}",
            serde_json::to_string(data).unwrap_or_default()
        );
        let snapshot = capture(&self.session, &self.config).await;
        let completed = self
            .verifier
            .verify(&snapshot, &completion_target, &self.config)
            .await;
        if !completed.success {
            return FormOutcome::Failed {
                message: "Form validation failed".into(),
                missing_fields: completed.missing_requirements,
            };
        }

        let Some(submit_selector) = plan.submit_selector else {
            return FormOutcome::failed("Form-fill plan did not name a submit control");
        };
        let submit = Action {
            kind: ActionKind::Click,
            selector: Some(submit_selector),
            value: None,
            description: Some("Submit application form".into()),
        };
        if !executor::execute(&self.session, &submit, &self.config).await {
            return FormOutcome::failed("Failed to submit the form");
        }

        settle(&self.session, &self.config).await;
        info!("application form submitted");
        FormOutcome::Submitted {
            message: "Application submitted successfully".into(),
            submitted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockBrowser;
    use crate::codec;
    use crate::llm::mock::MockInference;

    const VERIFY_FAIL: &str = r#"{"success": false, "confidence": 0.1, "missing_requirements": ["no search box"]}"#;
    const VERIFY_PASS: &str = r#"{"success": true, "confidence": 0.9, "missing_requirements": []}"#;

    #[tokio::test]
    async fn immediate_success_issues_no_plan_requests() {
        let llm = MockInference::new().with_verification(VERIFY_PASS);
        let navigator = Navigator::new(
            MockBrowser::new(),
            Arc::new(llm.clone()),
            NavigatorConfig::fast(),
        );

        let outcome = navigator.navigate_to_state("job search page").await;
        match outcome {
            NavigationOutcome::Succeeded { confidence, .. } => {
                assert!((confidence - 0.9).abs() < f64::EPSILON)
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(llm.prompt_count(codec::NAV_PLAN_TASK), 0);
    }

    #[tokio::test]
    async fn plan_error_is_terminal_and_verbatim() {
        let llm = MockInference::new()
            .with_verification(VERIFY_FAIL)
            .with_plan(r#"{"status": "error", "message": "nothing to interact with"}"#);
        let navigator = Navigator::new(MockBrowser::new(), Arc::new(llm), NavigatorConfig::fast());

        let outcome = navigator.navigate_to_state("job search page").await;
        match outcome {
            NavigationOutcome::PlanFailed { message } => {
                assert_eq!(message, "nothing to interact with")
            }
            other => panic!("expected plan failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn form_flow_requires_a_form_page() {
        let llm = MockInference::new().with_verification(VERIFY_FAIL);
        let navigator = Navigator::new(
            MockBrowser::new(),
            Arc::new(llm.clone()),
            NavigatorConfig::fast(),
        );

        let outcome = navigator.submit_form(&ApplicationData::default()).await;
        match outcome {
            FormOutcome::Failed { message, .. } => {
                assert_eq!(message, "Not on an application form page")
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(llm.prompt_count(codec::FORM_PLAN_TASK), 0);
    }

    #[tokio::test]
    async fn form_validation_failure_surfaces_missing_fields() {
        let llm = MockInference::new()
            .with_verification(VERIFY_PASS) // on a form page
            .with_verification(
                r#"{"success": false, "confidence": 0.2, "missing_requirements": ["phone"]}"#,
            )
            .with_plan(
                r##"{"status": "success", "actions": [
                    {"type": "fill", "selector": "#name", "value": "Ada"}
                ], "submit_selector": "#send"}"##,
            );
        let navigator = Navigator::new(MockBrowser::new(), Arc::new(llm), NavigatorConfig::fast());

        let outcome = navigator.submit_form(&ApplicationData::default()).await;
        match outcome {
            FormOutcome::Failed {
                message,
                missing_fields,
            } => {
                assert_eq!(message, "Form validation failed");
                assert_eq!(missing_fields, vec!["phone"]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_submit_selector_fails_before_clicking() {
        let llm = MockInference::new()
            .with_verification(VERIFY_PASS)
            .with_verification(VERIFY_PASS)
            .with_plan(
                r##"{"status": "success", "actions": [
                    {"type": "fill", "selector": "#name", "value": "Ada"}
                ]}"##,
            );
        let session = MockBrowser::new();
        let navigator = Navigator::new(session.clone(), Arc::new(llm), NavigatorConfig::fast());

        let outcome = navigator.submit_form(&ApplicationData::default()).await;
        assert!(!outcome.is_success());
        assert_eq!(session.call_count("click"), 0);
    }
}
