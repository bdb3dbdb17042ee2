//! State verification: ask the model whether a snapshot satisfies a
//! target-state description. A call never errors; malformed or
//! unreachable model output becomes a definitive negative result, and the
//! caller decides whether to try again on a later snapshot.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::codec;
use crate::config::NavigatorConfig;
use crate::llm::InferenceClient;
use crate::types::{PageSnapshot, VerificationResult};

pub struct Verifier {
    llm: Arc<dyn InferenceClient>,
}

impl Verifier {
    pub fn new(llm: Arc<dyn InferenceClient>) -> Self {
        Self { llm }
    }

    pub async fn verify(
        &self,
        snapshot: &PageSnapshot,
        target_state: &str,
        config: &NavigatorConfig,
    ) -> VerificationResult {
        let prompt = codec::render_verify(snapshot, target_state, config.text_limit);

        let response = match self.llm.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("verification call failed: {e}");
                return VerificationResult::failed(e.to_string());
            }
        };

        match codec::parse_verification(&response) {
            Ok(result) => {
                debug!(
                    success = result.success,
                    confidence = result.confidence,
                    "state verification"
                );
                result
            }
            Err(failure) => {
                warn!("unparsable verification response: {failure}");
                VerificationResult::failed(failure.reason_code())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockInference;

    fn snapshot() -> PageSnapshot {
        PageSnapshot {
            url: "https://example.com/jobs".into(),
            title: "Jobs".into(),
            text: "Search open positions".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn success_verdict_passes_through() {
        let llm = MockInference::new().with_verification(
            r#"{"success": true, "confidence": 0.85, "missing_requirements": []}"#,
        );
        let verifier = Verifier::new(Arc::new(llm));
        let result = verifier
            .verify(&snapshot(), "job search page", &NavigatorConfig::fast())
            .await;
        assert!(result.success);
        assert!((result.confidence - 0.85).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn garbage_response_becomes_negative_result() {
        let llm = MockInference::new().with_verification("the page looks fine to me");
        let verifier = Verifier::new(Arc::new(llm));
        let result = verifier
            .verify(&snapshot(), "job search page", &NavigatorConfig::fast())
            .await;
        assert!(!result.success);
        assert_eq!(result.missing_requirements, vec!["no_json_found"]);
    }
}
