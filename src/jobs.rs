//! Job-listing extraction, relevance scoring, and the per-job application
//! flow. Each application runs on its own page; the shared session is
//! only used to open one.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::browser::BrowserSession;
use crate::codec;
use crate::config::NavigatorConfig;
use crate::error::Result;
use crate::llm::InferenceClient;
use crate::navigator::Navigator;
use crate::types::{ApplicationData, FormOutcome};

/// Phrases that indicate an application went through, scanned on the
/// post-submit page.
const SUCCESS_INDICATORS: &[&str] = &[
    "thank you",
    "application received",
    "successfully submitted",
    "application complete",
];

/// In-page query over common job-card markup. Cards without a title are
/// noise and dropped in the page itself.
const LISTINGS_JS: &str = r#"
(() => {
    const listings = [];
    const cards = document.querySelectorAll('div[class*="job"], div[class*="position"], div[class*="career"]');
    cards.forEach(card => {
        const listing = {
            title: (card.querySelector('h2, h3, h4, [class*="title"]')?.innerText || '').trim(),
            location: (card.querySelector('[class*="location"]')?.innerText || '').trim(),
            department: (card.querySelector('[class*="department"]')?.innerText || '').trim(),
            link: card.querySelector('a')?.href || '',
            description: (card.querySelector('[class*="description"], [class*="summary"]')?.innerText || '').trim()
        };
        if (listing.title) listings.push(listing);
    });
    return listings;
})()
"#;

/// One job posting pulled off a listings page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPosition {
    pub title: String,
    #[serde(rename = "link")]
    pub url: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub match_score: f64,
}

/// Pull job cards off the current page.
pub async fn extract_listings<S: BrowserSession + ?Sized>(session: &S) -> Result<Vec<JobPosition>> {
    let value = session.evaluate(LISTINGS_JS).await?;
    let listings: Vec<JobPosition> = serde_json::from_value(value).unwrap_or_default();
    info!("extracted {} job listing(s)", listings.len());
    Ok(listings)
}

/// Score one listing against the target position: the model's relevance
/// verdict, boosted by an exact title match and discounted when the
/// listing is tied to a non-remote location.
pub async fn score_relevance(
    llm: &dyn InferenceClient,
    listing: &JobPosition,
    target_position: &str,
) -> f64 {
    let listing_json = serde_json::to_string(listing).unwrap_or_else(|_| "{}".to_string());
    let prompt = codec::render_relevance(&listing_json, target_position);

    let mut score = match llm.complete(&prompt).await {
        Ok(response) => match codec::parse_relevance(&response) {
            Ok(score) => score,
            Err(failure) => {
                warn!("unparsable relevance response: {failure}");
                0.0
            }
        },
        Err(e) => {
            warn!("relevance call failed: {e}");
            0.0
        }
    };

    if listing
        .title
        .to_lowercase()
        .contains(&target_position.to_lowercase())
    {
        score = (score + 0.2).min(1.0);
    }
    if !listing.location.is_empty() && !listing.location.to_lowercase().contains("remote") {
        score *= 0.9;
    }
    score
}

/// Score every listing and keep the ones above the relevance threshold,
/// best first.
pub async fn relevant_listings(
    llm: &dyn InferenceClient,
    listings: Vec<JobPosition>,
    target_position: &str,
    config: &NavigatorConfig,
) -> Vec<JobPosition> {
    let mut relevant = Vec::new();
    for mut listing in listings {
        listing.match_score = score_relevance(llm, &listing, target_position).await;
        if listing.match_score > config.relevance_threshold {
            relevant.push(listing);
        }
    }
    relevant.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    relevant
}

/// Scan the current page for submission-confirmation phrasing.
pub async fn confirm_submission<S: BrowserSession + ?Sized>(session: &S) -> bool {
    let text = match session.body_text().await {
        Ok(text) => text.to_lowercase(),
        Err(e) => {
            warn!("could not read post-submit page: {e}");
            return false;
        }
    };
    SUCCESS_INDICATORS
        .iter()
        .any(|indicator| text.contains(indicator))
}

/// Run one application end to end on a fresh page: navigate to the
/// posting, reach its application form, fill and submit, then confirm.
/// Session-level failures (page handle gone) propagate; everything else
/// is reported in the outcome.
pub async fn apply<S: BrowserSession>(
    session: &S,
    llm: Arc<dyn InferenceClient>,
    config: NavigatorConfig,
    job: &JobPosition,
    data: &ApplicationData,
) -> Result<FormOutcome> {
    let page = session.new_page().await?;
    page.goto(&job.url).await?;

    let navigator = Navigator::new(page, llm, config);
    let reached = navigator
        .navigate_to_state("job application form page")
        .await;
    if !reached.is_success() {
        return Ok(FormOutcome::failed(reached.message()));
    }

    let outcome = navigator.submit_form(data).await;
    if outcome.is_success() && !confirm_submission(navigator.session()).await {
        return Ok(FormOutcome::failed("Could not verify submission success"));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockBrowser;
    use crate::llm::mock::MockInference;
    use serde_json::json;

    fn listing(title: &str, location: &str) -> JobPosition {
        JobPosition {
            title: title.into(),
            url: "https://example.com/jobs/1".into(),
            location: location.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn listings_decode_from_page_evaluation() {
        let session = MockBrowser::new();
        session.push_eval_result(json!([
            {"title": "Data Engineer", "link": "https://example.com/jobs/7", "location": "Berlin", "department": "", "description": "Pipelines"}
        ]));

        let listings = extract_listings(&session).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "Data Engineer");
        assert_eq!(listings[0].url, "https://example.com/jobs/7");
    }

    #[tokio::test]
    async fn title_match_boosts_and_location_discounts() {
        let llm = MockInference::new()
            .with_score(r#"{"relevance": 0.6}"#)
            .with_score(r#"{"relevance": 0.6}"#);

        let boosted = score_relevance(&llm, &listing("Senior Rust Engineer", "Remote"), "rust engineer").await;
        assert!((boosted - 0.8).abs() < 1e-9);

        let discounted = score_relevance(&llm, &listing("Backend Developer", "Berlin"), "rust engineer").await;
        assert!((discounted - 0.54).abs() < 1e-9);
    }

    #[tokio::test]
    async fn threshold_filters_and_orders_listings() {
        let llm = MockInference::new()
            .with_score(r#"{"relevance": 0.9}"#)
            .with_score(r#"{"relevance": 0.3}"#)
            .with_score(r#"{"relevance": 0.8}"#);
        let listings = vec![
            listing("A", "Remote"),
            listing("B", "Remote"),
            listing("C", "Remote"),
        ];

        let kept =
            relevant_listings(&llm, listings, "engineer", &NavigatorConfig::default()).await;
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].title, "A");
        assert_eq!(kept[1].title, "C");
    }

    #[tokio::test]
    async fn unparsable_relevance_scores_zero() {
        let llm = MockInference::new().with_score("hard to say");
        let score = score_relevance(&llm, &listing("A", "Remote"), "engineer").await;
        assert_eq!(score, 0.0);
    }

    #[tokio::test]
    async fn submission_confirmation_scans_body_text() {
        let session = MockBrowser::new().with_page(
            "https://example.com/done",
            "Done",
            "Thank you! Your application has been received.",
            Vec::new(),
        );
        assert!(confirm_submission(&session).await);

        session.set_page("https://example.com/form", "Form", "Please fix the errors below", Vec::new());
        assert!(!confirm_submission(&session).await);
    }
}
