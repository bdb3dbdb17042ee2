//! AI-guided browser navigation for automated job-application submission.
//!
//! The crate drives a browser session through multi-step navigation and
//! form filling by closing a loop over four moves: capture a structured
//! snapshot of the page, ask a language model whether the target state
//! has been reached (or what actions would reach it), execute the next
//! action with retries and settle waits, and repeat until success or the
//! attempt ceiling.
//!
//! Both external services are trait seams injected at construction:
//! [`browser::BrowserSession`] (implemented on Chrome in [`chrome`], and
//! by a scripted mock for tests) and [`llm::InferenceClient`]. Model
//! output is treated as untrusted text throughout; the [`codec`] parses
//! it defensively and every malformed response degrades to a typed
//! negative result instead of an error.

pub mod browser;
pub mod chrome;
pub mod codec;
pub mod config;
pub mod error;
pub mod executor;
pub mod jobs;
pub mod llm;
pub mod navigator;
pub mod planner;
pub mod snapshot;
pub mod types;
pub mod verifier;

pub use browser::BrowserSession;
pub use chrome::ChromeSession;
pub use config::NavigatorConfig;
pub use error::{AgentError, Result};
pub use llm::{InferenceClient, OpenAiClient};
pub use navigator::Navigator;
pub use types::{
    Action, ActionKind, ApplicationData, ElementDescriptor, FormOutcome, NavigationOutcome,
    NavigationPlan, PageSnapshot, PlanStatus, VerificationResult,
};
