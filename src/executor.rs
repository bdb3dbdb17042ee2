//! Atomic action execution with bounded retries. Failure is a normal
//! outcome here, reported only through the boolean result: the navigation
//! loop tolerates a failed action and moves on, the form-fill flow aborts
//! on it. Nothing in this module raises.

use tokio::time::sleep;
use tracing::warn;

use crate::browser::{BrowserSession, settle};
use crate::config::NavigatorConfig;
use crate::types::{Action, ActionKind};

/// Apply one action. Up to `config.action_retries` attempts; each waits
/// for the selector to become visible, dispatches by kind, then pauses
/// and runs the readiness wait to absorb triggered navigation or async
/// DOM updates.
pub async fn execute<S: BrowserSession + ?Sized>(
    session: &S,
    action: &Action,
    config: &NavigatorConfig,
) -> bool {
    if action.requires_selector() && action.selector.is_none() {
        warn!("{:?} action has no selector; dropping it", action.kind);
        return false;
    }

    for attempt in 1..=config.action_retries {
        match attempt_action(session, action, config).await {
            Ok(()) => return true,
            Err(reason) => {
                warn!(
                    "action '{}' attempt {attempt}/{} failed: {reason}",
                    action.describe(),
                    config.action_retries
                );
                sleep(config.retry_pause).await;
            }
        }
    }
    false
}

async fn attempt_action<S: BrowserSession + ?Sized>(
    session: &S,
    action: &Action,
    config: &NavigatorConfig,
) -> Result<(), String> {
    if let Some(selector) = &action.selector {
        let visible = session
            .wait_for_selector(selector, config.selector_timeout)
            .await
            .map_err(|e| e.to_string())?;
        if !visible {
            return Err(format!("selector not visible: {selector}"));
        }
    }

    match action.kind {
        ActionKind::Click => {
            let Some(selector) = action.selector.as_deref() else {
                return Err("click action has no selector".into());
            };
            // Re-confirm visibility, then let scroll/animation settle
            // before the click lands.
            let visible = session
                .wait_for_selector(selector, config.selector_timeout)
                .await
                .map_err(|e| e.to_string())?;
            if !visible {
                return Err(format!("element disappeared before click: {selector}"));
            }
            session
                .scroll_into_view(selector)
                .await
                .map_err(|e| e.to_string())?;
            sleep(config.action_settle).await;
            session.click(selector).await.map_err(|e| e.to_string())?;
        }
        ActionKind::Fill => {
            let Some(selector) = action.selector.as_deref() else {
                return Err("fill action has no selector".into());
            };
            let value = action.value.as_deref().unwrap_or_default();
            session
                .fill(selector, value)
                .await
                .map_err(|e| e.to_string())?;
            // Advance focus so blur/change validation listeners fire.
            session.press_key("Tab").await.map_err(|e| e.to_string())?;
        }
        ActionKind::Select => {
            let Some(selector) = action.selector.as_deref() else {
                return Err("select action has no selector".into());
            };
            let value = action.value.as_deref().unwrap_or_default();
            session
                .select_option(selector, value)
                .await
                .map_err(|e| e.to_string())?;
        }
        ActionKind::Navigate => {
            let url = action
                .value
                .as_deref()
                .ok_or_else(|| "navigate action has no url".to_string())?;
            session.goto(url).await.map_err(|e| e.to_string())?;
            settle(session, config).await;
        }
        ActionKind::Wait => {
            let pause = action
                .value
                .as_deref()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(std::time::Duration::from_secs)
                .unwrap_or(config.default_wait);
            sleep(pause).await;
        }
    }

    sleep(config.action_settle).await;
    settle(session, config).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockBrowser;
    use crate::types::Action;

    fn action(kind: ActionKind, selector: Option<&str>, value: Option<&str>) -> Action {
        Action {
            kind,
            selector: selector.map(String::from),
            value: value.map(String::from),
            description: None,
        }
    }

    #[tokio::test]
    async fn visibility_timeout_retries_three_times_then_false() {
        let session = MockBrowser::new();
        session.hide_selector("#submit");
        let config = NavigatorConfig::fast();

        let ok = execute(
            &session,
            &action(ActionKind::Click, Some("#submit"), None),
            &config,
        )
        .await;

        assert!(!ok);
        assert_eq!(session.call_count("wait_for_selector #submit"), 3);
        assert_eq!(session.call_count("click"), 0);
    }

    #[tokio::test]
    async fn fill_advances_focus_after_typing() {
        let session = MockBrowser::new();
        let ok = execute(
            &session,
            &action(ActionKind::Fill, Some("#email"), Some("ada@example.com")),
            &NavigatorConfig::fast(),
        )
        .await;

        assert!(ok);
        let calls = session.calls();
        let fill_idx = calls
            .iter()
            .position(|c| c == "fill #email=ada@example.com")
            .unwrap();
        let tab_idx = calls.iter().position(|c| c == "press_key Tab").unwrap();
        assert!(tab_idx > fill_idx);
    }

    #[tokio::test]
    async fn click_scrolls_into_view_first() {
        let session = MockBrowser::new();
        let ok = execute(
            &session,
            &action(ActionKind::Click, Some("a.apply"), None),
            &NavigatorConfig::fast(),
        )
        .await;

        assert!(ok);
        let calls = session.calls();
        let scroll_idx = calls
            .iter()
            .position(|c| c == "scroll_into_view a.apply")
            .unwrap();
        let click_idx = calls.iter().position(|c| c == "click a.apply").unwrap();
        assert!(click_idx > scroll_idx);
    }

    #[tokio::test]
    async fn wait_accepts_garbage_value() {
        let session = MockBrowser::new();
        let ok = execute(
            &session,
            &action(ActionKind::Wait, None, Some("a moment")),
            &NavigatorConfig::fast(),
        )
        .await;
        assert!(ok);
    }

    #[tokio::test]
    async fn selector_kinds_without_selector_fail_fast() {
        let session = MockBrowser::new();
        let ok = execute(
            &session,
            &action(ActionKind::Fill, None, Some("text")),
            &NavigatorConfig::fast(),
        )
        .await;
        assert!(!ok);
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn navigate_loads_url_directly() {
        let session = MockBrowser::new();
        let ok = execute(
            &session,
            &action(
                ActionKind::Navigate,
                None,
                Some("https://example.com/apply"),
            ),
            &NavigatorConfig::fast(),
        )
        .await;
        assert!(ok);
        assert_eq!(session.call_count("goto https://example.com/apply"), 1);
    }

    #[tokio::test]
    async fn failing_click_exhausts_retries() {
        let session = MockBrowser::new();
        session.fail_selector("#flaky");
        let ok = execute(
            &session,
            &action(ActionKind::Click, Some("#flaky"), None),
            &NavigatorConfig::fast(),
        )
        .await;
        assert!(!ok);
        assert_eq!(session.call_count("click #flaky"), 3);
    }
}
