//! The browser-session seam. The navigation core only ever talks to this
//! trait; the `headless_chrome` binding lives in [`crate::chrome`] and the
//! deterministic test double in [`mock`].

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::warn;

use crate::config::NavigatorConfig;
use crate::error::Result;
use crate::types::ElementDescriptor;

/// In-page query that inventories interactive elements. Mirrors the shape
/// of [`ElementDescriptor`]; `isVisible` keys off `offsetParent`, which is
/// null for anything removed from layout.
pub(crate) const ELEMENTS_JS: &str = r#"
(() => {
    if (!document.body) return [];
    const elements = document.querySelectorAll('input, button, a, select, textarea, form');
    return Array.from(elements).map(el => ({
        tag: el.tagName.toLowerCase(),
        type: el.type || null,
        id: el.id || null,
        name: el.name || null,
        placeholder: el.placeholder || null,
        text: el.innerText ? el.innerText.trim().slice(0, 120) : null,
        href: el.href || null,
        classes: Array.from(el.classList),
        isVisible: el.offsetParent !== null
    }));
})()
"#;

const READY_JS: &str = r#"
(() => document.readyState === 'complete'
    && document.body !== null
    && document.body.children.length > 0)()
"#;

/// Escape a CSS selector for interpolation into a single-quoted JS string.
pub(crate) fn js_quote(selector: &str) -> String {
    selector.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Primitives the navigation core needs from a live page. One instance is
/// one page; concurrent jobs isolate themselves with [`new_page`] rather
/// than sharing a session.
///
/// [`new_page`]: BrowserSession::new_page
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Load a URL directly. Errors here mean the page handle itself is
    /// unusable and are the one condition the core does not mask.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Run a JS expression in the page and return its JSON value.
    async fn evaluate(&self, js: &str) -> Result<Value>;

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()>;

    async fn wait_for_dom_content(&self, timeout: Duration) -> Result<()>;

    /// Wait for `selector` to resolve to a visible element. `Ok(false)`
    /// on timeout; this is a retryable condition, not an error.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Set a field's value. Does not advance focus; the executor follows
    /// up with a Tab keystroke to fire blur/change listeners.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    async fn select_option(&self, selector: &str, value: &str) -> Result<()>;

    /// Send a key to the focused element.
    async fn press_key(&self, key: &str) -> Result<()>;

    /// Open a fresh page in the same browser. Per-job application runs
    /// must live on their own page to avoid cross-job navigation races.
    async fn new_page(&self) -> Result<Self>
    where
        Self: Sized;

    async fn current_url(&self) -> Result<String> {
        Ok(string_of(self.evaluate("window.location.href").await?))
    }

    async fn title(&self) -> Result<String> {
        Ok(string_of(self.evaluate("document.title").await?))
    }

    async fn body_text(&self) -> Result<String> {
        Ok(string_of(
            self.evaluate("document.body ? document.body.innerText : ''")
                .await?,
        ))
    }

    async fn page_html(&self) -> Result<String> {
        Ok(string_of(
            self.evaluate("document.documentElement ? document.documentElement.outerHTML : ''")
                .await?,
        ))
    }

    async fn interactive_elements(&self) -> Result<Vec<ElementDescriptor>> {
        let value = self.evaluate(ELEMENTS_JS).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// The readiness predicate: document complete, body present, body
    /// non-empty.
    async fn is_document_ready(&self) -> Result<bool> {
        Ok(self.evaluate(READY_JS).await?.as_bool().unwrap_or(false))
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<()> {
        let js = format!(
            "(() => {{ const el = document.querySelector('{}'); if (el) el.scrollIntoView(); }})()",
            js_quote(selector)
        );
        self.evaluate(&js).await?;
        Ok(())
    }
}

fn string_of(value: Value) -> String {
    value.as_str().map(String::from).unwrap_or_default()
}

/// Shared readiness wait: network idle, then DOM content, then poll the
/// document-ready predicate, then a fixed settle delay for deferred
/// script-driven mutations. Runs before every extraction and after every
/// action. Every stage timeout is non-fatal; partial state is better than
/// no state.
pub async fn settle<S: BrowserSession + ?Sized>(session: &S, config: &NavigatorConfig) {
    if let Err(e) = session.wait_for_network_idle(config.load_timeout).await {
        warn!("network-idle wait did not complete: {e}");
    }
    if let Err(e) = session.wait_for_dom_content(config.load_timeout).await {
        warn!("dom-content wait did not complete: {e}");
    }

    let deadline = Instant::now() + config.load_timeout;
    loop {
        match session.is_document_ready().await {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => {
                warn!("readiness predicate failed: {e}");
                break;
            }
        }
        if Instant::now() >= deadline {
            warn!("page readiness timeout - continuing with partial load");
            break;
        }
        sleep(config.ready_poll_interval).await;
    }

    sleep(config.settle_delay).await;
}

pub mod mock {
    //! Scripted browser session for tests. Records every interaction and
    //! serves page state from in-memory fixtures, so loop semantics can be
    //! asserted without a Chrome process.

    use super::*;
    use std::collections::{HashSet, VecDeque};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct MockState {
        url: String,
        title: String,
        text: String,
        html: String,
        elements: Vec<ElementDescriptor>,
        ready: bool,
        /// Selectors that never become visible.
        hidden: HashSet<String>,
        /// Selectors whose click/fill/select raises.
        failing: HashSet<String>,
        eval_results: VecDeque<Value>,
        calls: Vec<String>,
    }

    /// Clone-shared: [`BrowserSession::new_page`] hands back a handle onto
    /// the same scripted state.
    #[derive(Clone, Default)]
    pub struct MockBrowser {
        inner: Arc<Mutex<MockState>>,
    }

    impl MockBrowser {
        pub fn new() -> Self {
            let mock = Self::default();
            mock.inner.lock().unwrap().ready = true;
            mock
        }

        pub fn with_page(
            self,
            url: &str,
            title: &str,
            text: &str,
            elements: Vec<ElementDescriptor>,
        ) -> Self {
            self.set_page(url, title, text, elements);
            self
        }

        pub fn set_page(&self, url: &str, title: &str, text: &str, elements: Vec<ElementDescriptor>) {
            let mut state = self.inner.lock().unwrap();
            state.url = url.to_string();
            state.title = title.to_string();
            state.text = text.to_string();
            state.elements = elements;
        }

        /// Make a selector permanently invisible to `wait_for_selector`.
        pub fn hide_selector(&self, selector: &str) {
            self.inner.lock().unwrap().hidden.insert(selector.to_string());
        }

        /// Make click/fill/select on a selector raise.
        pub fn fail_selector(&self, selector: &str) {
            self.inner
                .lock()
                .unwrap()
                .failing
                .insert(selector.to_string());
        }

        /// Queue a value for the next raw `evaluate` call.
        pub fn push_eval_result(&self, value: Value) {
            self.inner.lock().unwrap().eval_results.push_back(value);
        }

        pub fn calls(&self) -> Vec<String> {
            self.inner.lock().unwrap().calls.clone()
        }

        pub fn call_count(&self, prefix: &str) -> usize {
            self.inner
                .lock()
                .unwrap()
                .calls
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }

        fn record(&self, call: String) {
            self.inner.lock().unwrap().calls.push(call);
        }
    }

    #[async_trait]
    impl BrowserSession for MockBrowser {
        async fn goto(&self, url: &str) -> Result<()> {
            self.record(format!("goto {url}"));
            self.inner.lock().unwrap().url = url.to_string();
            Ok(())
        }

        async fn evaluate(&self, _js: &str) -> Result<Value> {
            self.record("evaluate".to_string());
            Ok(self
                .inner
                .lock()
                .unwrap()
                .eval_results
                .pop_front()
                .unwrap_or(Value::Null))
        }

        async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<()> {
            Ok(())
        }

        async fn wait_for_dom_content(&self, _timeout: Duration) -> Result<()> {
            Ok(())
        }

        async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<bool> {
            self.record(format!("wait_for_selector {selector}"));
            Ok(!self.inner.lock().unwrap().hidden.contains(selector))
        }

        async fn click(&self, selector: &str) -> Result<()> {
            self.record(format!("click {selector}"));
            if self.inner.lock().unwrap().failing.contains(selector) {
                return Err(anyhow::anyhow!("scripted click failure: {selector}").into());
            }
            Ok(())
        }

        async fn fill(&self, selector: &str, value: &str) -> Result<()> {
            self.record(format!("fill {selector}={value}"));
            if self.inner.lock().unwrap().failing.contains(selector) {
                return Err(anyhow::anyhow!("scripted fill failure: {selector}").into());
            }
            Ok(())
        }

        async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
            self.record(format!("select {selector}={value}"));
            if self.inner.lock().unwrap().failing.contains(selector) {
                return Err(anyhow::anyhow!("scripted select failure: {selector}").into());
            }
            Ok(())
        }

        async fn press_key(&self, key: &str) -> Result<()> {
            self.record(format!("press_key {key}"));
            Ok(())
        }

        async fn new_page(&self) -> Result<Self> {
            self.record("new_page".to_string());
            Ok(self.clone())
        }

        async fn current_url(&self) -> Result<String> {
            Ok(self.inner.lock().unwrap().url.clone())
        }

        async fn title(&self) -> Result<String> {
            Ok(self.inner.lock().unwrap().title.clone())
        }

        async fn body_text(&self) -> Result<String> {
            Ok(self.inner.lock().unwrap().text.clone())
        }

        async fn page_html(&self) -> Result<String> {
            Ok(self.inner.lock().unwrap().html.clone())
        }

        async fn interactive_elements(&self) -> Result<Vec<ElementDescriptor>> {
            Ok(self.inner.lock().unwrap().elements.clone())
        }

        async fn is_document_ready(&self) -> Result<bool> {
            Ok(self.inner.lock().unwrap().ready)
        }

        async fn scroll_into_view(&self, selector: &str) -> Result<()> {
            self.record(format!("scroll_into_view {selector}"));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockBrowser;
    use super::*;

    #[tokio::test]
    async fn settle_is_idempotent_on_a_ready_page() {
        let session = MockBrowser::new().with_page("https://a", "A", "body", Vec::new());
        let config = NavigatorConfig::fast();

        settle(&session, &config).await;
        let url_before = session.current_url().await.unwrap();
        let title_before = session.title().await.unwrap();

        settle(&session, &config).await;
        assert_eq!(session.current_url().await.unwrap(), url_before);
        assert_eq!(session.title().await.unwrap(), title_before);
    }

    #[tokio::test]
    async fn hidden_selectors_time_out() {
        let session = MockBrowser::new();
        session.hide_selector("#gone");
        assert!(
            !session
                .wait_for_selector("#gone", Duration::from_millis(1))
                .await
                .unwrap()
        );
        assert!(
            session
                .wait_for_selector("#present", Duration::from_millis(1))
                .await
                .unwrap()
        );
    }

    #[test]
    fn js_quote_escapes_single_quotes() {
        assert_eq!(js_quote("a'b"), "a\\'b");
        assert_eq!(js_quote("a\\b"), "a\\\\b");
    }
}
