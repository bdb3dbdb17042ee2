//! [`BrowserSession`] on a real Chrome via `headless_chrome`. All CDP
//! calls are blocking, so every trait method hops onto the blocking pool;
//! the async loop only ever suspends at these boundaries.

use anyhow::anyhow;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::info;

use crate::browser::{BrowserSession, js_quote};
use crate::error::{AgentError, Result};

pub struct ChromeSession {
    browser: Arc<Browser>,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch a Chrome instance and open a blank page.
    pub async fn launch(headless: bool) -> Result<Self> {
        let (browser, tab) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
            let options = LaunchOptions {
                headless,
                args: vec![
                    OsStr::new("--no-first-run"),
                    OsStr::new("--no-default-browser-check"),
                    OsStr::new("--disable-blink-features=AutomationControlled"),
                ],
                idle_browser_timeout: Duration::from_secs(300),
                ..Default::default()
            };
            let browser =
                Browser::new(options).map_err(|e| anyhow!("browser launch failed: {e}"))?;
            let tab = browser
                .new_tab()
                .map_err(|e| anyhow!("could not open initial tab: {e}"))?;
            tab.navigate_to("about:blank")
                .map_err(|e| anyhow!("initial navigation failed: {e}"))?;
            Ok((browser, tab))
        })
        .await
        .map_err(|e| AgentError::Browser(anyhow!("browser task panicked: {e}")))??;

        info!("chrome launched (headless: {headless})");
        Ok(Self {
            browser: Arc::new(browser),
            tab,
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Tab>) -> anyhow::Result<T> + Send + 'static,
    {
        let tab = self.tab.clone();
        tokio::task::spawn_blocking(move || f(tab))
            .await
            .map_err(|e| AgentError::Browser(anyhow!("browser task panicked: {e}")))?
            .map_err(AgentError::Browser)
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.blocking(move |tab| {
            tab.navigate_to(&url)
                .map_err(|e| anyhow!("navigation to {url} failed: {e}"))?;
            Ok(())
        })
        .await
    }

    async fn evaluate(&self, js: &str) -> Result<Value> {
        let js = js.to_string();
        self.blocking(move |tab| {
            let result = tab
                .evaluate(&js, false)
                .map_err(|e| anyhow!("script evaluation failed: {e}"))?;
            Ok(result.value.unwrap_or(Value::Null))
        })
        .await
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<()> {
        // CDP has no direct network-idle signal here; navigation
        // completion is the closest equivalent.
        self.blocking(move |tab| {
            tab.wait_until_navigated()
                .map_err(|e| anyhow!("navigation wait failed: {e}"))?;
            Ok(())
        })
        .await
    }

    async fn wait_for_dom_content(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.evaluate("document.readyState").await?;
            match state.as_str() {
                Some("interactive") | Some("complete") => return Ok(()),
                _ => {}
            }
            if Instant::now() >= deadline {
                return Err(AgentError::Browser(anyhow!(
                    "dom-content wait timed out after {timeout:?}"
                )));
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            match tab.wait_for_element_with_custom_timeout(&selector, timeout) {
                Ok(element) => Ok(element.is_visible().unwrap_or(true)),
                Err(_) => Ok(false),
            }
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|e| anyhow!("element not found for click ({selector}): {e}"))?;
            element
                .click()
                .map_err(|e| anyhow!("click failed ({selector}): {e}"))?;
            Ok(())
        })
        .await
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let selector = selector.to_string();
        let value = value.to_string();
        self.blocking(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|e| anyhow!("element not found for fill ({selector}): {e}"))?;
            element
                .click()
                .map_err(|e| anyhow!("focus failed ({selector}): {e}"))?;
            // Clear any prefilled value before typing.
            let _ = element.call_js_fn(
                "function () { if ('value' in this) { this.value = ''; } }",
                vec![],
                false,
            );
            element
                .type_into(&value)
                .map_err(|e| anyhow!("typing failed ({selector}): {e}"))?;
            Ok(())
        })
        .await
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        let js = format!(
            "(() => {{ const el = document.querySelector('{}'); if (!el) return false; \
             el.value = '{}'; el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            js_quote(selector),
            js_quote(value)
        );
        let applied = self.evaluate(&js).await?.as_bool().unwrap_or(false);
        if !applied {
            return Err(AgentError::Browser(anyhow!(
                "select target not found: {selector}"
            )));
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |tab| {
            tab.press_key(&key)
                .map_err(|e| anyhow!("key press '{key}' failed: {e}"))?;
            Ok(())
        })
        .await
    }

    async fn new_page(&self) -> Result<Self> {
        let browser = self.browser.clone();
        let tab = tokio::task::spawn_blocking(move || {
            browser
                .new_tab()
                .map_err(|e| anyhow!("could not open page: {e}"))
        })
        .await
        .map_err(|e| AgentError::Browser(anyhow!("browser task panicked: {e}")))??;

        Ok(Self {
            browser: self.browser.clone(),
            tab,
        })
    }
}
