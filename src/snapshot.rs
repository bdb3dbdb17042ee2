//! Page snapshot extraction. Capture is total: any sub-extraction that
//! fails leaves its field empty and logs a warning, so the loop always
//! has a best-effort view of the page to reason about.

use tracing::warn;

use crate::browser::{BrowserSession, settle};
use crate::config::NavigatorConfig;
use crate::types::PageSnapshot;

/// Wait for the page to stabilize, then capture a fresh snapshot.
pub async fn capture<S: BrowserSession + ?Sized>(
    session: &S,
    config: &NavigatorConfig,
) -> PageSnapshot {
    settle(session, config).await;

    let url = session.current_url().await.unwrap_or_else(|e| {
        warn!("could not read page url: {e}");
        String::new()
    });
    let title = session.title().await.unwrap_or_else(|e| {
        warn!("could not read page title: {e}");
        String::new()
    });
    let text = session.body_text().await.unwrap_or_else(|e| {
        warn!("could not read body text: {e}");
        String::new()
    });
    let html = session.page_html().await.unwrap_or_else(|e| {
        warn!("could not read page html: {e}");
        String::new()
    });
    let elements = session.interactive_elements().await.unwrap_or_else(|e| {
        warn!("could not inventory interactive elements: {e}");
        Vec::new()
    });

    PageSnapshot {
        url,
        title,
        text,
        html,
        elements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockBrowser;
    use crate::types::ElementDescriptor;

    #[tokio::test]
    async fn capture_reads_scripted_page() {
        let session = MockBrowser::new().with_page(
            "https://example.com/careers",
            "Careers",
            "Open roles",
            vec![ElementDescriptor {
                tag: "input".into(),
                type_attr: Some("search".into()),
                is_visible: true,
                ..Default::default()
            }],
        );

        let snapshot = capture(&session, &NavigatorConfig::fast()).await;
        assert_eq!(snapshot.url, "https://example.com/careers");
        assert_eq!(snapshot.title, "Careers");
        assert_eq!(snapshot.elements.len(), 1);
        assert_eq!(snapshot.elements[0].tag, "input");
    }

    #[tokio::test]
    async fn capture_is_total_on_an_empty_session() {
        let session = MockBrowser::new();
        let snapshot = capture(&session, &NavigatorConfig::fast()).await;
        assert_eq!(snapshot.url, "");
        assert!(snapshot.elements.is_empty());
    }
}
