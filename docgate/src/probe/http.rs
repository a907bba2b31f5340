//! reqwest-backed link probe with soft-404 detection

use async_trait::async_trait;

use super::{LinkProbe, ProbeConfig, ProbeOutcome, ProbeStatus};

/// Body substrings that mark a 2xx page as an error page
const SOFT_404_MARKERS: &[(&str, &str)] = &[
    ("<title>404", "page title contains 404"),
    ("<title>page not found", "page title indicates not found"),
    ("<title>error 404", "page title indicates error 404"),
    ("<title>not found", "page title indicates not found"),
    ("<title>page does not exist", "page title indicates non-existent"),
    ("<title>page has been removed", "page title indicates removed"),
    ("<title>content not found", "page title indicates content not found"),
    ("<title>oops", "page title suggests error page"),
    ("<h1>404</h1>", "heading indicates 404"),
    ("<h1>page not found</h1>", "heading indicates not found"),
    ("<h1>not found</h1>", "heading indicates not found"),
    ("the page you requested could not be found", "error message found"),
    ("the page you are looking for doesn't exist", "error message found"),
    ("the page you are looking for does not exist", "error message found"),
    ("this page doesn't exist", "error message found"),
    ("this page does not exist", "error message found"),
    ("sorry, we couldn't find that page", "error message found"),
    ("the requested url was not found", "error message found"),
    ("the requested page was not found", "error message found"),
    ("this content has been removed", "content removed message"),
    ("this article has been removed", "content removed message"),
    ("no longer available", "content unavailable message"),
    ("page has been archived", "archived message"),
    ("http error 404", "HTTP error 404 text found"),
    ("status code: 404", "status code 404 found"),
];

/// Reason a 2xx body looks like an error page, if it does
pub fn detect_soft_404(body: &str) -> Option<&'static str> {
    let lower = body.to_lowercase();
    for &(marker, reason) in SOFT_404_MARKERS {
        if lower.contains(marker) {
            return Some(reason);
        }
    }
    let error_target = ["error", "404", "not-found", "notfound"]
        .iter()
        .any(|m| lower.contains(m));
    if lower.contains("http-equiv=\"refresh\"") && error_target {
        return Some("meta refresh to error page detected");
    }
    None
}

/// Map an HTTP status (and the body of a 2xx) to a probe outcome
pub fn classify_status(url: &str, status: u16, body: Option<&str>) -> ProbeOutcome {
    match status {
        200..=299 => match body.and_then(detect_soft_404) {
            Some(reason) => ProbeOutcome::new(
                url,
                ProbeStatus::Soft404 {
                    reason: reason.to_string(),
                },
            ),
            None => ProbeOutcome::new(url, ProbeStatus::Valid),
        },
        300..=399 => ProbeOutcome::new(url, ProbeStatus::ValidWithWarning)
            .with_warning(format!("URL redirects (HTTP {}): {}", status, url)),
        403 => ProbeOutcome::new(url, ProbeStatus::ValidWithWarning)
            .with_warning(format!("URL access forbidden (HTTP 403): {}", url)),
        404 => ProbeOutcome::new(url, ProbeStatus::NotFound),
        other => ProbeOutcome::new(url, ProbeStatus::HttpError { status: other }),
    }
}

/// Probes URLs with a GET, without following redirects
pub struct HttpLinkProbe {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpLinkProbe {
    pub fn new(config: &ProbeConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("docgate-link-probe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    async fn read_prefix(&self, mut response: reqwest::Response) -> Option<String> {
        let mut buf: Vec<u8> = Vec::new();
        while buf.len() < self.max_body_bytes {
            match response.chunk().await {
                Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(_) => return None,
            }
        }
        buf.truncate(self.max_body_bytes);
        Some(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[async_trait]
impl LinkProbe for HttpLinkProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let response = match self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return ProbeOutcome::timed_out(url),
            Err(e) => {
                return ProbeOutcome::new(
                    url,
                    ProbeStatus::Unreachable {
                        reason: e.to_string(),
                    },
                )
            }
        };

        let status = response.status().as_u16();
        if response.status().is_success() {
            let body = self.read_prefix(response).await;
            classify_status(url, status, body.as_deref())
        } else {
            classify_status(url, status, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_statuses() {
        let u = "https://a.io";
        assert_eq!(classify_status(u, 200, Some("<html>ok</html>")).status, ProbeStatus::Valid);
        assert_eq!(classify_status(u, 404, None).status, ProbeStatus::NotFound);
        assert_eq!(
            classify_status(u, 500, None).status,
            ProbeStatus::HttpError { status: 500 }
        );

        let redirect = classify_status(u, 301, None);
        assert_eq!(redirect.status, ProbeStatus::ValidWithWarning);
        assert!(redirect.warning.unwrap().contains("HTTP 301"));

        let forbidden = classify_status(u, 403, None);
        assert_eq!(forbidden.status, ProbeStatus::ValidWithWarning);
        assert!(forbidden.to_issue().is_none());
    }

    #[test]
    fn test_soft_404_detection() {
        let outcome = classify_status(
            "https://a.io",
            200,
            Some("<html><head><TITLE>Page Not Found</TITLE></head></html>"),
        );
        assert!(matches!(outcome.status, ProbeStatus::Soft404 { .. }));
        assert!(outcome.to_issue().is_some());

        assert_eq!(
            detect_soft_404(r#"<meta http-equiv="refresh" content="0; url=/not-found">"#),
            Some("meta refresh to error page detected")
        );
        assert_eq!(detect_soft_404("<h1>Welcome</h1>"), None);
    }
}
