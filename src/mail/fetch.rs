//! Mail list API.
//!
//! The server pages its list newest first. `GET /api/mail?max=N&after=ID`
//! returns up to `N` items with an id strictly below `ID` (the parameter
//! name is the server's); without `after` it returns the newest page.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::MailId;

use super::item::MailListItem;

// ============================================================================
// Constants
// ============================================================================

/// Page size the server uses when none is given.
pub const DEFAULT_PAGE_SIZE: usize = 32;

// ============================================================================
// MailFetcher
// ============================================================================

/// Source of mail list pages.
#[async_trait]
pub trait MailFetcher: Send + Sync {
    /// Fetches up to `max` items older than `before` (or the newest items
    /// when `None`), newest first.
    async fn fetch_page(&self, before: Option<MailId>, max: usize) -> Result<Vec<MailListItem>>;
}

// ============================================================================
// HttpMailFetcher
// ============================================================================

/// [`MailFetcher`] backed by the Mercury HTTP API.
#[derive(Debug, Clone)]
pub struct HttpMailFetcher {
    /// Server origin without trailing slashes.
    origin: String,
    /// Shared HTTP client.
    client: reqwest::Client,
}

impl HttpMailFetcher {
    /// Creates a fetcher for the given HTTP origin.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the origin does not parse
    /// - [`Error::Config`] if the scheme is not `http` or `https`
    pub fn new(origin: impl Into<String>) -> Result<Self> {
        Self::with_client(origin, reqwest::Client::new())
    }

    /// Creates a fetcher that reuses an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Same as [`HttpMailFetcher::new`].
    pub fn with_client(origin: impl Into<String>, client: reqwest::Client) -> Result<Self> {
        let mut origin = origin.into();
        while origin.ends_with('/') {
            origin.pop();
        }

        let parsed = Url::parse(&origin)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Unsupported origin scheme '{}'. Expected http or https.",
                parsed.scheme()
            )));
        }

        Ok(Self { origin, client })
    }

    /// Returns the origin without trailing slashes.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Joins `path` onto the origin.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.origin)
        } else {
            format!("{}/{path}", self.origin)
        }
    }

    /// Returns the list URL for one page.
    #[must_use]
    pub fn list_url(&self, before: Option<MailId>, max: usize) -> String {
        match before {
            Some(id) => self.url(&format!("/api/mail?max={max}&after={id}")),
            None => self.url(&format!("/api/mail?max={max}")),
        }
    }

    /// Returns the download URL of the raw message.
    #[must_use]
    pub fn raw_mail_url(&self, id: MailId) -> String {
        self.url(&format!("/api/mail/{id}/raw"))
    }
}

#[async_trait]
impl MailFetcher for HttpMailFetcher {
    async fn fetch_page(&self, before: Option<MailId>, max: usize) -> Result<Vec<MailListItem>> {
        let url = self.list_url(before, max);
        trace!(%url, "Fetching mail page");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::fetch(status.as_u16(), message));
        }

        let items: Vec<MailListItem> = response.json().await?;
        debug!(count = items.len(), ?before, "Fetched mail page");
        Ok(items)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_test::{assert_err, assert_ok};

    /// Serves one canned HTTP response and returns the request line.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let origin = format!("http://{}", listener.local_addr().expect("addr"));

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.expect("write");
            stream.shutdown().await.ok();

            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });

        (origin, handle)
    }

    #[test]
    fn test_origin_trailing_slashes_are_stripped() {
        let fetcher = HttpMailFetcher::new("http://localhost:8080///").expect("fetcher");
        assert_eq!(fetcher.origin(), "http://localhost:8080");
        assert_eq!(fetcher.url("api/mail"), "http://localhost:8080/api/mail");
        assert_eq!(fetcher.url("/api/mail"), "http://localhost:8080/api/mail");
    }

    #[test]
    fn test_list_and_raw_urls() {
        let fetcher = HttpMailFetcher::new("https://mail.example.com").expect("fetcher");
        assert_eq!(
            fetcher.list_url(None, DEFAULT_PAGE_SIZE),
            "https://mail.example.com/api/mail?max=32"
        );
        assert_eq!(
            fetcher.list_url(Some(MailId::new(40)), 10),
            "https://mail.example.com/api/mail?max=10&after=40"
        );
        assert_eq!(
            fetcher.raw_mail_url(MailId::new(7)),
            "https://mail.example.com/api/mail/7/raw"
        );
    }

    #[test]
    fn test_rejects_non_http_origin() {
        assert!(matches!(
            HttpMailFetcher::new("ws://localhost:8080"),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            HttpMailFetcher::new("not an origin"),
            Err(Error::Url(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_page_parses_items() {
        let (origin, server) =
            serve_once("200 OK", r#"[{"id":5,"to":[]},{"id":4,"to":[]}]"#).await;
        let fetcher = HttpMailFetcher::new(origin).expect("fetcher");

        let items = assert_ok!(fetcher.fetch_page(Some(MailId::new(6)), 2).await);

        assert_eq!(
            items.iter().map(|item| item.id).collect::<Vec<_>>(),
            vec![MailId::new(5), MailId::new(4)]
        );
        let request_line = server.await.expect("server");
        assert_eq!(request_line, "GET /api/mail?max=2&after=6 HTTP/1.1");
    }

    #[tokio::test]
    async fn test_fetch_page_maps_error_status() {
        let (origin, _server) =
            serve_once("500 Internal Server Error", "error occurred while fetching list").await;
        let fetcher = HttpMailFetcher::new(origin).expect("fetcher");

        let err = assert_err!(fetcher.fetch_page(None, 32).await);

        match err {
            Error::Fetch { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "error occurred while fetching list");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(Error::fetch(500, "x").is_recoverable());
    }
}
