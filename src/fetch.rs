use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use tracing::debug;

use crate::error::{HarvestError, Result};
use crate::model::{Record, Seed};
use crate::parser;

const USER_AGENT: &str = concat!("profile_harvester/", env!("CARGO_PKG_VERSION"));

/// Where profile markup comes from. The harvester only ever asks for a URL.
pub trait PageSource: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Plain HTTP GET with a per-request timeout. Non-2xx answers are errors.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl PageSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HarvestError::transport(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarvestError::transport(url, format!("HTTP {}", status)));
        }

        resp.text().await.map_err(|e| HarvestError::transport(url, e))
    }
}

/// Result of fetching one id.
#[derive(Debug)]
pub enum FetchOutcome {
    Ok(Record),
    /// Page came back but carried no identity.
    Empty { id: u32, error: HarvestError },
    Failed { id: u32, error: HarvestError },
}

/// Fetch one profile id and run it through the extractor. Never retries.
pub async fn fetch_record<S: PageSource>(source: &S, base_url: &str, id: u32) -> FetchOutcome {
    let seed = Seed::new(base_url, id);

    let markup = match source.fetch(&seed.url).await {
        Ok(m) => m,
        Err(error) => {
            debug!(id, %error, "fetch failed");
            return FetchOutcome::Failed { id, error };
        }
    };

    let record = parser::process_page(&markup, &seed, base_url);
    if record.name == seed.placeholder() {
        debug!(id, "no identity on page");
        return FetchOutcome::Empty {
            id,
            error: HarvestError::EmptyExtraction { url: seed.url },
        };
    }
    FetchOutcome::Ok(record)
}

// ── Test support ──

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;

    use super::*;

    /// In-memory source keyed by URL. Unknown URLs answer with an empty page;
    /// URLs marked broken answer with a transport error.
    #[derive(Default)]
    pub struct MemorySource {
        pages: RwLock<HashMap<String, String>>,
        broken: RwLock<Vec<String>>,
        pub requests: AtomicUsize,
    }

    impl MemorySource {
        pub fn set(&self, url: &str, markup: &str) {
            self.pages.write().unwrap().insert(url.to_string(), markup.to_string());
        }

        pub fn break_url(&self, url: &str) {
            self.broken.write().unwrap().push(url.to_string());
        }

        pub fn request_count(&self) -> usize {
            self.requests.load(Ordering::Relaxed)
        }
    }

    impl PageSource for MemorySource {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.requests.fetch_add(1, Ordering::Relaxed);
            if self.broken.read().unwrap().iter().any(|u| u == url) {
                return Err(HarvestError::transport(url, "connection refused"));
            }
            Ok(self.pages.read().unwrap().get(url).cloned().unwrap_or_default())
        }
    }

    pub fn profile_page(name: &str, verdict: &str) -> String {
        format!(
            "<html><head><title>Jew or Not Jew: {name} - JewOrNotJew.com</title></head>\
             <body><div id=\"profileBody\">{name} was notable for a great many things over the years. \
             Pros: Good deeds Cons: Bad habits Verdict: {verdict}</div></body></html>"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::memory::{profile_page, MemorySource};
    use super::*;

    const BASE: &str = "http://site.test";

    #[tokio::test]
    async fn genuine_page_is_ok() {
        let source = MemorySource::default();
        source.set("http://site.test/profile.jsp?ID=3", &profile_page("Test Person", "Jew"));

        match fetch_record(&source, BASE, 3).await {
            FetchOutcome::Ok(r) => {
                assert_eq!(r.name, "Test Person");
                assert_eq!(r.verdict, "Jew");
                assert_eq!(r.url, "http://site.test/profile.jsp?ID=3");
                assert!(r.created_at <= r.updated_at);
            }
            other => panic!("expected Ok, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn page_without_identity_is_empty() {
        let source = MemorySource::default();
        assert!(matches!(
            fetch_record(&source, BASE, 9).await,
            FetchOutcome::Empty { id: 9, .. }
        ));
    }

    #[tokio::test]
    async fn transport_error_is_failed() {
        let source = MemorySource::default();
        source.break_url("http://site.test/profile.jsp?ID=4");
        match fetch_record(&source, BASE, 4).await {
            FetchOutcome::Failed { id, error } => {
                assert_eq!(id, 4);
                assert!(matches!(error, HarvestError::Transport { .. }));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(source.request_count(), 1);
    }
}
