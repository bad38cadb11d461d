//! HTTP dereferencing with RDF content negotiation

use crate::fetcher::{FetchError, FetchResult, ResourceFetcher};
use crate::parse::{format_for, parse_graph};
use ldshape_core::{Graph, HttpConfig};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

pub struct HttpFetcher {
    client: Client,
    accept: String,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> FetchResult<Self> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self {
            client,
            accept: config.accept.clone(),
        })
    }

    pub fn with_client(client: Client, accept: impl Into<String>) -> Self {
        Self {
            client,
            accept: accept.into(),
        }
    }
}

#[async_trait::async_trait]
impl ResourceFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, iri: &str) -> FetchResult<Graph> {
        let mut url = Url::parse(iri).map_err(|e| FetchError::InvalidIri {
            iri: iri.to_string(),
            reason: e.to_string(),
        })?;
        url.set_fragment(None);

        debug!(iri = %url, "Fetching resource");

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, &self.accept)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(iri = %url, status = status.as_u16(), "Fetch failed");
            return Err(FetchError::Status {
                iri: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        // Redirects change the base for relative IRIs.
        let base = response.url().to_string();
        let format = format_for(content_type.as_deref(), &base)?;
        let body = response.bytes().await?;

        let graph = parse_graph(format, Some(&base), &body)?;
        debug!(iri = %url, triples = graph.len(), "Fetched resource");
        Ok(graph)
    }
}
