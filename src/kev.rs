use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::constants::feed::FEED_TIMEOUT_SECS;
use crate::errors::TriageError;
use crate::types::CveId;

/// One entry of the exploited-vulnerability feed; only the identifier
/// field is consumed.
#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(rename = "cveID")]
    cve_id: CveId,
}

/// Top-level shape of the exploited-vulnerability feed document.
#[derive(Debug, Deserialize)]
struct FeedDocument {
    vulnerabilities: Vec<FeedEntry>,
}

/// Immutable set of actively exploited vulnerability identifiers.
///
/// Built once before any worker starts and never written afterward,
/// so concurrent membership tests need no synchronization.
#[derive(Debug)]
pub struct ExploitedIndex {
    ids: HashSet<CveId>,
}

impl ExploitedIndex {
    /// Fetch the feed once and build the index.
    ///
    /// Any network, status, or parse failure is fatal
    /// (`FeedUnavailable`): the exploited flag cannot be computed
    /// correctly without the full feed, and there is no stale fallback.
    pub fn fetch(url: &str) -> Result<Self, TriageError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
            .build()
            .map_err(feed_unavailable)?;
        let body = client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(feed_unavailable)?
            .text()
            .map_err(feed_unavailable)?;
        let index = Self::parse(&body)?;
        info!(url, count = index.len(), "exploited-vulnerability feed loaded");
        Ok(index)
    }

    /// Parse a feed document body into an index.
    ///
    /// A missing or malformed `vulnerabilities` list, or an entry
    /// without a string `cveID`, is a `FeedUnavailable` failure.
    pub fn parse(body: &str) -> Result<Self, TriageError> {
        let document: FeedDocument = serde_json::from_str(body)
            .map_err(|err| TriageError::FeedUnavailable {
                reason: format!("malformed feed document: {err}"),
            })?;
        Ok(Self::from_ids(
            document.vulnerabilities.into_iter().map(|entry| entry.cve_id),
        ))
    }

    /// Build an index from explicit identifiers (test and replay use).
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<CveId>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Membership test for one identifier.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Number of distinct identifiers in the index.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` when the feed carried no identifiers.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn feed_unavailable(err: reqwest::Error) -> TriageError {
    TriageError::FeedUnavailable {
        reason: err.to_string(),
    }
}
