// src/profile/rest.rs

use super::model::{Profile, ProfileUpdate};
use super::store::ProfileStore;
use crate::config::Settings;
use crate::error::BffError;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use tracing::{debug, instrument};
use url::Url;

const PROFILES_PATH: &str = "/rest/v1/profiles";

/// Whether writes ask PostgREST to send the affected rows back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnPreference {
    #[default]
    Representation,
    Minimal,
}

impl ReturnPreference {
    fn header_value(self) -> &'static str {
        match self {
            ReturnPreference::Representation => "return=representation",
            ReturnPreference::Minimal => "return=minimal",
        }
    }
}

/// [`ProfileStore`] backed by a PostgREST endpoint, authenticated with the
/// service-role key.
#[derive(Clone)]
pub struct RestProfileStore {
    http_client: reqwest::Client,
    endpoint: Url,
    service_key: String,
    returning: ReturnPreference,
}

impl RestProfileStore {
    pub fn new(settings: &Settings) -> Result<Self, BffError> {
        if settings.service_role_key.is_empty() {
            return Err(BffError::MissingConfiguration("service_role_key".to_string()));
        }
        let endpoint = Url::parse(&format!("{}{PROFILES_PATH}", settings.base_url))
            .map_err(|e| BffError::InvalidUrl(e.to_string()))?;
        let http_client = reqwest::Client::builder()
            .timeout(settings.fetch_timeout)
            .build()?;
        Ok(Self {
            http_client,
            endpoint,
            service_key: settings.service_role_key.clone(),
            returning: ReturnPreference::default(),
        })
    }

    /// Sets the return policy for writes.
    pub fn returning(mut self, returning: ReturnPreference) -> Self {
        self.returning = returning;
        self
    }

    fn request(&self, method: Method, query: &[(&str, String)]) -> RequestBuilder {
        let mut url = self.endpoint.clone();
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        self.http_client
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn write(&self, method: Method, query: &[(&str, String)], prefer: &str) -> RequestBuilder {
        let prefer = if prefer.is_empty() {
            self.returning.header_value().to_string()
        } else {
            format!("{prefer},{}", self.returning.header_value())
        };
        self.request(method, query).header("Prefer", prefer)
    }

    async fn rows(&self, response: Response, what: &str) -> Result<Vec<Profile>, BffError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BffError::Store(format!("{what} failed with {status}: {body}")));
        }
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ProfileStore for RestProfileStore {
    #[instrument(skip(self), err)]
    async fn select_by_id(&self, id: &str) -> Result<Option<Profile>, BffError> {
        let query = [
            ("select", "*".to_string()),
            ("id", format!("eq.{id}")),
            ("limit", "1".to_string()),
        ];
        let response = self.request(Method::GET, &query).send().await?;
        Ok(self.rows(response, "select").await?.into_iter().next())
    }

    #[instrument(skip(self, profile), fields(id = %profile.id), err)]
    async fn upsert(&self, profile: &Profile) -> Result<Option<Profile>, BffError> {
        let query = [("on_conflict", "id".to_string())];
        let response = self
            .write(Method::POST, &query, "resolution=merge-duplicates")
            .json(profile)
            .send()
            .await?;
        let row = self.rows(response, "upsert").await?.into_iter().next();
        debug!("Upserted profile {} (row returned: {})", profile.id, row.is_some());
        Ok(row)
    }

    #[instrument(skip(self, changes), err)]
    async fn update(&self, id: &str, changes: &ProfileUpdate) -> Result<Option<Profile>, BffError> {
        let query = [("id", format!("eq.{id}"))];
        let response = self
            .write(Method::PATCH, &query, "")
            .json(changes)
            .send()
            .await?;
        Ok(self.rows(response, "update").await?.into_iter().next())
    }

    #[instrument(skip(self), err)]
    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Profile>, BffError> {
        let query = [
            ("select", "*".to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ];
        let response = self.request(Method::GET, &query).send().await?;
        self.rows(response, "list").await
    }
}
