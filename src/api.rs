//! Client for the portfolio's REST api.
//!
//! Every response is decoded exactly once into an [`ApiResult`], so callers
//! only ever see typed records or a failure with the server's message.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::domain::FolioError;
use crate::record::{Blog, Collection, Project, Record};
use crate::store::{RecordDraft, RecordStore};

/// Outcome of one api call after decoding the `{ success, message, data }` envelope.
#[derive(Debug, PartialEq)]
pub enum ApiResult<T> {
    Success(T),
    Failure { status: u16, message: String },
}

impl<T> ApiResult<T> {
    pub fn into_result(self) -> Result<T, FolioError> {
        match self {
            ApiResult::Success(value) => Ok(value),
            ApiResult::Failure { status, message } => Err(FolioError::Api { status, message }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: Option<bool>,
    message: Option<String>,
    data: Option<T>,
}

fn failure_message(bytes: &[u8], fallback: &str) -> String {
    serde_json::from_slice::<Envelope<IgnoredAny>>(bytes)
        .ok()
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn decode<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<ApiResult<T>, FolioError> {
    let status = response.status();
    let bytes = response.bytes()?;
    if !status.is_success() {
        return Ok(ApiResult::Failure {
            status: status.as_u16(),
            message: failure_message(&bytes, fallback),
        });
    }

    let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
    match (envelope.success, envelope.data) {
        (Some(false), _) | (_, None) => Ok(ApiResult::Failure {
            status: status.as_u16(),
            message: envelope.message.unwrap_or_else(|| fallback.to_string()),
        }),
        (_, Some(data)) => Ok(ApiResult::Success(data)),
    }
}

// Mutations only care about the status; the body may be empty.
fn decode_ack(response: Response, fallback: &str) -> Result<ApiResult<()>, FolioError> {
    let status = response.status();
    if status.is_success() {
        return Ok(ApiResult::Success(()));
    }
    let bytes = response.bytes()?;
    Ok(ApiResult::Failure {
        status: status.as_u16(),
        message: failure_message(&bytes, &format!("{fallback}: {}", status.as_u16())),
    })
}

/// Claims carried in the access token's payload segment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

impl Claims {
    /// Reads the payload of a jwt without verifying it. Verification is the server's job.
    pub fn decode(token: &str) -> Result<Self, FolioError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| FolioError::InvalidToken("expected three segments".into()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| FolioError::InvalidToken(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| FolioError::InvalidToken(e.to_string()))
    }
}

/// An access token plus whatever could be read from it.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    claims: Option<Claims>,
}

impl Session {
    pub fn from_token(token: impl Into<String>) -> Self {
        let token = token.into();
        let claims = match Claims::decode(&token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                warn!("Could not read token claims: {e}");
                None
            }
        };
        Session { token, claims }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct BlogPage {
    blogs: Vec<Blog>,
}

pub struct ApiClient {
    base_url: String,
    client: Client,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FolioError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session: None,
        })
    }

    /// Grants the client the right to mutate records.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Exchanges credentials for an access token.
    #[instrument(skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> Result<Session, FolioError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(FolioError::LoginFailed("Email and password required".into()));
        }
        let response = self
            .client
            .post(self.url("auth/login"))
            .json(&LoginRequest { email, password })
            .send()?;
        let data: LoginData = match decode(response, "Invalid credentials")? {
            ApiResult::Success(data) => data,
            ApiResult::Failure { message, .. } => return Err(FolioError::LoginFailed(message)),
        };
        let token = data
            .access_token
            .ok_or_else(|| FolioError::LoginFailed("Token not found in response".into()))?;
        let claims = Claims::decode(&token)?;
        info!("Signed in as {} ({}, id {:?})", claims.email, claims.role, claims.id);
        Ok(Session {
            token,
            claims: Some(claims),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, FolioError> {
        let session = self.session.as_ref().ok_or(FolioError::Unauthorized)?;
        Ok(request.bearer_auth(session.token()))
    }
}

impl RecordStore for ApiClient {
    #[instrument(skip(self))]
    fn list(&self, collection: Collection) -> Result<Vec<Record>, FolioError> {
        let fallback = format!("Failed to fetch {}", collection.label());
        let records: Vec<Record> = match collection {
            Collection::Blogs => {
                let response = self.client.get(self.url("blogs?limit=500&page=1")).send()?;
                let page: BlogPage = decode(response, &fallback)?.into_result()?;
                page.blogs.into_iter().map(Record::Blog).collect()
            }
            Collection::Projects => {
                let response = self.client.get(self.url("projects")).send()?;
                let projects: Vec<Project> = decode(response, &fallback)?.into_result()?;
                projects.into_iter().map(Record::Project).collect()
            }
        };
        debug!("Fetched {} {}", records.len(), collection.label());
        Ok(records)
    }

    #[instrument(skip(self, draft), fields(title = draft.title()))]
    fn create(&self, draft: &RecordDraft) -> Result<(), FolioError> {
        let collection = draft.collection();
        let request = self.client.post(self.url(collection.label())).json(draft);
        let response = self.authorized(request)?.send()?;
        let fallback = format!("Error creating {}", collection.noun().to_lowercase());
        decode_ack(response, &fallback)?.into_result()
    }

    #[instrument(skip(self, draft))]
    fn update(&self, id: u64, draft: &RecordDraft) -> Result<(), FolioError> {
        let path = format!("{}/{id}", draft.collection().label());
        let request = self.client.patch(self.url(&path)).json(draft);
        let response = self.authorized(request)?.send()?;
        decode_ack(response, "Update failed")?.into_result()
    }

    #[instrument(skip(self))]
    fn delete(&self, collection: Collection, id: u64) -> Result<(), FolioError> {
        let path = format!("{}/{id}", collection.label());
        let request = self.client.delete(self.url(&path));
        let response = self.authorized(request)?.send()?;
        decode_ack(response, "Delete failed")?.into_result()
    }

    fn describe(&self) -> String {
        match self.session.as_ref().and_then(|s| s.claims()) {
            Some(claims) => format!("{} as {}", self.base_url, claims.email),
            None if self.session.is_some() => format!("{} (token)", self.base_url),
            None => format!("{} (read-only)", self.base_url),
        }
    }
}
