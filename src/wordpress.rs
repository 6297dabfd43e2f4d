use crate::config::EventsConfig;
use crate::error::{Error, Result};
use crate::recurrence::RecurrenceRules;
use log::debug;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Events endpoint of The Events Calendar REST API, relative to the site URL.
pub const EVENTS_ENDPOINT: &str = "wp-json/tribe/events/v1/events";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The JSON body sent to create or update an event.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub title: String,
    pub description: String,
    pub status: String,
    pub start_date: String,
    pub end_date: String,
    pub all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRules>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<VenueRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<OrganizerRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

impl EventPayload {
    pub fn without_organizer(&self) -> EventPayload {
        EventPayload {
            organizer: None,
            ..self.clone()
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct VenueRef {
    pub venue: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OrganizerRef {
    pub organizer: String,
}

/// Status and raw body of an API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200 || self.status == 201
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Id of the created event.
    pub fn event_id(&self) -> Option<i64> {
        self.json()?.get("id")?.as_i64()
    }

    /// The WordPress error code, e.g. `could-not-create-organizer`.
    pub fn error_code(&self) -> Option<String> {
        Some(self.json()?.get("code")?.as_str()?.to_string())
    }

    /// The body pretty-printed if it is JSON, verbatim otherwise.
    pub fn pretty_body(&self) -> String {
        self.json()
            .and_then(|json| serde_json::to_string_pretty(&json).ok())
            .unwrap_or_else(|| self.body.clone())
    }

    fn into_json(self) -> Result<Value> {
        if !(200..300).contains(&self.status) {
            return Err(Error::Status {
                status: self.status,
                body: self.body,
            });
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Creates events. The create loops only talk to this seam, so they can run against a stub.
pub trait EventApi {
    fn create_event(&self, payload: &EventPayload) -> Result<ApiResponse>;
}

/// Blocking client for the events endpoint, authenticating with an application password.
pub struct WordPressClient {
    client: Client,
    api_url: String,
    username: String,
    app_password: String,
}

impl WordPressClient {
    pub fn new(site_url: &str, username: &str, app_password: &str) -> Result<WordPressClient> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(WordPressClient {
            client,
            api_url: format!("{}/{}", site_url.trim_end_matches('/'), EVENTS_ENDPOINT),
            username: username.into(),
            app_password: app_password.into(),
        })
    }

    pub fn from_config(config: &EventsConfig) -> Result<WordPressClient> {
        WordPressClient::new(config.site_url(), &config.username, &config.app_password)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn event_url(&self, id: i64) -> String {
        format!("{}/{}", self.api_url, id)
    }

    fn send(&self, request: RequestBuilder) -> Result<ApiResponse> {
        let response = request
            .basic_auth(&self.username, Some(&self.app_password))
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        debug!("Response status: {}", status);
        Ok(ApiResponse { status, body })
    }

    pub fn get_event(&self, id: i64) -> Result<Value> {
        self.send(self.client.get(self.event_url(id)))?.into_json()
    }

    pub fn update_event(&self, id: i64, payload: &EventPayload) -> Result<ApiResponse> {
        self.send(self.client.post(self.event_url(id)).json(payload))
    }

    pub fn delete_event(&self, id: i64) -> Result<Value> {
        self.send(self.client.delete(self.event_url(id)))?.into_json()
    }
}

impl EventApi for WordPressClient {
    fn create_event(&self, payload: &EventPayload) -> Result<ApiResponse> {
        self.send(self.client.post(&self.api_url).json(payload))
    }
}
