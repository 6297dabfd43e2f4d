use crate::config::{DATE_FORMAT, DEFAULT_MEETING_TIMEZONE, MeetingDefinition, ZoomCredentials};
use crate::error::{Error, Result};
use crate::recurrence::RecurrenceDescriptor;
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use log::debug;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

pub const ZOOM_API_BASE: &str = "https://api.zoom.us/v2";
pub const ZOOM_TOKEN_URL: &str = "https://zoom.us/oauth/token";

/// Tokens are renewed this many seconds before Zoom expires them.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 300;

/// Recurring meeting with a fixed time.
const RECURRING_FIXED_TIME: u8 = 8;

const DAILY: u8 = 1;
const WEEKLY: u8 = 2;
const MONTHLY: u8 = 3;

/// The `recurrence` object of a Zoom meeting.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ZoomRecurrence {
    #[serde(rename = "type")]
    pub recurrence_type: u8,
    pub repeat_interval: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_days: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_week: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_week_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_times: Option<u32>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MeetingSettings {
    pub host_video: bool,
    pub participant_video: bool,
    pub join_before_host: bool,
    pub mute_upon_entry: bool,
    pub watermark: bool,
    pub use_pmi: bool,
    /// 0 auto-approves registrants, 1 approves manually, 2 turns registration off.
    pub approval_type: u8,
    pub registration_type: u8,
    pub audio: String,
    pub auto_recording: String,
    pub waiting_room: bool,
    pub meeting_authentication: bool,
}

/// The JSON body sent to create a meeting.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MeetingPayload {
    pub topic: String,
    #[serde(rename = "type")]
    pub meeting_type: u8,
    pub start_time: String,
    pub duration: u32,
    pub timezone: String,
    pub agenda: String,
    pub recurrence: ZoomRecurrence,
    pub settings: MeetingSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| Error::Config(format!("invalid {} '{}', use YYYY-MM-DD", field, value)))
}

/// Builds the recurrence object. Monthly meetings take the first of: an
/// explicit `monthly_week` with `monthly_week_day`, a `recurrence_day` such
/// as "last Friday", a `monthly_day`, the day of the start date.
pub fn build_recurrence(meeting: &MeetingDefinition) -> Result<ZoomRecurrence> {
    let start_date = parse_date("start_date", meeting.start_date())?;
    let mut recurrence = ZoomRecurrence {
        recurrence_type: DAILY,
        repeat_interval: meeting.repeat_interval.unwrap_or(1),
        weekly_days: None,
        monthly_day: None,
        monthly_week: None,
        monthly_week_day: None,
        end_date_time: None,
        end_times: None,
    };

    let recurrence_type = meeting
        .recurrence_type
        .as_deref()
        .unwrap_or("weekly")
        .to_lowercase();
    match recurrence_type.as_str() {
        "daily" => {}
        "weekly" => {
            recurrence.recurrence_type = WEEKLY;
            recurrence.weekly_days = Some(meeting.weekly_days.clone().unwrap_or_else(|| {
                start_date.weekday().number_from_sunday().to_string()
            }));
        }
        "monthly" => {
            recurrence.recurrence_type = MONTHLY;
            if let (Some(week), Some(week_day)) = (meeting.monthly_week, meeting.monthly_week_day) {
                recurrence.monthly_week = Some(week);
                recurrence.monthly_week_day = Some(week_day);
            } else if let Some(recurrence_day) = &meeting.recurrence_day {
                let descriptor = RecurrenceDescriptor::parse(recurrence_day)?;
                recurrence.monthly_week = Some(descriptor.ordinal.number());
                recurrence.monthly_week_day = Some(descriptor.zoom_week_day());
            } else {
                recurrence.monthly_day = Some(meeting.monthly_day.unwrap_or(start_date.day()));
            }
        }
        other => {
            return Err(Error::UnsupportedRecurrence(format!(
                "recurrence_type '{}' (use daily, weekly or monthly)",
                other
            )));
        }
    }

    if let Some(end_date) = &meeting.end_date {
        let end_date = parse_date("end_date", end_date)?;
        recurrence.end_date_time = Some(format!("{}T00:00:00Z", end_date.format(DATE_FORMAT)));
    } else if let Some(occurrences) = meeting.occurrences {
        recurrence.end_times = Some(occurrences);
    }
    Ok(recurrence)
}

/// Builds the payload for a recurring meeting, with registration enabled unless the meeting
/// opts out.
pub fn build_meeting_payload(
    meeting: &MeetingDefinition,
    default_password: Option<&str>,
) -> Result<MeetingPayload> {
    let default_approval = if meeting.registration_enabled() { 0 } else { 2 };
    Ok(MeetingPayload {
        topic: meeting.topic().to_string(),
        meeting_type: RECURRING_FIXED_TIME,
        start_time: format!("{}T{}", meeting.start_date(), meeting.start_time()),
        duration: meeting.duration(),
        timezone: meeting
            .timezone
            .clone()
            .unwrap_or_else(|| DEFAULT_MEETING_TIMEZONE.to_string()),
        agenda: meeting.agenda.clone().unwrap_or_default(),
        recurrence: build_recurrence(meeting)?,
        settings: MeetingSettings {
            host_video: meeting.host_video.unwrap_or(true),
            participant_video: meeting.participant_video.unwrap_or(true),
            join_before_host: meeting.join_before_host.unwrap_or(false),
            mute_upon_entry: meeting.mute_upon_entry.unwrap_or(true),
            watermark: meeting.watermark.unwrap_or(false),
            use_pmi: false,
            approval_type: meeting.approval_type.unwrap_or(default_approval),
            registration_type: meeting.registration_type.unwrap_or(1),
            audio: meeting.audio.clone().unwrap_or_else(|| "both".into()),
            auto_recording: meeting.auto_recording.clone().unwrap_or_else(|| "none".into()),
            waiting_room: meeting.waiting_room.unwrap_or(true),
            meeting_authentication: meeting.meeting_authentication.unwrap_or(false),
        },
        password: meeting
            .password
            .clone()
            .or_else(|| default_password.map(String::from)),
    })
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct RecurrenceInfo {
    #[serde(rename = "type")]
    pub recurrence_type: Option<u8>,
}

/// The parts of Zoom's create-meeting response that get reported and persisted.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MeetingInfo {
    pub id: Option<u64>,
    pub topic: String,
    pub start_time: String,
    pub timezone: String,
    pub duration: Option<u32>,
    pub join_url: String,
    pub registration_url: Option<String>,
    pub recurrence: Option<RecurrenceInfo>,
    pub occurrences: Vec<Value>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct UserInfo {
    pub first_name: String,
    pub last_name: String,
}

/// The `message` of a Zoom error body, or the body itself.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json.get("message")?.as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

/// Creates meetings and looks up hosts. The meeting loop only talks to this seam.
pub trait MeetingApi {
    fn create_meeting(&mut self, host_email: &str, payload: &MeetingPayload) -> Result<MeetingInfo>;
    fn get_user(&mut self, host_email: &str) -> Result<UserInfo>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Blocking Zoom client using Server-to-Server OAuth. The access token is
/// fetched on first use and cached until shortly before it expires.
pub struct ZoomClient {
    client: Client,
    credentials: ZoomCredentials,
    api_base: String,
    token_url: String,
    token: Option<(String, DateTime<Utc>)>,
}

impl ZoomClient {
    pub fn new(credentials: &ZoomCredentials) -> Result<ZoomClient> {
        ZoomClient::with_endpoints(credentials, ZOOM_API_BASE, ZOOM_TOKEN_URL)
    }

    pub fn with_endpoints(
        credentials: &ZoomCredentials,
        api_base: &str,
        token_url: &str,
    ) -> Result<ZoomClient> {
        Ok(ZoomClient {
            client: Client::builder().build()?,
            credentials: credentials.clone(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
            token: None,
        })
    }

    pub fn access_token(&mut self) -> Result<String> {
        if let Some((token, expiry)) = &self.token {
            if Utc::now() < *expiry {
                return Ok(token.clone());
            }
        }

        debug!("Requesting Zoom access token");
        let response = self
            .client
            .post(&self.token_url)
            .query(&[
                ("grant_type", "account_credentials"),
                ("account_id", self.credentials.account_id.as_str()),
            ])
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .send()
            .map_err(|e| Error::Auth(e.to_string()))?;
        let status = response.status();
        let body = response.text().map_err(|e| Error::Auth(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Auth(format!("HTTP {} - {}", status.as_u16(), body)));
        }
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Auth(e.to_string()))?;

        let expiry = Utc::now() + TimeDelta::seconds(token.expires_in - TOKEN_EXPIRY_MARGIN_SECS);
        self.token = Some((token.access_token.clone(), expiry));
        Ok(token.access_token)
    }

    fn send<T: DeserializeOwned>(&mut self, request: RequestBuilder) -> Result<T> {
        let token = self.access_token()?;
        let response = request.bearer_auth(token).send()?;
        let status = response.status();
        let body = response.text()?;
        debug!("Response status: {}", status.as_u16());
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl MeetingApi for ZoomClient {
    fn create_meeting(
        &mut self,
        host_email: &str,
        payload: &MeetingPayload,
    ) -> Result<MeetingInfo> {
        let url = format!("{}/users/{}/meetings", self.api_base, host_email);
        let request = self.client.post(url).json(payload);
        self.send(request)
    }

    fn get_user(&mut self, host_email: &str) -> Result<UserInfo> {
        let url = format!("{}/users/{}", self.api_base, host_email);
        let request = self.client.get(url);
        self.send(request)
    }
}
