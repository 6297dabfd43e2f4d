use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use std::{fs, io::ErrorKind, path::Path};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

pub const DEFAULT_EVENT_STATUS: &str = "draft";
pub const DEFAULT_EVENT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_MEETING_TIMEZONE: &str = "UTC";
pub const DEFAULT_MEETING_DURATION: u32 = 60;
pub const DEFAULT_OUTPUT_FILE: &str = "zoom_meetings.csv";
pub const DEFAULT_RECURRENCE_PATTERN: &str = "MONTHLY";
pub const DEFAULT_RECURRENCE_DAY: &str = "first Monday";

/// Reads and deserializes a JSON config file, mapping failures to config errors.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file_content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::Config(format!("Config file not found: {}", path.display())),
        _ => Error::Config(format!("Cannot read config file {}: {}", path.display(), e)),
    })?;
    serde_json::from_str(&file_content)
        .map_err(|e| {
            Error::Config(format!("Invalid JSON in config file {}: {}", path.display(), e))
        })
}

pub fn is_valid_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()
}

pub fn is_valid_time(value: &str) -> bool {
    NaiveTime::parse_from_str(value, TIME_FORMAT).is_ok()
}

fn parse_datetime(date: &str, time: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(
        &format!("{} {}", date, time),
        &format!("{} {}", DATE_FORMAT, TIME_FORMAT),
    )
    .ok()
}

/// Config for the WordPress event commands, holding either an `events` array or a single `event`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EventsConfig {
    pub wordpress_url: String,
    pub username: String,
    pub app_password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub events: Vec<EventDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventDefinition>,
}

impl EventsConfig {
    pub fn load(path: &Path) -> Result<EventsConfig> {
        load_json(path)
    }

    /// The configured events; the `events` array wins over a single `event`.
    pub fn definitions(&self) -> &[EventDefinition] {
        if self.events.is_empty() {
            self.event.as_slice()
        } else {
            self.events.as_slice()
        }
    }

    /// The site URL without trailing slashes.
    pub fn site_url(&self) -> &str {
        self.wordpress_url.trim_end_matches('/')
    }

    /// Checks date and time formats and that every event ends after it starts.
    pub fn validate_single(&self) -> Result<()> {
        self.validate_common()?;
        for (index, event) in self.definitions().iter().enumerate() {
            let start = parse_datetime(&event.start_date, &event.start_time);
            let end = parse_datetime(&event.end_date, &event.end_time);
            match (start, end) {
                (Some(start), Some(end)) if end <= start => {
                    return Err(Error::Config(format!(
                        "Event {} end date-time must be after start date-time",
                        index
                    )));
                }
                (Some(_), Some(_)) => {}
                _ => {
                    return Err(Error::Config(format!(
                        "Event {} has invalid start/end date-time",
                        index
                    )));
                }
            }
        }
        Ok(())
    }

    /// Checks date and time formats of a recurring series. The recurrence day
    /// itself is checked per event when its payload is built.
    pub fn validate_recurring(&self) -> Result<()> {
        self.validate_common()
    }

    fn validate_common(&self) -> Result<()> {
        for (name, value) in [
            ("wordpress_url", &self.wordpress_url),
            ("username", &self.username),
            ("app_password", &self.app_password),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("Missing required field '{}' in config", name)));
            }
        }
        if self.definitions().is_empty() {
            return Err(Error::Config(
                "Config must include either a non-empty 'events' array or an 'event' object".into(),
            ));
        }
        for (index, event) in self.definitions().iter().enumerate() {
            let dates = [("start_date", &event.start_date), ("end_date", &event.end_date)];
            for (name, value) in dates {
                if !is_valid_date(value) {
                    return Err(Error::Config(format!(
                        "Event {} has invalid {} '{}' (expected YYYY-MM-DD)",
                        index, name, value
                    )));
                }
            }
            let times = [("start_time", &event.start_time), ("end_time", &event.end_time)];
            for (name, value) in times {
                if !is_valid_time(value) {
                    return Err(Error::Config(format!(
                        "Event {} has invalid {} '{}' (expected HH:MM:SS)",
                        index, name, value
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One event of an events config.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct EventDefinition {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_day: Option<String>,
}

/// Server-to-Server OAuth app credentials.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ZoomCredentials {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
}

fn default_output_file() -> String {
    DEFAULT_OUTPUT_FILE.to_string()
}

/// Config for the Zoom meeting command. Also read by the converters, which
/// do not need credentials, so only `zoom-meetings` insists on them.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ZoomConfig {
    #[serde(default)]
    pub zoom_api: Option<ZoomCredentials>,
    #[serde(default = "default_output_file")]
    pub output_file: String,
    #[serde(default)]
    pub default_password: Option<String>,
    #[serde(default)]
    pub meetings: Vec<MeetingDefinition>,
}

impl ZoomConfig {
    pub fn load(path: &Path) -> Result<ZoomConfig> {
        load_json(path)
    }

    /// Validates credentials and meetings, returning the credentials.
    pub fn validate(&self) -> Result<&ZoomCredentials> {
        let credentials = self
            .zoom_api
            .as_ref()
            .ok_or_else(|| Error::Config("Missing 'zoom_api' section in configuration".into()))?;
        for (name, value) in [
            ("account_id", &credentials.account_id),
            ("client_id", &credentials.client_id),
            ("client_secret", &credentials.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("Missing required field 'zoom_api.{}'", name)));
            }
        }
        if self.meetings.is_empty() {
            return Err(Error::Config("No meetings defined in configuration".into()));
        }
        for (index, meeting) in self.meetings.iter().enumerate() {
            meeting.validate(index + 1)?;
        }
        Ok(credentials)
    }
}

/// Weekday lists are usually strings ("2,4") but a single day may be a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}

/// One meeting of a Zoom config. Required fields are optional here so that
/// the converters can skip incomplete entries instead of rejecting the file.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MeetingDefinition {
    pub host_email: Option<String>,
    pub topic: Option<String>,
    pub agenda: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub duration: Option<u32>,
    pub timezone: Option<String>,
    pub password: Option<String>,

    pub recurrence_type: Option<String>,
    pub repeat_interval: Option<u32>,
    #[serde(deserialize_with = "string_or_number")]
    pub weekly_days: Option<String>,
    pub monthly_day: Option<u32>,
    pub monthly_week: Option<i8>,
    pub monthly_week_day: Option<u32>,
    pub recurrence_day: Option<String>,
    pub end_date: Option<String>,
    pub occurrences: Option<u32>,

    pub enable_registration: Option<bool>,
    pub approval_type: Option<u8>,
    pub registration_type: Option<u8>,
    pub host_video: Option<bool>,
    pub participant_video: Option<bool>,
    pub join_before_host: Option<bool>,
    pub mute_upon_entry: Option<bool>,
    pub watermark: Option<bool>,
    pub audio: Option<String>,
    pub auto_recording: Option<String>,
    pub waiting_room: Option<bool>,
    pub meeting_authentication: Option<bool>,
}

impl MeetingDefinition {
    /// `number` is 1-based, as reported to the user.
    pub fn validate(&self, number: usize) -> Result<()> {
        for (name, value) in [
            ("host_email", &self.host_email),
            ("topic", &self.topic),
            ("start_date", &self.start_date),
            ("start_time", &self.start_time),
        ] {
            if value.is_none() {
                return Err(Error::Config(format!(
                    "Meeting #{} missing required field '{}'",
                    number, name
                )));
            }
        }
        if !is_valid_date(self.start_date()) {
            return Err(Error::Config(format!(
                "Meeting #{} has invalid start_date format. Use YYYY-MM-DD",
                number
            )));
        }
        if !is_valid_time(self.start_time()) {
            return Err(Error::Config(format!(
                "Meeting #{} has invalid start_time format. Use HH:MM:SS",
                number
            )));
        }
        if let Some(end_date) = &self.end_date {
            if !is_valid_date(end_date) {
                return Err(Error::Config(format!(
                    "Meeting #{} has invalid end_date format. Use YYYY-MM-DD",
                    number
                )));
            }
        }
        Ok(())
    }

    pub fn host_email(&self) -> &str {
        self.host_email.as_deref().unwrap_or_default()
    }

    pub fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or("Untitled Meeting")
    }

    pub fn start_date(&self) -> &str {
        self.start_date.as_deref().unwrap_or_default()
    }

    pub fn start_time(&self) -> &str {
        self.start_time.as_deref().unwrap_or_default()
    }

    pub fn duration(&self) -> u32 {
        self.duration.unwrap_or(DEFAULT_MEETING_DURATION)
    }

    pub fn registration_enabled(&self) -> bool {
        self.enable_registration.unwrap_or(true)
    }
}
