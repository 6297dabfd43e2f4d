use crate::config::{
    DEFAULT_EVENT_STATUS, DEFAULT_EVENT_TIMEZONE, EventDefinition, EventsConfig, MeetingDefinition,
    TIME_FORMAT, ZoomConfig,
};
use crate::error::{Error, Result};
use crate::meetings::MeetingRecord;
use chrono::{NaiveTime, TimeDelta};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

lazy_static! {
    /// A year suffix such as " - 2026" at the end of a meeting topic.
    static ref TRAILING_YEAR: Regex = Regex::new(r"\s*-\s*(\d{4})\s*$").unwrap();
}

pub const ZOOM_VENUE: &str = "Virtual - Zoom";
pub const ZOOM_CATEGORIES: [&str; 2] = ["Collaboration Area", "Zoom Meeting"];

const DEFAULT_START_TIME: &str = "00:00:00";

/// Keys of the template event that every generated event overrides.
const PER_EVENT_KEYS: [&str; 6] = [
    "title",
    "description",
    "start_date",
    "end_date",
    "start_time",
    "end_time",
];

/// Writes pretty-printed JSON followed by a newline.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

/// `start_time` plus `duration_minutes`, wrapping past midnight.
pub fn compute_end_time(start_time: &str, duration_minutes: u32) -> Result<String> {
    let start = NaiveTime::parse_from_str(start_time, TIME_FORMAT).map_err(|_| {
        Error::Config(format!("invalid start_time '{}', use HH:MM:SS", start_time))
    })?;
    let end = start + TimeDelta::minutes(duration_minutes.into());
    Ok(end.format(TIME_FORMAT).to_string())
}

/// Account values written into a mapped events config.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingOptions {
    pub wordpress_url: String,
    pub username: String,
    pub app_password: String,
    pub status: String,
    pub default_timezone: String,
}

/// Outcome of mapping one meeting.
#[derive(Debug, Clone, PartialEq)]
pub enum MappedMeeting {
    Mapped {
        event: EventDefinition,
        note: Option<String>,
    },
    Skipped(String),
}

/// Maps a meeting to a single event on its start date. Recurrence settings are not carried over.
pub fn map_meeting_to_event(meeting: &MeetingDefinition, default_timezone: &str) -> MappedMeeting {
    let Some(start_date) = meeting.start_date.as_deref().filter(|d| !d.is_empty()) else {
        return MappedMeeting::Skipped("missing start_date".into());
    };
    let start_time = meeting.start_time.as_deref().unwrap_or(DEFAULT_START_TIME);
    let end_time = match compute_end_time(start_time, meeting.duration()) {
        Ok(end_time) => end_time,
        Err(e) => return MappedMeeting::Skipped(e.to_string()),
    };

    let event = EventDefinition {
        title: meeting.topic.clone().unwrap_or_else(|| "Untitled Event".into()),
        description: Some(meeting.agenda.clone().unwrap_or_default()),
        start_date: start_date.to_string(),
        end_date: start_date.to_string(),
        start_time: start_time.to_string(),
        end_time,
        venue: Some(ZOOM_VENUE.into()),
        organizer: Some(meeting.host_email.clone().unwrap_or_default()),
        categories: Some(ZOOM_CATEGORIES.iter().map(|c| c.to_string()).collect()),
        timezone: Some(
            meeting
                .timezone
                .clone()
                .unwrap_or_else(|| default_timezone.to_string()),
        ),
        ..Default::default()
    };

    let recurrence_type = meeting
        .recurrence_type
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let note = (!recurrence_type.is_empty() && recurrence_type != "none")
        .then(|| "recurrence settings ignored; mapped as a single event".to_string());
    MappedMeeting::Mapped { event, note }
}

/// A mapped events config plus the warnings collected along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingReport {
    pub config: EventsConfig,
    pub warnings: Vec<String>,
    pub meetings_read: usize,
}

pub fn map_zoom_config(zoom: &ZoomConfig, options: &MappingOptions) -> Result<MappingReport> {
    if zoom.meetings.is_empty() {
        return Err(Error::Config("No 'meetings' found in Zoom config".into()));
    }

    let mut events = Vec::new();
    let mut warnings = Vec::new();
    for (index, meeting) in zoom.meetings.iter().enumerate() {
        let topic = meeting.topic.as_deref().unwrap_or("Untitled");
        match map_meeting_to_event(meeting, &options.default_timezone) {
            MappedMeeting::Skipped(reason) => {
                warnings.push(format!("Skipped meeting #{} ('{}'): {}", index + 1, topic, reason));
            }
            MappedMeeting::Mapped { event, note } => {
                if let Some(note) = note {
                    warnings.push(format!(
                        "Mapped meeting #{} ('{}') with note: {}",
                        index + 1,
                        topic,
                        note
                    ));
                }
                events.push(event);
            }
        }
    }

    Ok(MappingReport {
        config: EventsConfig {
            wordpress_url: options.wordpress_url.clone(),
            username: options.username.clone(),
            app_password: options.app_password.clone(),
            status: Some(options.status.clone()),
            timezone: Some(options.default_timezone.clone()),
            events,
            event: None,
        },
        warnings,
        meetings_read: zoom.meetings.len(),
    })
}

/// Removes a trailing " - <year>" from a meeting topic.
pub fn clean_title(topic: &str, year: u32) -> String {
    match TRAILING_YEAR.captures(topic) {
        Some(captures) if captures[1] == year.to_string() => {
            topic[..captures.get(0).map_or(topic.len(), |m| m.start())]
                .trim()
                .to_string()
        }
        _ => topic.trim().to_string(),
    }
}

/// HTML registration block used as the description of generated events.
pub fn registration_description(cluster_name: &str, registration_url: &str, year: u32) -> String {
    format!(
        r#"<div class="registration-container">
<h2 class="headline">{cluster_name} {year} Registration</h2>
<p class="registration-note"><strong>ESIP meetings are open to all</strong> who wish to participate and contribute. To ensure a secure and collaborative environment for all attendees, <strong>registration is required</strong> for each meeting series. Once registered, you will have immediate access to the join links for all upcoming sessions.</p>
<a class="my-custom-button" href="{registration_url}">Click to register for the series</a>
<p class="footer-note">After registering, Zoom will email you a confirmation with a calendar invitation for the entire series. Use the <strong>"Add to Calendar"</strong> link to save the dates and your unique join link. <strong>Note:</strong> If a meeting time changes, you will receive an updated email. Because Zoom cannot auto-update your private calendar, please delete the old entry and use the new link to refresh your schedule.</p>
<p class="annual-reset-note"><strong>Note on Annual Registration:</strong> Your registration is valid for all meetings within the <strong>current calendar year</strong>. To maintain a secure environment and ensure our community lists are up-to-date, we perform an annual reset each January. You will be invited to re-register for your preferred Collaboration Areas at the start of the new year.</p>

</div>"#
    )
}

/// Registration URLs per meeting topic, handed out in CSV order.
/// Once a topic's URLs are used up its last URL keeps being returned.
#[derive(Debug, Default)]
pub struct RegistrationLinks {
    urls: HashMap<String, Vec<String>>,
    used: HashMap<String, usize>,
}

impl RegistrationLinks {
    pub fn from_records(records: &[MeetingRecord]) -> RegistrationLinks {
        let mut urls: HashMap<String, Vec<String>> = HashMap::new();
        for record in records {
            let topic = record.meeting_topic.trim();
            let url = record.registration_url.trim();
            if !topic.is_empty() && !url.is_empty() {
                urls.entry(topic.to_string()).or_default().push(url.to_string());
            }
        }
        RegistrationLinks {
            urls,
            used: HashMap::new(),
        }
    }

    /// The next URL for `topic`, or an empty string if there is none.
    pub fn next(&mut self, topic: &str) -> String {
        let Some(urls) = self.urls.get(topic) else {
            return String::new();
        };
        let used = self.used.entry(topic.to_string()).or_insert(0);
        let url = urls[(*used).min(urls.len() - 1)].clone();
        *used += 1;
        url
    }
}

fn template_string(template: &Value, key: &str, default: &str) -> Value {
    template
        .get(key)
        .cloned()
        .unwrap_or_else(|| Value::String(default.to_string()))
}

/// Builds an events config from a template config and the Zoom meetings.
///
/// The first template event supplies defaults (venue, organizer, categories…)
/// for every generated event.
pub fn build_output_config(
    template: &Value,
    zoom: &ZoomConfig,
    links: &mut RegistrationLinks,
    year: u32,
) -> Result<Value> {
    let event_defaults: Map<String, Value> = template
        .get("events")
        .and_then(Value::as_array)
        .and_then(|events| events.first())
        .and_then(Value::as_object)
        .map(|event| {
            event
                .iter()
                .filter(|(key, _)| !PER_EVENT_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();

    let timezone = template_string(template, "timezone", DEFAULT_EVENT_TIMEZONE);
    let mut events = Vec::new();
    for meeting in &zoom.meetings {
        let topic = meeting.topic.as_deref().unwrap_or_default().trim();
        if topic.is_empty() {
            continue;
        }
        let start_date = meeting.start_date.as_deref().unwrap_or_default().trim();
        let start_time = match meeting.start_time.as_deref().map(str::trim) {
            Some(time) if !time.is_empty() => time,
            _ => DEFAULT_START_TIME,
        };
        let title = clean_title(topic, year);
        let registration_url = links.next(topic);

        let mut event = event_defaults.clone();
        event.insert("title".into(), title.clone().into());
        event.insert(
            "description".into(),
            registration_description(&title, &registration_url, year).into(),
        );
        event.insert("start_date".into(), start_date.into());
        event.insert("end_date".into(), start_date.into());
        event.insert("start_time".into(), start_time.into());
        event.insert(
            "end_time".into(),
            compute_end_time(start_time, meeting.duration())?.into(),
        );
        event.insert(
            "timezone".into(),
            meeting
                .timezone
                .clone()
                .map_or_else(|| timezone.clone(), Value::String),
        );
        events.push(Value::Object(event));
    }

    let mut output = Map::new();
    output.insert(
        "wordpress_url".into(),
        template_string(template, "wordpress_url", "https://your-site.com"),
    );
    output.insert("username".into(), template_string(template, "username", "admin"));
    output.insert(
        "app_password".into(),
        template_string(template, "app_password", "your-application-password-here"),
    );
    output.insert("status".into(), template_string(template, "status", DEFAULT_EVENT_STATUS));
    output.insert("timezone".into(), timezone);
    output.insert("events".into(), Value::Array(events));
    Ok(Value::Object(output))
}

/// The explicit Zoom config path, else the first existing of the conventional names for `year`.
pub fn resolve_zoom_config_path(explicit: Option<&Path>, year: u32) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!("Zoom config not found: {}", path.display())));
        }
        return Ok(path.to_path_buf());
    }
    let candidates = [
        PathBuf::from(format!("zoom-meetings-{}-config.json", year)),
        PathBuf::from(format!("zoom-meeting-{}-config.json", year)),
    ];
    candidates
        .iter()
        .find(|candidate| candidate.exists())
        .cloned()
        .ok_or_else(|| {
            Error::Config(format!(
                "Could not find zoom config. Tried: {}",
                candidates
                    .iter()
                    .map(|c| c.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zoom_config() -> ZoomConfig {
        ZoomConfig::load(&PathBuf::from("tests/resources/zoom-config.json"))
            .expect("Failed to read zoom config")
    }

    fn mapping_options() -> MappingOptions {
        MappingOptions {
            wordpress_url: "https://your-wordpress-site.com".into(),
            username: "your-username".into(),
            app_password: "xxxx".into(),
            status: "draft".into(),
            default_timezone: "America/New_York".into(),
        }
    }

    fn record(topic: &str, url: &str) -> MeetingRecord {
        MeetingRecord {
            meeting_topic: topic.into(),
            registration_url: url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_compute_end_time() {
        assert_eq!(compute_end_time("10:00:00", 60).unwrap(), "11:00:00");
        assert_eq!(compute_end_time("15:30:00", 90).unwrap(), "17:00:00");
        assert_eq!(compute_end_time("23:30:00", 45).unwrap(), "00:15:00");
        assert!(compute_end_time("10am", 60).is_err());
    }

    #[test]
    fn test_map_zoom_config() {
        let mut zoom = zoom_config();
        zoom.meetings[2].start_date = None;
        let report = map_zoom_config(&zoom, &mapping_options()).unwrap();

        assert_eq!(report.meetings_read, 3);
        assert_eq!(report.config.events.len(), 2);
        let event = &report.config.events[0];
        assert_eq!(event.title, "Weekly Team Meeting - 2026");
        assert_eq!(event.end_date, "2026-03-01");
        assert_eq!(event.end_time, "11:00:00");
        assert_eq!(event.venue.as_deref(), Some("Virtual - Zoom"));
        assert_eq!(event.organizer.as_deref(), Some("host@example.com"));
        assert_eq!(event.timezone.as_deref(), Some("America/New_York"));
        assert_eq!(report.config.events[1].end_time, "17:00:00");

        assert_eq!(report.warnings.len(), 3);
        assert!(report.warnings[0].starts_with("Mapped meeting #1"));
        assert_eq!(
            report.warnings[2],
            "Skipped meeting #3 ('Daily Standup'): missing start_date"
        );

        // The mapped config is accepted by the events command.
        assert!(report.config.validate_single().is_ok());
    }

    #[test]
    fn test_map_zoom_config_requires_meetings() {
        let mut zoom = zoom_config();
        zoom.meetings.clear();
        assert!(map_zoom_config(&zoom, &mapping_options()).is_err());
    }

    #[test]
    fn test_mapped_config_json_layout() {
        let report = map_zoom_config(&zoom_config(), &mapping_options()).unwrap();
        let json = serde_json::to_value(&report.config).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            ["wordpress_url", "username", "app_password", "status", "timezone", "events"]
        );
        assert_eq!(
            json["events"][0]["categories"],
            serde_json::json!(["Collaboration Area", "Zoom Meeting"])
        );
        assert_eq!(json["events"][2]["description"], "");
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("Data Cluster - 2026", 2026), "Data Cluster");
        assert_eq!(clean_title("Data Cluster-2026  ", 2026), "Data Cluster");
        assert_eq!(clean_title("Data Cluster - 2025", 2026), "Data Cluster - 2025");
        assert_eq!(clean_title("  Plain Topic ", 2026), "Plain Topic");
    }

    #[test]
    fn test_registration_links() {
        let mut links = RegistrationLinks::from_records(&[
            record("A", "https://zoom.us/a1"),
            record("B", " https://zoom.us/b1 "),
            record("A", "https://zoom.us/a2"),
            record("C", ""),
        ]);
        assert_eq!(links.next("A"), "https://zoom.us/a1");
        assert_eq!(links.next("A"), "https://zoom.us/a2");
        assert_eq!(links.next("A"), "https://zoom.us/a2");
        assert_eq!(links.next("B"), "https://zoom.us/b1");
        assert_eq!(links.next("C"), "");
    }

    #[test]
    fn test_build_output_config() {
        let template: Value = serde_json::from_str(
            r#"{
                "wordpress_url": "https://example.org",
                "status": "publish",
                "events": [{
                    "title": "Template",
                    "venue": "Virtual",
                    "organizer": "ESIP",
                    "categories": ["Collaboration Area"],
                    "start_date": "2026-01-01"
                }]
            }"#,
        )
        .unwrap();
        let mut links = RegistrationLinks::from_records(&[record(
            "Data Cluster - 2026",
            "https://zoom.us/meeting/register/dc",
        )]);

        let output = build_output_config(&template, &zoom_config(), &mut links, 2026).unwrap();
        assert_eq!(output["wordpress_url"], "https://example.org");
        assert_eq!(output["username"], "admin");
        assert_eq!(output["status"], "publish");
        assert_eq!(output["timezone"], "America/New_York");

        let events = output["events"].as_array().unwrap();
        assert_eq!(events.len(), 3);
        let keys: Vec<&String> = events[1].as_object().unwrap().keys().collect();
        assert_eq!(keys[..3], ["venue", "organizer", "categories"]);

        assert_eq!(events[1]["title"], "Data Cluster");
        assert_eq!(events[1]["end_time"], "17:00:00");
        assert_eq!(events[1]["timezone"], "America/New_York");
        let description = events[1]["description"].as_str().unwrap();
        assert!(description.contains("Data Cluster 2026 Registration"));
        assert!(description.contains(r#"href="https://zoom.us/meeting/register/dc""#));

        assert_eq!(events[0]["timezone"], "America/New_York");
        assert!(events[0]["description"].as_str().unwrap().contains(r#"href="""#));
    }

    #[test]
    fn test_resolve_zoom_config_path() {
        let explicit = PathBuf::from("tests/resources/zoom-config.json");
        assert_eq!(resolve_zoom_config_path(Some(&explicit), 2026).unwrap(), explicit);
        assert!(resolve_zoom_config_path(Some(Path::new("missing.json")), 2026).is_err());
        assert!(resolve_zoom_config_path(None, 1999).is_err());
    }
}
