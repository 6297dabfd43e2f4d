use crate::config::ZoomConfig;
use crate::error::{Error, Result};
use crate::zoom::{
    MeetingApi, MeetingInfo, MeetingPayload, build_meeting_payload, error_message,
};
use crate::{RunOptions, Summary};
use chrono::Local;
use csv::{Reader, WriterBuilder};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Pause between requests to the meetings API.
pub const MEETING_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// One CSV row describing a created meeting.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MeetingRecord {
    pub created_at: String,
    pub host_email: String,
    pub meeting_id: String,
    pub meeting_topic: String,
    pub start_time: String,
    pub timezone: String,
    pub duration: String,
    pub join_url: String,
    pub registration_url: String,
    pub recurrence_type: String,
    pub occurrences: String,
}

impl MeetingRecord {
    pub fn new(info: &MeetingInfo, host_email: &str) -> MeetingRecord {
        MeetingRecord {
            created_at: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            host_email: host_email.into(),
            meeting_id: info.id.map(|id| id.to_string()).unwrap_or_default(),
            meeting_topic: info.topic.clone(),
            start_time: info.start_time.clone(),
            timezone: info.timezone.clone(),
            duration: info.duration.map(|d| d.to_string()).unwrap_or_default(),
            join_url: info.join_url.clone(),
            registration_url: info.registration_url.clone().unwrap_or_default(),
            recurrence_type: info
                .recurrence
                .as_ref()
                .and_then(|r| r.recurrence_type)
                .map(|t| t.to_string())
                .unwrap_or_default(),
            occurrences: info.occurrences.len().to_string(),
        }
    }
}

/// Appends a record, writing the header only when the file is new or empty.
pub fn append_record(path: &Path, record: &MeetingRecord) -> Result<()> {
    let has_content = path.metadata().map(|m| m.len() > 0).unwrap_or(false);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut wtr = WriterBuilder::new()
        .has_headers(!has_content)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

pub fn read_records(path: &Path) -> Result<Vec<MeetingRecord>> {
    let mut rdr = Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in rdr.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

fn is_missing_user_scope(message: &str) -> bool {
    message.contains("does not contain scopes") && message.contains("user:read:user")
}

/// Looks up the host. A token without the user read scope only produces a warning.
fn verify_host(api: &mut dyn MeetingApi, host_email: &str) -> Result<()> {
    match api.get_user(host_email) {
        Ok(user) => {
            println!("  ✓ User verified: {} {}", user.first_name, user.last_name);
            Ok(())
        }
        Err(Error::Status { body, .. }) if is_missing_user_scope(&error_message(&body)) => {
            println!("  ⚠ Skipping user verification: token missing user read scope(s).");
            println!(
                "    Add scopes 'user:read:user:admin' and 'user:read:user' to enable this verbose check."
            );
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Creates one meeting and appends its record. Returns whether the record was saved.
fn create_one(
    api: &mut dyn MeetingApi,
    config: &ZoomConfig,
    options: &RunOptions,
    host_email: &str,
    payload: &MeetingPayload,
    registration_enabled: bool,
) -> Result<bool> {
    if options.verbose {
        verify_host(api, host_email)?;
    }
    let info = api.create_meeting(host_email, payload)?;
    println!("  ✓ Meeting created successfully!");
    println!(
        "    - Meeting ID: {}",
        info.id.map(|id| id.to_string()).unwrap_or_default()
    );
    println!("    - Join URL: {}", info.join_url);
    if registration_enabled {
        println!(
            "    - Registration URL: {}",
            info.registration_url.as_deref().unwrap_or("N/A")
        );
    }

    let output_file = Path::new(&config.output_file);
    match append_record(output_file, &MeetingRecord::new(&info, host_email)) {
        Ok(()) => {
            debug!("Saved meeting details to {}", output_file.display());
            Ok(true)
        }
        Err(e) => {
            println!("  ✗ Could not save meeting details: {}", e);
            Ok(false)
        }
    }
}

/// Creates the configured meetings one after another and appends each to the output CSV.
///
/// Failures of a single meeting are reported and counted; only fatal errors,
/// such as a rejected OAuth token request, stop the run. A meeting whose record
/// could not be written counts as failed, since the CSV is its only trace.
pub fn create_meetings(
    config: &ZoomConfig,
    api: &mut dyn MeetingApi,
    options: &RunOptions,
) -> Result<Summary> {
    let meetings = &config.meetings;
    let mut summary = Summary::default();
    let mut unsaved = 0;
    if meetings.is_empty() {
        println!("Warning: No meetings defined in configuration");
        return Ok(summary);
    }

    let rule = "=".repeat(70);
    println!("\n{}", rule);
    println!("Creating {} recurring meeting(s)...", meetings.len());
    println!("{}\n", rule);

    for (index, meeting) in meetings.iter().enumerate() {
        let number = index + 1;
        let Some(host_email) = meeting.host_email.as_deref() else {
            println!("⚠ Skipping meeting #{}: Missing host_email", number);
            summary.failed += 1;
            continue;
        };
        println!("[{}/{}] Processing: {}", number, meetings.len(), meeting.topic());
        println!("  Host: {}", host_email);

        let payload = match build_meeting_payload(meeting, config.default_password.as_deref()) {
            Ok(payload) => payload,
            Err(e) => {
                println!("  ✗ Error: {}\n", e);
                summary.failed += 1;
                continue;
            }
        };

        if options.dry_run {
            println!("  [DRY RUN] JSON payload:");
            println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
            println!("    - Topic: {}", payload.topic);
            println!("    - Start: {}", payload.start_time);
            println!("    - Duration: {} minutes", payload.duration);
            println!("    - Timezone: {}", payload.timezone);
            println!("    - Recurrence: Type {}", payload.recurrence.recurrence_type);
            println!(
                "    - Registration: {}\n",
                if meeting.registration_enabled() { "Enabled" } else { "Disabled" }
            );
            summary.succeeded += 1;
            continue;
        }

        let registration_enabled = meeting.registration_enabled();
        match create_one(api, config, options, host_email, &payload, registration_enabled) {
            Ok(true) => summary.succeeded += 1,
            Ok(false) => {
                unsaved += 1;
                summary.failed += 1;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(Error::Status { status, body }) => {
                println!("  ✗ Error creating meeting: HTTP {}", status);
                println!("    Error details: {}", error_message(&body));
                summary.failed += 1;
            }
            Err(e) => {
                println!("  ✗ Unexpected error: {}", e);
                summary.failed += 1;
            }
        }
        println!();

        if number < meetings.len() {
            thread::sleep(options.delay);
        }
    }

    if !options.dry_run {
        println!("{}", rule);
        if unsaved == 0 {
            println!("✓ Complete! Meeting details saved to: {}", config.output_file);
        } else {
            println!(
                "⚠ {} created meeting(s) missing from: {}",
                unsaved, config.output_file
            );
        }
        println!("{}", rule);
    }
    summary.print();
    Ok(summary)
}
