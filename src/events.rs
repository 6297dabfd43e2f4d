use crate::config::{
    DEFAULT_EVENT_STATUS, DEFAULT_EVENT_TIMEZONE, DEFAULT_RECURRENCE_DAY,
    DEFAULT_RECURRENCE_PATTERN,
    EventDefinition, EventsConfig,
};
use crate::error::{Error, Result};
use crate::recurrence::RecurrenceDescriptor;
use crate::wordpress::{EventApi, EventPayload, OrganizerRef, VenueRef};
use crate::{RunOptions, Summary};
use log::debug;
use std::thread;
use std::time::Duration;

/// Pause after each request to the events API.
pub const EVENT_REQUEST_DELAY: Duration = Duration::from_millis(500);

const ORGANIZER_ERROR_CODE: &str = "could-not-create-organizer";

/// Payload for a single, non-recurring event. Status and timezone fall back
/// from the event to the config to the defaults.
pub fn build_event_payload(event: &EventDefinition, config: &EventsConfig) -> EventPayload {
    let status = event
        .status
        .as_ref()
        .or(config.status.as_ref())
        .map_or(DEFAULT_EVENT_STATUS, |s| s.as_str());
    let timezone = event
        .timezone
        .as_ref()
        .or(config.timezone.as_ref())
        .map_or(DEFAULT_EVENT_TIMEZONE, |s| s.as_str());
    EventPayload {
        title: event.title.clone(),
        description: event.description.clone().unwrap_or_default(),
        status: status.to_string(),
        start_date: format!("{} {}", event.start_date, event.start_time),
        end_date: format!("{} {}", event.end_date, event.end_time),
        all_day: event.all_day.unwrap_or(false),
        timezone: Some(timezone.to_string()),
        recurrence: None,
        venue: event.venue.clone().map(|venue| VenueRef { venue }),
        organizer: event.organizer.clone().map(|organizer| OrganizerRef { organizer }),
        categories: event.categories.clone(),
    }
}

/// Payload for a monthly event series, published right away.
///
/// Every occurrence spans `start_time` to `end_time` of its own day; the
/// series runs until `end_date`.
pub fn build_recurring_event_payload(event: &EventDefinition) -> Result<EventPayload> {
    let pattern = event
        .recurrence_pattern
        .as_deref()
        .unwrap_or(DEFAULT_RECURRENCE_PATTERN)
        .to_uppercase();
    if pattern != DEFAULT_RECURRENCE_PATTERN {
        return Err(Error::UnsupportedRecurrence(format!(
            "recurrence_pattern '{}' (only {} is supported)",
            pattern, DEFAULT_RECURRENCE_PATTERN
        )));
    }
    let descriptor = RecurrenceDescriptor::parse(
        event.recurrence_day.as_deref().unwrap_or(DEFAULT_RECURRENCE_DAY),
    )?;
    Ok(EventPayload {
        title: event.title.clone(),
        description: event.description.clone().unwrap_or_default(),
        status: "publish".into(),
        start_date: format!("{} {}", event.start_date, event.start_time),
        end_date: format!("{} {}", event.start_date, event.end_time),
        all_day: false,
        timezone: event.timezone.clone(),
        recurrence: Some(descriptor.monthly_rules(&event.end_date)),
        venue: event.venue.clone().map(|venue| VenueRef { venue }),
        organizer: event.organizer.clone().map(|organizer| OrganizerRef { organizer }),
        categories: event.categories.clone(),
    })
}

/// Creates one event and returns its id.
///
/// WordPress refuses events whose organizer it cannot create; those are sent
/// once more without the organizer.
pub fn create_event(api: &dyn EventApi, payload: &EventPayload) -> Result<i64> {
    let response = api.create_event(payload)?;
    debug!("Response body: {}", response.pretty_body());
    if response.is_success() {
        return response.event_id().ok_or(Error::Status {
            status: response.status,
            body: "response carries no event id".into(),
        });
    }

    if payload.organizer.is_some()
        && response.error_code().as_deref() == Some(ORGANIZER_ERROR_CODE)
    {
        debug!("Organizer creation failed; retrying without organizer field...");
        let retry = api.create_event(&payload.without_organizer())?;
        debug!("Retry response status: {}", retry.status);
        debug!("Retry response body: {}", retry.pretty_body());
        if retry.is_success() {
            if let Some(id) = retry.event_id() {
                return Ok(id);
            }
        }
    }

    Err(Error::Status {
        status: response.status,
        body: response.body,
    })
}

/// Creates the configured non-recurring events one after another.
pub fn create_events(config: &EventsConfig, api: &dyn EventApi, options: &RunOptions) -> Summary {
    println!("Creating non-recurring events...");
    process_events(config, api, options, |event| Ok(build_event_payload(event, config)))
}

/// Creates the configured monthly event series one after another.
pub fn create_recurring_events(
    config: &EventsConfig,
    api: &dyn EventApi,
    options: &RunOptions,
) -> Summary {
    println!("Creating recurring event series...");
    process_events(config, api, options, build_recurring_event_payload)
}

fn process_events<F>(
    config: &EventsConfig,
    api: &dyn EventApi,
    options: &RunOptions,
    build: F,
) -> Summary
where
    F: Fn(&EventDefinition) -> Result<EventPayload>,
{
    let events = config.definitions();
    println!("WordPress URL: {}", config.site_url());
    println!("Number of events to process: {}", events.len());
    if options.dry_run {
        println!("\n*** DRY RUN MODE - No events will be created ***\n");
    }

    let mut summary = Summary::default();
    for (index, event) in events.iter().enumerate() {
        println!("Processing event {}: {}", index + 1, event.title);
        let payload = match build(event) {
            Ok(payload) => payload,
            Err(e) => {
                println!("  ✗ Error: {}\n", e);
                summary.failed += 1;
                continue;
            }
        };

        if options.dry_run {
            println!("  [DRY RUN] Would create event with payload:");
            println!("{}\n", serde_json::to_string_pretty(&payload).unwrap_or_default());
            summary.succeeded += 1;
            continue;
        }

        debug!(
            "Payload: {}",
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        );
        match create_event(api, &payload) {
            Ok(id) => {
                println!("  ✓ Successfully created event ID: {}", id);
                summary.succeeded += 1;
            }
            Err(e) => {
                println!("  ✗ Failed to create event: {}", e);
                summary.failed += 1;
            }
        }
        println!();
        thread::sleep(options.delay);
    }

    summary.print();
    summary
}
