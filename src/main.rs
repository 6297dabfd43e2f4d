/// event-series: a command-line tool to create WordPress events and recurring Zoom meetings
/// from JSON configs.
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use event_series::{
    RunOptions,
    config::{EventsConfig, ZoomConfig},
    convert::{self, MappingOptions, RegistrationLinks},
    events::{self, EVENT_REQUEST_DELAY},
    meetings::{self, MEETING_REQUEST_DELAY},
    wordpress::WordPressClient,
    zoom::ZoomClient,
};
use std::{path::PathBuf, process::ExitCode, time::Duration};

const EVENTS_HELP: &str = r#"Configuration file supports either a single "event" object or an "events" array:
{
  "wordpress_url": "https://your-site.com",
  "username": "your-username",
  "app_password": "your-app-password",
  "status": "draft",
  "timezone": "America/New_York",
  "events": [
    {
      "title": "Event One",
      "description": "Description",
      "start_date": "2026-03-01",
      "end_date": "2026-03-01",
      "start_time": "14:00:00",
      "end_time": "15:00:00",
      "venue": "Virtual",
      "organizer": "My Organization",
      "categories": ["Category1"]
    }
  ]
}"#;

const RECURRING_EVENTS_HELP: &str = r#"Each event additionally takes "recurrence_pattern" (only "MONTHLY")
and "recurrence_day", the series running from start_date until end_date:
  "first Monday"     first Monday of each month
  "second Tuesday"   second Tuesday of each month
  "third Wednesday"  third Wednesday of each month
  "fourth Thursday"  fourth Thursday of each month
  "last Friday"      last Friday of each month"#;

const ZOOM_HELP: &str = r#"Configuration file format:
{
  "zoom_api": {
    "account_id": "your-account-id",
    "client_id": "your-client-id",
    "client_secret": "your-client-secret"
  },
  "output_file": "zoom_meetings.csv",
  "default_password": "secret",
  "meetings": [
    {
      "host_email": "user@example.com",
      "topic": "Weekly Team Meeting",
      "start_date": "2026-03-01",
      "start_time": "10:00:00",
      "duration": 60,
      "timezone": "America/New_York",
      "recurrence_type": "weekly",
      "weekly_days": "2",
      "end_date": "2026-12-31"
    }
  ]
}

Recurrence types:
  daily    every day or every N days (repeat_interval)
  weekly   weekly_days "1" (Sunday) ... "7" (Saturday), several as "1,3,5"
  monthly  monthly_day 1-31, or monthly_week (1-4, -1 for last) with
           monthly_week_day 1-7, or recurrence_day such as "last Friday"
End with end_date (YYYY-MM-DD) or occurrences (number of repetitions)."#;

#[derive(Parser)]
#[command(
    version,
    about = "Create WordPress events and recurring Zoom meetings from JSON configs."
)]
struct Cli {
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        help = "Enable verbose output (payloads, response bodies, host verification)."
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RunArgs {
    #[arg(short = 'c', long = "config", help = "Path to the JSON configuration file.")]
    config: PathBuf,

    #[arg(long = "dry-run", help = "Show the payloads without sending anything.")]
    dry_run: bool,
}

impl RunArgs {
    fn validate(&self) -> Result<()> {
        if !self.config.is_file() {
            bail!("The config file '{}' is not a file.", self.config.display());
        }
        Ok(())
    }

    fn options(&self, verbose: bool, delay: Duration) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            verbose,
            delay,
        }
    }
}

#[derive(Args)]
struct EventIdArgs {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to the JSON configuration file with the WordPress credentials."
    )]
    config: PathBuf,

    #[arg(long = "id", help = "The event id.")]
    id: i64,
}

#[derive(Clone, Copy, ValueEnum)]
enum EventStatus {
    Draft,
    Publish,
}

impl EventStatus {
    fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Publish => "publish",
        }
    }
}

#[derive(Args)]
struct MapZoomArgs {
    #[arg(long = "zoom-config", help = "Path to the source Zoom meetings config.")]
    zoom_config: PathBuf,

    #[arg(short = 'o', long = "output", help = "Path of the events config to write.")]
    output: PathBuf,

    #[arg(long = "wordpress-url", default_value = "https://your-wordpress-site.com")]
    wordpress_url: String,

    #[arg(long = "username", default_value = "your-username")]
    username: String,

    #[arg(long = "app-password", default_value = "xxxx xxxx xxxx xxxx xxxx xxxx")]
    app_password: String,

    #[arg(long = "status", value_enum, default_value_t = EventStatus::Draft)]
    status: EventStatus,

    #[arg(
        long = "default-timezone",
        default_value = "America/New_York",
        help = "Timezone for meetings that do not define one."
    )]
    default_timezone: String,
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(
        long = "template",
        default_value = "events-config.json",
        help = "Events config whose first event supplies the defaults."
    )]
    template: PathBuf,

    #[arg(
        long = "zoom-config",
        help = "Zoom meetings config. Defaults to zoom-meetings-<year>-config.json, \
                then zoom-meeting-<year>-config.json."
    )]
    zoom_config: Option<PathBuf>,

    #[arg(
        long = "zoom-output-csv",
        default_value = "zoom_meetings_output.csv",
        help = "CSV written by zoom-meetings, holding the registration URLs."
    )]
    zoom_output_csv: PathBuf,

    #[arg(short = 'o', long = "output", help = "Defaults to wp-events-<year>-config.json.")]
    output: Option<PathBuf>,

    #[arg(
        long = "year",
        default_value_t = 2026,
        help = "Year stripped from topics and shown in descriptions."
    )]
    year: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Create non-recurring events in WordPress.
    #[command(after_help = EVENTS_HELP)]
    Events(RunArgs),

    /// Create monthly recurring event series in WordPress.
    #[command(after_help = RECURRING_EVENTS_HELP)]
    RecurringEvents(RunArgs),

    /// Print one WordPress event.
    ShowEvent(EventIdArgs),

    /// Delete one WordPress event.
    DeleteEvent(EventIdArgs),

    /// Create recurring Zoom meetings and append them to a CSV file.
    #[command(after_help = ZOOM_HELP)]
    ZoomMeetings(RunArgs),

    /// Convert a Zoom meetings config into a WordPress events config.
    MapZoom(MapZoomArgs),

    /// Generate a WordPress events config from a template, a Zoom config and the Zoom output CSV.
    GenerateWpConfig(GenerateArgs),
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(format!("event_series={}", level)),
    )
    .format_timestamp(None)
    .init();
}

fn run_events(args: &RunArgs, verbose: bool, recurring: bool) -> Result<()> {
    args.validate()?;
    let config = EventsConfig::load(&args.config)?;
    let options = args.options(verbose, EVENT_REQUEST_DELAY);
    let client = WordPressClient::from_config(&config)?;
    if recurring {
        config.validate_recurring()?;
        events::create_recurring_events(&config, &client, &options);
    } else {
        config.validate_single()?;
        events::create_events(&config, &client, &options);
    }
    Ok(())
}

fn run_zoom_meetings(args: &RunArgs, verbose: bool) -> Result<()> {
    args.validate()?;
    let config = ZoomConfig::load(&args.config)?;
    let credentials = config.validate()?;
    let mut client = ZoomClient::new(credentials)?;
    let options = args.options(verbose, MEETING_REQUEST_DELAY);
    meetings::create_meetings(&config, &mut client, &options)?;
    Ok(())
}

fn run_event_lookup(args: &EventIdArgs, delete: bool) -> Result<()> {
    let config = EventsConfig::load(&args.config)?;
    let client = WordPressClient::from_config(&config)?;
    let event = if delete {
        client.delete_event(args.id)
    } else {
        client.get_event(args.id)
    }
    .with_context(|| format!("Request for event {} failed", args.id))?;
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

fn run_map_zoom(args: &MapZoomArgs) -> Result<()> {
    let zoom = ZoomConfig::load(&args.zoom_config)?;
    let report = convert::map_zoom_config(
        &zoom,
        &MappingOptions {
            wordpress_url: args.wordpress_url.clone(),
            username: args.username.clone(),
            app_password: args.app_password.clone(),
            status: args.status.as_str().to_string(),
            default_timezone: args.default_timezone.clone(),
        },
    )?;
    convert::write_json(&args.output, &report.config)?;

    println!("✓ Wrote mapped config to: {}", args.output.display());
    println!("  Meetings read: {}", report.meetings_read);
    println!("  Events mapped: {}", report.config.events.len());
    println!(
        "  Meetings skipped: {}",
        report.meetings_read - report.config.events.len()
    );
    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }
    Ok(())
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    if !args.template.is_file() {
        bail!("Template not found: {}", args.template.display());
    }
    let zoom_config_path =
        convert::resolve_zoom_config_path(args.zoom_config.as_deref(), args.year)?;
    if !args.zoom_output_csv.is_file() {
        bail!("Zoom output CSV not found: {}", args.zoom_output_csv.display());
    }

    let template: serde_json::Value = event_series::config::load_json(&args.template)?;
    let zoom = ZoomConfig::load(&zoom_config_path)?;
    let records = meetings::read_records(&args.zoom_output_csv)
        .with_context(|| format!("Cannot read {}", args.zoom_output_csv.display()))?;
    let mut links = RegistrationLinks::from_records(&records);
    let output_config = convert::build_output_config(&template, &zoom, &mut links, args.year)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("wp-events-{}-config.json", args.year)));
    convert::write_json(&output, &output_config)?;

    let event_count = output_config["events"].as_array().map_or(0, Vec::len);
    println!("✓ Wrote {} events to {}", event_count, output.display());
    println!("  template: {}", args.template.display());
    println!("  zoom config: {}", zoom_config_path.display());
    println!("  zoom csv: {}", args.zoom_output_csv.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Command::Events(args) => run_events(args, cli.verbose, false),
        Command::RecurringEvents(args) => run_events(args, cli.verbose, true),
        Command::ShowEvent(args) => run_event_lookup(args, false),
        Command::DeleteEvent(args) => run_event_lookup(args, true),
        Command::ZoomMeetings(args) => run_zoom_meetings(args, cli.verbose),
        Command::MapZoom(args) => run_map_zoom(args),
        Command::GenerateWpConfig(args) => run_generate(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    const RUN_COMMANDS: [&str; 3] = ["events", "recurring-events", "zoom-meetings"];

    fn run_args(command: Command) -> RunArgs {
        match command {
            Command::Events(args)
            | Command::RecurringEvents(args)
            | Command::ZoomMeetings(args) => args,
            _ => panic!("Not a run command"),
        }
    }

    #[test]
    fn test_config_is_required() {
        for command in RUN_COMMANDS {
            let result = Cli::try_parse_from(["event-series", command, "--dry-run"]);
            let error = result.err().expect("Missing --config should be rejected");
            assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
        }
        let result = Cli::try_parse_from(["event-series", "show-event", "--id", "7"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_after_run_commands() {
        for command in RUN_COMMANDS {
            let cli = Cli::try_parse_from([
                "event-series",
                command,
                "--config",
                "config.json",
                "--dry-run",
                "-v",
            ])
            .unwrap();
            assert!(cli.verbose);
            let args = run_args(cli.command);
            assert!(args.dry_run);
            assert_eq!(args.config, PathBuf::from("config.json"));

            let cli =
                Cli::try_parse_from(["event-series", command, "-c", "config.json", "--verbose"])
                    .unwrap();
            assert!(cli.verbose);
            assert!(!run_args(cli.command).dry_run);

            let cli = Cli::try_parse_from(["event-series", command, "-c", "config.json"]).unwrap();
            assert!(!cli.verbose);
        }
    }

    #[test]
    fn test_help_on_every_command() {
        let other_commands = ["show-event", "delete-event", "map-zoom", "generate-wp-config"];
        for command in RUN_COMMANDS.into_iter().chain(other_commands) {
            let error = Cli::try_parse_from(["event-series", command, "--help"])
                .err()
                .expect("--help should stop parsing");
            assert_eq!(error.kind(), ErrorKind::DisplayHelp);
        }
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["event-series", "generate-wp-config"]).unwrap();
        match cli.command {
            Command::GenerateWpConfig(args) => {
                assert_eq!(args.year, 2026);
                assert_eq!(args.template, PathBuf::from("events-config.json"));
                assert!(args.output.is_none());
            }
            _ => panic!("Unexpected command"),
        }
    }

    #[test]
    fn test_missing_config_file_fails_validation() {
        let args = RunArgs {
            config: PathBuf::from("tests/resources/does-not-exist.json"),
            dry_run: true,
        };
        assert!(args.validate().is_err());
        let args = RunArgs {
            config: PathBuf::from("tests/resources/events-config.json"),
            dry_run: true,
        };
        assert!(args.validate().is_ok());
    }
}
