use crate::error::Error;
use chrono::Weekday;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::{fmt, str::FromStr};

lazy_static! {
    /// A recurrence day such as "first Monday" or "LAST friday".
    static ref RECURRENCE_DAY: Regex = Regex::new(
        r"(?i)^(first|second|third|fourth|last)\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday)$"
    )
    .unwrap();
}

/// Which occurrence of a weekday within the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordinal {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl Ordinal {
    /// The numeric position both APIs expect, with -1 standing for the last occurrence.
    pub fn number(&self) -> i8 {
        match self {
            Ordinal::First => 1,
            Ordinal::Second => 2,
            Ordinal::Third => 3,
            Ordinal::Fourth => 4,
            Ordinal::Last => -1,
        }
    }

    fn from_name(name: &str) -> Option<Ordinal> {
        match name.to_lowercase().as_str() {
            "first" => Some(Ordinal::First),
            "second" => Some(Ordinal::Second),
            "third" => Some(Ordinal::Third),
            "fourth" => Some(Ordinal::Fourth),
            "last" => Some(Ordinal::Last),
            _ => None,
        }
    }
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name.to_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Upper-case weekday name as The Events Calendar Pro expects it.
pub fn api_day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

/// A parsed recurrence day, e.g. "first Monday" is `(First, Mon)`.
///
/// The concrete calendar dates are never computed here: the remote service
/// interprets the ordinal, including the `Last` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceDescriptor {
    pub ordinal: Ordinal,
    pub weekday: Weekday,
}

impl RecurrenceDescriptor {
    /// Parses `<position> <weekday>`, case-insensitively.
    pub fn parse(input: &str) -> Result<RecurrenceDescriptor, Error> {
        let invalid = || Error::InvalidRecurrenceFormat(input.to_string());
        let captures = RECURRENCE_DAY.captures(input).ok_or_else(invalid)?;
        let ordinal = Ordinal::from_name(&captures[1]).ok_or_else(invalid)?;
        let weekday = weekday_from_name(&captures[2]).ok_or_else(invalid)?;
        Ok(RecurrenceDescriptor { ordinal, weekday })
    }

    /// The monthly recurrence rule for an Events Calendar Pro event series ending on `end_date`.
    pub fn monthly_rules(&self, end_date: &str) -> RecurrenceRules {
        RecurrenceRules {
            rules: vec![RecurrenceRule {
                rule_type: "Custom",
                custom: CustomRule {
                    frequency: "Monthly",
                    interval: 1,
                    same_time: "yes",
                    month: MonthRule {
                        same_day: "no",
                        number: self.ordinal.number(),
                        day: api_day_name(self.weekday),
                    },
                },
            }],
            end_type: "On",
            end: end_date.to_string(),
        }
    }

    /// Zoom's `monthly_week_day`: 1 is Sunday, 7 is Saturday.
    pub fn zoom_week_day(&self) -> u32 {
        self.weekday.number_from_sunday()
    }
}

impl FromStr for RecurrenceDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecurrenceDescriptor::parse(s)
    }
}

impl fmt::Display for RecurrenceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ordinal.number(), api_day_name(self.weekday))
    }
}

/// The `recurrence` object of an Events Calendar Pro event payload.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecurrenceRules {
    pub rules: Vec<RecurrenceRule>,
    #[serde(rename = "end-type")]
    pub end_type: &'static str,
    pub end: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecurrenceRule {
    #[serde(rename = "type")]
    pub rule_type: &'static str,
    pub custom: CustomRule,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CustomRule {
    #[serde(rename = "type")]
    pub frequency: &'static str,
    pub interval: u32,
    #[serde(rename = "same-time")]
    pub same_time: &'static str,
    pub month: MonthRule,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MonthRule {
    #[serde(rename = "same-day")]
    pub same_day: &'static str,
    pub number: i8,
    pub day: &'static str,
}
