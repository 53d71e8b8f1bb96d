//! Type converters for raw search values.
//!
//! Each converter is a stateless capability turning the raw string of a
//! `field:value` term into a typed value. Registries call them directly
//! (`UuidList::convertto(raw)?`); tools that only know a converter by name go
//! through [`ConverterRegistry`].

use std::collections::BTreeMap;

use chrono::TimeDelta;
use uuid::Uuid;

use super::error::{ConversionError, RegistryError};
use super::expr::{TimeRange, Timestamp};

/// Accepted absolute timestamp layout; `%z` takes `+0000` and `+00:00`.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Conversion of a raw string into `Output`.
pub trait ConvertTo {
    type Output;

    /// Description of the accepted shape, reported on failure.
    const EXPECTED: &'static str;

    fn convertto(raw: &str) -> Result<Self::Output, ConversionError>;
}

/// Comma separated canonical UUIDs.
pub struct UuidList;

impl ConvertTo for UuidList {
    type Output = Vec<Uuid>;
    const EXPECTED: &'static str = "comma separated UUIDs";

    fn convertto(raw: &str) -> Result<Vec<Uuid>, ConversionError> {
        raw.split(',')
            .map(|segment| {
                // uuid also accepts the simple, braced and urn forms
                if segment.len() != 36 {
                    return Err(ConversionError::new(raw, Self::EXPECTED));
                }
                Uuid::try_parse(segment).map_err(|_| ConversionError::new(raw, Self::EXPECTED))
            })
            .collect()
    }
}

/// Comma separated strings, kept verbatim.
pub struct StrList;

impl ConvertTo for StrList {
    type Output = Vec<String>;
    const EXPECTED: &'static str = "comma separated strings";

    fn convertto(raw: &str) -> Result<Vec<String>, ConversionError> {
        Ok(raw.split(',').map(str::to_string).collect())
    }
}

/// Case-insensitive boolean literal.
pub struct Bool;

impl ConvertTo for Bool {
    type Output = bool;
    const EXPECTED: &'static str = "true/false, 1/0, yes/no or on/off";

    fn convertto(raw: &str) -> Result<bool, ConversionError> {
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConversionError::new(raw, Self::EXPECTED)),
        }
    }
}

/// Absolute timestamp with explicit UTC offset.
pub struct DateTime;

impl ConvertTo for DateTime {
    type Output = Timestamp;
    const EXPECTED: &'static str = "timestamp like 2018-11-26 00:00:00+0000";

    fn convertto(raw: &str) -> Result<Timestamp, ConversionError> {
        chrono::DateTime::parse_from_str(raw, DATETIME_FORMAT)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|_| ConversionError::new(raw, Self::EXPECTED))
    }
}

/// `<start>|<end>`, inclusive on both sides.
pub struct DateTimeRange;

impl ConvertTo for DateTimeRange {
    type Output = TimeRange;
    const EXPECTED: &'static str = "two timestamps separated by '|'";

    fn convertto(raw: &str) -> Result<TimeRange, ConversionError> {
        let (start, end) = raw
            .split_once('|')
            .ok_or_else(|| ConversionError::new(raw, Self::EXPECTED))?;
        let start = DateTime::convertto(start).map_err(|_| ConversionError::new(raw, Self::EXPECTED))?;
        let end = DateTime::convertto(end).map_err(|_| ConversionError::new(raw, Self::EXPECTED))?;

        Ok(TimeRange {
            start: Some(start),
            end: Some(end),
        })
    }
}

/// `older_than:<n><unit>` or `newer_than:<n><unit>` relative to now.
pub struct DateTimeDeltaRange;

impl DateTimeDeltaRange {
    /// Resolve against an explicit evaluation time.
    pub fn convertto_at(raw: &str, now: Timestamp) -> Result<TimeRange, ConversionError> {
        let err = || ConversionError::new(raw, Self::EXPECTED);

        let (prefix, duration) = raw.split_once(':').ok_or_else(err)?;
        let delta = parse_duration(duration).ok_or_else(err)?;
        let pivot = now.checked_sub_signed(delta).ok_or_else(err)?;

        match prefix {
            "older_than" => Ok(TimeRange {
                start: None,
                end: Some(pivot),
            }),
            "newer_than" => Ok(TimeRange {
                start: Some(pivot),
                end: None,
            }),
            _ => Err(err()),
        }
    }
}

impl ConvertTo for DateTimeDeltaRange {
    type Output = TimeRange;
    const EXPECTED: &'static str = "older_than:<n><s|m|h|d|w> or newer_than:<n><s|m|h|d|w>";

    fn convertto(raw: &str) -> Result<TimeRange, ConversionError> {
        Self::convertto_at(raw, chrono::Utc::now())
    }
}

/// `10h` -> 10 hours. Units: s, m (minutes), h, d, w.
fn parse_duration(s: &str) -> Option<TimeDelta> {
    let unit = s.chars().last()?;
    let amount: i64 = s[..s.len() - unit.len_utf8()].parse().ok()?;
    if amount < 0 {
        return None;
    }

    let seconds_per_unit = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        'w' => 7 * 24 * 60 * 60,
        _ => return None,
    };

    TimeDelta::try_seconds(amount.checked_mul(seconds_per_unit)?)
}

/// Output of a converter invoked by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Converted {
    UuidList(Vec<Uuid>),
    StrList(Vec<String>),
    Bool(bool),
    DateTime(Timestamp),
    Range(TimeRange),
    Text(String),
    Integer(i64),
}

/// Signature of a converter supplied from outside this module.
pub type ConvertFn = fn(&str) -> Result<Converted, ConversionError>;

/// A caller supplied converter.
#[derive(Clone, Copy)]
pub struct NamedConverter {
    pub name: &'static str,
    pub convert: ConvertFn,
}

impl std::fmt::Debug for NamedConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedConverter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The built-in converters plus an extension slot.
#[derive(Debug, Clone, Copy)]
pub enum Converter {
    UuidList,
    StrList,
    Bool,
    DateTime,
    DateTimeRange,
    DateTimeDeltaRange,
    Custom(NamedConverter),
}

impl Converter {
    pub const BUILTIN: [(&'static str, Converter); 6] = [
        ("uuid_list", Converter::UuidList),
        ("str_list", Converter::StrList),
        ("bool", Converter::Bool),
        ("datetime", Converter::DateTime),
        ("datetime_range", Converter::DateTimeRange),
        ("datetime_delta_range", Converter::DateTimeDeltaRange),
    ];

    pub fn convert(&self, raw: &str) -> Result<Converted, ConversionError> {
        match self {
            Converter::UuidList => UuidList::convertto(raw).map(Converted::UuidList),
            Converter::StrList => StrList::convertto(raw).map(Converted::StrList),
            Converter::Bool => Bool::convertto(raw).map(Converted::Bool),
            Converter::DateTime => DateTime::convertto(raw).map(Converted::DateTime),
            Converter::DateTimeRange => DateTimeRange::convertto(raw).map(Converted::Range),
            Converter::DateTimeDeltaRange => {
                DateTimeDeltaRange::convertto(raw).map(Converted::Range)
            }
            Converter::Custom(named) => (named.convert)(raw),
        }
    }
}

/// Converters keyed by name.
#[derive(Debug, Clone)]
pub struct ConverterRegistry {
    converters: BTreeMap<&'static str, Converter>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self {
            converters: Converter::BUILTIN.into_iter().collect(),
        }
    }
}

impl ConverterRegistry {
    /// Registry holding only the built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a custom converter. Names must be non-empty and unused.
    pub fn register(&mut self, converter: NamedConverter) -> Result<(), RegistryError> {
        if converter.name.is_empty() {
            return Err(RegistryError::EmptyName {
                registry: "converter".to_string(),
            });
        }
        if self.converters.contains_key(converter.name) {
            return Err(RegistryError::Duplicate {
                registry: "converter".to_string(),
                name: converter.name.to_string(),
            });
        }

        self.converters
            .insert(converter.name, Converter::Custom(converter));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Converter> {
        self.converters.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.converters.keys().copied()
    }
}
