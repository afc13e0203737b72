//! Tagged log records parsed from agent CSV files.
//!
//! Agent logs carry no column headers. The first field of each row names the
//! record kind and every other field is addressed by position, so each tag is
//! decoded into a variant with named fields and rows that are too short or
//! carry non-numeric values are rejected with the offending line.
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;

use crate::error::{LogError, RecordError};

/// `HEADER` subtype carrying the agent's accuracy and evasion values.
pub const EVENT_VALUES_SUBTYPE: &str = "EVENTVALUES";

/// `INTERACTION` event type marking completion of the final goal.
pub const GOAL_COMPLETION_EVENT: &str = "ET_GOAL_COMPLETION";

/// Record kinds written by the simulation logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordTag {
    Header,
    Position,
    Interaction,
    InteractionEvent,
    Combat,
    Time,
}

impl RecordTag {
    pub const ALL: [Self; 6] = [
        Self::Header,
        Self::Position,
        Self::Interaction,
        Self::InteractionEvent,
        Self::Combat,
        Self::Time,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Header => "HEADER",
            Self::Position => "POSITION",
            Self::Interaction => "INTERACTION",
            Self::InteractionEvent => "INTERACTIONEVENT",
            Self::Combat => "COMBAT",
            Self::Time => "TIME",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Fewest fields (tag included) a row of this kind may carry.
    #[must_use]
    pub const fn min_arity(self) -> usize {
        match self {
            Self::Header | Self::Position => 2,
            Self::Interaction => 8,
            Self::InteractionEvent => 10,
            Self::Combat => 9,
            Self::Time => 1,
        }
    }
}

impl fmt::Display for RecordTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderRecord {
    EventValues { accuracy: f64, evasion: f64 },
    /// Any other header subtype, such as the sampling rate.
    Other { subtype: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionEventRecord {
    pub start: f64,
    pub low_time: f64,
    pub medium_time: f64,
    pub high_time: f64,
    pub penalty: f64,
    pub end: f64,
}

impl InteractionEventRecord {
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatRecord {
    pub start: f64,
    pub misses: u32,
    pub end: f64,
}

impl CombatRecord {
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One decoded row of an agent log.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    Header(HeaderRecord),
    Position {
        time: f64,
    },
    Interaction {
        time: f64,
        health: f64,
        event_type: String,
    },
    InteractionEvent(InteractionEventRecord),
    Combat(CombatRecord),
    Time,
}

impl LogRecord {
    #[must_use]
    pub const fn tag(&self) -> RecordTag {
        match self {
            Self::Header(_) => RecordTag::Header,
            Self::Position { .. } => RecordTag::Position,
            Self::Interaction { .. } => RecordTag::Interaction,
            Self::InteractionEvent(_) => RecordTag::InteractionEvent,
            Self::Combat(_) => RecordTag::Combat,
            Self::Time => RecordTag::Time,
        }
    }

    /// Decode a CSV row. Rows whose fields are all empty yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] when the tag is unknown, the row is shorter
    /// than its tag requires, or a numeric field does not parse.
    pub fn from_row(row: &StringRecord, line: u64) -> Result<Option<Self>, RecordError> {
        if row.iter().all(str::is_empty) {
            return Ok(None);
        }
        let raw_tag = row.get(0).unwrap_or_default();
        let Some(tag) = RecordTag::from_tag(raw_tag) else {
            return Err(RecordError::UnknownTag {
                line,
                tag: raw_tag.to_string(),
            });
        };
        let fields = Fields { row, line, tag };
        fields.require(tag.min_arity())?;

        let record = match tag {
            RecordTag::Header => {
                let subtype = fields.text(1)?;
                if subtype == EVENT_VALUES_SUBTYPE {
                    fields.require(6)?;
                    Self::Header(HeaderRecord::EventValues {
                        accuracy: fields.number(3)?,
                        evasion: fields.number(5)?,
                    })
                } else {
                    Self::Header(HeaderRecord::Other {
                        subtype: subtype.to_string(),
                    })
                }
            }
            RecordTag::Position => Self::Position {
                time: fields.number(1)?,
            },
            RecordTag::Interaction => Self::Interaction {
                time: fields.number(1)?,
                health: fields.number(6)?,
                event_type: fields.text(7)?.to_string(),
            },
            RecordTag::InteractionEvent => Self::InteractionEvent(InteractionEventRecord {
                start: fields.number(1)?,
                low_time: fields.number(4)?,
                medium_time: fields.number(5)?,
                high_time: fields.number(6)?,
                penalty: fields.number(7)?,
                end: fields.number(9)?,
            }),
            RecordTag::Combat => Self::Combat(CombatRecord {
                start: fields.number(1)?,
                misses: fields.count(3)?,
                end: fields.number(8)?,
            }),
            RecordTag::Time => Self::Time,
        };
        Ok(Some(record))
    }
}

struct Fields<'a> {
    row: &'a StringRecord,
    line: u64,
    tag: RecordTag,
}

impl<'a> Fields<'a> {
    fn require(&self, arity: usize) -> Result<(), RecordError> {
        if self.row.len() < arity {
            return Err(RecordError::MissingField {
                line: self.line,
                tag: self.tag.as_str(),
                index: arity - 1,
                arity: self.row.len(),
            });
        }
        Ok(())
    }

    fn text(&self, index: usize) -> Result<&'a str, RecordError> {
        self.row.get(index).ok_or(RecordError::MissingField {
            line: self.line,
            tag: self.tag.as_str(),
            index,
            arity: self.row.len(),
        })
    }

    fn invalid(&self, index: usize, value: &str) -> RecordError {
        RecordError::InvalidNumber {
            line: self.line,
            tag: self.tag.as_str(),
            index,
            value: value.to_string(),
        }
    }

    fn number(&self, index: usize) -> Result<f64, RecordError> {
        let value = self.text(index)?;
        value.parse().map_err(|_| self.invalid(index, value))
    }

    fn count(&self, index: usize) -> Result<u32, RecordError> {
        let value = self.text(index)?;
        value.parse().map_err(|_| self.invalid(index, value))
    }
}

/// Parse every record from a header-less agent CSV stream.
///
/// `origin` names the source in errors.
///
/// # Errors
///
/// Returns [`LogError::Csv`] when the stream is not valid CSV and
/// [`LogError::MalformedRecord`] for the first row that fails to decode.
pub fn parse_records<R: Read>(reader: R, origin: &Path) -> Result<Vec<LogRecord>, LogError> {
    let mut csv = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, row) in csv.records().enumerate() {
        let row = row.map_err(|source| LogError::csv(origin, source))?;
        let line = row
            .position()
            .map_or(index as u64 + 1, csv::Position::line);
        let decoded = LogRecord::from_row(&row, line).map_err(|source| {
            LogError::MalformedRecord {
                path: origin.to_path_buf(),
                source,
            }
        })?;
        if let Some(record) = decoded {
            records.push(record);
        }
    }
    Ok(records)
}

/// Read and decode a whole agent log file.
///
/// # Errors
///
/// Returns [`LogError::Io`] if the file cannot be opened, otherwise the
/// errors of [`parse_records`].
pub fn read_log(path: &Path) -> Result<Vec<LogRecord>, LogError> {
    let file = File::open(path).map_err(|source| LogError::io(path, source))?;
    let records = parse_records(BufReader::new(file), path)?;
    debug!("read {} records from {}", records.len(), path.display());
    Ok(records)
}
