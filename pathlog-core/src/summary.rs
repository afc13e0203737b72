//! Per-agent summary aggregation and its `[label, value]` CSV form.
use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use serde::{Deserialize, Serialize};

use crate::error::LogError;
use crate::record::{GOAL_COMPLETION_EVENT, HeaderRecord, LogRecord};

/// Value written for true accuracy when no combat was logged.
pub const UNDEFINED_VALUE: &str = "NaN";

/// Value written for measurements no record ever set.
pub const UNSET_VALUE: &str = "0";

/// Statistics derived from one agent log in a single forward pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub accuracy: f64,
    pub evasion: f64,
    pub combats: u32,
    /// Miss count from the most recent combat record.
    pub combat_misses: u32,
    pub interaction_events: u32,
    pub ie_low_time: f64,
    pub ie_medium_time: f64,
    pub ie_high_time: f64,
    pub ie_penalty: f64,
    /// Duration of whichever combat or interaction event was logged last.
    pub time_lost: f64,
    pub last_seen_time: f64,
    pub player_died: bool,
    pub final_goal_reached: bool,
    /// An `EVENTVALUES` header has been read.
    #[serde(default)]
    pub event_values_logged: bool,
    /// A `POSITION` record has been read.
    #[serde(default)]
    pub position_logged: bool,
}

/// One labelled line of a summary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub label: &'static str,
    pub value: String,
}

impl SummaryRow {
    fn new(label: &'static str, value: impl ToString) -> Self {
        Self {
            label,
            value: value.to_string(),
        }
    }
}

impl AgentSummary {
    /// Fold one record into the running summary.
    pub fn absorb(&mut self, record: &LogRecord) {
        match record {
            LogRecord::Header(HeaderRecord::EventValues { accuracy, evasion }) => {
                self.accuracy = *accuracy;
                self.evasion = *evasion;
                self.event_values_logged = true;
            }
            LogRecord::InteractionEvent(event) => {
                self.interaction_events += 1;
                self.ie_low_time = event.low_time;
                self.ie_medium_time = event.medium_time;
                self.ie_high_time = event.high_time;
                self.ie_penalty = event.penalty;
                self.time_lost = event.duration();
            }
            LogRecord::Combat(combat) => {
                self.combats += 1;
                self.combat_misses = combat.misses;
                self.time_lost = combat.duration();
            }
            LogRecord::Position { time } => {
                self.last_seen_time = *time;
                self.position_logged = true;
            }
            LogRecord::Interaction {
                health, event_type, ..
            } => {
                if *health <= 0.0 {
                    self.player_died = true;
                }
                if event_type == GOAL_COMPLETION_EVENT {
                    self.final_goal_reached = true;
                }
            }
            LogRecord::Header(HeaderRecord::Other { .. }) | LogRecord::Time => {}
        }
    }

    /// Combats over combats plus misses, or `None` when both are zero.
    #[must_use]
    pub fn true_accuracy(&self) -> Option<f64> {
        let attempts = f64::from(self.combats) + f64::from(self.combat_misses);
        (attempts > 0.0).then(|| f64::from(self.combats) / attempts)
    }

    /// Last time the agent was seen plus the time lost to penalties.
    #[must_use]
    pub fn agent_time(&self) -> f64 {
        self.last_seen_time + self.time_lost
    }

    /// Whether a combat or interaction event has set the time lost.
    #[must_use]
    pub const fn penalty_logged(&self) -> bool {
        self.combats > 0 || self.interaction_events > 0
    }

    /// Rows in the order they are written to summary files.
    ///
    /// Counts are plain integers. Measurements use [`float_value`] once a
    /// record has set them and [`UNSET_VALUE`] before that.
    #[must_use]
    pub fn rows(&self) -> Vec<SummaryRow> {
        let true_accuracy = self
            .true_accuracy()
            .map_or_else(|| UNDEFINED_VALUE.to_string(), float_value);
        let events_logged = self.interaction_events > 0;
        let penalty_logged = self.penalty_logged();
        vec![
            SummaryRow::new("Accuracy", measured(self.accuracy, self.event_values_logged)),
            SummaryRow::new("Evasion", measured(self.evasion, self.event_values_logged)),
            SummaryRow::new("Combats", self.combats),
            SummaryRow::new("CombatMisses", self.combat_misses),
            SummaryRow::new("True Accuracy", true_accuracy),
            SummaryRow::new("InteractionEvents", self.interaction_events),
            SummaryRow::new("IE Low Time", measured(self.ie_low_time, events_logged)),
            SummaryRow::new("IE Medium Time", measured(self.ie_medium_time, events_logged)),
            SummaryRow::new("IE High Time", measured(self.ie_high_time, events_logged)),
            SummaryRow::new("IEPenalty", measured(self.ie_penalty, events_logged)),
            SummaryRow::new("TimeLoss", measured(self.time_lost, penalty_logged)),
            SummaryRow::new(
                "AgentTime",
                measured(self.agent_time(), self.position_logged || penalty_logged),
            ),
            SummaryRow::new("PlayerDied", flag(self.player_died)),
            SummaryRow::new("FinalGoalAchieved", flag(self.final_goal_reached)),
        ]
    }
}

const fn flag(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

fn measured(value: f64, logged: bool) -> String {
    if logged {
        float_value(value)
    } else {
        UNSET_VALUE.to_string()
    }
}

/// Format a measurement the way existing summary files spell it: shortest
/// round-trip digits, `.0` on whole numbers, and a signed two-digit exponent
/// outside `1e-4 <= |value| < 1e16`.
#[must_use]
pub fn float_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if value == 0.0 || (-4..16).contains(&exponent) {
        let plain = value.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

/// Aggregate a whole log into its summary.
#[must_use]
pub fn summarize(records: &[LogRecord]) -> AgentSummary {
    records
        .iter()
        .fold(AgentSummary::default(), |mut summary, record| {
            summary.absorb(record);
            summary
        })
}

/// Serialize summary rows as two-column CSV.
///
/// # Errors
///
/// Returns an error if the writer rejects a row or fails to flush.
pub fn write_summary_to<W: Write>(writer: W, summary: &AgentSummary) -> Result<(), csv::Error> {
    let mut csv = WriterBuilder::new().has_headers(false).from_writer(writer);
    for row in summary.rows() {
        csv.write_record([row.label, row.value.as_str()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write a summary file, replacing any file already at `path`.
///
/// # Errors
///
/// Returns [`LogError::Io`] if the file cannot be created and
/// [`LogError::Csv`] if writing fails.
pub fn write_summary(path: &Path, summary: &AgentSummary) -> Result<(), LogError> {
    let file = File::create(path).map_err(|source| LogError::io(path, source))?;
    write_summary_to(file, summary).map_err(|source| LogError::csv(path, source))
}
