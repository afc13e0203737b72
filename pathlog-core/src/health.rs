//! Health-over-time curve extraction.
use serde::{Deserialize, Serialize};

use crate::record::LogRecord;

/// Health every agent starts with at time zero.
pub const INITIAL_HEALTH: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthPoint {
    pub time: f64,
    pub health: f64,
}

impl HealthPoint {
    #[must_use]
    pub const fn new(time: f64, health: f64) -> Self {
        Self { time, health }
    }
}

/// Build the health curve for one agent log.
///
/// The curve always opens at `(0, 100)` and then gains one point per
/// `INTERACTION` record, in file order.
#[must_use]
pub fn health_curve(records: &[LogRecord]) -> Vec<HealthPoint> {
    let mut curve = vec![HealthPoint::new(0.0, INITIAL_HEALTH)];
    curve.extend(records.iter().filter_map(|record| match record {
        LogRecord::Interaction { time, health, .. } => Some(HealthPoint::new(*time, *health)),
        _ => None,
    }));
    curve
}
