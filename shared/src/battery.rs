use serde::{Deserialize, Serialize};

use crate::notifications::{NotificationDraft, Severity};

pub const INITIAL_BATTERY_PERCENT: u8 = 75;
pub const LOW_THRESHOLD_PERCENT: u8 = 20;
pub const CRITICAL_THRESHOLD_PERCENT: u8 = 10;
pub const SIMULATION_STEP_PERCENT: u8 = 10;
pub const RANGE_KM_PER_PERCENT: f64 = 3.0;

/// State of charge, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatteryLevel(u8);

impl BatteryLevel {
    #[must_use]
    pub fn new(percentage: i32) -> Self {
        Self(percentage.clamp(0, 100) as u8)
    }

    #[must_use]
    pub const fn percentage(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn band(self) -> BatteryBand {
        BatteryBand::of(self)
    }

    #[must_use]
    pub fn estimated_range_km(self) -> f64 {
        f64::from(self.0) * RANGE_KM_PER_PERCENT
    }

    #[must_use]
    pub const fn status_label(self) -> &'static str {
        match self.0 {
            81..=100 => "Excellent",
            51..=80 => "Good",
            21..=50 => "Moderate",
            11..=20 => "Low",
            _ => "Critical",
        }
    }

    #[must_use]
    pub const fn is_full(self) -> bool {
        self.0 >= 100
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for BatteryLevel {
    fn default() -> Self {
        Self(INITIAL_BATTERY_PERCENT)
    }
}

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryBand {
    Normal,
    Low,
    Critical,
}

impl BatteryBand {
    #[must_use]
    pub fn of(level: BatteryLevel) -> Self {
        match level.percentage() {
            p if p <= CRITICAL_THRESHOLD_PERCENT => Self::Critical,
            p if p <= LOW_THRESHOLD_PERCENT => Self::Low,
            _ => Self::Normal,
        }
    }
}

/// Alert produced by moving from `previous` to `current`.
///
/// Fires once on entry into a more severe band. Staying inside a band or
/// recovering into a milder one produces nothing.
#[must_use]
pub fn threshold_alert(previous: BatteryLevel, current: BatteryLevel) -> Option<NotificationDraft> {
    let (from, to) = (previous.band(), current.band());
    if to <= from {
        return None;
    }

    let pct = current.percentage();
    match to {
        BatteryBand::Normal => None,
        BatteryBand::Low => Some(NotificationDraft::new(
            "Low Battery Warning",
            format!("Your battery is at {pct}%. Consider charging soon."),
            Severity::Warning,
        )),
        BatteryBand::Critical => Some(NotificationDraft::new(
            "Critical Battery Level",
            format!("Battery critically low at {pct}%. Find a charging station immediately."),
            Severity::Error,
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeOutcome {
    AlreadyFull,
    Charged(BatteryLevel),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DischargeOutcome {
    AlreadyEmpty,
    Discharged(BatteryLevel),
}

#[must_use]
pub fn charge_step(level: BatteryLevel) -> ChargeOutcome {
    if level.is_full() {
        return ChargeOutcome::AlreadyFull;
    }
    let next = BatteryLevel::new(i32::from(level.percentage()) + i32::from(SIMULATION_STEP_PERCENT));
    if next.is_full() {
        ChargeOutcome::Completed
    } else {
        ChargeOutcome::Charged(next)
    }
}

#[must_use]
pub fn discharge_step(level: BatteryLevel) -> DischargeOutcome {
    if level.is_empty() {
        return DischargeOutcome::AlreadyEmpty;
    }
    DischargeOutcome::Discharged(BatteryLevel::new(
        i32::from(level.percentage()) - i32::from(SIMULATION_STEP_PERCENT),
    ))
}
