//! Derived display fields: urgency buckets, request age, stock bands and badge colours.
//!
//! Every function here is pure and takes `now` explicitly. Missing or unparseable dates never
//! raise; they derive to the non-urgent end of each scale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{PartRequest, Priority, RequestStatus};

pub const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Immediate,
    Urgent,
    Soon,
    Normal,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Urgent => "urgent",
            Self::Soon => "soon",
            Self::Normal => "normal",
        }
    }

    pub fn is_pressing(&self) -> bool {
        matches!(self, Self::Immediate | Self::Urgent)
    }
}

/// Inclusive upper bounds, in days until the required date, for each urgency bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyThresholds {
    pub immediate_days: i64,
    pub urgent_days: i64,
    pub soon_days: i64,
}

impl Default for UrgencyThresholds {
    fn default() -> Self {
        Self { immediate_days: 1, urgent_days: 3, soon_days: 7 }
    }
}

impl UrgencyThresholds {
    pub fn classify(&self, days_until_required: i64) -> UrgencyLevel {
        if days_until_required <= self.immediate_days {
            UrgencyLevel::Immediate
        } else if days_until_required <= self.urgent_days {
            UrgencyLevel::Urgent
        } else if days_until_required <= self.soon_days {
            UrgencyLevel::Soon
        } else {
            UrgencyLevel::Normal
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Critical,
    Low,
    Normal,
    High,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    pub fn needs_restock(&self) -> bool {
        matches!(self, Self::Critical | Self::Low)
    }
}

/// Fill-ratio bands applied once stock is above its minimum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockThresholds {
    pub low_ratio: f64,
    pub high_ratio: f64,
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self { low_ratio: 0.25, high_ratio: 0.80 }
    }
}

impl StockThresholds {
    pub fn classify(&self, current: u32, minimum: u32, maximum: u32) -> StockStatus {
        if current <= minimum {
            return StockStatus::Critical;
        }
        // current > minimum >= 0 here, so an empty maximum means overfilled.
        if maximum == 0 {
            return StockStatus::High;
        }

        let ratio = f64::from(current) / f64::from(maximum);
        if ratio < self.low_ratio {
            StockStatus::Low
        } else if ratio > self.high_ratio {
            StockStatus::High
        } else {
            StockStatus::Normal
        }
    }
}

/// Whole days covering `millis`, rounded toward positive infinity.
pub fn ceil_days(millis: i64) -> i64 {
    let whole = millis / MILLIS_PER_DAY;
    if millis % MILLIS_PER_DAY > 0 {
        whole + 1
    } else {
        whole
    }
}

pub fn days_until_required(
    required_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<i64> {
    required_date.map(|required| ceil_days((required - now).num_milliseconds()))
}

pub fn days_pending(request_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    request_date.map(|requested| ceil_days((now - requested).num_milliseconds()))
}

pub fn urgency_level(required_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> UrgencyLevel {
    urgency_level_with(required_date, now, &UrgencyThresholds::default())
}

pub fn urgency_level_with(
    required_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    thresholds: &UrgencyThresholds,
) -> UrgencyLevel {
    days_until_required(required_date, now)
        .map(|days| thresholds.classify(days))
        .unwrap_or(UrgencyLevel::Normal)
}

pub fn priority_rank(priority: Priority) -> u8 {
    priority.rank()
}

pub fn stock_status(current: u32, minimum: u32, maximum: u32) -> StockStatus {
    StockThresholds::default().classify(current, minimum, maximum)
}

/// Fill level for a progress bar, capped at 100.
pub fn stock_percentage(current: u32, maximum: u32) -> f64 {
    if maximum == 0 {
        return 100.0;
    }
    (f64::from(current) / f64::from(maximum) * 100.0).min(100.0)
}

pub fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::Critical => "#dc2626",
        Priority::High => "#ea580c",
        Priority::Medium => "#ca8a04",
        Priority::Low => "#16a34a",
    }
}

pub fn status_color(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Approved => "#16a34a",
        RequestStatus::Rejected => "#dc2626",
        RequestStatus::Pending => "#ca8a04",
    }
}

pub fn stock_status_color(status: StockStatus) -> &'static str {
    match status {
        StockStatus::Critical => "#dc2626",
        StockStatus::Low => "#ca8a04",
        StockStatus::High => "#2563eb",
        StockStatus::Normal => "#16a34a",
    }
}

/// All derived fields for one request, computed in one place so list and detail views agree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestInsight {
    pub urgency: UrgencyLevel,
    pub days_until_required: Option<i64>,
    pub days_pending: Option<i64>,
    pub priority_rank: u8,
    pub priority_color: &'static str,
    pub status_color: &'static str,
}

impl RequestInsight {
    pub fn compute(
        request: &PartRequest,
        now: DateTime<Utc>,
        thresholds: &UrgencyThresholds,
    ) -> Self {
        Self {
            urgency: urgency_level_with(request.required_date, now, thresholds),
            days_until_required: days_until_required(request.required_date, now),
            days_pending: days_pending(request.request_date, now),
            priority_rank: priority_rank(request.priority),
            priority_color: priority_color(request.priority),
            status_color: status_color(request.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::domain::part_request::fixtures::request;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn overdue_and_next_day_are_immediate() {
        assert_eq!(urgency_level(Some(now() - Duration::days(1)), now()), UrgencyLevel::Immediate);
        assert_eq!(urgency_level(Some(now() - Duration::days(30)), now()), UrgencyLevel::Immediate);
        assert_eq!(urgency_level(Some(now() + Duration::days(1)), now()), UrgencyLevel::Immediate);
        assert_eq!(urgency_level(Some(now()), now()), UrgencyLevel::Immediate);
    }

    #[test]
    fn urgency_bucket_boundaries() {
        // One millisecond past a whole day rounds up into the next day.
        let just_over_one = now() + Duration::days(1) + Duration::milliseconds(1);
        assert_eq!(urgency_level(Some(just_over_one), now()), UrgencyLevel::Urgent);
        assert_eq!(urgency_level(Some(now() + Duration::days(3)), now()), UrgencyLevel::Urgent);
        assert_eq!(urgency_level(Some(now() + Duration::days(5)), now()), UrgencyLevel::Soon);
        assert_eq!(urgency_level(Some(now() + Duration::days(7)), now()), UrgencyLevel::Soon);
        assert_eq!(urgency_level(Some(now() + Duration::days(8)), now()), UrgencyLevel::Normal);
    }

    #[test]
    fn missing_required_date_is_normal() {
        assert_eq!(urgency_level(None, now()), UrgencyLevel::Normal);
        assert_eq!(days_until_required(None, now()), None);
    }

    #[test]
    fn immediate_iff_at_most_one_day_left() {
        for hours in -96..=240_i64 {
            let required = now() + Duration::hours(hours);
            let days = days_until_required(Some(required), now()).unwrap_or(i64::MAX);
            let immediate = urgency_level(Some(required), now()) == UrgencyLevel::Immediate;
            assert_eq!(immediate, days <= 1, "hours offset {hours}");
        }
    }

    #[test]
    fn days_pending_is_zero_on_submission_instant_and_rounds_up_after() {
        assert_eq!(days_pending(Some(now()), now()), Some(0));
        assert_eq!(days_pending(Some(now() - Duration::hours(2)), now()), Some(1));
        assert_eq!(days_pending(Some(now() - Duration::days(3)), now()), Some(3));
        assert_eq!(days_pending(None, now()), None);
    }

    #[test]
    fn ceil_days_rounds_toward_positive_infinity() {
        assert_eq!(ceil_days(0), 0);
        assert_eq!(ceil_days(1), 1);
        assert_eq!(ceil_days(MILLIS_PER_DAY), 1);
        assert_eq!(ceil_days(-1), 0);
        assert_eq!(ceil_days(-MILLIS_PER_DAY - 1), -1);
    }

    #[test]
    fn minimum_stock_takes_precedence_over_bands() {
        assert_eq!(stock_status(2, 10, 200), StockStatus::Critical);
        assert_eq!(stock_status(10, 10, 20), StockStatus::Critical);
    }

    #[test]
    fn stock_bands() {
        assert_eq!(stock_status(25, 10, 100), StockStatus::Normal);
        assert_eq!(stock_status(24, 10, 100), StockStatus::Low);
        assert_eq!(stock_status(80, 10, 100), StockStatus::Normal);
        assert_eq!(stock_status(81, 10, 100), StockStatus::High);
        assert_eq!(stock_status(5, 1, 0), StockStatus::High);
        assert!(StockStatus::Low.needs_restock());
        assert!(!StockStatus::High.needs_restock());
    }

    #[test]
    fn configured_stock_thresholds_are_respected() {
        let thresholds = StockThresholds { low_ratio: 0.5, high_ratio: 0.9 };
        assert_eq!(thresholds.classify(40, 10, 100), StockStatus::Low);
        assert_eq!(thresholds.classify(85, 10, 100), StockStatus::Normal);
    }

    #[test]
    fn stock_percentage_is_capped() {
        assert_eq!(stock_percentage(50, 100), 50.0);
        assert_eq!(stock_percentage(150, 100), 100.0);
        assert_eq!(stock_percentage(3, 0), 100.0);
    }

    #[test]
    fn insight_collects_every_field() {
        let mut request = request(1, Priority::Critical, RequestStatus::Pending);
        request.required_date = Some(now() + Duration::days(5));
        request.request_date = Some(now() - Duration::days(2));

        let insight = RequestInsight::compute(&request, now(), &UrgencyThresholds::default());
        assert_eq!(insight.urgency, UrgencyLevel::Soon);
        assert_eq!(insight.days_until_required, Some(5));
        assert_eq!(insight.days_pending, Some(2));
        assert_eq!(insight.priority_rank, 4);
        assert_eq!(insight.priority_color, "#dc2626");
        assert_eq!(insight.status_color, "#ca8a04");
    }
}
