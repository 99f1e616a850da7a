use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ProductionError;

pub const MINUTES_PER_DAY: u16 = 1440;

/// Minute offset from midnight, serialized as `HH:MM`.
///
/// Always in `0..1440`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MinuteOfDay(u16);

impl MinuteOfDay {
    pub const MIDNIGHT: MinuteOfDay = MinuteOfDay(0);

    pub fn new(minutes: u16) -> Result<Self, ProductionError> {
        if minutes >= MINUTES_PER_DAY {
            return Err(ProductionError::InvalidTime(minutes.to_string()));
        }
        Ok(MinuteOfDay(minutes))
    }

    pub fn from_hm(hour: u16, minute: u16) -> Result<Self, ProductionError> {
        if hour >= 24 || minute >= 60 {
            return Err(ProductionError::InvalidTime(format!("{hour}:{minute}")));
        }
        Self::new(hour * 60 + minute)
    }

    /// Clamps any signed minute value into the valid range.
    pub fn saturating(minutes: i32) -> Self {
        MinuteOfDay(minutes.clamp(0, i32::from(MINUTES_PER_DAY - 1)) as u16)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn as_time(self) -> NaiveTime {
        NaiveTime::default() + Duration::minutes(i64::from(self.0))
    }

    /// This minute on `date`.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::default()) + Duration::minutes(i64::from(self.0))
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for MinuteOfDay {
    type Err = ProductionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (h, m) = trimmed
            .split_once(':')
            .ok_or_else(|| ProductionError::InvalidTime(trimmed.to_string()))?;
        let hour: u16 = h
            .parse()
            .map_err(|_| ProductionError::InvalidTime(trimmed.to_string()))?;
        let minute: u16 = m
            .parse()
            .map_err(|_| ProductionError::InvalidTime(trimmed.to_string()))?;
        Self::from_hm(hour, minute).map_err(|_| ProductionError::InvalidTime(trimmed.to_string()))
    }
}

impl TryFrom<String> for MinuteOfDay {
    type Error = ProductionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MinuteOfDay> for String {
    fn from(value: MinuteOfDay) -> Self {
        value.to_string()
    }
}

// ===== CATALOG =====

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    /// Capability tags used by the auto-planner, e.g. `baking`.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: String,
    pub name: String,
    pub role_id: Option<String>,
    /// bcrypt hash; the PIN itself is never stored.
    pub pin_hash: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaff {
    pub name: String,
    pub role_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum OutletType {
    Outlet,
    Banquets,
    CustomCakes,
}

/// One standing line of an outlet's order guide.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuideLine {
    pub item: String,
    pub default_qty: f64,
    pub unit: String,
    pub recurring: bool,
    /// Weekdays, 0 = Sunday.
    #[serde(default)]
    pub days: BTreeSet<u8>,
    /// Comma-separated `HH:MM` list.
    pub times: String,
    #[serde(default)]
    pub finished_item_id: Option<String>,
    #[serde(default)]
    pub recipe_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Outlet {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OutletType,
    pub order_cutoff: MinuteOfDay,
    pub open_time: Option<MinuteOfDay>,
    pub close_time: Option<MinuteOfDay>,
    #[serde(default)]
    pub guide: Vec<GuideLine>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOutlet {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OutletType,
    pub order_cutoff: MinuteOfDay,
    pub open_time: Option<MinuteOfDay>,
    pub close_time: Option<MinuteOfDay>,
    #[serde(default)]
    pub guide: Vec<GuideLine>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub on_hand: f64,
    pub par: f64,
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRawItem {
    pub name: String,
    pub unit: String,
    pub on_hand: f64,
    pub par: f64,
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinishedItem {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub on_hand: f64,
    pub par: f64,
    pub recipe_id: Option<String>,
    /// Capability a role needs to produce this item.
    #[serde(default)]
    pub capability: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFinishedItem {
    pub name: String,
    pub unit: String,
    pub on_hand: f64,
    pub par: f64,
    pub recipe_id: Option<String>,
    #[serde(default)]
    pub capability: Option<String>,
    pub location: Option<String>,
}

// ===== ORDERS =====

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: String,
    pub item: String,
    pub qty: f64,
    pub unit: String,
    pub finished_item_id: Option<String>,
    pub recipe_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderLine {
    pub item: String,
    pub qty: f64,
    pub unit: String,
    #[serde(default)]
    pub finished_item_id: Option<String>,
    #[serde(default)]
    pub recipe_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub outlet_id: String,
    #[serde(rename = "dueTimestamp")]
    pub due: NaiveDateTime,
    pub lines: Vec<OrderLine>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub changed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Default)]
pub struct OrderPatch {
    pub outlet_id: Option<String>,
    pub due: Option<NaiveDateTime>,
    pub lines: Option<Vec<NewOrderLine>>,
    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeletedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub deleted_at: NaiveDateTime,
    pub deleted_by: Option<String>,
    pub delete_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Normal,
    Late,
    Change,
}

/// An order that has been expanded from a template but not yet stored.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub outlet_id: String,
    #[serde(rename = "dueTimestamp")]
    pub due: NaiveDateTime,
    pub lines: Vec<NewOrderLine>,
    pub notes: Option<String>,
}

/// Naive ISO timestamps are taken as kitchen wall-clock time. RFC 3339
/// timestamps with an offset are converted to local time.
fn wall_clock_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return Ok(naive);
    }
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Local).naive_local())
        .map_err(serde::de::Error::custom)
}

/// Externally originated order, as posted by the commissary.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommissaryOrder {
    pub outlet_id: String,
    #[serde(deserialize_with = "wall_clock_timestamp")]
    pub due_timestamp: NaiveDateTime,
    pub lines: Vec<NewOrderLine>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuickOrderRule {
    pub outlet_id: String,
    pub lines: Vec<NewOrderLine>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Weekdays, 0 = Sunday. Empty means every day.
    #[serde(default)]
    pub weekdays: BTreeSet<u8>,
    pub time: MinuteOfDay,
    #[serde(default)]
    pub notes: Option<String>,
}

// ===== TASKS =====

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    #[default]
    Production,
    Housekeeping,
    Delivery,
    Other,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinishedDraw {
    pub finished_item_id: String,
    pub qty: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawDraw {
    pub raw_item_id: String,
    pub qty: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(rename = "dateISO")]
    pub date: NaiveDate,
    pub start: MinuteOfDay,
    pub end: MinuteOfDay,
    pub outlet_id: Option<String>,
    pub order_id: Option<String>,
    pub role_id: Option<String>,
    pub staff_id: Option<String>,
    pub recipe_id: Option<String>,
    pub qty: Option<f64>,
    pub unit: Option<String>,
    pub category: TaskCategory,
    pub color: String,
    pub done: bool,
    pub inv_accounted: bool,
    #[serde(default)]
    pub pull_from_finished: Vec<FinishedDraw>,
    #[serde(default)]
    pub use_raw: Vec<RawDraw>,
    #[serde(default)]
    pub lane_bias: i8,
    #[serde(default)]
    pub pending: bool,
    #[serde(rename = "pendingOriginalDateISO", default)]
    pub pending_original_date: Option<NaiveDate>,
    #[serde(default)]
    pub pending_original_start: Option<MinuteOfDay>,
    #[serde(default)]
    pub pending_original_end: Option<MinuteOfDay>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(rename = "dateISO")]
    pub date: NaiveDate,
    pub start: MinuteOfDay,
    pub end: MinuteOfDay,
    pub outlet_id: Option<String>,
    pub order_id: Option<String>,
    pub role_id: Option<String>,
    pub staff_id: Option<String>,
    pub recipe_id: Option<String>,
    pub qty: Option<f64>,
    pub unit: Option<String>,
    #[serde(default)]
    pub category: TaskCategory,
    pub color: Option<String>,
    #[serde(default)]
    pub pull_from_finished: Vec<FinishedDraw>,
    #[serde(default)]
    pub use_raw: Vec<RawDraw>,
}

/// Explicit role/staff assignment passed to the auto-planner.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub role_id: Option<String>,
    pub staff_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskLayout {
    pub group: usize,
    pub lane: usize,
    pub lanes_total: usize,
    /// Left edge as a fraction of the column width.
    pub offset: f64,
    /// Width as a fraction of the column width.
    pub width: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub task: Task,
    pub layout: TaskLayout,
}

// ===== LOG =====

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub ts: NaiveDateTime,
    pub kind: String,
    pub message: String,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
}

/// Staff identity of the current session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub orders_purged: usize,
    pub tasks_removed: usize,
    pub logs_purged: usize,
}
