//! Target status probing.
//!
//! The flow tool records a target's lifecycle as zero-byte sentinel files:
//! `status/{target}.{status}` for the state and
//! `logs/targettracker/{target}.start|.finished` for the event times.
//! Probing is a handful of `stat` calls and never fails; a missing file is
//! simply "no status" or "no timestamp".

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

/// Display format for event timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset the flow tool's own reports apply to sentinel mtimes.
const EVENT_TIME_OFFSET_HOURS: i64 = 8;

/// Lifecycle state of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    /// No sentinel file found.
    #[default]
    #[serde(rename = "")]
    None,
    Pending,
    Scheduled,
    Running,
    Finish,
    Failed,
    Skip,
    Invalid,
}

/// Sentinel extensions checked by [`probe_status`], highest priority first.
///
/// A target can briefly carry two sentinels while the flow tool rewrites
/// them; `skip` must win over `finish` in that window.
pub const PROBE_ORDER: [TargetStatus; 6] = [
    TargetStatus::Skip,
    TargetStatus::Finish,
    TargetStatus::Failed,
    TargetStatus::Running,
    TargetStatus::Pending,
    TargetStatus::Scheduled,
];

impl TargetStatus {
    /// The status string as it appears in sentinel extensions and the status column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::None => "",
            TargetStatus::Pending => "pending",
            TargetStatus::Scheduled => "scheduled",
            TargetStatus::Running => "running",
            TargetStatus::Finish => "finish",
            TargetStatus::Failed => "failed",
            TargetStatus::Skip => "skip",
            TargetStatus::Invalid => "invalid",
        }
    }

    pub fn is_none(&self) -> bool {
        *self == TargetStatus::None
    }

    /// Row color as `#rrggbb`, or `None` for the default color.
    pub fn color_hex(&self) -> Option<&'static str> {
        match self {
            TargetStatus::Finish => Some("#67c23a"),
            TargetStatus::Skip => Some("#e6a23c"),
            TargetStatus::Failed => Some("#f56c6c"),
            TargetStatus::Scheduled => Some("#409eff"),
            TargetStatus::Running => Some("#ffd700"),
            TargetStatus::Pending => Some("#ff9900"),
            TargetStatus::Invalid => Some("#909399"),
            TargetStatus::None => None,
        }
    }

    /// Row color as an RGB triple.
    pub fn color_rgb(&self) -> Option<(u8, u8, u8)> {
        self.color_hex().and_then(parse_hex_color)
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TargetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(TargetStatus::None),
            "pending" => Ok(TargetStatus::Pending),
            "scheduled" => Ok(TargetStatus::Scheduled),
            "running" => Ok(TargetStatus::Running),
            "finish" => Ok(TargetStatus::Finish),
            "failed" => Ok(TargetStatus::Failed),
            "skip" => Ok(TargetStatus::Skip),
            "invalid" => Ok(TargetStatus::Invalid),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Start and end event times of a target, formatted for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timestamps {
    pub start: String,
    pub end: String,
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut os = base.as_os_str().to_os_string();
    os.push(".");
    os.push(suffix);
    PathBuf::from(os)
}

/// Current status of the target whose sentinel base path is `target_file`
/// (`R/status/{target}`).
pub fn probe_status(target_file: &Path) -> TargetStatus {
    PROBE_ORDER
        .into_iter()
        .find(|status| with_suffix(target_file, status.as_str()).exists())
        .unwrap_or(TargetStatus::None)
}

/// Start/end times for the tracker base path `track_file`
/// (`R/logs/targettracker/{target}`).
pub fn probe_timestamps(track_file: &Path) -> Timestamps {
    Timestamps {
        start: event_time(&with_suffix(track_file, "start")),
        end: event_time(&with_suffix(track_file, "finished")),
    }
}

fn event_time(path: &Path) -> String {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(format_event_time)
        .unwrap_or_default()
}

/// Format a sentinel mtime the way the flow tool reports it: UTC shifted by
/// a fixed +8h.
pub fn format_event_time(mtime: SystemTime) -> String {
    let utc: DateTime<Utc> = mtime.into();
    (utc + TimeDelta::hours(EVENT_TIME_OFFSET_HOURS))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Whether the bare status record `{target}` still exists while its
/// sentinel is being rewritten. Suffixed files never count.
pub fn has_residual_record(target_file: &Path) -> bool {
    target_file.exists()
}
