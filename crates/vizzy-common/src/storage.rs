//! Storage quota accounting shown in the sidebar footer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageLevel {
    Ok,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub used: u64,
    pub limit: u64,
    /// Whole percent for display; may exceed 100 when over quota.
    pub percent: u64,
    pub level: UsageLevel,
}

impl StorageUsage {
    pub fn new(used: u64, limit: u64) -> Self {
        let ratio = ratio(used, limit);
        let level = if ratio >= 0.9 {
            UsageLevel::Critical
        } else if ratio >= 0.75 {
            UsageLevel::Warning
        } else {
            UsageLevel::Ok
        };
        Self {
            used,
            limit,
            percent: (ratio * 100.0).round() as u64,
            level,
        }
    }

    /// Fill width of the usage bar, capped at 100.
    pub fn bar_percent(&self) -> f64 {
        (ratio(self.used, self.limit) * 100.0).min(100.0)
    }
}

fn ratio(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    used as f64 / limit as f64
}

const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// `1536` → `"1.5 KB"`. Base 1024, at most two decimals.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exp])
}
