use crate::models::user::{User, UserStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RECENT_WINDOW_DAYS: i64 = 7;

/// Summary counters for the dashboard cards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    /// Users created within the recent window, bounds inclusive
    pub recent: usize,
    /// Share of active users, rounded to a whole percent
    pub active_percent: u32,
}

pub fn compute_stats(users: &[User], now: DateTime<Utc>, window: Duration) -> DashboardStats {
    // A window reaching past the earliest representable instant covers everyone
    let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut stats = users.iter().fold(DashboardStats::default(), |mut stats, user| {
        stats.total += 1;
        match user.status {
            UserStatus::Active => stats.active += 1,
            UserStatus::Inactive => stats.inactive += 1,
        }
        if user.created_at >= cutoff {
            stats.recent += 1;
        }
        stats
    });

    if stats.total > 0 {
        stats.active_percent = ((stats.active as f64 / stats.total as f64) * 100.0).round() as u32;
    }
    stats
}
