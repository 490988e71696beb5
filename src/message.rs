//! message.rs
//!
//! Renders a package's download stats into the Slack message body.
//!
//! Day/week/month counts are grouped with `,` every three digits; the
//! all-time total is printed as a plain integer.

use serde::Serialize;

use crate::stats::StatsResult;

/// Sender label shown on every notification.
pub const USERNAME: &str = "PyPi";

/// JSON body accepted by Slack incoming webhooks.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NotificationMessage {
    pub text: String,
    pub username: String,
}

impl NotificationMessage {
    pub fn for_package(package: &str, stats: &StatsResult) -> Self {
        Self {
            text: format_summary(package, stats),
            username: USERNAME.to_string(),
        }
    }
}

pub fn format_summary(package: &str, stats: &StatsResult) -> String {
    format!(
        "*Download Stats for '{package}'*\nLast Day: {}\nLast week: {}\nLast month: {}\nTotal: {}",
        group_thousands(stats.last_day),
        group_thousands(stats.last_week),
        group_thousands(stats.last_month),
        stats.total_downloads
    )
}

/// `1234567` -> `"1,234,567"`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(20000), "20,000");
        assert_eq!(group_thousands(123456), "123,456");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn summary_contains_every_line() {
        let stats = StatsResult {
            last_day: 1000,
            last_week: 5000,
            last_month: 20000,
            total_downloads: 600,
        };
        let text = format_summary("requests", &stats);

        assert!(text.starts_with("*Download Stats for 'requests'*\n"));
        assert!(text.contains("Last Day: 1,000"));
        assert!(text.contains("Last week: 5,000"));
        assert!(text.contains("Last month: 20,000"));
        assert!(text.ends_with("Total: 600"));
    }

    #[test]
    fn total_is_not_grouped() {
        let stats = StatsResult {
            total_downloads: 1234567,
            ..Default::default()
        };
        assert!(format_summary("x", &stats).ends_with("Total: 1234567"));
    }

    #[test]
    fn message_serializes_with_fixed_username() {
        let msg = NotificationMessage::for_package("flask", &StatsResult::default());
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["username"], "PyPi");
        assert_eq!(
            json["text"],
            "*Download Stats for 'flask'*\nLast Day: 0\nLast week: 0\nLast month: 0\nTotal: 0"
        );
    }
}
