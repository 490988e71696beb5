/// Download counts for one package, as reported in a single notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsResult {
    pub last_day: u64,
    pub last_week: u64,
    pub last_month: u64,
    pub total_downloads: u64,
}
