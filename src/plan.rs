use chrono::{Days, NaiveDate};
use std::path::{Path, PathBuf};

use crate::config::{GroupConfig, StorageConfig};

/// Directories processed together with shared concurrency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchGroup {
    pub name: String,
    pub directories: Vec<PathBuf>,
}

/// Groups processed one after another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    pub groups: Vec<BatchGroup>,
}

impl BatchPlan {
    /// Build the plan for the recordings of `date`.
    pub fn for_date(storage: &StorageConfig, groups: &[GroupConfig], date: NaiveDate) -> Self {
        let groups = groups
            .iter()
            .map(|group| BatchGroup {
                name: group.name.clone(),
                directories: group
                    .channels
                    .iter()
                    .map(|channel| channel_dir(&storage.root, &storage.monitoring_period, channel, date))
                    .collect(),
            })
            .collect();

        Self { groups }
    }

    pub fn directory_count(&self) -> usize {
        self.groups.iter().map(|g| g.directories.len()).sum()
    }
}

/// Folder name for a recording day, e.g. `13 January`.
pub fn day_folder(date: NaiveDate) -> String {
    date.format("%d %B").to_string()
}

/// `{root}/{period}/{channel}/{day} {month}`
pub fn channel_dir(root: &Path, period: &str, channel: &str, date: NaiveDate) -> PathBuf {
    root.join(period).join(channel).join(day_folder(date))
}

/// The day before `today`; recordings are processed the morning after.
pub fn previous_day(today: NaiveDate) -> NaiveDate {
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}
