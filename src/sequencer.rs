use std::time::Duration;
use tracing::{error, info, warn};

use crate::discover::{WorkItem, WorkItemDiscoverer};
use crate::orchestrator::{BatchOrchestrator, BatchReport};
use crate::plan::{BatchGroup, BatchPlan};

#[derive(Debug, Clone)]
pub struct GroupReport {
    pub name: String,
    pub report: BatchReport,
}

/// Outcome of a whole plan, one report per group in plan order
#[derive(Debug, Clone, Default)]
pub struct PlanReport {
    pub groups: Vec<GroupReport>,
}

impl PlanReport {
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.report.total()).sum()
    }

    pub fn succeeded(&self) -> usize {
        self.groups.iter().map(|g| g.report.succeeded()).sum()
    }

    pub fn failed(&self) -> usize {
        self.groups.iter().map(|g| g.report.failed()).sum()
    }
}

/// Runs the groups of a plan strictly one after another.
pub struct BatchSequencer {
    discoverer: WorkItemDiscoverer,
    orchestrator: BatchOrchestrator,
    inter_group_delay: Duration,
}

impl BatchSequencer {
    pub fn new(discoverer: WorkItemDiscoverer, orchestrator: BatchOrchestrator, inter_group_delay: Duration) -> Self {
        Self {
            discoverer,
            orchestrator,
            inter_group_delay,
        }
    }

    /// Walk a group's directories on the blocking pool.
    async fn discover_group(&self, group: &BatchGroup) -> Vec<WorkItem> {
        let discoverer = self.discoverer.clone();
        let directories = group.directories.clone();

        match tokio::task::spawn_blocking(move || discoverer.discover(&directories)).await {
            Ok(items) => items,
            Err(e) => {
                error!("Discovery for {} did not complete: {}", group.name, e);
                Vec::new()
            }
        }
    }

    pub async fn execute(&self, plan: &BatchPlan) -> PlanReport {
        let mut reports = Vec::with_capacity(plan.groups.len());
        info!(
            "Plan has {} groups covering {} directories",
            plan.groups.len(),
            plan.directory_count()
        );

        for (index, group) in plan.groups.iter().enumerate() {
            info!("Processing {} ({} directories)...", group.name, group.directories.len());

            let items = self.discover_group(group).await;
            let report = self.orchestrator.run(items).await;

            if report.failed() > 0 {
                warn!(
                    "{} finished: {} succeeded, {} failed of {}",
                    group.name,
                    report.succeeded(),
                    report.failed(),
                    report.total()
                );
            } else {
                info!("{} finished: {} of {} succeeded", group.name, report.succeeded(), report.total());
            }

            reports.push(GroupReport {
                name: group.name.clone(),
                report,
            });

            if index + 1 < plan.groups.len() && !self.inter_group_delay.is_zero() {
                info!("Waiting {:?} before starting the next group...", self.inter_group_delay);
                tokio::time::sleep(self.inter_group_delay).await;
            }
        }

        let summary = PlanReport { groups: reports };
        info!(
            "All groups processed: {} succeeded, {} failed of {}",
            summary.succeeded(),
            summary.failed(),
            summary.total()
        );
        summary
    }
}
