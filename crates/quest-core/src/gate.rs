//! Global data-sufficiency gate for the hybrid path.
//!
//! Collaborative filtering only means something once the platform as a whole
//! has enough engagement. The gate is shared by every user: it looks at
//! platform-wide counts, never at the requesting user's own history.

use serde::{Deserialize, Serialize};

use crate::config::GateThresholds;

/// Raw engagement counts over the whole recommendation log.
/// Only rows with a click or a clear count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCounts {
    pub total_interactions: u64,
    pub active_users: u64,
    pub active_quests: u64,
}

impl InteractionCounts {
    /// Engaged rows per active user; 0 when nobody is active.
    pub fn avg_interactions_per_user(&self) -> f64 {
        if self.active_users == 0 {
            0.0
        } else {
            self.total_interactions as f64 / self.active_users as f64
        }
    }
}

/// Gate verdict plus the numbers behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SufficiencyReport {
    pub is_sufficient: bool,
    pub total_interactions: u64,
    pub active_users: u64,
    pub active_quests: u64,
    pub avg_interactions_per_user: f64,
    /// Criteria met, out of four.
    pub requirements_met: u8,
    pub progress: GateProgress,
}

/// Each criterion as a percentage of its threshold (may exceed 100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateProgress {
    pub interactions_pct: f64,
    pub users_pct: f64,
    pub quests_pct: f64,
    pub avg_interactions_pct: f64,
}

impl SufficiencyReport {
    pub fn requirements_label(&self) -> String {
        format!("{}/4", self.requirements_met)
    }
}

/// Sufficient only when all four criteria hold.
pub fn evaluate(counts: InteractionCounts, thresholds: &GateThresholds) -> SufficiencyReport {
    let avg = counts.avg_interactions_per_user();
    let checks = criteria(
        counts.total_interactions,
        counts.active_users,
        counts.active_quests,
        avg,
        thresholds,
    );
    let requirements_met = checks.iter().filter(|&&ok| ok).count() as u8;

    SufficiencyReport {
        is_sufficient: checks.iter().all(|&ok| ok),
        total_interactions: counts.total_interactions,
        active_users: counts.active_users,
        active_quests: counts.active_quests,
        avg_interactions_per_user: avg,
        requirements_met,
        progress: GateProgress {
            interactions_pct: percent(
                counts.total_interactions as f64,
                thresholds.min_total_interactions as f64,
            ),
            users_pct: percent(
                counts.active_users as f64,
                thresholds.min_active_users as f64,
            ),
            quests_pct: percent(
                counts.active_quests as f64,
                thresholds.min_active_quests as f64,
            ),
            avg_interactions_pct: percent(avg, thresholds.min_avg_interactions_per_user),
        },
    }
}

/// The four gate criteria, in report order: total interactions, active
/// users, active quests, average per user. Each is a plain `>=` against its
/// threshold, so raising any input can only turn a criterion on.
pub fn criteria(
    total_interactions: u64,
    active_users: u64,
    active_quests: u64,
    avg_interactions_per_user: f64,
    thresholds: &GateThresholds,
) -> [bool; 4] {
    [
        total_interactions >= thresholds.min_total_interactions,
        active_users >= thresholds.min_active_users,
        active_quests >= thresholds.min_active_quests,
        avg_interactions_per_user >= thresholds.min_avg_interactions_per_user,
    ]
}

fn percent(value: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        100.0
    } else {
        value / threshold * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(total: u64, users: u64, quests: u64) -> InteractionCounts {
        InteractionCounts {
            total_interactions: total,
            active_users: users,
            active_quests: quests,
        }
    }

    #[test]
    fn test_all_thresholds_met() {
        let report = evaluate(counts(10_000, 1_000, 30), &GateThresholds::default());
        assert!(report.is_sufficient);
        assert_eq!(report.requirements_met, 4);
        assert_eq!(report.requirements_label(), "4/4");
        assert!((report.avg_interactions_per_user - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_one_missing_criterion_fails() {
        // Average only 4.0 per user
        let report = evaluate(counts(10_000, 2_500, 40), &GateThresholds::default());
        assert!(!report.is_sufficient);
        assert_eq!(report.requirements_met, 3);

        let report = evaluate(counts(50_000, 1_000, 29), &GateThresholds::default());
        assert!(!report.is_sufficient);
        assert_eq!(report.requirements_met, 3);
    }

    #[test]
    fn test_zero_users_is_insufficient() {
        let report = evaluate(InteractionCounts::default(), &GateThresholds::default());
        assert!(!report.is_sufficient);
        assert_eq!(report.avg_interactions_per_user, 0.0);
        assert_eq!(report.requirements_met, 0);
    }

    #[test]
    fn test_progress_percentages() {
        let report = evaluate(counts(5_000, 500, 15), &GateThresholds::default());
        assert!((report.progress.interactions_pct - 50.0).abs() < 1e-9);
        assert!((report.progress.users_pct - 50.0).abs() < 1e-9);
        assert!((report.progress.quests_pct - 50.0).abs() < 1e-9);
        assert!((report.progress.avg_interactions_pct - 200.0).abs() < 1e-9);
    }
}
