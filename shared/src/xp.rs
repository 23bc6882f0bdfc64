use serde::Deserialize;

use crate::{Platform, RawCounters};

/// XP weights for every platform formula plus the level curve step.
///
/// Loaded from the environment with `envy` (e.g. `GITHUB_REPO_WEIGHT=20`),
/// every field falls back to the documented default, so the weights are a
/// configuration surface rather than code constants.
#[derive(Debug, Clone, Deserialize)]
pub struct XpWeights {
    #[serde(default = "default_github_repo_weight")]
    pub github_repo_weight: u32,
    #[serde(default = "default_github_contribution_weight")]
    pub github_contribution_weight: u32,
    #[serde(default = "default_leetcode_solved_weight")]
    pub leetcode_solved_weight: u32,
    #[serde(default = "default_leetcode_rating_baseline")]
    pub leetcode_rating_baseline: u32,
    #[serde(default = "default_leetcode_contest_weight")]
    pub leetcode_contest_weight: u32,
    #[serde(default = "default_gfg_score_weight")]
    pub gfg_score_weight: u32,
    #[serde(default = "default_gfg_solved_weight")]
    pub gfg_solved_weight: u32,
    #[serde(default = "default_level_xp")]
    pub level_xp: u32,
}

fn default_github_repo_weight() -> u32 {
    15
}

fn default_github_contribution_weight() -> u32 {
    5
}

fn default_leetcode_solved_weight() -> u32 {
    10
}

fn default_leetcode_rating_baseline() -> u32 {
    1300
}

fn default_leetcode_contest_weight() -> u32 {
    50
}

fn default_gfg_score_weight() -> u32 {
    10
}

fn default_gfg_solved_weight() -> u32 {
    5
}

fn default_level_xp() -> u32 {
    100
}

impl Default for XpWeights {
    fn default() -> Self {
        Self {
            github_repo_weight: default_github_repo_weight(),
            github_contribution_weight: default_github_contribution_weight(),
            leetcode_solved_weight: default_leetcode_solved_weight(),
            leetcode_rating_baseline: default_leetcode_rating_baseline(),
            leetcode_contest_weight: default_leetcode_contest_weight(),
            gfg_score_weight: default_gfg_score_weight(),
            gfg_solved_weight: default_gfg_solved_weight(),
            level_xp: default_level_xp(),
        }
    }
}

impl XpWeights {
    /// XP for one platform's raw counters. Pure, no I/O.
    pub fn xp_for(&self, platform: Platform, counters: &RawCounters) -> u32 {
        match platform {
            Platform::Github => self.github_xp(counters),
            Platform::Leetcode => self.leetcode_xp(counters),
            Platform::GeeksForGeeks => self.gfg_xp(counters),
        }
    }

    pub fn github_xp(&self, counters: &RawCounters) -> u32 {
        let xp = u64::from(counters.repos) * u64::from(self.github_repo_weight)
            + u64::from(counters.contributions) * u64::from(self.github_contribution_weight);
        clamp_xp(xp)
    }

    /// Rating-based LeetCode formula: a flat per-solve term, a quadratic
    /// bonus above the rating baseline, and a per-contest term.
    pub fn leetcode_xp(&self, counters: &RawCounters) -> u32 {
        let rating_delta = u64::from(counters.rating.saturating_sub(self.leetcode_rating_baseline));
        let xp = u64::from(counters.solved) * u64::from(self.leetcode_solved_weight)
            + rating_delta * rating_delta / 10
            + u64::from(counters.contests) * u64::from(self.leetcode_contest_weight);
        clamp_xp(xp)
    }

    /// When the scraper found no "Coding Score" label the score is zero and
    /// this degenerates to the flat per-solve form.
    pub fn gfg_xp(&self, counters: &RawCounters) -> u32 {
        let xp = u64::from(counters.score) * u64::from(self.gfg_score_weight)
            + u64::from(counters.solved) * u64::from(self.gfg_solved_weight);
        clamp_xp(xp)
    }

    /// `level = max(1, total_xp / level_xp + 1)`.
    pub fn level_for_xp(&self, total_xp: u32) -> u32 {
        if self.level_xp == 0 {
            return 1;
        }
        (total_xp / self.level_xp + 1).max(1)
    }
}

fn clamp_xp(xp: u64) -> u32 {
    u32::try_from(xp).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_formula() {
        let weights = XpWeights::default();
        assert_eq!(weights.github_xp(&RawCounters::github(10, 50)), 400);
        assert_eq!(weights.github_xp(&RawCounters::default()), 0);
    }

    #[test]
    fn leetcode_formula_with_rating_bonus() {
        let weights = XpWeights::default();
        // 120 solved, rating 1500, 4 contests:
        // 120*10 + (200^2)/10 + 4*50 = 1200 + 4000 + 200
        assert_eq!(
            weights.leetcode_xp(&RawCounters::leetcode(120, 1500, 4)),
            5400
        );
    }

    #[test]
    fn leetcode_rating_below_baseline_gives_no_bonus() {
        let weights = XpWeights::default();
        assert_eq!(weights.leetcode_xp(&RawCounters::leetcode(10, 900, 0)), 100);
    }

    #[test]
    fn gfg_formula_degrades_to_flat_without_score() {
        let weights = XpWeights::default();
        assert_eq!(weights.gfg_xp(&RawCounters::gfg(40, 250)), 2700);
        assert_eq!(weights.gfg_xp(&RawCounters::gfg(40, 0)), 200);
    }

    #[test]
    fn level_curve() {
        let weights = XpWeights::default();
        for (xp, level) in [(0, 1), (1, 1), (99, 1), (100, 2), (250, 3)] {
            assert_eq!(weights.level_for_xp(xp), level, "xp={xp}");
        }
    }

    #[test]
    fn level_curve_with_zero_step_stays_at_one() {
        let weights = XpWeights {
            level_xp: 0,
            ..Default::default()
        };
        assert_eq!(weights.level_for_xp(10_000), 1);
    }

    #[test]
    fn xp_never_overflows() {
        let weights = XpWeights::default();
        let counters = RawCounters {
            repos: u32::MAX,
            contributions: u32::MAX,
            ..Default::default()
        };
        assert_eq!(weights.github_xp(&counters), u32::MAX);
    }
}
