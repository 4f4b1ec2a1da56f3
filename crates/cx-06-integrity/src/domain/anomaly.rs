//! Anomaly rules. Every rule that matches adds its delta.

/// Thresholds and deltas of the anomaly table.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRules {
    pub extreme_upset_below: f64,
    pub extreme_upset_delta: f64,
    pub upset_below: f64,
    pub upset_delta: f64,
    pub long_streak_above: u32,
    pub long_streak_delta: f64,
    pub upset_streak_above: u32,
    pub upset_streak_below: f64,
    pub upset_streak_delta: f64,
}

impl Default for AnomalyRules {
    fn default() -> Self {
        Self {
            extreme_upset_below: 0.20,
            extreme_upset_delta: 20.0,
            upset_below: 0.35,
            upset_delta: 10.0,
            long_streak_above: 10,
            long_streak_delta: 15.0,
            upset_streak_above: 5,
            upset_streak_below: 0.40,
            upset_streak_delta: 20.0,
        }
    }
}

/// Rules that fired for one win.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assessment {
    pub delta: f64,
    pub reasons: Vec<String>,
}

impl Assessment {
    pub fn is_anomalous(&self) -> bool {
        self.delta > 0.0
    }
}

impl AnomalyRules {
    /// Assess a win given the winner's probability and streak (including this win).
    pub fn assess(&self, win_probability: f64, streak: u32) -> Assessment {
        let mut a = Assessment::default();
        let pct = win_probability * 100.0;

        if win_probability < self.extreme_upset_below {
            a.delta += self.extreme_upset_delta;
            a.reasons.push(format!("Extreme Upset (Win Chance: {pct:.1}%)"));
        } else if win_probability < self.upset_below {
            a.delta += self.upset_delta;
            a.reasons.push(format!("Upset (Win Chance: {pct:.1}%)"));
        }

        if streak > self.long_streak_above {
            a.delta += self.long_streak_delta;
            a.reasons.push(format!("Unnatural Win Streak ({streak})"));
        }

        if streak > self.upset_streak_above && win_probability < self.upset_streak_below {
            a.delta += self.upset_streak_delta;
            a.reasons.push(format!("Streak of Upsets ({streak})"));
        }

        a
    }
}
