//! Stage interpolation for the ramp scheduler.

use stampede_core::{RunPhase, Stage};
use std::time::Duration;

/// Precomputed view over an ordered stage list. Target concurrency is
/// linearly interpolated within each stage, from the previous stage's
/// final target to the stage's own; the interpolation is exact at every
/// stage boundary.
#[derive(Debug, Clone)]
pub struct RampSchedule {
    stages: Vec<Stage>,
    starts: Vec<Duration>,
    total: Duration,
}

impl RampSchedule {
    pub fn new(stages: &[Stage]) -> Self {
        let mut starts = Vec::with_capacity(stages.len());
        let mut acc = Duration::ZERO;
        for stage in stages {
            starts.push(acc);
            acc += stage.duration;
        }
        Self {
            stages: stages.to_vec(),
            starts,
            total: acc,
        }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn final_target(&self) -> u32 {
        self.stages.last().map(|s| s.target).unwrap_or(0)
    }

    /// Target concurrency at `elapsed`. Past the end of the schedule this
    /// holds at the final stage's target.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        if elapsed >= self.total {
            return self.final_target();
        }
        let idx = self.stage_index(elapsed);
        let stage = &self.stages[idx];
        let from = self.start_target(idx) as f64;
        let frac = (elapsed - self.starts[idx]).as_secs_f64() / stage.duration.as_secs_f64();
        (from + (stage.target as f64 - from) * frac).round() as u32
    }

    /// Phase implied by the stage containing `elapsed`: rising targets are
    /// `Ramping`, flat are `Steady`, falling are `RampingDown`.
    pub fn phase_at(&self, elapsed: Duration) -> RunPhase {
        let idx = self.stage_index(elapsed);
        let from = self.start_target(idx);
        let to = self.stages[idx].target;
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => RunPhase::Ramping,
            std::cmp::Ordering::Equal => RunPhase::Steady,
            std::cmp::Ordering::Less => RunPhase::RampingDown,
        }
    }

    fn stage_index(&self, elapsed: Duration) -> usize {
        match self.starts.binary_search(&elapsed) {
            Ok(idx) => idx,
            Err(idx) => (idx - 1).min(self.stages.len() - 1),
        }
    }

    fn start_target(&self, idx: usize) -> u32 {
        if idx == 0 {
            0
        } else {
            self.stages[idx - 1].target
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn spike_schedule() -> RampSchedule {
        RampSchedule::new(&[
            Stage {
                duration: secs(60),
                target: 50,
            },
            Stage {
                duration: secs(120),
                target: 50,
            },
            Stage {
                duration: secs(30),
                target: 200,
            },
            Stage {
                duration: secs(60),
                target: 0,
            },
        ])
    }

    #[test]
    fn stage_boundaries_are_exact() {
        let schedule = spike_schedule();
        assert_eq!(schedule.target_at(secs(60)), 50);
        assert_eq!(schedule.target_at(secs(180)), 50);
        assert_eq!(schedule.target_at(secs(210)), 200);
        assert_eq!(schedule.target_at(secs(270)), 0);
        assert_eq!(schedule.total(), secs(270));
    }

    #[test]
    fn interpolates_within_stages() {
        let schedule = spike_schedule();
        assert_eq!(schedule.target_at(Duration::ZERO), 0);
        assert_eq!(schedule.target_at(secs(30)), 25);
        // halfway through the 30s spike from 50 to 200
        assert_eq!(schedule.target_at(secs(195)), 125);
        // halfway down the final rampdown
        assert_eq!(schedule.target_at(secs(240)), 100);
    }

    #[test]
    fn holds_final_target_past_the_end() {
        let schedule = spike_schedule();
        assert_eq!(schedule.target_at(secs(400)), 0);

        let one = RampSchedule::new(&[Stage {
            duration: secs(10),
            target: 7,
        }]);
        assert_eq!(one.target_at(secs(10)), 7);
        assert_eq!(one.target_at(secs(3600)), 7);
    }

    #[test]
    fn phases_follow_stage_progression() {
        let schedule = spike_schedule();
        assert_eq!(schedule.phase_at(secs(30)), RunPhase::Ramping);
        assert_eq!(schedule.phase_at(secs(90)), RunPhase::Steady);
        assert_eq!(schedule.phase_at(secs(190)), RunPhase::Ramping);
        assert_eq!(schedule.phase_at(secs(250)), RunPhase::RampingDown);
    }
}
