//! Tick-driven phase machines replacing timer choreography.

use serde::{Deserialize, Serialize};

/// Visual style of the take-off sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchEffect {
    /// Quick fade in from black while the airship climbs.
    #[default]
    Rise,
    /// Screen starts white and clears over the whole launch.
    White,
}

impl LaunchEffect {
    /// Share of the launch the black fade-in of `Rise` takes.
    const RISE_FADE: f32 = 1.0 / 6.0;

    /// Full-screen tint `[r, g, b, amount]` at launch `progress` (0..1).
    pub fn screen_tint(self, progress: f32) -> [f32; 4] {
        let progress = progress.clamp(0.0, 1.0);
        match self {
            LaunchEffect::Rise => [0.0, 0.0, 0.0, (1.0 - progress / Self::RISE_FADE).max(0.0)],
            LaunchEffect::White => [1.0, 1.0, 1.0, 1.0 - progress],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPhase {
    Waiting,
    Launching { timer: u32 },
    Ready,
}

/// `Waiting → Launching(timer) → Ready`, advanced once per tick.
#[derive(Debug, Clone)]
pub struct LaunchSequence {
    phase: LaunchPhase,
    duration: u32,
    effect: LaunchEffect,
}

impl LaunchSequence {
    pub const DEFAULT_DURATION: u32 = 180;

    pub fn new(effect: LaunchEffect, duration: u32) -> Self {
        Self {
            phase: LaunchPhase::Waiting,
            duration,
            effect,
        }
    }

    /// A sequence that is already finished (e.g. returning from the interior).
    pub fn ready() -> Self {
        Self {
            phase: LaunchPhase::Ready,
            duration: 0,
            effect: LaunchEffect::default(),
        }
    }

    pub fn phase(&self) -> LaunchPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == LaunchPhase::Ready
    }

    /// 0..1 progress of the launch effect; 1 once ready.
    pub fn progress(&self) -> f32 {
        match self.phase {
            LaunchPhase::Waiting => 0.0,
            LaunchPhase::Launching { timer } => timer as f32 / self.duration.max(1) as f32,
            LaunchPhase::Ready => 1.0,
        }
    }

    /// Advance one tick. Returns true on the tick the sequence becomes ready.
    pub fn advance(&mut self) -> bool {
        match self.phase {
            LaunchPhase::Waiting => {
                self.phase = LaunchPhase::Launching { timer: 0 };
                false
            }
            LaunchPhase::Launching { timer } => {
                let timer = timer + 1;
                if timer >= self.duration {
                    self.phase = LaunchPhase::Ready;
                    true
                } else {
                    self.phase = LaunchPhase::Launching { timer };
                    false
                }
            }
            LaunchPhase::Ready => false,
        }
    }

    /// Tint for the current phase; clear once ready.
    pub fn screen_tint(&self) -> [f32; 4] {
        self.effect.screen_tint(self.progress())
    }
}

/// Single in-flight flag guarding a scene transition against repeated triggers.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    active: bool,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard. Returns false if a transition is already in flight.
    pub fn try_begin(&mut self) -> bool {
        if self.active {
            false
        } else {
            self.active = true;
            true
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn reset(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_becomes_ready_after_duration() {
        let mut seq = LaunchSequence::new(LaunchEffect::Rise, 180);
        assert_eq!(seq.phase(), LaunchPhase::Waiting);
        let mut ticks = 0;
        while !seq.advance() {
            ticks += 1;
            assert!(ticks < 1000, "launch never finished");
        }
        // one tick to leave Waiting, then 180 launching ticks
        assert_eq!(ticks + 1, 181);
        assert!(seq.is_ready());
        assert_eq!(seq.progress(), 1.0);
    }

    #[test]
    fn ready_sequence_stays_ready() {
        let mut seq = LaunchSequence::ready();
        assert!(!seq.advance());
        assert!(seq.is_ready());
    }

    #[test]
    fn white_launch_clears_over_the_whole_sequence() {
        let mut seq = LaunchSequence::new(LaunchEffect::White, 10);
        assert_eq!(seq.screen_tint(), [1.0, 1.0, 1.0, 1.0]);
        for _ in 0..6 {
            seq.advance();
        }
        assert!((seq.screen_tint()[3] - 0.5).abs() < 1e-6);
        while !seq.advance() {}
        assert_eq!(seq.screen_tint()[3], 0.0);
    }

    #[test]
    fn rise_launch_fades_from_black_early() {
        assert_eq!(LaunchEffect::Rise.screen_tint(0.0), [0.0, 0.0, 0.0, 1.0]);
        assert!((LaunchEffect::Rise.screen_tint(1.0 / 12.0)[3] - 0.5).abs() < 1e-5);
        assert_eq!(LaunchEffect::Rise.screen_tint(0.5)[3], 0.0);
        assert_eq!(LaunchSequence::ready().screen_tint()[3], 0.0);
    }

    #[test]
    fn guard_blocks_duplicates_until_reset() {
        let mut g = InFlightGuard::new();
        assert!(g.try_begin());
        assert!(!g.try_begin(), "second trigger must be ignored");
        g.reset();
        assert!(g.try_begin());
    }
}
