//! Scene module lifecycle: init → activate → tick* → deactivate → dispose.
//!
//! Modules embed a [`Lifecycle`] and implement [`SceneModule`]; the provided
//! methods enforce legal transitions so hooks run at most once per transition.

use crate::transform::TransformState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleState {
    /// Constructed (init done), not yet ticking.
    #[default]
    Created,
    Active,
    Inactive,
    Disposed,
}

/// Transition tracker embedded in each module.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    state: ModuleState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ModuleState::Active
    }

    pub fn is_disposed(&self) -> bool {
        self.state == ModuleState::Disposed
    }

    /// Returns true when the module actually became active.
    pub fn activate(&mut self) -> bool {
        match self.state {
            ModuleState::Created | ModuleState::Inactive => {
                self.state = ModuleState::Active;
                true
            }
            ModuleState::Active | ModuleState::Disposed => false,
        }
    }

    /// Returns true when the module actually left the active state.
    pub fn deactivate(&mut self) -> bool {
        if self.state == ModuleState::Active {
            self.state = ModuleState::Inactive;
            true
        } else {
            false
        }
    }

    /// Returns true only on the first call.
    pub fn dispose(&mut self) -> bool {
        if self.state == ModuleState::Disposed {
            false
        } else {
            self.state = ModuleState::Disposed;
            true
        }
    }
}

/// Per-tick inputs shared with every module. Built after the controller has ticked.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub tick: u64,
    pub transform: TransformState,
}

/// A component of the flight scene driven once per frame by the host.
pub trait SceneModule {
    fn name(&self) -> &'static str;
    fn lifecycle(&self) -> &Lifecycle;
    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    fn on_activate(&mut self, _ctx: &FrameContext) {}
    fn on_tick(&mut self, ctx: &FrameContext);
    fn on_deactivate(&mut self) {}
    fn on_dispose(&mut self) {}

    fn activate(&mut self, ctx: &FrameContext) {
        if self.lifecycle_mut().activate() {
            log::debug!("{} activated", self.name());
            self.on_activate(ctx);
        }
    }

    /// Runs `on_tick` only while active.
    fn tick(&mut self, ctx: &FrameContext) {
        if self.lifecycle().is_active() {
            self.on_tick(ctx);
        }
    }

    fn deactivate(&mut self) {
        if self.lifecycle_mut().deactivate() {
            self.on_deactivate();
        }
    }

    /// Idempotent teardown. Deactivates first if needed.
    fn dispose(&mut self) {
        let was_active = self.lifecycle().is_active();
        if self.lifecycle_mut().dispose() {
            if was_active {
                self.on_deactivate();
            }
            log::debug!("{} disposed", self.name());
            self.on_dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        lifecycle: Lifecycle,
        ticks: u32,
        disposals: u32,
    }

    impl SceneModule for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }
        fn lifecycle(&self) -> &Lifecycle {
            &self.lifecycle
        }
        fn lifecycle_mut(&mut self) -> &mut Lifecycle {
            &mut self.lifecycle
        }
        fn on_tick(&mut self, _ctx: &FrameContext) {
            self.ticks += 1;
        }
        fn on_dispose(&mut self) {
            self.disposals += 1;
        }
    }

    fn ctx() -> FrameContext {
        FrameContext {
            tick: 0,
            transform: TransformState::default(),
        }
    }

    #[test]
    fn ticks_only_while_active() {
        let mut m = Counter::default();
        m.tick(&ctx());
        assert_eq!(m.ticks, 0, "created module must not tick");
        m.activate(&ctx());
        m.tick(&ctx());
        m.deactivate();
        m.tick(&ctx());
        assert_eq!(m.ticks, 1);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut m = Counter::default();
        m.activate(&ctx());
        m.dispose();
        m.dispose();
        assert_eq!(m.disposals, 1);
        m.activate(&ctx());
        assert!(m.lifecycle().is_disposed(), "disposed module cannot be revived");
    }
}
