// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Six-phase deterministic system scheduler.
//!
//! Ordering invariant:
//! - Phases run in the fixed order `input → update → prePhysics → physics →
//!   postPhysics → render`; `render` is skipped on non-client hosts.
//! - Within a phase, systems run in (user order, insertion id) order. Each
//!   system receives a monotonic id at add-time, so the total order is stable
//!   regardless of registration interleaving.
//! - Systems are synchronous. There is no way to hand the scheduler a
//!   future: a tick is atomic, which is what lets the rollback controller
//!   treat the kernel as a pure function of (inputs, state).

use core::fmt;

use crate::world::{HostRole, StepError, World};

/// Scheduler phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Network/local input application.
    Input,
    /// Game logic.
    Update,
    /// Mirror game state into physics bodies.
    PrePhysics,
    /// Physics step.
    Physics,
    /// Mirror physics results back out; gameplay collision response.
    PostPhysics,
    /// Render-side bookkeeping; clients only.
    Render,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Self; 6] = [
        Self::Input,
        Self::Update,
        Self::PrePhysics,
        Self::Physics,
        Self::PostPhysics,
        Self::Render,
    ];

    const fn rank(self) -> u8 {
        match self {
            Self::Input => 0,
            Self::Update => 1,
            Self::PrePhysics => 2,
            Self::Physics => 3,
            Self::PostPhysics => 4,
            Self::Render => 5,
        }
    }
}

/// A system: a synchronous closure over the world.
pub type SystemFn = Box<dyn FnMut(&mut World) -> Result<(), StepError>>;

struct SystemEntry {
    phase: Phase,
    order: i32,
    id: u32,
    name: &'static str,
    run: SystemFn,
}

/// Deterministic tick driver over registered systems.
#[derive(Default)]
pub struct Scheduler {
    systems: Vec<SystemEntry>,
    next_id: u32,
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a system at user order 0.
    pub fn add_system(
        &mut self,
        phase: Phase,
        name: &'static str,
        run: impl FnMut(&mut World) -> Result<(), StepError> + 'static,
    ) {
        self.add_system_ordered(phase, 0, name, run);
    }

    /// Registers a system with an explicit user order within its phase.
    pub fn add_system_ordered(
        &mut self,
        phase: Phase,
        order: i32,
        name: &'static str,
        run: impl FnMut(&mut World) -> Result<(), StepError> + 'static,
    ) {
        let id = self.next_id;
        self.next_id += 1;
        self.systems.push(SystemEntry {
            phase,
            order,
            id,
            name,
            run: Box::new(run),
        });
        // Stable sort keeps equal keys in insertion order; the id makes the
        // key total anyway.
        self.systems
            .sort_by_key(|s| (s.phase.rank(), s.order, s.id));
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` when no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Runs one tick: all phases in order, then clears per-tick inputs and
    /// advances the frame counter.
    ///
    /// A system error aborts the tick immediately and propagates; the frame
    /// counter does not advance on failure.
    pub fn run_tick(&mut self, world: &mut World) -> Result<(), StepError> {
        for entry in &mut self.systems {
            if entry.phase == Phase::Render && world.role() != HostRole::Client {
                continue;
            }
            (entry.run)(world)?;
        }
        world.end_tick();
        Ok(())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field(
                "systems",
                &self
                    .systems
                    .iter()
                    .map(|s| (s.phase, s.order, s.name))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
