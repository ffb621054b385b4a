//! Win detection: a ball touching the target ends the run.

use rapier2d::prelude::*;
use tracing::debug;

use crate::object::{ObjectKind, ObjectSet, Role};

/// Watches drained collision events for a ball/target contact.
///
/// The detector latches: one run raises the signal at most once, and events
/// arriving while not simulating are ignored entirely.
#[derive(Debug, Default)]
pub struct WinDetector {
    triggered: bool,
}

impl WinDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the detector for a fresh simulation run.
    pub fn reset(&mut self) {
        self.triggered = false;
    }

    /// Returns true exactly when this batch of events contains the first
    /// ball/target contact of the run.
    pub fn observe(
        &mut self,
        events: &[CollisionEvent],
        objects: &ObjectSet,
        simulating: bool,
    ) -> bool {
        if !simulating || self.triggered {
            return false;
        }
        for event in events {
            let CollisionEvent::Started(a, b, _) = event else {
                continue;
            };
            let (Some(first), Some(second)) =
                (objects.find_by_collider(*a), objects.find_by_collider(*b))
            else {
                continue;
            };
            let hit = (first.kind == ObjectKind::Ball && second.role == Role::Target)
                || (second.kind == ObjectKind::Ball && first.role == Role::Target);
            if hit {
                self.triggered = true;
                debug!(ball_or_target_a = first.id, ball_or_target_b = second.id, "win");
                return true;
            }
        }
        false
    }

    pub fn has_triggered(&self) -> bool {
        self.triggered
    }
}
