//! Per-step mechanism behaviors.
//!
//! The orchestrator calls exactly one of these before each physics step;
//! nothing here keeps state between calls, so every rule rereads the world
//! it acts on.

use rapier2d::prelude::*;
use tracing::warn;

use crate::object::{ObjectId, ObjectKind, ObjectSet};
use crate::physics::PhysicsWorld;

/// Hard limit on seesaw tilt, in radians either side of level.
pub const SEESAW_MAX_ANGLE: f32 = 0.5;

/// Radius of the fan's influence, in pixels.
pub const FAN_RANGE: f32 = 350.0;

/// Cosine threshold of the fan's forward cone.
pub const FAN_CONE_DOT: f32 = 0.8;

/// Base force per unit mass at zero distance from the fan.
pub const FAN_FORCE_SCALE: f32 = 600.0;

/// A pin bound to a host body for the duration of one simulation run.
#[derive(Debug, Clone, Copy)]
pub struct PinBinding {
    pub pin: ObjectId,
    pub host: ObjectId,
    pub joint: ImpulseJointHandle,
}

/// Edit-mode frame: hold everything still except the dragged object.
///
/// Edit mode keeps stepping the world (so dragging stays responsive), but no
/// body may coast between user interactions.
pub fn edit_frame(world: &mut PhysicsWorld, objects: &ObjectSet, dragged: Option<ObjectId>) {
    for obj in objects.iter() {
        if dragged == Some(obj.id) {
            continue;
        }
        for &handle in &obj.bodies {
            if let Some(body) = world.get_rigid_body_mut(handle) {
                if body.is_fixed() {
                    continue;
                }
                body.set_linvel(Vector::new(0.0, 0.0), true);
                body.set_angvel(0.0, true);
            }
        }
    }
}

/// Simulate-mode frame: seesaw clamping and fan forces.
pub fn simulate_step(world: &mut PhysicsWorld, objects: &ObjectSet) {
    clamp_seesaws(world, objects);
    apply_fan_forces(world, objects);
}

/// Keeps every seesaw within the tilt limit, zeroing its spin at the stop.
fn clamp_seesaws(world: &mut PhysicsWorld, objects: &ObjectSet) {
    for obj in objects.iter() {
        if obj.kind != ObjectKind::Seesaw {
            continue;
        }
        let Some(body) = world.get_rigid_body_mut(obj.primary_body()) else {
            continue;
        };
        let angle = body.rotation().angle();
        if angle.abs() > SEESAW_MAX_ANGLE {
            body.set_rotation(Rotation::from_angle(SEESAW_MAX_ANGLE.copysign(angle)), true);
            body.set_angvel(0.0, true);
        }
    }
}

/// Pushes nearby bodies along each fan's facing direction.
///
/// The push falls off linearly with distance, is limited to a forward cone,
/// and scales with the pushed body's mass so light and heavy objects react
/// alike. Pivot mechanisms are anchored and exempt. Forces accumulate for one
/// step only; the world clears them after integration.
fn apply_fan_forces(world: &mut PhysicsWorld, objects: &ObjectSet) {
    let mut fans: Vec<(ObjectId, Vector, Vector)> = Vec::new();
    for obj in objects.iter() {
        if obj.kind != ObjectKind::Fan {
            continue;
        }
        if let Some(body) = world.get_rigid_body(obj.primary_body()) {
            let angle = body.rotation().angle();
            fans.push((
                obj.id,
                body.translation(),
                Vector::new(angle.cos(), angle.sin()),
            ));
        }
    }
    if fans.is_empty() {
        return;
    }

    for obj in objects.iter() {
        if obj.kind == ObjectKind::Fan || obj.kind.has_pivot() {
            continue;
        }
        for &handle in &obj.bodies {
            let Some(body) = world.get_rigid_body_mut(handle) else {
                continue;
            };
            if body.is_fixed() {
                continue;
            }
            let pos = body.translation();
            let mass = body.mass();
            for &(_, fan_pos, fan_dir) in &fans {
                let offset = pos - fan_pos;
                let dist = offset.length();
                if dist <= f32::EPSILON || dist >= FAN_RANGE {
                    continue;
                }
                let toward = offset / dist;
                if toward.dot(fan_dir) <= FAN_CONE_DOT {
                    continue;
                }
                let strength = FAN_FORCE_SCALE * mass * (1.0 - dist / FAN_RANGE);
                body.add_force(fan_dir * strength, true);
            }
        }
    }
}

/// Binds each pin to the first overlapping movable body.
///
/// Called on simulation entry, before fixed mechanisms are frozen, so hosts
/// that are themselves fixed mechanisms still qualify as movable here. A pin
/// with no overlapping host has no effect.
pub fn insert_pins(world: &mut PhysicsWorld, objects: &ObjectSet) -> Vec<PinBinding> {
    let mut bindings = Vec::new();
    for pin in objects.iter() {
        if pin.kind != ObjectKind::Pin {
            continue;
        }
        let pin_collider = pin.colliders[0];
        let pin_body = pin.primary_body();
        let Some(pin_pos) = world.get_rigid_body(pin_body).map(|b| b.translation()) else {
            continue;
        };

        let mut host = None;
        'search: for other in objects.iter() {
            if other.id == pin.id || other.kind == ObjectKind::Pin {
                continue;
            }
            for &collider in &other.colliders {
                let Some(body) = world.collider_set.get(collider).and_then(Collider::parent)
                else {
                    continue;
                };
                let movable = world
                    .get_rigid_body(body)
                    .is_some_and(|b| !b.is_fixed());
                if movable && world.aabbs_overlap(pin_collider, collider) {
                    host = Some((other.id, body));
                    break 'search;
                }
            }
        }

        let Some((host_id, host_body)) = host else {
            warn!(pin = pin.id, "pin overlaps no movable body, leaving it loose");
            continue;
        };

        // Express the pin's world position in the host's local frame so the
        // joint holds the exact overlap point: rotate the world offset by the
        // inverse of the host's rotation.
        let Some(host_ref) = world.get_rigid_body(host_body) else {
            continue;
        };
        let rel = pin_pos - host_ref.translation();
        let (sin, cos) = host_ref.rotation().angle().sin_cos();
        let local = Vector::new(cos * rel.x + sin * rel.y, cos * rel.y - sin * rel.x);
        let joint = world.add_joint(
            pin_body,
            host_body,
            RevoluteJointBuilder::new()
                .local_anchor1(Vector::ZERO)
                .local_anchor2(local)
                .contacts_enabled(false)
                .build(),
        );
        bindings.push(PinBinding {
            pin: pin.id,
            host: host_id,
            joint,
        });
    }
    bindings
}

/// Removes every pin joint created by [`insert_pins`].
pub fn remove_pins(world: &mut PhysicsWorld, bindings: &[PinBinding]) {
    for binding in bindings {
        world.remove_joint(binding.joint);
    }
}
