//! Physics world wrapper around `Rapier2D`.
//!
//! The scene core never talks to the pipeline structs directly; everything it
//! needs from the engine (bodies, colliders, joints, stepping, collision
//! events, AABB overlap tests) goes through [`PhysicsWorld`].

use parking_lot::Mutex;
use rapier2d::prelude::*;
use std::fmt;

/// Fixed timestep for physics simulation (60Hz).
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

/// Gravity while simulating (downward, in pixels/s²).
pub fn active_gravity() -> Vector {
    Vector::new(0.0, 981.0)
}

/// Gravity while editing: none, so placed objects stay where they are dropped.
pub fn inert_gravity() -> Vector {
    Vector::new(0.0, 0.0)
}

/// Buffers collision events raised during a pipeline step.
///
/// Rapier hands events to an `EventHandler` from inside `step`, so the
/// collector stores them behind a mutex and the caller drains them afterwards.
#[derive(Default)]
struct CollisionCollector {
    events: Mutex<Vec<CollisionEvent>>,
}

impl CollisionCollector {
    fn drain(&self) -> Vec<CollisionEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventHandler for CollisionCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.events.lock().push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

/// Physics world containing all `Rapier2D` components.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub gravity: Vector,
    /// Global multiplier applied to the fixed timestep (0.1x .. 2.0x).
    pub time_scale: f32,
    pub frame: u64,
    collector: CollisionCollector,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with editing gravity (none).
    pub fn new() -> Self {
        Self::with_gravity(inert_gravity())
    }

    /// Creates a new physics world with custom gravity.
    pub fn with_gravity(gravity: Vector) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: PHYSICS_DT,
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity,
            time_scale: 1.0,
            frame: 0,
            collector: CollisionCollector::default(),
        }
    }

    /// Advances the simulation by one timestep, honoring the time scale.
    ///
    /// Per-step forces queued through [`RigidBody::add_force`] are cleared
    /// after integration, so callers re-apply them every tick.
    pub fn step(&mut self) {
        self.integration_parameters.dt = PHYSICS_DT * self.time_scale;
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &self.collector,
        );
        for (_, body) in self.rigid_body_set.iter_mut() {
            body.reset_forces(false);
        }
        self.frame += 1;
    }

    /// Advances the simulation by multiple steps.
    pub fn step_n(&mut self, n: u32) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Returns every collision event raised since the previous drain.
    pub fn drain_collision_events(&mut self) -> Vec<CollisionEvent> {
        self.collector.drain()
    }

    /// Adds a rigid body to the world and returns its handle.
    pub fn add_rigid_body(&mut self, rigid_body: RigidBody) -> RigidBodyHandle {
        self.rigid_body_set.insert(rigid_body)
    }

    /// Adds a collider attached to a rigid body.
    pub fn add_collider(
        &mut self,
        collider: Collider,
        parent: RigidBodyHandle,
    ) -> ColliderHandle {
        self.collider_set
            .insert_with_parent(collider, parent, &mut self.rigid_body_set)
    }

    /// Adds a collider without a parent (static boundary geometry).
    pub fn add_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.collider_set.insert(collider)
    }

    /// Removes a rigid body and its attached colliders and joints.
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Creates an impulse joint between two bodies.
    pub fn add_joint(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> ImpulseJointHandle {
        self.impulse_joint_set.insert(body1, body2, joint, true)
    }

    /// Removes an impulse joint. Missing joints are tolerated.
    pub fn remove_joint(&mut self, handle: ImpulseJointHandle) {
        self.impulse_joint_set.remove(handle, true);
    }

    /// Gets an immutable reference to a rigid body.
    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    /// Gets a mutable reference to a rigid body.
    pub fn get_rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    /// World-space AABB of a collider, or `None` if it no longer exists.
    pub fn collider_aabb(&self, handle: ColliderHandle) -> Option<Aabb> {
        self.collider_set.get(handle).map(Collider::compute_aabb)
    }

    /// Returns whether two colliders' AABBs overlap.
    pub fn aabbs_overlap(&self, a: ColliderHandle, b: ColliderHandle) -> bool {
        match (self.collider_aabb(a), self.collider_aabb(b)) {
            (Some(a), Some(b)) => {
                a.mins.x <= b.maxs.x
                    && a.maxs.x >= b.mins.x
                    && a.mins.y <= b.maxs.y
                    && a.maxs.y >= b.mins.y
            }
            _ => false,
        }
    }

    /// Returns the current simulation frame number.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_creation() {
        let world = PhysicsWorld::new();
        assert_eq!(world.frame, 0);
        assert_eq!(world.gravity, inert_gravity());
        assert_eq!(world.integration_parameters.dt, PHYSICS_DT);
    }

    #[test]
    fn test_step_advances_frame() {
        let mut world = PhysicsWorld::new();
        world.step();
        assert_eq!(world.current_frame(), 1);
        world.step_n(10);
        assert_eq!(world.current_frame(), 11);
    }

    #[test]
    fn test_gravity_pulls_dynamic_body() {
        let mut world = PhysicsWorld::with_gravity(active_gravity());
        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(100.0, 100.0))
            .build();
        let handle = world.add_rigid_body(body);
        world.add_collider(ColliderBuilder::ball(10.0).build(), handle);

        world.step_n(30);
        let y = world.get_rigid_body(handle).unwrap().translation().y;
        assert!(y > 100.0, "body should fall under +y gravity, y={y}");
    }

    #[test]
    fn test_time_scale_slows_integration() {
        let mut fast = PhysicsWorld::with_gravity(active_gravity());
        let mut slow = PhysicsWorld::with_gravity(active_gravity());
        slow.time_scale = 0.1;

        let spawn = |world: &mut PhysicsWorld| {
            let handle = world.add_rigid_body(
                RigidBodyBuilder::dynamic()
                    .translation(Vector::new(0.0, 0.0))
                    .build(),
            );
            world.add_collider(ColliderBuilder::ball(10.0).build(), handle);
            handle
        };
        let fast_handle = spawn(&mut fast);
        let slow_handle = spawn(&mut slow);

        fast.step_n(30);
        slow.step_n(30);

        let fast_y = fast.get_rigid_body(fast_handle).unwrap().translation().y;
        let slow_y = slow.get_rigid_body(slow_handle).unwrap().translation().y;
        assert!(fast_y > slow_y, "scaled-down time should fall less: {fast_y} vs {slow_y}");
    }

    #[test]
    fn test_collision_events_are_drained() {
        let mut world = PhysicsWorld::with_gravity(active_gravity());

        world.add_static_collider(
            ColliderBuilder::cuboid(200.0, 10.0)
                .translation(Vector::new(0.0, 100.0))
                .build(),
        );
        let ball = world.add_rigid_body(
            RigidBodyBuilder::dynamic()
                .translation(Vector::new(0.0, 0.0))
                .build(),
        );
        world.add_collider(
            ColliderBuilder::ball(10.0)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build(),
            ball,
        );

        let mut started = 0;
        for _ in 0..240 {
            world.step();
            for event in world.drain_collision_events() {
                if let CollisionEvent::Started(..) = event {
                    started += 1;
                }
            }
        }
        assert!(started > 0, "falling ball should hit the floor");
    }

    #[test]
    fn test_joint_add_remove() {
        let mut world = PhysicsWorld::new();
        let a = world.add_rigid_body(RigidBodyBuilder::fixed().build());
        let b = world.add_rigid_body(
            RigidBodyBuilder::dynamic()
                .translation(Vector::new(50.0, 0.0))
                .build(),
        );
        let joint = world.add_joint(a, b, RevoluteJointBuilder::new().build());
        assert_eq!(world.impulse_joint_set.len(), 1);
        world.remove_joint(joint);
        assert_eq!(world.impulse_joint_set.len(), 0);
    }

    #[test]
    fn test_aabb_overlap() {
        let mut world = PhysicsWorld::new();
        let a = world.add_rigid_body(
            RigidBodyBuilder::dynamic()
                .translation(Vector::new(0.0, 0.0))
                .build(),
        );
        let ca = world.add_collider(ColliderBuilder::ball(20.0).build(), a);
        let b = world.add_rigid_body(
            RigidBodyBuilder::dynamic()
                .translation(Vector::new(25.0, 0.0))
                .build(),
        );
        let cb = world.add_collider(ColliderBuilder::ball(20.0).build(), b);
        let c = world.add_rigid_body(
            RigidBodyBuilder::dynamic()
                .translation(Vector::new(500.0, 0.0))
                .build(),
        );
        let cc = world.add_collider(ColliderBuilder::ball(20.0).build(), c);

        assert!(world.aabbs_overlap(ca, cb));
        assert!(!world.aabbs_overlap(ca, cc));
    }
}
