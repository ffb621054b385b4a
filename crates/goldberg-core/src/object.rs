//! Placed-object entity model.
//!
//! Every placeable thing on the canvas, from a plain box to a 20-link chain,
//! is one [`PlacedObject`]: a stable id, a kind, a material, and the physics
//! handles of its sub-parts. [`ObjectSet`] owns the collection and knows how to
//! build the sub-shape topology for each kind.

use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::material::{Color, Material, TARGET_COLOR};
use crate::physics::PhysicsWorld;

/// Unique identifier for a placed object. Never reused within a scene.
pub type ObjectId = u32;

/// Air resistance (linear damping) applied while editing, so nothing drifts
/// between interactions. Replaced by each object's recorded simulate-time
/// damping when the simulation starts.
pub const EDIT_AIR_DAMPING: f32 = 15.0;

/// Number of links in a freshly placed chain.
pub const CHAIN_LINKS: usize = 20;

/// Collision groups for ordinary objects and boundary geometry.
pub fn default_groups() -> InteractionGroups {
    InteractionGroups::new(Group::GROUP_1, Group::ALL, InteractionTestMode::And)
}

/// Collision groups for chain links: links never collide with each other,
/// which keeps tightly packed chains from exploding.
pub fn chain_groups() -> InteractionGroups {
    InteractionGroups::new(Group::GROUP_2, Group::ALL & !Group::GROUP_2, InteractionTestMode::And)
}

/// The fixed set of placeable kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Ball,
    Box,
    Domino,
    Ramp,
    Trampoline,
    Fan,
    Pin,
    Cup,
    Bottle,
    Pulley,
    Chain,
    Spinner,
    Seesaw,
}

impl ObjectKind {
    /// Material applied when the caller does not pick one.
    pub fn default_material(self) -> Material {
        match self {
            Self::Trampoline => Material::SuperBall,
            Self::Cup | Self::Bottle => Material::Plastic,
            Self::Chain | Self::Pin => Material::Metal,
            _ => Material::Wood,
        }
    }

    /// Fixed mechanisms become immovable once the simulation starts.
    pub fn is_fixed_mechanism(self) -> bool {
        matches!(self, Self::Ramp | Self::Trampoline | Self::Fan | Self::Pin)
    }

    /// Pivot mechanisms carry a `PivotBinding` anchoring them in place.
    pub fn has_pivot(self) -> bool {
        matches!(self, Self::Spinner | Self::Seesaw | Self::Pulley)
    }

    /// Air resistance used while simulating, captured into `EditState`.
    fn sim_air_damping(self) -> f32 {
        match self {
            Self::Ball => 0.01,
            Self::Pulley => 0.3,
            Self::Chain => 0.5,
            _ => 0.05,
        }
    }
}

/// Role of an object within the win condition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Normal,
    Target,
}

/// Values an object must remember across mode transitions.
///
/// Captured once at creation (or on material edits) and never touched by
/// simulation-time mutation, so leaving Simulate mode can always restore the
/// pre-run physical parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditState {
    pub sim_friction: f32,
    pub sim_restitution: f32,
    pub sim_air_damping: f32,
    pub fixed_mechanism: bool,
}

/// A fixed anchor point binding a pivot mechanism to its placement point.
///
/// Implemented as a static anchor body plus a revolute joint. "Slackening"
/// for a drag removes the joint; "restiffening" moves the anchor to the drop
/// position and re-inserts it.
#[derive(Debug)]
pub struct PivotBinding {
    pub anchor: Vector,
    pub anchor_body: RigidBodyHandle,
    pub joint: Option<ImpulseJointHandle>,
}

impl PivotBinding {
    fn create(world: &mut PhysicsWorld, body: RigidBodyHandle, at: Vector) -> Self {
        let anchor_body = world.add_rigid_body(RigidBodyBuilder::fixed().translation(at).build());
        let joint = world.add_joint(
            anchor_body,
            body,
            RevoluteJointBuilder::new()
                .local_anchor1(Vector::ZERO)
                .local_anchor2(Vector::ZERO)
                .build(),
        );
        Self {
            anchor: at,
            anchor_body,
            joint: Some(joint),
        }
    }

    /// Frees the body for dragging by removing the joint.
    pub fn slacken(&mut self, world: &mut PhysicsWorld) {
        if let Some(joint) = self.joint.take() {
            world.remove_joint(joint);
        }
    }

    /// Re-anchors at `at` and re-inserts the joint if it was slackened.
    pub fn restiffen(&mut self, world: &mut PhysicsWorld, body: RigidBodyHandle, at: Vector) {
        self.anchor = at;
        if let Some(anchor) = world.get_rigid_body_mut(self.anchor_body) {
            anchor.set_translation(at, true);
        }
        if self.joint.is_none() {
            self.joint = Some(world.add_joint(
                self.anchor_body,
                body,
                RevoluteJointBuilder::new()
                    .local_anchor1(Vector::ZERO)
                    .local_anchor2(Vector::ZERO)
                    .build(),
            ));
        }
    }
}

/// A (possibly composite) rigid body the user placed.
#[derive(Debug)]
pub struct PlacedObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub material: Material,
    pub role: Role,
    pub original_role: Role,
    /// Cumulative uniform scale. Edits apply the ratio against this value.
    pub scale: f32,
    /// Rigid bodies composing the object; the first is the primary body.
    pub bodies: Vec<RigidBodyHandle>,
    pub colliders: Vec<ColliderHandle>,
    /// Per-collider local offset at scale 1.0. Rescaling applies the current
    /// scale to these rather than reading poses back from the world.
    pub part_offsets: Vec<Vector>,
    /// Link joints for chains.
    pub link_joints: Vec<ImpulseJointHandle>,
    pub pivot: Option<PivotBinding>,
    pub edit_state: EditState,
}

impl PlacedObject {
    /// The body carrying the object's canonical transform.
    pub fn primary_body(&self) -> RigidBodyHandle {
        self.bodies[0]
    }

    pub fn is_target(&self) -> bool {
        self.role == Role::Target
    }

    /// Color the object renders in: targets always get the highlight.
    pub fn display_color(&self) -> Color {
        if self.is_target() {
            TARGET_COLOR
        } else {
            self.material.color()
        }
    }
}

/// Creation parameters for [`ObjectSet::spawn`].
#[derive(Debug, Clone, Copy)]
pub struct SpawnParams {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub scale: f32,
    pub material: Option<Material>,
    pub target: bool,
    pub original_role: Role,
}

impl SpawnParams {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle: 0.0,
            scale: 1.0,
            material: None,
            target: false,
            original_role: Role::Normal,
        }
    }
}

impl Default for SpawnParams {
    fn default() -> Self {
        Self::at(0.0, 0.0)
    }
}

/// Owns every placed object and builds their physical representation.
#[derive(Debug, Default)]
pub struct ObjectSet {
    objects: Vec<PlacedObject>,
    next_id: ObjectId,
}

impl ObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacedObject> {
        self.objects.iter()
    }

    pub fn get(&self, id: ObjectId) -> Option<&PlacedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut PlacedObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Finds the object owning a rigid body.
    pub fn find_by_body(&self, handle: RigidBodyHandle) -> Option<&PlacedObject> {
        self.objects.iter().find(|o| o.bodies.contains(&handle))
    }

    /// Finds the object owning a collider.
    pub fn find_by_collider(&self, handle: ColliderHandle) -> Option<&PlacedObject> {
        self.objects.iter().find(|o| o.colliders.contains(&handle))
    }

    /// The current target, if any. At most one object ever holds the role.
    pub fn target(&self) -> Option<&PlacedObject> {
        self.objects.iter().find(|o| o.is_target())
    }

    /// Creates an object of `kind` and returns its id.
    pub fn spawn(
        &mut self,
        world: &mut PhysicsWorld,
        kind: ObjectKind,
        params: SpawnParams,
    ) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;

        let material = params.material.unwrap_or_else(|| kind.default_material());
        let props = material.properties();
        let s = params.scale;
        let at = Vector::new(params.x, params.y);

        // Kind-specific overrides recorded into the edit state so simulation
        // entry can restore them after edit-mode tweaks.
        let (sim_friction, sim_restitution) = match kind {
            ObjectKind::Ball => (0.0, 0.8),
            ObjectKind::Ramp => (0.0, props.restitution),
            ObjectKind::Trampoline => (0.0, 2.5),
            _ => (props.friction, props.restitution),
        };
        let edit_state = EditState {
            sim_friction,
            sim_restitution,
            sim_air_damping: kind.sim_air_damping(),
            fixed_mechanism: kind.is_fixed_mechanism(),
        };

        let body_builder = || {
            RigidBodyBuilder::dynamic()
                .translation(at)
                .rotation(params.angle)
                .linear_damping(EDIT_AIR_DAMPING)
        };
        let collider_base = |builder: ColliderBuilder| {
            builder
                .friction(sim_friction)
                .restitution(sim_restitution)
                .density(props.density)
                .collision_groups(default_groups())
                .active_events(ActiveEvents::COLLISION_EVENTS)
        };

        let mut bodies = Vec::new();
        let mut colliders = Vec::new();
        let mut part_offsets = Vec::new();
        let mut link_joints = Vec::new();
        let mut pivot = None;

        match kind {
            ObjectKind::Ball => {
                let body = world.add_rigid_body(body_builder().ccd_enabled(true).build());
                colliders.push(world.add_collider(
                    collider_base(ColliderBuilder::ball(20.0 * s)).build(),
                    body,
                ));
                bodies.push(body);
            }
            ObjectKind::Box => {
                let body = world.add_rigid_body(body_builder().build());
                colliders.push(world.add_collider(
                    collider_base(ColliderBuilder::cuboid(20.0 * s, 20.0 * s)).build(),
                    body,
                ));
                bodies.push(body);
            }
            ObjectKind::Domino => {
                let body = world.add_rigid_body(body_builder().build());
                colliders.push(world.add_collider(
                    collider_base(ColliderBuilder::cuboid(5.0 * s, 30.0 * s)).build(),
                    body,
                ));
                bodies.push(body);
            }
            ObjectKind::Ramp => {
                let body = world.add_rigid_body(body_builder().build());
                colliders.push(world.add_collider(
                    collider_base(ColliderBuilder::cuboid(100.0 * s, 5.0 * s)).build(),
                    body,
                ));
                bodies.push(body);
            }
            ObjectKind::Trampoline => {
                let body = world.add_rigid_body(body_builder().build());
                colliders.push(world.add_collider(
                    collider_base(ColliderBuilder::cuboid(50.0 * s, 7.5 * s)).build(),
                    body,
                ));
                bodies.push(body);
            }
            ObjectKind::Fan => {
                let body = world.add_rigid_body(body_builder().build());
                colliders.push(world.add_collider(
                    collider_base(ColliderBuilder::cuboid(25.0 * s, 25.0 * s)).build(),
                    body,
                ));
                bodies.push(body);
            }
            ObjectKind::Pin => {
                let body = world.add_rigid_body(body_builder().build());
                colliders.push(world.add_collider(
                    collider_base(ColliderBuilder::ball(10.0 * s)).sensor(true).build(),
                    body,
                ));
                bodies.push(body);
            }
            ObjectKind::Cup => {
                let body = world.add_rigid_body(body_builder().build());
                let parts = [
                    (ColliderBuilder::cuboid(25.0 * s, 2.5 * s), Vector::new(0.0, 20.0)),
                    (ColliderBuilder::cuboid(2.5 * s, 22.5 * s), Vector::new(-25.0, 0.0)),
                    (ColliderBuilder::cuboid(2.5 * s, 22.5 * s), Vector::new(25.0, 0.0)),
                ];
                for (builder, offset) in parts {
                    colliders.push(world.add_collider(
                        collider_base(builder).translation(offset * s).build(),
                        body,
                    ));
                    part_offsets.push(offset);
                }
                bodies.push(body);
            }
            ObjectKind::Bottle => {
                let body = world.add_rigid_body(body_builder().build());
                let parts = [
                    (ColliderBuilder::cuboid(20.0 * s, 30.0 * s), Vector::new(0.0, 10.0)),
                    (ColliderBuilder::cuboid(7.5 * s, 15.0 * s), Vector::new(0.0, -35.0)),
                ];
                for (builder, offset) in parts {
                    colliders.push(world.add_collider(
                        collider_base(builder).translation(offset * s).build(),
                        body,
                    ));
                    part_offsets.push(offset);
                }
                bodies.push(body);
            }
            ObjectKind::Pulley => {
                let body = world.add_rigid_body(body_builder().build());
                colliders.push(world.add_collider(
                    collider_base(ColliderBuilder::ball(30.0 * s)).build(),
                    body,
                ));
                pivot = Some(PivotBinding::create(world, body, at));
                bodies.push(body);
            }
            ObjectKind::Spinner => {
                let body = world.add_rigid_body(body_builder().build());
                colliders.push(world.add_collider(
                    collider_base(ColliderBuilder::cuboid(70.0 * s, 7.5 * s)).build(),
                    body,
                ));
                pivot = Some(PivotBinding::create(world, body, at));
                bodies.push(body);
            }
            ObjectKind::Seesaw => {
                let body = world.add_rigid_body(body_builder().build());
                colliders.push(world.add_collider(
                    collider_base(ColliderBuilder::cuboid(100.0 * s, 5.0 * s)).build(),
                    body,
                ));
                pivot = Some(PivotBinding::create(world, body, at));
                bodies.push(body);
            }
            ObjectKind::Chain => {
                let half_width = 8.0 * s;
                let half_height = 11.0 * s;
                let spacing = half_height * 2.0 * 0.8;
                let mut prev: Option<RigidBodyHandle> = None;
                #[allow(clippy::cast_precision_loss)]
                for i in 0..CHAIN_LINKS {
                    let link_at = Vector::new(params.x, params.y + i as f32 * spacing);
                    let link = world.add_rigid_body(
                        RigidBodyBuilder::dynamic()
                            .translation(link_at)
                            .linear_damping(EDIT_AIR_DAMPING)
                            .build(),
                    );
                    colliders.push(world.add_collider(
                        ColliderBuilder::cuboid(half_width, half_height)
                            .friction(0.8)
                            .restitution(props.restitution)
                            .density(props.density)
                            .collision_groups(chain_groups())
                            .active_events(ActiveEvents::COLLISION_EVENTS)
                            .build(),
                        link,
                    ));
                    if let Some(prev) = prev {
                        link_joints.push(world.add_joint(
                            prev,
                            link,
                            RevoluteJointBuilder::new()
                                .local_anchor1(Vector::new(0.0, half_height * 0.7))
                                .local_anchor2(Vector::new(0.0, -half_height * 0.7))
                                .contacts_enabled(false)
                                .build(),
                        ));
                    }
                    bodies.push(link);
                    prev = Some(link);
                }
            }
        }

        let (role, original_role) = if params.target {
            (Role::Target, params.original_role)
        } else {
            (Role::Normal, Role::Normal)
        };

        if part_offsets.len() < colliders.len() {
            part_offsets.resize(colliders.len(), Vector::ZERO);
        }

        self.objects.push(PlacedObject {
            id,
            kind,
            material,
            role,
            original_role,
            scale: params.scale,
            bodies,
            colliders,
            part_offsets,
            link_joints,
            pivot,
            edit_state,
        });
        debug!(id, ?kind, "spawned object");
        id
    }

    /// Removes an object and everything it owns from the world.
    pub fn remove(&mut self, world: &mut PhysicsWorld, id: ObjectId) -> bool {
        let Some(pos) = self.objects.iter().position(|o| o.id == id) else {
            return false;
        };
        let obj = self.objects.remove(pos);
        // Removing a body also removes its colliders and attached joints.
        for body in obj.bodies {
            world.remove_rigid_body(body);
        }
        if let Some(pivot) = obj.pivot {
            world.remove_rigid_body(pivot.anchor_body);
        }
        true
    }

    /// Removes every object. Boundary geometry is not part of the set and
    /// survives.
    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        let ids: Vec<ObjectId> = self.objects.iter().map(|o| o.id).collect();
        for id in ids {
            self.remove(world, id);
        }
    }

    /// Re-applies a material to every sub-part of an object.
    ///
    /// Also refreshes the recorded simulate-time friction/restitution, so
    /// picking a material on a trampoline replaces its launch restitution.
    pub fn set_material(&mut self, world: &mut PhysicsWorld, id: ObjectId, material: Material) {
        let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) else {
            return;
        };
        let props = material.properties();
        obj.material = material;
        obj.edit_state.sim_friction = props.friction;
        obj.edit_state.sim_restitution = props.restitution;
        for &collider in &obj.colliders {
            if let Some(col) = world.collider_set.get_mut(collider) {
                col.set_friction(props.friction);
                col.set_restitution(props.restitution);
                col.set_density(props.density);
            }
        }
    }

    /// Sets the absolute rotation (radians) of an object's primary body.
    pub fn set_angle(&mut self, world: &mut PhysicsWorld, id: ObjectId, angle: f32) {
        let Some(obj) = self.get(id) else { return };
        if let Some(body) = world.get_rigid_body_mut(obj.primary_body()) {
            body.set_rotation(Rotation::from_angle(angle), true);
        }
    }

    /// Applies a new absolute scale as a ratio against the recorded scale.
    ///
    /// The physics representation only supports relative resizing, so the
    /// previous scale must be tracked and divided out. Returns whether the
    /// object actually changed.
    pub fn set_scale(&mut self, world: &mut PhysicsWorld, id: ObjectId, scale: f32) -> bool {
        let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) else {
            return false;
        };
        if scale <= 0.0 {
            debug!(id, scale, "ignoring non-positive scale");
            return false;
        }
        let ratio = scale / obj.scale;
        if (ratio - 1.0).abs() < f32::EPSILON {
            return false;
        }
        obj.scale = scale;
        for (i, &collider) in obj.colliders.iter().enumerate() {
            let Some(col) = world.collider_set.get_mut(collider) else {
                continue;
            };
            if let Some(ball) = col.shape().as_ball() {
                col.set_shape(SharedShape::ball(ball.radius * ratio));
            } else if let Some(cuboid) = col.shape().as_cuboid() {
                col.set_shape(SharedShape::cuboid(
                    cuboid.half_extents.x * ratio,
                    cuboid.half_extents.y * ratio,
                ));
            }
            // Composite part offsets scale with the shape.
            let offset = obj.part_offsets[i];
            if offset != Vector::ZERO {
                col.set_translation_wrt_parent(offset * scale);
            }
        }
        true
    }

    /// Marks or unmarks an object as the target, keeping at most one
    /// target scene-wide.
    pub fn toggle_target(&mut self, id: ObjectId) {
        let Some(was_target) = self.get(id).map(PlacedObject::is_target) else {
            return;
        };
        for obj in &mut self.objects {
            if obj.is_target() {
                obj.role = obj.original_role;
                obj.original_role = Role::Normal;
            }
        }
        if !was_target {
            if let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) {
                obj.original_role = obj.role;
                obj.role = Role::Target;
            }
        }
    }

    /// Position of an object's primary body.
    pub fn position(&self, world: &PhysicsWorld, id: ObjectId) -> Option<(f32, f32)> {
        self.get(id).and_then(|obj| {
            world.get_rigid_body(obj.primary_body()).map(|body| {
                let pos = body.translation();
                (pos.x, pos.y)
            })
        })
    }

    /// Rotation (radians) of an object's primary body.
    pub fn angle(&self, world: &PhysicsWorld, id: ObjectId) -> Option<f32> {
        self.get(id).and_then(|obj| {
            world
                .get_rigid_body(obj.primary_body())
                .map(|body| body.rotation().angle())
        })
    }
}
