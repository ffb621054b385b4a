//! Scene orchestrator: the single entry point tying the entity set, mechanism
//! rules, history, and win detection to the physics world.
//!
//! All user-facing intents land here. Invalid intents (wrong mode, missing
//! selection) are silent no-ops logged at debug level; the scene never panics
//! on bad input.

use rapier2d::prelude::*;
use tracing::debug;

use crate::history::{History, ImportError, ObjectDescriptor, SceneSnapshot};
use crate::material::Material;
use crate::mechanism::{self, PinBinding};
use crate::object::{
    default_groups, ObjectId, ObjectKind, ObjectSet, SpawnParams, EDIT_AIR_DAMPING,
};
use crate::physics::{active_gravity, inert_gravity, PhysicsWorld};
use crate::win::WinDetector;

/// Grid cell size for drop snapping, in pixels.
pub const GRID_SIZE: f32 = 40.0;

/// Offset applied when pasting the clipboard, in pixels.
pub const PASTE_OFFSET: f32 = 20.0;

/// Bounds of the global time-scale multiplier.
pub const MIN_TIME_SCALE: f32 = 0.1;
pub const MAX_TIME_SCALE: f32 = 2.0;

/// The two top-level modes of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Edit,
    Simulate,
}

/// Dimensions of the visible construction area. Boundary walls are built
/// just outside these.
#[derive(Debug, Clone, Copy)]
pub struct ArenaConfig {
    pub view_width: f32,
    pub view_height: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            view_width: 800.0,
            view_height: 600.0,
        }
    }
}

/// Pre-simulation state of one body, for the round-trip restore.
#[derive(Debug, Clone, Copy)]
struct SavedBodyState {
    body: RigidBodyHandle,
    position: Vector,
    angle: f32,
    was_fixed: bool,
}

/// In-flight drag bookkeeping: the dragged object passes through everything,
/// so its colliders' groups are parked here until release.
#[derive(Debug)]
struct DragState {
    id: ObjectId,
    saved_groups: Vec<(ColliderHandle, InteractionGroups)>,
}

/// A complete editable/simulatable scene.
pub struct Scene {
    world: PhysicsWorld,
    objects: ObjectSet,
    mode: Mode,
    selection: Option<ObjectId>,
    clipboard: Option<ObjectDescriptor>,
    history: History,
    win: WinDetector,
    win_pending: bool,
    snap_enabled: bool,
    drag: Option<DragState>,
    saved_bodies: Vec<SavedBodyState>,
    pins: Vec<PinBinding>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(ArenaConfig::default())
    }
}

impl Scene {
    pub fn new(arena: ArenaConfig) -> Self {
        let mut world = PhysicsWorld::new();
        build_arena(&mut world, arena);
        let mut history = History::new();
        history.record(SceneSnapshot::default());
        Self {
            world,
            objects: ObjectSet::new(),
            mode: Mode::Edit,
            selection: None,
            clipboard: None,
            history,
            win: WinDetector::new(),
            win_pending: false,
            snap_enabled: true,
            drag: None,
            saved_bodies: Vec::new(),
            pins: Vec::new(),
        }
    }

    // ---- observers -------------------------------------------------------

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_simulating(&self) -> bool {
        self.mode == Mode::Simulate
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    pub fn item_count(&self) -> usize {
        self.objects.len()
    }

    pub fn win_pending(&self) -> bool {
        self.win_pending
    }

    /// Acknowledges the win banner.
    pub fn dismiss_win(&mut self) {
        self.win_pending = false;
    }

    pub fn snap_enabled(&self) -> bool {
        self.snap_enabled
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.snap_enabled = enabled;
    }

    pub fn time_scale(&self) -> f32 {
        self.world.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.world.time_scale = scale.clamp(MIN_TIME_SCALE, MAX_TIME_SCALE);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn objects(&self) -> &ObjectSet {
        &self.objects
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    /// Position of an object's primary body.
    pub fn position(&self, id: ObjectId) -> Option<(f32, f32)> {
        self.objects.position(&self.world, id)
    }

    // ---- editing intents -------------------------------------------------

    /// Places a new object and selects it. Rejected while simulating.
    pub fn add_object(&mut self, kind: ObjectKind, params: SpawnParams) -> Option<ObjectId> {
        if self.mode == Mode::Simulate {
            debug!(?kind, "add_object ignored while simulating");
            return None;
        }
        let id = self.objects.spawn(&mut self.world, kind, params);
        self.selection = Some(id);
        self.record_history();
        Some(id)
    }

    /// Places a new object with default properties at a point.
    pub fn add_object_at(&mut self, kind: ObjectKind, x: f32, y: f32) -> Option<ObjectId> {
        self.add_object(kind, SpawnParams::at(x, y))
    }

    /// Selects an object, or clears the selection with `None`.
    pub fn select_object(&mut self, id: Option<ObjectId>) {
        self.selection = match id {
            Some(id) if self.objects.get(id).is_some() => Some(id),
            Some(id) => {
                debug!(id, "selecting unknown object ignored");
                self.selection
            }
            None => None,
        };
    }

    /// Sets the selected object's rotation, in radians.
    pub fn set_selected_angle(&mut self, angle: f32) {
        let Some(id) = self.editable_selection() else {
            return;
        };
        self.objects.set_angle(&mut self.world, id, angle);
        self.record_history();
    }

    /// Sets the selected object's absolute uniform scale. A rejected or
    /// no-op resize records nothing.
    pub fn set_selected_scale(&mut self, scale: f32) {
        let Some(id) = self.editable_selection() else {
            return;
        };
        if self.objects.set_scale(&mut self.world, id, scale) {
            self.record_history();
        }
    }

    /// Applies a material to the selected object.
    pub fn set_selected_material(&mut self, material: Material) {
        let Some(id) = self.editable_selection() else {
            return;
        };
        self.objects.set_material(&mut self.world, id, material);
        self.record_history();
    }

    /// Toggles the target role on the selected object. At most one object is
    /// ever the target.
    pub fn toggle_target_on_selected(&mut self) {
        let Some(id) = self.editable_selection() else {
            return;
        };
        self.objects.toggle_target(id);
        self.record_history();
    }

    /// Deletes the selected object.
    pub fn delete_selected(&mut self) {
        let Some(id) = self.editable_selection() else {
            return;
        };
        self.objects.remove(&mut self.world, id);
        self.selection = None;
        self.record_history();
    }

    /// Copies the selected object's placement to the clipboard.
    pub fn copy_selected(&mut self) {
        let Some(id) = self.editable_selection() else {
            return;
        };
        if let Some(obj) = self.objects.get(id) {
            self.clipboard = Some(ObjectDescriptor::capture(obj, &self.world));
        }
    }

    /// Pastes the clipboard slightly offset and selects the new object.
    pub fn paste_clipboard(&mut self) -> Option<ObjectId> {
        if self.mode == Mode::Simulate {
            debug!("paste ignored while simulating");
            return None;
        }
        let descriptor = self.clipboard.as_ref()?.offset(PASTE_OFFSET, PASTE_OFFSET);
        let id = self
            .objects
            .spawn(&mut self.world, descriptor.kind, descriptor.spawn_params());
        self.selection = Some(id);
        self.record_history();
        Some(id)
    }

    /// Removes every placed object. Boundary geometry survives.
    pub fn clear_scene(&mut self) {
        if self.mode == Mode::Simulate {
            debug!("clear ignored while simulating");
            return;
        }
        self.objects.clear(&mut self.world);
        self.selection = None;
        self.record_history();
    }

    // ---- drag protocol ---------------------------------------------------

    /// Begins dragging an object: it stops colliding and its pivot slackens.
    pub fn drag_start(&mut self, id: ObjectId) {
        if self.mode == Mode::Simulate || self.drag.is_some() {
            return;
        }
        let Some(obj) = self.objects.get_mut(id) else {
            debug!(id, "drag on unknown object ignored");
            return;
        };
        let colliders = obj.colliders.clone();
        if let Some(pivot) = obj.pivot.as_mut() {
            pivot.slacken(&mut self.world);
        }
        let mut saved_groups = Vec::with_capacity(colliders.len());
        for handle in colliders {
            if let Some(collider) = self.world.collider_set.get_mut(handle) {
                saved_groups.push((handle, collider.collision_groups()));
                collider.set_collision_groups(InteractionGroups::none());
            }
        }
        self.selection = Some(id);
        self.drag = Some(DragState { id, saved_groups });
    }

    /// Moves the dragged object to the pointer.
    pub fn drag_move(&mut self, x: f32, y: f32) {
        let Some(drag) = &self.drag else { return };
        let Some(obj) = self.objects.get(drag.id) else {
            return;
        };
        if let Some(body) = self.world.get_rigid_body_mut(obj.primary_body()) {
            body.set_translation(Vector::new(x, y), true);
            body.set_linvel(Vector::new(0.0, 0.0), true);
            body.set_angvel(0.0, true);
        }
    }

    /// Drops the dragged object: snap, restore collisions, re-anchor pivots.
    pub fn drag_end(&mut self) {
        let Some(drag) = self.drag.take() else { return };
        for (handle, groups) in drag.saved_groups {
            if let Some(collider) = self.world.collider_set.get_mut(handle) {
                collider.set_collision_groups(groups);
            }
        }
        let Some(obj) = self.objects.get_mut(drag.id) else {
            return;
        };
        let primary = obj.primary_body();
        let Some(body) = self.world.get_rigid_body_mut(primary) else {
            return;
        };
        let mut pos = body.translation();
        if self.snap_enabled {
            pos = Vector::new(
                (pos.x / GRID_SIZE).round() * GRID_SIZE,
                (pos.y / GRID_SIZE).round() * GRID_SIZE,
            );
            body.set_translation(pos, true);
        }
        body.set_linvel(Vector::new(0.0, 0.0), true);
        body.set_angvel(0.0, true);
        if obj.kind == ObjectKind::Seesaw {
            body.set_rotation(Rotation::from_angle(0.0), true);
        }
        if let Some(pivot) = obj.pivot.as_mut() {
            pivot.restiffen(&mut self.world, primary, pos);
        }
        self.record_history();
    }

    // ---- history ---------------------------------------------------------

    /// Steps back one history entry and rebuilds the scene from it.
    pub fn undo(&mut self) {
        if self.mode == Mode::Simulate {
            debug!("undo ignored while simulating");
            return;
        }
        let snapshot = self.history.undo().cloned();
        if let Some(snapshot) = snapshot {
            self.rebuild(&snapshot);
        }
    }

    /// Steps forward one history entry and rebuilds the scene from it.
    pub fn redo(&mut self) {
        if self.mode == Mode::Simulate {
            debug!("redo ignored while simulating");
            return;
        }
        let snapshot = self.history.redo().cloned();
        if let Some(snapshot) = snapshot {
            self.rebuild(&snapshot);
        }
    }

    /// Serializes the live scene to its canonical JSON form.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        self.snapshot().to_json()
    }

    /// Replaces the scene with a previously exported one.
    ///
    /// All-or-nothing: a parse failure leaves the current scene untouched.
    pub fn import_json(&mut self, json: &str) -> Result<(), ImportError> {
        let snapshot = SceneSnapshot::from_json(json)?;
        if self.mode == Mode::Simulate {
            self.exit_simulate(true);
        }
        self.rebuild(&snapshot);
        self.record_history();
        Ok(())
    }

    // ---- mode transitions ------------------------------------------------

    /// Flips between Edit and Simulate. Leaving Simulate this way restores
    /// every body to its pre-run placement.
    pub fn toggle_simulation(&mut self) {
        match self.mode {
            Mode::Edit => self.enter_simulate(),
            Mode::Simulate => self.exit_simulate(true),
        }
    }

    fn enter_simulate(&mut self) {
        if self.drag.is_some() {
            self.drag_end();
        }
        self.selection = None;
        self.saved_bodies.clear();
        for obj in self.objects.iter() {
            for &body in &obj.bodies {
                if let Some(body_ref) = self.world.get_rigid_body(body) {
                    self.saved_bodies.push(SavedBodyState {
                        body,
                        position: body_ref.translation(),
                        angle: body_ref.rotation().angle(),
                        was_fixed: body_ref.is_fixed(),
                    });
                }
            }
        }

        // Pins bind before anything freezes, so a pin resting on a ramp still
        // attaches to it.
        self.pins = mechanism::insert_pins(&mut self.world, &self.objects);

        for obj in self.objects.iter() {
            let state = obj.edit_state;
            for &collider in &obj.colliders {
                if let Some(col) = self.world.collider_set.get_mut(collider) {
                    col.set_friction(state.sim_friction);
                    col.set_restitution(state.sim_restitution);
                }
            }
            for &body in &obj.bodies {
                if let Some(body) = self.world.get_rigid_body_mut(body) {
                    body.set_linear_damping(state.sim_air_damping);
                    if state.fixed_mechanism {
                        body.set_body_type(RigidBodyType::Fixed, true);
                    }
                }
            }
        }

        self.world.gravity = active_gravity();
        self.win.reset();
        self.mode = Mode::Simulate;
        debug!(objects = self.objects.len(), "simulation started");
    }

    /// Returns to Edit mode.
    ///
    /// With `restore`, every body goes back to its captured pre-run pose.
    /// Without it (the win path) the run's final poses stay visible; only the
    /// physical bookkeeping is normalized for editing.
    fn exit_simulate(&mut self, restore: bool) {
        mechanism::remove_pins(&mut self.world, &self.pins);
        self.pins.clear();

        let saved = std::mem::take(&mut self.saved_bodies);
        for state in saved {
            let Some(body) = self.world.get_rigid_body_mut(state.body) else {
                continue;
            };
            if restore {
                body.set_translation(state.position, true);
                body.set_rotation(Rotation::from_angle(state.angle), true);
            }
            body.set_linvel(Vector::new(0.0, 0.0), true);
            body.set_angvel(0.0, true);
            let body_type = if state.was_fixed {
                RigidBodyType::Fixed
            } else {
                RigidBodyType::Dynamic
            };
            body.set_body_type(body_type, true);
            if !state.was_fixed {
                body.set_linear_damping(EDIT_AIR_DAMPING);
            }
        }

        // Re-anchor pivots wherever their bodies ended up.
        let pivots: Vec<(ObjectId, RigidBodyHandle)> = self
            .objects
            .iter()
            .filter(|o| o.pivot.is_some())
            .map(|o| (o.id, o.primary_body()))
            .collect();
        for (id, body) in pivots {
            let Some(pos) = self.world.get_rigid_body(body).map(|b| b.translation()) else {
                continue;
            };
            if let Some(pivot) = self.objects.get_mut(id).and_then(|o| o.pivot.as_mut()) {
                pivot.restiffen(&mut self.world, body, pos);
            }
        }

        self.world.gravity = inert_gravity();
        self.mode = Mode::Edit;
        debug!(restored = restore, "simulation stopped");
    }

    // ---- stepping --------------------------------------------------------

    /// Advances the scene by one fixed tick.
    pub fn step(&mut self) {
        match self.mode {
            Mode::Edit => {
                let dragged = self.drag.as_ref().map(|d| d.id);
                mechanism::edit_frame(&mut self.world, &self.objects, dragged);
                self.world.step();
                self.world.drain_collision_events();
            }
            Mode::Simulate => {
                mechanism::simulate_step(&mut self.world, &self.objects);
                self.world.step();
                let events = self.world.drain_collision_events();
                if self.win.observe(&events, &self.objects, true) {
                    self.win_pending = true;
                    self.exit_simulate(false);
                }
            }
        }
    }

    // ---- internals -------------------------------------------------------

    fn editable_selection(&self) -> Option<ObjectId> {
        if self.mode == Mode::Simulate {
            debug!("edit intent ignored while simulating");
            return None;
        }
        if self.selection.is_none() {
            debug!("edit intent with no selection ignored");
        }
        self.selection
    }

    fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot(
            self.objects
                .iter()
                .map(|obj| ObjectDescriptor::capture(obj, &self.world))
                .collect(),
        )
    }

    fn record_history(&mut self) {
        let snapshot = self.snapshot();
        self.history.record(snapshot);
    }

    fn rebuild(&mut self, snapshot: &SceneSnapshot) {
        self.drag = None;
        self.objects.clear(&mut self.world);
        for descriptor in &snapshot.0 {
            self.objects
                .spawn(&mut self.world, descriptor.kind, descriptor.spawn_params());
        }
        self.selection = None;
    }
}

/// Static boundary geometry: ground under the view, walls beside it, and a
/// ceiling high above for launched objects.
fn build_arena(world: &mut PhysicsWorld, arena: ArenaConfig) {
    let cx = arena.view_width / 2.0;
    let walls = [
        // (half_w, half_h, x, y)
        (5000.0, 50.0, cx, arena.view_height + 50.0),
        (5000.0, 50.0, cx, -2000.0),
        (50.0, 5000.0, -50.0, arena.view_height / 2.0),
        (50.0, 5000.0, arena.view_width + 50.0, arena.view_height / 2.0),
    ];
    for (half_w, half_h, x, y) in walls {
        world.add_static_collider(
            ColliderBuilder::cuboid(half_w, half_h)
                .translation(Vector::new(x, y))
                .friction(0.5)
                .restitution(0.1)
                .collision_groups(default_groups())
                .build(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene::default()
    }

    #[test]
    fn test_add_select_delete() {
        let mut scene = scene();
        let id = scene.add_object_at(ObjectKind::Box, 100.0, 100.0).unwrap();
        assert_eq!(scene.selection(), Some(id));
        assert_eq!(scene.item_count(), 1);

        scene.delete_selected();
        assert_eq!(scene.item_count(), 0);
        assert_eq!(scene.selection(), None);
    }

    #[test]
    fn test_add_rejected_while_simulating() {
        let mut scene = scene();
        scene.add_object_at(ObjectKind::Ball, 100.0, 100.0);
        scene.toggle_simulation();
        assert!(scene.add_object_at(ObjectKind::Box, 0.0, 0.0).is_none());
        assert_eq!(scene.item_count(), 1);
    }

    #[test]
    fn test_copy_paste_offsets_and_assigns_fresh_id() {
        let mut scene = scene();
        let original = scene.add_object_at(ObjectKind::Domino, 100.0, 200.0).unwrap();
        scene.copy_selected();
        let pasted = scene.paste_clipboard().unwrap();

        assert_ne!(original, pasted);
        assert_eq!(scene.item_count(), 2);
        let (x, y) = scene.position(pasted).unwrap();
        assert!((x - 120.0).abs() < 1e-3);
        assert!((y - 220.0).abs() < 1e-3);
        assert_eq!(scene.selection(), Some(pasted));
    }

    #[test]
    fn test_undo_restores_prior_entity_set() {
        let mut scene = scene();
        scene.add_object_at(ObjectKind::Box, 100.0, 100.0);
        scene.add_object_at(ObjectKind::Ball, 200.0, 100.0);
        assert_eq!(scene.item_count(), 2);

        scene.undo();
        assert_eq!(scene.item_count(), 1);
        let survivor = scene.objects().iter().next().unwrap();
        assert_eq!(survivor.kind, ObjectKind::Box);

        scene.redo();
        assert_eq!(scene.item_count(), 2);

        // Undo all the way down reaches the initial empty scene.
        scene.undo();
        scene.undo();
        assert_eq!(scene.item_count(), 0);
        assert!(!scene.can_undo());
    }

    #[test]
    fn test_toggle_round_trip_restores_poses() {
        let mut scene = scene();
        let ball = scene.add_object_at(ObjectKind::Ball, 100.0, 100.0).unwrap();

        scene.toggle_simulation();
        assert!(scene.is_simulating());
        for _ in 0..60 {
            scene.step();
        }
        let (_, y_during) = scene.position(ball).unwrap();
        assert!(y_during > 100.0, "ball should fall, y={y_during}");

        scene.toggle_simulation();
        assert!(!scene.is_simulating());
        let (x, y) = scene.position(ball).unwrap();
        assert!((x - 100.0).abs() < 1e-3);
        assert!((y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_fixed_mechanisms_freeze_during_simulation() {
        let mut scene = scene();
        let ramp = scene.add_object_at(ObjectKind::Ramp, 300.0, 300.0).unwrap();

        scene.toggle_simulation();
        for _ in 0..60 {
            scene.step();
        }
        let (_, y) = scene.position(ramp).unwrap();
        assert!((y - 300.0).abs() < 1e-3, "ramp must not fall, y={y}");

        scene.toggle_simulation();
        let body = scene.objects().get(ramp).unwrap().primary_body();
        assert!(
            !scene.world().get_rigid_body(body).unwrap().is_fixed(),
            "ramp is movable again in edit mode"
        );
    }

    #[test]
    fn test_win_returns_to_edit_keeping_poses() {
        let mut scene = scene();
        let target = scene.add_object_at(ObjectKind::Trampoline, 100.0, 400.0).unwrap();
        scene.select_object(Some(target));
        scene.toggle_target_on_selected();
        let ball = scene.add_object_at(ObjectKind::Ball, 100.0, 100.0).unwrap();

        scene.toggle_simulation();
        let mut steps = 0;
        while scene.is_simulating() && steps < 3000 {
            scene.step();
            steps += 1;
        }

        assert!(scene.win_pending(), "ball dropped onto the target must win");
        assert_eq!(scene.mode(), Mode::Edit);
        // The win path keeps the run's final poses.
        let (_, y) = scene.position(ball).unwrap();
        assert!(y > 150.0, "ball must stay where it landed, y={y}");

        scene.dismiss_win();
        assert!(!scene.win_pending());
    }

    #[test]
    fn test_rejected_scale_edit_records_no_history() {
        let mut scene = scene();
        scene.add_object_at(ObjectKind::Box, 100.0, 100.0);

        scene.set_selected_scale(0.0);
        scene.set_selected_scale(-2.0);

        // Nothing was recorded: one undo reaches the initial empty scene.
        scene.undo();
        assert_eq!(scene.item_count(), 0);
        assert!(!scene.can_undo());
    }

    #[test]
    fn test_pinned_box_hangs_in_place() {
        let mut scene = scene();
        let boxy = scene.add_object_at(ObjectKind::Box, 300.0, 100.0).unwrap();
        scene.add_object_at(ObjectKind::Pin, 310.0, 100.0);

        scene.toggle_simulation();
        for _ in 0..120 {
            scene.step();
        }
        let (_, y) = scene.position(boxy).unwrap();
        assert!(y < 150.0, "pinned box must not fall, y={y}");
    }

    #[test]
    fn test_drag_snaps_to_grid() {
        let mut scene = scene();
        let id = scene.add_object_at(ObjectKind::Box, 0.0, 0.0).unwrap();

        scene.drag_start(id);
        scene.drag_move(93.0, 138.0);
        scene.drag_end();

        let (x, y) = scene.position(id).unwrap();
        assert_eq!((x, y), (80.0, 120.0));
    }

    #[test]
    fn test_drag_without_snap_keeps_exact_drop_point() {
        let mut scene = scene();
        scene.set_snap_enabled(false);
        let id = scene.add_object_at(ObjectKind::Box, 0.0, 0.0).unwrap();

        scene.drag_start(id);
        scene.drag_move(93.0, 138.0);
        scene.drag_end();

        let (x, y) = scene.position(id).unwrap();
        assert_eq!((x, y), (93.0, 138.0));
    }

    #[test]
    fn test_dragged_object_passes_through_others() {
        let mut scene = scene();
        let id = scene.add_object_at(ObjectKind::Box, 0.0, 0.0).unwrap();
        let collider = scene.objects().get(id).unwrap().colliders[0];

        scene.drag_start(id);
        let groups = scene.world().collider_set.get(collider).unwrap().collision_groups();
        assert_eq!(groups, InteractionGroups::none());

        scene.drag_end();
        let groups = scene.world().collider_set.get(collider).unwrap().collision_groups();
        assert_eq!(groups, default_groups());
    }

    #[test]
    fn test_spinner_drag_release_reanchors_pivot() {
        let mut scene = scene();
        let id = scene.add_object_at(ObjectKind::Spinner, 80.0, 80.0).unwrap();

        scene.drag_start(id);
        {
            let pivot = scene.objects().get(id).unwrap().pivot.as_ref().unwrap();
            assert!(pivot.joint.is_none(), "pivot slackens during a drag");
        }
        scene.drag_move(201.0, 159.0);
        scene.drag_end();

        let obj = scene.objects().get(id).unwrap();
        let pivot = obj.pivot.as_ref().unwrap();
        assert!(pivot.joint.is_some());
        assert_eq!(pivot.anchor, Vector::new(200.0, 160.0));
        let body = scene.world().get_rigid_body(obj.primary_body()).unwrap();
        assert_eq!(body.linvel().length(), 0.0);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut scene = scene();
        scene.add_object_at(ObjectKind::Ball, 100.0, 100.0);
        let target = scene.add_object_at(ObjectKind::Box, 300.0, 200.0).unwrap();
        scene.select_object(Some(target));
        scene.toggle_target_on_selected();

        let json = scene.export_json().unwrap();

        let mut other = Scene::default();
        other.import_json(&json).unwrap();
        assert_eq!(other.item_count(), 2);
        assert!(other.objects().target().is_some());
        assert_eq!(other.export_json().unwrap(), json);
    }

    #[test]
    fn test_import_failure_changes_nothing() {
        let mut scene = scene();
        scene.add_object_at(ObjectKind::Ball, 100.0, 100.0);

        assert!(scene.import_json("not json at all").is_err());
        assert_eq!(scene.item_count(), 1);
    }

    #[test]
    fn test_clear_scene_keeps_boundaries() {
        let mut scene = scene();
        let boundary_colliders = scene.world().collider_set.len();
        scene.add_object_at(ObjectKind::Cup, 100.0, 100.0);
        scene.clear_scene();

        assert_eq!(scene.item_count(), 0);
        assert_eq!(scene.world().collider_set.len(), boundary_colliders);
    }

    #[test]
    fn test_time_scale_is_clamped() {
        let mut scene = scene();
        scene.set_time_scale(5.0);
        assert_eq!(scene.time_scale(), MAX_TIME_SCALE);
        scene.set_time_scale(0.0);
        assert_eq!(scene.time_scale(), MIN_TIME_SCALE);
    }

    #[test]
    fn test_edit_mode_holds_objects_still() {
        let mut scene = scene();
        let id = scene.add_object_at(ObjectKind::Ball, 100.0, 100.0).unwrap();
        for _ in 0..120 {
            scene.step();
        }
        let (x, y) = scene.position(id).unwrap();
        assert!((x - 100.0).abs() < 1e-3);
        assert!((y - 100.0).abs() < 1e-3);
    }
}
