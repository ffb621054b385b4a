//! Snapshot history, clipboard descriptors, and the persisted scene format.
//!
//! One [`ObjectDescriptor`] per placed object is the only serialized shape the
//! crate knows: undo entries, the clipboard, and import/export all reuse it.
//! Chain links and boundary geometry never appear individually.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::object::{ObjectKind, PlacedObject, Role, SpawnParams};
use crate::material::Material;
use crate::physics::PhysicsWorld;

/// Maximum number of retained history entries. Recording past the cap drops
/// the oldest entry.
pub const MAX_HISTORY: usize = 20;

/// Canonical serialized form of one placed object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectDescriptor {
    pub kind: ObjectKind,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub scale: f32,
    pub material: Material,
    pub is_target: bool,
    pub original_role: Role,
}

impl ObjectDescriptor {
    /// Captures an object's current placement from the world.
    pub fn capture(obj: &PlacedObject, world: &PhysicsWorld) -> Self {
        let (x, y, angle) = world
            .get_rigid_body(obj.primary_body())
            .map_or((0.0, 0.0, 0.0), |body| {
                let pos = body.translation();
                (pos.x, pos.y, body.rotation().angle())
            });
        Self {
            kind: obj.kind,
            x,
            y,
            angle,
            scale: obj.scale,
            material: obj.material,
            is_target: obj.is_target(),
            original_role: obj.original_role,
        }
    }

    /// Spawn parameters reproducing this descriptor.
    pub fn spawn_params(&self) -> SpawnParams {
        SpawnParams {
            x: self.x,
            y: self.y,
            angle: self.angle,
            scale: self.scale,
            material: Some(self.material),
            target: self.is_target,
            original_role: self.original_role,
        }
    }

    /// The same placement shifted by an offset, for pasting.
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self.clone()
        }
    }
}

/// An immutable full-scene snapshot: one descriptor per object, in placement
/// order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct SceneSnapshot(pub Vec<ObjectDescriptor>);

impl SceneSnapshot {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Failure loading an exported scene. Nothing is applied on failure.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("scene data does not parse: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Bounded undo/redo stack of scene snapshots.
///
/// Recording truncates the redo tail first, so history is always a straight
/// line ending at the current entry.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<SceneSnapshot>,
    index: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a snapshot as the new current entry.
    pub fn record(&mut self, snapshot: SceneSnapshot) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push(snapshot);
        if self.entries.len() > MAX_HISTORY {
            self.entries.remove(0);
        }
        self.index = self.entries.len() - 1;
    }

    /// Steps back one entry, returning the snapshot to restore.
    pub fn undo(&mut self) -> Option<&SceneSnapshot> {
        if self.entries.is_empty() || self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(&self.entries[self.index])
    }

    /// Steps forward one entry, returning the snapshot to restore.
    pub fn redo(&mut self) -> Option<&SceneSnapshot> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(&self.entries[self.index])
    }

    pub fn current(&self) -> Option<&SceneSnapshot> {
        self.entries.get(self.index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn snap(n: usize) -> SceneSnapshot {
        let descriptor = ObjectDescriptor {
            kind: ObjectKind::Box,
            x: n as f32,
            y: 0.0,
            angle: 0.0,
            scale: 1.0,
            material: Material::Wood,
            is_target: false,
            original_role: Role::Normal,
        };
        SceneSnapshot(vec![descriptor; n])
    }

    #[test]
    fn test_undo_redo_walk() {
        let mut history = History::new();
        history.record(snap(0));
        history.record(snap(1));
        history.record(snap(2));

        assert_eq!(history.undo().unwrap().len(), 1);
        assert_eq!(history.undo().unwrap().len(), 0);
        assert!(history.undo().is_none());
        assert_eq!(history.redo().unwrap().len(), 1);
        assert_eq!(history.redo().unwrap().len(), 2);
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_record_truncates_redo_tail() {
        let mut history = History::new();
        history.record(snap(0));
        history.record(snap(1));
        history.record(snap(2));
        history.undo();
        history.undo();

        history.record(snap(5));
        assert!(history.redo().is_none());
        assert_eq!(history.current().unwrap().len(), 5);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut history = History::new();
        for n in 0..MAX_HISTORY + 5 {
            history.record(snap(n));
        }
        assert_eq!(history.len(), MAX_HISTORY);
        // Walk all the way back: the oldest surviving entry is n = 5.
        while history.can_undo() {
            history.undo();
        }
        assert_eq!(history.current().unwrap().len(), 5);
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let snapshot = SceneSnapshot(vec![
            ObjectDescriptor {
                kind: ObjectKind::Ball,
                x: 123.5,
                y: -40.25,
                angle: 0.7853982,
                scale: 1.5,
                material: Material::SuperBall,
                is_target: false,
                original_role: Role::Normal,
            },
            ObjectDescriptor {
                kind: ObjectKind::Cup,
                x: 0.0,
                y: 0.0,
                angle: 0.0,
                scale: 1.0,
                material: Material::Plastic,
                is_target: true,
                original_role: Role::Normal,
            },
        ]);

        let json = snapshot.to_json().unwrap();
        let back = SceneSnapshot::from_json(&json).unwrap();
        assert_eq!(snapshot, back);
    }

    #[test]
    fn test_import_rejects_unknown_kind() {
        let json = r#"[{"kind":"teleporter","x":0,"y":0,"angle":0,"scale":1,"material":"wood","is_target":false,"original_role":"normal"}]"#;
        assert!(SceneSnapshot::from_json(json).is_err());
    }

    #[test]
    fn test_descriptor_offset() {
        let descriptor = ObjectDescriptor {
            kind: ObjectKind::Domino,
            x: 10.0,
            y: 20.0,
            angle: 0.0,
            scale: 1.0,
            material: Material::Wood,
            is_target: false,
            original_role: Role::Normal,
        };
        let shifted = descriptor.offset(20.0, 20.0);
        assert_eq!(shifted.x, 30.0);
        assert_eq!(shifted.y, 40.0);
        assert_eq!(shifted.kind, descriptor.kind);
    }
}
