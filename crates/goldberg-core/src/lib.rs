//! Goldberg Lab Core Library
//!
//! Scene and mechanism control for a contraption construction kit using
//! `Rapier2D`: an editable entity model, Edit/Simulate mode transitions with
//! exact pose restoration, per-step mechanism behaviors, bounded snapshot
//! history, and ball-hits-target win detection.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod history;
pub mod material;
pub mod mechanism;
pub mod object;
pub mod physics;
pub mod scene;
pub mod win;

pub use history::{History, ImportError, MAX_HISTORY, ObjectDescriptor, SceneSnapshot};
pub use material::{Color, Material, MaterialProps, TARGET_COLOR};
pub use mechanism::{FAN_RANGE, PinBinding, SEESAW_MAX_ANGLE};
pub use object::{
    CHAIN_LINKS, EditState, ObjectId, ObjectKind, ObjectSet, PivotBinding, PlacedObject, Role,
    SpawnParams,
};
pub use physics::{PHYSICS_DT, PhysicsWorld, active_gravity, inert_gravity};
pub use scene::{ArenaConfig, GRID_SIZE, Mode, PASTE_OFFSET, Scene};
pub use win::WinDetector;
