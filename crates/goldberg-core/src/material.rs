//! Material palette shared by every placeable object.
//!
//! A material bundles the surface parameters applied to every physical
//! sub-part of an object plus its display color. Targets always render in
//! [`TARGET_COLOR`] regardless of material.

use serde::{Deserialize, Serialize};

/// RGBA color representation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }
}

/// Highlight color applied to the current target, overriding its material.
pub const TARGET_COLOR: Color = Color::rgb(245, 158, 11);

/// Physical surface parameters of a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialProps {
    pub friction: f32,
    pub restitution: f32,
    pub density: f32,
}

/// The fixed material palette.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    #[default]
    Wood,
    Metal,
    Rubber,
    Ice,
    SuperBall,
    Plastic,
    Glass,
}

impl Material {
    /// All palette entries, in presentation order.
    pub const ALL: [Material; 7] = [
        Self::Wood,
        Self::Metal,
        Self::Rubber,
        Self::Ice,
        Self::SuperBall,
        Self::Plastic,
        Self::Glass,
    ];

    /// Surface parameters for this material.
    pub fn properties(self) -> MaterialProps {
        match self {
            Self::Wood => MaterialProps {
                friction: 0.1,
                restitution: 0.6,
                density: 1.0,
            },
            Self::Metal => MaterialProps {
                friction: 0.05,
                restitution: 0.2,
                density: 5.0,
            },
            Self::Rubber => MaterialProps {
                friction: 0.9,
                restitution: 0.9,
                density: 1.0,
            },
            Self::Ice => MaterialProps {
                friction: 0.0,
                restitution: 0.1,
                density: 0.9,
            },
            Self::SuperBall => MaterialProps {
                friction: 0.0,
                restitution: 1.2,
                density: 40.0,
            },
            Self::Plastic => MaterialProps {
                friction: 0.05,
                restitution: 0.4,
                density: 0.5,
            },
            Self::Glass => MaterialProps {
                friction: 0.02,
                restitution: 0.1,
                density: 2.0,
            },
        }
    }

    /// Display color of this material.
    pub fn color(self) -> Color {
        match self {
            Self::Wood => Color::rgb(217, 119, 6),
            Self::Metal => Color::rgb(100, 116, 139),
            Self::Rubber => Color::rgb(16, 185, 129),
            Self::Ice => Color::rgb(186, 230, 253),
            Self::SuperBall => Color::rgb(219, 39, 119),
            Self::Plastic => Color::rgb(239, 68, 68),
            Self::Glass => Color::rgb(165, 243, 252),
        }
    }
}
