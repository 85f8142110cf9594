//! World-transform math for pose smoothing
//!
//! A thin wrapper over glam's `Vec3`/`Quat` carrying the
//! position/rotation/scale triple reported by a pose source. Interpolation
//! lives here so the smoother itself stays a small state machine.

use glam::{Quat, Vec3};

/// A decomposed world transform (position, rotation, scale)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (origin, no rotation, unit scale)
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Construct from components
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Blend this transform toward `target` by constant factor `alpha`
    ///
    /// Linear interpolation for position and scale, spherical for rotation.
    /// `alpha` = 0 keeps self, 1 lands on the target exactly.
    pub fn blend_toward(&self, target: &Transform, alpha: f32) -> Transform {
        Transform {
            position: self.position.lerp(target.position, alpha),
            rotation: self.rotation.slerp(target.rotation, alpha).normalize(),
            scale: self.scale.lerp(target.scale, alpha),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
