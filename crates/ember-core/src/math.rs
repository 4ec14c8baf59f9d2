/// SIMD-accelerated math types from the [`glam`] crate.
///
/// Re-exported wholesale so downstream crates spell positions, colors, and
/// transforms the same way: [`Vec2`], [`Vec3`], [`Vec4`], [`Mat4`], [`Quat`].
///
/// [`glam`]: https://docs.rs/glam
pub mod fast {
    pub use glam::*;
}

pub use fast::*;
