//! Atlas sub-regions for sprite-sheet rendering.

use glam::Vec2;

use crate::backend::BatchTexture;

/// A rectangular region of a texture atlas, with the four UV corners
/// precomputed in quad winding order (bottom-left, bottom-right, top-right,
/// top-left).
#[derive(Debug, Clone)]
pub struct SubTexture<T: BatchTexture> {
    texture: T,
    tex_coords: [Vec2; 4],
}

impl<T: BatchTexture> SubTexture<T> {
    /// Build a sub-texture from explicit normalized bounds.
    pub fn from_bounds(texture: T, min: Vec2, max: Vec2) -> Self {
        Self {
            texture,
            tex_coords: [
                Vec2::new(min.x, min.y),
                Vec2::new(max.x, min.y),
                Vec2::new(max.x, max.y),
                Vec2::new(min.x, max.y),
            ],
        }
    }

    /// Build a sub-texture from a grid cell.
    ///
    /// `cell` is the column/row index, `cell_size` the cell dimensions in
    /// pixels, and `sprite_size` how many cells the sprite spans (usually
    /// `(1, 1)`).
    pub fn from_coords(texture: T, cell: Vec2, cell_size: Vec2, sprite_size: Vec2) -> Self {
        let atlas = Vec2::new(texture.width() as f32, texture.height() as f32);
        let min = (cell * cell_size) / atlas;
        let max = ((cell + sprite_size) * cell_size) / atlas;
        Self::from_bounds(texture, min, max)
    }

    pub fn texture(&self) -> &T {
        &self.texture
    }

    pub fn tex_coords(&self) -> [Vec2; 4] {
        self.tex_coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct TestTexture {
        width: u32,
        height: u32,
    }

    impl BatchTexture for TestTexture {
        fn id(&self) -> u64 {
            1
        }
        fn width(&self) -> u32 {
            self.width
        }
        fn height(&self) -> u32 {
            self.height
        }
    }

    #[test]
    fn cell_coords_map_to_normalized_uvs() {
        let atlas = TestTexture {
            width: 128,
            height: 64,
        };
        let sub = SubTexture::from_coords(
            atlas,
            Vec2::new(2.0, 1.0),
            Vec2::new(32.0, 32.0),
            Vec2::new(1.0, 1.0),
        );
        let uv = sub.tex_coords();
        assert_eq!(uv[0], Vec2::new(0.5, 0.5)); // bottom-left
        assert_eq!(uv[1], Vec2::new(0.75, 0.5)); // bottom-right
        assert_eq!(uv[2], Vec2::new(0.75, 1.0)); // top-right
        assert_eq!(uv[3], Vec2::new(0.5, 1.0)); // top-left
    }
}
