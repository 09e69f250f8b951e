use super::{TexCoords, TexSpace, TexValue, Texture};

/// Checkerboard alternating between `even` and `odd` cells of size
/// `1 / scale`.
#[derive(Debug, Clone)]
pub struct Check<T> {
    pub space: TexSpace,
    pub scale: f32,
    pub even: T,
    pub odd: T,
}

impl<T> Check<T> {
    pub fn new(space: TexSpace, scale: f32, even: T, odd: T) -> Self {
        Self {
            space,
            scale,
            even,
            odd,
        }
    }
}

impl<T: TexValue> Texture<T> for Check<T> {
    fn eval(&self, coords: &TexCoords) -> T {
        let p = self.space.point(coords, self.scale).floor();
        let cell = p.x as i64 + p.y as i64 + p.z as i64;
        if cell.rem_euclid(2) == 0 {
            self.even
        } else {
            self.odd
        }
    }
}
