use voxmap_geom::{IVec3, Vec3};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Face {
    Top = 0,
    Bottom = 1,
    Left = 2,
    Right = 3,
    Front = 4,
    Back = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Top,
        Face::Bottom,
        Face::Left,
        Face::Right,
        Face::Front,
        Face::Back,
    ];

    /// Returns the `[0..6)` index of this face.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converts a face index `[0..6)` back into a `Face`.
    #[inline]
    pub fn from_index(i: usize) -> Option<Face> {
        Self::ALL.get(i).copied()
    }

    /// Integer step from a voxel to the neighbour behind this face.
    #[inline]
    pub fn delta(self) -> IVec3 {
        match self {
            Face::Top => IVec3::new(0, 1, 0),
            Face::Bottom => IVec3::new(0, -1, 0),
            Face::Left => IVec3::new(-1, 0, 0),
            Face::Right => IVec3::new(1, 0, 0),
            Face::Front => IVec3::new(0, 0, 1),
            Face::Back => IVec3::new(0, 0, -1),
        }
    }

    #[inline]
    pub fn normal(self) -> Vec3 {
        self.delta().to_vec3()
    }

    #[inline]
    pub fn opposite(self) -> Face {
        match self {
            Face::Top => Face::Bottom,
            Face::Bottom => Face::Top,
            Face::Left => Face::Right,
            Face::Right => Face::Left,
            Face::Front => Face::Back,
            Face::Back => Face::Front,
        }
    }

    /// Atlas cell `(column, row)` this face samples from.
    #[inline]
    pub(crate) fn atlas_cell(self) -> (f32, f32) {
        match self {
            Face::Top => (1.0, 1.0),
            Face::Bottom => (0.0, 0.0),
            Face::Left => (1.0, 0.0),
            Face::Right => (2.0, 0.0),
            Face::Front => (0.0, 1.0),
            Face::Back => (0.0, 2.0),
        }
    }

    /// Debug tint so faces can be told apart without a material.
    #[inline]
    pub fn debug_color(self) -> [u8; 3] {
        match self {
            Face::Top => [255, 0, 0],
            Face::Bottom => [255, 0, 255],
            Face::Left => [0, 255, 0],
            Face::Right => [255, 255, 0],
            Face::Front => [0, 0, 255],
            Face::Back => [0, 255, 255],
        }
    }

    /// Quad corners `a,b,c,d`, counter-clockwise seen from outside, for a cube of
    /// half-extent `h` centred at `c`.
    pub fn corners(self, c: Vec3, h: f32) -> [Vec3; 4] {
        let (x0, x1) = (c.x - h, c.x + h);
        let (y0, y1) = (c.y - h, c.y + h);
        let (z0, z1) = (c.z - h, c.z + h);
        let v = Vec3::new;
        match self {
            Face::Top => [v(x0, y1, z0), v(x0, y1, z1), v(x1, y1, z1), v(x1, y1, z0)],
            Face::Bottom => [v(x0, y0, z0), v(x1, y0, z0), v(x1, y0, z1), v(x0, y0, z1)],
            Face::Right => [v(x1, y0, z0), v(x1, y1, z0), v(x1, y1, z1), v(x1, y0, z1)],
            Face::Left => [v(x0, y0, z0), v(x0, y0, z1), v(x0, y1, z1), v(x0, y1, z0)],
            Face::Front => [v(x0, y0, z1), v(x1, y0, z1), v(x1, y1, z1), v(x0, y1, z1)],
            Face::Back => [v(x0, y0, z0), v(x0, y1, z0), v(x1, y1, z0), v(x1, y0, z0)],
        }
    }
}

/// One exposed side of one voxel. Identity is `(pos, face)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct VoxelFace {
    pub pos: IVec3,
    pub face: Face,
}

impl VoxelFace {
    #[inline]
    pub const fn new(pos: IVec3, face: Face) -> Self {
        Self { pos, face }
    }

    /// The cell this face looks into.
    #[inline]
    pub fn neighbor(self) -> IVec3 {
        self.pos + self.face.delta()
    }

    /// The same boundary seen from the neighbouring cell.
    #[inline]
    pub fn mirrored(self) -> Self {
        Self::new(self.neighbor(), self.face.opposite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_wind_toward_normal() {
        for f in Face::ALL {
            let [a, b, c, d] = f.corners(Vec3::ZERO, 0.5);
            let n = f.normal();
            assert!((b - a).cross(c - a).dot(n) > 0.0, "{f:?} first triangle");
            assert!((c - a).cross(d - a).dot(n) > 0.0, "{f:?} second triangle");
            for p in [a, b, c, d] {
                assert!((p.dot(n) - 0.5).abs() < 1e-6, "{f:?} corner off plane");
            }
        }
    }

    #[test]
    fn opposite_is_involution_and_negates_delta() {
        for f in Face::ALL {
            assert_eq!(f.opposite().opposite(), f);
            assert_eq!(f.opposite().delta(), -f.delta());
            assert_eq!(Face::from_index(f.index()), Some(f));
        }
        assert_eq!(Face::from_index(6), None);
    }

    #[test]
    fn mirrored_face_points_back() {
        let vf = VoxelFace::new(IVec3::new(2, 3, 4), Face::Right);
        let m = vf.mirrored();
        assert_eq!(m, VoxelFace::new(IVec3::new(3, 3, 4), Face::Left));
        assert_eq!(m.mirrored(), vf);
    }
}
