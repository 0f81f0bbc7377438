//! Analytic solids used as point-containment tests for generation.
use voxmap_geom::Vec3;

pub trait Solid: Send + Sync {
    fn contains(&self, p: Vec3) -> bool;
    /// Axis-aligned bounds `(min, max)`.
    fn bounds(&self) -> (Vec3, Vec3);
}

#[derive(Clone, Copy, Debug)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Solid for Sphere {
    fn contains(&self, p: Vec3) -> bool {
        let d = p - self.center;
        d.dot(d) <= self.radius * self.radius
    }

    fn bounds(&self) -> (Vec3, Vec3) {
        let r = Vec3::splat(self.radius);
        (self.center - r, self.center + r)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Solid for Aabb {
    fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.y >= self.min.y
            && p.z >= self.min.z
            && p.x <= self.max.x
            && p.y <= self.max.y
            && p.z <= self.max.z
    }

    fn bounds(&self) -> (Vec3, Vec3) {
        (self.min, self.max)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Ellipsoid {
    pub center: Vec3,
    pub radii: Vec3,
}

impl Solid for Ellipsoid {
    fn contains(&self, p: Vec3) -> bool {
        let d = p - self.center;
        let (rx, ry, rz) = (self.radii.x, self.radii.y, self.radii.z);
        if rx <= 0.0 || ry <= 0.0 || rz <= 0.0 {
            return false;
        }
        (d.x / rx).powi(2) + (d.y / ry).powi(2) + (d.z / rz).powi(2) <= 1.0
    }

    fn bounds(&self) -> (Vec3, Vec3) {
        (self.center - self.radii, self.center + self.radii)
    }
}
