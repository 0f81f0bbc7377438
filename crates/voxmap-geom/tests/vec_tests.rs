use std::collections::HashSet;

use voxmap_geom::{IVec3, Vec3};

fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

#[test]
fn ivec3_equality_and_hash() {
    let mut set = HashSet::new();
    set.insert(IVec3::new(1, 2, 3));
    set.insert(IVec3::new(1, 2, 3));
    set.insert(IVec3::new(3, 2, 1));
    assert_eq!(set.len(), 2);
    assert!(set.contains(&IVec3::new(3, 2, 1)));
}

#[test]
fn ivec3_translate_and_display() {
    let v = IVec3::ZERO.translate(4, -1, 2);
    assert_eq!(v, IVec3::new(4, -1, 2));
    assert_eq!(v.to_string(), "[4,-1,2]");
    assert_eq!(-v, IVec3::new(-4, 1, -2));
}

#[test]
fn ivec3_from_rounded_rounds_half_away_from_zero() {
    assert_eq!(IVec3::from_rounded(Vec3::new(0.5, 1.49, -0.5)), IVec3::new(1, 1, -1));
    assert_eq!(IVec3::from_rounded(Vec3::new(2.51, -2.49, 0.0)), IVec3::new(3, -2, 0));
}

#[test]
fn ivec3_length_squared_is_widened() {
    let v = IVec3::new(i32::MAX, 0, 0);
    assert_eq!(v.length_squared(), (i32::MAX as i64) * (i32::MAX as i64));
}

#[test]
fn vec3_distance_and_cross() {
    let a = Vec3::new(1.0, 2.0, 2.0);
    assert!(approx_eq(a.distance(Vec3::ZERO), 3.0, 1e-6));
    let i = Vec3::new(1.0, 0.0, 0.0);
    let j = Vec3::new(0.0, 1.0, 0.0);
    assert_eq!(i.cross(j), Vec3::new(0.0, 0.0, 1.0));
    assert_eq!((a * 2.0) / 2.0, a);
}
