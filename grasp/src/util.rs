use glam::{Quat, Vec3};
use rapier3d::na::{self, Isometry3, Vector3};

#[inline]
/// Convert a [`glam::Vec3`] into a [`rapier3d::na::Vector3`]
pub fn na_vector_from_glam(v: Vec3) -> Vector3<f32> {
    [v.x, v.y, v.z].into()
}

#[inline]
/// Convert a [`rapier3d::na::Vector3`] into a [`glam::Vec3`]
pub fn glam_vec_from_na(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
/// Convert a translation and rotation into a [`rapier3d::na::Isometry3`]
pub fn isometry_from_parts(translation: Vec3, rotation: Quat) -> Isometry3<f32> {
    let translation = na::Translation3::new(translation.x, translation.y, translation.z);
    let rotation = na::UnitQuaternion::from_quaternion(na::Quaternion::new(
        rotation.w, rotation.x, rotation.y, rotation.z,
    ));

    Isometry3::from_parts(translation, rotation)
}

#[inline]
/// Decompose a [`rapier3d::na::Isometry3`] into its rotation and translation components
pub fn decompose_isometry(i: &Isometry3<f32>) -> (Quat, Vec3) {
    let q = i.rotation.quaternion();
    (
        Quat::from_xyzw(q.i, q.j, q.k, q.w),
        glam_vec_from_na(&i.translation.vector),
    )
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_isometry_round_trip() {
        let rotation = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.3);
        let translation = Vec3::new(1.0, -2.0, 0.5);
        let isometry = isometry_from_parts(translation, rotation);
        let (r, t) = decompose_isometry(&isometry);

        assert_relative_eq!(t, translation);
        assert!(r.dot(rotation).abs() > 0.9999);
        assert_relative_eq!(
            glam_vec_from_na(&(isometry * na::Point3::new(0., 0., 1.)).coords),
            translation + rotation * Vec3::Z,
            epsilon = 1e-5
        );
    }
}
