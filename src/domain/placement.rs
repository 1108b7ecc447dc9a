use nalgebra::{Point3, Vector3};

/// The transform applied to the rendered object for one frame.
///
/// Always produced by the placement resolver and replaced wholesale, never mutated in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Position relative to the viewer's local origin, in scene units.
    pub local_position: Vector3<f64>,
    /// The point the object is turned towards.
    pub facing_target: Point3<f64>,
    pub scale: f64,
}
