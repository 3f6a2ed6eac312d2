//! Small fixed-size vector helpers shared by the lattice kernels.

use aerograd_core::Scalar;

pub(crate) type Vec3<S> = [S; 3];

pub(crate) fn constant<S: Scalar>(v: [f64; 3]) -> Vec3<S> {
    v.map(S::constant)
}

pub(crate) fn zero<S: Scalar>() -> Vec3<S> {
    [S::zero(); 3]
}

pub(crate) fn add<S: Scalar>(a: Vec3<S>, b: Vec3<S>) -> Vec3<S> {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub(crate) fn sub<S: Scalar>(a: Vec3<S>, b: Vec3<S>) -> Vec3<S> {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn scale<S: Scalar>(a: Vec3<S>, s: S) -> Vec3<S> {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub(crate) fn dot<S: Scalar>(a: Vec3<S>, b: Vec3<S>) -> S {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn cross<S: Scalar>(a: Vec3<S>, b: Vec3<S>) -> Vec3<S> {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn norm<S: Scalar>(a: Vec3<S>) -> S {
    dot(a, a).sqrt()
}

/// Point at fraction `t` along `a → b`.
pub(crate) fn lerp<S: Scalar>(a: Vec3<S>, b: Vec3<S>, t: f64) -> Vec3<S> {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Reflection through the XZ plane.
pub(crate) fn mirror<S: Scalar>(a: Vec3<S>) -> Vec3<S> {
    [a[0], -a[1], a[2]]
}
