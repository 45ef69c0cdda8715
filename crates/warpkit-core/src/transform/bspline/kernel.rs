//! Cubic B-spline kernel.
//!
//! For a continuous index `x` the four contributing nodes are
//! `floor(x) - 1 ..= floor(x) + 2` and `u = x - floor(x)`.

/// Number of nodes supporting a point along one axis.
pub const SUPPORT: usize = 4;

/// Relative distance below which a continuous index is taken to sit on a node.
pub const INDEX_TOLERANCE: f64 = 1e-9;

/// First supporting node and fractional offset of a continuous index.
///
/// An index within [`INDEX_TOLERANCE`] of an integer is snapped onto it, so a
/// point placed on a node by floating-point arithmetic keeps that node's
/// support instead of falling one node short.
pub fn support_start(x: f64) -> (i64, f64) {
    let nearest = x.round();
    let x = if (x - nearest).abs() <= INDEX_TOLERANCE * nearest.abs().max(1.0) {
        nearest
    } else {
        x
    };
    let floor = x.floor();
    (floor as i64 - 1, x - floor)
}

/// Cubic B-Spline basis weights for `u` in [0, 1).
pub fn weights(u: f64) -> [f64; SUPPORT] {
    let u2 = u * u;
    let u3 = u2 * u;
    let one_minus_u = 1.0 - u;
    [
        // B0 = (1-u)^3 / 6
        one_minus_u * one_minus_u * one_minus_u / 6.0,
        // B1 = (3u^3 - 6u^2 + 4) / 6
        (3.0 * u3 - 6.0 * u2 + 4.0) / 6.0,
        // B2 = (-3u^3 + 3u^2 + 3u + 1) / 6
        (-3.0 * u3 + 3.0 * u2 + 3.0 * u + 1.0) / 6.0,
        // B3 = u^3 / 6
        u3 / 6.0,
    ]
}

/// Derivatives of [`weights`] with respect to `u`.
pub fn derivatives(u: f64) -> [f64; SUPPORT] {
    let u2 = u * u;
    let one_minus_u = 1.0 - u;
    [
        -0.5 * one_minus_u * one_minus_u,
        1.5 * u2 - 2.0 * u,
        -1.5 * u2 + u + 0.5,
        0.5 * u2,
    ]
}

/// Reflect an out-of-range index back into `0..len` (whole-sample symmetry).
pub fn mirror_index(index: i64, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as i64 - 1);
    let mut i = index.rem_euclid(period);
    if i >= len as i64 {
        i = period - i;
    }
    i as usize
}
