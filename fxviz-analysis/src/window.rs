//! Tapering windows applied before the transform

use std::f64::consts::PI;

/// 4-term Blackman-Harris coefficients
const BH_A0: f64 = 0.35875;
const BH_A1: f64 = 0.48829;
const BH_A2: f64 = 0.14128;
const BH_A3: f64 = 0.01168;

/// Generates a symmetric 4-term Blackman-Harris window of `size` points.
///
/// `w[i] = a0 - a1 cos(2πi/(N-1)) + a2 cos(4πi/(N-1)) - a3 cos(6πi/(N-1))`.
/// Coefficients are evaluated in f64 and stored as f32.
pub fn blackman_harris(size: usize) -> Vec<f32> {
    match size {
        0 => return Vec::new(),
        1 => return vec![1.0],
        _ => {}
    }
    let denom = (size - 1) as f64;
    (0..size)
        .map(|i| {
            let x = i as f64 / denom;
            let w = BH_A0 - BH_A1 * (2.0 * PI * x).cos() + BH_A2 * (4.0 * PI * x).cos()
                - BH_A3 * (6.0 * PI * x).cos();
            w as f32
        })
        .collect()
}
