//! Cumulative trapezoidal integration of sampled curves.
//!
//! For samples `(x_n, y_n)` the running integral at index `k` is
//!
//! ```text
//! I_k = Σ_{n<k} ½ (y_{n+1} + y_n) (x_{n+1} - x_n)
//! ```
//!
//! so `I_0 = 0` and `I_{N-1}` is the integral over the whole series. The
//! segment `(N-1, N)` does not exist, so nothing is added at the last index.

/// Area of the trapezoid spanned by two consecutive samples.
fn segment(x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    0.5 * (y1 + y0) * (x1 - x0)
}

/// Integral of the samples between indices `lo` (inclusive) and `hi` (exclusive upper bound).
///
/// Only segments `(n, n+1)` with `lo <= n < hi` contribute.
pub fn integral(x: &[f64], y: &[f64], lo: usize, hi: usize) -> f64 {
    let n = x.len().min(y.len());
    let hi = hi.min(n.saturating_sub(1));
    let mut sum = 0.0;
    for i in lo..hi {
        sum += segment(x[i], y[i], x[i + 1], y[i + 1]);
    }
    sum
}

/// Running integral truncated at every sample index.
///
/// Output has the same length as the input; element `k` equals `integral(x, y, 0, k)`.
pub fn cumulative_trapezoid(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len().min(y.len());
    let mut out = Vec::with_capacity(n);
    let mut sum = 0.0;
    for k in 0..n {
        if k > 0 {
            sum += segment(x[k - 1], y[k - 1], x[k], y[k]);
        }
        out.push(sum);
    }
    out
}

/// Divide `num` by `den`, returning `default` when `den` is exactly zero.
pub fn safe_divide(num: f64, den: f64, default: f64) -> f64 {
    if den == 0.0 { default } else { num / den }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_curve_accumulates_linearly() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [4.0, 4.0, 4.0, 4.0];
        assert_eq!(cumulative_trapezoid(&x, &y), vec![0.0, 4.0, 8.0, 12.0]);
    }

    #[test]
    fn running_value_matches_truncated_integral() {
        let x = [0.0, 0.5, 1.5, 2.0, 4.0];
        let y = [1.0, 3.0, -2.0, 5.0, 0.25];
        let running = cumulative_trapezoid(&x, &y);
        for (k, value) in running.iter().enumerate() {
            let expected = integral(&x, &y, 0, k);
            assert!((value - expected).abs() < 1e-12, "k={k}: {value} vs {expected}");
        }
        assert_eq!(running[0], 0.0);
    }

    #[test]
    fn integral_ignores_bounds_past_the_end() {
        let x = [0.0, 1.0, 2.0];
        let y = [2.0, 2.0, 2.0];
        assert_eq!(integral(&x, &y, 0, 10), 4.0);
        assert_eq!(integral(&x, &y, 1, 2), 2.0);
        assert_eq!(integral(&x, &y, 2, 1), 0.0);
    }

    #[test]
    fn empty_and_single_sample_inputs() {
        assert!(cumulative_trapezoid(&[], &[]).is_empty());
        assert_eq!(cumulative_trapezoid(&[3.0], &[7.0]), vec![0.0]);
    }

    #[test]
    fn safe_divide_returns_default_on_zero() {
        assert_eq!(safe_divide(3.0, 0.0, 0.0), 0.0);
        assert_eq!(safe_divide(3.0, 0.0, -1.0), -1.0);
        assert_eq!(safe_divide(3.0, 2.0, 0.0), 1.5);
    }
}
