//! Natural cubic spline
//!
//! Interpolates a handful of designer knots with a C2-smooth piecewise cubic.
//! Both ends use the natural boundary condition (zero second derivative).

/// Cubic polynomial for one knot segment, expanded around its left knot:
/// `a + b*t + c*t^2 + d*t^3` with `t = x - x0`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    x0: f64,
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl Segment {
    fn eval(&self, x: f64) -> f64 {
        let t = x - self.x0;
        self.a + t * (self.b + t * (self.c + t * self.d))
    }
}

/// A fitted natural cubic spline
#[derive(Debug, Clone, PartialEq)]
pub struct NaturalSpline {
    segments: Vec<Segment>,
}

impl NaturalSpline {
    /// Fit a spline through `(xs[i], ys[i])`.
    ///
    /// Callers validate the knots: at least two points, strictly increasing
    /// `xs`, all values finite. Returns `None` if that does not hold.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() < 2 || xs.len() != ys.len() {
            return None;
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let n = xs.len() - 1;
        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let slopes: Vec<f64> = (0..n).map(|i| (ys[i + 1] - ys[i]) / h[i]).collect();

        // Second derivatives at the knots; both ends pinned to zero.
        let mut m = vec![0.0; n + 1];
        if n > 1 {
            let interior = n - 1;
            let mut c_prime = vec![0.0; interior];
            let mut d_prime = vec![0.0; interior];

            // Forward sweep of the Thomas algorithm over rows 1..n-1.
            for row in 0..interior {
                let i = row + 1;
                let lower = h[i - 1];
                let diag = 2.0 * (h[i - 1] + h[i]);
                let upper = h[i];
                let rhs = 6.0 * (slopes[i] - slopes[i - 1]);

                let (denom, carried) = if row == 0 {
                    (diag, 0.0)
                } else {
                    (diag - lower * c_prime[row - 1], lower * d_prime[row - 1])
                };
                c_prime[row] = upper / denom;
                d_prime[row] = (rhs - carried) / denom;
            }

            for row in (0..interior).rev() {
                let next = m[row + 2];
                m[row + 1] = d_prime[row] - c_prime[row] * next;
            }
        }

        let segments = (0..n)
            .map(|i| Segment {
                x0: xs[i],
                a: ys[i],
                b: slopes[i] - h[i] * (2.0 * m[i] + m[i + 1]) / 6.0,
                c: m[i] / 2.0,
                d: (m[i + 1] - m[i]) / (6.0 * h[i]),
            })
            .collect();

        Some(Self { segments })
    }

    /// Evaluate the spline. Outside the knot range the end segments are
    /// extended as-is.
    pub fn eval(&self, x: f64) -> f64 {
        let idx = self
            .segments
            .iter()
            .rposition(|s| x >= s.x0)
            .unwrap_or(0);
        self.segments[idx].eval(x)
    }

    /// Number of polynomial pieces
    #[cfg(test)]
    fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_passes_through_knots() {
        let xs = [1.0, 15.0, 60.0, 100.0];
        let ys = [0.2, 1.8, 18.0, 85.0];
        let spline = NaturalSpline::fit(&xs, &ys).unwrap();

        assert_eq!(spline.segment_count(), 3);
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert!((spline.eval(*x) - y).abs() < EPS, "miss at knot {}", x);
        }
    }

    #[test]
    fn test_two_knots_is_linear() {
        let spline = NaturalSpline::fit(&[0.0, 10.0], &[1.0, 21.0]).unwrap();
        assert!((spline.eval(5.0) - 11.0).abs() < EPS);
        // Extrapolates along the same line
        assert!((spline.eval(20.0) - 41.0).abs() < EPS);
    }

    #[test]
    fn test_reproduces_straight_line_with_many_knots() {
        // A natural spline through collinear points is the line itself.
        let xs = [0.0, 2.0, 3.0, 7.0, 10.0];
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x - 4.0).collect();
        let spline = NaturalSpline::fit(&xs, &ys).unwrap();

        for x in [0.5, 2.5, 4.0, 9.9] {
            assert!((spline.eval(x) - (3.0 * x - 4.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_natural_ends_have_zero_curvature() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 1.0, 0.0];
        let spline = NaturalSpline::fit(&xs, &ys).unwrap();

        // Symmetric hump: the middle second derivative is -3, ends are 0.
        // S(0.5) = 0.5*b + 0.25*c + 0.125*d with b = 1.5, c = 0, d = -0.5
        assert!((spline.eval(0.5) - 0.6875).abs() < EPS);
        assert!((spline.eval(1.5) - 0.6875).abs() < EPS);
    }

    #[test]
    fn test_rejects_bad_knots() {
        assert!(NaturalSpline::fit(&[1.0], &[1.0]).is_none());
        assert!(NaturalSpline::fit(&[1.0, 1.0], &[1.0, 2.0]).is_none());
        assert!(NaturalSpline::fit(&[2.0, 1.0], &[1.0, 2.0]).is_none());
        assert!(NaturalSpline::fit(&[1.0, 2.0], &[1.0]).is_none());
    }
}
