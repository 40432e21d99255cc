//! Bracketed scalar root finding.

use thiserror::Error;

/// Convergence settings for [`brent`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootOptions {
    /// Absolute tolerance on the root location.
    pub xtol: f64,
    /// Relative tolerance on the root location.
    pub rtol: f64,
    pub max_iterations: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            xtol: 2e-12,
            rtol: 4.0 * f64::EPSILON,
            max_iterations: 100,
        }
    }
}

/// A located root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    /// Objective value at `x`
    pub residual: f64,
    /// Number of objective evaluations
    pub evaluations: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RootError<E> {
    #[error("f({a}) = {fa} and f({b}) = {fb} have the same sign")]
    NoSignChange { a: f64, b: f64, fa: f64, fb: f64 },
    #[error("no convergence after {0} iterations")]
    MaxIterations(usize),
    #[error("objective failed: {0}")]
    Objective(E),
}

/// Find a root of `f` in `[a, b]` with Brent's method.
///
/// Combines bisection, secant and inverse quadratic interpolation steps and
/// always keeps a sign change bracketed, so convergence is guaranteed once
/// `f(a)` and `f(b)` differ in sign. The objective may fail, in which case
/// the error is passed through as [`RootError::Objective`].
///
/// # Example
/// ```
/// use climviz_core::utils::root_finding::{brent, RootOptions};
///
/// let root = brent(
///     |x: f64| Ok::<_, ()>(x * x - 2.0),
///     0.0,
///     2.0,
///     &RootOptions::default(),
/// )
/// .unwrap();
/// assert!((root.x - 2.0_f64.sqrt()).abs() < 1e-10);
/// ```
pub fn brent<F, E>(
    mut f: F,
    a: f64,
    b: f64,
    options: &RootOptions,
) -> Result<Root, RootError<E>>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let fa = f(a).map_err(RootError::Objective)?;
    let fb = f(b).map_err(RootError::Objective)?;
    let root = brent_bracketed(f, (a, fa), (b, fb), options)?;
    Ok(Root {
        evaluations: root.evaluations + 2,
        ..root
    })
}

/// [`brent`] for a bracket whose objective values are already known.
///
/// `lower` and `upper` are `(x, f(x))` pairs. Only new points are evaluated
/// and counted in [`Root::evaluations`].
pub fn brent_bracketed<F, E>(
    mut f: F,
    lower: (f64, f64),
    upper: (f64, f64),
    options: &RootOptions,
) -> Result<Root, RootError<E>>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let mut evaluations = 0;
    let mut eval = |x: f64, count: &mut usize| {
        *count += 1;
        f(x).map_err(RootError::Objective)
    };

    let ((mut a, mut fa), (mut b, mut fb)) = (lower, upper);

    if fa == 0.0 {
        return Ok(Root {
            x: a,
            residual: fa,
            evaluations,
        });
    }
    if fb == 0.0 {
        return Ok(Root {
            x: b,
            residual: fb,
            evaluations,
        });
    }
    if fa.signum() == fb.signum() {
        return Err(RootError::NoSignChange { a, b, fa, fb });
    }

    // `b` is the best estimate, `c` the previous one with f(c) of opposite sign
    let (mut c, mut fc) = (a, fa);
    let mut d = b - a;
    let mut e = d;

    for _ in 0..options.max_iterations {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * options.rtol * b.abs() + 0.5 * options.xtol;
        let m = 0.5 * (c - b);
        if m.abs() <= tol || fb == 0.0 {
            return Ok(Root {
                x: b,
                residual: fb,
                evaluations,
            });
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                // Secant
                (2.0 * m * s, 1.0 - s)
            } else {
                // Inverse quadratic interpolation
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * m * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }
            if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                e = d;
                d = p / q;
            } else {
                d = m;
                e = m;
            }
        } else {
            d = m;
            e = m;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(m) };
        fb = eval(b, &mut evaluations)?;
    }

    Err(RootError::MaxIterations(options.max_iterations))
}
