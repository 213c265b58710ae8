//! Cubic bezier timing curves.
//!
//! A curve runs from (0,0) to (1,1) through the control points (x1,y1) and
//! (x2,y2). `evaluate` maps elapsed time to progress, `invert` maps progress
//! back to time. Both sample one component into a small table, pick the
//! enclosing interval and refine with Newton-Raphson, falling back to binary
//! subdivision where the curve is too flat for Newton to converge.

const SAMPLE_COUNT: usize = 11;
const SAMPLE_STEP: f32 = 1.0 / (SAMPLE_COUNT as f32 - 1.0);
const NEWTON_ITERATIONS: usize = 4;
const NEWTON_MIN_SLOPE: f32 = 1e-3;
const SUBDIVISION_PRECISION: f32 = 1e-7;
const SUBDIVISION_MAX_ITERATIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    x_samples: [f32; SAMPLE_COUNT],
    y_samples: [f32; SAMPLE_COUNT],
}

impl CubicBezier {
    /// Handle X values are clamped into [0,1] so the curve stays a function of time.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let x1 = x1.clamp(0.0, 1.0);
        let x2 = x2.clamp(0.0, 1.0);
        let mut x_samples = [0.0; SAMPLE_COUNT];
        let mut y_samples = [0.0; SAMPLE_COUNT];
        for i in 0..SAMPLE_COUNT {
            let s = i as f32 * SAMPLE_STEP;
            x_samples[i] = calc_bezier(s, x1, x2);
            y_samples[i] = calc_bezier(s, y1, y2);
        }
        Self {
            x1,
            y1,
            x2,
            y2,
            x_samples,
            y_samples,
        }
    }

    pub fn linear() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn is_linear(&self) -> bool {
        self.x1 == self.y1 && self.x2 == self.y2
    }

    /// Progress at time fraction `t`.
    pub fn evaluate(&self, t: f32) -> f32 {
        if t.is_nan() || t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        if self.is_linear() {
            return t;
        }
        let s = solve_parameter(&self.x_samples, self.x1, self.x2, t);
        calc_bezier(s, self.y1, self.y2)
    }

    /// Time fraction at which the curve reaches progress `p`.
    pub fn invert(&self, p: f32) -> f32 {
        if p.is_nan() || p <= 0.0 {
            return 0.0;
        }
        if p >= 1.0 {
            return 1.0;
        }
        if self.is_linear() {
            return p;
        }
        let s = solve_parameter(&self.y_samples, self.y1, self.y2, p);
        calc_bezier(s, self.x1, self.x2).clamp(0.0, 1.0)
    }
}

impl Default for CubicBezier {
    fn default() -> Self {
        Self::linear()
    }
}

pub fn evaluate(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    CubicBezier::new(x1, y1, x2, y2).evaluate(t)
}

pub fn invert(p: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    CubicBezier::new(x1, y1, x2, y2).invert(p)
}

#[inline]
fn coeff_a(a1: f32, a2: f32) -> f32 {
    1.0 - 3.0 * a2 + 3.0 * a1
}

#[inline]
fn coeff_b(a1: f32, a2: f32) -> f32 {
    3.0 * a2 - 6.0 * a1
}

#[inline]
fn coeff_c(a1: f32) -> f32 {
    3.0 * a1
}

/// One component of the curve at parameter `s`.
#[inline]
fn calc_bezier(s: f32, a1: f32, a2: f32) -> f32 {
    ((coeff_a(a1, a2) * s + coeff_b(a1, a2)) * s + coeff_c(a1)) * s
}

#[inline]
fn slope(s: f32, a1: f32, a2: f32) -> f32 {
    3.0 * coeff_a(a1, a2) * s * s + 2.0 * coeff_b(a1, a2) * s + coeff_c(a1)
}

/// Curve parameter at which the sampled component reaches `target`.
fn solve_parameter(samples: &[f32; SAMPLE_COUNT], a1: f32, a2: f32, target: f32) -> f32 {
    let mut interval_start = 0.0;
    let mut current = 1;
    while current < SAMPLE_COUNT - 1 && samples[current] <= target {
        current += 1;
        interval_start += SAMPLE_STEP;
    }
    current -= 1;

    let span = samples[current + 1] - samples[current];
    let dist = if span.abs() > f32::EPSILON {
        (target - samples[current]) / span
    } else {
        0.0
    };
    let guess = interval_start + dist * SAMPLE_STEP;

    let initial_slope = slope(guess, a1, a2);
    let s = if initial_slope >= NEWTON_MIN_SLOPE {
        newton_raphson(target, guess, a1, a2)
    } else if initial_slope == 0.0 {
        guess
    } else {
        binary_subdivide(target, interval_start, interval_start + SAMPLE_STEP, a1, a2)
    };
    s.clamp(0.0, 1.0)
}

fn newton_raphson(target: f32, mut guess: f32, a1: f32, a2: f32) -> f32 {
    for _ in 0..NEWTON_ITERATIONS {
        let current_slope = slope(guess, a1, a2);
        if current_slope == 0.0 {
            return guess;
        }
        let current = calc_bezier(guess, a1, a2) - target;
        guess -= current / current_slope;
    }
    guess
}

fn binary_subdivide(target: f32, mut lo: f32, mut hi: f32, a1: f32, a2: f32) -> f32 {
    let mut current_s = lo;
    for _ in 0..SUBDIVISION_MAX_ITERATIONS {
        current_s = lo + (hi - lo) / 2.0;
        let current = calc_bezier(current_s, a1, a2) - target;
        if current.abs() <= SUBDIVISION_PRECISION {
            break;
        }
        if current > 0.0 {
            hi = current_s;
        } else {
            lo = current_s;
        }
    }
    current_s
}
