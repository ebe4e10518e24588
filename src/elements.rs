//! Field elements and their induced-velocity kernels: singular point
//! vortices, regularized (Krasny / Chorin) blobs, passive tracers, and
//! linear vortex sheet panels.
//!
//! All kernels work on the complex velocity w = u - iv; the physical pair
//! is recovered as (Re w, -Im w).

use std::f64::consts::PI;

use nalgebra::Vector2;
use num_complex::Complex64;

pub type Vec2 = Vector2<f64>;

/// Coincidence tolerance. Within this distance of a singularity, a kernel
/// returns zero instead of blowing up.
pub const NODETOL: f64 = 1e-8;

fn to_complex(p: Vec2) -> Complex64 {
    Complex64::new(p.x, p.y)
}

fn to_physical(w: Complex64) -> Vec2 {
    Vec2::new(w.re, -w.im)
}

/// Velocity at `pos` induced by a singular point vortex of circulation
/// `gamma` located at `source`. Zero inside the coincidence tolerance.
pub fn plain_vortex_velocity(gamma: f64, source: Vec2, pos: Vec2) -> Vec2 {
    let dz = to_complex(pos) - to_complex(source);
    if dz.norm() < NODETOL {
        return Vec2::zeros();
    }
    to_physical(Complex64::i() * gamma / (dz * (2. * PI)))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointKind {
    /// Singular point vortex.
    Plain,
    /// Krasny blob: the kernel is smoothly desingularized over a core of
    /// radius `delta`.
    Krasny { delta: f64 },
    /// Chorin blob: singular kernel outside the core, linear inside it.
    Chorin { delta: f64 },
    /// Passive tracer. Observes the field, never generates it.
    Tracer,
}

/// A single point-type element: vortex, blob, or tracer.
#[derive(Clone, Debug)]
pub struct PointElement {
    pub position: Vec2,
    /// Circulation. Zero for tracers.
    pub strength: f64,
    pub kind: PointKind,
    /// Past positions, appended on every commit. Diagnostics only; the
    /// physics never reads it.
    pub trace: Option<Vec<Vec2>>,
}

impl PointElement {
    pub fn new(position: Vec2, strength: f64, kind: PointKind, traced: bool) -> Self {
        Self {
            position,
            strength,
            kind,
            trace: if traced { Some(vec![position]) } else { None },
        }
    }

    pub fn tracer(position: Vec2, traced: bool) -> Self {
        Self::new(position, 0., PointKind::Tracer, traced)
    }

    /// Velocity induced at `pos` by this element.
    pub fn field_effect(&self, pos: Vec2) -> Vec2 {
        let dz = to_complex(pos) - to_complex(self.position);
        let r = dz.norm();
        if r < NODETOL {
            return Vec2::zeros();
        }

        let w = Complex64::i() * self.strength / (dz * (2. * PI));

        match self.kind {
            PointKind::Tracer => Vec2::zeros(),
            PointKind::Plain => to_physical(w),
            PointKind::Krasny { delta } => {
                to_physical(w * (r * r / (r * r + delta * delta)))
            }
            PointKind::Chorin { delta } => {
                if r > delta {
                    to_physical(w)
                } else {
                    to_physical(w * (r / delta))
                }
            }
        }
    }

    /// Commit a new position, recording it in the trace history.
    pub fn modify_pos(&mut self, new_pos: Vec2) {
        self.position = new_pos;
        if let Some(trace) = &mut self.trace {
            trace.push(new_pos);
        }
    }
}

/// A straight vortex sheet segment carrying linearly varying circulation
/// density, `gamma1` at `x1` to `gamma2` at `x2`. Synthesized per boundary
/// step; not a free particle.
#[derive(Clone, Debug)]
pub struct LinearVortexSheet {
    pub gamma1: f64,
    pub gamma2: f64,
    pub x1: Vec2,
    pub x2: Vec2,
    /// Panel length.
    lambda: f64,
    /// Panel inclination, radians.
    theta: f64,
}

impl LinearVortexSheet {
    pub fn new(gamma1: f64, gamma2: f64, x1: Vec2, x2: Vec2) -> Self {
        let diff = x2 - x1;
        Self {
            gamma1,
            gamma2,
            x1,
            x2,
            lambda: diff.norm(),
            theta: to_complex(diff).arg(),
        }
    }

    /// Closed-form induced velocity of the panel at `pos`. Zero if the
    /// query coincides with either endpoint.
    pub fn field_effect(&self, pos: Vec2) -> Vec2 {
        let z1 = to_complex(self.x1);
        let z2 = to_complex(self.x2);
        let zq = to_complex(pos);
        if (z1 - zq).norm() < NODETOL || (z2 - zq).norm() < NODETOL {
            return Vec2::zeros();
        }

        // Panel-local frame: rotate so the panel lies along the real axis.
        let z = (zq - z1) * Complex64::cis(-self.theta);
        let log_term = ((z - self.lambda) / z).ln();
        let pa1 = ((z / self.lambda - 1.) * log_term + 1.) * self.gamma1;
        let pa2 = ((z / self.lambda) * log_term + 1.) * self.gamma2;
        let w = Complex64::i() / (2. * PI) * (pa1 - pa2) * Complex64::cis(-self.theta);
        to_physical(w)
    }
}
