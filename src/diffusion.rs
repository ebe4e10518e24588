//! Random-vortex-method diffusion: viscosity as a Gaussian random walk of
//! the vortex positions, with reflection off solid walls.

use std::f64::consts::PI;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{
    boundary::WallBoundary,
    elements::{PointKind, Vec2},
    field::FlowState,
};

/// Perturb every modifiable vortex element by a random walk whose radius
/// is drawn from N(0, 2 * nu * dt) and whose direction is uniform. Walks
/// ending inside a wall are reflected. Tracers are never diffused.
///
/// The random source is injected so runs can be reproduced.
pub fn apply_rvm<R: Rng>(
    dt: f64,
    nu: f64,
    state: &mut FlowState,
    boundaries: &[WallBoundary],
    rng: &mut R,
) {
    let sigma = (2. * nu * dt).sqrt();
    let normal = Normal::new(0., sigma).unwrap();

    let roles = state.to_mod.clone();
    for ci in roles {
        for el in state.collections[ci].iter_mut() {
            if el.kind == PointKind::Tracer {
                continue;
            }

            let rad: f64 = normal.sample(rng);
            let theta = rng.random_range(-PI..PI);
            let d_pos = Vec2::new(rad * theta.cos(), rad * theta.sin());

            let mut new_pos = el.position + d_pos;
            for bc in boundaries {
                if bc.in_boundary(new_pos) {
                    new_pos = bc.reflect(el.position, d_pos);
                }
            }
            el.modify_pos(new_pos);
        }
    }
}
