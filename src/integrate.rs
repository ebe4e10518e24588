//! RK2 (midpoint predictor-corrector) advection of all modifiable
//! elements under the combined field of the free elements, the
//! boundary-synthesized sheets, and the freestream.

use crate::{
    boundary::WallBoundary,
    elements::Vec2,
    field::{FieldEval, FlowState},
};

/// Advance every modifiable element by one RK2 step of size `dt`.
///
/// The predictor half-step is committed before the corrector field is
/// evaluated, so elements that are also sources act from their midpoint
/// positions. The corrector steps from the original positions; a result
/// inside a wall is replaced by that wall's reflection.
pub fn advect_rk2(
    dt: f64,
    state: &mut FlowState,
    boundaries: &mut [WallBoundary],
    vinf: Vec2,
    eval: &FieldEval,
) {
    // Snapshot positions across all modifiable collections, preserving
    // per-collection order.
    let old_pos = state.modifiable_positions();
    let n = old_pos.len();

    let field = boundary_bracketed_field(state, boundaries, &old_pos, vinf, eval, true);

    // Predictor: half-step Euler, committed so the corrector sees it.
    let mut k = 0;
    state.for_each_modifiable(|el| {
        el.modify_pos(old_pos[k] + field[k] * (dt / 2.));
        k += 1;
    });

    let mid_pos = state.modifiable_positions();
    if mid_pos.len() != n {
        panic!(
            "element count changed during an advection step: {} -> {}",
            n,
            mid_pos.len()
        );
    }

    let field = boundary_bracketed_field(state, boundaries, &mid_pos, vinf, eval, false);

    // Corrector: full step from the original positions, reflecting any
    // element that would end up inside a wall.
    let mut k = 0;
    state.for_each_modifiable(|el| {
        let mut new_pos = old_pos[k] + field[k] * dt;
        for bc in boundaries.iter() {
            if bc.in_boundary(new_pos) {
                new_pos = bc.reflect(old_pos[k], new_pos - old_pos[k]);
            }
        }
        el.modify_pos(new_pos);
        k += 1;
    });
}

/// One boundary-bracketed field evaluation: per wall, sample the free
/// field at the control points, synthesize the no-penetration sheets, and
/// optionally sample the slip velocities with the sheets active; then
/// evaluate the full field at `points`. The sheets drop at return, so
/// they exist for exactly this evaluation.
fn boundary_bracketed_field(
    state: &FlowState,
    boundaries: &mut [WallBoundary],
    points: &[Vec2],
    vinf: Vec2,
    eval: &FieldEval,
    sample_slip: bool,
) -> Vec<Vec2> {
    let mut sheets = Vec::with_capacity(boundaries.len());
    for bc in boundaries.iter() {
        let vcp = eval.velocity_field(&bc.cp, state, &[], vinf);
        sheets.push(bc.no_penetration_sheets(&vcp));
    }

    if sample_slip {
        for bc in boundaries.iter_mut() {
            let vcps = eval.velocity_field(&bc.cps, state, &sheets, vinf);
            bc.store_slip(vcps);
        }
    }

    eval.velocity_field(points, state, &sheets, vinf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::PointKind;
    use crate::field::ElementCollection;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn lone_vortex_drifts_with_the_freestream() {
        let mut col = ElementCollection::new();
        col.add_vortex(Vec2::new(0., 0.), 1., PointKind::Plain, false);
        let mut state = FlowState::new();
        state.add_collection(col, true, true);

        let vinf = Vec2::new(1., 0.5);
        let dt = 0.1;
        advect_rk2(dt, &mut state, &mut [], vinf, &FieldEval::Direct);

        let pos = state.collections[0].get(0).unwrap().position;
        assert_relative_eq!(pos.x, vinf.x * dt, epsilon = 1e-12);
        assert_relative_eq!(pos.y, vinf.y * dt, epsilon = 1e-12);
    }

    #[test]
    fn two_vortices_orbit_in_a_circle() {
        // Equal strengths a distance d apart orbit their centroid at
        // radius d/2 with period 2 pi^2 d^2 / gamma.
        let d = 1.0;
        let gamma = 1.0;
        let mut col = ElementCollection::new();
        col.add_vortex(Vec2::new(-d / 2., 0.), gamma, PointKind::Plain, true);
        col.add_vortex(Vec2::new(d / 2., 0.), gamma, PointKind::Plain, true);
        let mut state = FlowState::new();
        state.add_collection(col, true, true);

        let period = 2. * PI * PI * d * d / gamma;
        let dt = 0.005;
        let steps = (period / dt).round() as usize;
        let eval = FieldEval::Direct;

        for _ in 0..steps {
            advect_rk2(dt, &mut state, &mut [], Vec2::zeros(), &eval);

            // The orbit radius holds throughout.
            for el in state.collections[0].iter() {
                assert_relative_eq!(el.position.norm(), d / 2., epsilon = 1e-3);
            }
        }

        // After one period each vortex is back near its start.
        let p0 = state.collections[0].get(0).unwrap().position;
        let p1 = state.collections[0].get(1).unwrap().position;
        assert!((p0 - Vec2::new(-d / 2., 0.)).norm() < 1e-2);
        assert!((p1 - Vec2::new(d / 2., 0.)).norm() < 1e-2);
    }

    #[test]
    fn tracer_orbits_a_vortex_without_disturbing_it() {
        let mut vortices = ElementCollection::new();
        vortices.add_vortex(Vec2::new(0., 0.), 1., PointKind::Plain, false);
        let mut tracers = ElementCollection::new();
        tracers.add_tracer(Vec2::new(1., 0.), true);

        let mut state = FlowState::new();
        state.add_collection(vortices, true, true);
        state.add_collection(tracers, true, false);

        let eval = FieldEval::Direct;
        for _ in 0..200 {
            advect_rk2(0.05, &mut state, &mut [], Vec2::zeros(), &eval);
        }

        // The vortex never moved; the tracer stayed on its circle.
        assert_eq!(
            state.collections[0].get(0).unwrap().position,
            Vec2::new(0., 0.)
        );
        let tracer = state.collections[1].get(0).unwrap();
        assert_relative_eq!(tracer.position.norm(), 1., epsilon = 1e-3);
        assert!(tracer.trace.as_ref().unwrap().len() > 200);
    }

    #[test]
    fn corrector_reflection_keeps_elements_outside_walls() {
        // A strong vortex pair near the wall pushes itself toward the
        // cylinder; reflection must keep everything outside.
        let mut col = ElementCollection::new();
        col.add_vortex(Vec2::new(1.05, 0.1), 2., PointKind::Plain, false);
        col.add_vortex(Vec2::new(1.05, -0.1), -2., PointKind::Plain, false);
        let mut state = FlowState::new();
        state.add_collection(col, true, true);

        let mut boundaries = [WallBoundary::circle(1., 24)];
        let eval = FieldEval::Direct;
        for _ in 0..40 {
            advect_rk2(0.05, &mut state, &mut boundaries, Vec2::zeros(), &eval);
            for el in state.collections[0].iter() {
                assert!(!boundaries[0].in_boundary(el.position));
            }
        }
    }

    #[test]
    fn slip_samples_are_stored_during_advection() {
        let mut col = ElementCollection::new();
        col.add_vortex(Vec2::new(2., 0.), 1., PointKind::Plain, false);
        let mut state = FlowState::new();
        state.add_collection(col, true, true);

        let mut boundaries = [WallBoundary::circle(1., 16)];
        advect_rk2(
            0.01,
            &mut state,
            &mut boundaries,
            Vec2::new(1., 0.),
            &FieldEval::Direct,
        );

        // The no-slip step can run right after the advection.
        let blobs = boundaries[0].no_slip_blobs(0.2, 0.03);
        // Cylinder in freestream: slip exists somewhere on the surface.
        assert!(!blobs.is_empty());
    }
}
