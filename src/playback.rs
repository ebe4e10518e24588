//! Snapshot recording for external visualization: element positions and
//! strengths, trace histories, and velocity samples on a regular grid.

use bincode::{Decode, Encode};

use crate::{
    elements::Vec2,
    field::{FieldEval, FlowState},
};

// To save memory, snapshots are stored as f32; we only need f64 precision
// during the integration.
pub fn vec2_to_f32(v: Vec2) -> [f32; 2] {
    [v.x as f32, v.y as f32]
}

#[derive(Debug, Encode, Decode)]
pub struct SnapShot {
    pub time: f32,
    /// Positions of every element in the arena, in arena order.
    pub positions: Vec<[f32; 2]>,
    pub strengths: Vec<f32>,
    /// Velocity samples on the regular grid, row-major, bottom row first.
    /// Empty when no grid was requested.
    pub field: Vec<[f32; 2]>,
}

impl SnapShot {
    pub fn new(time: f64, state: &FlowState, field: Vec<[f32; 2]>) -> Self {
        let mut positions = Vec::with_capacity(state.n_elements());
        let mut strengths = Vec::with_capacity(state.n_elements());
        for col in &state.collections {
            for el in col.iter() {
                positions.push(vec2_to_f32(el.position));
                strengths.push(el.strength as f32);
            }
        }

        Self {
            time: time as f32,
            positions,
            strengths,
            field,
        }
    }
}

/// Sample the velocity field on a regular `nx` x `ny` grid spanning
/// `extent = [x0, x1, y0, y1]`, for quiver or streamline plotting
/// downstream.
pub fn sample_grid(
    state: &FlowState,
    vinf: Vec2,
    eval: &FieldEval,
    extent: [f64; 4],
    nx: usize,
    ny: usize,
) -> Vec<[f32; 2]> {
    let [x0, x1, y0, y1] = extent;
    let dx = (x1 - x0) / (nx.max(2) - 1) as f64;
    let dy = (y1 - y0) / (ny.max(2) - 1) as f64;

    let mut points = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            points.push(Vec2::new(x0 + dx * i as f64, y0 + dy * j as f64));
        }
    }

    eval.velocity_field(&points, state, &[], vinf)
        .into_iter()
        .map(vec2_to_f32)
        .collect()
}

/// Trace histories of every traced element, for plotting particle paths.
pub fn trace_histories(state: &FlowState) -> Vec<Vec<[f32; 2]>> {
    let mut traces = Vec::new();
    for col in &state.collections {
        for el in col.iter() {
            if let Some(trace) = &el.trace {
                traces.push(trace.iter().map(|&p| vec2_to_f32(p)).collect());
            }
        }
    }
    traces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::PointKind;
    use crate::field::ElementCollection;

    #[test]
    fn snapshot_covers_the_arena() {
        let mut a = ElementCollection::new();
        a.add_vortex(Vec2::new(1., 2.), 0.5, PointKind::Plain, false);
        let mut b = ElementCollection::new();
        b.add_tracer(Vec2::new(-1., 0.), false);

        let mut state = FlowState::new();
        state.add_collection(a, true, true);
        state.add_collection(b, true, false);

        let snap = SnapShot::new(1.5, &state, Vec::new());
        assert_eq!(snap.positions.len(), 2);
        assert_eq!(snap.strengths, vec![0.5, 0.]);
        assert_eq!(snap.positions[0], [1., 2.]);
        assert_eq!(snap.time, 1.5);
    }

    #[test]
    fn grid_sampling_dimensions_and_freestream() {
        let state = FlowState::new();
        let vinf = Vec2::new(2., -1.);
        let field = sample_grid(
            &state,
            vinf,
            &FieldEval::Direct,
            [-1., 1., -1., 1.],
            5,
            3,
        );
        assert_eq!(field.len(), 15);
        // No generators: every sample is the freestream.
        for v in field {
            assert_eq!(v, [2., -1.]);
        }
    }

    #[test]
    fn traces_are_exported() {
        let mut col = ElementCollection::new();
        col.add_vortex(Vec2::zeros(), 1., PointKind::Plain, true);
        col.add_vortex(Vec2::zeros(), 1., PointKind::Plain, false);
        let mut state = FlowState::new();
        state.add_collection(col, true, true);

        state.for_each_modifiable(|el| el.modify_pos(Vec2::new(1., 1.)));

        let traces = trace_histories(&state);
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].len(), 2);
    }
}
