#![allow(non_ascii_idents)]

//! 2D incompressible viscous flow by the vortex particle method: free
//! vorticity carried by point vortices and blobs, wall boundary
//! conditions enforced by linear vortex sheet panels, RK2 advection, and
//! random-walk (RVM) viscous diffusion. The default scenario is a
//! circular cylinder in a uniform freestream.

use std::{path::Path, time::Instant};

use bincode::{Decode, Encode};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    boundary::WallBoundary,
    diffusion::apply_rvm,
    elements::Vec2,
    field::{FieldEval, FlowState},
    integrate::advect_rk2,
    playback::{sample_grid, SnapShot},
    tree::TreeConfig,
};

mod boundary;
mod diffusion;
mod elements;
mod field;
mod geometry;
mod integrate;
mod playback;
mod tree;
mod util;

const SAVE_FILE: &str = "config.vtx";
const DEFAULT_SNAPSHOT_FILE: &str = "snapshots.vtx";

#[derive(Debug, Encode, Decode)]
pub struct Config {
    /// Reynolds number based on the cylinder diameter.
    re: f64,
    /// Freestream velocity.
    vinf: [f64; 2],
    radius: f64,
    n_panels: usize,
    /// The timestep is CFL * lambda / |vinf|, with lambda the sheet
    /// length scale pi * delta.
    cfl: f64,
    end_time: f64,
    /// No-slip threshold: the smallest slip circulation resolved per
    /// injected blob.
    gmin: f64,
    tree_config: TreeConfig,
    /// Use direct summation instead of the tree code.
    skip_tree: bool,
    /// Take a snapshot every this many steps.
    snapshot_ratio: usize,
    /// Velocity sampling grid for snapshots: [x0, x1, y0, y1], nx x ny.
    grid_extent: [f64; 4],
    grid_size: [usize; 2],
    seed: u64,
    /// Optional airfoil coordinate file; when set, its polygon replaces
    /// the cylinder.
    airfoil: Option<String>,
    /// Angle of attack in degrees, applied to the airfoil points.
    alpha: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            re: 1_000.,
            vinf: [1., 0.],
            radius: 1.,
            n_panels: 50,
            cfl: 1.,
            end_time: 6.,
            gmin: 0.2,
            tree_config: TreeConfig::default(),
            // Direct summation stays exact; the tree pays off once the
            // blob population reaches the thousands.
            skip_tree: true,
            snapshot_ratio: 5,
            grid_extent: [-3., 3., -3., 3.],
            grid_size: [40, 40],
            seed: 0,
            airfoil: None,
            alpha: 0.,
        }
    }
}

impl Config {
    /// Blob core size, sqrt(1 / Re).
    fn delta(&self) -> f64 {
        (1. / self.re).sqrt()
    }

    /// Sheet length scale.
    fn lambda(&self) -> f64 {
        self.delta() * std::f64::consts::PI
    }

    fn freestream(&self) -> Vec2 {
        Vec2::new(self.vinf[0], self.vinf[1])
    }

    fn dt(&self) -> f64 {
        self.cfl * self.lambda() / self.freestream().norm()
    }

    /// Kinematic viscosity implied by the Reynolds number.
    fn nu(&self) -> f64 {
        self.freestream().norm() * 2. * self.radius / self.re
    }

    fn evaluator(&self) -> FieldEval {
        if self.skip_tree {
            FieldEval::Direct
        } else {
            FieldEval::Tree(self.tree_config.clone())
        }
    }
}

struct State {
    config: Config,
    flow: FlowState,
    boundaries: Vec<WallBoundary>,
    snapshots: Vec<SnapShot>,
    time_elapsed: f64,
}

impl State {
    fn new(config: Config) -> Self {
        let boundaries = match &config.airfoil {
            Some(file) => {
                let points = geometry::read_airfoil_points(Path::new(file))
                    .unwrap_or_else(|e| panic!("could not read airfoil points from {file}: {e}"));
                vec![WallBoundary::polygon(geometry::rotate_aoa(
                    config.alpha,
                    &points,
                ))]
            }
            None => vec![WallBoundary::circle(config.radius, config.n_panels)],
        };
        Self {
            config,
            flow: FlowState::new(),
            boundaries,
            snapshots: Vec::new(),
            time_elapsed: 0.,
        }
    }

    fn take_snapshot(&mut self, eval: &FieldEval) {
        // The tree cannot be built from an empty source set.
        let eval = if self.flow.n_sources() == 0 {
            &FieldEval::Direct
        } else {
            eval
        };
        let [nx, ny] = self.config.grid_size;
        let field = sample_grid(
            &self.flow,
            self.config.freestream(),
            eval,
            self.config.grid_extent,
            nx,
            ny,
        );
        self.snapshots
            .push(SnapShot::new(self.time_elapsed, &self.flow, field));
    }
}

fn run(state: &mut State) {
    let dt = state.config.dt();
    let nu = state.config.nu();
    let delta = state.config.delta();
    let gmin = state.config.gmin;
    let vinf = state.config.freestream();
    let snapshot_ratio = state.config.snapshot_ratio;
    let configured_eval = state.config.evaluator();

    println!(
        "Re: {} dt: {:.5} nu: {:.5} delta: {:.5} theta: {}",
        state.config.re, dt, nu, delta, state.config.tree_config.θ
    );

    let mesh = util::linear_time_mesh(0., dt, state.config.end_time);
    let mut rng = StdRng::seed_from_u64(state.config.seed);

    state.take_snapshot(&configured_eval);

    let mut interval_start = Instant::now();
    for i in 1..mesh.len() {
        let dt_i = mesh[i] - mesh[i - 1];
        let eval = if state.flow.n_sources() == 0 {
            FieldEval::Direct
        } else {
            configured_eval.clone()
        };

        // Advect everything under the no-penetration field.
        advect_rk2(dt_i, &mut state.flow, &mut state.boundaries, vinf, &eval);

        // Inject wall vorticity to cancel the sampled slip.
        for b in 0..state.boundaries.len() {
            let blobs = state.boundaries[b].no_slip_blobs(gmin, delta);
            if !blobs.is_empty() {
                state.flow.add_collection(blobs, true, true);
            }
        }

        // Viscous diffusion.
        apply_rvm(dt_i, nu, &mut state.flow, &state.boundaries, &mut rng);

        state.time_elapsed = mesh[i];

        if i % snapshot_ratio == 0 {
            state.take_snapshot(&eval);
            println!(
                "t: {:.3} elements: {} interval: {}ms",
                state.time_elapsed,
                state.flow.n_elements(),
                interval_start.elapsed().as_millis()
            );
            interval_start = Instant::now();
        }
    }
}

fn main() {
    let mut config = Config::default();
    if let Ok(loaded) = util::load::<Config>(Path::new(SAVE_FILE)) {
        println!("Loaded config from {SAVE_FILE}");
        config = loaded;
    }

    let mut state = State::new(config);
    run(&mut state);

    if let Err(e) = util::save(Path::new(DEFAULT_SNAPSHOT_FILE), &state.snapshots) {
        eprintln!("Error saving snapshots: {e}");
    }
    println!("Run complete. {} snapshots saved.", state.snapshots.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn derived_quantities() {
        let config = Config::default();
        assert_relative_eq!(config.delta(), (1. / 1000f64).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(
            config.dt(),
            config.cfl * config.lambda() / 1.,
            epsilon = 1e-12
        );
        assert_relative_eq!(config.nu(), 0.002, epsilon = 1e-12);
        assert!(matches!(config.evaluator(), FieldEval::Direct));

        let config = Config {
            skip_tree: false,
            ..Default::default()
        };
        assert!(matches!(config.evaluator(), FieldEval::Tree(_)));
    }

    #[test]
    fn viscous_cylinder_smoke_run() {
        // A few macro steps of the full pipeline: advect, inject wall
        // vorticity, diffuse. Vorticity appears and stays outside the
        // cylinder.
        let config = Config {
            n_panels: 16,
            end_time: 1.,
            grid_size: [5, 5],
            ..Default::default()
        };
        let dt = config.dt();
        let nu = config.nu();
        let delta = config.delta();
        let gmin = config.gmin;
        let vinf = config.freestream();

        let mut state = State::new(config);
        let mut rng = StdRng::seed_from_u64(1);
        let eval = FieldEval::Direct;

        for _ in 0..3 {
            advect_rk2(dt, &mut state.flow, &mut state.boundaries, vinf, &eval);
            for b in 0..state.boundaries.len() {
                let blobs = state.boundaries[b].no_slip_blobs(gmin, delta);
                if !blobs.is_empty() {
                    state.flow.add_collection(blobs, true, true);
                }
            }
            apply_rvm(dt, nu, &mut state.flow, &state.boundaries, &mut rng);
        }

        assert!(state.flow.n_sources() > 0);
        for col in &state.flow.collections {
            for el in col.iter() {
                assert!(!state.boundaries[0].in_boundary(el.position));
            }
        }

        state.take_snapshot(&eval);
        assert_eq!(state.snapshots.len(), 1);
        assert_eq!(state.snapshots[0].field.len(), 25);
        assert_eq!(
            state.snapshots[0].positions.len(),
            state.flow.n_elements()
        );
    }

    #[test]
    fn smoke_run_with_tree_evaluator() {
        let config = Config {
            n_panels: 12,
            skip_tree: false,
            ..Default::default()
        };
        let dt = config.dt();
        let delta = config.delta();
        let gmin = config.gmin;
        let vinf = config.freestream();
        let configured_eval = config.evaluator();

        let mut state = State::new(config);
        for _ in 0..2 {
            let eval = if state.flow.n_sources() == 0 {
                FieldEval::Direct
            } else {
                configured_eval.clone()
            };
            advect_rk2(dt, &mut state.flow, &mut state.boundaries, vinf, &eval);
            for b in 0..state.boundaries.len() {
                let blobs = state.boundaries[b].no_slip_blobs(gmin, delta);
                if !blobs.is_empty() {
                    state.flow.add_collection(blobs, true, true);
                }
            }
        }
        assert!(state.flow.n_sources() > 0);
    }
}
