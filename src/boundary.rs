//! Wall boundary conditions. A closed panelised wall enforces
//! no-penetration by solving a linear system for panel-endpoint
//! circulations each step, and approximates no-slip by injecting Chorin
//! blobs just off the surface whose circulation cancels the sampled slip
//! velocity.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};

use crate::{
    elements::{LinearVortexSheet, PointKind, Vec2, NODETOL},
    field::{ElementCollection, SheetCollection},
    geometry::{circle_wall, point_in_polygon, polygon_wall, segment_intersection, WallGeometry},
};

/// Singular-value cutoff for the least-squares strength solve.
const LSTSQ_EPS: f64 = 1e-12;

/// Geometry-specific inside test and reflection.
#[derive(Clone, Debug)]
pub enum WallShape {
    /// Circle centred on the origin.
    Circle { radius: f64 },
    /// Arbitrary closed polygon; uses the panel endpoints themselves.
    Polygon,
}

/// A solid wall with no-penetration and no-slip boundary conditions.
#[derive(Debug)]
pub struct WallBoundary {
    /// Panel endpoints, a closed polygon.
    pub points: Vec<Vec2>,
    /// Control points, the panel midpoints.
    pub cp: Vec<Vec2>,
    /// Outward unit normals at the control points.
    pub normals: Vec<Vec2>,
    /// Slip-sample points, just outside the wall along the normals.
    pub cps: Vec<Vec2>,
    shape: WallShape,
    /// No-penetration influence matrix, (N+1) x N. Geometry only; built
    /// once.
    a: DMatrix<f64>,
    /// Velocities sampled at `cps` during the latest advection step.
    vcps: Vec<Vec2>,
}

impl WallBoundary {
    pub fn new(geom: WallGeometry, shape: WallShape) -> Self {
        let WallGeometry {
            points,
            cp,
            normals,
        } = geom;
        // The slip samples sit a whisker above the no-penetration control
        // points.
        let cps: Vec<Vec2> = cp
            .iter()
            .zip(&normals)
            .map(|(c, n)| c + n * (100. * NODETOL))
            .collect();
        let a = influence_matrix(&points, &cp, &normals);

        Self {
            points,
            cp,
            normals,
            cps,
            shape,
            a,
            vcps: Vec::new(),
        }
    }

    /// A panelised circular wall centred on the origin.
    pub fn circle(radius: f64, n_panels: usize) -> Self {
        Self::new(circle_wall(radius, n_panels), WallShape::Circle { radius })
    }

    /// A wall over an arbitrary closed polygon (e.g. airfoil coordinates).
    pub fn polygon(points: Vec<Vec2>) -> Self {
        Self::new(polygon_wall(points), WallShape::Polygon)
    }

    pub fn n_panels(&self) -> usize {
        self.points.len()
    }

    /// Panel-endpoint circulations cancelling the given control-point
    /// normal velocities, solved in the least-squares sense against the
    /// zero-net-circulation closure row. A non-finite solution is a fatal
    /// consistency error.
    pub(crate) fn solve_strengths(&self, vcp: &[Vec2]) -> DVector<f64> {
        let n = self.points.len();
        let mut b = DVector::zeros(n + 1);
        for i in 0..n {
            b[i] = -vcp[i].dot(&self.normals[i]);
        }

        let gamma = self
            .a
            .clone()
            .svd(true, true)
            .solve(&b, LSTSQ_EPS)
            .unwrap_or_else(|e| panic!("no-penetration system could not be solved: {e}"));
        if gamma.iter().any(|g| !g.is_finite()) {
            panic!("no-penetration solve produced a non-finite circulation");
        }
        gamma
    }

    /// Build the temporary sheet generator that enforces no penetration
    /// given the free-field velocities at the control points. The caller
    /// holds the returned sheets for exactly one field evaluation.
    pub fn no_penetration_sheets(&self, vcp: &[Vec2]) -> SheetCollection {
        let gammas = self.solve_strengths(vcp);
        let n = self.points.len();
        let mut sheets = SheetCollection::new();
        for i in 0..n {
            let j = (i + 1) % n;
            sheets.add_sheet(gammas[i], gammas[j], self.points[i], self.points[j]);
        }
        sheets
    }

    /// Record the velocities sampled at the slip control points.
    pub fn store_slip(&mut self, vcps: Vec<Vec2>) {
        self.vcps = vcps;
    }

    /// Chorin blobs that cancel the tangential slip at each control
    /// point: `round(|vslip| / gmin)` blobs of circulation
    /// `sign(vslip) * gmin * delta * pi` each, placed `delta` above the
    /// control point. This is where wall vorticity enters the flow.
    pub fn no_slip_blobs(&self, gmin: f64, delta: f64) -> ElementCollection {
        let n = self.points.len();
        if self.vcps.len() != n {
            panic!("no-slip blobs requested before slip velocities were sampled");
        }

        let lambda = delta * PI;
        let mut blobs = ElementCollection::new();
        for i in 0..n {
            let normal = self.normals[i];
            let tangent = Vec2::new(-normal.y, normal.x);
            let vslip = -self.vcps[i].dot(&tangent);

            let count = (vslip.abs() / gmin).round() as usize;
            let strength = vslip.signum() * gmin * lambda;
            let loc = self.cp[i] + normal * delta;
            for _ in 0..count {
                blobs.add_vortex(loc, strength, PointKind::Chorin { delta }, false);
            }
        }
        blobs
    }

    /// Whether `pos` lies inside the solid.
    pub fn in_boundary(&self, pos: Vec2) -> bool {
        match &self.shape {
            WallShape::Circle { radius } => pos.norm_squared() < radius * radius,
            WallShape::Polygon => point_in_polygon(&self.points, pos),
        }
    }

    /// Reflect a displacement that would cross into the solid: walk to
    /// the intersection with the surface, then mirror the remaining
    /// displacement's normal component. A no-op when the target position
    /// is not inside.
    pub fn reflect(&self, pos: Vec2, d_pos: Vec2) -> Vec2 {
        let target = pos + d_pos;
        if !self.in_boundary(target) {
            return target;
        }

        let (intersection, normal) = match &self.shape {
            WallShape::Circle { radius } => self.circle_intersection(*radius, pos, d_pos),
            WallShape::Polygon => self.polygon_intersection(pos, target),
        };

        let remaining = target - intersection;
        intersection + remaining - normal * (2. * remaining.dot(&normal))
    }

    /// Nearest crossing of the displacement line with the circle, and the
    /// surface normal there.
    fn circle_intersection(&self, radius: f64, pos: Vec2, d_pos: Vec2) -> (Vec2, Vec2) {
        let a = d_pos.dot(&d_pos);
        let b = 2. * pos.dot(&d_pos);
        let c = pos.dot(&pos) - radius * radius;
        let disc_root = (b * b - 4. * a * c).sqrt();
        let l1 = (-b + disc_root) / (2. * a);
        let l2 = (-b - disc_root) / (2. * a);

        // Take the root of smaller magnitude; a displacement with no real
        // crossing is a degenerate reflection.
        let l = match (l1.is_finite(), l2.is_finite()) {
            (true, true) => {
                if l1.abs() < l2.abs() {
                    l1
                } else {
                    l2
                }
            }
            (true, false) => l1,
            (false, true) => l2,
            (false, false) => panic!(
                "degenerate reflection: displacement {:?} from {:?} never crosses the wall",
                d_pos, pos
            ),
        };

        let intersection = pos + d_pos * l;
        (intersection, intersection / intersection.norm())
    }

    /// Nearest crossed panel of the polygon, and its outward normal.
    fn polygon_intersection(&self, pos: Vec2, target: Vec2) -> (Vec2, Vec2) {
        let n = self.points.len();
        let mut best: Option<(f64, Vec2, Vec2)> = None;
        for i in 0..n {
            let p1 = self.points[i];
            let p2 = self.points[(i + 1) % n];
            if let Some((s, point)) = segment_intersection(pos, target, p1, p2) {
                if best.as_ref().map_or(true, |(bs, _, _)| s < *bs) {
                    best = Some((s, point, self.normals[i]));
                }
            }
        }
        match best {
            Some((_, point, normal)) => (point, normal),
            None => panic!(
                "degenerate reflection: displacement into the wall from {:?} crosses no panel",
                pos
            ),
        }
    }
}

/// The (N+1) x N matrix whose entry (i, j) is the normal velocity induced
/// at control point i by the unit-strength linear sheet basis of panel
/// endpoint j; the final row is the zero-net-circulation closure.
fn influence_matrix(points: &[Vec2], cp: &[Vec2], normals: &[Vec2]) -> DMatrix<f64> {
    let n = points.len();
    let mut a = DMatrix::zeros(n + 1, n);

    for i in 0..n {
        for j in 0..n {
            let l1 = j;
            let l2 = (j + 1) % n;
            let l0 = (j + n - 1) % n;
            let v1 = LinearVortexSheet::new(1., 0., points[l1], points[l2]).field_effect(cp[i]);
            let v2 = LinearVortexSheet::new(0., 1., points[l0], points[l1]).field_effect(cp[i]);
            a[(i, j)] = (v1 + v2).dot(&normals[i]);
        }
    }
    for j in 0..n {
        a[(n, j)] = 1.;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{velocity_field, FlowState};
    use approx::assert_relative_eq;

    #[test]
    fn influence_matrix_shape_and_closure_row() {
        let bc = WallBoundary::circle(1., 12);
        assert_eq!(bc.a.nrows(), 13);
        assert_eq!(bc.a.ncols(), 12);
        for j in 0..12 {
            assert_eq!(bc.a[(12, j)], 1.);
        }
    }

    #[test]
    fn no_penetration_closure() {
        // Uniform freestream past a cylinder, no other generators: after
        // the sheets are applied, the normal velocity at every control
        // point vanishes and the synthesized circulation sums to zero.
        let bc = WallBoundary::circle(1., 24);
        let vinf = Vec2::new(1., 0.);
        let vcp: Vec<Vec2> = bc.cp.iter().map(|_| vinf).collect();

        let gammas = bc.solve_strengths(&vcp);
        assert_relative_eq!(gammas.iter().sum::<f64>(), 0., epsilon = 1e-6);

        let sheets = bc.no_penetration_sheets(&vcp);
        let state = FlowState::new();
        let total = velocity_field(&bc.cp, &state, &[sheets], vinf);
        for (v, n) in total.iter().zip(&bc.normals) {
            assert_relative_eq!(v.dot(n), 0., epsilon = 1e-6);
        }
    }

    #[test]
    fn reflection_is_noop_outside() {
        let bc = WallBoundary::circle(1., 16);
        let pos = Vec2::new(2., 0.);
        let d_pos = Vec2::new(0.3, 0.4);
        assert_eq!(bc.reflect(pos, d_pos), pos + d_pos);
    }

    #[test]
    fn radial_reflection_mirrors_past_the_wall() {
        let bc = WallBoundary::circle(1., 16);
        // Head-on approach: crosses the wall at (1, 0) and bounces back.
        let reflected = bc.reflect(Vec2::new(2., 0.), Vec2::new(-1.5, 0.));
        assert_relative_eq!(reflected.x, 1.5, epsilon = 1e-12);
        assert_relative_eq!(reflected.y, 0., epsilon = 1e-12);
        assert!(!bc.in_boundary(reflected));
    }

    #[test]
    fn oblique_reflection_stays_outside() {
        let bc = WallBoundary::circle(1., 16);
        let pos = Vec2::new(1.2, 0.4);
        let d_pos = Vec2::new(-0.5, -0.3);
        assert!(bc.in_boundary(pos + d_pos));
        let reflected = bc.reflect(pos, d_pos);
        assert!(!bc.in_boundary(reflected));
    }

    #[test]
    fn polygon_reflection_and_inside() {
        let square = vec![
            Vec2::new(-1., -1.),
            Vec2::new(1., -1.),
            Vec2::new(1., 1.),
            Vec2::new(-1., 1.),
        ];
        let bc = WallBoundary::polygon(square);
        assert!(bc.in_boundary(Vec2::new(0., 0.)));
        assert!(!bc.in_boundary(Vec2::new(2., 0.)));

        // Straight approach onto the x = 1 face.
        let reflected = bc.reflect(Vec2::new(2., 0.), Vec2::new(-1.5, 0.));
        assert_relative_eq!(reflected.x, 1.5, epsilon = 1e-12);
        assert!(!bc.in_boundary(reflected));
    }

    #[test]
    fn no_slip_blob_injection() {
        let mut bc = WallBoundary::circle(1., 8);
        let gmin = 0.2;
        let delta = 0.03;

        // A purely tangential sample of -0.45 at every control point
        // yields a slip of +0.45: two blobs per panel, positive sign.
        let vcps: Vec<Vec2> = bc
            .normals
            .iter()
            .map(|n| Vec2::new(-n.y, n.x) * -0.45)
            .collect();
        bc.store_slip(vcps);

        let blobs = bc.no_slip_blobs(gmin, delta);
        assert_eq!(blobs.len(), 2 * 8);

        let expected_strength = gmin * delta * PI;
        for (i, el) in blobs.iter().enumerate() {
            assert_relative_eq!(el.strength, expected_strength, epsilon = 1e-12);
            assert_eq!(el.kind, PointKind::Chorin { delta });
            let panel = i / 2;
            let expected_loc = bc.cp[panel] + bc.normals[panel] * delta;
            assert_relative_eq!((el.position - expected_loc).norm(), 0., epsilon = 1e-12);
        }

        // Below half the threshold nothing is injected.
        let vcps: Vec<Vec2> = bc
            .normals
            .iter()
            .map(|n| Vec2::new(-n.y, n.x) * 0.05)
            .collect();
        bc.store_slip(vcps);
        assert!(bc.no_slip_blobs(gmin, delta).is_empty());
    }

    #[test]
    #[should_panic(expected = "before slip velocities")]
    fn no_slip_without_samples_is_fatal() {
        let bc = WallBoundary::circle(1., 8);
        bc.no_slip_blobs(0.2, 0.03);
    }
}
