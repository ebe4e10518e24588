//! Wall geometry construction: circle panelisation, airfoil coordinate
//! files, control points, outward normals, and segment intersection.

use std::{
    f64::consts::PI,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use num_complex::Complex64;

use crate::elements::{Vec2, NODETOL};

/// Panel endpoints of a closed wall together with the derived control
/// points (segment midpoints) and outward unit normals.
#[derive(Clone, Debug)]
pub struct WallGeometry {
    pub points: Vec<Vec2>,
    pub cp: Vec<Vec2>,
    pub normals: Vec<Vec2>,
}

/// Panelise a circle of radius `radius` centred on the origin into
/// `n_panels` segments. Points run counterclockwise; normals are radial.
pub fn circle_wall(radius: f64, n_panels: usize) -> WallGeometry {
    let mut points = Vec::with_capacity(n_panels);
    for i in 0..n_panels {
        let theta = 2. * PI / n_panels as f64 * i as f64;
        points.push(Vec2::new(radius * theta.cos(), radius * theta.sin()));
    }

    let mut cp = Vec::with_capacity(n_panels);
    let mut normals = Vec::with_capacity(n_panels);
    for i in 0..n_panels {
        let mid = (points[i] + points[(i + 1) % n_panels]) / 2.;
        normals.push(mid / mid.norm());
        cp.push(mid);
    }

    WallGeometry {
        points,
        cp,
        normals,
    }
}

/// Derive control points and outward normals for an arbitrary closed
/// polygon. Normals are oriented away from the polygon centroid.
pub fn polygon_wall(points: Vec<Vec2>) -> WallGeometry {
    let n = points.len();
    let centroid = points.iter().fold(Vec2::zeros(), |acc, p| acc + p) / n as f64;

    let mut cp = Vec::with_capacity(n);
    let mut normals = Vec::with_capacity(n);
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let mid = (a + b) / 2.;
        let edge = b - a;
        let mut normal = Vec2::new(edge.y, -edge.x) / edge.norm();
        if normal.dot(&(mid - centroid)) < 0. {
            normal = -normal;
        }
        cp.push(mid);
        normals.push(normal);
    }

    WallGeometry {
        points,
        cp,
        normals,
    }
}

/// Read boundary points from a two-column whitespace-separated coordinate
/// file (e.g. naca0012.txt). The first two header lines are skipped.
pub fn read_airfoil_points(path: &Path) -> io::Result<Vec<Vec2>> {
    let reader = BufReader::new(File::open(path)?);
    let mut points = Vec::new();

    for line in reader.lines().skip(2) {
        let line = line?;
        let mut cols = line.split_whitespace();
        let (Some(x), Some(y)) = (cols.next(), cols.next()) else {
            continue;
        };
        let x: f64 = x
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let y: f64 = y
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        points.push(Vec2::new(x, y));
    }

    Ok(points)
}

/// Rotate body points to give a positive angle of attack `alpha` in
/// degrees (a clockwise rotation of the body).
pub fn rotate_aoa(alpha: f64, points: &[Vec2]) -> Vec<Vec2> {
    let rot = Complex64::cis(-alpha / 180. * PI);
    points
        .iter()
        .map(|p| {
            let z = Complex64::new(p.x, p.y) * rot;
            Vec2::new(z.re, z.im)
        })
        .collect()
}

/// Intersection of segments [p1, p2] and [p3, p4]. Returns the parameter
/// along [p1, p2] and the intersection point, or None for parallel or
/// non-crossing segments.
pub fn segment_intersection(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Option<(f64, Vec2)> {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let det = d1.x * d2.y - d1.y * d2.x;
    if det.abs() < NODETOL {
        return None;
    }

    let rhs = p3 - p1;
    let s = (rhs.x * d2.y - rhs.y * d2.x) / det;
    let t = (rhs.x * d1.y - rhs.y * d1.x) / det;
    if !(0. ..=1.).contains(&s) || !(0. ..=1.).contains(&t) {
        return None;
    }

    Some((s, p1 + d1 * s))
}

/// Even-odd ray cast over the polygon edges.
pub fn point_in_polygon(points: &[Vec2], p: Vec2) -> bool {
    let n = points.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (points[i], points[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = pi.x + (p.y - pi.y) * (pj.x - pi.x) / (pj.y - pi.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
