//! Tree-code acceleration for the velocity field. Groups source vortices
//! into a quadtree of rectangular clusters, each carrying its total
//! circulation and strength-weighted centroid (a one-term multipole).
//! O((N + M) log N) in place of the O(N * M) direct sum.

#![allow(non_ascii_idents)]

use bincode::{Decode, Encode};
use rayon::prelude::*;

use crate::{
    elements::{plain_vortex_velocity, PointElement, PointKind, Vec2, NODETOL},
    field::{FlowState, SheetCollection},
};

#[derive(Clone, Debug, Encode, Decode)]
pub struct TreeConfig {
    /// Opening angle. A cluster is far enough from a query point to be
    /// approximated by its aggregate when `half_diagonal < θ * distance`.
    /// 0 never opens a cluster, degenerating to direct summation.
    pub θ: f64,
    /// Leaves are split until they hold at most this many sources.
    pub max_leaf_size: usize,
    /// Boxes are never split below this width.
    pub min_box_size: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            θ: 0.5,
            max_leaf_size: 8,
            min_box_size: 1e-6,
        }
    }
}

/// An axis-aligned bounding rectangle.
#[derive(Clone, Debug)]
pub struct Rect {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Rect {
    /// Construct minimum limits that encompass all points. None if there
    /// are no points.
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut x_min = f64::MAX;
        let mut x_max = f64::MIN;
        let mut y_min = f64::MAX;
        let mut y_max = f64::MIN;

        for p in points {
            x_min = x_min.min(p.x);
            x_max = x_max.max(p.x);
            y_min = y_min.min(p.y);
            y_max = y_max.max(p.y);
        }

        Some(Self {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new((self.x_min + self.x_max) / 2., (self.y_min + self.y_max) / 2.)
    }

    pub fn half_diagonal(&self) -> f64 {
        let dx = self.x_max - self.x_min;
        let dy = self.y_max - self.y_min;
        (dx * dx + dy * dy).sqrt() / 2.
    }

    pub fn max_dimension(&self) -> f64 {
        (self.x_max - self.x_min).max(self.y_max - self.y_min)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.x_min <= p.x && p.x <= self.x_max && self.y_min <= p.y && p.y <= self.y_max
    }

    /// Divide into equal-area quadrants, ordered SW, SE, NW, NE.
    pub fn divide_into_quadrants(&self) -> [Self; 4] {
        let c = self.center();
        [
            Self {
                x_min: self.x_min,
                x_max: c.x,
                y_min: self.y_min,
                y_max: c.y,
            },
            Self {
                x_min: c.x,
                x_max: self.x_max,
                y_min: self.y_min,
                y_max: c.y,
            },
            Self {
                x_min: self.x_min,
                x_max: c.x,
                y_min: c.y,
                y_max: self.y_max,
            },
            Self {
                x_min: c.x,
                x_max: self.x_max,
                y_min: c.y,
                y_max: self.y_max,
            },
        ]
    }
}

#[derive(Debug)]
struct TreeNode {
    rect: Rect,
    /// Total circulation of the enclosed sources.
    strength: f64,
    /// Strength-weighted centroid. Falls back to the positional mean when
    /// the net circulation cancels.
    centroid: Vec2,
    /// Non-empty quadrant children. Empty for leaves.
    children: Vec<TreeNode>,
    /// Source indices. Held by leaves only.
    members: Vec<usize>,
}

/// A quadtree over the strength-carrying point sources of a scene. Sheets
/// are never placed in the tree. Rebuild whenever source positions change.
#[derive(Debug)]
pub struct Tree<'a> {
    sources: Vec<&'a PointElement>,
    root: TreeNode,
}

impl<'a> Tree<'a> {
    /// Build over every non-tracer point element of the generator
    /// collections. None when there are no sources.
    pub fn build(state: &'a FlowState, cfg: &TreeConfig) -> Option<Self> {
        let sources: Vec<&PointElement> = state
            .generator_collections()
            .flat_map(|c| c.iter())
            .filter(|el| el.kind != PointKind::Tracer)
            .collect();

        let positions: Vec<Vec2> = sources.iter().map(|el| el.position).collect();
        let rect = Rect::from_points(&positions)?;
        let members: Vec<usize> = (0..sources.len()).collect();
        let root = build_node(&sources, members, rect, cfg);
        Some(Self { sources, root })
    }

    pub fn n_sources(&self) -> usize {
        self.sources.len()
    }

    /// Total circulation held by the root aggregate.
    pub fn total_strength(&self) -> f64 {
        self.root.strength
    }

    /// Velocity at `p` from the whole tree: aggregates for admissible
    /// clusters, direct summation at leaves.
    pub fn find_velocity(&self, p: Vec2, θ: f64) -> Vec2 {
        walk(&self.root, &self.sources, p, θ)
    }
}

fn walk(node: &TreeNode, sources: &[&PointElement], p: Vec2, θ: f64) -> Vec2 {
    // An unsplit leaf always sums its members directly, whatever the
    // distance.
    if node.children.is_empty() {
        let mut vel = Vec2::zeros();
        for &i in &node.members {
            vel += sources[i].field_effect(p);
        }
        return vel;
    }

    let dist = (p - node.centroid).norm();
    if node.rect.half_diagonal() < θ * dist {
        // Far enough: the whole cluster acts as one point vortex at its
        // centroid.
        return plain_vortex_velocity(node.strength, node.centroid, p);
    }

    let mut vel = Vec2::zeros();
    for child in &node.children {
        vel += walk(child, sources, p, θ);
    }
    vel
}

fn build_node(
    sources: &[&PointElement],
    members: Vec<usize>,
    rect: Rect,
    cfg: &TreeConfig,
) -> TreeNode {
    let (strength, centroid) = center_of_strength(sources, &members);

    if members.len() <= cfg.max_leaf_size || rect.max_dimension() <= cfg.min_box_size {
        return TreeNode {
            rect,
            strength,
            centroid,
            children: Vec::new(),
            members,
        };
    }

    // Assign each member to exactly one quadrant by comparison against the
    // center, so points on a dividing line are not duplicated.
    let c = rect.center();
    let mut buckets: [Vec<usize>; 4] = Default::default();
    for &i in &members {
        let p = sources[i].position;
        let q = usize::from(p.x > c.x) + 2 * usize::from(p.y > c.y);
        buckets[q].push(i);
    }

    let quadrants = rect.divide_into_quadrants();
    let children = buckets
        .into_iter()
        .zip(quadrants)
        .filter(|(bucket, _)| !bucket.is_empty())
        .map(|(bucket, quadrant)| build_node(sources, bucket, quadrant, cfg))
        .collect();

    TreeNode {
        rect,
        strength,
        centroid,
        children,
        members: Vec::new(),
    }
}

/// Total circulation and strength-weighted centroid of a member set.
fn center_of_strength(sources: &[&PointElement], members: &[usize]) -> (f64, Vec2) {
    let mut strength = 0.;
    let mut weighted = Vec2::zeros();
    let mut mean = Vec2::zeros();

    for &i in members {
        strength += sources[i].strength;
        weighted += sources[i].position * sources[i].strength;
        mean += sources[i].position;
    }

    let centroid = if strength.abs() > NODETOL {
        weighted / strength
    } else if members.is_empty() {
        Vec2::zeros()
    } else {
        // Counter-rotating clusters cancel; keep a geometric center so the
        // admissibility distance stays meaningful.
        mean / members.len() as f64
    };

    (strength, centroid)
}

/// Drop-in replacement for the brute-force evaluator. Point sources go
/// through the tree; sheet generators are always summed directly.
pub fn velocity_field_tree(
    points: &[Vec2],
    state: &FlowState,
    sheets: &[SheetCollection],
    vinf: Vec2,
    cfg: &TreeConfig,
) -> Vec<Vec2> {
    let tree = match Tree::build(state, cfg) {
        Some(tree) => tree,
        None => panic!("tree code: velocity requested from an empty source set"),
    };

    points
        .par_iter()
        .map(|&p| {
            let mut vel = vinf + tree.find_velocity(p, cfg.θ);
            for sheet in sheets {
                vel += sheet.field_effect(p);
            }
            vel
        })
        .collect()
}
