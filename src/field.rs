//! Element collections, the shared element arena, and the brute-force
//! velocity-field evaluator.
//!
//! The arena holds every collection in the scene; the "modifiable" and
//! "generator" roles are index sets over it. An element that is both
//! advected and a field source is stored exactly once, so a position
//! commit by the integrator is visible to field evaluation within the
//! same step.

use rayon::prelude::*;

use crate::{
    elements::{LinearVortexSheet, PointElement, PointKind, Vec2},
    tree::{velocity_field_tree, TreeConfig},
};

/// An ordered, identity-stable container of point elements. The id of an
/// element is its assignment index; ids are dense, unique, and never
/// reused or reordered.
#[derive(Clone, Debug, Default)]
pub struct ElementCollection {
    elements: Vec<PointElement>,
}

impl ElementCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element, assigning the next id. Returns that id.
    pub fn add_element(&mut self, element: PointElement) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    pub fn add_vortex(
        &mut self,
        position: Vec2,
        strength: f64,
        kind: PointKind,
        traced: bool,
    ) -> usize {
        self.add_element(PointElement::new(position, strength, kind, traced))
    }

    pub fn add_tracer(&mut self, position: Vec2, traced: bool) -> usize {
        self.add_element(PointElement::tracer(position, traced))
    }

    /// Append every element of `other`, assigning fresh ids in order.
    pub fn merge(&mut self, other: &ElementCollection) {
        for el in &other.elements {
            self.add_element(el.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&PointElement> {
        self.elements.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointElement> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PointElement> {
        self.elements.iter_mut()
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.elements.iter().map(|el| el.position).collect()
    }

    /// Summed velocity at `pos` over all held elements.
    pub fn field_effect(&self, pos: Vec2) -> Vec2 {
        let mut vel = Vec2::zeros();
        for el in &self.elements {
            vel += el.field_effect(pos);
        }
        vel
    }
}

/// A list of linear vortex sheet panels acting as one generator. Used for
/// the per-step no-penetration sheets.
#[derive(Clone, Debug, Default)]
pub struct SheetCollection {
    sheets: Vec<LinearVortexSheet>,
}

impl SheetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, gamma1: f64, gamma2: f64, x1: Vec2, x2: Vec2) {
        self.sheets.push(LinearVortexSheet::new(gamma1, gamma2, x1, x2));
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinearVortexSheet> {
        self.sheets.iter()
    }

    pub fn field_effect(&self, pos: Vec2) -> Vec2 {
        let mut vel = Vec2::zeros();
        for sheet in &self.sheets {
            vel += sheet.field_effect(pos);
        }
        vel
    }
}

/// The scene: an arena of collections plus role index sets.
#[derive(Debug, Default)]
pub struct FlowState {
    pub collections: Vec<ElementCollection>,
    /// Indices of collections advanced by the integrator and diffused.
    pub to_mod: Vec<usize>,
    /// Indices of collections that induce velocity.
    pub field_gens: Vec<usize>,
}

impl FlowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection to the arena, enrolling it in the requested roles.
    /// Returns its arena index.
    pub fn add_collection(
        &mut self,
        collection: ElementCollection,
        modifiable: bool,
        generating: bool,
    ) -> usize {
        self.collections.push(collection);
        let idx = self.collections.len() - 1;
        if modifiable {
            self.to_mod.push(idx);
        }
        if generating {
            self.field_gens.push(idx);
        }
        idx
    }

    pub fn generator_collections(&self) -> impl Iterator<Item = &ElementCollection> {
        self.field_gens.iter().map(|&i| &self.collections[i])
    }

    /// Total point count across the modifiable role.
    pub fn n_modifiable(&self) -> usize {
        self.to_mod.iter().map(|&i| self.collections[i].len()).sum()
    }

    /// Positions of every modifiable element, preserving per-collection
    /// order.
    pub fn modifiable_positions(&self) -> Vec<Vec2> {
        self.to_mod
            .iter()
            .flat_map(|&i| self.collections[i].iter().map(|el| el.position))
            .collect()
    }

    /// Visit every modifiable element mutably, in the same order as
    /// `modifiable_positions`.
    pub fn for_each_modifiable(&mut self, mut f: impl FnMut(&mut PointElement)) {
        let roles = self.to_mod.clone();
        for ci in roles {
            for el in self.collections[ci].iter_mut() {
                f(el);
            }
        }
    }

    /// Total element count over the whole arena.
    pub fn n_elements(&self) -> usize {
        self.collections.iter().map(|c| c.len()).sum()
    }

    /// Strength-carrying elements across the generator role; what the
    /// tree code would hold.
    pub fn n_sources(&self) -> usize {
        self.generator_collections()
            .flat_map(|c| c.iter())
            .filter(|el| el.kind != PointKind::Tracer)
            .count()
    }
}

/// Reference evaluator: at every query point, sum the contribution of all
/// generator collections, the extra sheet generators, and the freestream.
/// O(|points| * total source count). Query points evaluate in parallel.
pub fn velocity_field(
    points: &[Vec2],
    state: &FlowState,
    sheets: &[SheetCollection],
    vinf: Vec2,
) -> Vec<Vec2> {
    points
        .par_iter()
        .map(|&p| {
            let mut vel = vinf;
            for gen in state.generator_collections() {
                vel += gen.field_effect(p);
            }
            for sheet in sheets {
                vel += sheet.field_effect(p);
            }
            vel
        })
        .collect()
}

/// Choice of velocity-field evaluator. The tree code is a drop-in
/// replacement for direct summation with an error bounded by its opening
/// angle.
#[derive(Clone, Debug)]
pub enum FieldEval {
    Direct,
    Tree(TreeConfig),
}

impl FieldEval {
    pub fn velocity_field(
        &self,
        points: &[Vec2],
        state: &FlowState,
        sheets: &[SheetCollection],
        vinf: Vec2,
    ) -> Vec<Vec2> {
        match self {
            Self::Direct => velocity_field(points, state, sheets, vinf),
            Self::Tree(cfg) => velocity_field_tree(points, state, sheets, vinf, cfg),
        }
    }
}
