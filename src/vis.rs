use crate::mask::BoundaryMask;
use crate::reduce::Reducer;
use crate::state::SimState;
use crate::{Field2, MacVelocity2};
use clap::ValueEnum;
use serde::Serialize;

/// Scalar quantity exported for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisTarget {
    #[default]
    VelocityMagnitude,
    VelocityX,
    VelocityY,
    Pressure,
    /// Cell type code of the mask.
    BoundaryType,
    Divergence,
    /// Sampled at the upper-right corner of each cell.
    Vorticity,
    /// Sampled at the upper-right corner of each cell, zero below row 0.
    StreamFunction,
}

/// A value that is only recomputed when read after being marked dirty.
#[derive(Clone, Debug)]
pub struct Cached<T> {
    value: T,
    dirty: bool,
}

impl<T> Cached<T> {
    /// Starts dirty so the first read computes.
    pub fn new(initial: T) -> Self {
        Self {
            value: initial,
            dirty: true,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Stores `value` and clears the dirty flag.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = false;
    }

    pub fn get_or_update(&mut self, update: impl FnOnce() -> T) -> &T {
        if self.dirty {
            self.set(update());
        }
        &self.value
    }
}

/// Cell-centred nx x ny view of one [`VisTarget`] with its value range.
#[derive(Clone, Debug)]
pub struct Visualizer {
    target: VisTarget,
    field: Field2,
    range: Cached<(f32, f32)>,
    reducer: Reducer,
}

impl Visualizer {
    pub fn new(state: &SimState, mask: &BoundaryMask, target: VisTarget) -> Self {
        let mut vis = Self {
            target,
            field: Field2::new(state.grid().cell_grid(), 0.0),
            range: Cached::new((0.0, 0.0)),
            reducer: Reducer::default(),
        };
        vis.update(state, mask);
        vis
    }

    pub fn target(&self) -> VisTarget {
        self.target
    }

    pub fn field(&self) -> &Field2 {
        &self.field
    }

    /// Switches target; takes effect at the next [`Visualizer::update`].
    pub fn set_target(&mut self, target: VisTarget) {
        self.target = target;
        self.range.mark_dirty();
    }

    pub fn update(&mut self, state: &SimState, mask: &BoundaryMask) {
        let velocity = &state.velocity;
        let mesh = state.grid().mesh();
        match self.target {
            VisTarget::VelocityMagnitude => self
                .field
                .fill_with_index(|x, y| velocity.cell_velocity(x, y).length()),
            VisTarget::VelocityX => self
                .field
                .fill_with_index(|x, y| velocity.cell_velocity(x, y).x),
            VisTarget::VelocityY => self
                .field
                .fill_with_index(|x, y| velocity.cell_velocity(x, y).y),
            VisTarget::Pressure => self.field.clone_from(&state.pressure),
            VisTarget::BoundaryType => self
                .field
                .fill_with_index(|x, y| f32::from(mask.cell_type(x, y).bits())),
            VisTarget::Divergence => {
                let (u, v) = (velocity.u(), velocity.v());
                self.field.fill_with_index(|x, y| {
                    (u.get(x + 1, y) - u.get(x, y)) / mesh.x
                        + (v.get(x, y + 1) - v.get(x, y)) / mesh.y
                })
            }
            VisTarget::Vorticity => self
                .field
                .fill_with_index(|x, y| corner_vorticity(velocity, mesh.x, mesh.y, x, y)),
            VisTarget::StreamFunction => stream_function(velocity, mesh.y, &mut self.field),
        }
        self.range.mark_dirty();
    }

    /// `(min, max)` of the finite values, recomputed only after an update.
    pub fn range(&mut self) -> (f32, f32) {
        let (field, reducer) = (&self.field, &self.reducer);
        *self.range.get_or_update(|| reducer.min_max(field.data()))
    }
}

fn corner_vorticity(velocity: &MacVelocity2, hx: f32, hy: f32, x: usize, y: usize) -> f32 {
    let grid = velocity.grid();
    if x + 1 >= grid.width() || y + 1 >= grid.height() {
        return 0.0;
    }
    let (u, v) = (velocity.u(), velocity.v());
    (v.get(x + 1, y + 1) - v.get(x, y + 1)) / hx - (u.get(x + 1, y + 1) - u.get(x + 1, y)) / hy
}

fn stream_function(velocity: &MacVelocity2, hy: f32, out: &mut Field2) {
    let u = velocity.u();
    let grid = out.grid();
    for x in 0..grid.width() {
        let mut psi = 0.0;
        for y in 0..grid.height() {
            psi += u.get(x + 1, y) * hy;
            out.set(x, y, psi);
        }
    }
}
