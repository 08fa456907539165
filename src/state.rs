use crate::pressure::PressureWorkspace;
use crate::reduce::Reducer;
use crate::vec2::Vec2;
use crate::{Field2, MacGrid2, MacVelocity2};

/// Fields carried from one step to the next.
#[derive(Clone, Debug, PartialEq)]
pub struct SimState {
    pub velocity: MacVelocity2,
    /// Intermediate velocity (F, G) of the last step.
    pub predicted: MacVelocity2,
    pub pressure: Field2,
}

impl SimState {
    /// Fluid at rest with uniform pressure.
    pub fn new(grid: MacGrid2, pressure: f32) -> Self {
        Self {
            velocity: MacVelocity2::new(grid, Vec2::zero()),
            predicted: MacVelocity2::new(grid, Vec2::zero()),
            pressure: Field2::new(grid.cell_grid(), pressure),
        }
    }

    pub fn grid(&self) -> MacGrid2 {
        self.velocity.grid()
    }

    /// `(max |u|, max |v|)` over all faces.
    pub fn max_abs_velocity(&self, reducer: &Reducer) -> (f32, f32) {
        (
            reducer.max_abs(self.velocity.u().data()),
            reducer.max_abs(self.velocity.v().data()),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.velocity.u().is_finite() && self.velocity.v().is_finite() && self.pressure.is_finite()
    }
}

/// Snapshots and solver buffers reused across steps.
#[derive(Clone, Debug)]
pub struct SimWorkspace {
    pub(crate) velocity_scratch: MacVelocity2,
    pub(crate) pressure: PressureWorkspace,
}

impl SimWorkspace {
    pub fn new(grid: MacGrid2) -> Self {
        Self {
            velocity_scratch: MacVelocity2::new(grid, Vec2::zero()),
            pressure: PressureWorkspace::new(grid),
        }
    }

    pub fn pressure(&self) -> &PressureWorkspace {
        &self.pressure
    }
}
