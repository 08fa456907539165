mod boundary;
mod error;
mod field;
mod geometry;
mod grid;
mod input;
mod mac;
mod mask;
mod momentum;
mod params;
mod pressure;
mod reduce;
mod sim;
mod state;
mod telemetry;
mod timestep;
mod vec2;
mod velocity;
mod vis;

pub use boundary::{apply_pressure, apply_velocity, apply_velocity_component};
pub use error::{SimError, SimResult};
pub use field::Field2;
pub use geometry::Geometry;
pub use grid::Grid2;
pub use mac::{MacGrid2, MacVelocity2, MIN_CELLS};
pub use mask::{BoundaryMask, Cell, CellType, NeighborFlags, VelocityRule};
pub use momentum::{predict, MomentumParams};
pub use params::SimParams;
pub use pressure::{
    build_rhs, compute_residual, residual_norm, sor_half_sweep, PressureSolver, PressureWorkspace,
    SolveReport, SolverState, BLACK, RED,
};
pub use reduce::{pad_up, Reducer, DEFAULT_BLOCK_SIZE};
pub use sim::{RunSummary, Simulation, StepReport};
pub use state::{SimState, SimWorkspace};
pub use telemetry::{measure, NullTelemetry, Telemetry, TelemetryEntry, TelemetrySink};
pub use timestep::{compute as compute_time_step, StepLimit, TimeStep};
pub use vec2::{Component, Vec2};
pub use velocity::correct as correct_velocity;
pub use vis::{Cached, VisTarget, Visualizer};
