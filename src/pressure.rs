use crate::boundary::apply_pressure;
use crate::error::{SimError, SimResult};
use crate::mask::BoundaryMask;
use crate::reduce::Reducer;
use crate::telemetry::{measure, TelemetrySink};
use crate::vec2::Vec2;
use crate::{Field2, MacGrid2, MacVelocity2};
use serde::Serialize;

pub const RED: usize = 0;
pub const BLACK: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SolverState {
    BuildingRhs,
    Iterating,
    Converged,
    MaxIterReached,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SolveReport {
    pub state: SolverState,
    pub iterations: usize,
    /// Residual after the first pressure boundary pass, before any sweep.
    pub initial_residual: f32,
    pub residual: f32,
}

impl SolveReport {
    pub fn converged(&self) -> bool {
        self.state == SolverState::Converged
    }

    /// Turns an exhausted iteration budget into an error for strict callers.
    pub fn ensure_converged(&self) -> SimResult<()> {
        if self.converged() {
            return Ok(());
        }
        Err(SimError::NonConvergence {
            iterations: self.iterations,
            residual: self.residual,
        })
    }
}

/// Buffers over the interior cells plus a full-size snapshot for the sweeps.
#[derive(Clone, Debug)]
pub struct PressureWorkspace {
    rhs: Field2,
    residual: Field2,
    scratch: Field2,
}

impl PressureWorkspace {
    pub fn new(grid: MacGrid2) -> Self {
        Self {
            rhs: Field2::new(grid.interior_grid(), 0.0),
            residual: Field2::new(grid.interior_grid(), 0.0),
            scratch: Field2::new(grid.cell_grid(), 0.0),
        }
    }

    pub fn rhs(&self) -> &Field2 {
        &self.rhs
    }

    pub fn residual(&self) -> &Field2 {
        &self.residual
    }
}

/// Divergence of the predicted velocity over `dt`, for interior fluid cells.
/// `rhs` covers the interior only: entry `(i - 1, j - 1)` is cell `(i, j)`.
pub fn build_rhs(predicted: &MacVelocity2, rhs: &mut Field2, mask: &BoundaryMask, dt: f32) {
    let mesh = predicted.grid().mesh();
    let f = predicted.u();
    let g = predicted.v();
    rhs.fill_with_index(|x, y| {
        let (i, j) = (x + 1, y + 1);
        if !mask.is_interior_fluid(i, j) {
            return 0.0;
        }
        let du = (f.get(i + 1, j) - f.get(i, j)) / mesh.x;
        let dv = (g.get(i, j + 1) - g.get(i, j)) / mesh.y;
        (du + dv) / dt
    });
}

fn laplacian(p: &Field2, mesh: Vec2, i: usize, j: usize) -> f32 {
    let center = p.get(i, j);
    (p.get(i + 1, j) - 2.0 * center + p.get(i - 1, j)) / (mesh.x * mesh.x)
        + (p.get(i, j + 1) - 2.0 * center + p.get(i, j - 1)) / (mesh.y * mesh.y)
}

/// One color of a red-black SOR sweep over the interior fluid cells with
/// `(i + j) % 2 == color`. Returns the number of updated cells.
pub fn sor_half_sweep(
    pressure: &mut Field2,
    scratch: &mut Field2,
    rhs: &Field2,
    mask: &BoundaryMask,
    mesh: Vec2,
    omega: f32,
    color: usize,
) -> usize {
    let inv_x2 = 1.0 / (mesh.x * mesh.x);
    let inv_y2 = 1.0 / (mesh.y * mesh.y);
    let diag = 2.0 * inv_x2 + 2.0 * inv_y2;
    let updates = |i: usize, j: usize| (i + j) % 2 == color && mask.is_interior_fluid(i, j);

    scratch.clone_from(pressure);
    let snapshot = &*scratch;
    pressure.update_with_index(|i, j, value| {
        if !updates(i, j) {
            return value;
        }
        let sum = (snapshot.get(i + 1, j) + snapshot.get(i - 1, j)) * inv_x2
            + (snapshot.get(i, j + 1) + snapshot.get(i, j - 1)) * inv_y2;
        (1.0 - omega) * value + omega * (sum - rhs.get(i - 1, j - 1)) / diag
    });

    let grid = mask.grid();
    (1..grid.height() - 1)
        .flat_map(|j| (1..grid.width() - 1).map(move |i| (i, j)))
        .filter(|&(i, j)| updates(i, j))
        .count()
}

/// Writes `laplacian(p) - rhs` for interior fluid cells, 0 elsewhere.
pub fn compute_residual(
    pressure: &Field2,
    rhs: &Field2,
    residual: &mut Field2,
    mask: &BoundaryMask,
    mesh: Vec2,
) {
    residual.fill_with_index(|x, y| {
        let (i, j) = (x + 1, y + 1);
        if !mask.is_interior_fluid(i, j) {
            return 0.0;
        }
        laplacian(pressure, mesh, i, j) - rhs.get(x, y)
    });
}

/// Root mean square over `fluid_cells`; 0 when there are none.
pub fn residual_norm(reducer: &Reducer, residual: &Field2, fluid_cells: usize) -> f32 {
    if fluid_cells == 0 {
        return 0.0;
    }
    (reducer.sum_squares(residual.data()) / fluid_cells as f32).sqrt()
}

/// Red-black SOR for the pressure Poisson equation.
#[derive(Clone, Debug)]
pub struct PressureSolver {
    omega: f32,
    eps: f32,
    itermax: usize,
    reducer: Reducer,
    state: SolverState,
}

impl PressureSolver {
    /// `itermax` below 1 still runs one sweep.
    pub fn new(omega: f32, eps: f32, itermax: usize) -> Self {
        Self {
            omega,
            eps,
            itermax: itermax.max(1),
            reducer: Reducer::default(),
            state: SolverState::BuildingRhs,
        }
    }

    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn omega(&self) -> f32 {
        self.omega
    }

    pub fn eps(&self) -> f32 {
        self.eps
    }

    pub fn itermax(&self) -> usize {
        self.itermax
    }

    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &mut self,
        predicted: &MacVelocity2,
        pressure: &mut Field2,
        workspace: &mut PressureWorkspace,
        mask: &BoundaryMask,
        prescribed: f32,
        dt: f32,
        telemetry: &mut dyn TelemetrySink,
    ) -> SolveReport {
        let mesh = predicted.grid().mesh();
        let fluid_cells = mask.num_fluid_cells();
        let PressureWorkspace {
            rhs,
            residual,
            scratch,
        } = workspace;

        self.state = SolverState::BuildingRhs;
        measure(telemetry, "pressure::rhs", || build_rhs(predicted, rhs, mask, dt));
        apply_pressure(pressure, scratch, mask, prescribed);
        compute_residual(pressure, rhs, residual, mask, mesh);
        let initial_residual = residual_norm(&self.reducer, residual, fluid_cells);

        self.state = SolverState::Iterating;
        let mut iterations = 0;
        let last = loop {
            let current = measure(telemetry, "pressure::iteration", || {
                sor_half_sweep(pressure, scratch, rhs, mask, mesh, self.omega, RED);
                sor_half_sweep(pressure, scratch, rhs, mask, mesh, self.omega, BLACK);
                apply_pressure(pressure, scratch, mask, prescribed);
                compute_residual(pressure, rhs, residual, mask, mesh);
                residual_norm(&self.reducer, residual, fluid_cells)
            });
            iterations += 1;
            if current <= self.eps {
                self.state = SolverState::Converged;
                break current;
            }
            if iterations >= self.itermax {
                self.state = SolverState::MaxIterReached;
                break current;
            }
        };

        if self.state == SolverState::MaxIterReached {
            tracing::warn!(
                "pressure solver stopped after {} iterations: residual {:e} > eps {:e}",
                iterations,
                last,
                self.eps
            );
        } else {
            tracing::trace!("pressure solver converged in {} iterations", iterations);
        }
        SolveReport {
            state: self.state,
            iterations,
            initial_residual,
            residual: last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::apply_velocity;
    use crate::mask::CellType;
    use crate::telemetry::{NullTelemetry, Telemetry};
    use crate::vec2::Component;
    use crate::velocity::correct;
    use crate::Grid2;

    fn assert_close(a: f32, b: f32, tol: f32) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    fn cavity(nx: usize, ny: usize) -> (MacGrid2, BoundaryMask) {
        let grid = MacGrid2::new(nx, ny, Vec2::new(1.0, 1.0)).unwrap();
        (grid, BoundaryMask::lid_driven_cavity(grid.cell_grid()))
    }

    /// Predicted velocity that is nonzero only on faces between interior
    /// fluid cells, so the Neumann problem is solvable.
    fn swirl(grid: MacGrid2, mask: &BoundaryMask) -> MacVelocity2 {
        let mut predicted = MacVelocity2::new(grid, Vec2::zero());
        predicted.u_mut().fill_with_index(|x, y| {
            if mask.is_interior_face(Component::U, x, y) {
                0.1 * (x as f32 * 1.3).sin() * (y as f32 * 0.7).cos()
            } else {
                0.0
            }
        });
        predicted.v_mut().fill_with_index(|x, y| {
            if mask.is_interior_face(Component::V, x, y) {
                0.1 * (x as f32 * 0.4 + y as f32).cos()
            } else {
                0.0
            }
        });
        predicted
    }

    #[test]
    fn constant_pressure_is_solved_in_one_iteration() {
        let (grid, mask) = cavity(6, 6);
        let predicted = MacVelocity2::new(grid, Vec2::zero());
        for omega in [0.5, 1.0, 1.5, 1.7, 1.95] {
            let mut pressure = Field2::new(grid.cell_grid(), 2.5);
            let mut workspace = PressureWorkspace::new(grid);
            let mut solver = PressureSolver::new(omega, 1e-3, 100);
            let report = solver.solve(
                &predicted,
                &mut pressure,
                &mut workspace,
                &mask,
                2.5,
                0.2,
                &mut NullTelemetry,
            );
            assert_eq!(report.state, SolverState::Converged, "omega = {omega}");
            assert_eq!(report.iterations, 1);
            assert_eq!(solver.state(), SolverState::Converged);
            for value in pressure.data() {
                assert_close(*value, 2.5, 1e-5);
            }
        }
    }

    #[test]
    fn red_and_black_cover_interior_once() {
        for (nx, ny) in [(6, 6), (7, 6), (6, 7), (7, 7), (3, 3)] {
            let (grid, mask) = cavity(nx, ny);
            let mut pressure = Field2::new(grid.cell_grid(), 0.0);
            let mut scratch = Field2::new(grid.cell_grid(), 0.0);
            let rhs = Field2::new(grid.interior_grid(), 1.0);
            let mesh = grid.mesh();
            let red = sor_half_sweep(&mut pressure, &mut scratch, &rhs, &mask, mesh, 1.0, RED);
            let black = sor_half_sweep(&mut pressure, &mut scratch, &rhs, &mask, mesh, 1.0, BLACK);
            assert_eq!(red + black, (nx - 2) * (ny - 2), "{nx}x{ny}");
            assert!(red >= black);
            let touched = pressure.data().iter().filter(|p| **p != 0.0).count();
            assert_eq!(touched, red + black);
        }
    }

    #[test]
    fn obstacles_are_skipped_by_the_sweep() {
        let rows = ["######", "#    #", "# ## #", "#    #", "######"];
        let mask = BoundaryMask::from_rows(Grid2::new(6, 5), &rows).unwrap();
        let grid = MacGrid2::new(6, 5, Vec2::new(1.0, 1.0)).unwrap();
        let mut pressure = Field2::new(grid.cell_grid(), 0.0);
        let mut scratch = Field2::new(grid.cell_grid(), 0.0);
        let rhs = Field2::new(grid.interior_grid(), 1.0);
        let mesh = grid.mesh();
        let updated = sor_half_sweep(&mut pressure, &mut scratch, &rhs, &mask, mesh, 1.0, RED)
            + sor_half_sweep(&mut pressure, &mut scratch, &rhs, &mask, mesh, 1.0, BLACK);
        assert_eq!(updated, 10);
        assert_eq!(pressure.get(2, 2), 0.0);
        assert_eq!(mask.cell_type(2, 2), CellType::NoSlip);
    }

    #[test]
    fn rhs_is_scaled_divergence() {
        let (grid, mask) = cavity(6, 5);
        let mesh = grid.mesh();
        let mut predicted = MacVelocity2::new(grid, Vec2::zero());
        predicted.u_mut().fill_with_index(|x, _| x as f32 * mesh.x);
        let mut rhs = Field2::new(grid.interior_grid(), 7.0);
        build_rhs(&predicted, &mut rhs, &mask, 0.5);
        for value in rhs.data() {
            assert_close(*value, 2.0, 1e-4);
        }
    }

    #[test]
    fn solve_converges_below_initial_residual() {
        let (grid, mask) = cavity(8, 8);
        let predicted = swirl(grid, &mask);
        let mut pressure = Field2::new(grid.cell_grid(), 0.0);
        let mut workspace = PressureWorkspace::new(grid);
        let mut solver = PressureSolver::new(1.7, 1e-3, 2000);
        let mut telemetry = Telemetry::new();
        let report = solver.solve(
            &predicted,
            &mut pressure,
            &mut workspace,
            &mask,
            0.0,
            1.0,
            &mut telemetry,
        );
        assert!(report.converged(), "{report:?}");
        assert!(report.residual <= 1e-3);
        assert!(report.residual <= report.initial_residual);
        assert!(report.ensure_converged().is_ok());
        assert_eq!(telemetry.executions("pressure::rhs"), 1);
        assert_eq!(
            telemetry.executions("pressure::iteration"),
            report.iterations as u64
        );
        assert!(pressure.is_finite());
    }

    #[test]
    fn exhausted_budget_is_reported() {
        let (grid, mask) = cavity(8, 8);
        let predicted = swirl(grid, &mask);
        let mut pressure = Field2::new(grid.cell_grid(), 0.0);
        let mut workspace = PressureWorkspace::new(grid);
        let mut solver = PressureSolver::new(1.7, 0.0, 1);
        let report = solver.solve(
            &predicted,
            &mut pressure,
            &mut workspace,
            &mask,
            0.0,
            1.0,
            &mut NullTelemetry,
        );
        assert_eq!(report.state, SolverState::MaxIterReached);
        assert_eq!(report.iterations, 1);
        assert!(matches!(
            report.ensure_converged(),
            Err(SimError::NonConvergence { iterations: 1, .. })
        ));
    }

    #[test]
    fn inflow_is_carried_to_the_outflow() {
        let rows = ["##########", "I        O", "I        O", "I        O", "##########"];
        let mask = BoundaryMask::from_rows(Grid2::new(10, 5), &rows).unwrap();
        let grid = MacGrid2::new(10, 5, Vec2::new(2.0, 1.0)).unwrap();
        let mut predicted = MacVelocity2::new(grid, Vec2::zero());
        let mut scratch = predicted.clone();
        apply_velocity(&mut predicted, &mut scratch, &mask, Vec2::new(1.0, 0.0));

        let dt = 0.1;
        let mut pressure = Field2::new(grid.cell_grid(), 0.0);
        let mut workspace = PressureWorkspace::new(grid);
        let mut solver = PressureSolver::new(1.7, 1e-3, 5000);
        let report = solver.solve(
            &predicted,
            &mut pressure,
            &mut workspace,
            &mask,
            0.0,
            dt,
            &mut NullTelemetry,
        );
        assert!(report.converged(), "{report:?}");
        for y in 1..=3 {
            assert_eq!(pressure.get(9, y), 0.0);
            assert!(pressure.get(1, y) > pressure.get(8, y));
        }

        let mut velocity = predicted.clone();
        correct(&predicted, &pressure, &mut velocity, &mask, dt);
        let hy = grid.mesh().y;
        let flux = |x: usize| (1..=3).map(|y| velocity.u().get(x, y) * hy).sum::<f32>();
        let inflow = flux(1);
        assert_close(inflow, 3.0 * hy, 1e-6);
        for x in 2..=8 {
            assert_close(flux(x), inflow, 1e-2 * inflow);
        }
    }

    #[test]
    fn residual_norm_without_fluid_is_zero() {
        let residual = Field2::new(Grid2::new(2, 2), 3.0);
        let reducer = Reducer::default();
        assert_eq!(residual_norm(&reducer, &residual, 0), 0.0);
        assert_close(residual_norm(&reducer, &residual, 4), 3.0, 1e-6);
    }
}
