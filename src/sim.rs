use crate::boundary::apply_velocity;
use crate::error::SimResult;
use crate::geometry::Geometry;
use crate::momentum::{predict, MomentumParams};
use crate::params::SimParams;
use crate::pressure::{PressureSolver, SolveReport};
use crate::reduce::Reducer;
use crate::state::{SimState, SimWorkspace};
use crate::telemetry::{measure, TelemetrySink};
use crate::timestep::{self, StepLimit};
use crate::velocity::correct;
use serde::Serialize;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StepReport {
    /// 1-based index of the step just taken.
    pub step: usize,
    /// Simulation time after the step.
    pub time: f32,
    pub dt: f32,
    pub limit: StepLimit,
    pub max_u: f32,
    pub max_v: f32,
    pub solve: SolveReport,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub steps: usize,
    pub time: f32,
    pub unconverged_steps: usize,
    pub total_iterations: usize,
    /// The caller asked to stop before `t_end`.
    pub stopped_early: bool,
}

/// Projection-method integrator for one geometry. Owns all of its buffers.
#[derive(Clone, Debug)]
pub struct Simulation {
    geometry: Geometry,
    params: SimParams,
    state: SimState,
    workspace: SimWorkspace,
    solver: PressureSolver,
    reducer: Reducer,
    strict: bool,
    time: f32,
    steps: usize,
}

impl Simulation {
    pub fn new(geometry: Geometry, params: SimParams) -> Self {
        let grid = geometry.grid();
        let state = SimState::new(grid, geometry.boundary_pressure());
        Self {
            workspace: SimWorkspace::new(grid),
            solver: PressureSolver::new(params.omega, params.eps, params.itermax),
            reducer: Reducer::default(),
            strict: false,
            time: 0.0,
            steps: 0,
            geometry,
            params,
            state,
        }
    }

    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self.solver = self.solver.with_reducer(reducer);
        self
    }

    /// Make [`Simulation::run`] fail on the first step whose pressure solve
    /// hits the iteration limit.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// For setting initial conditions.
    pub fn state_mut(&mut self) -> &mut SimState {
        &mut self.state
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_finished(&self) -> bool {
        self.time >= self.params.t_end
    }

    /// Advances one time step.
    pub fn step(&mut self, telemetry: &mut dyn TelemetrySink) -> SimResult<StepReport> {
        let start = Instant::now();
        let Self {
            geometry,
            params,
            state,
            workspace,
            solver,
            reducer,
            ..
        } = self;
        let mask = geometry.mask();
        let mesh = geometry.mesh();
        let boundary_velocity = geometry.boundary_velocity();
        let scratch = &mut workspace.velocity_scratch;

        measure(telemetry, "boundary::velocity", || {
            apply_velocity(&mut state.velocity, scratch, mask, boundary_velocity)
        });
        let (max_u, max_v) = measure(telemetry, "reduce::max_abs", || {
            state.max_abs_velocity(reducer)
        });
        let step = timestep::compute(params.dt, params.tau, params.re, mesh, max_u, max_v)?;
        let dt = step.dt;

        let momentum = MomentumParams {
            re: params.re,
            alpha: params.alpha,
            dt,
            mesh,
            force: params.force,
        };
        measure(telemetry, "momentum", || {
            predict(&state.velocity, &mut state.predicted, mask, momentum)
        });
        measure(telemetry, "boundary::predicted", || {
            apply_velocity(&mut state.predicted, scratch, mask, boundary_velocity)
        });

        let solve_start = Instant::now();
        let solve = solver.solve(
            &state.predicted,
            &mut state.pressure,
            &mut workspace.pressure,
            mask,
            geometry.boundary_pressure(),
            dt,
            telemetry,
        );
        telemetry.record("pressure::solve", solve_start.elapsed());
        if !solve.converged() {
            telemetry.count("pressure::unconverged");
        }

        measure(telemetry, "velocity::correct", || {
            correct(&state.predicted, &state.pressure, &mut state.velocity, mask, dt)
        });
        measure(telemetry, "boundary::velocity", || {
            apply_velocity(&mut state.velocity, scratch, mask, boundary_velocity)
        });

        self.time += dt;
        self.steps += 1;
        let report = StepReport {
            step: self.steps,
            time: self.time,
            dt,
            limit: step.limit,
            max_u,
            max_v,
            solve,
        };
        tracing::debug!(
            "step {}: t={:.5} dt={:.3e} ({:?}) iterations={} residual={:.3e}",
            report.step,
            report.time,
            report.dt,
            report.limit,
            solve.iterations,
            solve.residual
        );
        telemetry.record("step::full", start.elapsed());
        Ok(report)
    }

    /// Steps until `t_end`, or until `keep_going` returns false after a step.
    pub fn run(
        &mut self,
        telemetry: &mut dyn TelemetrySink,
        mut keep_going: impl FnMut(&StepReport) -> bool,
    ) -> SimResult<RunSummary> {
        let mut summary = RunSummary::default();
        while !self.is_finished() {
            let report = self.step(telemetry)?;
            summary.steps += 1;
            summary.total_iterations += report.solve.iterations;
            if !report.solve.converged() {
                summary.unconverged_steps += 1;
                if self.strict {
                    report.solve.ensure_converged()?;
                }
            }
            if !keep_going(&report) {
                summary.stopped_early = !self.is_finished();
                break;
            }
        }
        summary.time = self.time;
        tracing::info!(
            "finished {} steps at t={:.4} ({} unconverged pressure solves)",
            summary.steps,
            summary.time,
            summary.unconverged_steps
        );
        Ok(summary)
    }
}
