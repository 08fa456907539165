use crate::error::{SimError, SimResult};
use crate::vec2::Vec2;
use serde::Serialize;

/// Which bound selected the step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StepLimit {
    /// Nominal step, adaptive control off or not binding.
    Nominal,
    Diffusive,
    Convective,
    /// Both velocity extrema are zero; only the nominal and diffusive bounds
    /// remain and the nominal one was used.
    Degenerate,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TimeStep {
    pub dt: f32,
    pub limit: StepLimit,
}

/// Stability-limited step:
/// `min(dt_nominal, tau * min(dt_diffusive, hx / max|u|, hy / max|v|))`,
/// where a zero extremum drops its convective term. `tau <= 0` disables the
/// adaptive control.
pub fn compute(
    dt_nominal: f32,
    tau: f32,
    re: f32,
    mesh: Vec2,
    max_u: f32,
    max_v: f32,
) -> SimResult<TimeStep> {
    if !max_u.is_finite() || !max_v.is_finite() {
        return Err(SimError::DegenerateStep { max_u, max_v });
    }
    let nominal = TimeStep {
        dt: dt_nominal,
        limit: StepLimit::Nominal,
    };
    if tau <= 0.0 {
        return Ok(nominal);
    }

    let (hx2, hy2) = (mesh.x * mesh.x, mesh.y * mesh.y);
    let diffusive = 0.5 * re * hx2 * hy2 / (hx2 + hy2);
    let convective = [(mesh.x, max_u), (mesh.y, max_v)]
        .into_iter()
        .filter(|(_, speed)| *speed != 0.0)
        .map(|(h, speed)| h / speed.abs())
        .reduce(f32::min);

    let Some(convective) = convective else {
        tracing::debug!("velocity field at rest, convective limit dropped");
        let bound = tau * diffusive;
        return Ok(if bound < dt_nominal {
            TimeStep {
                dt: bound,
                limit: StepLimit::Diffusive,
            }
        } else {
            TimeStep {
                dt: dt_nominal,
                limit: StepLimit::Degenerate,
            }
        });
    };

    let (bound, limit) = if convective < diffusive {
        (tau * convective, StepLimit::Convective)
    } else {
        (tau * diffusive, StepLimit::Diffusive)
    };
    if bound < dt_nominal {
        Ok(TimeStep { dt: bound, limit })
    } else {
        Ok(nominal)
    }
}
