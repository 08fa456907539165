use crate::error::{SimError, SimResult};
use crate::input::{read_to_string, split_entry};
use crate::vec2::Vec2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Integration parameters, read once and fixed for a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    /// Reynolds number.
    pub re: f32,
    /// SOR relaxation factor in (0, 2).
    pub omega: f32,
    /// Donor-cell blending in [0, 1].
    pub alpha: f32,
    /// Nominal time step.
    pub dt: f32,
    pub t_end: f32,
    /// Pressure solver tolerance.
    pub eps: f32,
    /// Safety factor of the adaptive step; `<= 0` disables it.
    pub tau: f32,
    pub itermax: usize,
    /// Body force per unit mass.
    pub force: Vec2,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            re: 1000.0,
            omega: 1.7,
            alpha: 0.9,
            dt: 0.2,
            t_end: 16.4,
            eps: 1e-3,
            tau: 0.5,
            itermax: 100,
            force: Vec2::zero(),
        }
    }
}

impl SimParams {
    /// Reads `key = value` lines over the defaults. Unknown keys and lines
    /// without `=` are logged and skipped; a value that does not parse is an
    /// error carrying its line number.
    pub fn parse(text: &str) -> SimResult<Self> {
        let mut params = Self::default();
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let Some(entry) = split_entry(line, raw) else {
                tracing::warn!("ignoring parameter line {} without `=`: {:?}", line, raw);
                continue;
            };
            match entry.key {
                "re" => params.re = entry.value()?,
                "omg" | "omega" => params.omega = entry.value()?,
                "alpha" => params.alpha = entry.value()?,
                "dt" => params.dt = entry.value()?,
                "tend" => params.t_end = entry.value()?,
                "iter" => params.itermax = entry.value()?,
                "eps" => params.eps = entry.value()?,
                "tau" => params.tau = entry.value()?,
                "gx" => params.force.x = entry.value()?,
                "gy" => params.force.y = entry.value()?,
                key => tracing::warn!("unknown parameter key `{}` at line {}", key, line),
            }
        }
        params.validate()?;
        Ok(params)
    }

    pub fn load(path: &Path) -> SimResult<Self> {
        let params = Self::parse(&read_to_string(path)?)?;
        tracing::info!(
            "loaded parameters from {}: re={} omega={} alpha={} dt={} tend={} eps={} tau={} iter={}",
            path.display(),
            params.re,
            params.omega,
            params.alpha,
            params.dt,
            params.t_end,
            params.eps,
            params.tau,
            params.itermax
        );
        Ok(params)
    }

    /// Range checks that cannot be tied to a single line; reported as line 0.
    pub fn validate(&self) -> SimResult<()> {
        let fail = |message: String| -> SimResult<()> { Err(SimError::config(0, message)) };
        if self.re.is_nan() || self.re <= 0.0 {
            return fail(format!("re must be positive, got {}", self.re));
        }
        if self.omega.is_nan() || self.omega <= 0.0 || self.omega >= 2.0 {
            return fail(format!("omega must lie in (0, 2), got {}", self.omega));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return fail(format!("alpha must lie in [0, 1], got {}", self.alpha));
        }
        if self.dt.is_nan() || self.dt <= 0.0 {
            return fail(format!("dt must be positive, got {}", self.dt));
        }
        if self.eps.is_nan() || self.eps < 0.0 {
            return fail(format!("eps must not be negative, got {}", self.eps));
        }
        Ok(())
    }
}
