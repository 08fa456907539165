use std::path::PathBuf;
use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    /// Malformed parameter or geometry input.
    #[error("configuration error at line {line}: {message}")]
    Config { line: usize, message: String },

    /// Free-form block size differs from the declared grid size.
    #[error("geometry size mismatch: expected {expected:?} (columns, rows), found {found:?}")]
    GeometryMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("invalid geometry symbol {symbol:?} at row {row}, column {column}")]
    InvalidSymbol {
        symbol: char,
        row: usize,
        column: usize,
    },

    /// Raised only on request; the integrator itself carries on.
    #[error("pressure solver did not converge after {iterations} iterations (residual {residual:e})")]
    NonConvergence { iterations: usize, residual: f32 },

    #[error("degenerate time step: velocity extrema max|u| = {max_u}, max|v| = {max_v}")]
    DegenerateStep { max_u: f32, max_v: f32 },

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SimError {
    pub(crate) fn config(line: usize, message: impl Into<String>) -> Self {
        SimError::Config {
            line,
            message: message.into(),
        }
    }

    /// Load-time errors abort before any step is taken.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            SimError::Config { .. }
                | SimError::GeometryMismatch { .. }
                | SimError::InvalidSymbol { .. }
                | SimError::Io { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = SimError::InvalidSymbol {
            symbol: 'x',
            row: 2,
            column: 5,
        };
        assert_eq!(err.to_string(), "invalid geometry symbol 'x' at row 2, column 5");
        assert!(err.is_load_error());
        let err = SimError::NonConvergence {
            iterations: 100,
            residual: 0.5,
        };
        assert!(!err.is_load_error());
    }
}
