use crate::error::{SimError, SimResult};
use std::path::Path;
use std::str::FromStr;

/// One `key = value` line. `line` is 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Entry<'a> {
    pub line: usize,
    pub key: &'a str,
    pub value: &'a str,
}

/// Splits a line at the first `=`; both sides are trimmed. Lines without `=`
/// yield `None`.
pub(crate) fn split_entry(line: usize, text: &str) -> Option<Entry<'_>> {
    let (key, value) = text.split_once('=')?;
    Some(Entry {
        line,
        key: key.trim(),
        value: value.trim(),
    })
}

impl Entry<'_> {
    /// Parses exactly `N` whitespace-separated values.
    pub fn values<T: FromStr, const N: usize>(&self) -> SimResult<[T; N]> {
        let tokens: Vec<&str> = self.value.split_whitespace().collect();
        if tokens.len() != N {
            return Err(SimError::config(
                self.line,
                format!(
                    "`{}` expects {} value(s), found {:?}",
                    self.key, N, self.value
                ),
            ));
        }
        let mut parsed = Vec::with_capacity(N);
        for token in tokens {
            let value = token.parse::<T>().map_err(|_| {
                SimError::config(
                    self.line,
                    format!("`{}`: cannot parse {:?}", self.key, token),
                )
            })?;
            parsed.push(value);
        }
        parsed
            .try_into()
            .map_err(|_| SimError::config(self.line, format!("`{}`: bad value count", self.key)))
    }

    pub fn value<T: FromStr>(&self) -> SimResult<T> {
        let [value] = self.values::<T, 1>()?;
        Ok(value)
    }
}

pub(crate) fn read_to_string(path: &Path) -> SimResult<String> {
    std::fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })
}
