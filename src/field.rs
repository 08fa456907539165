use crate::grid::Grid2;
use rayon::prelude::*;
use std::sync::OnceLock;

const PAR_THRESHOLD_DEFAULT: usize = 262_144;
const PAR_MIN_WORK_PER_THREAD: usize = 4096;

fn parallel_threshold() -> usize {
    static THRESHOLD: OnceLock<usize> = OnceLock::new();
    *THRESHOLD.get_or_init(|| {
        std::env::var("NUMSIM_PAR_THRESHOLD")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(PAR_THRESHOLD_DEFAULT)
    })
}

pub(crate) fn should_parallel(len: usize) -> bool {
    if len < parallel_threshold() {
        return false;
    }
    let threads = rayon::current_num_threads().max(1);
    len / threads >= PAR_MIN_WORK_PER_THREAD
}

/// Scalar f32 buffer over a [`Grid2`]. Every per-cell pass returns only after
/// all cells are written, so consecutive passes are ordered.
#[derive(Clone, Debug, PartialEq)]
pub struct Field2 {
    grid: Grid2,
    data: Vec<f32>,
}

impl Field2 {
    pub fn new(grid: Grid2, fill: f32) -> Self {
        let data = vec![fill; grid.size()];
        Self { grid, data }
    }

    pub fn from_fn(grid: Grid2, f: impl Fn(usize, usize) -> f32 + Sync) -> Self {
        let mut field = Self::new(grid, 0.0);
        field.fill_with_index(f);
        field
    }

    pub fn grid(&self) -> Grid2 {
        self.grid
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.grid.idx(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        let i = self.grid.idx(x, y);
        self.data[i] = value;
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn fill_with_index(&mut self, f: impl Fn(usize, usize) -> f32 + Sync) {
        let width = self.grid.width();
        if should_parallel(self.data.len()) {
            self.data.par_iter_mut().enumerate().for_each(|(i, value)| {
                let x = i % width;
                let y = i / width;
                *value = f(x, y);
            });
        } else {
            for (i, value) in self.data.iter_mut().enumerate() {
                let x = i % width;
                let y = i / width;
                *value = f(x, y);
            }
        }
    }

    pub fn update_with_index(&mut self, f: impl Fn(usize, usize, f32) -> f32 + Sync) {
        let width = self.grid.width();
        if should_parallel(self.data.len()) {
            self.data.par_iter_mut().enumerate().for_each(|(i, value)| {
                let x = i % width;
                let y = i / width;
                *value = f(x, y, *value);
            });
        } else {
            for (i, value) in self.data.iter_mut().enumerate() {
                let x = i % width;
                let y = i / width;
                *value = f(x, y, *value);
            }
        }
    }

    pub fn clone_from(&mut self, other: &Self) {
        self.assert_same_grid(other);
        self.data.clone_from(&other.data);
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|value| value.is_finite())
    }

    fn assert_same_grid(&self, other: &Self) {
        assert_eq!(self.grid, other.grid, "field grid mismatch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_maps_coords() {
        let grid = Grid2::new(3, 2);
        let field = Field2::from_fn(grid, |x, y| (x + y * 10) as f32);
        assert_eq!(field.get(2, 1), 12.0);
        assert_eq!(field.data().len(), 6);
    }

    #[test]
    fn update_with_index_sees_previous_value() {
        let grid = Grid2::new(2, 2);
        let mut field = Field2::new(grid, 1.5);
        field.update_with_index(|x, y, value| value + (x + 2 * y) as f32);
        assert_eq!(field.get(0, 0), 1.5);
        assert_eq!(field.get(1, 1), 4.5);
    }

    #[test]
    fn set_and_finiteness() {
        let grid = Grid2::new(3, 3);
        let mut field = Field2::new(grid, 0.0);
        field.set(1, 2, 7.0);
        assert_eq!(field.get(1, 2), 7.0);
        field.set(0, 0, f32::NAN);
        assert!(!field.is_finite());
    }

    #[test]
    #[should_panic(expected = "field grid mismatch")]
    fn clone_from_rejects_other_shape() {
        let mut a = Field2::new(Grid2::new(2, 2), 0.0);
        let b = Field2::new(Grid2::new(3, 2), 0.0);
        a.clone_from(&b);
    }
}
