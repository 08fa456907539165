use crate::field::should_parallel;
use rayon::prelude::*;

pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Pads `value` up to the next multiple of `divisor`.
pub fn pad_up(value: usize, divisor: usize) -> usize {
    value.div_ceil(divisor) * divisor
}

/// Two-level block reduction.
///
/// Stage one reduces each block of `block_size` elements to a partial value,
/// stage two combines the partials in block order once stage one has finished.
/// The range is logically padded to a multiple of the block size with the
/// neutral element; the padding is never materialized, the last block is just
/// shorter.
///
/// Sums depend on the grouping: a different block size can change the last
/// bits of the result. For a fixed block size the result is reproducible
/// regardless of how many threads ran stage one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reducer {
    block_size: usize,
}

impl Default for Reducer {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

impl Reducer {
    pub fn new(block_size: usize) -> Self {
        assert!(block_size > 0, "block size must be > 0");
        Self { block_size }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of stage-one partials for `len` elements.
    pub fn partial_blocks(&self, len: usize) -> usize {
        pad_up(len, self.block_size) / self.block_size
    }

    /// Largest magnitude, or NaN if any value is NaN.
    pub fn max_abs(&self, values: &[f32]) -> f32 {
        self.partials(values, |block| {
            block.iter().fold(0.0_f32, |acc, v| max_nan(acc, v.abs()))
        })
        .into_iter()
        .fold(0.0_f32, max_nan)
    }

    pub fn sum(&self, values: &[f32]) -> f32 {
        self.partials(values, |block| block.iter().sum::<f32>())
            .into_iter()
            .sum()
    }

    pub fn sum_squares(&self, values: &[f32]) -> f32 {
        self.partials(values, |block| block.iter().map(|v| v * v).sum::<f32>())
            .into_iter()
            .sum()
    }

    /// Minimum and maximum over the finite values; `(0, 0)` when there are
    /// none.
    ///
    /// Stage one packs the per-block minima into the first half of one buffer
    /// and the per-block maxima into the second half.
    pub fn min_max(&self, values: &[f32]) -> (f32, f32) {
        let blocks = self.partial_blocks(values.len());
        let mut packed = vec![0.0_f32; 2 * blocks];
        let (mins, maxs) = packed.split_at_mut(blocks);
        let reduce_block = |block: &[f32]| {
            block
                .iter()
                .filter(|v| v.is_finite())
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(*v), hi.max(*v))
                })
        };
        if should_parallel(values.len()) {
            values
                .par_chunks(self.block_size)
                .zip(mins.par_iter_mut().zip(maxs.par_iter_mut()))
                .for_each(|(block, (lo, hi))| {
                    (*lo, *hi) = reduce_block(block);
                });
        } else {
            for (block, (lo, hi)) in values
                .chunks(self.block_size)
                .zip(mins.iter_mut().zip(maxs.iter_mut()))
            {
                (*lo, *hi) = reduce_block(block);
            }
        }
        combine_min_max(&packed)
    }

    fn partials(
        &self,
        values: &[f32],
        reduce_block: impl Fn(&[f32]) -> f32 + Sync + Send,
    ) -> Vec<f32> {
        if should_parallel(values.len()) {
            values
                .par_chunks(self.block_size)
                .map(reduce_block)
                .collect()
        } else {
            values.chunks(self.block_size).map(reduce_block).collect()
        }
    }
}

fn max_nan(acc: f32, value: f32) -> f32 {
    if acc.is_nan() || value.is_nan() {
        f32::NAN
    } else {
        acc.max(value)
    }
}

fn combine_min_max(packed: &[f32]) -> (f32, f32) {
    let (mins, maxs) = packed.split_at(packed.len() / 2);
    let lo = mins.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = maxs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if lo > hi {
        return (0.0, 0.0);
    }
    (lo, hi)
}
