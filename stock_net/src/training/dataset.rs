use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{NetErr, Result};

/// A set of samples and targets, one per row, visited in a shuffleable order.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f64>,
    y: Array2<f64>,
    order: Vec<usize>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The samples.
    /// * `y` - The targets.
    ///
    /// # Returns
    /// A new `Dataset` or `NetErr::ShapeMismatch` if `x` and `y` don't have the same amount of rows.
    pub fn new(x: Array2<f64>, y: Array2<f64>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(NetErr::shape("target rows", y.nrows(), x.nrows()));
        }

        let order = (0..x.nrows()).collect();
        Ok(Self { x, y, order })
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView2<'_, f64> {
        self.y.view()
    }

    /// Shuffles the order the batches visit the samples in.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
    }

    /// Iterates the samples in the current order, `batch_size` at a time. The last batch
    /// may be smaller.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (Array2<f64>, Array2<f64>)> + '_ {
        self.order.chunks(batch_size.get()).map(|rows| {
            let x = self.x.select(Axis(0), rows);
            let y = self.y.select(Axis(0), rows);
            (x, y)
        })
    }

    /// Splits the samples in a training and a validation partition.
    ///
    /// The samples are permuted with a generator seeded with `seed` and the first
    /// `floor(len * fraction)` of them make up the validation partition.
    ///
    /// # Arguments
    /// * `fraction` - The share of samples held out for validation, in `[0, 1)`.
    /// * `seed` - The seed of the permutation.
    ///
    /// # Returns
    /// The training partition and the validation one, `None` if it would be empty.
    pub fn split(&self, fraction: f64, seed: u64) -> Result<(Dataset, Option<Dataset>)> {
        if !(0. ..1.).contains(&fraction) {
            return Err(NetErr::config(format!(
                "validation split must be in [0, 1), got {fraction}"
            )));
        }

        let mut perm: Vec<usize> = (0..self.x.nrows()).collect();
        perm.shuffle(&mut StdRng::seed_from_u64(seed));

        let n_val = (self.x.nrows() as f64 * fraction) as usize;
        let (val_rows, train_rows) = perm.split_at(n_val);

        let train = self.subset(train_rows);
        let val = (!val_rows.is_empty()).then(|| self.subset(val_rows));

        Ok((train, val))
    }

    fn subset(&self, rows: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select(Axis(0), rows),
            y: self.y.select(Axis(0), rows),
            order: (0..rows.len()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn dataset(n: usize) -> Dataset {
        let x = Array2::from_shape_fn((n, 2), |(r, c)| (r * 2 + c) as f64);
        let y = Array2::from_shape_fn((n, 1), |(r, _)| r as f64);
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn rejects_different_row_counts() {
        let res = Dataset::new(Array2::zeros((3, 2)), Array2::zeros((2, 1)));
        assert!(matches!(res, Err(NetErr::ShapeMismatch { .. })));
    }

    #[test]
    fn batches_cover_every_sample_once() {
        let mut data = dataset(10);
        data.shuffle(&mut StdRng::seed_from_u64(3));

        let batch_size = NonZeroUsize::new(4).unwrap();
        let sizes: Vec<_> = data.batches(batch_size).map(|(x, _)| x.nrows()).collect();
        assert_eq!(sizes, [4, 4, 2]);

        let mut seen: Vec<usize> = data
            .batches(batch_size)
            .flat_map(|(_, y)| y.iter().map(|&v| v as usize).collect::<Vec<_>>())
            .collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn batches_keep_samples_and_targets_aligned() {
        let mut data = dataset(6);
        data.shuffle(&mut StdRng::seed_from_u64(8));

        for (x, y) in data.batches(NonZeroUsize::new(4).unwrap()) {
            for (xr, yr) in x.rows().into_iter().zip(y.rows()) {
                assert_eq!(xr[0], yr[0] * 2.);
            }
        }
    }

    #[test]
    fn split_sizes_follow_the_fraction() {
        let data = dataset(10);

        let (train, val) = data.split(0.2, 42).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(val.map(|v| v.len()), Some(2));

        let (train, val) = data.split(0., 42).unwrap();
        assert_eq!(train.len(), 10);
        assert!(val.is_none());
    }

    #[test]
    fn split_is_reproducible_and_disjoint() {
        let data = dataset(20);

        let (train_a, val_a) = data.split(0.25, 42).unwrap();
        let (train_b, val_b) = data.split(0.25, 42).unwrap();
        let (val_a, val_b) = (val_a.unwrap(), val_b.unwrap());

        assert_eq!(train_a.y(), train_b.y());
        assert_eq!(val_a.y(), val_b.y());

        let mut all: Vec<usize> = train_a
            .y()
            .iter()
            .chain(val_a.y().iter())
            .map(|&v| v as usize)
            .collect();
        all.sort();
        assert_eq!(all, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn split_rejects_out_of_range_fractions() {
        let data = Dataset::new(array![[1.]], array![[1.]]).unwrap();
        assert!(data.split(1., 42).is_err());
        assert!(data.split(-0.5, 42).is_err());
    }
}
