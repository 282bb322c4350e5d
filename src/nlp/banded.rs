//! Band LU factorization with partial pivoting
//!
//! Storage keeps, for every row `i`, the columns `i - kl ..= i + kl + ku`.
//! The extra `kl` upper diagonals hold the fill created by row interchanges,
//! so the factorization never leaves the band.

/// Square band matrix assembled entry by entry
#[derive(Debug, Clone)]
pub struct BandMatrix {
    n: usize,
    kl: usize,
    ku: usize,
    width: usize,
    data: Vec<f64>,
}

impl BandMatrix {
    /// Zero matrix of dimension `n` with `kl` sub- and `ku` super-diagonals
    pub fn zeros(n: usize, kl: usize, ku: usize) -> Self {
        let width = 2 * kl + ku + 1;
        BandMatrix { n, kl, ku, width, data: vec![0.0; n * width] }
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    fn offset(&self, i: usize, j: usize) -> Option<usize> {
        if i >= self.n || j >= self.n || j + self.kl < i || j > i + self.kl + self.ku {
            return None;
        }
        Some(i * self.width + (j + self.kl - i))
    }

    /// Accumulate `value` into `(i, j)`. Returns false when outside the band.
    pub fn add(&mut self, i: usize, j: usize, value: f64) -> bool {
        // entries above the original upper band are reserved for fill-in
        if j > i + self.ku {
            return false;
        }
        match self.offset(i, j) {
            Some(k) => {
                self.data[k] += value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.offset(i, j).map_or(0.0, |k| self.data[k])
    }

    /// Factorize in place. `None` when a zero or non-finite pivot shows up.
    pub fn factorize(mut self) -> Option<BandedLu> {
        let n = self.n;
        let kl = self.kl;
        let ku_fill = self.kl + self.ku;
        let w = self.width;
        let at = |i: usize, j: usize| i * w + (j + kl - i);
        let mut piv = vec![0; n];

        for k in 0..n {
            let last_row = (k + kl).min(n.saturating_sub(1));
            let last_col = (k + ku_fill).min(n.saturating_sub(1));

            let mut p = k;
            let mut max = self.data[at(k, k)].abs();
            for i in k + 1..=last_row {
                let v = self.data[at(i, k)].abs();
                if v > max {
                    max = v;
                    p = i;
                }
            }
            if max == 0.0 || !max.is_finite() {
                return None;
            }
            piv[k] = p;

            if p != k {
                for j in k..=last_col {
                    self.data.swap(at(k, j), at(p, j));
                }
            }

            let pivot = self.data[at(k, k)];
            for i in k + 1..=last_row {
                let l = self.data[at(i, k)] / pivot;
                self.data[at(i, k)] = l;
                if l != 0.0 {
                    for j in k + 1..=last_col {
                        self.data[at(i, j)] -= l * self.data[at(k, j)];
                    }
                }
            }
        }

        Some(BandedLu { n, kl, ku_fill, width: w, data: self.data, piv })
    }
}

/// Factors `P A = L U` of a [`BandMatrix`]
#[derive(Debug, Clone)]
pub struct BandedLu {
    n: usize,
    kl: usize,
    ku_fill: usize,
    width: usize,
    data: Vec<f64>,
    piv: Vec<usize>,
}

impl BandedLu {
    fn at(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.width + (j + self.kl - i)]
    }

    /// Overwrite `b` with the solution of `A x = b`
    pub fn solve_in_place(&self, b: &mut [f64]) {
        let n = self.n;
        debug_assert_eq!(b.len(), n);

        for k in 0..n {
            let p = self.piv[k];
            if p != k {
                b.swap(k, p);
            }
            let bk = b[k];
            if bk != 0.0 {
                for i in k + 1..=(k + self.kl).min(n - 1) {
                    b[i] -= self.at(i, k) * bk;
                }
            }
        }

        for k in (0..n).rev() {
            let mut s = b[k];
            for j in k + 1..=(k + self.ku_fill).min(n - 1) {
                s -= self.at(k, j) * b[j];
            }
            b[k] = s / self.at(k, k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, DVector};

    fn dense_solve(a: &DMatrix<f64>, b: &[f64]) -> DVector<f64> {
        a.clone().lu().solve(&DVector::from_column_slice(b)).unwrap()
    }

    #[test]
    fn test_tridiagonal_matches_dense() {
        let n = 9;
        let mut band = BandMatrix::zeros(n, 1, 1);
        let mut dense = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            assert!(band.add(i, i, 4.0 + i as f64));
            dense[(i, i)] = 4.0 + i as f64;
            if i + 1 < n {
                assert!(band.add(i, i + 1, -1.0));
                assert!(band.add(i + 1, i, 0.5 * i as f64 - 1.0));
                dense[(i, i + 1)] = -1.0;
                dense[(i + 1, i)] = 0.5 * i as f64 - 1.0;
            }
        }
        let rhs: Vec<f64> = (0..n).map(|i| (i as f64).sin() + 1.0).collect();
        let expected = dense_solve(&dense, &rhs);

        let lu = band.factorize().unwrap();
        let mut x = rhs.clone();
        lu.solve_in_place(&mut x);
        for i in 0..n {
            assert!((x[i] - expected[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_zero_diagonal_needs_pivoting() {
        // saddle-point block [[2, 1], [1, 0]] repeated along a chain
        let n = 6;
        let mut band = BandMatrix::zeros(n, 2, 2);
        let mut dense = DMatrix::<f64>::zeros(n, n);
        for blk in 0..n / 2 {
            let (a, c) = (2 * blk, 2 * blk + 1);
            for &(i, j, v) in &[(a, a, 2.0), (a, c, 1.0), (c, a, 1.0)] {
                assert!(band.add(i, j, v));
                dense[(i, j)] += v;
            }
            if blk + 1 < n / 2 {
                let next = a + 2;
                assert!(band.add(c, next, 1.0));
                assert!(band.add(next, c, 1.0));
                dense[(c, next)] += 1.0;
                dense[(next, c)] += 1.0;
            }
        }
        let rhs = [1.0, -2.0, 0.5, 3.0, -1.0, 0.25];
        let expected = dense_solve(&dense, &rhs);

        let lu = band.factorize().unwrap();
        let mut x = rhs.to_vec();
        lu.solve_in_place(&mut x);
        for i in 0..n {
            assert!((x[i] - expected[i]).abs() < 1e-10, "{} vs {}", x[i], expected[i]);
        }
    }

    #[test]
    fn test_entries_outside_band_rejected() {
        let mut band = BandMatrix::zeros(5, 1, 1);
        assert!(!band.add(0, 3, 1.0));
        assert!(!band.add(4, 1, 1.0));
        assert!(band.add(2, 3, 1.0));
        assert_eq!(band.get(2, 3), 1.0);
        assert_eq!(band.get(0, 4), 0.0);
    }

    #[test]
    fn test_singular_matrix_detected() {
        let mut band = BandMatrix::zeros(3, 1, 1);
        band.add(0, 0, 1.0);
        band.add(1, 1, 1.0);
        assert!(band.factorize().is_none());
    }
}
