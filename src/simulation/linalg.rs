//! Small dense complex matrices for CSI and precoding algebra.
//!
//! Matrices are row-major and tiny (antenna counts), so everything is a plain
//! `Vec<Complex64>` without any blocking or SIMD.

use num_complex::Complex64;

#[derive(Debug, Clone, PartialEq)]
pub struct CMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Complex64>,
}

impl CMatrix {
    #[cfg(test)]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Complex64::new(0.0, 0.0); rows * cols],
        }
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> Complex64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self { rows, cols, data }
    }

    /// Column vector holding `values`.
    pub fn column(values: Vec<Complex64>) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values,
        }
    }

    #[cfg(test)]
    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |r, c| if r == c { Complex64::new(1.0, 0.0) } else { Complex64::new(0.0, 0.0) })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.cols + col]
    }

    /// Entries in row-major order.
    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    /// Plain transpose, without conjugation.
    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |r, c| self.get(c, r))
    }

    /// Hermitian (conjugate) transpose.
    pub fn conj_transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |r, c| self.get(c, r).conj())
    }

    /// Matrix product `self · rhs`.
    ///
    /// # Panics
    ///
    /// If the inner dimensions differ. Shapes are fixed by the validated radio
    /// configuration, so a mismatch is a programming error.
    pub fn matmul(&self, rhs: &CMatrix) -> Self {
        assert_eq!(
            self.cols, rhs.rows,
            "matmul shape mismatch: {}x{} · {}x{}",
            self.rows, self.cols, rhs.rows, rhs.cols
        );
        Self::from_fn(self.rows, rhs.cols, |r, c| {
            let mut acc = Complex64::new(0.0, 0.0);
            for k in 0..self.cols {
                acc += self.get(r, k) * rhs.get(k, c);
            }
            acc
        })
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| *v * factor).collect(),
        }
    }

    /// Frobenius norm; the Euclidean norm for vectors and the modulus for 1x1.
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt()
    }
}
