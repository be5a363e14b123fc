//! Small dense solvers for the normal equations

/// Accumulates `XᵀX` and `Xᵀy` one observation at a time.
/// Matrices are row-major in a flat `Vec`.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    n: usize,
    xtx: Vec<f64>,
    xty: Vec<f64>,
}

impl NormalEquations {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            xtx: vec![0.0; n * n],
            xty: vec![0.0; n],
        }
    }

    pub fn add_observation(&mut self, features: &[f64], y: f64) {
        let n = self.n;
        for i in 0..n {
            let fi = features[i];
            if fi == 0.0 {
                continue;
            }
            self.xty[i] += fi * y;
            for j in i..n {
                self.xtx[i * n + j] += fi * features[j];
            }
        }
    }

    /// Solve `(XᵀX + diag(penalty)) β = Xᵀy`. `None` when the system is not
    /// positive definite.
    pub fn solve_ridge(&self, penalty: &[f64]) -> Option<Vec<f64>> {
        let n = self.n;
        let mut a = self.xtx.clone();
        // Only the upper triangle was accumulated
        for i in 0..n {
            for j in 0..i {
                a[i * n + j] = a[j * n + i];
            }
            a[i * n + i] += penalty[i];
        }
        cholesky_solve(&mut a, &self.xty, n)
    }
}

/// Solve `A x = b` for symmetric positive definite `A` (n×n, row-major).
/// `a` is overwritten with its Cholesky factor.
pub fn cholesky_solve(a: &mut [f64], b: &[f64], n: usize) -> Option<Vec<f64>> {
    for j in 0..n {
        let mut diag = a[j * n + j];
        for k in 0..j {
            diag -= a[j * n + k] * a[j * n + k];
        }
        if diag.is_nan() || diag <= 1e-12 {
            return None;
        }
        let ljj = diag.sqrt();
        a[j * n + j] = ljj;

        for i in (j + 1)..n {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= a[i * n + k] * a[j * n + k];
            }
            a[i * n + j] = sum / ljj;
        }
    }

    // L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= a[i * n + k] * z[k];
        }
        z[i] = sum / a[i * n + i];
    }

    // Lᵀ x = z
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= a[k * n + i] * x[k];
        }
        x[i] = sum / a[i * n + i];
    }

    Some(x)
}

/// Two-sided z-score for an interval width (approximate)
pub fn z_score(interval_width: f64) -> f64 {
    match interval_width {
        x if x >= 0.99 => 2.576,
        x if x >= 0.95 => 1.96,
        x if x >= 0.90 => 1.645,
        x if x >= 0.80 => 1.2816,
        x if x >= 0.50 => 0.6745,
        _ => 1.2816,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cholesky_solves_spd_system() {
        // [[4, 2], [2, 3]] x = [2, 1]  ->  x = [0.5, 0]
        let mut a = vec![4.0, 2.0, 2.0, 3.0];
        let x = cholesky_solve(&mut a, &[2.0, 1.0], 2).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_singular() {
        let mut a = vec![1.0, 1.0, 1.0, 1.0];
        assert!(cholesky_solve(&mut a, &[1.0, 1.0], 2).is_none());
    }

    #[test]
    fn test_normal_equations_recover_line() {
        let mut eq = NormalEquations::new(2);
        for i in 0..10 {
            let t = i as f64;
            eq.add_observation(&[1.0, t], 3.0 + 2.0 * t);
        }
        let beta = eq.solve_ridge(&[0.0, 0.0]).unwrap();
        assert!((beta[0] - 3.0).abs() < 1e-9);
        assert!((beta[1] - 2.0).abs() < 1e-9);
    }
}
