//! Linear least-squares backends for the balancer and the reactor mass balance.
//! Both solve A·x = b for a dense `DMatrix` and return the least-squares solution
//! when the system is overdetermined.
use crate::settings::{Settings, SolverKind};
use enum_dispatch::enum_dispatch;
use log::debug;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("matrix has {rows} rows but right-hand side has {rhs} entries")]
    DimensionMismatch { rows: usize, rhs: usize },
    #[error("empty linear system")]
    EmptySystem,
    #[error("matrix is rank deficient: rank {rank} < {cols} unknowns")]
    RankDeficient { rank: usize, cols: usize },
    #[error("decomposition failed: {0}")]
    Decomposition(String),
    #[error("solution contains non-finite values")]
    NonFinite,
}

fn check_system(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<(), SolverError> {
    if a.nrows() == 0 || a.ncols() == 0 {
        return Err(SolverError::EmptySystem);
    }
    if a.nrows() != b.len() {
        return Err(SolverError::DimensionMismatch {
            rows: a.nrows(),
            rhs: b.len(),
        });
    }
    Ok(())
}

fn check_finite(x: DVector<f64>) -> Result<DVector<f64>, SolverError> {
    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(SolverError::NonFinite)
    }
}

#[enum_dispatch]
pub trait LinearSolver {
    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolverError>;
    fn name(&self) -> &'static str;
}

/// SVD pseudo-inverse: least squares for overdetermined systems, minimum norm for
/// underdetermined or rank deficient ones
#[derive(Debug, Clone, PartialEq)]
pub struct SvdSolver {
    pub epsilon: f64,
}

impl Default for SvdSolver {
    fn default() -> Self {
        Self { epsilon: 1e-12 }
    }
}

impl LinearSolver for SvdSolver {
    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        check_system(a, b)?;
        let svd = a.clone().svd(true, true);
        debug!(
            "SVD of {}x{} system, rank {}",
            a.nrows(),
            a.ncols(),
            svd.rank(self.epsilon)
        );
        let x = svd
            .solve(b, self.epsilon)
            .map_err(|e| SolverError::Decomposition(e.to_string()))?;
        check_finite(x)
    }

    fn name(&self) -> &'static str {
        "SVD"
    }
}

/// Householder QR, needs at least as many equations as unknowns and full column rank
#[derive(Debug, Clone, PartialEq)]
pub struct QrSolver {
    pub rank_tolerance: f64,
}

impl Default for QrSolver {
    fn default() -> Self {
        Self {
            rank_tolerance: 1e-10,
        }
    }
}

impl LinearSolver for QrSolver {
    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        check_system(a, b)?;
        let (m, n) = a.shape();
        if m < n {
            return Err(SolverError::RankDeficient { rank: m, cols: n });
        }
        let qr = a.clone().qr();
        let r = qr.r();
        let rank = r
            .diagonal()
            .iter()
            .filter(|d| d.abs() > self.rank_tolerance)
            .count();
        if rank < n {
            return Err(SolverError::RankDeficient { rank, cols: n });
        }
        let qtb = qr.q().transpose() * b;
        let x = r.solve_upper_triangular(&qtb).ok_or_else(|| {
            SolverError::Decomposition("upper triangular solve failed".to_string())
        })?;
        check_finite(x)
    }

    fn name(&self) -> &'static str {
        "QR"
    }
}

#[derive(Debug, Clone, PartialEq)]
#[enum_dispatch(LinearSolver)]
pub enum SolverEnum {
    Svd(SvdSolver),
    Qr(QrSolver),
}

impl Default for SolverEnum {
    fn default() -> Self {
        SolverEnum::Svd(SvdSolver::default())
    }
}

pub fn create_solver(settings: &Settings) -> SolverEnum {
    match settings.solver {
        SolverKind::Svd => SolverEnum::Svd(SvdSolver {
            epsilon: settings.svd_epsilon,
        }),
        SolverKind::Qr => SolverEnum::Qr(QrSolver {
            rank_tolerance: settings.rank_tolerance,
        }),
    }
}

/// euclidean norm of A·x - b
pub fn residual_norm(a: &DMatrix<f64>, x: &DVector<f64>, b: &DVector<f64>) -> f64 {
    (a * x - b).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn solvers() -> Vec<SolverEnum> {
        vec![
            SolverEnum::Svd(SvdSolver::default()),
            SolverEnum::Qr(QrSolver::default()),
        ]
    }

    #[test]
    fn test_square_system() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_vec(vec![3.0, 5.0]);
        for solver in solvers() {
            let x = solver.solve(&a, &b).unwrap();
            assert_relative_eq!(x[0], 0.8, epsilon = 1e-10);
            assert_relative_eq!(x[1], 1.4, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_least_squares_line_fit() {
        // fit y = c0 + c1 t through (0,1), (1,2), (2,2)
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let b = DVector::from_vec(vec![1.0, 2.0, 2.0]);
        for solver in solvers() {
            let x = solver.solve(&a, &b).unwrap();
            assert_relative_eq!(x[0], 7.0 / 6.0, epsilon = 1e-10);
            assert_relative_eq!(x[1], 0.5, epsilon = 1e-10);
            assert!(residual_norm(&a, &x, &b) > 0.1);
        }
    }

    #[test]
    fn test_rank_deficient() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 2.0, 2.0]);
        let b = DVector::from_vec(vec![2.0, 4.0]);
        // SVD returns the minimum norm solution
        let x = SvdSolver::default().solve(&a, &b).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-10);
        assert!(matches!(
            QrSolver::default().solve(&a, &b),
            Err(SolverError::RankDeficient { rank: 1, cols: 2 })
        ));
        let wide = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        assert!(matches!(
            QrSolver::default().solve(&wide, &DVector::from_vec(vec![1.0])),
            Err(SolverError::RankDeficient { .. })
        ));
    }

    #[test]
    fn test_bad_dimensions() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        for solver in solvers() {
            assert_eq!(
                solver.solve(&a, &b),
                Err(SolverError::DimensionMismatch { rows: 2, rhs: 3 })
            );
            assert_eq!(
                solver.solve(&DMatrix::zeros(0, 0), &DVector::zeros(0)),
                Err(SolverError::EmptySystem)
            );
        }
    }

    #[test]
    fn test_create_solver_from_settings() {
        let mut settings = Settings::default();
        assert_eq!(create_solver(&settings).name(), "SVD");
        settings.solver = SolverKind::Qr;
        settings.rank_tolerance = 1e-6;
        assert_eq!(
            create_solver(&settings),
            SolverEnum::Qr(QrSolver {
                rank_tolerance: 1e-6
            })
        );
    }
}
