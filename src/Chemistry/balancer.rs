//! Balancing of reaction equations by least squares.
//!
//! For an equation with terms t_0..t_n the element conservation reads A·c = 0 where
//! A[e, i] = +count of element e in t_i for reactants and -count for products.
//! The coefficient of the first reactant is fixed to 1, its column goes to the right hand
//! side and the remaining coefficients come from the linear solver.
use crate::Chemistry::equation::{EquationError, split_equation};
use crate::Chemistry::molmass::{FormulaError, create_elem_composition_matrix};
use crate::linear_solver::{LinearSolver, SolverEnum, create_solver};
use crate::settings::Settings;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BalanceError {
    #[error(transparent)]
    Equation(#[from] EquationError),
    #[error(transparent)]
    Formula(#[from] FormulaError),
    #[error("equation `{equation}` cannot be balanced: {reason}")]
    UnbalanceableEquation { equation: String, reason: String },
}

/// balanced coefficients, reactants first, the first reactant has coefficient 1
#[derive(Debug, Clone, PartialEq)]
pub struct BalancedEquation {
    pub reactants: Vec<String>,
    pub products: Vec<String>,
    pub coefficients: Vec<f64>,
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

impl BalancedEquation {
    pub fn reactant_coefficients(&self) -> &[f64] {
        &self.coefficients[..self.reactants.len()]
    }

    pub fn product_coefficients(&self) -> &[f64] {
        &self.coefficients[self.reactants.len()..]
    }

    /// "H2 + 0.50O2 = H2O": coefficients within unity_tolerance of 1 are omitted
    pub fn render(&self, unity_tolerance: f64, precision: usize) -> String {
        let side = |formulas: &[String], coefficients: &[f64]| -> String {
            formulas
                .iter()
                .zip(coefficients)
                .map(|(formula, c)| {
                    if (c - 1.0).abs() <= unity_tolerance {
                        formula.clone()
                    } else {
                        format!("{:.*}{}", precision, c, formula)
                    }
                })
                .collect::<Vec<String>>()
                .join(" + ")
        };
        format!(
            "{} = {}",
            side(&self.reactants, self.reactant_coefficients()),
            side(&self.products, self.product_coefficients())
        )
    }

    /// smallest whole-number coefficients: the least multiplier up to max_multiplier that makes
    /// every coefficient integral within tolerance, reduced by the common divisor
    pub fn integer_coefficients(&self, max_multiplier: u64, tolerance: f64) -> Option<Vec<u64>> {
        for multiplier in 1..=max_multiplier {
            let scaled: Vec<f64> = self
                .coefficients
                .iter()
                .map(|c| c * multiplier as f64)
                .collect();
            if scaled
                .iter()
                .all(|v| *v >= 0.5 && (v - v.round()).abs() <= tolerance * v.abs().max(1.0))
            {
                let integers: Vec<u64> = scaled.iter().map(|v| v.round() as u64).collect();
                let divisor = integers.iter().fold(0, |acc, n| gcd(acc, *n));
                debug!("integral coefficients found with multiplier {}", multiplier);
                return Some(integers.iter().map(|n| n / divisor.max(1)).collect());
            }
        }
        None
    }
}

pub struct EquationBalancer {
    solver: SolverEnum,
    settings: Settings,
}

impl EquationBalancer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            solver: create_solver(settings),
            settings: settings.clone(),
        }
    }

    pub fn with_solver(solver: SolverEnum, settings: &Settings) -> Self {
        Self {
            solver,
            settings: settings.clone(),
        }
    }

    pub fn balance_equation(&self, equation: &str) -> Result<BalancedEquation, BalanceError> {
        let unbalanceable = |reason: String| BalanceError::UnbalanceableEquation {
            equation: equation.to_string(),
            reason,
        };
        // coefficients already written in the equation are ignored
        let sides = split_equation(equation)?;
        let reactants: Vec<String> = sides
            .reactants
            .iter()
            .map(|t| t.formula.to_string())
            .collect();
        let products: Vec<String> = sides
            .products
            .iter()
            .map(|t| t.formula.to_string())
            .collect();
        let formulas: Vec<&str> = sides.all_terms().map(|t| t.formula).collect();

        let (mut composition, elements) = create_elem_composition_matrix(&formulas, None)?;
        for j in reactants.len()..formulas.len() {
            for v in composition.column_mut(j).iter_mut() {
                *v = -*v;
            }
        }
        debug!(
            "balancing {} over elements {:?}:\n{}",
            equation, elements, composition
        );
        let n = formulas.len();
        if n < 2 {
            return Err(unbalanceable("at least two terms are needed".to_string()));
        }
        let a: DMatrix<f64> = composition.columns(1, n - 1).into_owned();
        let b: DVector<f64> = -composition.column(0).into_owned();
        let x = self
            .solver
            .solve(&a, &b)
            .map_err(|e| unbalanceable(e.to_string()))?;

        let mut coefficients = Vec::with_capacity(n);
        coefficients.push(1.0);
        coefficients.extend(x.iter().copied());
        let full = DVector::from_vec(coefficients.clone());
        let residual = (&composition * &full).amax();
        if residual > self.settings.balance_residual_tolerance {
            return Err(unbalanceable(format!(
                "element residual {:.3e} exceeds tolerance",
                residual
            )));
        }
        if let Some((i, c)) = coefficients.iter().enumerate().find(|(_, c)| **c <= 0.0) {
            return Err(unbalanceable(format!(
                "coefficient of `{}` is {:.3}",
                formulas[i], c
            )));
        }
        info!("{} balanced with {}", equation, self.solver.name());
        Ok(BalancedEquation {
            reactants,
            products,
            coefficients,
        })
    }

    pub fn balance(&self, equation: &str) -> Result<String, BalanceError> {
        let balanced = self.balance_equation(equation)?;
        Ok(balanced.render(
            self.settings.unity_tolerance,
            self.settings.coefficient_precision,
        ))
    }

    pub fn integer_coefficients(&self, equation: &str) -> Result<Vec<u64>, BalanceError> {
        let balanced = self.balance_equation(equation)?;
        balanced
            .integer_coefficients(
                self.settings.max_integer_multiplier,
                self.settings.integer_tolerance,
            )
            .ok_or_else(|| BalanceError::UnbalanceableEquation {
                equation: equation.to_string(),
                reason: format!(
                    "no integer coefficients with multiplier up to {}",
                    self.settings.max_integer_multiplier
                ),
            })
    }
}

/// balances with default settings and the SVD solver
pub fn balance_equation_string(equation: &str) -> Result<String, BalanceError> {
    EquationBalancer::new(&Settings::default()).balance(equation)
}
