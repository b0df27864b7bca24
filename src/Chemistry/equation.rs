//! Splitting of reaction equations like "CH4 + 2O2 = CO2 + 2H2O" into sides and terms.
//! Shared by the reaction model and the equation balancer.
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

// [FLOAT] FORMULA, formula starts with a letter or a bracket
static TERM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?|\.\d+)?\s*([A-Za-z(\[][^\s]*)$").expect("term regex is valid")
});

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EquationError {
    #[error("malformed equation `{equation}`: expected exactly one `=`, found {found}")]
    MalformedEquation { equation: String, found: usize },
    #[error("invalid term `{term}` in equation `{equation}`")]
    InvalidTerm { equation: String, term: String },
}

/// one `[coefficient]formula` entry of an equation side
#[derive(Debug, Clone, PartialEq)]
pub struct EquationTerm<'a> {
    pub coefficient: Option<f64>,
    pub formula: &'a str,
}

impl EquationTerm<'_> {
    /// coefficient with the implicit 1
    pub fn coefficient_or_one(&self) -> f64 {
        self.coefficient.unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquationSides<'a> {
    pub reactants: Vec<EquationTerm<'a>>,
    pub products: Vec<EquationTerm<'a>>,
}

impl<'a> EquationSides<'a> {
    /// reactants followed by products
    pub fn all_terms(&self) -> impl Iterator<Item = &EquationTerm<'a>> {
        self.reactants.iter().chain(self.products.iter())
    }
}

pub fn parse_term<'a>(equation: &str, term: &'a str) -> Result<EquationTerm<'a>, EquationError> {
    let trimmed = term.trim();
    let invalid = || EquationError::InvalidTerm {
        equation: equation.to_string(),
        term: term.to_string(),
    };
    let captures = TERM_REGEX.captures(trimmed).ok_or_else(invalid)?;
    let coefficient = match captures.get(1) {
        Some(m) => Some(m.as_str().parse::<f64>().map_err(|_| invalid())?),
        None => None,
    };
    let formula = captures.get(2).ok_or_else(invalid)?.as_str();
    Ok(EquationTerm {
        coefficient,
        formula,
    })
}

fn parse_side<'a>(equation: &str, side: &'a str) -> Result<Vec<EquationTerm<'a>>, EquationError> {
    side.split('+')
        .map(|term| parse_term(equation, term))
        .collect()
}

/// splits `reactants = products`, each side on `+`
pub fn split_equation(equation: &str) -> Result<EquationSides<'_>, EquationError> {
    let found = equation.matches('=').count();
    if found != 1 {
        return Err(EquationError::MalformedEquation {
            equation: equation.to_string(),
            found,
        });
    }
    let (left, right) = equation
        .split_once('=')
        .ok_or_else(|| EquationError::MalformedEquation {
            equation: equation.to_string(),
            found,
        })?;
    Ok(EquationSides {
        reactants: parse_side(equation, left)?,
        products: parse_side(equation, right)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        let sides = split_equation("A + 2B = C").unwrap();
        assert_eq!(sides.reactants.len(), 2);
        assert_eq!(sides.products.len(), 1);
        assert_eq!(sides.reactants[0].formula, "A");
        assert_eq!(sides.reactants[0].coefficient, None);
        assert_eq!(sides.reactants[1].formula, "B");
        assert_eq!(sides.reactants[1].coefficient, Some(2.0));
        assert_eq!(sides.products[0].coefficient_or_one(), 1.0);
    }

    #[test]
    fn test_whitespace_and_fractions() {
        let sides = split_equation("0.5 O2+H2=H2O").unwrap();
        assert_eq!(sides.reactants[0].coefficient, Some(0.5));
        assert_eq!(sides.reactants[0].formula, "O2");
        let sides = split_equation(".25CH4 = .25 C + 0.5H2").unwrap();
        assert_eq!(sides.reactants[0].coefficient, Some(0.25));
        assert_eq!(sides.products[1].coefficient, Some(0.5));
    }

    #[test]
    fn test_brackets_start_formula() {
        let sides = split_equation("2(CH3)2NH = Ca(OH)2").unwrap();
        assert_eq!(sides.reactants[0].formula, "(CH3)2NH");
        assert_eq!(sides.reactants[0].coefficient, Some(2.0));
        let names: Vec<&str> = sides.all_terms().map(|t| t.formula).collect();
        assert_eq!(names, vec!["(CH3)2NH", "Ca(OH)2"]);
    }

    #[test]
    fn test_malformed_equations() {
        assert_eq!(
            split_equation("A + B"),
            Err(EquationError::MalformedEquation {
                equation: "A + B".to_string(),
                found: 0
            })
        );
        assert!(matches!(
            split_equation("A = B = C"),
            Err(EquationError::MalformedEquation { found: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_terms() {
        for equation in ["A + = C", "= C", "A =", "2 = C", "A + 3 4B = C"] {
            assert!(
                matches!(
                    split_equation(equation),
                    Err(EquationError::InvalidTerm { .. })
                ),
                "{} should be rejected",
                equation
            );
        }
    }
}
