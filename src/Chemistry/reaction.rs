//! Reaction model: a set of elementary equations over registered species, turned into a
//! signed stoichiometric matrix.
//!
//! Rows are species in order of first appearance (equation by equation, reactants before
//! products). Column j < k holds the coefficient of the species in elementary reaction j
//! (negative for reactants, positive for products). The last column k is the row-wise sum
//! of the elementary columns: the net coefficient of the species over all reactions.
//!
//! ```
//! use StoichFlow::Chemistry::reaction::Reaction;
//! use StoichFlow::Chemistry::species::{Species, SpeciesRegistry};
//! let mut registry = SpeciesRegistry::new();
//! for abbr in ["A", "B", "C"] {
//!     registry.register(Species::new(abbr, abbr)).unwrap();
//! }
//! let reaction = Reaction::parse(&registry, &["A + 2B = C"], None).unwrap();
//! let first: Vec<f64> = reaction.elementary_matrix().column(0).iter().copied().collect();
//! assert_eq!(first, vec![-1.0, -2.0, 1.0]);
//! ```
use crate::Chemistry::equation::{EquationError, split_equation};
use crate::Chemistry::molmass::{FormulaError, parse_formula};
use crate::Chemistry::species::{SpeciesId, SpeciesRegistry};
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReactionId(pub usize);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReactionError {
    #[error(transparent)]
    Equation(#[from] EquationError),
    #[error("unknown species `{abbreviation}` in equation `{equation}`")]
    UnknownSpecies {
        abbreviation: String,
        equation: String,
    },
    #[error("reaction has no equations")]
    NoEquations,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    comment: Option<String>,
    equations: Vec<String>,
    species: Vec<SpeciesId>,
    stoich_matrix: DMatrix<f64>,
}

impl Reaction {
    /// parses every equation against the registry; no species are created here
    pub fn parse<S: AsRef<str>>(
        registry: &SpeciesRegistry,
        equations: &[S],
        comment: Option<&str>,
    ) -> Result<Reaction, ReactionError> {
        if equations.is_empty() {
            return Err(ReactionError::NoEquations);
        }
        let k = equations.len();
        let mut species: Vec<SpeciesId> = Vec::new();
        let mut rows: HashMap<SpeciesId, usize> = HashMap::new();
        // (row, column, signed coefficient)
        let mut entries: Vec<(usize, usize, f64)> = Vec::new();
        for (j, equation) in equations.iter().enumerate() {
            let equation = equation.as_ref();
            let sides = split_equation(equation)?;
            let signed = sides
                .reactants
                .iter()
                .map(|term| (term, -1.0))
                .chain(sides.products.iter().map(|term| (term, 1.0)));
            for (term, sign) in signed {
                let id = registry.id_of(term.formula).map_err(|_| {
                    ReactionError::UnknownSpecies {
                        abbreviation: term.formula.to_string(),
                        equation: equation.to_string(),
                    }
                })?;
                let row = *rows.entry(id).or_insert_with(|| {
                    species.push(id);
                    species.len() - 1
                });
                entries.push((row, j, sign * term.coefficient_or_one()));
            }
            debug!("equation {} parsed: {}", j, equation);
        }

        let mut stoich_matrix = DMatrix::zeros(species.len(), k + 1);
        for (row, col, value) in entries {
            // a species repeated within one equation is summed
            stoich_matrix[(row, col)] += value;
        }
        for i in 0..species.len() {
            let total: f64 = (0..k).map(|j| stoich_matrix[(i, j)]).sum();
            stoich_matrix[(i, k)] = total;
        }
        info!(
            "reaction with {} equations over {} species parsed",
            k,
            species.len()
        );
        Ok(Reaction {
            comment: comment.map(|c| c.to_string()),
            equations: equations.iter().map(|e| e.as_ref().to_string()).collect(),
            species,
            stoich_matrix,
        })
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn equations(&self) -> &[String] {
        &self.equations
    }

    /// species in row order
    pub fn species(&self) -> &[SpeciesId] {
        &self.species
    }

    pub fn num_reactions(&self) -> usize {
        self.equations.len()
    }

    /// species × (k + 1), the last column is the aggregate
    pub fn stoich_matrix(&self) -> &DMatrix<f64> {
        &self.stoich_matrix
    }

    /// species × k, the matrix E of the mass balance
    pub fn elementary_matrix(&self) -> DMatrix<f64> {
        self.stoich_matrix.columns(0, self.num_reactions()).into_owned()
    }

    pub fn aggregate_column(&self) -> DVector<f64> {
        self.stoich_matrix.column(self.num_reactions()).into_owned()
    }

    pub fn row_of(&self, id: SpeciesId) -> Option<usize> {
        self.species.iter().position(|s| *s == id)
    }

    pub fn contains(&self, id: SpeciesId) -> bool {
        self.row_of(id).is_some()
    }

    /// coefficient of a species in elementary reaction j, 0 for species not taking part
    pub fn coefficient(&self, id: SpeciesId, j: usize) -> f64 {
        match self.row_of(id) {
            Some(row) if j < self.num_reactions() => self.stoich_matrix[(row, j)],
            _ => 0.0,
        }
    }

    pub fn net_coefficient(&self, id: SpeciesId) -> f64 {
        self.row_of(id)
            .map_or(0.0, |row| self.stoich_matrix[(row, self.num_reactions())])
    }

    /// elements × reactions matrix of atom residuals; all zeros for a conserving reaction set.
    /// Every species abbreviation must be a formula.
    pub fn element_imbalance(
        &self,
        registry: &SpeciesRegistry,
    ) -> Result<(DMatrix<f64>, Vec<String>), FormulaError> {
        let mut elements: Vec<String> = Vec::new();
        let mut compositions = Vec::with_capacity(self.species.len());
        for id in &self.species {
            let composition = parse_formula(registry.abbreviation_of(*id))?;
            let mut keys: Vec<&String> = composition.keys().collect();
            keys.sort();
            for key in keys {
                if !elements.contains(key) {
                    elements.push(key.clone());
                }
            }
            compositions.push(composition);
        }
        let k = self.num_reactions();
        let mut imbalance = DMatrix::zeros(elements.len(), k);
        for (e, element) in elements.iter().enumerate() {
            for j in 0..k {
                imbalance[(e, j)] = compositions
                    .iter()
                    .enumerate()
                    .map(|(row, composition)| {
                        composition.get(element).map_or(0.0, |c| *c as f64)
                            * self.stoich_matrix[(row, j)]
                    })
                    .sum();
            }
        }
        Ok((imbalance, elements))
    }

    pub fn to_table(&self, registry: &SpeciesRegistry) -> Table {
        let mut table = Table::new();
        let k = self.num_reactions();
        let mut header = vec![Cell::new("species")];
        header.extend((0..k).map(|j| Cell::new(&format!("r{}", j))));
        header.push(Cell::new("net"));
        table.add_row(Row::new(header));
        for (row, id) in self.species.iter().enumerate() {
            let mut cells = vec![Cell::new(registry.abbreviation_of(*id))];
            cells.extend(
                (0..=k).map(|j| Cell::new(&format!("{}", self.stoich_matrix[(row, j)]))),
            );
            table.add_row(Row::new(cells));
        }
        table
    }

    pub fn pretty_print(&self, registry: &SpeciesRegistry) {
        if let Some(comment) = &self.comment {
            println!("\n=== {} ===", comment);
        }
        for (j, equation) in self.equations.iter().enumerate() {
            println!("r{}: {}", j, equation);
        }
        self.to_table(registry).printstd();
    }
}
