//! # Chemistry Module
//!
//! Chemical formulae, species and reactions: everything needed to turn strings like
//! "Ca(OH)2" or "NH3 + CH3OH = CH3NH2 + H2O" into numbers.
//!
//! - `molmass`: atomic composition and molar mass of a formula, element composition matrix
//! - `equation`: splitting of `reactants = products` equations into terms
//! - `species`: species values and the registry handing out `SpeciesId`s
//! - `reaction`: stoichiometric matrix of a set of elementary equations
//! - `balancer`: least-squares balancing of a single equation
///  ```
/// use StoichFlow::Chemistry::balancer::balance_equation_string;
/// let balanced = balance_equation_string("H2 + O2 = H2O").unwrap();
/// assert_eq!(balanced, "H2 + 0.50O2 = H2O");
/// ```
pub mod balancer;
pub mod equation;
/// Module to calculate the atomic composition and molar mass of a chemical formula
pub mod molmass;
pub mod reaction;
pub mod species;
