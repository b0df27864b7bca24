//! Atomic composition and molar mass of chemical formulae.
//!
//! Formulae may contain nested groups in brackets (Ca(OH)2, K4(Fe(CN)6)), a trailing phase
//! mark (H2O(g)) and user-defined chemical groups (Me, Ph, ...).
use log::debug;
use nalgebra::DMatrix;
use std::collections::HashMap;
use thiserror::Error;

/// groups of atoms may be nested at most this deep, e.g. Ca(OH)2 has depth 1
pub const MAX_GROUP_DEPTH: usize = 16;

/// user-defined chemical groups, e.g. { "Me":{"C":1, "H":3}}
pub type ChemicalGroups = HashMap<String, HashMap<String, usize>>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("unknown element `{element}` in formula `{formula}`")]
    UnknownElement { element: String, formula: String },
    #[error("malformed formula `{formula}` at position {position}: {reason}")]
    MalformedFormula {
        formula: String,
        position: usize,
        reason: String,
    },
}

// Define a struct to hold element data
pub struct Element {
    pub symbol: &'static str,
    pub atomic_mass: f64,
}

impl Element {
    const fn new(symbol: &'static str, atomic_mass: f64) -> Self {
        Self {
            symbol,
            atomic_mass,
        }
    }
}

// standard atomic weights, g/mol
pub const ELEMENTS: &[Element] = &[
    Element::new("H", 1.008),
    Element::new("He", 4.0026),
    Element::new("Li", 6.94),
    Element::new("Be", 9.0122),
    Element::new("B", 10.81),
    Element::new("C", 12.011),
    Element::new("N", 14.007),
    Element::new("O", 15.999),
    Element::new("F", 18.998),
    Element::new("Ne", 20.18),
    Element::new("Na", 22.99),
    Element::new("Mg", 24.305),
    Element::new("Al", 26.982),
    Element::new("Si", 28.085),
    Element::new("P", 30.974),
    Element::new("S", 32.065),
    Element::new("Cl", 35.45),
    Element::new("Ar", 39.948),
    Element::new("K", 39.098),
    Element::new("Ca", 40.078),
    Element::new("Sc", 44.9559),
    Element::new("Ti", 47.867),
    Element::new("V", 50.9415),
    Element::new("Cr", 51.9961),
    Element::new("Mn", 54.938),
    Element::new("Fe", 55.845),
    Element::new("Co", 58.933),
    Element::new("Ni", 58.6934),
    Element::new("Cu", 63.546),
    Element::new("Zn", 65.38),
    Element::new("Ga", 69.723),
    Element::new("Ge", 72.63),
    Element::new("As", 74.9216),
    Element::new("Se", 78.971),
    Element::new("Br", 79.904),
    Element::new("Kr", 83.798),
    Element::new("Rb", 85.4678),
    Element::new("Sr", 87.62),
    Element::new("Y", 88.9059),
    Element::new("Zr", 91.224),
    Element::new("Nb", 92.9064),
    Element::new("Mo", 95.95),
    Element::new("Tc", 98.0),
    Element::new("Ru", 101.07),
    Element::new("Rh", 102.9055),
    Element::new("Pd", 106.42),
    Element::new("Ag", 107.8682),
    Element::new("Cd", 112.414),
    Element::new("In", 114.818),
    Element::new("Sn", 118.71),
    Element::new("Sb", 121.76),
    Element::new("Te", 127.6),
    Element::new("I", 126.9045),
    Element::new("Xe", 131.293),
    Element::new("Cs", 132.9055),
    Element::new("Ba", 137.327),
    Element::new("La", 138.9055),
    Element::new("Ce", 140.116),
    Element::new("Pr", 140.9077),
    Element::new("Nd", 144.242),
    Element::new("Pm", 145.0),
    Element::new("Sm", 150.36),
    Element::new("Eu", 151.964),
    Element::new("Gd", 157.25),
    Element::new("Tb", 158.9254),
    Element::new("Dy", 162.5),
    Element::new("Ho", 164.9303),
    Element::new("Er", 167.259),
    Element::new("Tm", 168.9342),
    Element::new("Yb", 173.054),
    Element::new("Lu", 174.9668),
    Element::new("Hf", 178.49),
    Element::new("Ta", 180.9479),
    Element::new("W", 183.84),
    Element::new("Re", 186.207),
    Element::new("Os", 190.23),
    Element::new("Ir", 192.217),
    Element::new("Pt", 195.084),
    Element::new("Au", 196.9666),
    Element::new("Hg", 200.592),
    Element::new("Tl", 204.3835),
    Element::new("Pb", 207.2),
    Element::new("Bi", 208.9804),
    Element::new("Po", 209.0),
    Element::new("At", 210.0),
    Element::new("Rn", 222.0),
    Element::new("Fr", 223.0),
    Element::new("Ra", 226.0),
    Element::new("Ac", 227.0),
    Element::new("Th", 232.0377),
    Element::new("Pa", 231.0359),
    Element::new("U", 238.0289),
    Element::new("Np", 237.0),
    Element::new("Pu", 244.0),
    Element::new("Am", 243.0),
    Element::new("Cm", 247.0),
    Element::new("Bk", 247.0),
    Element::new("Cf", 251.0),
    Element::new("Es", 252.0),
    Element::new("Fm", 257.0),
    Element::new("Md", 258.0),
    Element::new("No", 259.0),
    Element::new("Lr", 262.0),
    Element::new("Rf", 267.0),
    Element::new("Db", 268.0),
    Element::new("Sg", 271.0),
    Element::new("Bh", 272.0),
    Element::new("Hs", 270.0),
    Element::new("Mt", 276.0),
    Element::new("Ds", 281.0),
    Element::new("Rg", 280.0),
    Element::new("Cn", 285.0),
    Element::new("Nh", 284.0),
    Element::new("Fl", 289.0),
    Element::new("Mc", 288.0),
    Element::new("Lv", 293.0),
    Element::new("Ts", 292.0),
    Element::new("Og", 295.0),
];

/// atomic mass of an element symbol, None if the symbol is not in the periodic table
pub fn atomic_mass(symbol: &str) -> Option<f64> {
    ELEMENTS
        .iter()
        .find(|element| element.symbol == symbol)
        .map(|element| element.atomic_mass)
}

// phase marks like H2O(g) or NaCl(aq) carry no atoms
fn filter_phase_marks(formula: &str) -> &str {
    let phases = ["(aq)", "(c)", "(l)", "(g)", "(s)"];
    for phase in phases {
        let Some(split) = formula.len().checked_sub(phase.len()) else {
            continue;
        };
        if let (Some(head), Some(tail)) = (formula.get(..split), formula.get(split..)) {
            if tail.eq_ignore_ascii_case(phase) {
                return head;
            }
        }
    }
    formula
}

/// recursive-descent parser over the grammar
///   formula := token*
///   token   := Element [count] | '(' formula ')' [count]
struct FormulaParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
    groups: Option<&'a ChemicalGroups>,
}

impl<'a> FormulaParser<'a> {
    fn new(source: &'a str, cleaned: &str, groups: Option<&'a ChemicalGroups>) -> Self {
        Self {
            source,
            chars: cleaned.chars().filter(|c| !c.is_whitespace()).collect(),
            pos: 0,
            groups,
        }
    }

    fn malformed(&self, reason: &str) -> FormulaError {
        FormulaError::MalformedFormula {
            formula: self.source.to_string(),
            position: self.pos,
            reason: reason.to_string(),
        }
    }

    // adds `multiplier` copies of `addition`, failing instead of wrapping on huge counts
    fn merge_scaled(
        &self,
        counts: &mut HashMap<String, usize>,
        order: &mut Vec<String>,
        addition: HashMap<String, usize>,
        addition_order: Vec<String>,
        multiplier: usize,
    ) -> Result<(), FormulaError> {
        for element in addition_order {
            let quantity = addition
                .get(&element)
                .copied()
                .unwrap_or(0)
                .checked_mul(multiplier)
                .ok_or_else(|| self.malformed("atom count overflow"))?;
            if !counts.contains_key(&element) {
                order.push(element.clone());
            }
            let total = counts.entry(element).or_insert(0);
            *total = total
                .checked_add(quantity)
                .ok_or_else(|| self.malformed("atom count overflow"))?;
        }
        Ok(())
    }

    // longest user group name starting at the cursor, so "OAc" is not read as O + Ac
    fn match_group(&self) -> Option<usize> {
        let rest = &self.chars[self.pos..];
        self.groups?
            .keys()
            .map(|name| name.chars().collect::<Vec<char>>())
            .filter(|name| !name.is_empty() && rest.starts_with(name))
            .map(|name| name.len())
            .max()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn parse(mut self) -> Result<(HashMap<String, usize>, Vec<String>), FormulaError> {
        if self.chars.is_empty() {
            return Err(self.malformed("empty formula"));
        }
        let parsed = self.parse_sequence(0)?;
        if let Some(c) = self.peek() {
            // only a stray ')' can stop the top-level sequence early
            return Err(self.malformed(&format!("unexpected `{}`", c)));
        }
        Ok(parsed)
    }

    // element counts plus the order in which elements were first seen
    fn parse_sequence(
        &mut self,
        depth: usize,
    ) -> Result<(HashMap<String, usize>, Vec<String>), FormulaError> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        while let Some(c) = self.peek() {
            if c == ')' {
                break;
            } else if c == '(' {
                if depth >= MAX_GROUP_DEPTH {
                    return Err(self.malformed("groups nested too deeply"));
                }
                self.pos += 1;
                let (inner, inner_order) = self.parse_sequence(depth + 1)?;
                if self.peek() != Some(')') {
                    return Err(self.malformed("unclosed `(`"));
                }
                if inner.is_empty() {
                    return Err(self.malformed("empty group `()`"));
                }
                self.pos += 1;
                let multiplier = self.parse_count()?;
                debug!("group closed with multiplier {}", multiplier);
                self.merge_scaled(&mut counts, &mut order, inner, inner_order, multiplier)?;
            } else if c.is_ascii_uppercase() {
                let start = self.pos;
                if let Some(len) = self.match_group() {
                    self.pos += len;
                } else {
                    self.pos += 1;
                    while let Some(l) = self.peek() {
                        if l.is_ascii_lowercase() {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                }
                let symbol: String = self.chars[start..self.pos].iter().collect();
                let count = self.parse_count()?;
                let (atoms, atoms_order) = self.resolve_symbol(&symbol)?;
                self.merge_scaled(&mut counts, &mut order, atoms, atoms_order, count)?;
            } else if c.is_ascii_digit() {
                return Err(self.malformed("count without a preceding element or group"));
            } else {
                return Err(self.malformed(&format!("unexpected `{}`", c)));
            }
        }
        Ok((counts, order))
    }

    fn parse_count(&mut self) -> Result<usize, FormulaError> {
        let start = self.pos;
        while let Some(d) = self.peek() {
            if d.is_ascii_digit() {
                self.pos += 1;
            } else {
                break;
            }
        }
        if start == self.pos {
            return Ok(1);
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits
            .parse::<usize>()
            .map_err(|_| self.malformed(&format!("count `{}` is too large", digits)))
    }

    // chemical groups take priority over elements, so "Me" is never read as an element
    fn resolve_symbol(
        &self,
        symbol: &str,
    ) -> Result<(HashMap<String, usize>, Vec<String>), FormulaError> {
        if let Some(group) = self.groups.and_then(|groups| groups.get(symbol)) {
            let mut order: Vec<String> = group.keys().cloned().collect();
            order.sort();
            return Ok((group.clone(), order));
        }
        if atomic_mass(symbol).is_some() {
            Ok((
                HashMap::from([(symbol.to_string(), 1)]),
                vec![symbol.to_string()],
            ))
        } else {
            Err(FormulaError::UnknownElement {
                element: symbol.to_string(),
                formula: self.source.to_string(),
            })
        }
    }
}

fn parse_formula_ordered(
    formula: &str,
    groups: Option<&ChemicalGroups>,
) -> Result<(HashMap<String, usize>, Vec<String>), FormulaError> {
    let trimmed = formula.trim();
    let cleaned = filter_phase_marks(trimmed);
    FormulaParser::new(formula, cleaned, groups).parse()
}

/// Function to parse a chemical formula and return a HashMap of elements and their counts.
/// Nested groups like Ca(OH)2 or K4(Fe(CN)6) are expanded.
pub fn parse_formula(formula: &str) -> Result<HashMap<String, usize>, FormulaError> {
    parse_formula_with_groups(formula, None)
}

/// Same as parse_formula, but formula may contain special names for chemical groups like Me, Ph, etc.
/// In that case the argument groups should contain the names of these groups and their atomic composition { "Me":{"C":1, "H":3}}
/// Group names are matched longest first before element symbols, so a name such as "OAc" is one group, not O + Ac.
pub fn parse_formula_with_groups(
    formula: &str,
    groups: Option<&ChemicalGroups>,
) -> Result<HashMap<String, usize>, FormulaError> {
    let (counts, _) = parse_formula_ordered(formula, groups)?;
    Ok(counts)
}

// Function to calculate the molar mass of a substance given its chemical formula
pub fn calculate_molar_mass(
    formula: &str,
    groups: Option<&ChemicalGroups>,
) -> Result<(f64, HashMap<String, usize>), FormulaError> {
    let counts = parse_formula_with_groups(formula, groups)?;
    let mut molar_mass = 0.0;
    for (element, count) in counts.iter() {
        let mass = atomic_mass(element).ok_or_else(|| FormulaError::UnknownElement {
            element: element.clone(),
            formula: formula.to_string(),
        })?;
        molar_mass += mass * *count as f64;
    }
    Ok((molar_mass, counts))
}

/// molar mass in g/mol
pub fn molar_mass(formula: &str) -> Result<f64, FormulaError> {
    calculate_molar_mass(formula, None).map(|(mass, _)| mass)
}

// Function to calculate the molar mass of a vector of chemical formulas
pub fn calculate_molar_mass_of_vector_of_subs(
    vec_of_formulae: &[&str],
    groups: Option<&ChemicalGroups>,
) -> Result<Vec<f64>, FormulaError> {
    vec_of_formulae
        .iter()
        .map(|formula| calculate_molar_mass(formula, groups).map(|(mass, _)| mass))
        .collect()
}

/// matrix of atomic composition: rows are elements (in order of first appearance), columns are formulae
pub fn create_elem_composition_matrix(
    vec_of_formulae: &[&str],
    groups: Option<&ChemicalGroups>,
) -> Result<(DMatrix<f64>, Vec<String>), FormulaError> {
    let mut unique_vec_of_elems: Vec<String> = Vec::new();
    let mut vec_of_compositions = Vec::with_capacity(vec_of_formulae.len());
    for formula in vec_of_formulae.iter() {
        let (counts, order) = parse_formula_ordered(formula, groups)?;
        for element in order {
            if !unique_vec_of_elems.contains(&element) {
                unique_vec_of_elems.push(element);
            }
        }
        vec_of_compositions.push(counts);
    }
    let matrix = DMatrix::from_fn(
        unique_vec_of_elems.len(),
        vec_of_compositions.len(),
        |i, j| {
            vec_of_compositions[j]
                .get(&unique_vec_of_elems[i])
                .map_or(0.0, |count| *count as f64)
        },
    );
    Ok((matrix, unique_vec_of_elems))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formula() {
        let expected_counts = HashMap::from([
            ("C".to_string(), 6),
            ("H".to_string(), 8),
            ("O".to_string(), 6),
        ]);
        assert_eq!(parse_formula("C6H8O6").unwrap(), expected_counts);

        let expected_counts = HashMap::from([
            ("Na".to_string(), 1),
            ("N".to_string(), 2),
            ("O".to_string(), 6),
        ]);
        assert_eq!(parse_formula("Na(NO3)2").unwrap(), expected_counts);

        let expected_counts = HashMap::from([("H".to_string(), 2), ("O".to_string(), 1)]);
        assert_eq!(parse_formula("H2O").unwrap(), expected_counts);

        let expected_counts = HashMap::from([
            ("C".to_string(), 5),
            ("H".to_string(), 7),
            ("O".to_string(), 2),
        ]);
        assert_eq!(parse_formula("C5H6OOH").unwrap(), expected_counts);
    }

    #[test]
    fn test_nested_groups() {
        let expected_counts = HashMap::from([
            ("K".to_string(), 4),
            ("Fe".to_string(), 1),
            ("C".to_string(), 6),
            ("N".to_string(), 6),
        ]);
        assert_eq!(parse_formula("K4(Fe(CN)6)").unwrap(), expected_counts);

        let expected_counts = HashMap::from([
            ("C".to_string(), 2),
            ("H".to_string(), 7),
            ("N".to_string(), 1),
        ]);
        assert_eq!(parse_formula("(CH3)2NH").unwrap(), expected_counts);
        // whitespace between tokens is ignored
        assert_eq!(parse_formula(" ( CH3 ) 2 NH ").unwrap(), expected_counts);
    }

    #[test]
    fn test_calculate_molar_mass() {
        let (molar_mass, _) = calculate_molar_mass("H2O(g)", None).unwrap();
        assert!((molar_mass - 18.01528).abs() < 1e-2);

        let (molar_mass, _) = calculate_molar_mass("NaCl", None).unwrap();
        assert!((molar_mass - 58.44).abs() < 1e-2);

        let (molar_mass, _) = calculate_molar_mass("C6H8O6", None).unwrap();
        assert!((molar_mass - 176.12).abs() < 1e-2);

        let (molar_mass, _) = calculate_molar_mass("Ca(NO3)2", None).unwrap();
        assert!((molar_mass - 164.093).abs() < 1e-2);
    }

    #[test]
    fn test_molar_mass_with_groups_in_brackets() {
        assert!((molar_mass("H2O").unwrap() - 18.015).abs() < 1e-2);
        // both H and O are counted twice
        assert!((molar_mass("Ca(OH)2").unwrap() - 74.09).abs() < 1e-2);
        assert!((molar_mass("NaCl(aq)").unwrap() - 58.44).abs() < 1e-2);
    }

    #[test]
    fn test_calculate_molar_mass_of_vector_of_substances() {
        let vec_of_formulae = vec!["H2O", "NaCl", "C6H8O6", "Ca(NO3)2"];
        let expected_molar_masses = vec![18.01528, 58.44316, 176.12, 164.093];

        let calculated_molar_masses =
            calculate_molar_mass_of_vector_of_subs(&vec_of_formulae, None).unwrap();

        for (i, &expected_molar_mass) in expected_molar_masses.iter().enumerate() {
            assert!((calculated_molar_masses[i] - expected_molar_mass).abs() < 1e-2);
        }
    }

    #[test]
    fn test_with_groups() {
        let groups: ChemicalGroups = HashMap::from([(
            "Me".to_string(),
            HashMap::from([("C".to_string(), 1), ("H".to_string(), 3)]),
        )]);
        let expected_counts = HashMap::from([("H".to_string(), 8), ("C".to_string(), 7)]);
        assert_eq!(
            parse_formula_with_groups("C6H5Me", Some(&groups)).unwrap(),
            expected_counts
        );

        let expected_counts = HashMap::from([("H".to_string(), 10), ("C".to_string(), 8)]);
        assert_eq!(
            parse_formula_with_groups("C6H4(Me)2", Some(&groups)).unwrap(),
            expected_counts
        );
    }

    #[test]
    fn test_unknown_element() {
        let err = parse_formula("XyO2").unwrap_err();
        assert_eq!(
            err,
            FormulaError::UnknownElement {
                element: "Xy".to_string(),
                formula: "XyO2".to_string()
            }
        );
        assert!(matches!(
            molar_mass("A"),
            Err(FormulaError::UnknownElement { .. })
        ));
    }

    #[test]
    fn test_malformed_formulas() {
        for formula in ["", "Ca(OH", "CaOH)2", "2H2O", "H2-O", "()2", "h2o"] {
            assert!(
                matches!(
                    parse_formula(formula),
                    Err(FormulaError::MalformedFormula { .. })
                ),
                "{} should be rejected",
                formula
            );
        }
    }

    #[test]
    fn test_depth_is_bounded() {
        let deep = format!(
            "{}H{}",
            "(".repeat(MAX_GROUP_DEPTH + 1),
            ")".repeat(MAX_GROUP_DEPTH + 1)
        );
        assert!(matches!(
            parse_formula(&deep),
            Err(FormulaError::MalformedFormula { .. })
        ));
        let shallow = format!(
            "{}H{}",
            "(".repeat(MAX_GROUP_DEPTH),
            ")2".repeat(MAX_GROUP_DEPTH)
        );
        let counts = parse_formula(&shallow).unwrap();
        assert_eq!(counts["H"], 1 << MAX_GROUP_DEPTH);
    }

    #[test]
    fn test_huge_counts_are_rejected() {
        for formula in [
            "(C99999999999)99999999999",
            "C18446744073709551615C1",
            "((H4294967296)4294967296)2",
        ] {
            match parse_formula(formula) {
                Err(FormulaError::MalformedFormula { reason, .. }) => {
                    assert_eq!(reason, "atom count overflow")
                }
                other => panic!("{} should overflow, got {:?}", formula, other),
            }
        }
        assert!(molar_mass("(C99999999999)99999999999").is_err());
    }

    #[test]
    fn test_group_names_with_capitals() {
        let groups: ChemicalGroups = HashMap::from([
            (
                "OAc".to_string(),
                HashMap::from([
                    ("C".to_string(), 2),
                    ("H".to_string(), 3),
                    ("O".to_string(), 2),
                ]),
            ),
            ("O".to_string(), HashMap::from([("O".to_string(), 1)])),
        ]);
        let expected_counts = HashMap::from([
            ("Na".to_string(), 1),
            ("C".to_string(), 2),
            ("H".to_string(), 3),
            ("O".to_string(), 2),
        ]);
        assert_eq!(
            parse_formula_with_groups("NaOAc", Some(&groups)).unwrap(),
            expected_counts
        );
        let expected_counts = HashMap::from([
            ("Pb".to_string(), 1),
            ("C".to_string(), 4),
            ("H".to_string(), 6),
            ("O".to_string(), 4),
        ]);
        assert_eq!(
            parse_formula_with_groups("Pb(OAc)2", Some(&groups)).unwrap(),
            expected_counts
        );
        // without the group the same text is oxygen plus actinium
        assert_eq!(parse_formula("NaOAc").unwrap()["Ac"], 1);
    }

    #[test]
    fn test_element_matrix() {
        let vec_of_formulae = vec!["H2O", "NaCl", "C3H8", "CH4"]; // 5 elements
        let (matrix, elements) = create_elem_composition_matrix(&vec_of_formulae, None).unwrap();
        assert_eq!(matrix.nrows(), 5);
        assert_eq!(matrix.ncols(), 4);
        assert_eq!(elements, vec!["H", "O", "Na", "Cl", "C"]);
        assert_eq!(matrix[(0, 2)], 8.0);
        assert_eq!(matrix[(4, 3)], 1.0);
        assert_eq!(matrix[(2, 0)], 0.0);
    }

    #[test]
    fn test_periodic_table_is_complete() {
        assert_eq!(ELEMENTS.len(), 118);
        assert_eq!(atomic_mass("Og"), Some(295.0));
        assert_eq!(atomic_mass("Xx"), None);
    }
}
