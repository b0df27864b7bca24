//! Chemical species and the registry that owns them.
//!
//! A `Species` is an immutable value: building one never touches a registry.
//! Registration in a `SpeciesRegistry` hands back a `SpeciesId`, a plain index into
//! the registry arena. The registry is append-only so an id never dangles.
use crate::Chemistry::molmass::{FormulaError, molar_mass};
use log::debug;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub usize);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpeciesError {
    #[error("species with abbreviation `{0}` is already registered")]
    DuplicateAbbreviation(String),
    #[error("unknown species `{0}`")]
    UnknownSpecies(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    name: String,
    abbreviation: String,
    molar_mass: Option<f64>,
}

impl Species {
    /// molar mass is derived from the abbreviation if it reads as a chemical formula,
    /// symbolic species like "A" get None
    pub fn new(name: &str, abbreviation: &str) -> Self {
        let molar_mass = match molar_mass(abbreviation) {
            Ok(mass) => Some(mass),
            Err(e) => {
                debug!("no molar mass for {}: {}", abbreviation, e);
                None
            }
        };
        Self {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            molar_mass,
        }
    }

    pub fn with_molar_mass(name: &str, abbreviation: &str, molar_mass: f64) -> Self {
        Self {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            molar_mass: Some(molar_mass),
        }
    }

    /// strict variant of `new`: the abbreviation must be a valid formula
    pub fn from_formula(name: &str, formula: &str) -> Result<Self, FormulaError> {
        Ok(Self::with_molar_mass(name, formula, molar_mass(formula)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    pub fn molar_mass(&self) -> Option<f64> {
        self.molar_mass
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpeciesRegistry {
    species: Vec<Species>,
    by_abbreviation: HashMap<String, SpeciesId>,
}

impl SpeciesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// abbreviations are unique keys, a second registration is rejected
    pub fn register(&mut self, species: Species) -> Result<SpeciesId, SpeciesError> {
        if self.by_abbreviation.contains_key(species.abbreviation()) {
            return Err(SpeciesError::DuplicateAbbreviation(
                species.abbreviation().to_string(),
            ));
        }
        let id = SpeciesId(self.species.len());
        self.by_abbreviation
            .insert(species.abbreviation().to_string(), id);
        self.species.push(species);
        Ok(id)
    }

    pub fn id_of(&self, abbreviation: &str) -> Result<SpeciesId, SpeciesError> {
        self.by_abbreviation
            .get(abbreviation)
            .copied()
            .ok_or_else(|| SpeciesError::UnknownSpecies(abbreviation.to_string()))
    }

    pub fn get(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id.0)
    }

    /// abbreviation of a registered id, "?" for a foreign id
    pub fn abbreviation_of(&self, id: SpeciesId) -> &str {
        self.get(id).map_or("?", |species| species.abbreviation())
    }

    pub fn contains(&self, abbreviation: &str) -> bool {
        self.by_abbreviation.contains_key(abbreviation)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &Species)> {
        self.species
            .iter()
            .enumerate()
            .map(|(i, species)| (SpeciesId(i), species))
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["id", "name", "abbreviation", "molar mass, g/mol"]);
        for (id, species) in self.iter() {
            let mass = species
                .molar_mass()
                .map_or("-".to_string(), |m| format!("{:.3}", m));
            table.add_row(row![id.0, species.name(), species.abbreviation(), mass]);
        }
        table
    }

    pub fn pretty_print(&self) {
        println!("\n=== SPECIES ===");
        self.to_table().printstd();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_species_molar_mass() {
        let water = Species::new("water", "H2O");
        assert_relative_eq!(water.molar_mass().unwrap(), 18.015, epsilon = 1e-3);
        let symbolic = Species::new("reagent A", "A");
        assert_eq!(symbolic.molar_mass(), None);
        let lime = Species::from_formula("slaked lime", "Ca(OH)2").unwrap();
        assert_relative_eq!(lime.molar_mass().unwrap(), 74.092, epsilon = 1e-3);
        assert!(Species::from_formula("reagent A", "A").is_err());
        let given = Species::with_molar_mass("resin", "R", 1000.0);
        assert_eq!(given.molar_mass(), Some(1000.0));
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = SpeciesRegistry::new();
        let a = registry.register(Species::new("ammonia", "NH3")).unwrap();
        let b = registry.register(Species::new("methanol", "CH3OH")).unwrap();
        assert_eq!(a, SpeciesId(0));
        assert_eq!(b, SpeciesId(1));
        assert_eq!(registry.id_of("CH3OH").unwrap(), b);
        assert_eq!(registry.get(a).unwrap().name(), "ammonia");
        assert_eq!(registry.abbreviation_of(b), "CH3OH");
        assert_eq!(registry.abbreviation_of(SpeciesId(7)), "?");
        assert!(registry.contains("NH3"));
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.id_of("H2O"),
            Err(SpeciesError::UnknownSpecies("H2O".to_string()))
        );
    }

    #[test]
    fn test_duplicate_abbreviation() {
        let mut registry = SpeciesRegistry::new();
        registry.register(Species::new("ammonia", "NH3")).unwrap();
        let err = registry
            .register(Species::new("another ammonia", "NH3"))
            .unwrap_err();
        assert_eq!(err, SpeciesError::DuplicateAbbreviation("NH3".to_string()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.to_table().len(), 2);
    }
}
