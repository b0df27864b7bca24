//! Material stream: an ordered list of species with known or unknown molar flows.
use crate::Chemistry::species::{SpeciesId, SpeciesRegistry};
use crate::Process::errors::ProcessError;
use log::debug;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(pub usize);

/// molar flow of one species; an unknown flow is always stored as 0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowEntry {
    known: bool,
    molar_flow: f64,
}

impl FlowEntry {
    pub fn known(molar_flow: f64) -> Self {
        Self {
            known: true,
            molar_flow,
        }
    }

    pub fn unknown() -> Self {
        Self {
            known: false,
            molar_flow: 0.0,
        }
    }

    pub fn from_option(flow: Option<f64>) -> Self {
        flow.map_or_else(Self::unknown, Self::known)
    }

    pub fn is_known(&self) -> bool {
        self.known
    }

    pub fn molar_flow(&self) -> f64 {
        self.molar_flow
    }

    pub fn value(&self) -> Option<f64> {
        self.known.then_some(self.molar_flow)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    name: String,
    entries: Vec<(SpeciesId, FlowEntry)>,
}

impl Stream {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn from_known_flows(
        name: &str,
        flows: &[(SpeciesId, f64)],
    ) -> Result<Self, ProcessError> {
        let mut stream = Self::new(name);
        for (id, flow) in flows {
            stream.add_species(*id, Some(*flow))?;
        }
        Ok(stream)
    }

    pub fn from_unknown_species(name: &str, species: &[SpeciesId]) -> Result<Self, ProcessError> {
        let mut stream = Self::new(name);
        for id in species {
            stream.add_species(*id, None)?;
        }
        Ok(stream)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn position(&self, id: SpeciesId) -> Option<usize> {
        self.entries.iter().position(|(s, _)| *s == id)
    }

    fn entry_mut(&mut self, id: SpeciesId) -> Result<&mut FlowEntry, ProcessError> {
        let position = self
            .position(id)
            .ok_or(ProcessError::SpeciesNotInStream { species: id })?;
        Ok(&mut self.entries[position].1)
    }

    /// None flow means unknown; an existing species is never overwritten
    pub fn add_species(&mut self, id: SpeciesId, flow: Option<f64>) -> Result<(), ProcessError> {
        if self.contains(id) {
            return Err(ProcessError::DuplicateSpeciesInStream { species: id });
        }
        self.entries.push((id, FlowEntry::from_option(flow)));
        Ok(())
    }

    pub fn set_flow(&mut self, id: SpeciesId, molar_flow: f64) -> Result<(), ProcessError> {
        *self.entry_mut(id)? = FlowEntry::known(molar_flow);
        Ok(())
    }

    pub fn set_unknown(&mut self, id: SpeciesId) -> Result<(), ProcessError> {
        *self.entry_mut(id)? = FlowEntry::unknown();
        Ok(())
    }

    pub fn remove_species(&mut self, id: SpeciesId) -> Result<FlowEntry, ProcessError> {
        let position = self
            .position(id)
            .ok_or(ProcessError::SpeciesNotInStream { species: id })?;
        Ok(self.entries.remove(position).1)
    }

    pub fn set_all_unknown(&mut self) {
        for (_, entry) in self.entries.iter_mut() {
            *entry = FlowEntry::unknown();
        }
    }

    /// marks every listed species known with the given flow, species not yet in the stream
    /// are appended
    pub fn update_flows(&mut self, flows: &[(SpeciesId, f64)]) {
        for (id, flow) in flows {
            match self.position(*id) {
                Some(position) => self.entries[position].1 = FlowEntry::known(*flow),
                None => self.entries.push((*id, FlowEntry::known(*flow))),
            }
        }
        debug!("stream {}: {} flows updated", self.name, flows.len());
    }

    /// vacuously true for an empty stream
    pub fn all_flows_known(&self) -> bool {
        self.entries.iter().all(|(_, entry)| entry.is_known())
    }

    pub fn any_flow_known(&self) -> bool {
        self.entries.iter().any(|(_, entry)| entry.is_known())
    }

    pub fn contains(&self, id: SpeciesId) -> bool {
        self.position(id).is_some()
    }

    pub fn entry(&self, id: SpeciesId) -> Option<&FlowEntry> {
        self.position(id).map(|position| &self.entries[position].1)
    }

    /// flow of a known species, None if unknown or absent
    pub fn molar_flow(&self, id: SpeciesId) -> Option<f64> {
        self.entry(id).and_then(|entry| entry.value())
    }

    pub fn is_known(&self, id: SpeciesId) -> bool {
        self.entry(id).is_some_and(|entry| entry.is_known())
    }

    pub fn species(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn entries(&self) -> &[(SpeciesId, FlowEntry)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_known_flow(&self) -> f64 {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_known())
            .map(|(_, entry)| entry.molar_flow())
            .sum()
    }

    pub fn to_table(&self, registry: &SpeciesRegistry) -> Table {
        let mut table = Table::new();
        table.add_row(row!["species", "molar flow", "known"]);
        for (id, entry) in &self.entries {
            let flow = entry
                .value()
                .map_or("?".to_string(), |f| format!("{:.4}", f));
            table.add_row(row![registry.abbreviation_of(*id), flow, entry.is_known()]);
        }
        table
    }

    pub fn pretty_print(&self, registry: &SpeciesRegistry) {
        println!("\n=== STREAM {} ===", self.name);
        self.to_table(registry).printstd();
    }
}
