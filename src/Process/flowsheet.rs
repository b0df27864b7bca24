//! Flowsheet: owner of species, reactions, streams and units.
//!
//! Everything is stored in append-only vectors and addressed by handles, so units refer
//! to streams and reactions by `StreamId`/`ReactionId` and the flowsheet lends out the
//! pieces a solve needs.
use crate::Chemistry::reaction::{Reaction, ReactionId};
use crate::Chemistry::species::{Species, SpeciesId, SpeciesRegistry};
use crate::Process::errors::ProcessError;
use crate::Process::reactor::{KnownSide, ReactorUnit, SolveDirection};
use crate::Process::stream::{Stream, StreamId};
use crate::Process::unit::{ProcessUnit, Unit, UnitId, UnitOperation};
use crate::linear_solver::{SolverEnum, create_solver};
use crate::settings::Settings;
use log::info;

#[derive(Debug, Clone)]
pub struct Flowsheet {
    registry: SpeciesRegistry,
    reactions: Vec<Reaction>,
    streams: Vec<Stream>,
    units: Vec<Unit>,
    settings: Settings,
    solver: SolverEnum,
}

impl Default for Flowsheet {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

/// two distinct elements of a slice borrowed mutably at once
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

impl Flowsheet {
    pub fn new(settings: Settings) -> Self {
        Self {
            registry: SpeciesRegistry::new(),
            reactions: Vec::new(),
            streams: Vec::new(),
            units: Vec::new(),
            solver: create_solver(&settings),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &SpeciesRegistry {
        &self.registry
    }

    pub fn add_species(&mut self, name: &str, abbreviation: &str) -> Result<SpeciesId, ProcessError> {
        Ok(self.registry.register(Species::new(name, abbreviation))?)
    }

    pub fn add_species_with_molar_mass(
        &mut self,
        name: &str,
        abbreviation: &str,
        molar_mass: f64,
    ) -> Result<SpeciesId, ProcessError> {
        Ok(self
            .registry
            .register(Species::with_molar_mass(name, abbreviation, molar_mass))?)
    }

    pub fn species_id(&self, abbreviation: &str) -> Result<SpeciesId, ProcessError> {
        Ok(self.registry.id_of(abbreviation)?)
    }

    pub fn add_reaction<S: AsRef<str>>(
        &mut self,
        equations: &[S],
        comment: Option<&str>,
    ) -> Result<ReactionId, ProcessError> {
        let reaction = Reaction::parse(&self.registry, equations, comment)?;
        self.reactions.push(reaction);
        Ok(ReactionId(self.reactions.len() - 1))
    }

    pub fn add_stream(&mut self, stream: Stream) -> StreamId {
        self.streams.push(stream);
        StreamId(self.streams.len() - 1)
    }

    /// flows by abbreviation, None for an unknown flow
    pub fn add_stream_with_flows(
        &mut self,
        name: &str,
        flows: &[(&str, Option<f64>)],
    ) -> Result<StreamId, ProcessError> {
        let mut stream = Stream::new(name);
        for (abbreviation, flow) in flows {
            stream.add_species(self.species_id(abbreviation)?, *flow)?;
        }
        Ok(self.add_stream(stream))
    }

    pub fn add_unit(&mut self, unit: ProcessUnit) -> Result<UnitId, ProcessError> {
        for id in unit.streams() {
            self.stream(id)?;
        }
        self.units.push(Unit::Generic(unit));
        Ok(UnitId(self.units.len() - 1))
    }

    /// checks handles, distinct streams and that the streams cover the reaction
    pub fn add_reactor(
        &mut self,
        inlet: StreamId,
        outlet: StreamId,
        reaction: ReactionId,
        comment: Option<&str>,
    ) -> Result<UnitId, ProcessError> {
        if inlet == outlet {
            return Err(ProcessError::InvalidTopology {
                reason: format!("reactor inlet and outlet are the same stream {}", inlet.0),
            });
        }
        let reaction_ref = self.reaction(reaction)?;
        ReactorUnit::check_coverage(reaction_ref, self.stream(inlet)?, self.stream(outlet)?)?;
        let reactor =
            ReactorUnit::new(inlet, outlet, reaction, comment).with_settings(&self.settings);
        self.units.push(Unit::Reactor(reactor));
        info!(
            "reactor {} added: {} -> {}",
            self.units.len() - 1,
            self.streams[inlet.0].name(),
            self.streams[outlet.0].name()
        );
        Ok(UnitId(self.units.len() - 1))
    }

    pub fn reaction(&self, id: ReactionId) -> Result<&Reaction, ProcessError> {
        self.reactions.get(id.0).ok_or(ProcessError::InvalidHandle {
            kind: "reaction",
            index: id.0,
        })
    }

    pub fn stream(&self, id: StreamId) -> Result<&Stream, ProcessError> {
        self.streams.get(id.0).ok_or(ProcessError::InvalidHandle {
            kind: "stream",
            index: id.0,
        })
    }

    pub fn stream_mut(&mut self, id: StreamId) -> Result<&mut Stream, ProcessError> {
        self.streams.get_mut(id.0).ok_or(ProcessError::InvalidHandle {
            kind: "stream",
            index: id.0,
        })
    }

    /// first stream with the given name
    pub fn stream_by_name(&self, name: &str) -> Option<StreamId> {
        self.streams
            .iter()
            .position(|s| s.name() == name)
            .map(StreamId)
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn unit(&self, id: UnitId) -> Result<&Unit, ProcessError> {
        self.units.get(id.0).ok_or(ProcessError::InvalidHandle {
            kind: "unit",
            index: id.0,
        })
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn reactor(&self, id: UnitId) -> Result<&ReactorUnit, ProcessError> {
        let unit = self.unit(id)?;
        unit.as_reactor()
            .ok_or_else(|| ProcessError::UnsupportedUnit {
                unit: unit.kind().to_string(),
            })
    }

    pub fn reactor_mut(&mut self, id: UnitId) -> Result<&mut ReactorUnit, ProcessError> {
        let unit = self.units.get_mut(id.0).ok_or(ProcessError::InvalidHandle {
            kind: "unit",
            index: id.0,
        })?;
        let kind = unit.kind();
        unit.as_reactor_mut()
            .ok_or_else(|| ProcessError::UnsupportedUnit {
                unit: kind.to_string(),
            })
    }

    pub fn set_extents(&mut self, id: UnitId, extents: Vec<f64>) -> Result<(), ProcessError> {
        self.reactor_mut(id)?.set_extents(extents);
        Ok(())
    }

    // split borrow of everything a reactor solve touches
    fn reactor_parts(
        &mut self,
        id: UnitId,
    ) -> Result<(&mut ReactorUnit, &Reaction, &mut Stream, &mut Stream), ProcessError> {
        let (inlet, outlet, reaction) = {
            let reactor = self.reactor(id)?;
            (reactor.inlet(), reactor.outlet(), reactor.reaction())
        };
        self.reaction(reaction)?;
        self.stream(inlet)?;
        self.stream(outlet)?;
        if inlet == outlet {
            return Err(ProcessError::InvalidTopology {
                reason: format!("reactor inlet and outlet are the same stream {}", inlet.0),
            });
        }
        let reactor = self.units[id.0]
            .as_reactor_mut()
            .ok_or_else(|| ProcessError::UnsupportedUnit {
                unit: "generic".to_string(),
            })?;
        let (inlet, outlet) = pair_mut(&mut self.streams, inlet.0, outlet.0);
        Ok((reactor, &self.reactions[reaction.0], inlet, outlet))
    }

    /// extents of a reactor whose streams are both known
    pub fn solve_extents(&mut self, id: UnitId) -> Result<Vec<f64>, ProcessError> {
        let solver = self.solver.clone();
        let (reactor, reaction, inlet, outlet) = self.reactor_parts(id)?;
        Ok(reactor
            .solve_extents_from_streams(reaction, inlet, outlet, &solver)?
            .to_vec())
    }

    /// the unknown stream of a reactor from its extents
    pub fn solve_stream(&mut self, id: UnitId) -> Result<KnownSide, ProcessError> {
        let (reactor, reaction, inlet, outlet) = self.reactor_parts(id)?;
        reactor.solve_stream_from_extents(reaction, inlet, outlet)
    }

    pub fn solve_unit(&mut self, id: UnitId) -> Result<SolveDirection, ProcessError> {
        let solver = self.solver.clone();
        let (reactor, reaction, inlet, outlet) = self.reactor_parts(id)?;
        reactor.solve(reaction, inlet, outlet, &solver)
    }

    /// Some(flow) if known, None if unknown or not in the stream
    pub fn flow_of(&self, stream: StreamId, abbreviation: &str) -> Result<Option<f64>, ProcessError> {
        let id = self.species_id(abbreviation)?;
        Ok(self.stream(stream)?.molar_flow(id))
    }

    pub fn pretty_print(&self) {
        self.registry.pretty_print();
        for reaction in &self.reactions {
            reaction.pretty_print(&self.registry);
        }
        for stream in &self.streams {
            stream.pretty_print(&self.registry);
        }
        for (i, unit) in self.units.iter().enumerate() {
            println!(
                "unit {} ({}): {:?} -> {:?} {}",
                i,
                unit.kind(),
                unit.in_streams(),
                unit.out_streams(),
                unit.comment().unwrap_or("")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn amination_flowsheet() -> (Flowsheet, UnitId, StreamId, StreamId) {
        let mut flowsheet = Flowsheet::default();
        for (name, abbreviation) in [
            ("ammonia", "NH3"),
            ("methanol", "CH3OH"),
            ("methylamine", "CH3NH2"),
            ("water", "H2O"),
            ("dimethylamine", "(CH3)2NH"),
        ] {
            flowsheet.add_species(name, abbreviation).unwrap();
        }
        let reaction = flowsheet
            .add_reaction(
                &[
                    "NH3 + CH3OH = CH3NH2 + H2O",
                    "CH3NH2 + CH3OH = (CH3)2NH + H2O",
                ],
                Some("methylamines"),
            )
            .unwrap();
        let feed = flowsheet
            .add_stream_with_flows("feed", &[("NH3", Some(100.0)), ("CH3OH", Some(100.0))])
            .unwrap();
        let product = flowsheet
            .add_stream_with_flows(
                "product",
                &[
                    ("NH3", None),
                    ("CH3OH", None),
                    ("CH3NH2", None),
                    ("H2O", None),
                    ("(CH3)2NH", None),
                ],
            )
            .unwrap();
        let reactor = flowsheet
            .add_reactor(feed, product, reaction, Some("R-101"))
            .unwrap();
        (flowsheet, reactor, feed, product)
    }

    #[test]
    fn test_round_trip_through_flowsheet() {
        let (mut flowsheet, reactor, _, product) = amination_flowsheet();
        flowsheet.set_extents(reactor, vec![60.0, 22.0]).unwrap();
        assert_eq!(flowsheet.solve_stream(reactor).unwrap(), KnownSide::Inlet);
        assert_relative_eq!(
            flowsheet.flow_of(product, "CH3NH2").unwrap().unwrap(),
            38.0,
            epsilon = 1e-9
        );
        let extents = flowsheet.solve_extents(reactor).unwrap();
        assert_relative_eq!(extents[0], 60.0, epsilon = 1e-9);
        assert_relative_eq!(extents[1], 22.0, epsilon = 1e-9);
        assert_eq!(
            flowsheet.solve_unit(reactor).unwrap(),
            SolveDirection::ExtentsFromStreams
        );
        assert_eq!(flowsheet.stream_by_name("product"), Some(product));
    }

    #[test]
    fn test_reactor_registration_checks() {
        let (mut flowsheet, _, feed, _) = amination_flowsheet();
        assert!(matches!(
            flowsheet.add_reactor(feed, feed, ReactionId(0), None),
            Err(ProcessError::InvalidTopology { .. })
        ));
        assert_eq!(
            flowsheet.add_reactor(feed, StreamId(9), ReactionId(0), None),
            Err(ProcessError::InvalidHandle {
                kind: "stream",
                index: 9
            })
        );
        assert_eq!(
            flowsheet.add_reactor(feed, StreamId(1), ReactionId(3), None),
            Err(ProcessError::InvalidHandle {
                kind: "reaction",
                index: 3
            })
        );
        let small = flowsheet
            .add_stream_with_flows("small", &[("H2O", None)])
            .unwrap();
        assert!(matches!(
            flowsheet.add_reactor(feed, small, ReactionId(0), None),
            Err(ProcessError::StreamCannotCoverReaction { .. })
        ));
        assert_eq!(flowsheet.units().len(), 1);
    }

    #[test]
    fn test_generic_unit_is_not_solved() {
        let (mut flowsheet, _, feed, product) = amination_flowsheet();
        let mixer = flowsheet
            .add_unit(ProcessUnit::new(Some("mixer"), vec![feed], vec![product]))
            .unwrap();
        assert_eq!(
            flowsheet.solve_unit(mixer),
            Err(ProcessError::UnsupportedUnit {
                unit: "generic".to_string()
            })
        );
        assert!(matches!(
            flowsheet.add_unit(ProcessUnit::new(None, vec![StreamId(42)], vec![])),
            Err(ProcessError::InvalidHandle { kind: "stream", .. })
        ));
        assert!(flowsheet.unit(UnitId(17)).is_err());
    }

    #[test]
    fn test_species_and_stream_errors() {
        let (mut flowsheet, _, feed, _) = amination_flowsheet();
        assert!(matches!(
            flowsheet.add_species("ammonia again", "NH3"),
            Err(ProcessError::Species(_))
        ));
        assert!(matches!(
            flowsheet.add_stream_with_flows("bad", &[("Ar", Some(1.0))]),
            Err(ProcessError::Species(_))
        ));
        assert!(matches!(
            flowsheet.add_stream_with_flows("dup", &[("NH3", Some(1.0)), ("NH3", None)]),
            Err(ProcessError::DuplicateSpeciesInStream { .. })
        ));
        assert!(matches!(
            flowsheet.add_reaction(&["NH3 = N2"], None),
            Err(ProcessError::Reaction(_))
        ));
        assert_eq!(flowsheet.flow_of(feed, "H2O").unwrap(), None);
        flowsheet
            .add_species_with_molar_mass("catalyst", "Cat", 100.0)
            .unwrap();
        assert_eq!(
            flowsheet
                .registry()
                .get(flowsheet.species_id("Cat").unwrap())
                .unwrap()
                .molar_mass(),
            Some(100.0)
        );
    }

    #[test]
    fn test_pair_mut() {
        let mut values = vec![1, 2, 3, 4];
        let (a, b) = pair_mut(&mut values, 3, 1);
        std::mem::swap(a, b);
        assert_eq!(values, vec![1, 4, 3, 2]);
    }
}
