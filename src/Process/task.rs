//! # Flowsheet task
//!
//! JSON description of a complete flowsheet: settings, species, reactions, streams and
//! reactors. Streams are referenced by name and reactions by their index in `reactions`.
//! A flow of `null` marks an unknown flow.
//!
//! ```json
//! {
//!   "species": [{"name": "ammonia", "abbreviation": "NH3"}, {"abbreviation": "H2O"}],
//!   "reactions": [{"comment": "amination", "equations": ["NH3 + CH3OH = CH3NH2 + H2O"]}],
//!   "streams": [
//!     {"name": "feed", "flows": [{"species": "NH3", "flow": 100.0}]},
//!     {"name": "product", "flows": [{"species": "NH3", "flow": null}]}
//!   ],
//!   "reactors": [{"inlet": "feed", "outlet": "product", "reaction": 0, "extents": [60.0]}]
//! }
//! ```
use crate::Chemistry::reaction::ReactionId;
use crate::Process::errors::ProcessError;
use crate::Process::flowsheet::Flowsheet;
use crate::Process::reactor::SolveDirection;
use crate::Process::stream::StreamId;
use crate::Process::unit::UnitId;
use crate::settings::Settings;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to read task file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid task JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unknown stream `{0}`")]
    UnknownStream(String),
    #[error("reaction index {index} out of range, {count} reactions defined")]
    UnknownReaction { index: usize, count: usize },
    #[error(transparent)]
    Process(#[from] ProcessError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTask {
    #[serde(default)]
    pub name: Option<String>,
    pub abbreviation: String,
    #[serde(default)]
    pub molar_mass: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionTask {
    #[serde(default)]
    pub comment: Option<String>,
    pub equations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowTask {
    pub species: String,
    #[serde(default)]
    pub flow: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamTask {
    pub name: String,
    pub flows: Vec<FlowTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorTask {
    #[serde(default)]
    pub comment: Option<String>,
    pub inlet: String,
    pub outlet: String,
    pub reaction: usize,
    #[serde(default)]
    pub extents: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowsheetTask {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub species: Vec<SpeciesTask>,
    #[serde(default)]
    pub reactions: Vec<ReactionTask>,
    #[serde(default)]
    pub streams: Vec<StreamTask>,
    #[serde(default)]
    pub reactors: Vec<ReactorTask>,
}

impl FlowsheetTask {
    pub fn from_json_str(json: &str) -> Result<Self, TaskError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TaskError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String, TaskError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn stream_id(flowsheet: &Flowsheet, name: &str) -> Result<StreamId, TaskError> {
        flowsheet
            .stream_by_name(name)
            .ok_or_else(|| TaskError::UnknownStream(name.to_string()))
    }

    /// registers everything in declaration order; reactors get their extents if given
    pub fn build(&self) -> Result<Flowsheet, TaskError> {
        let mut flowsheet = Flowsheet::new(self.settings.clone());
        for species in &self.species {
            let name = species.name.as_deref().unwrap_or(&species.abbreviation);
            match species.molar_mass {
                Some(mass) => {
                    flowsheet.add_species_with_molar_mass(name, &species.abbreviation, mass)?
                }
                None => flowsheet.add_species(name, &species.abbreviation)?,
            };
        }
        for reaction in &self.reactions {
            flowsheet.add_reaction(&reaction.equations, reaction.comment.as_deref())?;
        }
        for stream in &self.streams {
            let flows: Vec<(&str, Option<f64>)> = stream
                .flows
                .iter()
                .map(|f| (f.species.as_str(), f.flow))
                .collect();
            flowsheet.add_stream_with_flows(&stream.name, &flows)?;
        }
        for reactor in &self.reactors {
            if reactor.reaction >= self.reactions.len() {
                return Err(TaskError::UnknownReaction {
                    index: reactor.reaction,
                    count: self.reactions.len(),
                });
            }
            let inlet = Self::stream_id(&flowsheet, &reactor.inlet)?;
            let outlet = Self::stream_id(&flowsheet, &reactor.outlet)?;
            let unit = flowsheet.add_reactor(
                inlet,
                outlet,
                ReactionId(reactor.reaction),
                reactor.comment.as_deref(),
            )?;
            if let Some(extents) = &reactor.extents {
                flowsheet.set_extents(unit, extents.clone())?;
            }
        }
        info!(
            "flowsheet built: {} species, {} reactions, {} streams, {} units",
            flowsheet.registry().len(),
            self.reactions.len(),
            flowsheet.streams().len(),
            flowsheet.units().len()
        );
        Ok(flowsheet)
    }

    /// builds the flowsheet and solves every reactor in declaration order
    pub fn solve(&self) -> Result<(Flowsheet, Vec<SolveDirection>), TaskError> {
        let mut flowsheet = self.build()?;
        let mut directions = Vec::with_capacity(flowsheet.units().len());
        for i in 0..flowsheet.units().len() {
            directions.push(flowsheet.solve_unit(UnitId(i))?);
        }
        Ok((flowsheet, directions))
    }
}

pub fn solve_from_file<P: AsRef<Path>>(
    path: P,
) -> Result<(Flowsheet, Vec<SolveDirection>), TaskError> {
    FlowsheetTask::from_file(path)?.solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Process::reactor::KnownSide;
    use crate::settings::SolverKind;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const AMINATION_TASK: &str = r#"
    {
        "settings": {"solver": "Qr"},
        "species": [
            {"name": "ammonia", "abbreviation": "NH3"},
            {"name": "methanol", "abbreviation": "CH3OH"},
            {"name": "methylamine", "abbreviation": "CH3NH2"},
            {"name": "water", "abbreviation": "H2O"},
            {"name": "dimethylamine", "abbreviation": "(CH3)2NH"}
        ],
        "reactions": [
            {"comment": "methylamines", "equations": [
                "NH3 + CH3OH = CH3NH2 + H2O",
                "CH3NH2 + CH3OH = (CH3)2NH + H2O"
            ]}
        ],
        "streams": [
            {"name": "feed", "flows": [
                {"species": "NH3", "flow": 100.0},
                {"species": "CH3OH", "flow": 100.0}
            ]},
            {"name": "product", "flows": [
                {"species": "NH3", "flow": null},
                {"species": "CH3OH"},
                {"species": "CH3NH2"},
                {"species": "H2O"},
                {"species": "(CH3)2NH"}
            ]}
        ],
        "reactors": [
            {"comment": "R-101", "inlet": "feed", "outlet": "product", "reaction": 0, "extents": [60.0, 22.0]}
        ]
    }
    "#;

    #[test]
    fn test_build_from_json() {
        let task = FlowsheetTask::from_json_str(AMINATION_TASK).unwrap();
        assert_eq!(task.settings.solver, SolverKind::Qr);
        let flowsheet = task.build().unwrap();
        assert_eq!(flowsheet.registry().len(), 5);
        assert_eq!(flowsheet.units().len(), 1);
        let product = flowsheet.stream_by_name("product").unwrap();
        assert!(!flowsheet.stream(product).unwrap().any_flow_known());
        assert_eq!(
            flowsheet.reactor(UnitId(0)).unwrap().extents(),
            &[60.0, 22.0]
        );
    }

    #[test]
    fn test_solve_from_temp_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", AMINATION_TASK).unwrap();
        let (flowsheet, directions) = solve_from_file(file.path()).unwrap();
        assert_eq!(
            directions,
            vec![SolveDirection::StreamFromExtents(KnownSide::Inlet)]
        );
        let product = flowsheet.stream_by_name("product").unwrap();
        assert_relative_eq!(
            flowsheet.flow_of(product, "H2O").unwrap().unwrap(),
            82.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            flowsheet.flow_of(product, "CH3OH").unwrap().unwrap(),
            18.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_json_round_trip() {
        let task = FlowsheetTask::from_json_str(AMINATION_TASK).unwrap();
        let json = task.to_json_string().unwrap();
        assert_eq!(FlowsheetTask::from_json_str(&json).unwrap(), task);
    }

    #[test]
    fn test_task_errors() {
        let mut task = FlowsheetTask::from_json_str(AMINATION_TASK).unwrap();
        task.reactors[0].outlet = "waste".to_string();
        assert!(matches!(task.build(), Err(TaskError::UnknownStream(name)) if name == "waste"));

        task.reactors[0].outlet = "product".to_string();
        task.reactors[0].reaction = 4;
        assert!(matches!(
            task.build(),
            Err(TaskError::UnknownReaction { index: 4, count: 1 })
        ));

        task.reactors[0].reaction = 0;
        task.reactors[0].extents = Some(vec![1.0]);
        assert!(matches!(
            task.solve(),
            Err(TaskError::Process(ProcessError::ExtentCountMismatch { .. }))
        ));

        assert!(matches!(
            FlowsheetTask::from_json_str("{\"species\": 3}"),
            Err(TaskError::Serde(_))
        ));
        assert!(matches!(
            FlowsheetTask::from_file("/nonexistent/task.json"),
            Err(TaskError::Io(_))
        ));
    }

    #[test]
    fn test_empty_task() {
        let flowsheet = FlowsheetTask::from_json_str("{}").unwrap().build().unwrap();
        assert!(flowsheet.registry().is_empty());
        assert_eq!(FlowsheetTask::default().solve().unwrap().1, vec![]);
    }
}
