//! # Reactor mass balance
//!
//! A reactor has exactly one inlet and one outlet stream and a reaction set with
//! elementary stoichiometric matrix E (|R| species × k reactions). For every species
//! the balance reads
//!
//! ```text
//! out_i = in_i + Σ_j E[i, j]·ξ_j
//! ```
//!
//! where ξ is the vector of reaction extents. Exactly one side may be unknown:
//! - both streams known: ξ is found by least squares from Δ = out - in
//! - one stream known and ξ given: the other stream follows directly
//!
//! The coupling matrix M ((n + m) × (n + k), n = union species, m = inlet species) ties
//! flows to extents: identity in the top-left block, -E rows of the union species in the
//! top-right block and -E rows of the inlet species in the bottom-right block.
use crate::Chemistry::reaction::{Reaction, ReactionId};
use crate::Chemistry::species::SpeciesId;
use crate::Process::errors::ProcessError;
use crate::Process::stream::{Stream, StreamId};
use crate::Process::unit::{ProcessUnit, UnitOperation};
use crate::linear_solver::{LinearSolver, residual_norm};
use crate::settings::Settings;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownSide {
    Inlet,
    Outlet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveDirection {
    /// both streams known, extents found
    ExtentsFromStreams,
    /// extents given, the stream opposite to the known side was computed
    StreamFromExtents(KnownSide),
}

#[derive(Debug, Clone)]
pub struct ReactorUnit {
    base: ProcessUnit,
    reaction: ReactionId,
    union_species: Vec<SpeciesId>,
    extents: Vec<f64>,
    coupling_matrix: DMatrix<f64>,
    residual: Option<f64>,
    residual_warning: f64,
    flow_tolerance: f64,
}

impl UnitOperation for ReactorUnit {
    fn base(&self) -> &ProcessUnit {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "reactor"
    }
}

impl ReactorUnit {
    pub fn new(
        inlet: StreamId,
        outlet: StreamId,
        reaction: ReactionId,
        comment: Option<&str>,
    ) -> Self {
        let settings = Settings::default();
        Self {
            base: ProcessUnit::new(comment, vec![inlet], vec![outlet]),
            reaction,
            union_species: Vec::new(),
            extents: Vec::new(),
            coupling_matrix: DMatrix::zeros(0, 0),
            residual: None,
            residual_warning: settings.residual_warning,
            flow_tolerance: settings.flow_tolerance,
        }
    }

    /// takes the warning thresholds from the settings
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.residual_warning = settings.residual_warning;
        self.flow_tolerance = settings.flow_tolerance;
        self
    }

    pub fn inlet(&self) -> StreamId {
        self.base.in_streams[0]
    }

    pub fn outlet(&self) -> StreamId {
        self.base.out_streams[0]
    }

    pub fn reaction(&self) -> ReactionId {
        self.reaction
    }

    /// inlet species followed by outlet species not already listed; rebuilt by every assembly
    pub fn union_species(&self) -> &[SpeciesId] {
        &self.union_species
    }

    pub fn extents(&self) -> &[f64] {
        &self.extents
    }

    pub fn set_extents(&mut self, extents: Vec<f64>) {
        self.extents = extents;
        self.residual = None;
    }

    pub fn coupling_matrix(&self) -> &DMatrix<f64> {
        &self.coupling_matrix
    }

    /// least-squares residual norm of the last extent solve
    pub fn residual(&self) -> Option<f64> {
        self.residual
    }

    /// which stream the balance starts from; exactly one must be fully known
    pub fn known_side(inlet: &Stream, outlet: &Stream) -> Result<KnownSide, ProcessError> {
        match (inlet.all_flows_known(), outlet.all_flows_known()) {
            (true, false) => Ok(KnownSide::Inlet),
            (false, true) => Ok(KnownSide::Outlet),
            (true, true) => Err(ProcessError::OverdeterminedStreams),
            (false, false) => Err(ProcessError::UnderdeterminedStreams),
        }
    }

    /// every reaction species must appear in at least one of the two streams
    pub fn check_coverage(
        reaction: &Reaction,
        inlet: &Stream,
        outlet: &Stream,
    ) -> Result<(), ProcessError> {
        let missing: Vec<SpeciesId> = reaction
            .species()
            .iter()
            .copied()
            .filter(|id| !inlet.contains(*id) && !outlet.contains(*id))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProcessError::StreamCannotCoverReaction { missing })
        }
    }

    pub fn assemble_coupling(
        &mut self,
        reaction: &Reaction,
        inlet: &Stream,
        outlet: &Stream,
    ) -> Result<&DMatrix<f64>, ProcessError> {
        Self::check_coverage(reaction, inlet, outlet)?;
        let mut union_species: Vec<SpeciesId> = inlet.species().collect();
        for id in outlet.species() {
            if !union_species.contains(&id) {
                union_species.push(id);
            }
        }
        let e = reaction.elementary_matrix();
        let n = union_species.len();
        let m = inlet.len();
        let k = reaction.num_reactions();

        let mut coupling = DMatrix::zeros(n + m, n + k);
        for (i, id) in union_species.iter().enumerate() {
            coupling[(i, i)] = 1.0;
            if let Some(row) = reaction.row_of(*id) {
                for j in 0..k {
                    coupling[(i, n + j)] = -e[(row, j)];
                }
            }
        }
        for (i, id) in inlet.species().enumerate() {
            if let Some(row) = reaction.row_of(id) {
                for j in 0..k {
                    coupling[(n + i, n + j)] = -e[(row, j)];
                }
            }
        }
        debug!(
            "coupling matrix {}x{} assembled for {} union species",
            coupling.nrows(),
            coupling.ncols(),
            n
        );
        self.union_species = union_species;
        self.coupling_matrix = coupling;
        Ok(&self.coupling_matrix)
    }

    /// Direction A: both streams known, extents from E·ξ = out - in by least squares
    pub fn solve_extents_from_streams<S: LinearSolver>(
        &mut self,
        reaction: &Reaction,
        inlet: &Stream,
        outlet: &Stream,
        solver: &S,
    ) -> Result<&[f64], ProcessError> {
        if !(inlet.all_flows_known() && outlet.all_flows_known()) {
            return Err(ProcessError::UnderdeterminedStreams);
        }
        self.assemble_coupling(reaction, inlet, outlet)?;
        let e = reaction.elementary_matrix();
        let delta = DVector::from_iterator(
            reaction.species().len(),
            reaction.species().iter().map(|id| {
                outlet.molar_flow(*id).unwrap_or(0.0) - inlet.molar_flow(*id).unwrap_or(0.0)
            }),
        );
        let xi = solver.solve(&e, &delta)?;
        let residual = residual_norm(&e, &xi, &delta);
        if residual > self.residual_warning {
            warn!(
                "streams {} -> {} are not consistent with the reaction set, residual norm {:.4e}",
                inlet.name(),
                outlet.name(),
                residual
            );
        }
        info!(
            "extents {:?} found with {}, residual {:.4e}",
            xi.as_slice(),
            solver.name(),
            residual
        );
        self.extents = xi.iter().copied().collect();
        self.residual = Some(residual);
        Ok(&self.extents)
    }

    /// Direction B: extents given, the unknown stream follows from the known one.
    /// Every union species ends up known in the computed stream: reaction species get
    /// known ± E·ξ, the others are copied from the known side.
    pub fn solve_stream_from_extents(
        &mut self,
        reaction: &Reaction,
        inlet: &mut Stream,
        outlet: &mut Stream,
    ) -> Result<KnownSide, ProcessError> {
        let side = Self::known_side(inlet, outlet)?;
        let k = reaction.num_reactions();
        if self.extents.len() != k {
            return Err(ProcessError::ExtentCountMismatch {
                expected: k,
                found: self.extents.len(),
            });
        }
        self.assemble_coupling(reaction, inlet, outlet)?;
        let xi = DVector::from_column_slice(&self.extents);
        let delta = reaction.elementary_matrix() * xi;

        let (known, unknown, sign) = match side {
            KnownSide::Inlet => (&*inlet, &mut *outlet, 1.0),
            KnownSide::Outlet => (&*outlet, &mut *inlet, -1.0),
        };
        let mut flows: Vec<(SpeciesId, f64)> = Vec::with_capacity(self.union_species.len());
        for id in &self.union_species {
            let base = known.molar_flow(*id);
            let flow = match reaction.row_of(*id) {
                Some(row) => base.unwrap_or(0.0) + sign * delta[row],
                None => base.unwrap_or_else(|| {
                    warn!(
                        "species {:?} of stream {} is absent from {}, flow set to 0",
                        id,
                        unknown.name(),
                        known.name()
                    );
                    0.0
                }),
            };
            if flow < -self.flow_tolerance {
                warn!(
                    "negative flow {:.4} of species {:?} in stream {}",
                    flow,
                    id,
                    unknown.name()
                );
            }
            flows.push((*id, flow));
        }
        unknown.update_flows(&flows);
        info!("stream {} computed from extents {:?}", unknown.name(), self.extents);
        Ok(side)
    }

    /// both known: extents; one known: the other stream; none known: error
    pub fn solve<S: LinearSolver>(
        &mut self,
        reaction: &Reaction,
        inlet: &mut Stream,
        outlet: &mut Stream,
        solver: &S,
    ) -> Result<SolveDirection, ProcessError> {
        match Self::known_side(inlet, outlet) {
            Err(ProcessError::OverdeterminedStreams) => {
                self.solve_extents_from_streams(reaction, inlet, outlet, solver)?;
                Ok(SolveDirection::ExtentsFromStreams)
            }
            Err(e) => Err(e),
            Ok(_) => {
                let side = self.solve_stream_from_extents(reaction, inlet, outlet)?;
                Ok(SolveDirection::StreamFromExtents(side))
            }
        }
    }
}
