//! Process units connecting streams. Every unit has a set of inlet and outlet streams; kinds
//! with their own balance equations (reactor) carry extra state and are dispatched through
//! the `Unit` enum.
use crate::Process::reactor::ReactorUnit;
use crate::Process::stream::StreamId;
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub usize);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessUnit {
    pub comment: Option<String>,
    pub in_streams: Vec<StreamId>,
    pub out_streams: Vec<StreamId>,
}

impl ProcessUnit {
    pub fn new(comment: Option<&str>, in_streams: Vec<StreamId>, out_streams: Vec<StreamId>) -> Self {
        Self {
            comment: comment.map(|c| c.to_string()),
            in_streams,
            out_streams,
        }
    }

    /// every stream touching the unit, inlets first
    pub fn streams(&self) -> impl Iterator<Item = StreamId> + '_ {
        self.in_streams
            .iter()
            .chain(self.out_streams.iter())
            .copied()
    }
}

#[enum_dispatch]
pub trait UnitOperation {
    fn base(&self) -> &ProcessUnit;
    fn kind(&self) -> &'static str;

    fn comment(&self) -> Option<&str> {
        self.base().comment.as_deref()
    }

    fn in_streams(&self) -> &[StreamId] {
        &self.base().in_streams
    }

    fn out_streams(&self) -> &[StreamId] {
        &self.base().out_streams
    }
}

impl UnitOperation for ProcessUnit {
    fn base(&self) -> &ProcessUnit {
        self
    }

    fn kind(&self) -> &'static str {
        "generic"
    }
}

#[derive(Debug, Clone)]
#[enum_dispatch(UnitOperation)]
pub enum Unit {
    Generic(ProcessUnit),
    Reactor(ReactorUnit),
}

impl Unit {
    pub fn as_reactor(&self) -> Option<&ReactorUnit> {
        match self {
            Unit::Reactor(reactor) => Some(reactor),
            Unit::Generic(_) => None,
        }
    }

    pub fn as_reactor_mut(&mut self) -> Option<&mut ReactorUnit> {
        match self {
            Unit::Reactor(reactor) => Some(reactor),
            Unit::Generic(_) => None,
        }
    }
}
