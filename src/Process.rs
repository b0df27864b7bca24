//! # Process Module
//!
//! Streams, process units and the linear mass balance of reactors.
//!
//! ## Structure
//! - `stream`: species with known or unknown molar flows
//! - `unit`: generic units and the `UnitOperation` trait dispatched over unit kinds
//! - `reactor`: coupling matrix and the two solve directions of a reactor
//! - `flowsheet`: owner of all species, reactions, streams and units
//! - `task`: JSON description of a flowsheet
//!
//! ## Example
//! ```
//! use StoichFlow::Process::flowsheet::Flowsheet;
//! let mut flowsheet = Flowsheet::default();
//! for abbr in ["H2", "O2", "H2O"] {
//!     flowsheet.add_species(abbr, abbr).unwrap();
//! }
//! let reaction = flowsheet.add_reaction(&["2H2 + O2 = 2H2O"], None).unwrap();
//! let feed = flowsheet
//!     .add_stream_with_flows("feed", &[("H2", Some(4.0)), ("O2", Some(3.0))])
//!     .unwrap();
//! let product = flowsheet
//!     .add_stream_with_flows("product", &[("H2", None), ("O2", None), ("H2O", None)])
//!     .unwrap();
//! let reactor = flowsheet.add_reactor(feed, product, reaction, None).unwrap();
//! flowsheet.set_extents(reactor, vec![2.0]).unwrap();
//! flowsheet.solve_unit(reactor).unwrap();
//! assert_eq!(flowsheet.flow_of(product, "O2").unwrap(), Some(1.0));
//! ```
pub mod errors;
pub mod flowsheet;
pub mod reactor;
pub mod stream;
pub mod task;
pub mod unit;
