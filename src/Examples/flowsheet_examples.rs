use crate::Chemistry::balancer::EquationBalancer;
use crate::Chemistry::molmass::{
    calculate_molar_mass, calculate_molar_mass_of_vector_of_subs, create_elem_composition_matrix,
    parse_formula,
};
use crate::Chemistry::reaction::{Reaction, ReactionId};
use crate::Chemistry::species::{Species, SpeciesRegistry};
use crate::Process::flowsheet::Flowsheet;
use crate::Process::task::FlowsheetTask;
use crate::settings::Settings;
use log::info;
use std::error::Error;

fn amination_flowsheet(settings: Settings) -> Result<(Flowsheet, ReactionId), Box<dyn Error>> {
    let mut flowsheet = Flowsheet::new(settings);
    for (name, abbreviation) in [
        ("ammonia", "NH3"),
        ("methanol", "CH3OH"),
        ("methylamine", "CH3NH2"),
        ("water", "H2O"),
        ("dimethylamine", "(CH3)2NH"),
    ] {
        flowsheet.add_species(name, abbreviation)?;
    }
    let reaction = flowsheet.add_reaction(
        &[
            "NH3 + CH3OH = CH3NH2 + H2O",
            "CH3NH2 + CH3OH = (CH3)2NH + H2O",
        ],
        Some("methylamines synthesis"),
    )?;
    Ok((flowsheet, reaction))
}

pub fn flowsheet_examples(task: usize) -> Result<(), Box<dyn Error>> {
    match task {
        0 => {
            // atomic composition, molar masses and matrix of atomic composition
            let (molar_mass, element_composition) = calculate_molar_mass("C6H8O6", None)?;
            println!("Element counts: {:?}", element_composition);
            println!("Molar mass: {:?} g/mol", molar_mass);
            println!("{:?}", parse_formula("K4(Fe(CN)6)")?);

            let vec_of_formulae = vec!["H2O", "NaCl", "C6H8O6", "Ca(NO3)2", "Ca(OH)2"];
            let molar_masses = calculate_molar_mass_of_vector_of_subs(&vec_of_formulae, None)?;
            for (formula, mass) in vec_of_formulae.iter().zip(molar_masses) {
                println!("{}: {:.3} g/mol", formula, mass);
            }
            let (matrix, elements) = create_elem_composition_matrix(&vec_of_formulae, None)?;
            println!("elements {:?} {}", elements, matrix);
        }
        1 => {
            // balancing of equations
            let balancer = EquationBalancer::new(&Settings::default());
            for equation in [
                "H2 + O2 = H2O",
                "CH4 + O2 = CO2 + H2O",
                "KMnO4 + HCl = KCl + MnCl2 + H2O + Cl2",
            ] {
                println!("{}  ->  {}", equation, balancer.balance(equation)?);
                println!(
                    "integer coefficients: {:?}",
                    balancer.integer_coefficients(equation)?
                );
            }
        }
        2 => {
            // stoichiometric matrix of a reaction set
            let mut registry = SpeciesRegistry::new();
            for abbreviation in ["NH3", "CH3OH", "CH3NH2", "H2O", "(CH3)2NH", "((CH3)3N"] {
                // the last formula is malformed: registered without a molar mass
                registry.register(Species::new(abbreviation, abbreviation))?;
            }
            registry.pretty_print();
            let reaction = Reaction::parse(
                &registry,
                &[
                    "NH3 + CH3OH = CH3NH2 + H2O",
                    "CH3NH2 + CH3OH = (CH3)2NH + H2O",
                ],
                Some("methylamines synthesis"),
            )?;
            reaction.pretty_print(&registry);
            println!("aggregate column: {}", reaction.aggregate_column());
        }
        3 => {
            // outlet stream from known inlet and extents
            let (mut flowsheet, reaction) = amination_flowsheet(Settings::default())?;
            let feed = flowsheet
                .add_stream_with_flows("feed", &[("NH3", Some(100.0)), ("CH3OH", Some(100.0))])?;
            let product = flowsheet.add_stream_with_flows(
                "product",
                &[
                    ("NH3", None),
                    ("CH3OH", None),
                    ("CH3NH2", None),
                    ("H2O", None),
                    ("(CH3)2NH", None),
                ],
            )?;
            let reactor = flowsheet.add_reactor(feed, product, reaction, Some("R-101"))?;
            flowsheet.set_extents(reactor, vec![60.0, 22.0])?;
            let direction = flowsheet.solve_unit(reactor)?;
            info!("solved: {:?}", direction);
            flowsheet.pretty_print();
            println!(
                "coupling matrix {}",
                flowsheet.reactor(reactor)?.coupling_matrix()
            );
        }
        4 => {
            // extents from measured plant data, least squares
            let (mut flowsheet, reaction) = amination_flowsheet(Settings::default())?;
            let feed = flowsheet
                .add_stream_with_flows("feed", &[("NH3", Some(100.0)), ("CH3OH", Some(100.0))])?;
            let product = flowsheet.add_stream_with_flows(
                "product",
                &[
                    ("NH3", Some(40.0)),
                    ("CH3OH", Some(18.8)),
                    ("CH3NH2", Some(37.2)),
                    ("H2O", Some(82.2)),
                    ("(CH3)2NH", Some(21.8)),
                ],
            )?;
            let reactor = flowsheet.add_reactor(feed, product, reaction, None)?;
            let extents = flowsheet.solve_extents(reactor)?;
            println!(
                "extents {:?}, residual {:?}",
                extents,
                flowsheet.reactor(reactor)?.residual()
            );
        }
        5 => {
            // the same flowsheet from JSON
            let task = FlowsheetTask::from_json_str(
                r#"{
                "species": [{"abbreviation": "H2"}, {"abbreviation": "O2"}, {"abbreviation": "H2O"}],
                "reactions": [{"equations": ["2H2 + O2 = 2H2O"]}],
                "streams": [
                    {"name": "feed", "flows": [{"species": "H2", "flow": 4.0}, {"species": "O2", "flow": 3.0}]},
                    {"name": "product", "flows": [{"species": "H2"}, {"species": "O2"}, {"species": "H2O"}]}
                ],
                "reactors": [{"inlet": "feed", "outlet": "product", "reaction": 0, "extents": [2.0]}]
            }"#,
            )?;
            let (flowsheet, directions) = task.solve()?;
            println!("{:?}", directions);
            flowsheet.pretty_print();
        }
        _ => {
            println!("no such example: {}", task);
        }
    }
    Ok(())
}
