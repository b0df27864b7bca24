use StoichFlow::Examples::flowsheet_examples::flowsheet_examples;
use log::error;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

pub fn main() {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .ok();
    // 0 formulas, 1 balancing, 2 reaction matrix, 3 outlet from extents, 4 plant data, 5 JSON task
    let task: usize = 3;
    if let Err(e) = flowsheet_examples(task) {
        error!("example {} failed: {}", task, e);
    }
}
