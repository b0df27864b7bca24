/// runnable walkthroughs: formulas, balancing, reaction matrices, reactor solves and JSON tasks
pub mod flowsheet_examples;
