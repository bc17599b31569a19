//! End-to-end tests: whole programs through the public API and the CLI binary.

#[path = "integration/classes.rs"]
mod classes;
#[path = "integration/cli.rs"]
mod cli;
#[path = "integration/control_flow.rs"]
mod control_flow;
#[path = "integration/errors.rs"]
mod errors;
#[path = "integration/functions.rs"]
mod functions;
#[path = "integration/modules.rs"]
mod modules;
#[path = "integration/pattern_matching.rs"]
mod pattern_matching;
#[path = "integration/preprocess.rs"]
mod preprocess;
#[path = "integration/properties.rs"]
mod properties;
#[path = "integration/scenarios.rs"]
mod scenarios;

/// Output of `source` split into lines
pub fn lines(source: &str) -> Vec<String> {
    techlang::run(source)
        .lines()
        .map(str::to_string)
        .collect()
}
