use super::{json_pretty, CliError, EXIT_FAILURE, EXIT_SUCCESS};
use spritelet_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, CliError> {
    let report = engine.verify()?;

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!(
            "store integrity: {}/{} checks passed",
            report.passed, report.checked
        );
        for f in &report.failed {
            println!("  FAIL {}: {}", f.subject, f.reason);
        }
    }

    if report.is_clean() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILURE)
    }
}
