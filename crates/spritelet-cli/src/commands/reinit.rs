use super::{json_pretty, CliError, EXIT_FAILURE, EXIT_SUCCESS};
use spritelet_core::{Engine, InitOptions};

pub fn run(engine: &Engine, options: &InitOptions, yes: bool, json: bool) -> Result<u8, CliError> {
    if !yes {
        return Err(CliError {
            code: EXIT_FAILURE,
            message: format!(
                "reinit deletes every file under assets/ and states/ in {}; pass --yes to confirm",
                engine.store_layout().root().display()
            ),
        });
    }

    let report = engine.reinit(options)?;
    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!("reset spritelet store at {}", report.root.display());
        println!(
            "removed {} files (assets {}, states {}) and {} directories",
            report.files_removed.total,
            report.files_removed.assets,
            report.files_removed.states,
            report.dirs_removed.total
        );
    }
    Ok(EXIT_SUCCESS)
}
