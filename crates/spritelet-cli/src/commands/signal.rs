use super::{json_pretty, CliError, EXIT_SUCCESS};
use spritelet_core::Engine;

pub fn run(engine: &Engine, spritelet_path: &str, json: bool) -> Result<u8, CliError> {
    let current = engine.set_signal(spritelet_path)?;
    if json {
        println!("{}", json_pretty(&current)?);
    } else {
        println!("current spritelet: {}", current.spritelet_path);
    }
    Ok(EXIT_SUCCESS)
}
