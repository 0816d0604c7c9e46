use super::{json_pretty, CliError, EXIT_SUCCESS};
use spritelet_core::Engine;

pub fn run(
    engine: &Engine,
    simple_name: &str,
    spritelet_path: &str,
    description: &str,
    json: bool,
) -> Result<u8, CliError> {
    let entry = engine.register(simple_name, spritelet_path, description)?;
    if json {
        let payload = serde_json::json!({ "registered": true, "state": entry });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("registered {} -> {}", entry.simple_name, entry.spritelet_path);
    }
    Ok(EXIT_SUCCESS)
}
