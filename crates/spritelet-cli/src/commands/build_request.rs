use super::{json_pretty, CliError, GeneratorArgs, EXIT_SUCCESS};
use spritelet_core::Engine;
use std::path::Path;

pub fn run(
    engine: &Engine,
    simple_name: &str,
    description: &str,
    base_image: Option<&str>,
    output: &Path,
    generator: &GeneratorArgs,
) -> Result<u8, CliError> {
    let config = generator.resolve()?;
    let payload = engine.build_request(simple_name, description, base_image, &config.model)?;
    let rendered = json_pretty(&payload)?;

    if output.as_os_str() == "-" {
        println!("{rendered}");
    } else {
        std::fs::write(output, format!("{rendered}\n"))
            .map_err(|e| format!("failed to write {}: {e}", output.display()))?;
        println!("wrote {}", output.display());
    }
    Ok(EXIT_SUCCESS)
}
