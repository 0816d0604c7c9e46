use super::{image_config, json_pretty, with_spinner, CliError, GeneratorArgs, EXIT_SUCCESS};
use spritelet_core::Engine;
use spritelet_generate::select_generator;

pub fn run(
    engine: &Engine,
    identity: &str,
    output: Option<&str>,
    generator: &GeneratorArgs,
    json: bool,
) -> Result<u8, CliError> {
    let config = generator.resolve()?;
    let backend = select_generator(&config)?;

    let outcome = with_spinner(
        json,
        "generating base image...",
        "base image generated",
        "base image generation failed",
        || engine.generate_base(backend.as_ref(), identity, output, Some(image_config(&config))),
    )?;

    if json {
        println!("{}", json_pretty(&outcome)?);
    } else {
        println!(
            "base image written to {} ({} bytes)",
            outcome.base_image_path, outcome.bytes
        );
    }
    Ok(EXIT_SUCCESS)
}
