use super::{
    colorize_reuse, image_config, json_pretty, with_spinner, CliError, GeneratorArgs, EXIT_SUCCESS,
};
use spritelet_core::{Engine, PublishOptions};
use spritelet_generate::select_generator;

pub fn run(
    engine: &Engine,
    simple_name: &str,
    description: &str,
    force: bool,
    generator: &GeneratorArgs,
    json: bool,
) -> Result<u8, CliError> {
    let config = generator.resolve()?;
    let backend = select_generator(&config)?;
    let options = PublishOptions {
        description: description.to_owned(),
        force,
        image_config: Some(image_config(&config)),
    };

    let outcome = with_spinner(
        json,
        &format!("publishing {simple_name}..."),
        "state published",
        "publish failed",
        || engine.publish(backend.as_ref(), simple_name, &options),
    )?;

    if json {
        println!("{}", json_pretty(&outcome)?);
    } else {
        println!(
            "published {} -> {} ({})",
            outcome.simple_name,
            outcome.spritelet_path,
            colorize_reuse(outcome.reused)
        );
    }
    Ok(EXIT_SUCCESS)
}
