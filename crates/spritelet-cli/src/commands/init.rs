use super::{json_pretty, CliError, EXIT_SUCCESS};
use spritelet_core::{Engine, InitOptions};

pub fn run(engine: &Engine, options: &InitOptions, json: bool) -> Result<u8, CliError> {
    let profile = engine.init(options)?;
    let root = engine.store_layout().root();
    if json {
        let payload = serde_json::json!({
            "initialized": true,
            "root": root,
            "profile": profile,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("initialized spritelet store at {}", root.display());
        println!("base image: {}", profile.base_image_path);
    }
    Ok(EXIT_SUCCESS)
}
