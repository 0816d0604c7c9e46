use super::{colorize_flag, json_pretty, CliError, EXIT_FAILURE, EXIT_SUCCESS};
use spritelet_core::Engine;

pub fn run(engine: &Engine, simple_name: &str, json: bool) -> Result<u8, CliError> {
    let report = engine.find(simple_name)?;

    if json {
        println!("{}", json_pretty(&report)?);
    } else if let Some(d) = &report.details {
        println!("{} -> {}", report.simple_name, d.state.spritelet_path);
        if !d.state.description.is_empty() {
            println!("  description:      {}", d.state.description);
        }
        println!("  created_at:       {}", d.state_created_at);
        match &d.base_image_mtime {
            Some(mtime) => println!("  base image:       {} (modified {mtime})", d.base_image_path),
            None => println!("  base image:       {} (missing)", d.base_image_path),
        }
        println!("  stale:            {}", colorize_flag(d.state_is_stale));
        if !d.artifact_present {
            println!("  artifact:         missing");
        }
        println!("  reuse on publish: {}", colorize_flag(d.would_reuse_on_publish));
    } else {
        println!("no state named '{}'", report.simple_name);
    }

    Ok(if report.found { EXIT_SUCCESS } else { EXIT_FAILURE })
}
