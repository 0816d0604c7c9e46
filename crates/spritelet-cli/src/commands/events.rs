use super::{json_pretty, CliError, EXIT_SUCCESS};
use spritelet_core::Engine;
use spritelet_schema::Event;

pub fn run(engine: &Engine, limit: Option<usize>, json: bool) -> Result<u8, CliError> {
    let events = engine.history(limit)?;
    if json {
        println!("{}", json_pretty(&events)?);
        return Ok(EXIT_SUCCESS);
    }

    if events.is_empty() {
        println!("no events recorded");
    }
    for event in &events {
        let detail = match event {
            Event::StateCatalogUpserted { simple_name, .. } => format!(" [{simple_name}]"),
            Event::StatePublished {
                simple_name,
                reused,
                ..
            } => format!(
                " [{simple_name}, {}]",
                if *reused { "reused" } else { "generated" }
            ),
            _ => String::new(),
        };
        println!(
            "{}  {:<26} {}{detail}",
            event.updated_at(),
            event.kind(),
            event.spritelet_path()
        );
    }
    Ok(EXIT_SUCCESS)
}
