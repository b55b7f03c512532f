use clap::Subcommand;
use wakepoint_core::{DurableConfig, PreferenceStore};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the durable configuration mirror as JSON
    Show,
    /// Reset the mirror to the library defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = PreferenceStore::open_default()?;
    match action {
        ConfigAction::Show => match store.load_config()? {
            Some(config) => println!("{}", serde_json::to_string_pretty(&config)?),
            None => println!("{}", serde_json::json!(null)),
        },
        ConfigAction::Reset => {
            let defaults = DurableConfig::default();
            store.save_config(&defaults)?;
            println!("{}", serde_json::to_string_pretty(&defaults)?);
        }
    }
    Ok(())
}
