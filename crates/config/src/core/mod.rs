use crate::constants::{GREEN_ANSI_COLOR, RED_ANSI_COLOR, RESET_ANSI_COLOR};
use crate::{ConfigArgs, Configuration};
use eyre::Result;

/// The `config` command is used to display and edit the current configuration.
pub fn config(args: ConfigArgs) -> Result<()> {
    if args.key.is_empty() {
        let config = Configuration::load()?;
        println!("Configuration: {}\n", serde_json::to_string_pretty(&config)?);
        println!("{GREEN_ANSI_COLOR}Hint: {RESET_ANSI_COLOR}use `statediff config <KEY> <VALUE>` to set a key/value pair.");
        return Ok(());
    }

    if args.value.is_empty() {
        println!("{RED_ANSI_COLOR}Error: {RESET_ANSI_COLOR}use `statediff config <KEY> <VALUE>` to set a key/value pair.");
        return Ok(());
    }

    // only the file is updated, env overrides are not persisted
    let mut config = Configuration::load_file()?;
    match config.set(&args.key, &args.value).and_then(|_| config.save()) {
        Ok(_) => {
            println!(
                "{GREEN_ANSI_COLOR}Success: {RESET_ANSI_COLOR}'{}' set to '{}'.",
                args.key, args.value
            );
            println!("Configuration: {}\n", serde_json::to_string_pretty(&config)?);
        }
        Err(e) => println!("{RED_ANSI_COLOR}Error: {RESET_ANSI_COLOR}{}", e),
    };

    Ok(())
}
