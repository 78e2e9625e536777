use std::path::Path;

use crate::error::{Result, TallyError};
use crate::settings::{default_config_path, save_configuration, Configuration};

pub fn run(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if path.exists() && !force {
        return Err(TallyError::Settings(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let config = Configuration::default();
    save_configuration(&config, &path)?;
    std::fs::create_dir_all(config.input_dir())?;
    std::fs::create_dir_all(config.output_dir())?;

    println!("Wrote configuration to {}", path.display());
    println!("Drop statements into {}", config.input_dir().display());
    Ok(())
}
