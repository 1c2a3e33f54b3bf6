use anyhow::Result;
use pagedrift::config::Config;
use std::path::Path;

pub fn init_config(path: &Path, force: bool) -> Result<()> {
    let config_path = path.join("pagedrift.toml");
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    std::fs::create_dir_all(path)?;
    let toml_content = format!("# pagedrift configuration\n\n{}", Config::default().to_toml()?);
    std::fs::write(&config_path, toml_content)?;
    println!("Created configuration file: {}", config_path.display());

    Ok(())
}
