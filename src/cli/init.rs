use std::path::PathBuf;

use crate::db;
use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings()?;
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    settings.matching.validate()?;

    save_settings(&settings)?;
    db::open(&settings)?;

    println!("Initialized ledgermatch at {}", PathBuf::from(&settings.data_dir).display());
    println!("Settings: {}", settings_path().display());
    Ok(())
}
