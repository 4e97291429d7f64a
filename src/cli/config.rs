use crate::error::Result;
use crate::settings::load_settings;

/// Print the matching configuration in effect, after validation.
pub fn run() -> Result<()> {
    let settings = load_settings()?;
    settings.matching.validate()?;
    println!("{}", serde_json::to_string_pretty(&settings.matching)?);
    Ok(())
}
