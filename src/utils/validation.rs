use validator::Validate;

use crate::error::Result;

/// Runs derive-based validation, reporting failures as a 400.
pub fn validate<T: Validate>(val: &T) -> Result<()> {
    val.validate()?;
    Ok(())
}
