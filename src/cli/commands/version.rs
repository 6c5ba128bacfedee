//! version command

use anyhow::Result;

/// Print the crate version.
pub fn version() -> Result<()> {
    println!("{}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
