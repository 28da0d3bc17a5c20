use std::fs;
use std::path::Path;

use anyhow::Result;
use podium_core::Manager;

pub fn run(manager: &Manager, out: &Path) -> Result<()> {
    match manager.player_photo().recv()? {
        Ok(bytes) => {
            fs::write(out, &bytes)?;
            println!("Wrote {} bytes to {}.", bytes.len(), out.display());
            Ok(())
        }
        Err(err) if err.is_deferrable() => {
            println!("Cannot fetch the photo right now: {err}.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
