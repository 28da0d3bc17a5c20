use anyhow::{bail, Context, Result};
use podium_core::Manager;

pub fn run(manager: &Manager, yes: bool) -> Result<()> {
    if !yes {
        bail!("this wipes all achievement progress remotely and locally; re-run with --yes to confirm");
    }
    manager
        .reset_achievements()
        .recv()?
        .context("reset failed; local progress was kept")?;
    println!("Achievement progress reset.");
    Ok(())
}
