use anyhow::Result;
use podium_core::Manager;

pub fn run(manager: &Manager) -> Result<()> {
    match manager.challenges().recv()? {
        Ok(challenges) => {
            if challenges.is_empty() {
                println!("No open challenges.");
                return Ok(());
            }
            for challenge in &challenges {
                println!(
                    "{} [{}] from {} on {}: {}",
                    challenge.id,
                    challenge.state,
                    challenge.issuer,
                    challenge.issued_at.format("%Y-%m-%d"),
                    challenge.message.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        }
        Err(err) if err.is_deferrable() => {
            println!("Cannot fetch challenges right now: {err}.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
