use anyhow::Result;
use podium_core::Manager;

pub fn run(manager: &Manager) -> Result<()> {
    match manager.sync().recv()? {
        Ok(report) => {
            println!(
                "Merged {} scores and {} achievement updates from the platform.",
                report.merged_scores, report.merged_achievements
            );
            if report.pruned > 0 {
                println!("Dropped {} queue entries the merge made redundant.", report.pruned);
            }
            println!(
                "Flushed {} entries, {} still pending.",
                report.flush.sent_count(),
                report.flush.failed
            );
            Ok(())
        }
        Err(err) if err.is_deferrable() => {
            println!("Cannot sync right now: {err}. Queued work is kept for later.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
