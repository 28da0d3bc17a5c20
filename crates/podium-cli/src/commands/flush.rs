use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use podium_core::Manager;
use tracing::info;

use crate::shutdown::ShutdownSignal;

pub fn run(manager: &Manager, watch: bool, interval: u64) -> Result<()> {
    if !watch {
        return flush_once(manager);
    }

    let signal = Arc::new(ShutdownSignal::new());
    let handler = signal.clone();
    ctrlc::set_handler(move || handler.trigger()).context("failed to install Ctrl-C handler")?;

    println!("Flushing every {interval}s until Ctrl-C...");
    loop {
        flush_once(manager)?;
        if signal.wait(Duration::from_secs(interval)) {
            info!("watch stopped");
            return Ok(());
        }
    }
}

fn flush_once(manager: &Manager) -> Result<()> {
    let report = manager.flush().recv()?;
    if report.is_empty() {
        println!("Queue empty, nothing to flush.");
        return Ok(());
    }
    if report.is_clean() {
        println!("Delivered {} entries.", report.sent_count().green());
    } else {
        println!(
            "Delivered {} entries, {} still pending.",
            report.sent_count().green(),
            report.failed.yellow()
        );
    }
    for entry in &report.sent_scores {
        println!("  score {} = {}", entry.leaderboard, entry.value);
    }
    for entry in &report.sent_achievements {
        println!("  achievement {} = {}%", entry.achievement, entry.percent);
    }
    Ok(())
}
