use anyhow::Result;
use owo_colors::OwoColorize;
use podium_core::{Link, Manager};

pub fn run(manager: &Manager, json: bool) -> Result<()> {
    let key = manager.player_key();
    let label = manager
        .player()
        .map(|p| p.display_label().to_string())
        .unwrap_or_else(|| key.clone());
    let link = manager.link();
    let scores = manager.high_scores();
    let progress = manager.progresses();
    let pending = manager.pending_count();

    if json {
        let value = serde_json::json!({
            "player": key,
            "display_name": label,
            "link": link.to_string(),
            "high_scores": scores,
            "progress": progress,
            "pending": pending,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Player: {label} ({key})");
    match link {
        Link::Online => println!("Link:   {}", link.green()),
        Link::Offline => println!("Link:   {}", link.yellow()),
        _ => println!("Link:   {}", link.red()),
    }
    println!();
    if scores.is_empty() {
        println!("No cached scores.");
    } else {
        println!("High scores:");
        for (board, value) in &scores {
            println!("  {board}: {value}");
        }
    }
    if progress.is_empty() {
        println!("No achievement progress.");
    } else {
        println!("Achievements:");
        for (id, percent) in &progress {
            println!("  {id}: {percent}%");
        }
    }
    println!();
    if pending > 0 {
        println!("Pending entries: {}", pending.yellow());
    } else {
        println!("Pending entries: {pending}");
    }
    Ok(())
}
