use anyhow::Result;
use owo_colors::OwoColorize;
use podium_core::{Manager, SortOrder, Submission};

pub fn score(manager: &Manager, leaderboard: &str, value: i64, sort: SortOrder) -> Result<()> {
    let submission = manager.submit_score(leaderboard, value, sort).recv()?;
    report("Score", &submission);
    Ok(())
}

pub fn achievement(manager: &Manager, achievement: &str, percent: f64, banner: bool) -> Result<()> {
    let submission = manager.submit_achievement(achievement, percent, banner).recv()?;
    report("Achievement", &submission);
    Ok(())
}

fn report(what: &str, submission: &Submission) {
    match submission {
        Submission::Sent => println!("{what} {}.", "delivered".green()),
        Submission::Deferred(reason) => {
            println!("{what} {} ({reason}).", "queued for later".yellow())
        }
        Submission::Skipped => {
            println!("{what} does not improve on the cached value; nothing to do.")
        }
    }
}
