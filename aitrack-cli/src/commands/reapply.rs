use aitrack_core::TrackerManager;
use anyhow::Result;
use colored::Colorize;

pub fn run(manager: &mut TrackerManager, path: &str) -> Result<()> {
    let Some(tracker) = manager.get_tracker_for_path(path)? else {
        anyhow::bail!("no tracker owns '{path}' (expected <root-kind>/<name>/...)");
    };

    tracker.reapply_file(path)?;
    println!("{} {}", "Reapplied".green().bold(), path);

    Ok(())
}
