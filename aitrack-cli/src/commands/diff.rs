use aitrack_core::TrackerManager;
use anyhow::Result;
use colored::Colorize;

pub fn run(manager: &mut TrackerManager, dir: &str) -> Result<()> {
    let Some(tracker) = manager.get_tracker_for_path(dir)? else {
        anyhow::bail!("no tracker owns '{dir}' (expected <root-kind>/<name>)");
    };

    if !tracker.has_changes() {
        println!("{}", "No recorded changes".green());
        return Ok(());
    }

    for line in tracker.generate_diff()?.lines() {
        if line.starts_with("diff --git") {
            println!("{}", line.bold().cyan());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else {
            println!("{line}");
        }
    }

    Ok(())
}
