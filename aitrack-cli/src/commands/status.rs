use aitrack_core::{ChangeKind, TrackerManager};
use anyhow::Result;
use colored::Colorize;

pub fn run(manager: &mut TrackerManager) -> Result<()> {
    let active = manager.get_active_trackers();

    if active.is_empty() {
        println!("{}", "No tracked changes found".green());
        return Ok(());
    }

    println!("{}", "Tracked directories".bold().cyan());

    for (dir, tracker) in active {
        println!();
        println!(
            "{} {}",
            dir.display().to_string().white().bold(),
            format!("({} change(s))", tracker.changes().len()).yellow()
        );

        for change in tracker.changes() {
            let icon = match change.kind {
                ChangeKind::Created => "+".green(),
                ChangeKind::Modified => "~".yellow(),
                ChangeKind::Deleted => "-".red(),
            };

            let mut line = format!("  {} {}", icon, change.path);
            if tracker.is_reverted(&change.path) {
                line.push_str(&format!(" {}", "[reverted]".magenta()));
            }
            println!("{} {}", line, change.reason.dimmed());
        }
    }

    Ok(())
}
