use aitrack_core::TrackerManager;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(manager: &mut TrackerManager, dir: &str, target: &Path) -> Result<()> {
    if manager.export_directory(dir, target)? {
        println!(
            "{} {} {} {}",
            "Exported".green().bold(),
            dir,
            "->".dimmed(),
            target.display()
        );
    } else {
        anyhow::bail!("nothing to export for '{dir}' (no recorded changes)");
    }

    Ok(())
}
