//! `callmap projects`: list registry entries.

use anyhow::Result;
use colored::Colorize;

use callmap_core::ProjectRegistry;

pub fn run(registry: &ProjectRegistry) -> Result<()> {
    let entries = registry.entries();
    if entries.is_empty() {
        println!("no projects analyzed yet");
        return Ok(());
    }

    for entry in entries {
        let analyzed = match entry.last_analyzed {
            Some(_) => "analyzed".green(),
            None => "never analyzed".yellow(),
        };
        println!(
            "{}  {}  {}",
            entry.name.bold(),
            analyzed,
            entry.root_path.display().to_string().dimmed()
        );
        println!("    {}", entry.db_path.display().to_string().dimmed());
    }
    Ok(())
}
