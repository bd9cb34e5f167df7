//! Display formatting for CLI output

use composepack_compose::{ChangeType, DiffLine, DiffReport};
use console::style;

/// Print a diff report in a human-readable form
pub fn print_diff_report(report: &DiffReport, show_files: bool) {
    if report.is_new_release {
        println!("{}", style("New release - what would be created:").bold());
        println!();
        println!("{}", style("Docker Compose configuration:").underlined());
        println!("{}", report.new_compose);

        if !report.services.is_empty() {
            println!("{}", style("Services that would be created:").underlined());
            for svc in &report.services {
                println!("  {} {}", style("+").green(), svc.name);
            }
            println!();
        }

        if !report.files.is_empty() {
            println!("{}", style("Files that would be created:").underlined());
            for file in &report.files {
                println!("  {} {}", style("+").green(), file.path);
            }
            println!();
        }
        return;
    }

    if report.compose_diff.is_empty() {
        println!(
            "{} No changes detected in docker-compose.yaml",
            style("✓").green()
        );
    } else {
        println!("{}", style("Docker Compose changes:").bold());
        println!();
        print_diff_lines(&report.compose_diff);
        println!();

        if !report.services.is_empty() {
            println!("{}", style("Affected services:").underlined());
            for svc in &report.services {
                let tag = match svc.change_type {
                    ChangeType::Added => style("added").green(),
                    ChangeType::Modified => style("modified").yellow(),
                    ChangeType::Removed => style("removed").red(),
                };
                println!("  - {} ({})", svc.name, tag);
            }
            println!();
        }
    }

    if report.files.is_empty() {
        if show_files {
            println!("{} No changes detected in files/", style("✓").green());
        }
        return;
    }

    println!("{}", style("File changes:").bold());
    for file in &report.files {
        let (symbol, tag) = match file.change_type {
            ChangeType::Added => (style("+").green(), "added"),
            ChangeType::Modified => (style("~").yellow(), "modified"),
            ChangeType::Removed => (style("-").red(), "removed"),
        };
        println!("  {} {} ({})", symbol, file.path, tag);
    }
    println!();

    if show_files {
        for file in &report.files {
            let Some(diff) = &file.diff else { continue };
            println!("--- a/{}", file.path);
            println!("+++ b/{}", file.path);
            print_diff_lines(diff);
            println!();
        }
    }
}

fn print_diff_lines(lines: &[DiffLine]) {
    for line in lines {
        match line.change_type {
            ChangeType::Removed => println!("{}", style(format!("- {}", line.content)).red()),
            ChangeType::Added => println!("{}", style(format!("+ {}", line.content)).green()),
            ChangeType::Modified => println!("~ {}", line.content),
        }
    }
}
