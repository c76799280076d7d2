use crate::error::Result;
use crate::pipeline::{CleanupReport, Phase};
use crate::risk::Severity;
use colored::Colorize;

/// Terminal reporter with colored output
pub struct TerminalReporter {
    /// Show the advisory risk findings in output
    show_risks: bool,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self { show_risks: true }
    }

    #[allow(dead_code)]
    pub fn with_risks(mut self, show: bool) -> Self {
        self.show_risks = show;
        self
    }

    pub fn report(&self, report: &CleanupReport) -> Result<()> {
        println!();
        if report.phase_reached == Phase::Failed {
            println!(
                "{}",
                format!(
                    "Cleanup FAILED: {}",
                    report.error.as_deref().unwrap_or("unknown error")
                )
                .red()
                .bold()
            );
        } else if report.dry_run {
            println!("{}", "Dry run complete (no files touched)".blue().bold());
        } else {
            println!("{}", "Cleanup complete".green().bold());
        }
        println!();

        println!(
            "  {} {} analyzed, {} skipped",
            "Files:".bold(),
            report.files_analyzed,
            report.files_skipped
        );

        println!("{}", "Planned changes:".bold());
        println!("  imports to remove     {}", report.planned_imports);
        println!("  variables to remove   {}", report.planned_variables);
        println!("  methods to remove     {}", report.planned_methods);
        println!("  duplicate groups      {}", report.planned_duplicate_groups);
        println!("  files to delete       {}", report.planned_deletions);
        println!(
            "  estimated savings     {}",
            format_bytes(report.estimated_bytes_saved).cyan()
        );

        if let Some(score) = report.safety_score {
            let colored_score = match score {
                80..=100 => score.to_string().green(),
                50..=79 => score.to_string().yellow(),
                _ => score.to_string().red(),
            };
            println!("  {} {}/100", "Safety score:".bold(), colored_score);
        }

        if let Some(execution) = &report.execution {
            println!();
            println!("{}", "Applied:".bold());
            println!("  imports removed       {}", execution.imports_removed);
            println!("  variables removed     {}", execution.variables_removed);
            println!("  methods removed       {}", execution.methods_removed);
            println!("  duplicates refactored {}", execution.duplicates_refactored);
            println!("  components created    {}", execution.components_created);
            println!("  files deleted         {}", execution.files_deleted);

            if !execution.failures.is_empty() {
                println!();
                println!(
                    "{}",
                    format!("{} operations skipped:", execution.failures.len())
                        .yellow()
                        .bold()
                );
                for failure in &execution.failures {
                    println!(
                        "  {} {}",
                        failure.file.display().to_string().cyan(),
                        failure.reason.dimmed()
                    );
                }
            }
        }

        if report.rollback_performed {
            println!();
            if report.rollback_verified {
                println!(
                    "{}",
                    "Changes were ROLLED BACK after failed validation".yellow().bold()
                );
            } else {
                println!(
                    "{}",
                    "ROLLBACK FAILED - manual intervention required".red().bold()
                );
            }
        }

        if self.show_risks && !report.risks.is_empty() {
            println!();
            println!("{}", "Risks:".bold());
            for risk in &report.risks {
                let marker = match risk.severity {
                    Severity::Critical | Severity::High => "▲".red().bold(),
                    Severity::Medium => "△".yellow(),
                    Severity::Low => "·".dimmed(),
                };
                println!(
                    "  {} [{}] {}",
                    marker,
                    risk.category.display_name().dimmed(),
                    risk.description
                );
                for step in &risk.mitigation {
                    println!("      {} {}", "->".dimmed(), step.dimmed());
                }
            }
        }

        println!();
        println!(
            "{}",
            format!(
                "Finished in {}s (reached: {})",
                report.duration_secs,
                report.phase_reached.display_name()
            )
            .dimmed()
        );
        Ok(())
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
