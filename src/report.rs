//! Report generation for a pipeline run
//!
//! Summarizes what each stage did to each artifact and lists the fail-open
//! paths that were taken.

use colored::Colorize;

use crate::config::{Diagnostic, EditOutcome, EditRecord, ModConfig};

/// Summary of one (or several) pipeline runs over a configuration
#[derive(Debug)]
pub struct PipelineReport {
    pub records: Vec<EditRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PipelineReport {
    /// Collect the records and diagnostics accumulated in `config`
    pub fn from_config(config: &ModConfig) -> Self {
        Self {
            records: config.records().to_vec(),
            diagnostics: config.diagnostics().to_vec(),
        }
    }

    /// Count of edits that changed an artifact
    pub fn changed(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.changed()).count()
    }

    /// Count of edits that found their fragment already in place
    pub fn already_present(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome == EditOutcome::AlreadyPresent)
            .count()
    }

    /// Count of edits skipped because their anchor was missing
    pub fn skipped(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome == EditOutcome::AnchorNotFound)
            .count()
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// True when nothing needed doing and nothing was skipped
    pub fn is_converged(&self) -> bool {
        self.changed() == 0 && self.skipped() == 0
    }

    /// Print the report to stdout
    pub fn print(&self) {
        println!();
        println!("{}", "Native Injection Report".bold());
        println!("{}", "=".repeat(60));
        println!();

        for record in &self.records {
            let status = match record.outcome {
                EditOutcome::Inserted => "[INSERTED]".green().bold(),
                EditOutcome::Appended(_) => "[APPENDED]".green().bold(),
                EditOutcome::Assigned => "[ASSIGNED]".green().bold(),
                EditOutcome::AlreadyPresent => "[PRESENT]".dimmed(),
                EditOutcome::AnchorNotFound => "[SKIPPED]".yellow().bold(),
            };
            let detail = match record.outcome {
                EditOutcome::Appended(n) => format!(" ({} added)", n),
                _ => String::new(),
            };

            println!(
                "{} {} {}{}",
                status,
                record.stage.dimmed(),
                record.target,
                detail
            );
            println!("        in {}", record.artifact.to_string().dimmed());
        }

        println!();
        println!("{}", "Summary".bold());
        println!("{}", "-".repeat(40));
        println!("Total edits:       {}", self.total());
        println!("Changed:           {}", self.changed());
        println!(
            "Already present:   {} {}",
            self.already_present(),
            "(left unchanged)".dimmed()
        );
        if self.skipped() > 0 {
            println!(
                "Skipped:           {} {}",
                self.skipped(),
                "(anchor not found)".dimmed()
            );
        }

        if !self.diagnostics.is_empty() {
            println!();
            println!("{}", "Diagnostics".yellow().bold());
            println!("{}", "-".repeat(40));
            for diagnostic in &self.diagnostics {
                println!(
                    "  • {} [{}]: {}",
                    diagnostic.stage, diagnostic.artifact, diagnostic.message
                );
            }
        }
    }
}
