//! Output formatting for validation reports and compiled plans

use clap::ValueEnum;
use colored::Colorize;
use envguard_core::{CheckInstruction, ValidationPlan, ValidationReport};
use serde::Serialize;
use std::io::Write;

use crate::error::CliError;

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

/// Serializable view of a compiled plan
#[derive(Debug, Serialize)]
pub struct PlanOutput<'a> {
    pub fingerprint: &'a str,
    pub checks: usize,
    pub async_checks: usize,
    pub instructions: &'a [CheckInstruction],
}

impl<'a> PlanOutput<'a> {
    pub fn new(plan: &'a ValidationPlan) -> Self {
        Self {
            fingerprint: plan.fingerprint(),
            checks: plan.len(),
            async_checks: plan.async_count(),
            instructions: plan.instructions(),
        }
    }
}

fn serialize<T: Serialize>(value: &T, format: OutputFormat) -> Result<Option<String>, CliError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(Some)
            .map_err(|e| CliError::Output(e.to_string())),
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .map(Some)
            .map_err(|e| CliError::Output(e.to_string())),
        OutputFormat::Table => Ok(None),
    }
}

/// Write a validation report in the requested format
pub fn render_report(
    report: &ValidationReport,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if let Some(text) = serialize(report, format)? {
        writeln!(out, "{}", text).ok();
        return Ok(());
    }

    writeln!(out).ok();
    writeln!(out, "{}", "Environment Validation".cyan().bold()).ok();
    writeln!(out, "{}", "=".repeat(60)).ok();
    writeln!(out).ok();

    let status_icon = if report.is_valid() {
        "+".green()
    } else {
        "x".red()
    };
    writeln!(out, "{} {}", status_icon, report.summary()).ok();
    writeln!(out).ok();

    writeln!(out, "{}", "Statistics:".cyan().bold()).ok();
    writeln!(out, "  Checks:       {}", report.checks_total).ok();
    if report.checks_failed > 0 {
        writeln!(
            out,
            "  {} Failed:     {}",
            "x".red(),
            report.checks_failed.to_string().red()
        )
        .ok();
    }
    writeln!(out, "  Async checks: {}", report.async_checks).ok();
    writeln!(out, "  Mode:         {}", report.mode).ok();
    writeln!(out).ok();

    if !report.errors().is_empty() {
        writeln!(out, "{}", "Errors:".cyan().bold()).ok();
        writeln!(out, "{}", "-".repeat(60)).ok();

        for (index, error) in report.errors().iter().enumerate() {
            writeln!(
                out,
                "{}. {} {}",
                index + 1,
                format!("[{}]", error.keyword).red().bold(),
                error.message
            )
            .ok();
            writeln!(out, "   {} {}", "Path:".dimmed(), error.path.to_string().cyan()).ok();
            writeln!(out, "   {} {}", "Schema:".dimmed(), error.schema_path.dimmed()).ok();
            writeln!(out).ok();
        }
    }

    writeln!(
        out,
        "{}",
        format!("Completed in {} ms", report.duration_ms).dimmed()
    )
    .ok();

    Ok(())
}

/// Write a compiled plan in the requested format
pub fn render_plan(
    plan: &ValidationPlan,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let view = PlanOutput::new(plan);
    if let Some(text) = serialize(&view, format)? {
        writeln!(out, "{}", text).ok();
        return Ok(());
    }

    writeln!(out).ok();
    writeln!(out, "{}", "Validation Plan".cyan().bold()).ok();
    writeln!(out, "{}", "=".repeat(60)).ok();
    writeln!(out, "  Fingerprint:  {}", view.fingerprint.dimmed()).ok();
    writeln!(out, "  Checks:       {}", view.checks).ok();
    writeln!(out, "  Async checks: {}", view.async_checks).ok();
    writeln!(out).ok();

    if view.instructions.is_empty() {
        writeln!(out, "  (no checks)").ok();
        return Ok(());
    }

    let header = format!("{:<4} {:<14} {}", "#", "KEYWORD", "PATH");
    writeln!(out, "  {}", header.bold()).ok();
    writeln!(out, "  {}", "-".repeat(58)).ok();

    for instruction in view.instructions {
        let marker = if instruction.is_async {
            "async".yellow()
        } else {
            "".normal()
        };
        writeln!(
            out,
            "  {:<4} {:<14} {:<30} {}",
            instruction.index,
            instruction.keyword.as_str(),
            instruction.path.to_string(),
            marker
        )
        .ok();
    }

    Ok(())
}
