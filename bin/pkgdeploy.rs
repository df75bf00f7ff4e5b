//! `pkgdeploy` is the packaging CLI binary.

use clap::Parser;
use colored::Colorize;
use pkgdeploy::{
    Cli, Command, PackagerConfig, TaskReport, create_deployment_package,
    create_packages, diagnostics::log_lines,
};
use tracing_subscriber::EnvFilter;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn main() {
    init_tracing();

    let cli = Cli::parse();

    let config = match PackagerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            println!();
            for line in log_lines(&e) {
                println!("  {} {}", "error".bright_red().bold(), line);
            }
            println!();
            std::process::exit(1);
        }
    };

    let report = match cli.command {
        Command::Pack {
            run,
            content_in_release,
        } => create_packages(&run.into_params(content_in_release), &config),
        Command::Deploy { run } => create_deployment_package(&run.into_params(false), &config),
    };

    print_summary(&report);

    if !report.outcome.success {
        std::process::exit(1);
    }
}

/// Print what the task produced and every reported error.
fn print_summary(report: &TaskReport) {
    println!();

    for package in &report.packages {
        println!(
            "  {} {} {}",
            "✓".bright_green(),
            package.path.display().to_string().bright_green(),
            format!("({})", format_size(package.size)).dimmed()
        );
    }

    for bundle in &report.deployment.bundles {
        println!(
            "  {} {} {}",
            "✓".bright_green(),
            bundle.path.display().to_string().bright_cyan(),
            format!("({})", format_size(bundle.size)).dimmed()
        );
        println!("    {}: {}", "sha256".dimmed(), bundle.checksum.dimmed());
    }

    if let Some(script) = &report.deployment.setup_script {
        println!(
            "  {} {}",
            "✓".bright_green(),
            script.display().to_string().bright_cyan()
        );
    }

    let errors = &report.outcome.errors;
    if errors.is_empty() {
        println!();
        return;
    }

    // Each error was already logged when it was reported.
    if !report.packages.is_empty() || !report.deployment.bundles.is_empty() {
        println!();
    }
    println!(
        "  {} {}",
        "✗".bright_red(),
        if errors.len() == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", errors.len())
        }
    );
    println!();
}

/// Format a byte count for display.
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Initialize tracing from `RUST_LOG`, defaulting to `info`.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .without_time()
        .init();
}
