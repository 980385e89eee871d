//! Install dependencies command (bread install)

use anyhow::{anyhow, Result};
use bread_package::{InstallEvent, InstallationContext};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Run the install command against the current directory
pub async fn run() -> Result<()> {
    let project_dir = std::env::current_dir()?;
    let ctx = Arc::new(InstallationContext::new(&project_dir)?);
    install_with_progress(ctx).await
}

/// Drive `install_all`, rendering the engine's completion events
pub async fn install_with_progress(ctx: Arc<InstallationContext>) -> Result<()> {
    let start = Instant::now();

    if ctx.root_dependency_count() == 0 {
        ctx.install_all().await?;
        println!("No packages to install");
        return Ok(());
    }

    println!("Installing packages...");

    let mut events = ctx.subscribe();
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.green} {msg}")
            .expect("spinner template is valid"),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));

    let mut installer = {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move { ctx.install_all().await })
    };

    let mut installed = 0usize;
    let result = loop {
        tokio::select! {
            res = &mut installer => {
                break res.map_err(|e| anyhow!("install task failed: {e}"))?;
            }
            Some(event) = events.recv() => {
                render_event(&spinner, event, &mut installed);
            }
            _ = tokio::signal::ctrl_c() => {
                spinner.finish_and_clear();
                eprintln!("{} install cancelled", "✗".red());
                std::process::exit(130);
            }
        }
    };

    // Events raced with task completion may still be queued
    while let Ok(event) = events.try_recv() {
        render_event(&spinner, event, &mut installed);
    }
    spinner.finish_and_clear();
    result?;

    let elapsed = start.elapsed();
    println!(
        "{} Installed {} package{} in {:.2}s",
        "✓".green(),
        installed,
        if installed == 1 { "" } else { "s" },
        elapsed.as_secs_f64()
    );
    Ok(())
}

fn render_event(spinner: &ProgressBar, event: InstallEvent, installed: &mut usize) {
    match event {
        InstallEvent::PackageInstalled { name, version } => {
            *installed += 1;
            spinner.println(format!("{} Downloaded {}@{}", "✓".green(), name, version));
            spinner.set_message(format!("Installed {name}@{version}"));
        }
        InstallEvent::BareNameSpec { alias, spec } => {
            spinner.println(format!(
                "{} {} = \"{}\" names a package without a constraint; prefer \"{}@<constraint>\"",
                "⚠".yellow(),
                alias,
                spec,
                spec
            ));
        }
    }
}
