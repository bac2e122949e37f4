//! CLI Doctor Command
//!
//! Checks that the config file is usable before anything talks to the API.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;

use clawcord_config::{ValidationReport, collect_referenced_vars, load_config, prepare};

/// Executes the full doctor diagnosis. Returns whether every check passed.
pub async fn run(config_path: &Path) -> Result<bool> {
    println!("\nRunning clawcord doctor...\n");
    println!("Config file: {}", config_path.display());
    if !config_path.exists() {
        println!("  [warn] file not found, defaults apply");
    }

    let raw = load_config(config_path).await?;
    let env: HashMap<String, String> = std::env::vars().collect();

    let vars = collect_referenced_vars(&serde_json::to_value(&raw)?);
    let env_ok = check_env_vars(&vars, &env);

    let config_ok = if env_ok {
        let (_, report) = prepare(raw, &env)?;
        print_report(&report);
        report.is_valid()
    } else {
        println!("\nSkipping validation until the variables above are set.");
        false
    };

    let is_ok = env_ok && config_ok;
    println!();
    if is_ok {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Fix the errors above.");
    }
    Ok(is_ok)
}

fn check_env_vars(vars: &[String], env: &HashMap<String, String>) -> bool {
    println!("\nChecking referenced environment variables:");
    if vars.is_empty() {
        println!("  [ok] none referenced");
        return true;
    }

    let mut all_good = true;
    for var in vars {
        match env.get(var) {
            Some(val) if !val.is_empty() => println!("  [ok] {var} is set"),
            _ => {
                println!("  [fail] {var} is missing (REQUIRED)");
                all_good = false;
            }
        }
    }
    all_good
}

fn print_report(report: &ValidationReport) {
    println!("\nValidating config:");
    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("  [ok] no findings");
    }
    for warning in &report.warnings {
        println!("  [warn] {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("  [fail] {}: {}", error.path, error.message);
    }
}
