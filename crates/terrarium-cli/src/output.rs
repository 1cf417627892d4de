//! Terminal output helpers.

use std::collections::BTreeMap;

use console::style;

use terrarium_core::refs::{ContractInfo, SaveReport};

pub fn info(message: impl std::fmt::Display) {
    println!("{} {}", style("›").cyan(), message);
}

pub fn success(message: impl std::fmt::Display) {
    println!("{} {}", style("✔").green(), message);
}

pub fn warn(message: impl std::fmt::Display) {
    eprintln!("{} {}", style("warning:").yellow().bold(), message);
}

/// Print an error and its cause chain.
pub fn error(err: &anyhow::Error) {
    eprintln!("{} {}", style("error:").red().bold(), err);
    for cause in err.chain().skip(1) {
        eprintln!("  {} {}", style("caused by:").red(), cause);
    }
}

/// Warn about refs copies that could not be written.
pub fn refs_saved(report: &SaveReport) {
    for failure in &report.failed {
        warn(format!(
            "Refs saved to {}, but copy to {} failed: {}",
            report.path.display(),
            failure.path.display(),
            failure.error
        ));
    }
}

pub fn refs_table(network: &str, contracts: &BTreeMap<String, ContractInfo>) {
    println!("{}", style(format!("  Refs for {}", network)).bold());
    if contracts.is_empty() {
        println!("  (no contracts recorded)");
        return;
    }

    let width = contracts.keys().map(String::len).max().unwrap_or(0).max(8);
    println!(
        "  {:<width$}  {:>8}  {}",
        style("CONTRACT").dim(),
        style("CODE ID").dim(),
        style("ADDRESS").dim(),
        width = width
    );
    for (name, info) in contracts {
        println!(
            "  {:<width$}  {:>8}  {}",
            name,
            info.code_id.as_deref().unwrap_or("-"),
            info.address.as_deref().unwrap_or("-"),
            width = width
        );
    }
}
