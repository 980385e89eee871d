//! Manifest conversion command (bread convert)
//!
//! Wally has no equivalent of the [bread] directory overrides, so converting
//! a project that uses custom package directories leaves its requires
//! pointing at folders wally will not recreate.

use anyhow::{bail, Context, Result};
use bread_package::manifest::MANIFEST_FILE;
use colored::Colorize;

const WALLY_MANIFEST: &str = "wally.toml";

/// Run the convert command: wally.toml = bread.toml minus the [bread] table
pub fn run() -> Result<()> {
    if std::path::Path::new(WALLY_MANIFEST).exists() {
        bail!("wally.toml already exists!");
    }

    let content = std::fs::read_to_string(MANIFEST_FILE)
        .context("bread.toml not found, run `bread init` first")?;
    let mut table: toml::Table = toml::from_str(&content).context("failed to parse bread.toml")?;

    table.remove("bread");

    std::fs::write(WALLY_MANIFEST, toml::to_string_pretty(&table)?)
        .context("failed to write wally.toml")?;

    println!("{} Created wally.toml", "✓".green());
    println!(
        "{} Wally doesn't support custom package directories. If you use one, run `wally install` or rename the folders after converting.",
        "⚠".yellow()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_bread_table_is_stripped() {
        let content = r#"
            [package]
            name = "user/proj"
            version = "0.1.0"

            [bread]
            shared_dir = "Modules"

            [dependencies]
            Foo = "scope/foo@^1.0"
        "#;

        let mut table: toml::Table = toml::from_str(content).unwrap();
        table.remove("bread");
        let out = toml::to_string_pretty(&table).unwrap();

        assert!(!out.contains("[bread]"));
        assert!(!out.contains("shared_dir"));
        assert!(out.contains("[package]"));
        assert!(out.contains("Foo = \"scope/foo@^1.0\""));
    }
}
