//! Luau export-type scanning for link-file generation

use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// An `export type` declaration found in a Luau module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedType {
    pub name: String,
    /// Generic parameter list including the angle brackets, empty if none
    pub generics: String,
}

/// Scans Luau source for exported type declarations
pub struct TypeExtractor {
    export_type_pattern: Regex,
}

impl TypeExtractor {
    pub fn new() -> Self {
        Self {
            // Matches "export type Foo"; generics are scanned manually so
            // nested brackets balance
            export_type_pattern: Regex::new(r"^\s*export\s+type\s+(\w+)")
                .expect("export type pattern is valid"),
        }
    }

    /// Pull all exported types out of one Luau file, in declaration order
    pub fn extract_from_file(&self, path: &Path) -> io::Result<Vec<ExportedType>> {
        let reader = BufReader::new(File::open(path)?);
        let mut types = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let Some(captures) = self.export_type_pattern.captures(&line) else {
                continue;
            };
            let full_match = captures.get(0).expect("match 0 always present");
            let name = captures[1].to_string();
            let generics = scan_generics(&line[full_match.end()..]);

            types.push(ExportedType { name, generics });
        }

        Ok(types)
    }

    /// Probe a package's entry file and extract its exported types.
    ///
    /// Candidates, in order: `init.lua(u)`, `<name>.lua(u)`, `src/init.lua(u)`.
    /// The first existing file wins; duplicates are dropped keeping first
    /// occurrence.
    pub fn extract_from_package(&self, package_dir: &Path, package_name: &str) -> Vec<ExportedType> {
        let candidates = [
            package_dir.join("init.lua"),
            package_dir.join("init.luau"),
            package_dir.join(format!("{package_name}.lua")),
            package_dir.join(format!("{package_name}.luau")),
            package_dir.join("src").join("init.lua"),
            package_dir.join("src").join("init.luau"),
        ];

        for candidate in &candidates {
            if candidate.exists() {
                let types = self.extract_from_file(candidate).unwrap_or_default();
                return deduplicate(types);
            }
        }

        Vec::new()
    }
}

impl Default for TypeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture a leading `<...>` generic list, balancing nested brackets
fn scan_generics(rest: &str) -> String {
    if !rest.trim_start().starts_with('<') {
        return String::new();
    }

    let start = match rest.find('<') {
        Some(i) => i,
        None => return String::new(),
    };

    let mut balance = 0;
    for (i, c) in rest[start..].char_indices() {
        match c {
            '<' => balance += 1,
            '>' => {
                balance -= 1;
                if balance == 0 {
                    return rest[start..start + i + 1].to_string();
                }
            }
            _ => {}
        }
    }

    String::new()
}

/// Drop duplicate names, keeping the first occurrence
fn deduplicate(types: Vec<ExportedType>) -> Vec<ExportedType> {
    let mut seen = std::collections::HashSet::new();
    types
        .into_iter()
        .filter(|t| seen.insert(t.name.clone()))
        .collect()
}

/// Strip default values from a generic parameter list:
/// `<T, S = T>` becomes `<T, S>`. Commas inside nested `<...>` are kept.
pub fn strip_generic_defaults(generics: &str) -> String {
    if generics.is_empty() {
        return String::new();
    }

    let inner = generics
        .trim_start_matches('<')
        .trim_end_matches('>');

    let mut params = Vec::new();
    let mut depth = 0;
    let mut current = String::new();
    for c in inner.chars() {
        match c {
            '<' => {
                depth += 1;
                current.push(c);
            }
            '>' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                params.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    params.push(current);

    let cleaned: Vec<String> = params
        .iter()
        .map(|param| {
            let param = param.trim();
            match param.find('=') {
                Some(idx) => param[..idx].trim().to_string(),
                None => param.to_string(),
            }
        })
        .collect();

    format!("<{}>", cleaned.join(", "))
}
