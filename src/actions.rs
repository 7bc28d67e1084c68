//! GitHub Actions integration: step outputs and workflow commands

use std::io::Write;
use std::path::Path;

/// Append `name=value` to the step output file named by `GITHUB_OUTPUT`.
///
/// Does nothing outside of Actions.
pub fn set_output(name: &str, value: &str) -> std::io::Result<()> {
    match std::env::var_os("GITHUB_OUTPUT") {
        Some(path) => append_output(Path::new(&path), name, value),
        None => Ok(()),
    }
}

pub fn append_output(path: &Path, name: &str, value: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}={}", name, value)
}

/// Workflow command that surfaces an error annotation on the run summary.
pub fn error_annotation(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
