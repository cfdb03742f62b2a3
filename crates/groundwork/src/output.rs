//! Terminal output for the bootstrap commands
//!
//! Styled status lines go to stdout via `console`; anything meant to be
//! machine-consumed (the `--export` lines) is emitted unstyled so it can
//! be `eval`-ed by a shell.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Emit a shell export line for the storage backend variables.
///
/// The value may be the storage access key; it exists on stdout only and
/// is never written to a file.
pub fn export(name: &str, value: &str) {
    println!("{}", export_line(name, value));
}

fn export_line(name: &str, value: &str) -> String {
    format!("export {name}={value}")
}

/// Spinner for the long-running provisioning phase
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_lines_are_shell_evaluable() {
        assert_eq!(
            export_line("AZURE_STORAGE_ACCOUNT", "myapp1pulumistatedev"),
            "export AZURE_STORAGE_ACCOUNT=myapp1pulumistatedev"
        );
    }
}
