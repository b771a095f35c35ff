//! External command execution.

use std::process::Command;

use anyhow::{bail, Context};

use crate::core::AppResult;

/// Run `name` with `args` and return its stdout.
///
/// Blocking; submit it to a `ThreadPool` when called from request handling.
///
/// # Errors
///
/// Returns an error if the command cannot be started, exits unsuccessfully
/// (the error carries its stderr), or writes non UTF-8 output.
pub fn run_command(name: &str, args: &[&str]) -> AppResult<String> {
    let output = Command::new(name)
        .args(args)
        .output()
        .with_context(|| format!("failed to start `{name}`"))?;

    if !output.status.success() {
        bail!(
            "`{name}` exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    String::from_utf8(output.stdout).with_context(|| format!("`{name}` wrote non UTF-8 output"))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        assert_eq!(run_command("echo", &["hello"]).unwrap(), "hello\n");
    }

    #[test]
    fn test_failure_is_an_error() {
        let err = run_command("sh", &["-c", "echo oops >&2; exit 3"]).unwrap_err();
        assert!(err.to_string().contains("oops"));
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        assert!(run_command("definitely-not-a-real-binary", &[]).is_err());
    }
}
