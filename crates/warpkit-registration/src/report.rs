//! Human-readable diagnostics for driver programs.
//!
//! These builders only format strings; they hold no state and never fail.

use std::error::Error;
use std::fmt::Write;

use tracing::error;
use warpkit_core::TransformError;

use crate::error::RegistrationError;

fn error_type_name(error: &(dyn Error + 'static)) -> &'static str {
    if error.is::<RegistrationError>() {
        "RegistrationError"
    } else if error.is::<TransformError>() {
        "TransformError"
    } else if error.is::<std::io::Error>() {
        "std::io::Error"
    } else {
        "unknown error type"
    }
}

/// Report for an error that ended a run.
///
/// Lists the error type, its message and every source in the chain. The
/// error is also logged at error level.
pub fn report_terminating_error(executable: &str, err: &(dyn Error + 'static)) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "{executable} terminated because of an error.");
    let _ = writeln!(report, "Error type: {}", error_type_name(err));
    let _ = write!(report, "Message: {err}");

    let mut source = err.source();
    let mut depth = 0;
    while let Some(cause) = source {
        if depth == 0 {
            report.push_str("\nCaused by:");
        }
        let _ = write!(report, "\n  {depth}: {cause}");
        depth += 1;
        source = cause.source();
    }

    error!(executable, error_type = error_type_name(err), "{err}");
    report
}

/// Version and build information, one item per line, each line prefixed
/// with `indentation`.
pub fn extended_version_information(executable: &str, indentation: &str) -> String {
    let revision = option_env!("WARPKIT_GIT_REVISION").unwrap_or("unknown");
    let lines = [
        format!("{executable} version: {}", env!("CARGO_PKG_VERSION")),
        format!("Git revision: {revision}"),
        format!("Target: {}-{}", std::env::consts::OS, std::env::consts::ARCH),
        format!("Pointer width: {} bit", usize::BITS),
    ];
    lines
        .iter()
        .map(|line| format!("{indentation}{line}\n"))
        .collect()
}

/// Command line without the executable, with arguments containing spaces
/// quoted.
pub fn format_arguments<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .skip(1)
        .map(|arg| {
            let arg = arg.as_ref();
            if arg.contains(' ') {
                format!("\"{arg}\"")
            } else {
                arg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_includes_type_and_message() {
        let err = RegistrationError::lifecycle("after_registration", "run did not finish");
        let report = report_terminating_error("warpkit", &err);
        assert!(report.starts_with("warpkit terminated because of an error.\n"));
        assert!(report.contains("Error type: RegistrationError"));
        assert!(report.contains("Message: Lifecycle error in after_registration: run did not finish"));
        assert!(!report.contains("Caused by"));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("could not load transform")]
    struct LoadError(#[source] TransformError);

    #[test]
    fn test_report_walks_source_chain() {
        let err = LoadError(TransformError::UnknownTransform("Euler".into()));
        let report = report_terminating_error("warpkit", &err);
        assert!(report.contains("Error type: unknown error type"));
        assert!(report.contains("Message: could not load transform"));
        assert!(report.ends_with("Caused by:\n  0: Unknown transform type: Euler"));
    }

    #[test]
    fn test_transform_error_type() {
        let err = TransformError::UnknownTransform("Euler".into());
        let report = report_terminating_error("warpkit", &err);
        assert!(report.contains("Error type: TransformError"));
        assert!(report.contains("Unknown transform type: Euler"));
    }

    #[test]
    fn test_version_information() {
        let info = extended_version_information("warpkit", "  ");
        let lines: Vec<&str> = info.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|line| line.starts_with("  ")));
        assert_eq!(lines[0], format!("  warpkit version: {}", env!("CARGO_PKG_VERSION")));
        assert!(lines[2].contains(std::env::consts::OS));
    }

    #[test]
    fn test_format_arguments() {
        let args = ["warpkit", "-f", "fixed image.nii", "-out", "dir"];
        assert_eq!(format_arguments(&args), "-f \"fixed image.nii\" -out dir");
        assert_eq!(format_arguments::<&str>(&[]), "");
    }
}
