//! Version command implementation.

use serde::Serialize;

use crate::cli::VersionArgs;
use crate::error::Result;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    backends: Vec<&'a str>,
}

fn version_output() -> VersionOutput<'static> {
    VersionOutput {
        version: env!("CARGO_PKG_VERSION"),
        build: if cfg!(debug_assertions) {
            "dev"
        } else {
            "release"
        },
        backends: vec!["memory", "sqlite"],
    }
}

fn render_text(output: &VersionOutput<'_>) -> String {
    format!(
        "issue-tracker version {} ({}; stores: {})",
        output.version,
        output.build,
        output.backends.join(", ")
    )
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(args: &VersionArgs, json: bool) -> Result<()> {
    let output = version_output();

    // --short: version number only
    if args.short {
        println!("{}", output.version);
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", render_text(&output));
    }
    Ok(())
}
