//! Command-line argument definitions for the Astrolabe CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the model document, the output directory
//! and configuration file, override generation settings, and control logging
//! verbosity.

use clap::Parser;

use astrolabe::backend::TargetBackend;

/// Command-line arguments for the Astrolabe generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input model document (TOML)
    #[arg(help = "Path to the input model document")]
    pub input: String,

    /// Directory the contract files are written to
    #[arg(short, long, default_value = "out")]
    pub output_dir: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Target backend, overriding the configuration
    #[arg(short, long, value_parser = parse_target)]
    pub target: Option<TargetBackend>,

    /// Module package to generate; repeat for several modules
    #[arg(short, long = "module")]
    pub modules: Vec<String>,

    /// Name states and regions by their full path
    #[arg(long)]
    pub fully_qualified_names: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn parse_target(name: &str) -> Result<TargetBackend, String> {
    TargetBackend::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = TargetBackend::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown target `{name}`, expected one of: {}", known.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["astrolabe", "model.toml"]);

        assert_eq!(args.input, "model.toml");
        assert_eq!(args.output_dir, "out");
        assert_eq!(args.config, None);
        assert_eq!(args.target, None);
        assert!(args.modules.is_empty());
        assert!(!args.fully_qualified_names);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "astrolabe",
            "model.toml",
            "-o",
            "gen",
            "--target",
            "QPC-C",
            "-m",
            "Controllers",
            "--module",
            "Sensors",
            "--fully-qualified-names",
        ]);

        assert_eq!(args.output_dir, "gen");
        assert_eq!(args.target, Some(TargetBackend::QpcC));
        assert_eq!(args.modules, vec!["Controllers", "Sensors"]);
        assert!(args.fully_qualified_names);
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let result = Args::try_parse_from(["astrolabe", "model.toml", "--target", "cobol"]);
        assert!(result.is_err());
    }
}
