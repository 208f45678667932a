//! CLI logic for the Astrolabe statechart generator.
//!
//! This module contains the core CLI logic: loading the configuration and the
//! model document, running the generator, reporting diagnostics, and writing
//! every contract through the emitter registry.

pub mod emit;
pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{fs, io, path::Path};

use log::{info, warn};

use astrolabe::{
    AstrolabeError, Generator, backend::EmitterRegistry, document::Document, model::Model,
};

use emit::ContractFileEmitter;
use error_adapter::{Reportable, contract_reportables, render};

/// Run the Astrolabe CLI application
///
/// This function loads the model document, generates one contract per
/// component state machine, and writes each contract to the output
/// directory.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `AstrolabeError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Model document parsing or resolution errors
/// - Emitter errors
pub fn run(args: &Args) -> Result<(), AstrolabeError> {
    info!(
        input_path = args.input.as_str(),
        output_dir = args.output_dir.as_str();
        "Processing model"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let app_config = config::apply_overrides(app_config, args);

    let model = load_model(&args.input)?;

    let output = Generator::new(app_config).generate(&model);

    for contract in &output.contracts {
        for reportable in contract_reportables(contract) {
            report(&reportable);
        }
    }

    let mut registry = EmitterRegistry::new();
    registry.set_fallback(Box::new(ContractFileEmitter::new(&args.output_dir)));
    let written = output.emit_all(&mut registry)?;

    info!(contracts = written, output_dir = args.output_dir.as_str(); "Contracts exported successfully");

    Ok(())
}

/// Reads and resolves a model document.
///
/// # Errors
///
/// Returns `AstrolabeError::Io` if the file cannot be read or is not a valid
/// document, and `AstrolabeError::Model` if its references cannot be
/// resolved.
pub fn load_model(path: impl AsRef<Path>) -> Result<Model, AstrolabeError> {
    let source = fs::read_to_string(path)?;
    let document: Document = toml::from_str(&source).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to parse model document: {err}"),
        )
    })?;
    Ok(document.into_model()?)
}

fn report(reportable: &Reportable<'_>) {
    let rendered = render(reportable);
    match reportable {
        Reportable::Diagnostic(d) if d.is_note() => info!("{rendered}"),
        _ => warn!("{rendered}"),
    }
}
