//! Contract file emitter.
//!
//! Writes every contract it receives as `<Component>_<StateMachine>.contract.toml`
//! into an output directory. A contract whose path was already written in the
//! same run is rejected. The CLI registers it as the fallback emitter, so
//! every target produces a contract file until a backend-specific emitter is
//! registered for it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;

use astrolabe::{
    backend::{EmitError, Emitter},
    contract::ComponentContract,
};

/// File extension of emitted contracts.
pub const CONTRACT_EXTENSION: &str = "contract.toml";

/// Serializes contracts to TOML files.
#[derive(Debug)]
pub struct ContractFileEmitter {
    output_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl ContractFileEmitter {
    /// Creates an emitter writing into `output_dir`.
    ///
    /// The directory is created on the first write.
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            written: Vec::new(),
        }
    }

    /// Returns the path a contract is written to.
    pub fn path_for(&self, contract: &ComponentContract) -> PathBuf {
        let mut file_name = contract.file_stem();
        if let Some(module) = &contract.module {
            file_name = format!("{module}_{file_name}");
        }
        self.output_dir
            .join(format!("{file_name}.{CONTRACT_EXTENSION}"))
    }

    /// Paths written so far, in emission order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Emitter for ContractFileEmitter {
    fn name(&self) -> &str {
        "contract-toml"
    }

    fn emit(&mut self, contract: &ComponentContract) -> Result<(), EmitError> {
        let content =
            toml::to_string(contract).map_err(|err| EmitError::Render(err.to_string()))?;

        let path = self.path_for(contract);
        if self.written.contains(&path) {
            return Err(EmitError::Collision(path));
        }
        fs::create_dir_all(&self.output_dir)?;
        fs::write(&path, content)?;

        info!(output_file = path.display().to_string(); "Contract written");
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use astrolabe::{Generator, document::Document};
    use tempfile::tempdir;

    use super::*;

    const MODEL: &str = r#"
        [[classes]]
        name = "Valve"
        tags = ["Component"]

        [[classes.state_machines]]
        name = "Flow"

        [classes.state_machines.region]
        initial = "Closed"

        [[classes.state_machines.region.states]]
        name = "Closed"
        entry = "Seal"

        [[classes.state_machines.region.states]]
        name = "Open"

        [[classes.state_machines.region.transitions]]
        source = "Closed"
        target = "Open"
        triggers = ["OPEN"]

        [[classes.state_machines.activities]]
        name = "Seal"

        [[classes.state_machines.activities.nodes]]
        kind = "initial"
        name = "start"

        [[classes.state_machines.activities.nodes]]
        kind = "opaque"
        name = "press"
        body = "pressure = 0"

        [[classes.state_machines.activities.edges]]
        source = "start"
        target = "press"
    "#;

    fn contract() -> ComponentContract {
        let document: Document = toml::from_str(MODEL).unwrap();
        let model = document.into_model().unwrap();
        Generator::default()
            .generate(&model)
            .contracts
            .pop()
            .unwrap()
    }

    #[test]
    fn test_path_includes_module() {
        let emitter = ContractFileEmitter::new("gen");
        let mut contract = contract();

        assert_eq!(
            emitter.path_for(&contract),
            Path::new("gen").join("Valve_Flow.contract.toml")
        );

        contract.module = Some("Plumbing".to_owned());
        assert_eq!(
            emitter.path_for(&contract),
            Path::new("gen").join("Plumbing_Valve_Flow.contract.toml")
        );
    }

    #[test]
    fn test_writes_contract_file() {
        let dir = tempdir().unwrap();
        let mut emitter = ContractFileEmitter::new(dir.path().join("nested"));

        emitter.emit(&contract()).unwrap();

        assert_eq!(emitter.written().len(), 1);
        let content = fs::read_to_string(&emitter.written()[0]).unwrap();
        assert!(content.contains("component = \"Valve\""));
        assert!(content.contains("name = \"OPEN\""));
        assert!(content.contains("pressure = 0;"));
    }

    #[test]
    fn test_rejects_same_path_from_other_package() {
        let dir = tempdir().unwrap();
        let mut emitter = ContractFileEmitter::new(dir.path());
        let mut first = contract();
        first.package = Some("Plumbing".to_owned());
        let mut second = contract();
        second.package = Some("Irrigation".to_owned());

        emitter.emit(&first).unwrap();
        let err = emitter.emit(&second).unwrap_err();

        let path = dir.path().join("Valve_Flow.contract.toml");
        assert!(matches!(&err, EmitError::Collision(collided) if *collided == path));
        assert_eq!(emitter.written(), &[path.clone()]);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("package = \"Plumbing\""));
    }
}
