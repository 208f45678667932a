//! Integration tests for the Generator API
//!
//! These tests drive the public API end to end: model document in, contracts
//! out, contracts routed through an emitter registry.

use std::{cell::RefCell, rc::Rc};

use astrolabe::{
    AstrolabeError, Generator,
    activity::{Action, BranchKeyword, Statement},
    backend::{EmitError, Emitter, EmitterRegistry, TargetBackend},
    config::{AppConfig, GenerationConfig},
    contract::{ComponentContract, EVENT_OPCODE_BASE},
    document::Document,
    model::{ActivityNodeKind, Model, ModelBuilder, OpaqueBody, Tag},
};

fn load(source: &str) -> Model {
    let document: Document = toml::from_str(source).expect("Failed to parse document");
    document.into_model().expect("Failed to build model")
}

const TOGGLE: &str = r#"
    [[packages]]
    name = "Controllers"

    [[packages.classes]]
    name = "Switch"
    tags = ["Component"]

    [[packages.classes.state_machines]]
    name = "Toggle"

    [packages.classes.state_machines.region]
    initial = "Idle"

    [[packages.classes.state_machines.region.states]]
    name = "Idle"

    [[packages.classes.state_machines.region.states]]
    name = "Running"

    [[packages.classes.state_machines.region.transitions]]
    source = "Idle"
    target = "Running"
    triggers = ["START"]

    [[packages.classes.state_machines.region.transitions]]
    source = "Running"
    target = "Idle"
    triggers = ["STOP"]
"#;

const DECISION: &str = r#"
    [[classes]]
    name = "Heater"
    tags = ["Block"]

    [[classes.state_machines]]
    name = "Regulate"

    [classes.state_machines.region]
    initial = "Check"

    [[classes.state_machines.region.states]]
    name = "Check"
    entry = "Decide"

    [[classes.state_machines.activities]]
    name = "Decide"

    [[classes.state_machines.activities.nodes]]
    kind = "initial"
    name = "start"

    [[classes.state_machines.activities.nodes]]
    kind = "decision"
    name = "positive"

    [[classes.state_machines.activities.nodes]]
    kind = "opaque"
    name = "heat"
    body = "power = 1"

    [[classes.state_machines.activities.nodes]]
    kind = "final"
    name = "done"

    [[classes.state_machines.activities.edges]]
    source = "start"
    target = "positive"

    [[classes.state_machines.activities.edges]]
    source = "positive"
    target = "heat"
    guard = "x>0"

    [[classes.state_machines.activities.edges]]
    source = "positive"
    target = "done"

    [[classes.state_machines.activities.edges]]
    source = "heat"
    target = "done"
"#;

#[test]
fn test_generator_api_exists() {
    let _generator = Generator::default();
}

#[test]
fn test_two_state_toggle() {
    let output = Generator::default().generate(&load(TOGGLE));
    assert_eq!(output.contracts.len(), 1);

    let contract = &output.contracts[0];
    assert_eq!(contract.component, "Switch");
    assert_eq!(contract.package.as_deref(), Some("Controllers"));
    assert_eq!(contract.top_level_states, vec!["IDLE", "RUNNING"]);
    assert_eq!(contract.initial.constant, "IDLE");
    assert!(!contract.initial.fallback);

    let commands: Vec<(&str, u32, Vec<(&str, &str)>)> = contract
        .commands
        .iter()
        .map(|command| {
            (
                command.name.as_str(),
                command.opcode,
                command
                    .transitions
                    .iter()
                    .map(|t| (t.from.as_str(), t.to.as_str()))
                    .collect(),
            )
        })
        .collect();
    assert_eq!(
        commands,
        vec![
            ("START", EVENT_OPCODE_BASE, vec![("Idle", "Running")]),
            ("STOP", EVENT_OPCODE_BASE + 1, vec![("Running", "Idle")]),
        ]
    );
    assert!(contract.signals.is_empty());
    assert!(contract.diagnostics.is_empty(), "{:?}", contract.diagnostics);
}

#[test]
fn test_decision_lowers_to_if_else() {
    let output = Generator::default().generate(&load(DECISION));
    let contract = &output.contracts[0];

    let entry = contract
        .state("Check")
        .and_then(|state| state.entry.as_ref())
        .expect("Check has an entry behavior");
    assert_eq!(entry.activity, "Decide");
    assert_eq!(entry.statements.len(), 1);

    let Statement::Branch(branch) = &entry.statements[0] else {
        panic!("expected a branch, found {:?}", entry.statements[0]);
    };
    assert_eq!(branch.label, "positive");
    let headers: Vec<String> = branch
        .alternatives
        .iter()
        .map(|alternative| alternative.header())
        .collect();
    assert_eq!(headers, vec!["if (x>0)", "else"]);
    assert_eq!(branch.alternatives[1].keyword, BranchKeyword::Else);
    assert_eq!(branch.alternatives[0].body.len(), 2);
    assert!(matches!(
        branch.alternatives[1].body.as_slice(),
        [Statement::Completion]
    ));

    assert_eq!(contract.activity("Decide").map(|a| &a.statements), Some(&entry.statements));
}

#[test]
fn test_straight_line_activity() {
    let mut b = ModelBuilder::new();
    let class = b.class(None, "Counter").unwrap();
    b.apply_tag(class, Tag::new("Component")).unwrap();
    let machine = b.state_machine(class, "Main").unwrap();
    let region = b.region(machine, None).unwrap();
    let counting = b.state(region, Some("Counting")).unwrap();
    let initial = b.initial(region).unwrap();
    b.transition(region, Some(initial), Some(counting), vec![], None)
        .unwrap();

    let activity = b.activity(class, "Bump").unwrap();
    let start = b.node(activity, None, ActivityNodeKind::Initial).unwrap();
    let bump = b
        .node(
            activity,
            Some("bump"),
            ActivityNodeKind::Opaque {
                bodies: vec![OpaqueBody::new(None, "x = 1;")],
            },
        )
        .unwrap();
    let end = b.node(activity, None, ActivityNodeKind::Final).unwrap();
    b.edge(activity, Some(start), Some(bump), None).unwrap();
    b.edge(activity, Some(bump), Some(end), None).unwrap();
    b.set_state_behaviors(counting, None, Some(activity)).unwrap();

    let output = Generator::default().generate(&b.build());
    let contract = &output.contracts[0];
    let statements = &contract.activity("Bump").expect("Bump is lowered").statements;

    assert_eq!(statements.len(), 2);
    let Statement::Action(block) = &statements[0] else {
        panic!("expected an action, found {:?}", statements[0]);
    };
    let Action::Opaque { lines } = &block.action else {
        panic!("expected an opaque action, found {:?}", block.action);
    };
    assert_eq!(lines[0].text, "x = 1;");
    assert!(matches!(statements[1], Statement::Completion));
    assert!(!statements.iter().any(Statement::is_placeholder));
    assert_eq!(output.diagnostics().count(), 0);
}

#[test]
fn test_modules_and_qualified_names() {
    let config = AppConfig::default().with_generation(GenerationConfig::new(
        vec!["Controllers".to_owned(), "Elsewhere".to_owned()],
        true,
        TargetBackend::QpcC,
    ));
    let source = format!("{TOGGLE}\n{DECISION}");
    let output = Generator::new(config).generate(&load(&source));

    // Heater lives outside the Controllers package.
    assert_eq!(output.contracts.len(), 1);
    let contract = &output.contracts[0];
    assert_eq!(contract.module.as_deref(), Some("Controllers"));
    assert_eq!(contract.target, TargetBackend::QpcC);
    assert_eq!(
        contract.top_level_states,
        vec!["UNNAMED_REGION_IDLE", "UNNAMED_REGION_RUNNING"]
    );
    assert_eq!(
        contract.command("START").map(|c| c.transitions[0].to.as_str()),
        Some("unnamed-region:Running")
    );
}

/// Records the file stem of every emitted contract.
struct Stems(Rc<RefCell<Vec<String>>>);

impl Emitter for Stems {
    fn name(&self) -> &str {
        "stems"
    }

    fn emit(&mut self, contract: &ComponentContract) -> Result<(), EmitError> {
        self.0.borrow_mut().push(contract.file_stem());
        Ok(())
    }
}

#[test]
fn test_contracts_are_routed_to_emitters() {
    let source = format!("{TOGGLE}\n{DECISION}");
    let output = Generator::default().generate(&load(&source));

    let mut registry = EmitterRegistry::new();
    let result = output.emit_all(&mut registry);
    assert!(matches!(
        result,
        Err(AstrolabeError::UnsupportedTarget(TargetBackend::Fprime))
    ));

    let stems = Rc::new(RefCell::new(Vec::new()));
    registry.register(TargetBackend::Fprime, Box::new(Stems(stems.clone())));
    assert_eq!(output.emit_all(&mut registry).ok(), Some(2));
    assert_eq!(
        *stems.borrow(),
        vec!["Switch_Toggle".to_owned(), "Heater_Regulate".to_owned()]
    );
}
