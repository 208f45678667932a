//! Classification and ordering of state machine transitions.
//!
//! Only the first trigger of a transition is inspected. A transition is
//! malformed when its source or target is missing or is not a vertex of the
//! model; malformed transitions never reach a dispatch table.

use std::cmp::Ordering;

use log::warn;
use serde::Serialize;

use astrolabe_core::model::{ElementId, ElementKind, EventKind, TransitionData};

use crate::{
    diagnostic::{Diagnostic, DiagnosticCode, DiagnosticCollector},
    flatten::StateMachineFlattener,
    index::ModelIndex,
};

/// A well-formed transition with its dispatch flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionInfo {
    #[serde(skip)]
    pub transition: ElementId,
    #[serde(skip)]
    pub source: ElementId,
    #[serde(skip)]
    pub target: ElementId,
    /// Display name of the target vertex.
    pub target_name: String,
    /// Guard text, empty when absent.
    pub guard: String,
    /// Name of the first trigger, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    pub has_event: bool,
    pub has_signal_event: bool,
    pub has_guard: bool,
}

impl TransitionInfo {
    /// Name the dispatch order is keyed on: the trigger, else the target.
    pub fn key_name(&self) -> &str {
        self.trigger.as_deref().unwrap_or(&self.target_name)
    }

    fn sort_key(&self) -> (bool, bool, &str, &str, &str) {
        (
            self.has_guard,
            self.has_event,
            self.key_name(),
            &self.target_name,
            &self.guard,
        )
    }
}

impl PartialOrd for TransitionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TransitionInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Classifies transitions of one state machine.
#[derive(Debug, Clone, Copy)]
pub struct TransitionClassifier<'i, 'a> {
    index: &'i ModelIndex<'a>,
    flattener: StateMachineFlattener<'i, 'a>,
}

impl<'i, 'a> TransitionClassifier<'i, 'a> {
    pub fn new(index: &'i ModelIndex<'a>, flattener: StateMachineFlattener<'i, 'a>) -> Self {
        Self { index, flattener }
    }

    fn data(&self, transition: ElementId) -> Option<&'a TransitionData> {
        match self.index.kind(transition) {
            Some(ElementKind::Transition(data)) => Some(data),
            _ => None,
        }
    }

    fn is_vertex(&self, element: Option<ElementId>) -> bool {
        element
            .and_then(|element| self.index.kind(element))
            .is_some_and(ElementKind::is_vertex)
    }

    /// Returns `true` if the transition lacks a valid source or target.
    pub fn is_malformed(&self, transition: ElementId) -> bool {
        match self.data(transition) {
            Some(data) => !self.is_vertex(data.source) || !self.is_vertex(data.target),
            None => true,
        }
    }

    /// Returns the display name of the target, or `""` when absent.
    pub fn target_name(&self, transition: ElementId) -> String {
        self.data(transition)
            .and_then(|data| data.target)
            .filter(|target| self.is_vertex(Some(*target)))
            .map(|target| self.flattener.state_name(target).as_string())
            .unwrap_or_default()
    }

    /// Returns the guard text, or `""` when absent.
    pub fn guard_name(&self, transition: ElementId) -> String {
        self.data(transition)
            .and_then(|data| data.guard.as_deref())
            .map(str::trim)
            .unwrap_or_default()
            .to_owned()
    }

    /// Returns `true` if the guard text is present and not blank.
    pub fn has_guard(&self, transition: ElementId) -> bool {
        !self.guard_name(transition).is_empty()
    }

    fn first_trigger(&self, transition: ElementId) -> Option<ElementId> {
        self.data(transition)
            .and_then(|data| data.triggers.first().copied())
    }

    /// Returns `true` if the first trigger is a call or signal event, or a
    /// signal.
    pub fn has_event(&self, transition: ElementId) -> bool {
        matches!(
            self.first_trigger(transition)
                .and_then(|trigger| self.index.kind(trigger)),
            Some(
                ElementKind::Event(EventKind::Call { .. } | EventKind::Signal { .. })
                    | ElementKind::Signal
            )
        )
    }

    /// Returns `true` if the first trigger is a signal event or a signal.
    pub fn has_signal_event(&self, transition: ElementId) -> bool {
        matches!(
            self.first_trigger(transition)
                .and_then(|trigger| self.index.kind(trigger)),
            Some(ElementKind::Event(EventKind::Signal { .. }) | ElementKind::Signal)
        )
    }

    /// Returns the name of the first trigger.
    ///
    /// Signal events are named after their signal when it is set.
    pub fn trigger_name(&self, transition: ElementId) -> Option<String> {
        let trigger = self.first_trigger(transition)?;
        let name = match self.index.kind(trigger)? {
            ElementKind::Event(EventKind::Signal {
                signal: Some(signal),
            }) => self.index.name(*signal).or_else(|| self.index.name(trigger)),
            _ => self.index.name(trigger),
        };
        name.map(str::to_owned)
    }

    /// Classifies a transition, reporting it as `W001` when malformed.
    pub fn classify(
        &self,
        transition: ElementId,
        diagnostics: &mut DiagnosticCollector,
    ) -> Option<TransitionInfo> {
        let endpoints = self
            .data(transition)
            .filter(|_| !self.is_malformed(transition))
            .and_then(|data| Some((data.source?, data.target?)));

        let Some((source, target)) = endpoints else {
            let source_name = self
                .data(transition)
                .and_then(|data| data.source)
                .and_then(|source| self.index.name(source))
                .unwrap_or("<none>");
            warn!(transition:%, source = source_name; "Skipping malformed transition");
            diagnostics.emit(
                Diagnostic::warning(format!(
                    "transition from `{source_name}` has no valid source or target"
                ))
                .with_code(DiagnosticCode::W001)
                .with_element(transition)
                .with_help("connect both ends of the transition to states"),
            );
            return None;
        };

        Some(TransitionInfo {
            transition,
            source,
            target,
            target_name: self.target_name(transition),
            guard: self.guard_name(transition),
            trigger: self.trigger_name(transition),
            has_event: self.has_event(transition),
            has_signal_event: self.has_signal_event(transition),
            has_guard: self.has_guard(transition),
        })
    }

    /// Returns the well-formed transitions leaving a vertex, in dispatch order.
    pub fn outgoing(
        &self,
        vertex: ElementId,
        diagnostics: &mut DiagnosticCollector,
    ) -> Vec<TransitionInfo> {
        let mut infos: Vec<TransitionInfo> = self
            .index
            .outgoing_transitions(vertex)
            .iter()
            .filter_map(|transition| self.classify(*transition, diagnostics))
            .collect();
        infos.sort();
        infos
    }
}
