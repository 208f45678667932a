//! Backend-agnostic statements produced by activity lowering.

use serde::Serialize;

/// One lowered statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Statement {
    /// A single action.
    Action(ActionBlock),
    /// A decision with one alternative per outgoing edge.
    Branch(Branch),
    /// The activity reached a final node.
    Completion,
    /// Something that could not be lowered.
    Placeholder(Placeholder),
}

impl Statement {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Statement::Placeholder(_))
    }

    /// Counts this statement and every statement nested in it.
    pub fn count(&self) -> usize {
        match self {
            Statement::Branch(branch) => {
                1 + branch
                    .alternatives
                    .iter()
                    .flat_map(|alternative| &alternative.body)
                    .map(Statement::count)
                    .sum::<usize>()
            }
            _ => 1,
        }
    }
}

/// A lowered action node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionBlock {
    /// Node name, or `unnamed`.
    pub label: String,
    pub action: Action,
}

/// What an action block does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    CallBehavior { behavior: String },
    SendSignal { signal: String },
    Opaque { lines: Vec<BodyLine> },
    ReadAttribute { feature: String },
    WriteAttribute { feature: String },
    CallOperation { operation: String },
}

/// One line of passed-through opaque code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyLine {
    /// Trimmed code, always terminated with `;`.
    pub text: String,
    /// Whether the line assigns a well-known identifier and should be emitted
    /// as a declaration.
    pub declare: bool,
}

/// Position of an alternative within a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchKeyword {
    If,
    ElseIf,
    Else,
}

/// A lowered decision node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub label: String,
    pub alternatives: Vec<Alternative>,
}

/// One arm of a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alternative {
    pub keyword: BranchKeyword,
    /// Guard text, or `true` for an unguarded first alternative. Empty for a
    /// plain `else`.
    pub condition: String,
    pub body: Vec<Statement>,
}

impl Alternative {
    /// Renders the alternative header, e.g. `if (x > 0)` or `else`.
    pub fn header(&self) -> String {
        match self.keyword {
            BranchKeyword::If => format!("if ({})", self.condition),
            BranchKeyword::ElseIf => format!("else if ({})", self.condition),
            BranchKeyword::Else => "else".to_owned(),
        }
    }
}

/// Marker for content that could not be lowered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    pub label: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternative(keyword: BranchKeyword, condition: &str) -> Alternative {
        Alternative {
            keyword,
            condition: condition.to_owned(),
            body: vec![Statement::Completion],
        }
    }

    #[test]
    fn test_alternative_headers() {
        assert_eq!(alternative(BranchKeyword::If, "x>0").header(), "if (x>0)");
        assert_eq!(alternative(BranchKeyword::If, "true").header(), "if (true)");
        assert_eq!(
            alternative(BranchKeyword::ElseIf, "x<0").header(),
            "else if (x<0)"
        );
        assert_eq!(alternative(BranchKeyword::Else, "").header(), "else");
    }

    #[test]
    fn test_count_includes_nested_statements() {
        let branch = Statement::Branch(Branch {
            label: "check".to_owned(),
            alternatives: vec![
                alternative(BranchKeyword::If, "a"),
                alternative(BranchKeyword::Else, ""),
            ],
        });
        assert_eq!(branch.count(), 3);
        assert_eq!(Statement::Completion.count(), 1);
        assert!(!branch.is_placeholder());
    }
}
