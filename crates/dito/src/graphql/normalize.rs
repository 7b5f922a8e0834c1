//! Canonical form of executable documents.
//!
//! Two documents are equivalent when their normalized forms are equal:
//! field order, `__typename` selections, field arguments and aliases do
//! not matter.

use async_graphql_parser::types::{
    Directive, DocumentOperations, ExecutableDocument, OperationDefinition, OperationType,
    Selection, SelectionSet,
};
use async_graphql_parser::Positioned;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

use super::schema::{named_type, QueryError};

/// Deepest selection nesting accepted in a document.
pub const MAX_SELECTION_DEPTH: usize = 64;

pub(crate) const TYPENAME: &str = "__typename";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl From<OperationType> for OperationKind {
    fn from(ty: OperationType) -> Self {
        match ty {
            OperationType::Query => OperationKind::Query,
            OperationType::Mutation => OperationKind::Mutation,
            OperationType::Subscription => OperationKind::Subscription,
        }
    }
}

/// Variable name plus its innermost named type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VariableSignature {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDirective {
    pub name: String,
    /// Argument name and the argument value rendered as GraphQL text
    pub arguments: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedSelection {
    Field {
        name: String,
        selections: Vec<NormalizedSelection>,
    },
    FragmentSpread {
        name: String,
        directives: Vec<NormalizedDirective>,
    },
    InlineFragment {
        type_condition: Option<String>,
        directives: Vec<NormalizedDirective>,
        selections: Vec<NormalizedSelection>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOperation {
    pub kind: OperationKind,
    pub variables: BTreeSet<VariableSignature>,
    pub selections: Vec<NormalizedSelection>,
    pub directives: Vec<NormalizedDirective>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedQuery {
    pub operations: Vec<NormalizedOperation>,
}

impl NormalizedQuery {
    pub fn from_document(document: &ExecutableDocument) -> Result<Self, QueryError> {
        let operations = ordered_operations(document)
            .into_iter()
            .map(|(_, operation)| normalize_operation(operation))
            .collect::<Result<_, _>>()?;
        Ok(Self { operations })
    }

    /// Structural equivalence, logging the first difference at debug level.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        if self.operations.len() != other.operations.len() {
            debug!(
                expected = self.operations.len(),
                actual = other.operations.len(),
                "operation count differs"
            );
            return false;
        }
        self.operations
            .iter()
            .zip(&other.operations)
            .all(|(expected, actual)| operations_equivalent(expected, actual))
    }
}

fn operations_equivalent(expected: &NormalizedOperation, actual: &NormalizedOperation) -> bool {
    if expected.kind != actual.kind {
        debug!(expected = ?expected.kind, actual = ?actual.kind, "operation kind differs");
        return false;
    }
    if expected.variables != actual.variables {
        debug!(expected = ?expected.variables, actual = ?actual.variables, "variable definitions differ");
        return false;
    }
    if expected.selections != actual.selections {
        debug!("selection sets differ");
        return false;
    }
    if expected.directives != actual.directives {
        debug!("operation directives differ");
        return false;
    }
    true
}

/// Operations of a document in source order.
pub(crate) fn ordered_operations(
    document: &ExecutableDocument,
) -> Vec<(Option<&str>, &OperationDefinition)> {
    match &document.operations {
        DocumentOperations::Single(operation) => vec![(None, &operation.node)],
        DocumentOperations::Multiple(operations) => {
            // the parser keys named operations by name, positions restore the document order
            let mut ordered: Vec<_> = operations.iter().collect();
            ordered.sort_by_key(|(_, operation)| (operation.pos.line, operation.pos.column));
            ordered
                .into_iter()
                .map(|(name, operation)| (Some(name.as_str()), &operation.node))
                .collect()
        }
    }
}

fn normalize_operation(operation: &OperationDefinition) -> Result<NormalizedOperation, QueryError> {
    let variables = operation
        .variable_definitions
        .iter()
        .map(|variable| VariableSignature {
            name: variable.node.name.node.to_string(),
            type_name: named_type(&variable.node.var_type.node).to_owned(),
        })
        .collect();

    Ok(NormalizedOperation {
        kind: operation.ty.into(),
        variables,
        selections: normalize_selection_set(&operation.selection_set.node, 0)?,
        directives: normalize_directives(&operation.directives),
    })
}

fn normalize_selection_set(
    selection_set: &SelectionSet,
    depth: usize,
) -> Result<Vec<NormalizedSelection>, QueryError> {
    if depth > MAX_SELECTION_DEPTH {
        return Err(QueryError::TooDeep(MAX_SELECTION_DEPTH));
    }

    let mut selections = Vec::with_capacity(selection_set.items.len());
    for item in &selection_set.items {
        let normalized = match &item.node {
            Selection::Field(field) => {
                let name = field.node.name.node.as_str();
                if name == TYPENAME {
                    continue;
                }
                NormalizedSelection::Field {
                    name: name.to_owned(),
                    selections: normalize_selection_set(&field.node.selection_set.node, depth + 1)?,
                }
            }
            Selection::FragmentSpread(spread) => NormalizedSelection::FragmentSpread {
                name: spread.node.fragment_name.node.to_string(),
                directives: normalize_directives(&spread.node.directives),
            },
            Selection::InlineFragment(inline) => NormalizedSelection::InlineFragment {
                type_condition: inline
                    .node
                    .type_condition
                    .as_ref()
                    .map(|condition| condition.node.on.node.to_string()),
                directives: normalize_directives(&inline.node.directives),
                selections: normalize_selection_set(&inline.node.selection_set.node, depth + 1)?,
            },
        };
        selections.push(normalized);
    }

    // stable: fragments keep their document order behind the fields
    selections.sort_by(selection_order);
    Ok(selections)
}

fn selection_order(a: &NormalizedSelection, b: &NormalizedSelection) -> Ordering {
    match (a, b) {
        (NormalizedSelection::Field { name: x, .. }, NormalizedSelection::Field { name: y, .. }) => {
            x.cmp(y)
        }
        (NormalizedSelection::Field { .. }, _) => Ordering::Less,
        (_, NormalizedSelection::Field { .. }) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn normalize_directives(directives: &[Positioned<Directive>]) -> Vec<NormalizedDirective> {
    directives
        .iter()
        .map(|directive| NormalizedDirective {
            name: directive.node.name.node.to_string(),
            arguments: directive
                .node
                .arguments
                .iter()
                .map(|(name, value)| (name.node.to_string(), value.node.to_string()))
                .collect(),
        })
        .collect()
}
