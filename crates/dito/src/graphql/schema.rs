//! Schema index used to validate executable documents.
//!
//! Only what query validation needs is kept: every named type with its
//! shape, the output field types of objects and interfaces, and the root
//! operation types.

use async_graphql_parser::types::{
    BaseType, ExecutableDocument, FieldDefinition, OperationType, Selection, SelectionSet,
    ServiceDocument, Type, TypeDefinition, TypeKind, TypeSystemDefinition,
};
use async_graphql_parser::Positioned;
use std::collections::HashMap;

use super::normalize::{ordered_operations, NormalizedQuery, MAX_SELECTION_DEPTH, TYPENAME};
use crate::error::CompileError;

const BUILTIN_SCALARS: [&str; 5] = ["Boolean", "Float", "ID", "Int", "String"];
const INTROSPECTION_FIELDS: [&str; 2] = ["__schema", "__type"];

/// Why an executable document was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("failed to parse query: {0}")]
    Parse(String),
    #[error("schema does not define a {0} root type")]
    MissingRoot(&'static str),
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("type '{type_name}' has no field '{field}'")]
    UnknownField { type_name: String, field: String },
    #[error("field '{0}' returns a composite type and needs a selection set")]
    MissingSelection(String),
    #[error("field '{0}' returns a leaf type and cannot have a selection set")]
    SelectionOnLeaf(String),
    #[error("type '{0}' cannot be used as a fragment type condition")]
    NotComposite(String),
    #[error("unknown fragment '{0}'")]
    UnknownFragment(String),
    #[error("selection depth exceeds {0}")]
    TooDeep(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeShape {
    /// Object or interface, field name -> named output type
    Composite(HashMap<String, String>),
    Union,
    Leaf,
    Input,
}

impl TypeShape {
    fn is_composite(&self) -> bool {
        matches!(self, TypeShape::Composite(_) | TypeShape::Union)
    }
}

#[derive(Debug, Clone)]
pub struct GraphQlSchema {
    types: HashMap<String, TypeShape>,
    query_root: Option<String>,
    mutation_root: Option<String>,
    subscription_root: Option<String>,
}

impl GraphQlSchema {
    /// Parse a schema definition document.
    pub fn parse(sdl: &str) -> Result<Self, CompileError> {
        let document = async_graphql_parser::parse_schema(sdl)
            .map_err(|e| CompileError::InvalidSchema(e.to_string()))?;
        Ok(Self::from_document(&document))
    }

    /// Parse several schema sources as one document.
    pub fn from_sources<'a>(sources: impl IntoIterator<Item = &'a str>) -> Result<Self, CompileError> {
        let joined = sources.into_iter().collect::<Vec<_>>().join("\n");
        Self::parse(&joined)
    }

    fn from_document(document: &ServiceDocument) -> Self {
        let mut types: HashMap<String, TypeShape> = BUILTIN_SCALARS
            .iter()
            .map(|name| ((*name).to_owned(), TypeShape::Leaf))
            .collect();
        let mut query_root = None;
        let mut mutation_root = None;
        let mut subscription_root = None;

        for definition in &document.definitions {
            match definition {
                TypeSystemDefinition::Schema(schema) => {
                    let schema = &schema.node;
                    if let Some(name) = &schema.query {
                        query_root = Some(name.node.to_string());
                    }
                    if let Some(name) = &schema.mutation {
                        mutation_root = Some(name.node.to_string());
                    }
                    if let Some(name) = &schema.subscription {
                        subscription_root = Some(name.node.to_string());
                    }
                }
                TypeSystemDefinition::Type(definition) => merge_type(&mut types, &definition.node),
                TypeSystemDefinition::Directive(_) => {}
            }
        }

        let default_root = |name: &str| types.contains_key(name).then(|| name.to_owned());
        Self {
            query_root: query_root.or_else(|| default_root("Query")),
            mutation_root: mutation_root.or_else(|| default_root("Mutation")),
            subscription_root: subscription_root.or_else(|| default_root("Subscription")),
            types,
        }
    }

    /// Parse, validate and normalize an executable document.
    pub fn load_query(&self, query: &str) -> Result<NormalizedQuery, QueryError> {
        let document = async_graphql_parser::parse_query(query)
            .map_err(|e| QueryError::Parse(e.to_string()))?;
        self.validate(&document)?;
        NormalizedQuery::from_document(&document)
    }

    /// Check that every selection refers to fields and types the schema defines.
    pub fn validate(&self, document: &ExecutableDocument) -> Result<(), QueryError> {
        for fragment in document.fragments.values() {
            let fragment = &fragment.node;
            let on = fragment.type_condition.node.on.node.as_str();
            self.require_composite(on)?;
            self.validate_selection_set(document, on, &fragment.selection_set.node, 0)?;
        }

        for (_, operation) in ordered_operations(document) {
            for variable in &operation.variable_definitions {
                let type_name = named_type(&variable.node.var_type.node);
                if !self.types.contains_key(type_name) {
                    return Err(QueryError::UnknownType(type_name.to_owned()));
                }
            }

            let root = self.root_type(operation.ty)?;
            self.validate_selection_set(document, root, &operation.selection_set.node, 0)?;
        }

        Ok(())
    }

    fn root_type(&self, ty: OperationType) -> Result<&str, QueryError> {
        let (root, kind) = match ty {
            OperationType::Query => (&self.query_root, "query"),
            OperationType::Mutation => (&self.mutation_root, "mutation"),
            OperationType::Subscription => (&self.subscription_root, "subscription"),
        };
        root.as_deref().ok_or(QueryError::MissingRoot(kind))
    }

    fn require_composite(&self, name: &str) -> Result<(), QueryError> {
        match self.types.get(name) {
            Some(shape) if shape.is_composite() => Ok(()),
            Some(_) => Err(QueryError::NotComposite(name.to_owned())),
            None => Err(QueryError::UnknownType(name.to_owned())),
        }
    }

    fn validate_selection_set(
        &self,
        document: &ExecutableDocument,
        parent: &str,
        selection_set: &SelectionSet,
        depth: usize,
    ) -> Result<(), QueryError> {
        if depth > MAX_SELECTION_DEPTH {
            return Err(QueryError::TooDeep(MAX_SELECTION_DEPTH));
        }

        let parent_shape = self
            .types
            .get(parent)
            .ok_or_else(|| QueryError::UnknownType(parent.to_owned()))?;

        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => {
                    let field = &field.node;
                    let name = field.name.node.as_str();
                    if name == TYPENAME || INTROSPECTION_FIELDS.contains(&name) {
                        continue;
                    }

                    let unknown = || QueryError::UnknownField {
                        type_name: parent.to_owned(),
                        field: name.to_owned(),
                    };
                    let field_type = match parent_shape {
                        TypeShape::Composite(fields) => fields.get(name).ok_or_else(unknown)?,
                        _ => return Err(unknown()),
                    };
                    let field_shape = self
                        .types
                        .get(field_type)
                        .ok_or_else(|| QueryError::UnknownType(field_type.clone()))?;

                    let has_selection = !field.selection_set.node.items.is_empty();
                    match (field_shape.is_composite(), has_selection) {
                        (true, true) => self.validate_selection_set(
                            document,
                            field_type,
                            &field.selection_set.node,
                            depth + 1,
                        )?,
                        (true, false) => return Err(QueryError::MissingSelection(name.to_owned())),
                        (false, true) => return Err(QueryError::SelectionOnLeaf(name.to_owned())),
                        (false, false) => {}
                    }
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    if !document.fragments.contains_key(name) {
                        return Err(QueryError::UnknownFragment(name.to_owned()));
                    }
                }
                Selection::InlineFragment(inline) => {
                    let inline = &inline.node;
                    let target = inline
                        .type_condition
                        .as_ref()
                        .map(|condition| condition.node.on.node.as_str())
                        .unwrap_or(parent);
                    self.require_composite(target)?;
                    self.validate_selection_set(
                        document,
                        target,
                        &inline.selection_set.node,
                        depth + 1,
                    )?;
                }
            }
        }

        Ok(())
    }
}

fn merge_type(types: &mut HashMap<String, TypeShape>, definition: &TypeDefinition) {
    let name = definition.name.node.to_string();
    let shape = match &definition.kind {
        TypeKind::Object(object) => composite(&object.fields),
        TypeKind::Interface(interface) => composite(&interface.fields),
        TypeKind::Union(_) => TypeShape::Union,
        TypeKind::Scalar | TypeKind::Enum(_) => TypeShape::Leaf,
        TypeKind::InputObject(_) => TypeShape::Input,
    };

    // `extend type` and repeated definitions add fields to the existing type
    if let TypeShape::Composite(extra) = &shape {
        if let Some(TypeShape::Composite(fields)) = types.get_mut(&name) {
            fields.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            return;
        }
    }
    types.insert(name, shape);
}

fn composite(fields: &[Positioned<FieldDefinition>]) -> TypeShape {
    TypeShape::Composite(
        fields
            .iter()
            .map(|field| {
                let field = &field.node;
                (
                    field.name.node.to_string(),
                    named_type(&field.ty.node).to_owned(),
                )
            })
            .collect(),
    )
}

/// Innermost named type, e.g. `User` for `[User!]!`.
pub(crate) fn named_type(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => named_type(inner),
    }
}
