//! Roles, typed attribute values and the per-node content store.
//!
//! A role names which syntactic attribute or child slot a value occupies.
//! Candidate values are heterogeneous (identifier text, modifier sets,
//! operator kinds, booleans, comment bodies), so each role carries a fixed
//! value shape inside the [`RoleValue`] sum type.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::node::{PcsNode, Revision};

/// Which syntactic attribute or child slot a value occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    // Attribute roles.
    Name,
    Value,
    CommentContent,
    Modifier,
    OperatorKind,
    /// Whether a wildcard bound renders as `extends` (true) or `super`.
    IsUpper,
    // Child-slot roles.
    TypeMember,
    Statement,
    Parameter,
    Argument,
    Expression,
    Condition,
    Type,
    Annotation,
    AnnotationValue,
    Comment,
    Import,
    Body,
}

/// A modifier token on a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Abstract,
    Static,
    Final,
    Synchronized,
    Volatile,
    Transient,
    Native,
    Strictfp,
}

/// Categories modifiers are partitioned into when reconciling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierCategory {
    Visibility,
    Kind,
    Other,
}

impl Modifier {
    pub fn category(self) -> ModifierCategory {
        match self {
            Modifier::Public | Modifier::Protected | Modifier::Private => {
                ModifierCategory::Visibility
            }
            Modifier::Abstract | Modifier::Static | Modifier::Final => ModifierCategory::Kind,
            _ => ModifierCategory::Other,
        }
    }

    pub fn is_visibility(self) -> bool {
        self.category() == ModifierCategory::Visibility
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Protected => "protected",
            Modifier::Private => "private",
            Modifier::Abstract => "abstract",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Synchronized => "synchronized",
            Modifier::Volatile => "volatile",
            Modifier::Transient => "transient",
            Modifier::Native => "native",
            Modifier::Strictfp => "strictfp",
        }
    }
}

/// Binary operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UnsignedShr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Instanceof,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
            BinaryOperator::UnsignedShr => ">>>",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Instanceof => "instanceof",
        }
    }
}

/// Unary operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Pos,
    Neg,
    Not,
    Complement,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Pos => "+",
            UnaryOperator::Neg => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::Complement => "~",
            UnaryOperator::PreInc | UnaryOperator::PostInc => "++",
            UnaryOperator::PreDec | UnaryOperator::PostDec => "--",
        }
    }
}

/// An operator, tagged by category. Two sides of a content conflict are
/// expected to stay within one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    Binary(BinaryOperator),
    Unary(UnaryOperator),
}

impl OperatorKind {
    pub fn symbol(self) -> &'static str {
        match self {
            OperatorKind::Binary(op) => op.symbol(),
            OperatorKind::Unary(op) => op.symbol(),
        }
    }

    pub fn same_category(self, other: OperatorKind) -> bool {
        matches!(
            (self, other),
            (OperatorKind::Binary(_), OperatorKind::Binary(_))
                | (OperatorKind::Unary(_), OperatorKind::Unary(_))
        )
    }
}

/// A typed attribute payload. The shape is fixed per role: `Text` for
/// names, values and comment bodies; `Modifiers`, `Operator` and `Bool`
/// for their namesake roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleValue {
    Text(String),
    Modifiers(BTreeSet<Modifier>),
    Operator(OperatorKind),
    Bool(bool),
}

impl RoleValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RoleValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_modifiers(&self) -> Option<&BTreeSet<Modifier>> {
        match self {
            RoleValue::Modifiers(mods) => Some(mods),
            _ => None,
        }
    }

    pub fn as_operator(&self) -> Option<OperatorKind> {
        match self {
            RoleValue::Operator(op) => Some(*op),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RoleValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// A candidate attribute assignment contributed by one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub value: RoleValue,
    pub revision: Revision,
    /// Raw textual form of the value, carried for comment bodies so the
    /// line-based merge works on what was actually in the source.
    pub raw: Option<String>,
}

impl Content {
    pub fn new(role: Role, value: RoleValue, revision: Revision) -> Self {
        Self {
            role,
            value,
            revision,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

/// A reconciled `(role, value)` pair on a merged node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoledValue {
    pub role: Role,
    pub value: RoleValue,
}

/// The reconciled attribute set of a merged node.
pub type RoledValues = Vec<RoledValue>;

/// Mapping from each node to its candidate attribute assignments.
///
/// Candidates are kept in insertion order; the merger orders them
/// `Base, Left, Right` before reconciling so conflict-id assignment is
/// stable across runs.
#[derive(Debug, Default)]
pub struct ContentStore {
    map: HashMap<PcsNode, Vec<Content>>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: PcsNode, content: Content) {
        self.map.entry(node).or_default().push(content);
    }

    pub fn candidates(&self, node: PcsNode) -> &[Content] {
        self.map.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, node: PcsNode) -> bool {
        self.map.contains_key(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_categories() {
        assert!(Modifier::Public.is_visibility());
        assert!(Modifier::Private.is_visibility());
        assert!(!Modifier::Static.is_visibility());
        assert_eq!(Modifier::Final.category(), ModifierCategory::Kind);
        assert_eq!(Modifier::Synchronized.category(), ModifierCategory::Other);
    }

    #[test]
    fn operator_categories_and_symbols() {
        let plus = OperatorKind::Binary(BinaryOperator::Plus);
        let neg = OperatorKind::Unary(UnaryOperator::Neg);
        assert!(plus.same_category(OperatorKind::Binary(BinaryOperator::Minus)));
        assert!(!plus.same_category(neg));
        assert_eq!(plus.symbol(), "+");
        assert_eq!(neg.symbol(), "-");
        assert_eq!(OperatorKind::Unary(UnaryOperator::PostInc).symbol(), "++");
    }

    #[test]
    fn content_store_keeps_insertion_order() {
        let mut store = ContentStore::new();
        let node = PcsNode::Element(0);
        store.insert(
            node,
            Content::new(Role::Name, RoleValue::Text("a".into()), Revision::Base),
        );
        store.insert(
            node,
            Content::new(Role::Name, RoleValue::Text("b".into()), Revision::Left),
        );
        let candidates = store.candidates(node);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].revision, Revision::Base);
        assert!(store.candidates(PcsNode::Element(9)).is_empty());
    }
}
