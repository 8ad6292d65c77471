//! Syntax tree for `CREATE TABLE` statements.
//!
//! Every node kind is its own strongly typed record; [`NodeKind`] names them
//! for diagnostics and for the `parse` command's output.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::core::types::ForeignKeyRule;
use crate::error::Result;

use super::lexer::Keyword;

/// Tag naming every node kind of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    TableDefinition,
    ColumnSpecList,
    ColumnSpec,
    PrimaryKeySpec,
    ForeignKeySpec,
    UniqueKeySpec,
    CheckSpec,
    Unary,
    Binary,
    FunctionCall,
    ColumnRef,
    ColumnRefList,
    NumericLiteral,
    CharLiteral,
    BlobLiteral,
    NullLiteral,
    ExprList,
}

/// A parsed `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTable {
    pub name: String,
    /// Schema qualifier written before the name (`main.t`).
    pub schema: Option<String>,
    pub columns: ColumnSpecList,
    /// Table constraints in source order.
    pub constraints: Vec<TableConstraint>,
}

impl CreateTable {
    pub fn kind(&self) -> NodeKind {
        NodeKind::TableDefinition
    }

    /// The table-level primary key, if one was declared.
    pub fn primary_key(&self) -> Option<&PrimaryKeySpec> {
        self.constraints.iter().find_map(|c| match c {
            TableConstraint::PrimaryKey(pk) => Some(pk),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnSpecList(pub Vec<ColumnSpec>);

impl ColumnSpecList {
    pub fn kind(&self) -> NodeKind {
        NodeKind::ColumnSpecList
    }
}

impl Deref for ColumnSpecList {
    type Target = [ColumnSpec];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// One column definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    /// Type name as written (multi-word names joined by one space, empty when omitted).
    pub type_name: String,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub not_null: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub autoincrement: bool,
    /// `None` for no default and for `DEFAULT NULL`.
    pub default: Option<Expr>,
    /// Column-level `CHECK` expressions.
    pub checks: Vec<Expr>,
    /// Column-level `REFERENCES` clause.
    pub references: Option<ForeignKeySpec>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: String::new(),
            precision: None,
            scale: None,
            not_null: false,
            unique: false,
            primary_key: false,
            autoincrement: false,
            default: None,
            checks: Vec::new(),
            references: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::ColumnSpec
    }
}

/// Column names inside a constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnRefList(pub Vec<String>);

impl ColumnRefList {
    pub fn kind(&self) -> NodeKind {
        NodeKind::ColumnRefList
    }
}

impl Deref for ColumnRefList {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimaryKeySpec {
    pub name: Option<String>,
    pub columns: ColumnRefList,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKeySpec {
    pub name: Option<String>,
    pub columns: ColumnRefList,
    pub ref_table: String,
    pub ref_columns: ColumnRefList,
    pub on_update: ForeignKeyRule,
    pub on_delete: ForeignKeyRule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniqueKeySpec {
    pub name: Option<String>,
    pub columns: ColumnRefList,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckSpec {
    pub name: Option<String>,
    pub expr: Expr,
}

/// A table-level constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableConstraint {
    PrimaryKey(PrimaryKeySpec),
    ForeignKey(ForeignKeySpec),
    Unique(UniqueKeySpec),
    Check(CheckSpec),
}

impl TableConstraint {
    pub fn kind(&self) -> NodeKind {
        match self {
            TableConstraint::PrimaryKey(_) => NodeKind::PrimaryKeySpec,
            TableConstraint::ForeignKey(_) => NodeKind::ForeignKeySpec,
            TableConstraint::Unique(_) => NodeKind::UniqueKeySpec,
            TableConstraint::Check(_) => NodeKind::CheckSpec,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Is,
    IsNot,
    In,
    NotIn,
    Like,
    NotLike,
    Glob,
    NotGlob,
    // Bitwise
    BitAnd,
    BitOr,
    ShiftLeft,
    ShiftRight,
    // Arithmetic
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// Portable spelling (`==` and `!=` normalise to `=` and `<>`).
    pub fn as_sql(self) -> &'static str {
        match self {
            BinaryOp::Or => "OR",
            BinaryOp::And => "AND",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Is => "IS",
            BinaryOp::IsNot => "IS NOT",
            BinaryOp::In => "IN",
            BinaryOp::NotIn => "NOT IN",
            BinaryOp::Like => "LIKE",
            BinaryOp::NotLike => "NOT LIKE",
            BinaryOp::Glob => "GLOB",
            BinaryOp::NotGlob => "NOT GLOB",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Concat => "||",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

/// Scalar and boolean expressions (check constraints and defaults).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    ColumnRef(String),
    /// Numeric text as written, sign folded in for signed defaults.
    NumericLiteral(String),
    CharLiteral(String),
    /// Hex digits of an `X'..'` literal.
    BlobLiteral(String),
    NullLiteral,
    /// Parenthesised list, the right side of `IN`.
    List(Vec<Expr>),
}

impl Expr {
    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::Unary { .. } => NodeKind::Unary,
            Expr::Binary { .. } => NodeKind::Binary,
            Expr::FunctionCall { .. } => NodeKind::FunctionCall,
            Expr::ColumnRef(_) => NodeKind::ColumnRef,
            Expr::NumericLiteral(_) => NodeKind::NumericLiteral,
            Expr::CharLiteral(_) => NodeKind::CharLiteral,
            Expr::BlobLiteral(_) => NodeKind::BlobLiteral,
            Expr::NullLiteral => NodeKind::NullLiteral,
            Expr::List(_) => NodeKind::ExprList,
        }
    }

    /// Render as SQL, quoting every column reference with `quote`.
    pub fn to_sql<F>(&self, quote: F) -> Result<String>
    where
        F: Fn(&str) -> Result<String>,
    {
        let mut out = String::new();
        self.write_sql(&mut out, &quote)?;
        Ok(out)
    }

    fn write_sql(&self, out: &mut String, quote: &dyn Fn(&str) -> Result<String>) -> Result<()> {
        match self {
            Expr::Unary { op, operand } => {
                out.push_str(match op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                    UnaryOp::Not => "NOT ",
                });
                // A sign followed by another sign would read as a `--` comment.
                let signed = match operand.as_ref() {
                    Expr::Unary { op, .. } => *op != UnaryOp::Not,
                    Expr::NumericLiteral(text) => text.starts_with(['-', '+']),
                    _ => false,
                };
                if signed && *op != UnaryOp::Not {
                    out.push('(');
                    operand.write_sql(out, quote)?;
                    out.push(')');
                    Ok(())
                } else {
                    operand.write_operand(out, quote)
                }
            }
            Expr::Binary { op, left, right } => {
                left.write_operand(out, quote)?;
                out.push(' ');
                out.push_str(op.as_sql());
                out.push(' ');
                right.write_operand(out, quote)
            }
            Expr::FunctionCall { name, args } => {
                out.push_str(name);
                out.push('(');
                write_list(out, args, quote)?;
                out.push(')');
                Ok(())
            }
            Expr::ColumnRef(name) => {
                out.push_str(&quote(name)?);
                Ok(())
            }
            Expr::NumericLiteral(text) => {
                out.push_str(text);
                Ok(())
            }
            Expr::CharLiteral(text) => {
                out.push('\'');
                out.push_str(&text.replace('\'', "''"));
                out.push('\'');
                Ok(())
            }
            Expr::BlobLiteral(hex) => {
                out.push_str("X'");
                out.push_str(hex);
                out.push('\'');
                Ok(())
            }
            Expr::NullLiteral => {
                out.push_str("NULL");
                Ok(())
            }
            Expr::List(items) => {
                out.push('(');
                write_list(out, items, quote)?;
                out.push(')');
                Ok(())
            }
        }
    }

    fn write_operand(&self, out: &mut String, quote: &dyn Fn(&str) -> Result<String>) -> Result<()> {
        if let Expr::Binary { .. } = self {
            out.push('(');
            self.write_sql(out, quote)?;
            out.push(')');
            Ok(())
        } else {
            self.write_sql(out, quote)
        }
    }
}

/// Column name as written in portable text: bare when it lexes back as the
/// same identifier, double-quoted otherwise.
fn portable_ident(name: &str) -> Result<String> {
    let bare = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && Keyword::lookup(name).is_none();
    if bare {
        Ok(name.to_string())
    } else {
        Ok(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

/// Renders portable SQL; nested binary operations are always parenthesised.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_sql(portable_ident).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

fn write_list(out: &mut String, items: &[Expr], quote: &dyn Fn(&str) -> Result<String>) -> Result<()> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.write_sql(out, quote)?;
    }
    Ok(())
}
