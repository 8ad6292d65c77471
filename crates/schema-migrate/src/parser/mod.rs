//! DDL front end: scanner, syntax tree and recursive-descent parser.
//!
//! Used where a catalog is not enough on its own: SQLite tables are rebuilt
//! from their stored `CREATE TABLE` text, MySQL `enum(...)` / `set(...)`
//! column types are decoded from their token stream, and the `parse`
//! command exposes the parser standalone.

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;

pub use ast::{
    BinaryOp, CheckSpec, ColumnRefList, ColumnSpec, ColumnSpecList, CreateTable, Expr,
    ForeignKeySpec, NodeKind, PrimaryKeySpec, TableConstraint, UnaryOp, UniqueKeySpec,
};
pub use lexer::{tokenize, Keyword, Scanner, Token};
pub use parser::{parse_create_table, Parser};
