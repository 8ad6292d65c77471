//! Recursive-descent parser for `CREATE TABLE` statements.
//!
//! Expression precedence, lowest first:
//!
//! ```text
//! OR
//! AND
//! = == <> != < <= > >= IS [NOT] [NOT] IN|LIKE|GLOB
//! << >> & |
//! + - ||
//! * / %
//! unary + - NOT
//! primary
//! ```
//!
//! Every binary level is parsed with a loop, so operators of equal
//! precedence associate to the left: `a - b - c` is `(a - b) - c`.

use crate::core::types::ForeignKeyRule;
use crate::error::{MigrateError, Result};

use super::ast::{
    BinaryOp, CheckSpec, ColumnRefList, ColumnSpec, ColumnSpecList, CreateTable, Expr,
    ForeignKeySpec, PrimaryKeySpec, TableConstraint, UnaryOp, UniqueKeySpec,
};
use super::lexer::{Keyword, Scanner, Token};

/// Parser over one DDL text. Owns its cursor; create one per input.
pub struct Parser<'a> {
    input: &'a str,
    scanner: Scanner<'a>,
    current: Token,
    position: usize,
    primed: bool,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            scanner: Scanner::new(input),
            current: Token::Eof,
            position: 0,
            primed: false,
        }
    }

    /// Parse exactly one `CREATE TABLE` statement (a trailing `;` is allowed).
    pub fn create_table(&mut self) -> Result<CreateTable> {
        self.prime()?;
        let table = self.statement()?;
        self.eat(&Token::Semicolon)?;
        self.expect_eof()?;
        Ok(table)
    }

    /// Parse a script of `;`-separated `CREATE TABLE` statements.
    pub fn create_tables(&mut self) -> Result<Vec<CreateTable>> {
        self.prime()?;
        let mut tables = Vec::new();
        while self.current != Token::Eof {
            tables.push(self.statement()?);
            if !self.eat(&Token::Semicolon)? {
                self.expect_eof()?;
            }
            while self.eat(&Token::Semicolon)? {}
        }
        Ok(tables)
    }

    /// Parse a standalone expression covering the whole input.
    pub fn expression(&mut self) -> Result<Expr> {
        self.prime()?;
        let expr = self.parse_or()?;
        self.expect_eof()?;
        Ok(expr)
    }

    // ===== Token plumbing =====

    fn prime(&mut self) -> Result<()> {
        if !self.primed {
            self.primed = true;
            self.advance()?;
        }
        Ok(())
    }

    /// Move to the next token, returning the one just left.
    fn advance(&mut self) -> Result<Token> {
        let next = self.scanner.next_token()?;
        self.position = self.scanner.token_start();
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn error(&self, message: impl Into<String>) -> MigrateError {
        MigrateError::syntax(self.position, message)
    }

    fn unexpected(&self, expected: &str) -> MigrateError {
        self.error(format!("expected {}, found {}", expected, self.current))
    }

    fn eat(&mut self, token: &Token) -> Result<bool> {
        if &self.current == token {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> Result<bool> {
        self.eat(&Token::Keyword(keyword))
    }

    fn eat_word(&mut self, word: &str) -> Result<bool> {
        if self.current.is_word(word) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.eat(&token)? {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", token)))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.eat_keyword(keyword)? {
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        if self.current == Token::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of statement"))
        }
    }

    /// True when the current token can be read as a name.
    fn at_identifier(&self) -> bool {
        match &self.current {
            Token::Ident(_) | Token::QuotedIdent(_) => true,
            Token::Keyword(keyword) => !keyword.is_reserved(),
            _ => false,
        }
    }

    fn identifier(&mut self) -> Result<String> {
        if !self.at_identifier() {
            return Err(self.unexpected("identifier"));
        }
        let start = self.position;
        match self.advance()? {
            Token::Ident(name) | Token::QuotedIdent(name) => Ok(name),
            // Keep the keyword's spelling from the source text.
            Token::Keyword(keyword) => {
                let len = keyword.as_str().len();
                Ok(self
                    .input
                    .get(start..start + len)
                    .map(str::to_string)
                    .unwrap_or_else(|| keyword.as_str().to_ascii_lowercase()))
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    // ===== Statement =====

    fn statement(&mut self) -> Result<CreateTable> {
        self.expect_keyword(Keyword::Create)?;
        if !self.eat_word("TEMP")? {
            self.eat_word("TEMPORARY")?;
        }
        self.expect_keyword(Keyword::Table)?;
        if self.eat_word("IF")? {
            self.expect_keyword(Keyword::Not)?;
            if !self.eat_word("EXISTS")? {
                return Err(self.unexpected("EXISTS"));
            }
        }

        let mut schema = None;
        let mut name = self.identifier()?;
        if self.eat(&Token::Dot)? {
            schema = Some(name);
            name = self.identifier()?;
        }

        self.expect(Token::LParen)?;
        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        loop {
            match &self.current {
                Token::Keyword(Keyword::Constraint) => {
                    self.advance()?;
                    let constraint_name = self.identifier()?;
                    constraints.push(self.table_constraint(Some(constraint_name))?);
                }
                Token::Keyword(
                    Keyword::Primary | Keyword::Unique | Keyword::Foreign | Keyword::Check,
                ) => constraints.push(self.table_constraint(None)?),
                _ if self.at_identifier() => columns.push(self.column_spec()?),
                _ => return Err(self.unexpected("column definition or table constraint")),
            }
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect(Token::RParen)?;

        if self.eat_word("WITHOUT")? && !self.eat_word("ROWID")? {
            return Err(self.unexpected("ROWID"));
        }

        if columns.is_empty() {
            return Err(self.error(format!("table {} declares no columns", name)));
        }

        Ok(CreateTable {
            name,
            schema,
            columns: ColumnSpecList(columns),
            constraints,
        })
    }

    fn column_spec(&mut self) -> Result<ColumnSpec> {
        let mut column = ColumnSpec::new(self.identifier()?);

        let mut words = Vec::new();
        while let Token::Ident(word) = &self.current {
            if word.eq_ignore_ascii_case("COLLATE") {
                break;
            }
            words.push(word.clone());
            self.advance()?;
        }
        column.type_name = words.join(" ");

        if !column.type_name.is_empty() && self.eat(&Token::LParen)? {
            column.precision = Some(self.type_argument()?);
            if self.eat(&Token::Comma)? {
                column.scale = Some(self.type_argument()?);
                if self.eat(&Token::Comma)? {
                    self.type_argument()?;
                }
            }
            self.expect(Token::RParen)?;
        }

        loop {
            match &self.current {
                Token::Keyword(Keyword::Constraint) => {
                    self.advance()?;
                    self.identifier()?;
                }
                Token::Keyword(Keyword::Not) => {
                    self.advance()?;
                    self.expect_keyword(Keyword::Null)?;
                    column.not_null = true;
                    self.conflict_clause()?;
                }
                Token::Keyword(Keyword::Null) => {
                    self.advance()?;
                    column.not_null = false;
                }
                Token::Keyword(Keyword::Unique) => {
                    self.advance()?;
                    column.unique = true;
                    self.conflict_clause()?;
                }
                Token::Keyword(Keyword::Primary) => {
                    self.advance()?;
                    self.expect_keyword(Keyword::Key)?;
                    column.primary_key = true;
                    self.sort_order()?;
                    self.conflict_clause()?;
                    if self.eat_keyword(Keyword::Autoincrement)? {
                        column.autoincrement = true;
                    }
                }
                Token::Keyword(Keyword::Autoincrement) => {
                    self.advance()?;
                    column.autoincrement = true;
                }
                Token::Keyword(Keyword::Default) => {
                    self.advance()?;
                    column.default = self.default_value()?;
                }
                Token::Keyword(Keyword::Check) => {
                    // Parenthesised so a following NOT NULL is not read as NOT IN.
                    self.advance()?;
                    self.expect(Token::LParen)?;
                    column.checks.push(self.parse_or()?);
                    self.expect(Token::RParen)?;
                }
                Token::Keyword(Keyword::References) => {
                    self.advance()?;
                    let own = ColumnRefList(vec![column.name.clone()]);
                    column.references = Some(self.references(None, own)?);
                }
                Token::Ident(word) if word.eq_ignore_ascii_case("COLLATE") => {
                    self.advance()?;
                    self.identifier()?;
                }
                _ => break,
            }
        }

        Ok(column)
    }

    fn type_argument(&mut self) -> Result<u32> {
        let negative = if self.eat(&Token::Minus)? {
            true
        } else {
            self.eat(&Token::Plus)?;
            false
        };
        match &self.current {
            Token::Number(text) => {
                let value = text
                    .parse::<u32>()
                    .map_err(|_| self.error(format!("invalid type size {}", text)))?;
                self.advance()?;
                Ok(if negative { 0 } else { value })
            }
            _ => Err(self.unexpected("type size")),
        }
    }

    /// `DEFAULT` operand: signed number, string, bare word, `NULL` or `( expr )`.
    fn default_value(&mut self) -> Result<Option<Expr>> {
        match &self.current {
            Token::Keyword(Keyword::Null) => {
                self.advance()?;
                Ok(None)
            }
            Token::Plus | Token::Minus => {
                let sign = if self.advance()? == Token::Minus { "-" } else { "" };
                match self.advance()? {
                    Token::Number(text) => Ok(Some(Expr::NumericLiteral(format!("{}{}", sign, text)))),
                    _ => Err(self.error("expected number after sign in DEFAULT")),
                }
            }
            Token::Number(_)
            | Token::Str(_)
            | Token::Blob(_)
            | Token::Ident(_)
            | Token::QuotedIdent(_) => {
                match self.advance()? {
                    Token::Number(text) => Ok(Some(Expr::NumericLiteral(text))),
                    Token::Str(text) => Ok(Some(Expr::CharLiteral(text))),
                    Token::Blob(hex) => Ok(Some(Expr::BlobLiteral(hex))),
                    Token::Ident(word) | Token::QuotedIdent(word) => Ok(Some(Expr::ColumnRef(word))),
                    _ => Err(self.error("expected default value")),
                }
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(Some(expr))
            }
            _ => Err(self.unexpected("default value")),
        }
    }

    /// Optional `ON CONFLICT <resolution>` after a column or key constraint.
    fn conflict_clause(&mut self) -> Result<()> {
        if self.current.is_keyword(Keyword::On) {
            self.advance()?;
            if !self.eat_word("CONFLICT")? {
                return Err(self.unexpected("CONFLICT"));
            }
            self.identifier()?;
        }
        Ok(())
    }

    fn sort_order(&mut self) -> Result<()> {
        if !self.eat_word("ASC")? {
            self.eat_word("DESC")?;
        }
        Ok(())
    }

    fn column_ref_list(&mut self) -> Result<ColumnRefList> {
        self.expect(Token::LParen)?;
        let mut columns = vec![self.identifier()?];
        self.sort_order()?;
        while self.eat(&Token::Comma)? {
            columns.push(self.identifier()?);
            self.sort_order()?;
        }
        self.expect(Token::RParen)?;
        Ok(ColumnRefList(columns))
    }

    fn table_constraint(&mut self, name: Option<String>) -> Result<TableConstraint> {
        match &self.current {
            Token::Keyword(Keyword::Primary) => {
                self.advance()?;
                self.expect_keyword(Keyword::Key)?;
                let columns = self.column_ref_list()?;
                self.conflict_clause()?;
                Ok(TableConstraint::PrimaryKey(PrimaryKeySpec { name, columns }))
            }
            Token::Keyword(Keyword::Unique) => {
                self.advance()?;
                let columns = self.column_ref_list()?;
                self.conflict_clause()?;
                Ok(TableConstraint::Unique(UniqueKeySpec { name, columns }))
            }
            Token::Keyword(Keyword::Foreign) => {
                self.advance()?;
                self.expect_keyword(Keyword::Key)?;
                let columns = self.column_ref_list()?;
                self.expect_keyword(Keyword::References)?;
                Ok(TableConstraint::ForeignKey(self.references(name, columns)?))
            }
            Token::Keyword(Keyword::Check) => {
                self.advance()?;
                let expr = self.parse_or()?;
                Ok(TableConstraint::Check(CheckSpec { name, expr }))
            }
            _ => Err(self.unexpected("UNIQUE, FOREIGN KEY, CHECK or PRIMARY KEY")),
        }
    }

    /// Tail of a foreign key after `REFERENCES`.
    fn references(&mut self, name: Option<String>, columns: ColumnRefList) -> Result<ForeignKeySpec> {
        let ref_table = self.identifier()?;
        let ref_columns = if self.current == Token::LParen {
            self.column_ref_list()?
        } else {
            ColumnRefList::default()
        };

        let mut spec = ForeignKeySpec {
            name,
            columns,
            ref_table,
            ref_columns,
            on_update: ForeignKeyRule::None,
            on_delete: ForeignKeyRule::None,
        };

        loop {
            if self.eat_keyword(Keyword::On)? {
                if self.eat_keyword(Keyword::Update)? {
                    spec.on_update = self.referential_action()?;
                } else if self.eat_keyword(Keyword::Delete)? {
                    spec.on_delete = self.referential_action()?;
                } else {
                    return Err(self.unexpected("UPDATE or DELETE"));
                }
            } else if self.eat_word("MATCH")? {
                self.identifier()?;
            } else if self.eat_word("DEFERRABLE")? {
                if self.eat_word("INITIALLY")? {
                    self.identifier()?;
                }
            } else {
                return Ok(spec);
            }
        }
    }

    fn referential_action(&mut self) -> Result<ForeignKeyRule> {
        if self.eat_keyword(Keyword::Cascade)? {
            return Ok(ForeignKeyRule::Cascade);
        }
        if self.eat_word("SET")? {
            if self.eat_keyword(Keyword::Null)? {
                return Ok(ForeignKeyRule::SetNull);
            }
            if self.eat_keyword(Keyword::Default)? {
                return Ok(ForeignKeyRule::SetDefault);
            }
            return Err(self.unexpected("NULL or DEFAULT"));
        }
        if self.eat_word("RESTRICT")? {
            return Ok(ForeignKeyRule::Restrict);
        }
        if self.eat_word("NO")? {
            if self.eat_word("ACTION")? {
                return Ok(ForeignKeyRule::None);
            }
            return Err(self.unexpected("ACTION"));
        }
        Err(self.unexpected("referential action"))
    }

    // ===== Expressions =====

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword(Keyword::Or)? {
            let right = self.parse_and()?;
            left = Self::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_comparison()?;
        while self.eat_keyword(Keyword::And)? {
            let right = self.parse_comparison()?;
            left = Self::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_bitwise()?;
        loop {
            let op = match &self.current {
                Token::Eq | Token::EqEq => BinaryOp::Eq,
                Token::NotEq | Token::LtGt => BinaryOp::NotEq,
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                Token::Keyword(Keyword::In) => BinaryOp::In,
                Token::Keyword(Keyword::Like) => BinaryOp::Like,
                Token::Keyword(Keyword::Glob) => BinaryOp::Glob,
                Token::Keyword(Keyword::Is) => BinaryOp::Is,
                Token::Keyword(Keyword::Not) => BinaryOp::NotIn,
                _ => return Ok(left),
            };
            self.advance()?;

            let op = match op {
                BinaryOp::Is if self.eat_keyword(Keyword::Not)? => BinaryOp::IsNot,
                BinaryOp::NotIn => {
                    if self.eat_keyword(Keyword::In)? {
                        BinaryOp::NotIn
                    } else if self.eat_keyword(Keyword::Like)? {
                        BinaryOp::NotLike
                    } else if self.eat_keyword(Keyword::Glob)? {
                        BinaryOp::NotGlob
                    } else {
                        return Err(self.unexpected("IN, LIKE or GLOB after NOT"));
                    }
                }
                other => other,
            };

            let right = if matches!(op, BinaryOp::In | BinaryOp::NotIn) {
                self.parenthesized_list()?
            } else {
                self.parse_bitwise()?
            };
            left = Self::binary(op, left, right);
        }
    }

    fn parse_bitwise(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match &self.current {
                Token::ShiftLeft => BinaryOp::ShiftLeft,
                Token::ShiftRight => BinaryOp::ShiftRight,
                Token::Amp => BinaryOp::BitAnd,
                Token::Pipe => BinaryOp::BitOr,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_additive()?;
            left = Self::binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match &self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                Token::Concat => BinaryOp::Concat,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Self::binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match &self.current {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = Self::binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match &self.current {
            Token::Plus => UnaryOp::Plus,
            Token::Minus => UnaryOp::Minus,
            Token::Keyword(Keyword::Not) => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.advance()?;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match &self.current {
            Token::Number(_) | Token::Str(_) | Token::Blob(_) | Token::Keyword(Keyword::Null) => {
                match self.advance()? {
                    Token::Number(text) => Ok(Expr::NumericLiteral(text)),
                    Token::Str(text) => Ok(Expr::CharLiteral(text)),
                    Token::Blob(hex) => Ok(Expr::BlobLiteral(hex)),
                    _ => Ok(Expr::NullLiteral),
                }
            }
            _ if self.at_identifier() => {
                let name = self.identifier()?;
                if self.current == Token::LParen {
                    self.advance()?;
                    let mut args = Vec::new();
                    if !self.eat(&Token::RParen)? {
                        args = self.expression_list()?;
                        self.expect(Token::RParen)?;
                    }
                    Ok(Expr::FunctionCall { name, args })
                } else {
                    Ok(Expr::ColumnRef(name))
                }
            }
            Token::LParen => {
                self.advance()?;
                let mut items = self.expression_list()?;
                self.expect(Token::RParen)?;
                if items.len() == 1 {
                    Ok(items.remove(0))
                } else {
                    Ok(Expr::List(items))
                }
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn expression_list(&mut self) -> Result<Vec<Expr>> {
        let mut items = vec![self.parse_or()?];
        while self.eat(&Token::Comma)? {
            items.push(self.parse_or()?);
        }
        Ok(items)
    }

    /// `( expr [, expr]* )` as a list, even with a single element.
    fn parenthesized_list(&mut self) -> Result<Expr> {
        self.expect(Token::LParen)?;
        let items = self.expression_list()?;
        self.expect(Token::RParen)?;
        Ok(Expr::List(items))
    }
}

/// Parse one `CREATE TABLE` statement.
pub fn parse_create_table(sql: &str) -> Result<CreateTable> {
    Parser::new(sql).create_table()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::NodeKind;

    #[test]
    fn test_simple_table() {
        let table =
            parse_create_table("CREATE TABLE t (id INTEGER PRIMARY KEY, name VARCHAR(20) NOT NULL)")
                .unwrap();
        assert_eq!(table.name, "t");
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns.kind(), NodeKind::ColumnSpecList);

        let id = &table.columns[0];
        assert_eq!(id.name, "id");
        assert_eq!(id.type_name, "INTEGER");
        assert!(id.primary_key);
        assert!(!id.not_null);

        let name = &table.columns[1];
        assert_eq!(name.type_name, "VARCHAR");
        assert_eq!(name.precision, Some(20));
        assert_eq!(name.scale, None);
        assert!(name.not_null);
        assert!(table.constraints.is_empty());
    }

    #[test]
    fn test_check_constraint_left_associative() {
        let table = parse_create_table(
            "CREATE TABLE t (a INT, b INT, CONSTRAINT ck CHECK (a > 0 AND b < 5 OR a = b))",
        )
        .unwrap();
        assert_eq!(table.constraints.len(), 1);
        let TableConstraint::Check(check) = &table.constraints[0] else {
            panic!("expected check constraint");
        };
        assert_eq!(check.name.as_deref(), Some("ck"));
        match &check.expr {
            Expr::Binary { op, left, .. } => {
                assert_eq!(*op, BinaryOp::Or);
                assert!(matches!(**left, Expr::Binary { op: BinaryOp::And, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(check.expr.to_string(), "((a > 0) AND (b < 5)) OR (a = b)");
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let expr = Parser::new("a - b - c").expression().unwrap();
        assert_eq!(expr.to_string(), "(a - b) - c");
        let expr = Parser::new("a * b + c * d").expression().unwrap();
        assert_eq!(expr.to_string(), "(a * b) + (c * d)");
    }

    #[test]
    fn test_foreign_key_constraint() {
        let table = parse_create_table(
            "CREATE TABLE t (pid INT, \
             CONSTRAINT fk FOREIGN KEY (pid) REFERENCES p (id) ON UPDATE CASCADE)",
        )
        .unwrap();
        let TableConstraint::ForeignKey(fk) = &table.constraints[0] else {
            panic!("expected foreign key");
        };
        assert_eq!(fk.name.as_deref(), Some("fk"));
        assert_eq!(&fk.columns[..], ["pid".to_string()]);
        assert_eq!(fk.ref_table, "p");
        assert_eq!(&fk.ref_columns[..], ["id".to_string()]);
        assert_eq!(fk.on_update, ForeignKeyRule::Cascade);
        assert_eq!(fk.on_delete, ForeignKeyRule::None);
    }

    #[test]
    fn test_column_defaults() {
        let table = parse_create_table(
            "CREATE TABLE t (a INT DEFAULT -5, b TEXT DEFAULT 'x''y', \
             c TIMESTAMP DEFAULT CURRENT_TIMESTAMP, d INT DEFAULT NULL, e REAL DEFAULT (1 + 2))",
        )
        .unwrap();
        let defaults: Vec<_> = table.columns.iter().map(|c| c.default.clone()).collect();
        assert_eq!(defaults[0], Some(Expr::NumericLiteral("-5".into())));
        assert_eq!(defaults[1], Some(Expr::CharLiteral("x'y".into())));
        assert_eq!(defaults[2], Some(Expr::ColumnRef("CURRENT_TIMESTAMP".into())));
        assert_eq!(defaults[3], None);
        assert_eq!(defaults[4].as_ref().unwrap().to_string(), "1 + 2");
    }

    #[test]
    fn test_blob_default() {
        let table = parse_create_table("CREATE TABLE t (b BLOB DEFAULT X'00FF')").unwrap();
        assert_eq!(
            table.columns[0].default,
            Some(Expr::BlobLiteral("00FF".into()))
        );
    }

    #[test]
    fn test_column_constraints_any_order() {
        let table = parse_create_table(
            "CREATE TABLE t (id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT, \
             code TEXT UNIQUE DEFAULT 'a' NOT NULL COLLATE NOCASE)",
        )
        .unwrap();
        let id = &table.columns[0];
        assert!(id.not_null && id.primary_key && id.autoincrement);
        let code = &table.columns[1];
        assert_eq!(code.type_name, "TEXT");
        assert!(code.unique && code.not_null);
        assert_eq!(code.default, Some(Expr::CharLiteral("a".into())));
    }

    #[test]
    fn test_multi_word_types_and_quoted_names() {
        let table = parse_create_table(
            "CREATE TABLE IF NOT EXISTS \"Order Items\" ([Unit Price] DOUBLE PRECISION, \
             `qty` UNSIGNED BIG INT, note, amount DECIMAL(10, 2, 0))",
        )
        .unwrap();
        assert_eq!(table.name, "Order Items");
        assert_eq!(table.columns[0].name, "Unit Price");
        assert_eq!(table.columns[0].type_name, "DOUBLE PRECISION");
        assert_eq!(table.columns[1].type_name, "UNSIGNED BIG INT");
        assert_eq!(table.columns[2].type_name, "");
        assert_eq!(table.columns[3].precision, Some(10));
        assert_eq!(table.columns[3].scale, Some(2));
    }

    #[test]
    fn test_unnamed_table_constraints() {
        let table = parse_create_table(
            "CREATE TABLE t (a INT, b INT, PRIMARY KEY (a, b), UNIQUE (b), \
             FOREIGN KEY (b) REFERENCES o(id) ON DELETE SET NULL, CHECK (a IN (1, 2, 3)))",
        )
        .unwrap();
        let kinds: Vec<_> = table.constraints.iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::PrimaryKeySpec,
                NodeKind::UniqueKeySpec,
                NodeKind::ForeignKeySpec,
                NodeKind::CheckSpec
            ]
        );
        assert_eq!(&table.primary_key().unwrap().columns[..], ["a", "b"]);
        let TableConstraint::Check(check) = &table.constraints[3] else {
            panic!("expected check");
        };
        assert_eq!(check.expr.to_string(), "a IN (1, 2, 3)");
    }

    #[test]
    fn test_column_references_clause() {
        let table = parse_create_table(
            "CREATE TABLE t (pid INTEGER REFERENCES parent(id) ON DELETE CASCADE NOT NULL)",
        )
        .unwrap();
        let column = &table.columns[0];
        let fk = column.references.as_ref().unwrap();
        assert_eq!(fk.ref_table, "parent");
        assert_eq!(&fk.columns[..], ["pid"]);
        assert_eq!(fk.on_delete, ForeignKeyRule::Cascade);
        assert!(column.not_null);
    }

    #[test]
    fn test_comparison_extensions() {
        let expr = Parser::new("x IS NOT NULL AND y NOT LIKE 'a%'").expression().unwrap();
        assert_eq!(expr.to_string(), "(x IS NOT NULL) AND (y NOT LIKE 'a%')");
        let expr = Parser::new("length(code) == 3").expression().unwrap();
        assert_eq!(expr.to_string(), "length(code) = 3");
    }

    #[test]
    fn test_rendered_expression_parses_back() {
        for text in ["x > - -1", "x > -(-1)", "NOT (a = 1) OR - +b < 2", "x IN (1, -2) AND y <> 'it''s'"] {
            let expr = Parser::new(text).expression().unwrap();
            let rendered = expr.to_string();
            assert!(!rendered.contains("--"), "{} rendered as {}", text, rendered);
            let reparsed = Parser::new(&rendered).expression().unwrap();
            assert_eq!(reparsed, expr, "{} rendered as {}", text, rendered);
        }
    }

    #[test]
    fn test_non_reserved_keywords_as_column_names() {
        let table = parse_create_table(
            "CREATE TABLE settings (Key TEXT PRIMARY KEY, cascade INT, value TEXT, CHECK (key <> ''))",
        )
        .unwrap();
        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Key", "cascade", "value"]);
        assert!(table.columns[0].primary_key);

        let TableConstraint::Check(check) = &table.constraints[0] else {
            panic!("expected check constraint");
        };
        assert_eq!(check.expr.to_string(), "\"key\" <> ''");
        assert_eq!(Parser::new(&check.expr.to_string()).expression().unwrap(), check.expr);
    }

    #[test]
    fn test_reserved_keyword_column_needs_quoting() {
        assert!(parse_create_table("CREATE TABLE t (update INT)").is_err());
        let table = parse_create_table("CREATE TABLE t (\"update\" INT)").unwrap();
        assert_eq!(table.columns[0].name, "update");
    }

    #[test]
    fn test_script_with_several_statements() {
        let tables = Parser::new("CREATE TABLE a (x INT); CREATE TABLE b (y INT);")
            .create_tables()
            .unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].name, "b");
    }

    #[test]
    fn test_rejects_missing_paren() {
        let err = parse_create_table("CREATE TABLE t (a INT").unwrap_err();
        assert!(err.is_parse_error());
        assert!(matches!(err, MigrateError::Syntax { .. }));
        assert!(err.to_string().contains("expected ')'"));
    }

    #[test]
    fn test_rejects_unknown_constraint_keyword() {
        let err = parse_create_table("CREATE TABLE t (a INT, CONSTRAINT c BOGUS (a))").unwrap_err();
        assert!(matches!(err, MigrateError::Syntax { .. }));
        assert!(err.to_string().contains("UNIQUE, FOREIGN KEY, CHECK or PRIMARY KEY"));
    }

    #[test]
    fn test_rejects_dangling_operator() {
        let err = parse_create_table("CREATE TABLE t (a INT, CHECK (a >))").unwrap_err();
        assert!(matches!(err, MigrateError::Syntax { .. }));
        assert!(err.to_string().contains("expected expression"));
    }

    #[test]
    fn test_rejects_trailing_garbage() {
        let err = parse_create_table("CREATE TABLE t (a INT) extra").unwrap_err();
        assert!(err.to_string().contains("end of statement"));
    }

    #[test]
    fn test_lexical_error_propagates() {
        let err = parse_create_table("CREATE TABLE t (a INT DEFAULT 'oops)").unwrap_err();
        assert!(matches!(err, MigrateError::Lexical { .. }));
    }

    #[test]
    fn test_syntax_error_position() {
        let err = parse_create_table("CREATE TABLE (a INT)").unwrap_err();
        match err {
            MigrateError::Syntax { position, .. } => assert_eq!(position, 13),
            other => panic!("unexpected {:?}", other),
        }
    }
}
