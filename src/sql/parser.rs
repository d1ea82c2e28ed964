//! Recursive-descent parser for the four supported verbs.
//!
//! The grammar is deliberately closed: every token must be accounted for, so
//! joins, OR conditions, subqueries, and literal operands fail at parse time
//! instead of producing a partial result.

use super::ast::{Assignment, Condition, Statement};
use super::lexer::{tokenize, Token};
use crate::store::SortOrder;

pub fn parse(sql: &str) -> Result<Statement, String> {
    let tokens = tokenize(sql)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.statement()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn statement(&mut self) -> Result<Statement, String> {
        let verb = match self.peek() {
            Some(Token::Ident(s)) => s.to_ascii_lowercase(),
            Some(other) => return Err(format!("expected a statement verb, found {}", other.describe())),
            None => return Err("empty statement".to_string()),
        };

        match verb.as_str() {
            "select" => self.select(),
            "insert" => self.insert(),
            "update" => self.update(),
            "delete" => self.delete(),
            "begin" => self.transaction_keyword(Statement::Begin),
            "commit" => self.transaction_keyword(Statement::Commit),
            "rollback" => self.transaction_keyword(Statement::Rollback),
            other => Err(format!("unsupported statement verb '{}'", other)),
        }
    }

    fn select(&mut self) -> Result<Statement, String> {
        self.advance(); // SELECT
        self.select_list()?;
        self.expect_keyword("from")?;
        let table = self.identifier("table name after FROM")?;
        let filter = self.where_clause()?;
        let order_by = self.order_by_clause()?;
        let limit = self.limit_clause()?;
        self.finish()?;

        Ok(Statement::Select {
            table,
            filter,
            order_by,
            limit,
        })
    }

    fn insert(&mut self) -> Result<Statement, String> {
        self.advance(); // INSERT
        self.expect_keyword("into")?;
        let table = self.identifier("table name after INTO")?;

        // Column lists and VALUES are ignored; the inserted document is the
        // first positional parameter.
        self.pos = self.tokens.len();

        Ok(Statement::Insert { table })
    }

    fn update(&mut self) -> Result<Statement, String> {
        self.advance(); // UPDATE
        let table = self.identifier("table name after UPDATE")?;
        self.expect_keyword("set")?;
        let assignments = self.assignments()?;
        let filter = self.where_clause()?;
        self.finish()?;

        Ok(Statement::Update {
            table,
            assignments,
            filter,
        })
    }

    fn delete(&mut self) -> Result<Statement, String> {
        self.advance(); // DELETE
        self.expect_keyword("from")?;
        let table = self.identifier("table name after FROM")?;
        let filter = self.where_clause()?;
        self.finish()?;

        Ok(Statement::Delete { table, filter })
    }

    fn transaction_keyword(&mut self, statement: Statement) -> Result<Statement, String> {
        self.advance();
        self.finish()?;
        Ok(statement)
    }

    /// `*` or a comma-separated list of column names. The list itself is
    /// discarded: documents are returned whole.
    fn select_list(&mut self) -> Result<(), String> {
        if matches!(self.peek(), Some(Token::Star)) {
            self.advance();
            return Ok(());
        }

        loop {
            self.identifier("column name in select list")?;
            if matches!(self.peek(), Some(Token::Comma)) {
                self.advance();
            } else {
                return Ok(());
            }
        }
    }

    /// `WHERE field = $N (AND field = $N)*`, or nothing (matches all rows).
    fn where_clause(&mut self) -> Result<Vec<Condition>, String> {
        if !self.eat_keyword("where") {
            return Ok(Vec::new());
        }

        let mut conditions = Vec::new();
        loop {
            let field = self.identifier("field name in WHERE clause")?;
            self.expect_token(Token::Equals, "'=' in WHERE condition")?;
            let param = self.parameter("parameter after '=' in WHERE clause")?;
            conditions.push(Condition { field, param });

            if self.eat_keyword("and") {
                continue;
            }
            return Ok(conditions);
        }
    }

    fn assignments(&mut self) -> Result<Vec<Assignment>, String> {
        let mut assignments = Vec::new();
        loop {
            let field = self.identifier("field name in SET clause")?;
            self.expect_token(Token::Equals, "'=' in SET assignment")?;
            let param = self.parameter("parameter after '=' in SET clause")?;
            assignments.push(Assignment { field, param });

            if matches!(self.peek(), Some(Token::Comma)) {
                self.advance();
                continue;
            }
            return Ok(assignments);
        }
    }

    fn order_by_clause(&mut self) -> Result<Option<(String, SortOrder)>, String> {
        if !self.eat_keyword("order") {
            return Ok(None);
        }
        self.expect_keyword("by")?;
        let field = self.identifier("field name after ORDER BY")?;

        let order = if self.eat_keyword("desc") {
            SortOrder::Desc
        } else {
            self.eat_keyword("asc");
            SortOrder::Asc
        };

        Ok(Some((field, order)))
    }

    fn limit_clause(&mut self) -> Result<Option<u64>, String> {
        if !self.eat_keyword("limit") {
            return Ok(None);
        }
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Some(n))
            }
            Some(other) => Err(format!("expected a number after LIMIT, found {}", other.describe())),
            None => Err("expected a number after LIMIT".to_string()),
        }
    }

    /// Optional trailing semicolon, then end of input.
    fn finish(&mut self) -> Result<(), String> {
        if matches!(self.peek(), Some(Token::Semicolon)) {
            self.advance();
        }
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(format!("unexpected trailing {}", token.describe())),
        }
    }

    fn identifier(&mut self, expected: &str) -> Result<String, String> {
        match self.peek().cloned() {
            Some(Token::Ident(s)) => {
                self.advance();
                Ok(s)
            }
            Some(other) => Err(format!("expected {}, found {}", expected, other.describe())),
            None => Err(format!("expected {}, found end of statement", expected)),
        }
    }

    fn parameter(&mut self, expected: &str) -> Result<usize, String> {
        match self.peek().cloned() {
            Some(Token::Param(n)) => {
                self.advance();
                Ok(n)
            }
            Some(other) => Err(format!(
                "expected {}, found {} (only positional '$N' operands are supported)",
                expected,
                other.describe()
            )),
            None => Err(format!("expected {}, found end of statement", expected)),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), String> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            match self.peek() {
                Some(token) => Err(format!(
                    "expected {}, found {}",
                    keyword.to_ascii_uppercase(),
                    token.describe()
                )),
                None => Err(format!(
                    "expected {}, found end of statement",
                    keyword.to_ascii_uppercase()
                )),
            }
        }
    }

    fn expect_token(&mut self, token: Token, expected: &str) -> Result<(), String> {
        match self.peek() {
            Some(t) if *t == token => {
                self.advance();
                Ok(())
            }
            Some(other) => Err(format!("expected {}, found {}", expected, other.describe())),
            None => Err(format!("expected {}, found end of statement", expected)),
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(token) if token.is_keyword(keyword)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}
