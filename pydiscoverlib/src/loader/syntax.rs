//! Parsing module sources.
//!
//! Sources are parsed with `rustpython-parser`. The parser accepts a few
//! statements that CPython rejects when compiling (`return` at module level,
//! `break` outside a loop), so a scope pass over the tree follows.

use rustpython_parser::ast::{self, Ranged};
use rustpython_parser::{Parse, ParseError};

use crate::error::DiscoverError;
use crate::Result;

/// Maps byte offsets of a source to 1-based line numbers.
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(at, _)| at + 1));
        Self { starts }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(index) => index + 1,
            Err(index) => index,
        }
    }

    /// Line of the start of a node.
    pub fn line_at(&self, node: &impl Ranged) -> usize {
        self.line_of(usize::from(node.range().start()))
    }
}

/// Source text of a node, trimmed.
pub(crate) fn text_of<'a>(source: &'a str, node: &impl Ranged) -> &'a str {
    let range = node.range();
    source
        .get(usize::from(range.start())..usize::from(range.end()))
        .unwrap_or_default()
        .trim()
}

fn syntax_error(line: usize, message: impl Into<String>) -> DiscoverError {
    DiscoverError::Syntax {
        line,
        message: message.into(),
    }
}

fn from_parse_error(error: ParseError, lines: &LineIndex) -> DiscoverError {
    syntax_error(lines.line_of(usize::from(error.offset)), error.error.to_string())
}

#[derive(Clone, Copy, Default)]
struct Scope {
    in_function: bool,
    in_loop: bool,
}

fn check_expression_statement(value: &ast::Expr, scope: Scope, lines: &LineIndex) -> Result<()> {
    match value {
        ast::Expr::Yield(_) | ast::Expr::YieldFrom(_) if !scope.in_function => {
            Err(syntax_error(lines.line_at(value), "'yield' outside function"))
        }
        ast::Expr::Await(_) if !scope.in_function => {
            Err(syntax_error(lines.line_at(value), "'await' outside function"))
        }
        _ => Ok(()),
    }
}

fn check_block(body: &[ast::Stmt], scope: Scope, lines: &LineIndex) -> Result<()> {
    for stmt in body {
        check_statement(stmt, scope, lines)?;
    }
    Ok(())
}

fn check_statement(stmt: &ast::Stmt, scope: Scope, lines: &LineIndex) -> Result<()> {
    let function = Scope {
        in_function: true,
        in_loop: false,
    };
    let in_loop = Scope {
        in_loop: true,
        ..scope
    };

    match stmt {
        ast::Stmt::Return(_) if !scope.in_function => {
            Err(syntax_error(lines.line_at(stmt), "'return' outside function"))
        }
        ast::Stmt::Break(_) if !scope.in_loop => {
            Err(syntax_error(lines.line_at(stmt), "'break' outside loop"))
        }
        ast::Stmt::Continue(_) if !scope.in_loop => {
            Err(syntax_error(lines.line_at(stmt), "'continue' not properly in loop"))
        }
        ast::Stmt::Expr(ast::StmtExpr { value, .. }) => check_expression_statement(value, scope, lines),
        ast::Stmt::FunctionDef(ast::StmtFunctionDef { body, .. })
        | ast::Stmt::AsyncFunctionDef(ast::StmtAsyncFunctionDef { body, .. }) => {
            check_block(body, function, lines)
        }
        ast::Stmt::ClassDef(ast::StmtClassDef { body, .. }) => check_block(body, Scope::default(), lines),
        ast::Stmt::For(ast::StmtFor { body, orelse, .. })
        | ast::Stmt::AsyncFor(ast::StmtAsyncFor { body, orelse, .. })
        | ast::Stmt::While(ast::StmtWhile { body, orelse, .. }) => {
            check_block(body, in_loop, lines)?;
            check_block(orelse, scope, lines)
        }
        ast::Stmt::If(ast::StmtIf { body, orelse, .. }) => {
            check_block(body, scope, lines)?;
            check_block(orelse, scope, lines)
        }
        ast::Stmt::With(ast::StmtWith { body, .. })
        | ast::Stmt::AsyncWith(ast::StmtAsyncWith { body, .. }) => check_block(body, scope, lines),
        ast::Stmt::Try(ast::StmtTry {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        })
        | ast::Stmt::TryStar(ast::StmtTryStar {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        }) => {
            check_block(body, scope, lines)?;
            for handler in handlers {
                let ast::ExceptHandler::ExceptHandler(handler) = handler;
                check_block(&handler.body, scope, lines)?;
            }
            check_block(orelse, scope, lines)?;
            check_block(finalbody, scope, lines)
        }
        ast::Stmt::Match(ast::StmtMatch { cases, .. }) => {
            for case in cases {
                check_block(&case.body, scope, lines)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Parse a module and check statement placement.
///
/// `path` only labels parser diagnostics.
pub(crate) fn parse_module(source: &str, path: &str) -> Result<ast::Suite> {
    let lines = LineIndex::new(source);
    let suite = ast::Suite::parse(source, path).map_err(|e| from_parse_error(e, &lines))?;
    check_block(&suite, Scope::default(), &lines)?;
    Ok(suite)
}

/// Parse a single expression, as found on the right of an assignment.
pub(crate) fn parse_expression(text: &str) -> Option<ast::Expr> {
    ast::Expr::parse(text, "<expression>").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_line(source: &str) -> usize {
        match parse_module(source, "<test>") {
            Err(DiscoverError::Syntax { line, .. }) => line,
            other => panic!("Expected syntax error, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_valid_module() {
        let suite = parse_module("import os\n\nclass A:\n    def f(self):\n        return 1\n", "<test>").unwrap();

        assert_eq!(suite.len(), 2);
    }

    #[test]
    fn test_grammar_errors() {
        assert_eq!(error_line("x = = 1\n"), 1);
        assert_eq!(error_line("A = 1\nprint \"hello\"\n"), 2);
        assert_eq!(error_line("def f(x y):\n    pass\n"), 1);
        assert_eq!(error_line("def broken(x, y)\n    return x\n"), 1);
        assert_eq!(error_line("s = 'unterminated\n"), 1);
    }

    #[test]
    fn test_incomplete_sources() {
        assert!(parse_module("    x = 1\n", "<test>").is_err());
        assert!(parse_module("if x:\nA = 1\n", "<test>").is_err());
        assert!(parse_module("items = [1, 2\n", "<test>").is_err());
    }

    #[test]
    fn test_statements_out_of_place() {
        assert_eq!(error_line("A = 1\nreturn 5\n"), 2);
        assert_eq!(error_line("break\n"), 1);
        assert_eq!(error_line("def f():\n    continue\n"), 2);
        assert_eq!(error_line("class C:\n    yield 1\n"), 2);
        assert_eq!(error_line("for x in y:\n    def g():\n        break\n"), 3);
    }

    #[test]
    fn test_statements_in_place() {
        let source = "def f():\n    for x in y:\n        if x:\n            break\n        continue\n    yield 1\n    return 2\n\nwhile True:\n    break\n";

        assert!(parse_module(source, "<test>").is_ok());
    }

    #[test]
    fn test_line_index() {
        let lines = LineIndex::new("a\nbc\n\nd");

        assert_eq!(lines.line_of(0), 1);
        assert_eq!(lines.line_of(2), 2);
        assert_eq!(lines.line_of(3), 2);
        assert_eq!(lines.line_of(5), 3);
        assert_eq!(lines.line_of(6), 4);
    }

    #[test]
    fn test_parse_expression() {
        assert!(parse_expression("[1, 2]").is_some());
        assert!(parse_expression("x = 1").is_none());
    }
}
