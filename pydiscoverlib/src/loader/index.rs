//! Member index of a module body.
//!
//! Walks the syntax tree of a module statement by statement. `class` and
//! `def` statements become [`Class`] and [`Function`] entries; the bodies of
//! other compound statements (`if`, `try`, `with`, ...) belong to the
//! enclosing block. Function bodies are local scopes and are not indexed.
//!
//! Module-level assignments are bound in the module namespace in source
//! order, so a name that is assigned twice holds its last value, and `del`
//! or a later `def`/`class` of the same name removes the value binding.
//! Imports bind their local name too, and are remembered with the dotted
//! name they refer to.

use std::collections::BTreeMap;

use rustpython_parser::ast;

use super::module::{Class, Function, FunctionKind, ModuleBody, Parameter, ParameterKind};
use super::syntax::{text_of, LineIndex};
use super::value::{Value, ValueType};

type Namespace = BTreeMap<String, Value>;

#[derive(Default)]
struct Members {
    classes: Vec<Class>,
    functions: Vec<Function>,
}

/// Bare decorator name: `@functools.wraps(f)` gives `wraps`.
fn decorator_name(decorator: &str) -> &str {
    let decorator = decorator.split('(').next().unwrap_or(decorator).trim();
    decorator.rsplit('.').next().unwrap_or(decorator)
}

fn function_kind(in_class: bool, decorators: &[String]) -> FunctionKind {
    if !in_class {
        return FunctionKind::Function;
    }
    let names: Vec<&str> = decorators.iter().map(|d| decorator_name(d)).collect();
    if names.contains(&"staticmethod") {
        FunctionKind::StaticMethod
    } else if names.contains(&"classmethod") {
        FunctionKind::ClassMethod
    } else {
        FunctionKind::Method
    }
}

fn starts_with_keyword(line: &str) -> bool {
    let line = line.trim_start();
    ["def", "class", "async"].iter().any(|keyword| {
        line.strip_prefix(keyword)
            .is_some_and(|rest| rest.starts_with(char::is_whitespace))
    })
}

/// Package that relative imports of `module` start from.
fn package_of(module: &str, is_package: bool) -> &str {
    if is_package {
        module
    } else {
        module.rsplit_once('.').map_or("", |(package, _)| package)
    }
}

/// Dotted name a `from ... import` statement reads from.
///
/// `level` counts the leading dots. Returns `None` when the dots climb above
/// the top-level package.
fn import_base(package: &str, level: usize, target: Option<&str>) -> Option<String> {
    if level == 0 {
        return target.map(str::to_string);
    }
    let mut parts: Vec<&str> = package.split('.').filter(|p| !p.is_empty()).collect();
    if level - 1 > parts.len() {
        return None;
    }
    parts.truncate(parts.len() - (level - 1));
    if let Some(target) = target {
        parts.push(target);
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}

struct Indexer<'a> {
    module: &'a str,
    package: &'a str,
    source: &'a str,
    lines: LineIndex,
    namespace: Namespace,
    imports: BTreeMap<String, String>,
}

impl<'a> Indexer<'a> {
    fn text(&self, node: &impl ast::Ranged) -> String {
        text_of(self.source, node).to_string()
    }

    /// Line of the `def`/`class` keyword, below any decorators.
    fn header_line(&self, stmt: &ast::Stmt, decorators: &[ast::Expr]) -> usize {
        let start = self.lines.line_at(stmt);
        let Some(last) = decorators.last() else {
            return start;
        };
        let after = self.lines.line_of(usize::from(ast::Ranged::range(last).end()));
        self.source
            .lines()
            .enumerate()
            .skip(after)
            .find(|(_, line)| starts_with_keyword(line))
            .map_or(start, |(index, _)| index + 1)
    }

    fn qualify(owner: Option<&str>, name: &str) -> String {
        match owner {
            Some(owner) => format!("{}.{}", owner, name),
            None => name.to_string(),
        }
    }

    fn unbind(&mut self, name: &str) {
        self.namespace.remove(name);
        self.imports.remove(name);
    }

    fn bind(&mut self, name: &str, value: Value) {
        self.imports.remove(name);
        self.namespace.insert(name.to_string(), value);
    }

    /// Bind `target = value`, unpacking tuple displays element by element.
    fn bind_assignment(&mut self, target: &ast::Expr, value: &ast::Expr) {
        match (target, value) {
            (ast::Expr::Name(ast::ExprName { id, .. }), value) => {
                let value = Value::from_expr(value, self.source, &self.namespace);
                self.bind(id.as_str(), value);
            }
            (
                ast::Expr::Tuple(ast::ExprTuple { elts: targets, .. })
                | ast::Expr::List(ast::ExprList { elts: targets, .. }),
                ast::Expr::Tuple(ast::ExprTuple { elts: values, .. })
                | ast::Expr::List(ast::ExprList { elts: values, .. }),
            ) if targets.len() == values.len()
                && !targets.iter().chain(values).any(|e| matches!(e, ast::Expr::Starred(_))) =>
            {
                // Right-hand values are classified before any target is rebound
                let classified: Vec<Value> = values
                    .iter()
                    .map(|v| Value::from_expr(v, self.source, &self.namespace))
                    .collect();
                for (target, value) in targets.iter().zip(classified) {
                    self.bind_unpacked(target, value);
                }
            }
            (target, value) => {
                let opaque = Value::expr(text_of(self.source, value), ValueType::Object);
                self.bind_unpacked(target, opaque);
            }
        }
    }

    fn bind_unpacked(&mut self, target: &ast::Expr, value: Value) {
        match target {
            ast::Expr::Name(ast::ExprName { id, .. }) => self.bind(id.as_str(), value),
            ast::Expr::Tuple(ast::ExprTuple { elts, .. }) | ast::Expr::List(ast::ExprList { elts, .. }) => {
                for elt in elts {
                    self.bind_unpacked(elt, Value::expr(&value.to_string(), ValueType::Object));
                }
            }
            ast::Expr::Starred(ast::ExprStarred { value: inner, .. }) => {
                self.bind_unpacked(inner, Value::expr(&value.to_string(), ValueType::List));
            }
            // attribute and item assignments do not bind names
            _ => {}
        }
    }

    fn bind_import(&mut self, local: &str, target: String) {
        self.namespace
            .insert(local.to_string(), Value::expr(&target, ValueType::Object));
        self.imports.insert(local.to_string(), target);
    }

    fn import(&mut self, names: &[ast::Alias]) {
        for alias in names {
            let name = alias.name.as_str();
            match &alias.asname {
                Some(asname) => self.bind_import(asname.as_str(), name.to_string()),
                // `import a.b` binds `a`
                None => {
                    let head = name.split('.').next().unwrap_or(name);
                    self.bind_import(head, head.to_string());
                }
            }
        }
    }

    fn import_from(&mut self, module: Option<&str>, level: usize, names: &[ast::Alias]) {
        let Some(base) = import_base(self.package, level, module) else {
            return;
        };
        for alias in names {
            let name = alias.name.as_str();
            if name == "*" {
                continue;
            }
            let local = alias.asname.as_ref().map_or(name, |a| a.as_str());
            self.bind_import(local, format!("{}.{}", base, name));
        }
    }

    fn parameter(&self, arg: &ast::Arg, default: Option<&ast::Expr>, kind: ParameterKind) -> Parameter {
        Parameter {
            name: arg.arg.as_str().to_string(),
            hint: arg.annotation.as_deref().map(|hint| self.text(hint)),
            default: default.map(|value| self.text(value)),
            kind,
        }
    }

    fn parameters(&self, args: &ast::Arguments) -> Vec<Parameter> {
        let mut parameters: Vec<Parameter> = args
            .posonlyargs
            .iter()
            .chain(&args.args)
            .map(|a| self.parameter(&a.def, a.default.as_deref(), ParameterKind::Positional))
            .collect();
        if let Some(vararg) = args.vararg.as_deref() {
            parameters.push(self.parameter(vararg, None, ParameterKind::VarPositional));
        }
        parameters.extend(
            args.kwonlyargs
                .iter()
                .map(|a| self.parameter(&a.def, a.default.as_deref(), ParameterKind::KeywordOnly)),
        );
        if let Some(kwarg) = args.kwarg.as_deref() {
            parameters.push(self.parameter(kwarg, None, ParameterKind::VarKeyword));
        }
        parameters
    }

    #[allow(clippy::too_many_arguments)]
    fn function(
        &self,
        stmt: &ast::Stmt,
        owner: Option<&str>,
        name: &ast::Identifier,
        args: &ast::Arguments,
        returns: Option<&ast::Expr>,
        decorator_list: &[ast::Expr],
        is_async: bool,
    ) -> Function {
        let decorators: Vec<String> = decorator_list.iter().map(|d| self.text(d)).collect();
        Function {
            name: name.as_str().to_string(),
            module: self.module.to_string(),
            owner: owner.map(str::to_string),
            parameters: self.parameters(args),
            returns: returns.map(|r| self.text(r)),
            kind: function_kind(owner.is_some(), &decorators),
            is_async,
            decorators,
            line: self.header_line(stmt, decorator_list),
        }
    }

    fn class(&mut self, stmt: &ast::Stmt, class_def: &ast::StmtClassDef, owner: Option<&str>) -> Class {
        let name = class_def.name.as_str();
        let qualname = Self::qualify(owner, name);

        let mut nested = Members::default();
        self.index_block(&class_def.body, Some(qualname.as_str()), &mut nested, false);

        Class {
            name: name.to_string(),
            module: self.module.to_string(),
            bases: class_def
                .bases
                .iter()
                .filter(|base| !matches!(base, ast::Expr::Starred(_)))
                .map(|base| self.text(base))
                .collect(),
            decorators: class_def.decorator_list.iter().map(|d| self.text(d)).collect(),
            line: self.header_line(stmt, &class_def.decorator_list),
            qualname,
            classes: nested.classes,
            functions: nested.functions,
        }
    }

    /// Index one block. `binds` is set for blocks that run in the module
    /// namespace.
    fn index_block(&mut self, body: &[ast::Stmt], owner: Option<&str>, members: &mut Members, binds: bool) {
        for stmt in body {
            match stmt {
                ast::Stmt::FunctionDef(def) => {
                    let function = self.function(
                        stmt,
                        owner,
                        &def.name,
                        &def.args,
                        def.returns.as_deref(),
                        &def.decorator_list,
                        false,
                    );
                    if binds {
                        self.unbind(&function.name);
                    }
                    members.functions.push(function);
                }
                ast::Stmt::AsyncFunctionDef(def) => {
                    let function = self.function(
                        stmt,
                        owner,
                        &def.name,
                        &def.args,
                        def.returns.as_deref(),
                        &def.decorator_list,
                        true,
                    );
                    if binds {
                        self.unbind(&function.name);
                    }
                    members.functions.push(function);
                }
                ast::Stmt::ClassDef(class_def) => {
                    let class = self.class(stmt, class_def, owner);
                    if binds {
                        self.unbind(&class.name);
                    }
                    members.classes.push(class);
                }
                ast::Stmt::Assign(ast::StmtAssign { targets, value, .. }) if binds => {
                    for target in targets {
                        self.bind_assignment(target, value);
                    }
                }
                ast::Stmt::AnnAssign(ast::StmtAnnAssign {
                    target,
                    value: Some(value),
                    ..
                }) if binds => self.bind_assignment(target, value),
                ast::Stmt::Delete(ast::StmtDelete { targets, .. }) if binds => {
                    for target in targets {
                        if let ast::Expr::Name(ast::ExprName { id, .. }) = target {
                            self.unbind(id.as_str());
                        }
                    }
                }
                ast::Stmt::Import(ast::StmtImport { names, .. }) if binds => self.import(names),
                ast::Stmt::ImportFrom(ast::StmtImportFrom {
                    module, names, level, ..
                }) if binds => {
                    let level = level.as_ref().map_or(0, |l| l.to_u32() as usize);
                    self.import_from(module.as_ref().map(|m| m.as_str()), level, names);
                }
                ast::Stmt::If(ast::StmtIf { body, orelse, .. })
                | ast::Stmt::For(ast::StmtFor { body, orelse, .. })
                | ast::Stmt::AsyncFor(ast::StmtAsyncFor { body, orelse, .. })
                | ast::Stmt::While(ast::StmtWhile { body, orelse, .. }) => {
                    self.index_block(body, owner, members, binds);
                    self.index_block(orelse, owner, members, binds);
                }
                ast::Stmt::With(ast::StmtWith { body, .. })
                | ast::Stmt::AsyncWith(ast::StmtAsyncWith { body, .. }) => {
                    self.index_block(body, owner, members, binds);
                }
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
                    self.index_block(body, owner, members, binds);
                    for handler in handlers {
                        let ast::ExceptHandler::ExceptHandler(handler) = handler;
                        self.index_block(&handler.body, owner, members, binds);
                    }
                    self.index_block(orelse, owner, members, binds);
                    self.index_block(finalbody, owner, members, binds);
                }
                ast::Stmt::Match(ast::StmtMatch { cases, .. }) => {
                    for case in cases {
                        self.index_block(&case.body, owner, members, binds);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Index the members of a parsed module.
///
/// `is_package` tells whether the module is a package `__init__`, which
/// moves the starting point of relative imports.
pub(crate) fn index_module(module: &str, is_package: bool, source: &str, suite: &[ast::Stmt]) -> ModuleBody {
    let mut indexer = Indexer {
        module,
        package: package_of(module, is_package),
        source,
        lines: LineIndex::new(source),
        namespace: Namespace::new(),
        imports: BTreeMap::new(),
    };
    let mut members = Members::default();
    indexer.index_block(suite, None, &mut members, true);

    ModuleBody {
        classes: members.classes,
        functions: members.functions,
        namespace: indexer.namespace,
        imports: indexer.imports,
    }
}
