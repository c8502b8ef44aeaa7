//! Table and JSON rendering for CLI output

use std::path::{Component, Path, PathBuf};

use console::Style;
use pydiscoverlib::{Attribute, Class, Function, Module, Parameter, ParameterKind};
use serde::Serialize;

/// Widest a column may get before its cells are truncated
const MAX_COLUMN_WIDTH: usize = 60;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_name(name: &str) -> Self {
        match name {
            "json" => OutputMode::Json,
            _ => OutputMode::Table,
        }
    }
}

/// Results of one command, as table rows plus the raw data for JSON.
#[derive(Debug)]
pub struct Listing {
    /// Plural noun for the total line, e.g. "classes"
    pub noun: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub data: serde_json::Value,
}

impl Listing {
    fn new<T: Serialize>(
        noun: &'static str,
        headers: Vec<&'static str>,
        rows: Vec<Vec<String>>,
        data: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            noun,
            headers,
            rows,
            data: serde_json::to_value(data)?,
        })
    }

    pub fn render(&self, mode: OutputMode) -> serde_json::Result<String> {
        match mode {
            OutputMode::Json => Ok(serde_json::to_string_pretty(&self.data)? + "\n"),
            OutputMode::Table => Ok(self.render_table()),
        }
    }

    fn render_table(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count()).min(MAX_COLUMN_WIDTH);
            }
        }

        let header_style = Style::new().bold();
        let separator = "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1));
        let mut out = String::new();

        let header: Vec<String> = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| header_style.apply_to(format!("{:<width$}", h, width = *w)).to_string())
            .collect();
        out.push_str(header.join("  ").trim_end());
        out.push('\n');
        out.push_str(&separator);
        out.push('\n');

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<width$}", truncate_name(cell, *w), width = *w))
                .collect();
            out.push_str(cells.join("  ").trim_end());
            out.push('\n');
        }

        out.push_str(&separator);
        out.push('\n');
        out.push_str(&format!("Total ({} {})\n", self.rows.len(), self.noun));
        out
    }
}

/// Truncate a name to fit within max_len, adding ".." prefix if needed
fn truncate_name(name: &str, max_len: usize) -> String {
    let count = name.chars().count();
    if count > max_len && max_len > 2 {
        let tail: String = name.chars().skip(count - max_len + 2).collect();
        format!("..{}", tail)
    } else {
        name.to_string()
    }
}

/// Convert a path to a relative path from the base directory.
fn make_relative(path: &Path, base: &Path) -> String {
    let plain: PathBuf = base
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    path.strip_prefix(base)
        .or_else(|_| path.strip_prefix(&plain))
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string())
}

fn describe_parameter(parameter: &Parameter) -> String {
    let prefix = match parameter.kind {
        ParameterKind::VarPositional => "*",
        ParameterKind::VarKeyword => "**",
        ParameterKind::Positional | ParameterKind::KeywordOnly => "",
    };
    let mut text = format!("{}{}", prefix, parameter.name);
    if let Some(hint) = &parameter.hint {
        text.push_str(&format!(": {}", hint));
    }
    if let Some(default) = &parameter.default {
        text.push_str(&format!(" = {}", default));
    }
    text
}

/// Signature as written, e.g. `(x: int, y: float) -> str`.
fn describe_signature(function: &Function) -> String {
    let parameters: Vec<String> = function.call_parameters().iter().map(describe_parameter).collect();
    match &function.returns {
        Some(returns) => format!("({}) -> {}", parameters.join(", "), returns),
        None => format!("({})", parameters.join(", ")),
    }
}

pub fn paths_listing(paths: &[PathBuf], base: &Path) -> serde_json::Result<Listing> {
    let rows = paths.iter().map(|p| vec![make_relative(p, base)]).collect();
    Listing::new("paths", vec!["Path"], rows, &paths)
}

pub fn names_listing(noun: &'static str, header: &'static str, names: &[String]) -> serde_json::Result<Listing> {
    let rows = names.iter().map(|n| vec![n.clone()]).collect();
    Listing::new(noun, vec![header], rows, &names)
}

#[derive(Serialize)]
struct ModuleRecord<'a> {
    name: &'a str,
    path: &'a Path,
    classes: usize,
    functions: usize,
}

pub fn modules_listing(modules: &[Module], base: &Path) -> serde_json::Result<Listing> {
    let rows = modules
        .iter()
        .map(|m| vec![m.name().to_string(), make_relative(m.path(), base)])
        .collect();
    let records: Vec<ModuleRecord> = modules
        .iter()
        .map(|m| ModuleRecord {
            name: m.name(),
            path: m.path(),
            classes: m.classes().len(),
            functions: m.functions().len(),
        })
        .collect();
    Listing::new("modules", vec!["Module", "Path"], rows, &records)
}

pub fn classes_listing(classes: &[Class]) -> serde_json::Result<Listing> {
    let rows = classes
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.module.clone(),
                c.bases.join(", "),
                c.line.to_string(),
            ]
        })
        .collect();
    Listing::new("classes", vec!["Class", "Module", "Bases", "Line"], rows, &classes)
}

pub fn functions_listing(functions: &[Function]) -> serde_json::Result<Listing> {
    let rows = functions
        .iter()
        .map(|f| {
            vec![
                f.qualname(),
                f.module.clone(),
                describe_signature(f),
                f.line.to_string(),
            ]
        })
        .collect();
    Listing::new(
        "functions",
        vec!["Function", "Module", "Signature", "Line"],
        rows,
        &functions,
    )
}

pub fn attributes_listing(attributes: &[Attribute]) -> serde_json::Result<Listing> {
    let rows = attributes
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                a.declared_type.to_string(),
                a.assigned_value.clone(),
                a.module.as_ref().map(|m| m.name().to_string()).unwrap_or_default(),
                a.line_nr.to_string(),
                a.comment.clone().unwrap_or_default(),
            ]
        })
        .collect();
    Listing::new(
        "attributes",
        vec!["Attribute", "Type", "Value", "Module", "Line", "Comment"],
        rows,
        &attributes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Listing {
        Listing::new(
            "classes",
            vec!["Class", "Module"],
            vec![
                vec!["Plugin".to_string(), "app.plugins".to_string()],
                vec!["Mp3Plugin".to_string(), "app.plugins.audio".to_string()],
            ],
            &vec!["Plugin", "Mp3Plugin"],
        )
        .unwrap()
    }

    #[test]
    fn test_table_output() {
        console::set_colors_enabled(false);
        let table = listing().render(OutputMode::Table).unwrap();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Class      Module");
        assert_eq!(lines[2], "Plugin     app.plugins");
        assert_eq!(lines[3], "Mp3Plugin  app.plugins.audio");
        assert_eq!(lines[5], "Total (2 classes)");
    }

    #[test]
    fn test_json_output() {
        let json = listing().render(OutputMode::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed[1], "Mp3Plugin");
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("short", 10), "short");
        assert_eq!(truncate_name("a.very.long.module", 10), "..g.module");
    }

    #[test]
    fn test_make_relative_with_current_dir_base() {
        let path = Path::new("pkg/sub/a.py");

        assert_eq!(make_relative(path, Path::new("./pkg")), "sub/a.py");
        assert_eq!(make_relative(path, Path::new("pkg/")), "sub/a.py");
        assert_eq!(make_relative(path, Path::new("other")), "pkg/sub/a.py");
    }

    #[test]
    fn test_describe_signature() {
        let module = Module::from_source(
            "app.util",
            "def merge(a: dict, *rest, strict: bool = False, **extra) -> dict:\n    pass\n",
        )
        .unwrap();

        assert_eq!(
            describe_signature(&module.functions()[0]),
            "(a: dict, *rest, strict: bool = False, **extra) -> dict"
        );
    }
}
