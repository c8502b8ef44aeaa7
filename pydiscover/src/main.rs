//! # pydiscover
//!
//! A CLI tool for discovering what a Python source tree defines.
//!
//! ## Overview
//!
//! pydiscover is built on top of pydiscoverlib and lists the packages,
//! modules, classes, functions and module attributes below a package
//! directory. Nothing is executed: modules are read and indexed.
//!
//! ## Usage
//!
//! ```bash
//! # Packages and modules of a package tree
//! pydiscover packages src/plugins
//! pydiscover modules src/plugins --include-privates
//!
//! # Every subclass of Plugin, except the abstract ones
//! pydiscover classes src/plugins --signature Plugin --exclude AbstractPlugin
//!
//! # Functions callable as (int, float) -> str
//! pydiscover functions src/plugins --signature "(int, float) -> str"
//!
//! # Integer settings, as JSON
//! pydiscover attributes src/settings --signature int --output json
//!
//! # Files matching a glob
//! pydiscover paths src --pattern "**/*.py"
//! ```

mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use pydiscoverlib::{
    AttributeQuery, ClassQuery, ClassSignature, DiscoverOptions, Discovery, Exclude, Exclusion,
    FunctionQuery, FunctionSignature, ValueSignature,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use render::{Listing, OutputMode};

fn dir_arg() -> Arg {
    Arg::new("dir")
        .help("Package directory to discover in")
        .required(true)
}

fn include_privates_arg() -> Arg {
    Arg::new("include-privates")
        .long("include-privates")
        .action(ArgAction::SetTrue)
        .help("Include names starting with an underscore")
}

fn member_args(signature_help: &'static str) -> [Arg; 4] {
    [
        include_privates_arg(),
        Arg::new("in-private-modules")
            .long("in-private-modules")
            .action(ArgAction::SetTrue)
            .help("Also look into modules whose name starts with an underscore"),
        Arg::new("raise-on-fail")
            .long("raise-on-fail")
            .action(ArgAction::SetTrue)
            .help("Fail when a module cannot be loaded instead of skipping it"),
        Arg::new("signature")
            .short('s')
            .long("signature")
            .help(signature_help),
    ]
}

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("pydiscover")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Arthur Debert")
        .about("Discover packages, modules, classes, functions and attributes in Python sources")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .global(true)
                .default_value("table")
                .value_parser(["table", "json"])
                .help("Output format"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Log more (-v for debug, -vv for trace); RUST_LOG takes precedence"),
        )
        .subcommand(
            Command::new("paths")
                .about("List files below a directory that match a glob pattern")
                .arg(Arg::new("dir").help("Directory to search").required(true))
                .arg(
                    Arg::new("pattern")
                        .short('p')
                        .long("pattern")
                        .default_value("**/*.py")
                        .help("Glob pattern relative to the directory"),
                ),
        )
        .subcommand(
            Command::new("packages")
                .about("List the packages of a package tree")
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("modules")
                .about("List and load the modules of a package tree")
                .arg(dir_arg())
                .arg(include_privates_arg())
                .arg(
                    Arg::new("raise-on-fail")
                        .long("raise-on-fail")
                        .action(ArgAction::SetTrue)
                        .help("Fail when a module cannot be loaded instead of skipping it"),
                )
                .arg(
                    Arg::new("names-only")
                        .long("names-only")
                        .action(ArgAction::SetTrue)
                        .help("Only list module names, without loading the modules"),
                ),
        )
        .subcommand(
            Command::new("classes")
                .about("List classes")
                .arg(dir_arg())
                .args(member_args("Only subclasses of this class (e.g. Plugin)"))
                .arg(
                    Arg::new("exclude")
                        .short('e')
                        .long("exclude")
                        .action(ArgAction::Append)
                        .help("Leave out classes with this name (can be specified multiple times)"),
                ),
        )
        .subcommand(
            Command::new("functions")
                .about("List module-level functions")
                .arg(dir_arg())
                .args(member_args("Only functions callable like this (e.g. \"(int, float) -> str\")")),
        )
        .subcommand(
            Command::new("attributes")
                .about("List module-level attributes")
                .arg(dir_arg())
                .args(member_args("Only attributes whose value has this type (e.g. int, Optional[str])")),
        )
}

/// Install the stderr log subscriber.
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dir_of(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<String>("dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Base for relative paths in table output.
fn display_base(dir: &Path) -> PathBuf {
    std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

/// Extract the shared switches from matches
fn extract_options(matches: &ArgMatches) -> DiscoverOptions {
    DiscoverOptions::new()
        .include_privates(matches.get_flag("include-privates"))
        .in_private_modules(matches.get_flag("in-private-modules"))
        .raise_on_fail(matches.get_flag("raise-on-fail"))
}

fn signature_text(matches: &ArgMatches) -> &str {
    matches
        .get_one::<String>("signature")
        .map(|s| s.as_str())
        .unwrap_or("")
}

fn paths_handler(matches: &ArgMatches, discovery: &mut Discovery) -> anyhow::Result<Listing> {
    let dir = dir_of(matches);
    let pattern = matches
        .get_one::<String>("pattern")
        .map(|s| s.as_str())
        .unwrap_or("**/*.py");

    let paths = discovery.discover_paths(&dir, pattern)?;
    Ok(render::paths_listing(&paths, &dir)?)
}

fn packages_handler(matches: &ArgMatches, discovery: &mut Discovery) -> anyhow::Result<Listing> {
    let packages = discovery.discover_packages(dir_of(matches))?;
    Ok(render::names_listing("packages", "Package", &packages)?)
}

fn modules_handler(matches: &ArgMatches, discovery: &mut Discovery) -> anyhow::Result<Listing> {
    let dir = dir_of(matches);
    let include_privates = matches.get_flag("include-privates");

    if matches.get_flag("names-only") {
        let names = discovery.discover_module_names(&dir, include_privates)?;
        return Ok(render::names_listing("modules", "Module", &names)?);
    }

    let modules =
        discovery.discover_modules(&dir, include_privates, matches.get_flag("raise-on-fail"))?;
    Ok(render::modules_listing(&modules, &display_base(&dir))?)
}

fn classes_handler(matches: &ArgMatches, discovery: &mut Discovery) -> anyhow::Result<Listing> {
    let signature: ClassSignature = signature_text(matches)
        .parse()
        .context("invalid --signature")?;
    let excluded: Vec<String> = matches
        .get_many::<String>("exclude")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    let exclude: Exclude = excluded
        .into_iter()
        .map(|name| Exclusion::predicate(move |class| class.name == name))
        .collect();

    let query = ClassQuery::new()
        .options(extract_options(matches))
        .signature(signature)
        .exclude(exclude);
    let classes = discovery.discover_classes(dir_of(matches), &query)?;
    Ok(render::classes_listing(&classes)?)
}

fn functions_handler(matches: &ArgMatches, discovery: &mut Discovery) -> anyhow::Result<Listing> {
    let signature: FunctionSignature = signature_text(matches)
        .parse()
        .context("invalid --signature")?;

    let query = FunctionQuery::new()
        .options(extract_options(matches))
        .signature(signature);
    let functions = discovery.discover_functions(dir_of(matches), &query)?;
    Ok(render::functions_listing(&functions)?)
}

fn attributes_handler(matches: &ArgMatches, discovery: &mut Discovery) -> anyhow::Result<Listing> {
    let signature: ValueSignature = signature_text(matches)
        .parse()
        .context("invalid --signature")?;

    let query = AttributeQuery::new()
        .options(extract_options(matches))
        .signature(signature);
    let attributes = discovery.discover_attributes(dir_of(matches), &query)?;
    Ok(render::attributes_listing(&attributes)?)
}

fn run(matches: &ArgMatches) -> anyhow::Result<String> {
    let mode = OutputMode::from_name(
        matches
            .get_one::<String>("output")
            .map(|s| s.as_str())
            .unwrap_or("table"),
    );
    let mut discovery = Discovery::new();

    let listing = match matches.subcommand() {
        Some(("paths", sub)) => paths_handler(sub, &mut discovery)?,
        Some(("packages", sub)) => packages_handler(sub, &mut discovery)?,
        Some(("modules", sub)) => modules_handler(sub, &mut discovery)?,
        Some(("classes", sub)) => classes_handler(sub, &mut discovery)?,
        Some(("functions", sub)) => functions_handler(sub, &mut discovery)?,
        Some(("attributes", sub)) => attributes_handler(sub, &mut discovery)?,
        Some((other, _)) => return Err(anyhow!("unknown command: {}", other)),
        None => return Err(anyhow!("no command given")),
    };
    debug!(
        found = listing.rows.len(),
        modules = discovery.loaded_modules().count(),
        "discovery finished"
    );

    Ok(listing.render(mode)?)
}

fn main() -> ExitCode {
    let matches = build_command().get_matches();
    init_tracing(matches.get_count("verbose"));

    match run(&matches) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_valid() {
        build_command().debug_assert();
    }

    #[test]
    fn test_member_flags() {
        let matches = build_command().get_matches_from([
            "pydiscover",
            "classes",
            "src",
            "--include-privates",
            "--exclude",
            "A",
            "--exclude",
            "B",
            "--output",
            "json",
        ]);
        let (name, sub) = matches.subcommand().unwrap();
        let options = extract_options(sub);

        assert_eq!(name, "classes");
        assert!(options.include_privates);
        assert!(!options.in_private_modules);
        assert_eq!(sub.get_many::<String>("exclude").unwrap().count(), 2);
        assert_eq!(matches.get_one::<String>("output").unwrap(), "json");
    }
}
