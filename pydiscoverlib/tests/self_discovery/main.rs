//! Discovery without a source: the directory of this file is searched.
//!
//! The directory doubles as a Python package (see `__init__.py` and
//! `probe.py` next to this file).

use pydiscoverlib::{discover, here, DiscoverOptions, Shape};

#[test]
fn test_here_is_this_directory() {
    let dir = here();

    assert!(dir.join("main.rs").is_file());
    assert!(dir.join("probe.py").is_file());
}

#[test]
fn test_discover_defaults_to_calling_directory() {
    let found = discover(None, Shape::default(), DiscoverOptions::new()).unwrap();

    assert_eq!(found.names(), vec!["SelfDiscoveryProbe"]);
}

#[test]
fn test_discover_modules_of_calling_directory() {
    let found = discover(None, "List[Module]".parse().unwrap(), DiscoverOptions::new()).unwrap();
    let modules = found.into_modules().unwrap();

    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].name(), "self_discovery.probe");
}
