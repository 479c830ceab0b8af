//! Test fixtures for plinth blueprint tests
//!
//! Blueprint snippets are YAML fragments meant to be concatenated: each one
//! holds whole top-level sections, except [`MINIMAL_APPLICATION_TEMPLATE`]
//! which ends inside its only node so tests can append node-level keys.

use std::fs;
use std::path::{Path, PathBuf};

/// One node `test_node` of type `test_type` in application `test_app`.
pub const BASIC_APPLICATION_TEMPLATE_SECTION: &str = r#"
application_template:
    name: test_app
    topology:
        -   name: test_node
            type: test_type
            properties:
                key: "val"
"#;

/// Interface `test_interface1` implemented by agent plugin `test_plugin`.
pub const BASIC_INTERFACE_AND_PLUGIN: &str = r#"
interfaces:
    test_interface1:
        operations:
            -   "install"
            -   "terminate"

plugins:
    test_plugin:
        derived_from: "cloudify.tosca.artifacts.agent_plugin"
        properties:
            interface: "test_interface1"
            url: "http://test_url.zip"
"#;

/// Type `test_type` declaring `test_interface1` implicitly.
pub const BASIC_TYPE: &str = r#"
types:
    test_type:
        interfaces:
            -   test_interface1
        properties:
            install_agent: 'false'
"#;

/// Policy type `test_policy` and rule `test_rule`.
pub const POLICIES_SECTION: &str = r#"
policies:
    types:
        test_policy:
            message: "test policy message"
            policy: "test policy code"
    rules:
        test_rule:
            message: "test rule message"
            rule: "test rule code"
"#;

/// An empty `test_type` and one node using it; open at node level.
pub const MINIMAL_APPLICATION_TEMPLATE: &str = r#"
types:
    test_type: {}

application_template:
    name: test_app
    topology:
        -   name: test_node
            type: test_type
            properties:
                key: "val"
"#;

/// A complete, valid blueprint built from the basic snippets.
pub fn application_template_with_interfaces_and_plugins() -> String {
    [BASIC_APPLICATION_TEMPLATE_SECTION, BASIC_INTERFACE_AND_PLUGIN, BASIC_TYPE].concat()
}

/// `imports:` section listing `locations` in order.
pub fn imports_section<S: AsRef<str>>(locations: &[S]) -> String {
    let mut section = String::from("\nimports:\n");
    for location in locations {
        section.push_str("    -   ");
        section.push_str(location.as_ref());
        section.push('\n');
    }
    section
}

/// A temporary directory of blueprint files, removed on drop.
pub struct BlueprintTree {
    dir: tempfile::TempDir,
    counter: usize,
}

impl BlueprintTree {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
            counter: 0,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `name` inside the tree, as a string identifier.
    pub fn location(&self, name: &str) -> String {
        self.path(name).to_string_lossy().into_owned()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `content` to `name` and return its identifier.
    pub fn write(&self, name: &str, content: &str) -> std::io::Result<String> {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path.to_string_lossy().into_owned())
    }

    /// Write `content` under a fresh generated name.
    pub fn write_generated(&mut self, content: &str) -> std::io::Result<String> {
        self.counter += 1;
        let name = format!("generated_{}.yaml", self.counter);
        self.write(&name, content)
    }

    /// Write each snippet to its own file and return an `imports:` section
    /// listing them.
    pub fn yaml_with_imports(&mut self, contents: &[&str]) -> std::io::Result<String> {
        let locations = contents
            .iter()
            .map(|content| self.write_generated(content))
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(imports_section(&locations))
    }
}
