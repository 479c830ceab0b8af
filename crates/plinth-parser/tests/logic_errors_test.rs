//! Every blueprint logic error, reproduced through a full parse

use plinth_core::functions::Function;
use plinth_core::{BlueprintError, Context, ErrorCode, Plan, Provenance};
use plinth_parser::{BlueprintParser, ParserConfig};
use plinth_test_fixtures::{
    application_template_with_interfaces_and_plugins, BlueprintTree, BASIC_APPLICATION_TEMPLATE_SECTION,
    BASIC_INTERFACE_AND_PLUGIN, BASIC_TYPE, MINIMAL_APPLICATION_TEMPLATE, POLICIES_SECTION,
};
use pretty_assertions::assert_eq;

fn parse(yaml: &str) -> Result<Plan, BlueprintError> {
    BlueprintParser::default().parse_str(yaml)
}

fn assert_error_code(yaml: &str, code: u16) -> BlueprintError {
    match parse(yaml) {
        Ok(plan) => panic!("expected error {} but parsed plan '{}'", code, plan.name),
        Err(err) => {
            assert_eq!(err.code().code(), code, "unexpected error: {}", err);
            err
        }
    }
}

#[test]
fn test_invalid_document() {
    assert_error_code("application_template: [unclosed", 1);
    assert_error_code("- just\n- a list\n", 1);
}

#[test]
fn test_no_type_definition() {
    assert_error_code(BASIC_APPLICATION_TEMPLATE_SECTION, 7);
}

#[test]
fn test_explicit_interface_with_missing_plugin() {
    let yaml = [
        BASIC_APPLICATION_TEMPLATE_SECTION,
        BASIC_INTERFACE_AND_PLUGIN,
        r#"
types:
    test_type:
        interfaces:
            -   test_interface1: "missing_plugin"
        properties:
            install_agent: 'false'
"#,
    ]
    .concat();
    assert_error_code(&yaml, 10);
}

#[test]
fn test_missing_interface_definition() {
    let yaml = [
        BASIC_APPLICATION_TEMPLATE_SECTION,
        BASIC_INTERFACE_AND_PLUGIN,
        r#"
types:
    test_type:
        interfaces:
            -   missing_interface: "test_plugin"
"#,
    ]
    .concat();
    assert_error_code(&yaml, 9);
}

#[test]
fn test_type_with_interface_with_explicit_illegal_plugin() {
    let yaml = [
        BASIC_APPLICATION_TEMPLATE_SECTION,
        r#"
interfaces:
    test_interface1:
        operations:
            -   "install"
            -   "terminate"
    test_interface2:
        operations:
            -   "install"
            -   "terminate"

plugins:
    test_plugin:
        derived_from: "cloudify.tosca.artifacts.agent_plugin"
        properties:
            interface: "test_interface1"
            url: "http://test_url.zip"

types:
    test_type:
        interfaces:
            -   test_interface2: "test_plugin"
"#,
    ]
    .concat();
    assert_error_code(&yaml, 6);
}

#[test]
fn test_implicit_interface_with_no_matching_plugins() {
    let yaml = [
        BASIC_APPLICATION_TEMPLATE_SECTION,
        r#"
interfaces:
    test_interface1:
        operations:
            -   "install"
    test_interface2:
        operations:
            -   "install"
            -   "terminate"

plugins:
    test_plugin:
        derived_from: "cloudify.tosca.artifacts.agent_plugin"
        properties:
            interface: "test_interface1"
            url: "http://test_url.zip"

types:
    test_type:
        interfaces:
            -   test_interface2
"#,
    ]
    .concat();
    assert_error_code(&yaml, 11);
}

#[test]
fn test_implicit_interface_with_ambiguous_matches() -> Result<(), Box<dyn std::error::Error>> {
    let mut tree = BlueprintTree::new()?;
    let yaml = tree.yaml_with_imports(&[&application_template_with_interfaces_and_plugins()])?
        + r#"
plugins:
    other_test_plugin:
        derived_from: "cloudify.tosca.artifacts.agent_plugin"
        properties:
            interface: "test_interface1"
            url: "http://other_test_url.zip"
"#;
    let err = assert_error_code(&yaml, 12);
    assert_eq!(
        err,
        BlueprintError::AmbiguousPlugin {
            owner: "test_node".into(),
            interface: "test_interface1".into(),
            candidates: vec!["test_plugin".into(), "other_test_plugin".into()],
        }
    );
    Ok(())
}

#[test]
fn test_dsl_with_interface_without_plugin() {
    let yaml = [
        BASIC_APPLICATION_TEMPLATE_SECTION,
        BASIC_TYPE,
        r#"
interfaces:
    test_interface1:
        operations:
            -   "install"
            -   "terminate"
"#,
    ]
    .concat();
    assert_error_code(&yaml, 5);
}

#[test]
fn test_merge_non_mergeable_properties_on_import() -> Result<(), Box<dyn std::error::Error>> {
    let mut tree = BlueprintTree::new()?;
    let yaml = tree.yaml_with_imports(&[BASIC_APPLICATION_TEMPLATE_SECTION, BASIC_INTERFACE_AND_PLUGIN])?
        + r#"
application_template:
    name: test_app2
    topology:
        -   name: test_node2
            type: test_type
            properties:
                key: "val"
"#;
    assert_error_code(&yaml, 3);
    Ok(())
}

#[test]
fn test_identical_non_mergeable_section_on_import() -> Result<(), Box<dyn std::error::Error>> {
    let mut tree = BlueprintTree::new()?;
    let yaml = tree.yaml_with_imports(&[BASIC_APPLICATION_TEMPLATE_SECTION, BASIC_INTERFACE_AND_PLUGIN])?
        + BASIC_APPLICATION_TEMPLATE_SECTION
        + BASIC_TYPE;
    let plan = parse(&yaml)?;
    assert_eq!(plan.node_templates.len(), 1);
    Ok(())
}

#[test]
fn test_illegal_merge_on_nested_mergeable_rules_on_import() -> Result<(), Box<dyn std::error::Error>> {
    let mut tree = BlueprintTree::new()?;
    let imported = MINIMAL_APPLICATION_TEMPLATE.to_string()
        + r#"
policies:
    rules:
        rule1:
            message: "custom message"
            rule: "custom clojure code"
"#;
    let yaml = tree.yaml_with_imports(&[&imported])?
        + r#"
policies:
    rules:
        rule1:
            message: "some other message"
            rule: "some other code"
"#;
    let err = assert_error_code(&yaml, 4);
    assert_eq!(
        err,
        BlueprintError::MergeConflict {
            key: "policies.rules.rule1.message".into()
        }
    );
    Ok(())
}

#[test]
fn test_illegal_merge_on_nested_mergeable_policies_on_import() -> Result<(), Box<dyn std::error::Error>> {
    let mut tree = BlueprintTree::new()?;
    let imported = MINIMAL_APPLICATION_TEMPLATE.to_string()
        + r#"
policies:
    types:
        policy1:
            message: "custom message"
            policy: "custom clojure code"
"#;
    let yaml = tree.yaml_with_imports(&[&imported])?
        + r#"
policies:
    types:
        policy1:
            message: "some other message"
            policy: "some other code"
"#;
    assert_error_code(&yaml, 4);
    Ok(())
}

#[test]
fn test_illegal_merge_on_mergeable_properties_on_import() -> Result<(), Box<dyn std::error::Error>> {
    let mut tree = BlueprintTree::new()?;
    let yaml = tree.yaml_with_imports(&[BASIC_APPLICATION_TEMPLATE_SECTION, BASIC_INTERFACE_AND_PLUGIN])?
        + r#"
plugins:
    test_plugin:
        properties:
            interface: "test_interface2"
            url: "http://test_url2.zip"
types:
    test_type:
        interfaces:
            -   test_interface1
            -   test_interface2

interfaces:
    test_interface2:
        operations:
            -   "start"
            -   "shutdown"
"#;
    assert_error_code(&yaml, 4);
    Ok(())
}

#[test]
fn test_recursive_imports_with_inner_circular() -> Result<(), Box<dyn std::error::Error>> {
    let mut tree = BlueprintTree::new()?;
    let mid_location = tree.location("mid_level.yaml");
    let bottom = tree.write_generated(&format!("\nimports:\n    -   {}\n{}", mid_location, BASIC_TYPE))?;
    let mid = tree.write(
        "mid_level.yaml",
        &format!("{}\nimports:\n    -   {}\n", BASIC_INTERFACE_AND_PLUGIN, bottom),
    )?;
    let top = format!("{}\nimports:\n    -   {}\n", BASIC_APPLICATION_TEMPLATE_SECTION, mid);

    let err = assert_error_code(&top, 8);
    assert_eq!(err.circular_path().unwrap(), [mid.clone(), bottom, mid]);
    Ok(())
}

#[test]
fn test_recursive_imports_with_complete_circle() -> Result<(), Box<dyn std::error::Error>> {
    let mut tree = BlueprintTree::new()?;
    let top_location = tree.location("top_level.yaml");
    let bottom = tree.write_generated(&format!("\nimports:\n    -   {}\n{}", top_location, BASIC_TYPE))?;
    let mid = tree.write_generated(&format!("{}\nimports:\n    -   {}\n", BASIC_INTERFACE_AND_PLUGIN, bottom))?;
    let top = tree.write(
        "top_level.yaml",
        &format!("{}\nimports:\n    -   {}\n", BASIC_APPLICATION_TEMPLATE_SECTION, mid),
    )?;

    let err = BlueprintParser::default()
        .parse_location(&top)
        .expect_err("import ring must fail");
    assert_eq!(err.code(), ErrorCode::CircularImport);
    assert_eq!(err.circular_path().unwrap(), [top.clone(), mid, bottom, top]);
    Ok(())
}

#[test]
fn test_type_derive_from_non_existing() {
    let yaml = BASIC_APPLICATION_TEMPLATE_SECTION.to_string()
        + r#"
types:
    test_type:
        interfaces:
            -   test_interface1
        derived_from: "non_existing_type_parent"
"#;
    assert_error_code(&yaml, 14);
}

#[test]
fn test_import_bad_path() {
    assert_error_code("\nimports:\n    -   fake-file.yaml\n", 13);
}

#[test]
fn test_cyclic_dependency() {
    let yaml = BASIC_APPLICATION_TEMPLATE_SECTION.to_string()
        + r#"
types:
    test_type:
        derived_from: "test_type_parent"

    test_type_parent:
        derived_from: "test_type_grandparent"

    test_type_grandparent:
        derived_from: "test_type"
"#;
    let err = assert_error_code(&yaml, 100);
    assert_eq!(
        err.circular_dependency().unwrap(),
        ["test_type", "test_type_parent", "test_type_grandparent", "test_type"]
    );
}

#[test]
fn test_node_duplicate_name() {
    let yaml = r#"
application_template:
    name: test_app
    topology:
    -   name: test_node
        type: test_type
        properties:
            key: "val"
    -   name: test_node
        type: test_type
        properties:
            key: "val"

types:
    test_type: {}
"#;
    let err = assert_error_code(yaml, 101);
    assert_eq!(err.duplicate_node_name(), Some("test_node"));
}

#[test]
fn test_type_duplicate_interface() {
    let yaml = [
        BASIC_APPLICATION_TEMPLATE_SECTION,
        BASIC_INTERFACE_AND_PLUGIN,
        r#"
types:
    test_type:
        interfaces:
            -   test_interface1
            -   test_interface1: test_plugin
"#,
    ]
    .concat();
    let err = assert_error_code(&yaml, 102);
    assert_eq!(err.node_name(), Some("test_node"));
    assert_eq!(err.duplicate_interface_name(), Some("test_interface1"));
}

#[test]
fn test_first_level_workflows_unavailable_ref() {
    let yaml = MINIMAL_APPLICATION_TEMPLATE.to_string()
        + r#"
workflows:
    install:
        ref: custom_ref_alias
"#;
    assert_error_code(&yaml, 15);
}

#[test]
fn test_first_level_policy_unavailable_ref() {
    let yaml = MINIMAL_APPLICATION_TEMPLATE.to_string()
        + r#"
policies:
    types:
        custom_policy:
            message: "custom message"
            ref: custom_ref_alias
"#;
    assert_error_code(&yaml, 15);
}

#[test]
fn test_node_with_undefined_policy() {
    let yaml = [
        POLICIES_SECTION,
        MINIMAL_APPLICATION_TEMPLATE,
        r#"
            policies:
                undefined_policy:
                    rules:
                        -   type: "test_rule"
                            properties:
                                state: "custom state"
                                value: "custom value"
"#,
    ]
    .concat();
    assert_error_code(&yaml, 16);
}

#[test]
fn test_node_with_undefined_rule() {
    let yaml = [
        POLICIES_SECTION,
        MINIMAL_APPLICATION_TEMPLATE,
        r#"
            policies:
                test_policy:
                    rules:
                        -   type: "undefined_rule"
                            properties:
                                state: "custom state"
                                value: "custom value"
"#,
    ]
    .concat();
    assert_error_code(&yaml, 17);
}

#[test]
fn test_type_with_undefined_policy() {
    let yaml = [
        POLICIES_SECTION,
        BASIC_APPLICATION_TEMPLATE_SECTION,
        r#"
types:
    test_type:
        policies:
            undefined_policy:
                rules:
                    -   type: "test_rule"
                        properties:
                            state: "custom state"
                            value: "custom value"
"#,
    ]
    .concat();
    assert_error_code(&yaml, 16);
}

#[test]
fn test_type_with_undefined_rule() {
    let yaml = [
        POLICIES_SECTION,
        BASIC_APPLICATION_TEMPLATE_SECTION,
        r#"
types:
    test_type:
        policies:
            test_policy:
                rules:
                    -   type: "undefined_rule"
                        properties:
                            state: "custom state"
                            value: "custom value"
"#,
    ]
    .concat();
    assert_error_code(&yaml, 17);
}

#[test]
fn test_plugin_with_wrongful_derived_from_field() {
    let yaml = BASIC_APPLICATION_TEMPLATE_SECTION.to_string()
        + r#"
interfaces:
    test_interface1:
        operations:
            -   "install"

plugins:
    test_plugin:
        derived_from: "bad value"
        properties:
            interface: "test_interface1"
            url: "http://test_url.zip"

types:
    test_type:
        interfaces:
            -   test_interface1: "test_plugin"
"#;
    assert_error_code(&yaml, 18);
}

#[test]
fn test_configured_agent_plugin_marker() -> Result<(), Box<dyn std::error::Error>> {
    let yaml = application_template_with_interfaces_and_plugins();
    let config = ParserConfig::from_toml_str("agent_plugin = \"acme.agent\"")?;
    let err = BlueprintParser::default()
        .with_config(config)
        .parse_str(&yaml)
        .expect_err("default marker no longer matches");
    assert_eq!(err.code(), ErrorCode::IllegalPluginDerivation);
    Ok(())
}

fn node_with_properties(properties: &str) -> String {
    format!(
        r#"
inputs:
    region:
        default: us-east
types:
    test_type: {{}}
application_template:
    name: test_app
    topology:
        -   name: test_node
            type: test_type
            properties:
{}
"#,
        properties
    )
}

#[test]
fn test_unknown_input() {
    let err = assert_error_code(&node_with_properties("                zone: {get_input: zone}"), 103);
    assert!(err.to_string().contains("zone"));
}

#[test]
fn test_unknown_node() {
    assert_error_code(
        &node_with_properties("                port: {get_property: [nowhere, key]}"),
        104,
    );
}

#[test]
fn test_unknown_property() {
    assert_error_code(
        &node_with_properties("                port: {get_property: [SELF, missing]}"),
        105,
    );
}

#[test]
fn test_get_attribute_outside_outputs() {
    assert_error_code(
        &node_with_properties("                ip: {get_attribute: [test_node, ip]}"),
        106,
    );
}

#[test]
fn test_self_in_outputs() {
    let yaml = node_with_properties("                key: val")
        + r#"
outputs:
    ip:
        value: {get_property: [SELF, key]}
"#;
    let err = assert_error_code(&yaml, 106);
    assert!(err.to_string().contains("SELF"));
}

#[test]
fn test_invalid_function_arguments() {
    assert_error_code(
        &node_with_properties("                zone: {get_input: [a, b]}"),
        107,
    );
    assert_error_code(
        &node_with_properties("                zone: {get_property: [test_node]}"),
        107,
    );
}

#[test]
fn test_get_attribute_has_no_compile_time_value() -> Result<(), Box<dyn std::error::Error>> {
    let yaml = node_with_properties("                key: val")
        + r#"
outputs:
    ip:
        value: {get_attribute: [test_node, ip]}
"#;
    let plan = parse(&yaml)?;
    let provenance = Provenance::new(Context::Outputs, "outputs.ip.value");
    let function = Function::parse(&plan.outputs["ip"]["value"], &provenance)?
        .expect("get_attribute survives compile-time evaluation");
    let err = function.evaluate(&plan).unwrap_err();
    assert_eq!(err.code().code(), 108);
    Ok(())
}
