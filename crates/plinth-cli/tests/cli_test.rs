//! Command handlers driven against blueprint files on disk

use std::path::Path;

use insta::assert_snapshot;
use plinth::{
    build_plan, error_code, evaluate_outputs, load_config, load_input_values, load_instances,
    render, summary, Format,
};
use plinth_core::NodeMatch;
use plinth_parser::ParserConfig;
use plinth_test_fixtures::BlueprintTree;
use pretty_assertions::assert_eq;
use serde_json::json;

const BLUEPRINT: &str = r#"
inputs:
    region:
        default: us-east

types:
    server:
        properties:
            port: 80

application_template:
    name: shop
    topology:
        -   name: web
            type: server
            properties:
                port: 8080

outputs:
    endpoint:
        value:
            ip: {get_attribute: [shop.web, ip_address]}
            port: {get_property: [web, port]}
    region:
        value: {get_input: region}
"#;

const STATIC_OUTPUTS: &str = r#"
types:
    server: {}

application_template:
    name: shop
    topology:
        -   name: web
            type: server

outputs:
    name:
        value: shop
"#;

#[test]
fn test_validate_summary() -> anyhow::Result<()> {
    let tree = BlueprintTree::new()?;
    let location = tree.write("blueprint.yaml", BLUEPRINT)?;
    let plan = build_plan(&location, ParserConfig::default(), Default::default())?;
    assert_eq!(
        summary(&plan),
        "Blueprint 'shop' is valid: 1 node templates, 1 types, 0 plugins, 2 outputs"
    );
    Ok(())
}

#[test]
fn test_outputs_with_instances_file() -> anyhow::Result<()> {
    let tree = BlueprintTree::new()?;
    let location = tree.write("blueprint.yaml", BLUEPRINT)?;
    tree.write(
        "instances.json",
        r#"[{"node_id": "shop.web", "runtime_properties": {"ip_address": "10.0.0.5"}}]"#,
    )?;

    let inputs = load_input_values(None, &["region=eu-west".to_string()])?;
    let plan = build_plan(&location, ParserConfig::default(), inputs)?;
    let outputs = evaluate_outputs(&plan, Some(&tree.path("instances.json")))?;
    assert_snapshot!(render(&outputs, Format::Json)?, @r###"
    {
      "endpoint": {
        "ip": "10.0.0.5",
        "port": 8080
      },
      "region": "eu-west"
    }
    "###);
    Ok(())
}

#[test]
fn test_outputs_without_attributes_need_no_instances() -> anyhow::Result<()> {
    let tree = BlueprintTree::new()?;
    let location = tree.write("blueprint.yaml", STATIC_OUTPUTS)?;
    let plan = build_plan(&location, ParserConfig::default(), Default::default())?;
    let outputs = evaluate_outputs(&plan, None)?;
    assert_eq!(serde_json::to_value(&outputs)?, json!({"name": "shop"}));
    Ok(())
}

#[test]
fn test_outputs_with_attributes_require_instances() -> anyhow::Result<()> {
    let tree = BlueprintTree::new()?;
    let location = tree.write("blueprint.yaml", BLUEPRINT)?;
    let plan = build_plan(&location, ParserConfig::default(), Default::default())?;
    let err = evaluate_outputs(&plan, None).unwrap_err();
    assert!(format!("{:#}", err).contains("--instances"));
    assert_eq!(error_code(&err), None);
    Ok(())
}

#[test]
fn test_input_values_file_then_assignments() -> anyhow::Result<()> {
    let tree = BlueprintTree::new()?;
    tree.write("inputs.yaml", "region: us-east\nreplicas: 2\n")?;
    let values = load_input_values(
        Some(&tree.path("inputs.yaml")),
        &["replicas=3".to_string(), "debug=true".to_string()],
    )?;
    assert_eq!(
        serde_json::to_value(&values)?,
        json!({"region": "us-east", "replicas": 3, "debug": true})
    );
    Ok(())
}

#[test]
fn test_malformed_assignment_is_rejected() {
    let err = load_input_values(None, &["region".to_string()]).unwrap_err();
    assert!(err.to_string().contains("NAME=VALUE"));
}

#[test]
fn test_config_file() -> anyhow::Result<()> {
    let tree = BlueprintTree::new()?;
    tree.write("plinth.toml", "node_match = \"exact\"\n")?;
    let config = load_config(Some(&tree.path("plinth.toml")))?;
    assert_eq!(config.node_match, NodeMatch::Exact);
    assert_eq!(load_config(None)?, ParserConfig::default());
    Ok(())
}

#[test]
fn test_missing_config_file() {
    let err = load_config(Some(Path::new("/nonexistent/plinth.toml"))).unwrap_err();
    assert!(err.to_string().contains("Failed to load config"));
}

#[test]
fn test_error_code_of_blueprint_violation() -> anyhow::Result<()> {
    let tree = BlueprintTree::new()?;
    let location = tree.write(
        "blueprint.yaml",
        r#"
application_template:
    name: shop
    topology:
        -   name: web
            type: missing_type
"#,
    )?;
    let err = build_plan(&location, ParserConfig::default(), Default::default()).unwrap_err();
    assert_eq!(error_code(&err), Some(7));
    assert!(err.to_string().starts_with("Failed to resolve blueprint"));
    Ok(())
}

#[test]
fn test_instances_yaml() -> anyhow::Result<()> {
    let tree = BlueprintTree::new()?;
    tree.write(
        "instances.yaml",
        "- node_id: shop.web\n  runtime_properties:\n    ip_address: 10.0.0.5\n- node_id: shop.db\n",
    )?;
    let instances = load_instances(&tree.path("instances.yaml"))?;
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].attribute("ip_address"), json!("10.0.0.5"));
    assert_eq!(instances[1].runtime_properties, None);
    Ok(())
}

#[test]
fn test_render_yaml() -> anyhow::Result<()> {
    let value = json!({"name": "shop", "ports": [80, 443]});
    assert_snapshot!(render(&value, Format::Yaml)?, @r###"
    name: shop
    ports:
    - 80
    - 443
    "###);
    Ok(())
}
