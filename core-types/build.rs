use minijinja::{Environment, context};
use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
struct TypeInfo {
    name: String,
    alias: String,
    cpp: String,
    bytes: usize,
}

#[derive(Debug, Deserialize, Serialize)]
struct TypeList {
    types: Vec<TypeInfo>,
}

fn main() {
    // Read the yaml file
    let yaml_path = Path::new("../supported_types.yaml");
    let yaml_str = fs::read_to_string(yaml_path)
        .expect("Unable to read supported_types.yaml");
    let type_list: TypeList = serde_yaml::from_str(&yaml_str)
        .expect("Failed to parse YAML");
    assert!(!type_list.types.is_empty(), "supported_types.yaml lists no element types");

    // Load the template from a file
    let template_path = Path::new("templates/element_types.jinja");
    let template_source = fs::read_to_string(template_path)
        .expect("Unable to read template file");

    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    let tmpl = env.template_from_str(&template_source).unwrap();

    let rendered = tmpl.render(context! { types => type_list.types }).unwrap();

    fs::write("src/generated_element_types.rs", rendered)
        .expect("Unable to write generated file");

    // Tell cargo to rerun if files change
    println!("cargo:rerun-if-changed=../supported_types.yaml");
    println!("cargo:rerun-if-changed=templates/element_types.jinja");
}
