//! # CI Workflow
//!
//! The workflow gates every push and pull request on tests, formatting and
//! lints, in that order.

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    const WORKFLOW: &str = include_str!("../../../.github/workflows/rust.yml");

    fn workflow() -> Value {
        serde_yaml::from_str(WORKFLOW).expect("workflow is valid YAML")
    }

    fn step_commands(workflow: &Value) -> Vec<String> {
        workflow["jobs"]["build"]["steps"]
            .as_sequence()
            .expect("steps")
            .iter()
            .map(|step| {
                step.get("run")
                    .or_else(|| step.get("uses"))
                    .and_then(Value::as_str)
                    .expect("step runs or uses something")
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_triggers() {
        let workflow = workflow();
        let on = &workflow["on"];

        let branches: Vec<&str> = on["push"]["branches"]
            .as_sequence()
            .expect("push branches")
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(branches, ["main", "dev"]);
        assert!(on.get("pull_request").is_some());
        assert_eq!(workflow["env"]["CARGO_TERM_COLOR"].as_str(), Some("always"));
    }

    #[test]
    fn test_steps_in_order() {
        let commands = step_commands(&workflow());

        assert_eq!(commands.len(), 6);
        assert!(commands[0].starts_with("actions/checkout@"));
        assert!(commands[1].starts_with("actions/cache@"));
        assert!(commands[2].ends_with("@stable"));
        assert_eq!(commands[3], "cargo test --all-features -- --test-threads=1");
        assert_eq!(commands[4], "cargo fmt --all -- --check");
        assert_eq!(
            commands[5],
            "cargo clippy --all --all-features --tests -- -D warnings"
        );
    }

    #[test]
    fn test_toolchain_has_lint_components() {
        let workflow = workflow();
        let toolchain = &workflow["jobs"]["build"]["steps"][2]["with"]["components"];
        let components = toolchain.as_str().expect("components");

        assert!(components.contains("rustfmt"));
        assert!(components.contains("clippy"));
    }
}
