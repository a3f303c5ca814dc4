use std::io::Write;

use ferry_core::config::AppConfig;
use ferry_core::types::{Step, Workflow};

/// Four nodes and three edges, workflows resolved under `workflows/`.
pub const SAMPLE_CONFIG: &str = r#"
[node]
name = "transfer_node"
workflow_directory = "workflows"
nodes = ["arm1", "arm2", "plateReader", "sealer"]

[resources]
url = "http://127.0.0.1:8003"

[workcell]
url = "http://127.0.0.1:8005"
poll_interval_ms = 10

[transfer_map.stack.reader]
workflow = "stack_to_reader.yaml"
parameters = { plate_type = "96well" }

[transfer_map.reader.stack]
workflow = "reader_to_stack.yaml"

[transfer_map.stack.sealer]
workflow = "stack_to_sealer.yaml"
"#;

pub fn sample_config() -> AppConfig {
    toml::from_str(SAMPLE_CONFIG).expect("sample config parses")
}

/// Write TOML to a temp file that lives as long as the handle.
pub fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(contents.as_bytes()).expect("write config");
    tmp
}

/// Write `(file name, yaml)` pairs into a fresh temp directory.
pub fn write_workflows(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for (name, contents) in files {
        std::fs::write(dir.path().join(name), contents).expect("write workflow");
    }
    dir
}

/// arm1 picks from the stack, plateReader takes the plate.
pub fn stack_to_reader_workflow() -> Workflow {
    Workflow::new(
        "stack_to_reader",
        vec![
            Step::new("arm1").with_action("pick"),
            Step::new("plateReader").with_action("open_tray"),
            Step::new("arm1").with_action("place"),
            Step::new("plateReader").with_action("close_tray"),
        ],
    )
}
