//! Shared fixtures for integration tests.

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const NAMESPACE: &str = "com.example";

/// Project directory holding a compiled model and optional override document.
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new(model: &Value) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let project = Self { dir };
        project.write("gen/csn.json", &model.to_string());
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    #[allow(dead_code)]
    pub fn model_path(&self) -> PathBuf {
        self.root().join("gen/csn.json")
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(&path, contents.as_bytes()).expect("write file");
        path
    }

    /// Write the override document to its default location.
    pub fn write_overrides(&self, overrides: &Value) -> PathBuf {
        self.write("ord/custom.ord.json", &overrides.to_string())
    }

    /// Run the `dpgen` binary with the gate variable cleared.
    #[allow(dead_code)]
    pub fn dpgen(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_dpgen"))
            .args(args)
            .current_dir(self.root())
            .env_remove("ORD_ENABLE_DATA_PRODUCTS")
            .env("RUST_LOG", "warn")
            .output()
            .expect("run dpgen")
    }
}

/// One annotated `CustomerService` without entities, optionally exposing an event.
pub fn customer_model(with_event: bool) -> Value {
    let mut elements = json!({});
    if with_event {
        elements["CustomerChanged"] = json!({ "kind": "event" });
    }
    json!({
        "definitions": {
            "CustomerService": {
                "kind": "service",
                "@ORD.dataProduct": {
                    "title": "Customer Data Product",
                    "version": "1.0.0",
                    "type": "primary",
                    "visibility": "public"
                },
                "elements": elements
            }
        }
    })
}

/// Two services: an annotated primary and an unannotated sibling.
#[allow(dead_code)]
pub fn two_service_model() -> Value {
    json!({
        "definitions": {
            "CustomerService": {
                "kind": "service",
                "@ORD.dataProduct": { "title": "Customer Data Product", "visibility": "public" }
            },
            "OrderService": { "kind": "service" },
            "Shared.Type": { "kind": "type" }
        }
    })
}
