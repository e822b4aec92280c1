#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;
use todos::todo::{parse_snapshot, TodoItem, TODOS_KEY};

pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn init() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write_file(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.file(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file("config.toml", contents)
    }

    pub fn write_snapshot(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file(&format!("{TODOS_KEY}.json"), contents)
    }

    pub fn read_todos(&self) -> Result<Vec<TodoItem>, Box<dyn std::error::Error>> {
        let raw = fs::read_to_string(self.file(&format!("{TODOS_KEY}.json")))?;
        Ok(parse_snapshot(&raw)?.todos)
    }

    /// `todos` command pointed at this data directory
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("todos").expect("binary");
        cmd.env_remove("RUST_LOG");
        cmd.env("TODOS_DIR", self.dir.path());
        cmd
    }

    /// Run a command with `--json` and return the envelope's `data`
    pub fn json(&self, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self.cmd().arg("--json").args(args).output()?;
        if !output.status.success() {
            return Err(format!(
                "todos {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stdout)
            )
            .into());
        }
        let envelope: Value = serde_json::from_slice(&output.stdout)?;
        Ok(envelope["data"].clone())
    }

    /// Add a todo and return its id
    pub fn add(&self, args: &[&str]) -> Result<String, Box<dyn std::error::Error>> {
        let mut full = vec!["add"];
        full.extend_from_slice(args);
        let data = self.json(&full)?;
        data["todo"]["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| "missing todo id".into())
    }
}
