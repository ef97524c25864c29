//! Test fixtures for descriptor trees.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Builder for `go.mod` content.
#[derive(Debug, Clone)]
pub struct GoModFixture {
    module: String,
    go: Option<String>,
    direct: Vec<(String, String)>,
    indirect: Vec<(String, String)>,
}

impl GoModFixture {
    pub fn new(module: impl Into<String>) -> Self {
        GoModFixture {
            module: module.into(),
            go: None,
            direct: Vec::new(),
            indirect: Vec::new(),
        }
    }

    pub fn go(mut self, version: impl Into<String>) -> Self {
        self.go = Some(version.into());
        self
    }

    pub fn require(mut self, path: impl Into<String>, version: impl Into<String>) -> Self {
        self.direct.push((path.into(), version.into()));
        self
    }

    pub fn indirect(mut self, path: impl Into<String>, version: impl Into<String>) -> Self {
        self.indirect.push((path.into(), version.into()));
        self
    }

    /// Render in the layout `go mod tidy` produces.
    pub fn render(&self) -> String {
        let mut out = format!("module {}\n", self.module);
        if let Some(go) = &self.go {
            out.push_str(&format!("\ngo {}\n", go));
        }

        let blocks = [(&self.direct, ""), (&self.indirect, " // indirect")];
        for (reqs, suffix) in blocks {
            if reqs.is_empty() {
                continue;
            }
            out.push_str("\nrequire (\n");
            for (path, version) in reqs {
                out.push_str(&format!("\t{} {}{}\n", path, version, suffix));
            }
            out.push_str(")\n");
        }
        out
    }
}

/// A temporary source tree containing descriptor files.
#[derive(Debug, Default)]
pub struct ModuleTree {
    files: BTreeMap<PathBuf, String>,
}

impl ModuleTree {
    pub fn new() -> Self {
        ModuleTree::default()
    }

    /// Add `go.mod` in the directory `dir` (relative to the tree root).
    pub fn module(mut self, dir: impl AsRef<Path>, fixture: GoModFixture) -> Self {
        self.files
            .insert(dir.as_ref().join("go.mod"), fixture.render());
        self
    }

    /// Add an arbitrary file.
    pub fn file(mut self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.files.insert(path.as_ref().to_path_buf(), content.into());
        self
    }

    /// Write the tree to a fresh temporary directory.
    pub fn create(&self) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (path, content) in &self.files {
            let full = tmp.path().join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(full, content).unwrap();
        }
        tmp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ModFile;

    #[test]
    fn test_rendered_fixture_parses() {
        let content = GoModFixture::new("example.com/app")
            .go("1.20")
            .require("a.example/lib", "v1.0.0")
            .indirect("a.example/lib/sub", "v0.9.0")
            .render();

        let mf = ModFile::parse("go.mod", &content).unwrap();
        assert_eq!(mf.go_version(), Some("1.20"));
        assert_eq!(mf.requirements().filter(|r| r.indirect).count(), 1);
    }
}
