//! Service-specific tests
//!
//! Each service has its own test file. Shared fakes and archive builders
//! live in `common`.

mod archive;
mod diagnostics;

// Common test utilities for services
pub mod common {
    use std::io::{Cursor, Write};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use zip::write::SimpleFileOptions;

    use crate::error::WardenResult;
    use crate::traits::{CommandOutput, CommandRunner, CommandSpec};

    type Responder = Box<dyn Fn(&CommandSpec) -> WardenResult<CommandOutput> + Send + Sync>;

    /// Command runner that records every call and answers from a closure
    pub struct ScriptedRunner {
        calls: Mutex<Vec<CommandSpec>>,
        respond: Responder,
    }

    impl ScriptedRunner {
        pub fn new(respond: impl Fn(&CommandSpec) -> WardenResult<CommandOutput> + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                respond: Box::new(respond),
            })
        }

        pub fn succeeding() -> Arc<Self> {
            Self::new(|_| ok(""))
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        /// git arguments after `-C <root>`, one string per call
        pub fn git_subcommands(&self) -> Vec<String> {
            self.calls()
                .iter()
                .map(|spec| git_subcommand(spec))
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, spec: CommandSpec) -> WardenResult<CommandOutput> {
            let result = (self.respond)(&spec);
            self.calls.lock().unwrap().push(spec);
            result
        }
    }

    pub fn git_subcommand(spec: &CommandSpec) -> String {
        spec.args.iter().skip(2).cloned().collect::<Vec<_>>().join(" ")
    }

    pub fn ok(stdout: &str) -> WardenResult<CommandOutput> {
        Ok(CommandOutput {
            status_code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    pub fn failed(code: i32, stderr: &str) -> WardenResult<CommandOutput> {
        Ok(CommandOutput {
            status_code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }

    /// Zip archive bytes holding the given files
    pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        std::fs::write(path, zip_bytes(entries)).unwrap();
    }

    /// Create an empty file standing in for the git executable
    pub fn fake_git(dir: &Path) -> PathBuf {
        let git = dir.join("git");
        std::fs::write(&git, "").unwrap();
        git
    }

    pub fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn dir_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }
}
