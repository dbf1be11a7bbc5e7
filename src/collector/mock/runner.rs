//! Canned command outputs for testing collectors that shell out.

use crate::collector::traits::{CommandOutput, CommandRunner};
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory command runner for testing.
///
/// Outputs are keyed by the full command line (program and arguments joined
/// with single spaces). Unknown command lines behave like a program that is
/// not installed.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    outputs: HashMap<String, CommandOutput>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockRunner {
    /// Creates a runner that knows no commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the output returned for the exact `command_line`.
    pub fn add_output(&mut self, command_line: impl Into<String>, output: CommandOutput) {
        self.outputs.insert(command_line.into(), output);
    }

    /// Registers a successful run printing `stdout`.
    pub fn add_success(&mut self, command_line: impl Into<String>, stdout: impl Into<String>) {
        self.add_output(command_line, CommandOutput::success(stdout));
    }

    /// Registers a run exiting with `code`.
    pub fn add_failure(&mut self, command_line: impl Into<String>, code: i32) {
        self.add_output(command_line, CommandOutput::failure(code));
    }

    /// Returns every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let mut command_line = program.to_string();
        for arg in args {
            command_line.push(' ');
            command_line.push_str(arg);
        }

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command_line.clone());

        self.outputs.get(&command_line).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("command not found: {}", command_line),
            )
        })
    }
}
