// Generation backend that shells out to an external program

use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use super::Generator;
use crate::error::BackendError;

/// Runs `program args...`, feeds the prompt on stdin and returns stdout
///
/// Works with any local model runner that reads a prompt from stdin
/// (e.g. `ollama run codellama`).
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    /// Parse a whitespace-separated command line
    pub fn from_command_line(command: &str) -> Result<Self, BackendError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| BackendError::Generate("generation command is empty".to_string()))?;

        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        info!("Generating answer with '{}'", self.program);
        debug!("Prompt is {} bytes", prompt.len());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin while stdout drains, or a large prompt fills both pipes
        let stdin = child.stdin.take();
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(prompt.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let output = output?;

        if !output.status.success() {
            return Err(BackendError::Generate(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        match written {
            Ok(Ok(())) => {}
            // The command may exit successfully without reading all input
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!("'{}' closed stdin early", self.program);
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(BackendError::Generate("prompt writer thread panicked".to_string()))
            }
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
