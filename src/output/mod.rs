use crate::models::InvocationResult;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Output handler for invocation results
pub struct OutputHandler {
    format: OutputFormat,
    writer: Option<Box<dyn Write + Send>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Console,
}

impl OutputFormat {
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "jsonl" => OutputFormat::Jsonl,
            "console" => OutputFormat::Console,
            other => {
                log::warn!("Unknown output format '{}', writing jsonl", other);
                OutputFormat::Jsonl
            }
        }
    }
}

impl OutputHandler {
    /// Create a new output handler; results go to stdout unless a file is given
    pub fn new(format: OutputFormat, file_path: Option<PathBuf>) -> Result<Self, OutputError> {
        let writer: Option<Box<dyn Write + Send>> = match (&format, file_path) {
            (OutputFormat::Console, _) => None,
            (_, Some(path)) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Box::new(BufWriter::new(file)))
            }
            (_, None) => None,
        };

        Ok(OutputHandler { format, writer })
    }

    /// Write an invocation result
    pub fn write_result(&mut self, result: &InvocationResult) -> Result<(), OutputError> {
        let output = match self.format {
            OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(result)?),
            OutputFormat::Jsonl => format!("{}\n", serde_json::to_string(result)?),
            OutputFormat::Console => format!("[{}] {}\n", result.status_code, result.message()),
        };
        self.write_output(&output)
    }

    /// Record that the event produced no work
    pub fn write_noop(&mut self) -> Result<(), OutputError> {
        if self.format == OutputFormat::Console {
            self.write_output("No attacker address in event; nothing to do\n")?;
        }
        Ok(())
    }

    fn write_output(&mut self, data: &str) -> Result<(), OutputError> {
        match &mut self.writer {
            Some(writer) => {
                writer.write_all(data.as_bytes())?;
                writer.flush()?;
            }
            None => {
                print!("{}", data);
                io::stdout().flush()?;
            }
        }
        Ok(())
    }

    /// Flush any buffered output
    pub fn flush(&mut self) -> Result<(), OutputError> {
        if let Some(writer) = &mut self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockOutcome;

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::from_name("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_name("console"), OutputFormat::Console);
        assert_eq!(OutputFormat::from_name("xml"), OutputFormat::Jsonl);
    }

    #[test]
    fn test_jsonl_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");

        let mut handler = OutputHandler::new(OutputFormat::Jsonl, Some(path.clone())).unwrap();
        handler
            .write_result(&InvocationResult::from_outcome(BlockOutcome::Blocked, "192.0.2.1"))
            .unwrap();
        handler
            .write_result(&InvocationResult::from_outcome(
                BlockOutcome::AlreadyBlocked,
                "192.0.2.1",
            ))
            .unwrap();
        handler.write_noop().unwrap();
        handler.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: InvocationResult = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.message(), "Successfully blocked IP: 192.0.2.1");
    }
}
