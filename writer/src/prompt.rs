use agent::crew::CrewOutput;
use agent::{Error, Result};
use std::io::{BufRead, Write};

pub const WELCOME: &str = "Welcome to AI Researcher and Writer!";

/// Asks for the topic and reads a single line of `input`.
pub fn read_topic<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<String> {
    write!(output, "Enter the topic: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    validate_topic(line.trim_end_matches(['\r', '\n']))
}

/// The topic is used verbatim, it only has to contain something.
pub fn validate_topic(topic: &str) -> Result<String> {
    if topic.trim().is_empty() {
        return Err(Error::ConfigError("topic must not be empty".to_string()));
    }
    Ok(topic.to_string())
}

pub fn report<W: Write>(mut out: W, output: &CrewOutput) -> Result<()> {
    writeln!(out, "{}", output)?;
    out.flush()?;
    Ok(())
}
