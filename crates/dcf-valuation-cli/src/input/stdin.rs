use serde_json::Value;
use std::io::{self, Read};

/// Read piped JSON from stdin.
/// Returns None if stdin is a TTY or nothing was piped.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(trimmed)?;
    tracing::debug!("read input from stdin");
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_is_none() {
        assert!(parse_piped("  \n").unwrap().is_none());
    }

    #[test]
    fn test_json_is_parsed() {
        let v = parse_piped(r#"{"peers": []}"#).unwrap().unwrap();
        assert!(v["peers"].is_array());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse_piped("not json").is_err());
    }
}
