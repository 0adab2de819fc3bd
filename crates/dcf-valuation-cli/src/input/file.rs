use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Input document formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }
}

/// Read a JSON or YAML file and deserialise into a typed struct.
pub fn read_input<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value = parse(&contents, Format::from_path(&canonical))
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    tracing::info!(path = %canonical.display(), "loaded input file");
    Ok(value)
}

/// Read a JSON or YAML file as a generic serde_json::Value.
pub fn read_input_value(path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    read_input(path)
}

fn parse<T: DeserializeOwned>(
    contents: &str,
    format: Format,
) -> Result<T, Box<dyn std::error::Error>> {
    Ok(match format {
        Format::Json => serde_json::from_str(contents)?,
        Format::Yaml => serde_yaml::from_str(contents)?,
    })
}

/// Resolve and validate the path.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcf_valuation_core::valuation::peers::PeerRecord;

    #[test]
    fn test_format_by_extension() {
        assert_eq!(Format::from_path(Path::new("a.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.YML")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("a")), Format::Json);
    }

    #[test]
    fn test_yaml_peers_parse() {
        let yaml = "- ticker: LRCX\n  price_to_earnings: 24.5\n- ticker: AMAT\n  ev_to_ebitda: '16'\n";
        let peers: Vec<PeerRecord> = parse(yaml, Format::Yaml).unwrap();
        assert_eq!(peers.len(), 2);
        assert!(peers[0].price_to_earnings.is_some());
        assert!(peers[1].price_to_earnings.is_none());
    }

    #[test]
    fn test_read_input_from_disk() {
        let path = std::env::temp_dir().join(format!("dcfv-input-{}.json", std::process::id()));
        fs::write(&path, r#"{"ticker": "KLAC", "price_to_sales": "9"}"#).unwrap();
        let peer: PeerRecord = read_input(path.to_str().unwrap()).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(peer.ticker, "KLAC");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_input_value("/definitely/not/here.json").is_err());
    }
}
