//! Custom value parsers for CLI arguments.

use std::path::PathBuf;

use courier_http::Method;

/// Parse an HTTP method, case-insensitively. Extension methods are allowed.
pub fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_bytes(s.to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("Invalid HTTP method: {s}"))
}

/// Parse a key=value pair
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid key=value pair: {s}"))?;
    if key.is_empty() {
        return Err(format!("Missing key in: {s}"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse a `Name: value` header
pub fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("Invalid header, expected 'Name: value': {s}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Missing header name in: {s}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parse `user:pass` credentials. The password may contain colons.
pub fn parse_credentials(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(user, pass)| (user.to_string(), pass.to_string()))
        .ok_or_else(|| "Invalid credentials, expected user:pass".to_string())
}

/// A file to upload as one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArg {
    pub field: String,
    pub path: PathBuf,
}

impl FileArg {
    /// The filename announced for the part: the last path component.
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.field.clone())
    }
}

/// Parse `field=@path`
pub fn parse_file(s: &str) -> Result<FileArg, String> {
    let (field, path) = parse_key_value(s)?;
    let path = path
        .strip_prefix('@')
        .ok_or_else(|| format!("Invalid file argument, expected field=@path: {s}"))?;
    if path.is_empty() {
        return Err(format!("Missing path in: {s}"));
    }
    Ok(FileArg {
        field,
        path: PathBuf::from(path),
    })
}

/// A request body given inline or read from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataArg {
    Inline(String),
    File(PathBuf),
}

/// Parse `text` or `@path`
pub fn parse_data(s: &str) -> Result<DataArg, String> {
    match s.strip_prefix('@') {
        Some("") => Err("Missing path after '@'".to_string()),
        Some(path) => Ok(DataArg::File(PathBuf::from(path))),
        None => Ok(DataArg::Inline(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method("Patch").unwrap(), Method::PATCH);
        assert_eq!(parse_method("purge").unwrap().as_str(), "PURGE");
        assert!(parse_method("no spaces").is_err());
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_key_value("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Accept:  application/json ").unwrap(),
            ("Accept".to_string(), "application/json".to_string())
        );
        assert_eq!(
            parse_header("X-Time: 12:30").unwrap(),
            ("X-Time".to_string(), "12:30".to_string())
        );
        assert!(parse_header("Accept application/json").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_parse_credentials() {
        assert_eq!(
            parse_credentials("user:p:ss").unwrap(),
            ("user".to_string(), "p:ss".to_string())
        );
        assert!(parse_credentials("user").is_err());
    }

    #[test]
    fn test_parse_file() {
        let file = parse_file("upload=@/tmp/report.csv").unwrap();
        assert_eq!(file.field, "upload");
        assert_eq!(file.path, PathBuf::from("/tmp/report.csv"));
        assert_eq!(file.filename(), "report.csv");

        assert!(parse_file("upload=/tmp/report.csv").is_err());
        assert!(parse_file("upload=@").is_err());
    }

    #[test]
    fn test_parse_data() {
        assert_eq!(
            parse_data("hello").unwrap(),
            DataArg::Inline("hello".to_string())
        );
        assert_eq!(
            parse_data("@body.json").unwrap(),
            DataArg::File(PathBuf::from("body.json"))
        );
        assert!(parse_data("@").is_err());
    }
}
