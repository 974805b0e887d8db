//! Turns dotenv text into an ordered list of `(name, value)` entries. No
//! `${VAR}` interpolation is performed; values are taken literally apart from
//! quote handling and double-quote escapes.

use crate::error::{Error, Result};

/// One parsed line. `value` is `None` for a bare name, which unsets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub value: Option<String>,
}

impl Entry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn unset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

pub trait EntryParser {
    fn parse(&self, content: &str) -> Result<Vec<Entry>>;
}

/// Line-oriented dotenv parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineParser;

impl EntryParser for LineParser {
    fn parse(&self, content: &str) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);
            let entry = parse_line(line).map_err(|reason| {
                Error::InvalidSource(format!("line {}: {reason}", index + 1))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

fn parse_line(line: &str) -> std::result::Result<Entry, String> {
    let Some((name, rest)) = line.split_once('=') else {
        validate_name(line)?;
        return Ok(Entry::unset(line));
    };
    let name = name.trim();
    validate_name(name)?;
    Ok(Entry::new(name, parse_value(rest.trim_start())?))
}

fn validate_name(name: &str) -> std::result::Result<(), String> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')) {
        Ok(())
    } else {
        Err(format!("invalid variable name `{name}`"))
    }
}

fn parse_value(raw: &str) -> std::result::Result<String, String> {
    if let Some(rest) = raw.strip_prefix('\'') {
        let end = rest.find('\'').ok_or("unterminated single-quoted value")?;
        return trailing_is_comment(&rest[end + 1..]).map(|_| rest[..end].to_string());
    }
    if let Some(rest) = raw.strip_prefix('"') {
        let mut value = String::new();
        let mut chars = rest.char_indices();
        while let Some((index, c)) = chars.next() {
            match c {
                '"' => return trailing_is_comment(&rest[index + 1..]).map(|_| value),
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, other @ ('"' | '\\' | '$'))) => value.push(other),
                    Some((_, other)) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => break,
                },
                other => value.push(other),
            }
        }
        return Err("unterminated double-quoted value".to_string());
    }

    let value = match raw.find(" #") {
        Some(comment) => &raw[..comment],
        None => raw,
    };
    let value = value.trim_end();
    if value.chars().any(char::is_whitespace) {
        return Err("unquoted value contains whitespace".to_string());
    }
    Ok(value.to_string())
}

fn trailing_is_comment(rest: &str) -> std::result::Result<(), String> {
    let rest = rest.trim();
    if rest.is_empty() || rest.starts_with('#') {
        Ok(())
    } else {
        Err("unexpected characters after quoted value".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{Entry, EntryParser, LineParser};

    #[test]
    fn parses_common_forms() {
        let content = r#"
# database
DB_DRIVER=pdo_mysql
export DB_HOST = localhost
DB_PASSWORD='pa$$w0rd'
SPACED="with spaces"
ESCAPED="line\nbreak \"quoted\""
PORT=3306 # comment
NULL=
UNSET
APP.DB.HOST=nested
"#;
        let entries = LineParser.parse(content).expect("parse");
        assert_eq!(
            entries,
            vec![
                Entry::new("DB_DRIVER", "pdo_mysql"),
                Entry::new("DB_HOST", "localhost"),
                Entry::new("DB_PASSWORD", "pa$$w0rd"),
                Entry::new("SPACED", "with spaces"),
                Entry::new("ESCAPED", "line\nbreak \"quoted\""),
                Entry::new("PORT", "3306"),
                Entry::new("NULL", ""),
                Entry::unset("UNSET"),
                Entry::new("APP.DB.HOST", "nested"),
            ]
        );
    }

    #[test]
    fn keeps_encrypted_values_intact() {
        let entries = LineParser
            .parse("DB_HOST=\"encrypted:BDqDBibm4wsYqMpCjTQ6BsDHmMadg9K3dAt+Z9HPMfLEIRVz50hmLXPXRuDBXaJi/LwWYEVUNiq0HISrslzQPaoyS8Lotg3gFWJTsQCkrSQ5AhhMwsNJHEbnHy+W0zbfI3LNaBB2cQRFqSFLl2ABe8NA=\"")
            .expect("parse");
        let value = entries[0].value.as_deref().expect("value");
        assert!(value.starts_with("encrypted:BDq"));
        assert!(value.ends_with("8NA="));
    }

    #[test]
    fn reports_invalid_lines() {
        let err = LineParser.parse("OK=1\n1BAD=2").unwrap_err();
        assert!(format!("{err}").contains("line 2"));

        assert!(LineParser.parse("A=\"open").is_err());
        assert!(LineParser.parse("A=two words").is_err());
        assert!(LineParser.parse("A='x' trailing").is_err());
    }
}
