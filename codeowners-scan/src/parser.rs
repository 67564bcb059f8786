use crate::owner::Owner;

/// Parse a CODEOWNERS file from a string, returning a `ParseResult` containing
/// the parsed entries and any diagnostics encountered. Parsing never fails:
/// blank lines and comments are skipped, and problems on a line are reported
/// as diagnostics without dropping the line's pattern.
pub fn parse(source: &str) -> ParseResult {
    Parser::new(source).parse()
}

/// The result of parsing a CODEOWNERS file. Contains the entries in line
/// order and any diagnostics. Unlike pattern compilation errors, diagnostics
/// never remove an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseResult {
    pub entries: Vec<ParsedEntry>,
    pub errors: Vec<ParseError>,
}

/// A single declaration line: a pattern and at most one owner. A line with
/// only a pattern is valid and yields an entry without an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub pattern: String,
    pub owner: Option<Owner>,
    /// 1-based line number in the source file.
    pub line: usize,
}

/// A non-fatal problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, line: usize) -> ParseError {
        ParseError {
            message: message.into(),
            line,
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> ParseResult {
        let mut entries = Vec::new();
        for (idx, line) in self.source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(entry) = self.parse_entry(line, idx + 1) {
                entries.push(entry);
            }
        }

        ParseResult {
            entries,
            errors: self.errors,
        }
    }

    fn parse_entry(&mut self, line: &str, line_number: usize) -> Option<ParsedEntry> {
        // Everything from a token starting with `#` onwards is a trailing comment
        let mut tokens = line
            .split_whitespace()
            .take_while(|token| !token.starts_with('#'));

        let pattern = tokens.next()?.to_owned();
        let owner = tokens.next().map(Owner::new);

        let extra_owners = tokens.collect::<Vec<_>>();
        if !extra_owners.is_empty() {
            self.errors.push(ParseError::new(
                format!(
                    "only the first owner is kept, ignoring {}",
                    extra_owners.join(" ")
                ),
                line_number,
            ));
        }

        Some(ParsedEntry {
            pattern,
            owner,
            line: line_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pattern: &str, owner: Option<&str>, line: usize) -> ParsedEntry {
        ParsedEntry {
            pattern: pattern.to_owned(),
            owner: owner.map(Owner::new),
            line,
        }
    }

    #[test]
    fn test_parser() {
        let examples = vec![
            ("", vec![], vec![]),
            ("foo", vec![entry("foo", None, 1)], vec![]),
            (" foo ", vec![entry("foo", None, 1)], vec![]),
            (
                "foo\nbar\r\n \nbaz",
                vec![
                    entry("foo", None, 1),
                    entry("bar", None, 2),
                    entry("baz", None, 4),
                ],
                vec![],
            ),
            ("foo @bar", vec![entry("foo", Some("@bar"), 1)], vec![]),
            ("foo\t  alice", vec![entry("foo", Some("alice"), 1)], vec![]),
            ("foo#abc", vec![entry("foo#abc", None, 1)], vec![]),
            ("foo # abc", vec![entry("foo", None, 1)], vec![]),
            (
                "\n foo @bar # baz \n",
                vec![entry("foo", Some("@bar"), 2)],
                vec![],
            ),
            (
                "a/b @c/d e@f.co",
                vec![entry("a/b", Some("@c/d"), 1)],
                vec![ParseError::new("only the first owner is kept, ignoring e@f.co", 1)],
            ),
            (
                "# a\nfoo @x # b\n# c\n   # d\n\nbar @y\n",
                vec![entry("foo", Some("@x"), 2), entry("bar", Some("@y"), 6)],
                vec![],
            ),
        ];

        for (source, entries, errors) in examples {
            assert_eq!(
                parse(source),
                ParseResult { entries, errors },
                "result mismatch for `{}`",
                source
            );
        }
    }

    #[test]
    fn test_parse_error_display() {
        let result = parse("docs/ @org/docs @alice @bob");
        assert_eq!(
            result.errors[0].to_string(),
            "line 1: only the first owner is kept, ignoring @alice @bob"
        );
        assert_eq!(result.entries[0].owner, Some(Owner::new("@org/docs")));
    }
}
