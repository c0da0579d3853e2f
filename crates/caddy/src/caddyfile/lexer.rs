//! Caddyfile tokenizer.
//!
//! Tokens are separated by whitespace. Double-quoted and backtick-quoted
//! strings form single tokens. A `#` at the start of a token begins a
//! comment that runs to the end of the line. Standalone `{` and `}` are
//! structural; `{}` is split into an open and a close token.

use std::path::Path;

use super::CaddyfileError;

/// One lexical token, tagged with the file it came from and its line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub text: String,
    /// Index into the parser's file table.
    pub file: usize,
    pub line: usize,
    pub quoted: bool,
}

impl Token {
    pub fn is_open(&self) -> bool {
        !self.quoted && self.text == "{"
    }

    pub fn is_close(&self) -> bool {
        !self.quoted && self.text == "}"
    }

    pub fn same_line(&self, other: &Token) -> bool {
        self.file == other.file && self.line == other.line
    }
}

pub(crate) fn tokenize(src: &str, file: usize, path: &Path) -> Result<Vec<Token>, CaddyfileError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    let mut line = 1;
    let mut current = String::new();
    let mut current_line = 1;

    let flush = |tokens: &mut Vec<Token>, current: &mut String, at_line: usize| {
        if current.is_empty() {
            return;
        }
        let text = std::mem::take(current);
        if text == "{}" {
            for brace in ["{", "}"] {
                tokens.push(Token {
                    text: brace.to_string(),
                    file,
                    line: at_line,
                    quoted: false,
                });
            }
        } else {
            tokens.push(Token {
                text,
                file,
                line: at_line,
                quoted: false,
            });
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '\n' => {
                flush(&mut tokens, &mut current, current_line);
                line += 1;
            }
            c if c.is_whitespace() => flush(&mut tokens, &mut current, current_line),
            '#' if current.is_empty() => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '"' | '`' if current.is_empty() => {
                let start_line = line;
                let text = read_quoted(&mut chars, c, &mut line).ok_or_else(|| {
                    CaddyfileError::Syntax {
                        file: path.display().to_string(),
                        line: start_line,
                        message: "unterminated quoted string".to_string(),
                    }
                })?;
                tokens.push(Token {
                    text,
                    file,
                    line: start_line,
                    quoted: true,
                });
            }
            c => {
                if current.is_empty() {
                    current_line = line;
                }
                current.push(c);
            }
        }
    }
    flush(&mut tokens, &mut current, current_line);

    Ok(tokens)
}

/// Read up to the closing `quote`. Double quotes honour `\"` escapes;
/// backticks are raw. Returns `None` if the input ends first.
fn read_quoted(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
    line: &mut usize,
) -> Option<String> {
    let mut text = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' if quote == '"' && chars.peek() == Some(&'"') => {
                chars.next();
                text.push('"');
            }
            c if c == quote => return Some(text),
            '\n' => {
                *line += 1;
                text.push(c);
            }
            c => text.push(c),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn texts(src: &str) -> Vec<String> {
        tokenize(src, 0, Path::new("Caddyfile"))
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn splits_on_whitespace_and_tracks_lines() {
        let tokens = tokenize("a.com {\n  reverse_proxy app:80\n}\n", 0, Path::new("f")).unwrap();
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 1, 2, 2, 3]);
        assert!(tokens[1].is_open());
        assert!(tokens[4].is_close());
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(texts("import sites/* # trailing\n# whole line\n"), vec!["import", "sites/*"]);
    }

    #[test]
    fn hash_inside_token_is_kept() {
        assert_eq!(texts("respond a#b"), vec!["respond", "a#b"]);
    }

    #[test]
    fn quoted_strings_are_single_tokens() {
        let tokens = tokenize(
            "header Strict-Transport-Security \"max-age=31536000; includeSubDomains\"",
            0,
            Path::new("f"),
        )
        .unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].text, "max-age=31536000; includeSubDomains");
        assert!(tokens[2].quoted);
    }

    #[test]
    fn escaped_quote_inside_string() {
        assert_eq!(texts(r#"respond "say \"hi\"""#), vec!["respond", "say \"hi\""]);
    }

    #[test]
    fn empty_braces_become_two_tokens() {
        assert_eq!(texts("example.com {}"), vec!["example.com", "{", "}"]);
    }

    #[test]
    fn placeholder_braces_are_not_structural() {
        let tokens = tokenize("header_up Host {host}", 0, Path::new("f")).unwrap();
        assert!(!tokens[2].is_open());
        assert_eq!(tokens[2].text, "{host}");
    }

    #[test]
    fn unterminated_quote_is_syntax_error() {
        assert_matches!(
            tokenize("respond \"oops", 0, Path::new("Caddyfile")),
            Err(CaddyfileError::Syntax { line: 1, .. })
        );
    }
}
