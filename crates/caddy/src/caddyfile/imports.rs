//! `import` directive and snippet expansion.
//!
//! Expansion happens on the token stream before block parsing. An
//! `import` line is replaced by the tokens of the named snippet or, if no
//! snippet has that name, by the tokens of every file matching the glob
//! (resolved relative to the importing file). Imported files must stay
//! inside the directory tree of the root file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::lexer::{tokenize, Token};
use super::CaddyfileError;

/// Maximum nesting of imports (files and snippets) before giving up.
pub const MAX_IMPORT_DEPTH: usize = 10;

pub(crate) struct Expander {
    /// Directory tree imports may not leave (canonicalized).
    root_dir: PathBuf,
    /// File table indexed by `Token::file`.
    pub files: Vec<PathBuf>,
    snippets: HashMap<String, Vec<Token>>,
    /// Files currently being expanded, for cycle detection.
    stack: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl Expander {
    pub fn new(root_dir: PathBuf) -> Self {
        Self {
            root_dir,
            files: Vec::new(),
            snippets: HashMap::new(),
            stack: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize `src` (the contents of `path`) and expand its imports.
    pub fn expand_source(&mut self, src: &str, path: &Path) -> Result<Vec<Token>, CaddyfileError> {
        let idx = self.files.len();
        self.files.push(path.to_path_buf());
        let tokens = tokenize(src, idx, path)?;

        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.stack.push(canonical);
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let expanded = self.expand(tokens, &dir, 0, true);
        self.stack.pop();
        expanded
    }

    fn expand(
        &mut self,
        tokens: Vec<Token>,
        dir: &Path,
        depth: usize,
        at_top: bool,
    ) -> Result<Vec<Token>, CaddyfileError> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut nesting = 0usize;
        let mut i = 0;

        while i < tokens.len() {
            let tok = &tokens[i];
            let line_start = i == 0 || !tokens[i - 1].same_line(tok);
            let top = at_top && nesting == 0;

            if top && line_start && is_snippet_name(tok) && tokens.get(i + 1).is_some_and(Token::is_open) {
                let close = matching_close(&tokens, i + 1).ok_or_else(|| self.syntax(tok, "unclosed snippet"))?;
                let name = tok.text[1..tok.text.len() - 1].to_string();
                self.snippets.insert(name, tokens[i + 2..close].to_vec());
                i = close + 1;
                continue;
            }

            if line_start && !tok.quoted && tok.text == "import" {
                let mut end = i + 1;
                while end < tokens.len() && tokens[end].same_line(tok) && !tokens[end].is_open() {
                    end += 1;
                }
                let Some(pattern) = tokens.get(i + 1).filter(|_| end > i + 1) else {
                    return Err(self.syntax(tok, "import requires a file pattern or snippet name"));
                };
                let imported = self.import(&pattern.text, tok, dir, depth, top)?;
                out.extend(imported);
                i = end;
                continue;
            }

            if tok.is_open() {
                nesting += 1;
            } else if tok.is_close() {
                nesting = nesting.saturating_sub(1);
            }
            out.push(tok.clone());
            i += 1;
        }

        Ok(out)
    }

    fn import(
        &mut self,
        pattern: &str,
        at: &Token,
        dir: &Path,
        depth: usize,
        at_top: bool,
    ) -> Result<Vec<Token>, CaddyfileError> {
        if depth >= MAX_IMPORT_DEPTH {
            self.errors.push(format!(
                "{}: import '{pattern}' exceeds maximum import depth of {MAX_IMPORT_DEPTH}",
                self.location(at)
            ));
            return Ok(Vec::new());
        }

        if let Some(body) = self.snippets.get(pattern).cloned() {
            return self.expand(body, dir, depth + 1, at_top);
        }

        let mut out = Vec::new();
        for file in self.resolve_glob(pattern, at, dir) {
            if self.stack.contains(&file) {
                self.errors.push(format!(
                    "{}: import cycle detected through {}",
                    self.location(at),
                    file.display()
                ));
                continue;
            }
            let src = match std::fs::read_to_string(&file) {
                Ok(src) => src,
                Err(e) => {
                    self.errors.push(format!(
                        "{}: failed to read imported file {}: {e}",
                        self.location(at),
                        file.display()
                    ));
                    continue;
                }
            };

            let idx = self.files.len();
            self.files.push(file.clone());
            let tokens = tokenize(&src, idx, &file)?;
            let file_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();

            self.stack.push(file);
            let expanded = self.expand(tokens, &file_dir, depth + 1, at_top);
            self.stack.pop();
            out.extend(expanded?);
        }
        Ok(out)
    }

    /// Sorted, canonical file matches for an import glob. Problems are
    /// recorded in `errors` and yield no files.
    fn resolve_glob(&mut self, pattern: &str, at: &Token, dir: &Path) -> Vec<PathBuf> {
        let full = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            dir.join(pattern)
        };
        let entries = match glob::glob(&full.to_string_lossy()) {
            Ok(entries) => entries,
            Err(e) => {
                self.errors.push(format!(
                    "{}: invalid import pattern '{pattern}': {e}",
                    self.location(at)
                ));
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        let mut rejected = false;
        for entry in entries {
            let Ok(path) = entry else { continue };
            if !path.is_file() {
                continue;
            }
            let canonical = match path.canonicalize() {
                Ok(p) => p,
                Err(_) => continue,
            };
            if !canonical.starts_with(&self.root_dir) {
                self.errors.push(format!(
                    "{}: import '{}' is outside the configuration directory and was ignored",
                    self.location(at),
                    path.display()
                ));
                rejected = true;
                continue;
            }
            files.push(canonical);
        }
        files.sort();
        files.dedup();

        if files.is_empty() && !rejected {
            self.errors.push(format!(
                "{}: import '{pattern}' matched no files",
                self.location(at)
            ));
        }
        files
    }

    pub fn location(&self, tok: &Token) -> String {
        let file = self
            .files
            .get(tok.file)
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        format!("{file}:{}", tok.line)
    }

    fn syntax(&self, tok: &Token, message: &str) -> CaddyfileError {
        CaddyfileError::Syntax {
            file: self
                .files
                .get(tok.file)
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            line: tok.line,
            message: message.to_string(),
        }
    }
}

fn is_snippet_name(tok: &Token) -> bool {
    !tok.quoted && tok.text.len() > 2 && tok.text.starts_with('(') && tok.text.ends_with(')')
}

/// Index of the `}` closing the `{` at `open`.
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, tok) in tokens.iter().enumerate().skip(open) {
        if tok.is_open() {
            depth += 1;
        } else if tok.is_close() {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}
