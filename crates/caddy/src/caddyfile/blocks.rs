//! Site-block parsing over an import-expanded token stream.

use super::lexer::Token;
use super::CaddyfileError;

/// One directive line, with its nested block if it opened one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Directive {
    pub name: String,
    pub args: Vec<String>,
    pub block: Vec<Directive>,
}

impl Directive {
    /// Depth-first walk over this directive and everything nested in it.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Directive)) {
        visit(self);
        for child in &self.block {
            child.walk(visit);
        }
    }
}

/// A site: its addresses and directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SiteBlock {
    pub addresses: Vec<String>,
    pub directives: Vec<Directive>,
    /// Index into the file table of the file that declared the site.
    pub file: usize,
}

impl SiteBlock {
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&'a Directive)) {
        for directive in &self.directives {
            directive.walk(&mut visit);
        }
    }
}

pub(crate) struct BlockParser<'t> {
    tokens: &'t [Token],
    pos: usize,
    file_names: &'t [std::path::PathBuf],
    pub errors: Vec<String>,
}

impl<'t> BlockParser<'t> {
    pub fn new(tokens: &'t [Token], file_names: &'t [std::path::PathBuf]) -> Self {
        Self {
            tokens,
            pos: 0,
            file_names,
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Result<(Vec<SiteBlock>, Vec<String>), CaddyfileError> {
        let mut sites: Vec<SiteBlock> = Vec::new();
        // Index of a site declared without braces; following non-address
        // lines belong to it.
        let mut open_braceless: Option<usize> = None;
        let mut first = true;

        while let Some(tok) = self.tokens.get(self.pos) {
            if tok.is_close() {
                return Err(self.syntax(tok, "unexpected '}'"));
            }
            if tok.is_open() {
                if !first {
                    return Err(self.syntax(tok, "unexpected '{' without a site address"));
                }
                // Global options block.
                self.pos += 1;
                self.skip_block(tok)?;
                first = false;
                continue;
            }
            first = false;

            let mut line = self.take_line();
            let head = line[0].clone();

            if !looks_like_address(&head.text) {
                match open_braceless {
                    Some(idx) => {
                        let directive = self.directive_from_line(line)?;
                        sites[idx].directives.push(directive);
                    }
                    None => {
                        self.errors.push(format!(
                            "{}: directive '{}' outside of a site block was ignored",
                            self.location(&head),
                            head.text
                        ));
                        if line.last().is_some_and(Token::is_open) {
                            self.skip_block(&head)?;
                        }
                    }
                }
                continue;
            }

            // Addresses may continue on the next line after a trailing comma.
            while !line.last().is_some_and(Token::is_open)
                && line.last().is_some_and(|t| t.text.ends_with(','))
                && self.pos < self.tokens.len()
                && !self.tokens[self.pos].is_open()
                && !self.tokens[self.pos].is_close()
            {
                line.extend(self.take_line());
            }

            let opens_block = line.last().is_some_and(Token::is_open);
            if opens_block {
                line.pop();
            }
            let addresses = split_addresses(&line);
            let mut site = SiteBlock {
                addresses,
                directives: Vec::new(),
                file: head.file,
            };

            if opens_block {
                site.directives = self.parse_block_body(&head)?;
                open_braceless = None;
                sites.push(site);
            } else {
                sites.push(site);
                open_braceless = Some(sites.len() - 1);
            }
        }

        Ok((sites, self.errors))
    }

    /// Collect the tokens of the current line. Stops after an opening
    /// brace and before a closing brace that is not the first token.
    fn take_line(&mut self) -> Vec<Token> {
        let mut line = Vec::new();
        let Some(first) = self.tokens.get(self.pos) else {
            return line;
        };
        line.push(first.clone());
        self.pos += 1;
        if first.is_open() {
            return line;
        }
        while let Some(tok) = self.tokens.get(self.pos) {
            if !tok.same_line(first) || tok.is_close() {
                break;
            }
            line.push(tok.clone());
            self.pos += 1;
            if tok.is_open() {
                break;
            }
        }
        line
    }

    /// Parse directives until the `}` matching an already-consumed `{`.
    fn parse_block_body(&mut self, opener: &Token) -> Result<Vec<Directive>, CaddyfileError> {
        let mut directives = Vec::new();
        loop {
            let Some(tok) = self.tokens.get(self.pos) else {
                return Err(self.syntax(opener, "unclosed block"));
            };
            if tok.is_close() {
                self.pos += 1;
                return Ok(directives);
            }
            let line = self.take_line();
            directives.push(self.directive_from_line(line)?);
        }
    }

    fn directive_from_line(&mut self, mut line: Vec<Token>) -> Result<Directive, CaddyfileError> {
        let head = line[0].clone();
        if head.is_open() {
            return Err(self.syntax(&head, "unexpected '{'"));
        }
        let block = if line.last().is_some_and(Token::is_open) {
            line.pop();
            self.parse_block_body(&head)?
        } else {
            Vec::new()
        };
        Ok(Directive {
            name: head.text,
            args: line.into_iter().skip(1).map(|t| t.text).collect(),
            block,
        })
    }

    /// Skip to the `}` matching an already-consumed `{`.
    fn skip_block(&mut self, opener: &Token) -> Result<(), CaddyfileError> {
        let mut depth = 1usize;
        while let Some(tok) = self.tokens.get(self.pos) {
            self.pos += 1;
            if tok.is_open() {
                depth += 1;
            } else if tok.is_close() {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
        Err(self.syntax(opener, "unclosed block"))
    }

    fn file_name(&self, tok: &Token) -> String {
        self.file_names
            .get(tok.file)
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    fn location(&self, tok: &Token) -> String {
        format!("{}:{}", self.file_name(tok), tok.line)
    }

    fn syntax(&self, tok: &Token, message: &str) -> CaddyfileError {
        CaddyfileError::Syntax {
            file: self.file_name(tok),
            line: tok.line,
            message: message.to_string(),
        }
    }
}

/// Heuristic used for brace-less sites: directive names never contain a
/// dot, a colon, a slash or a wildcard, while site addresses almost always
/// do.
pub(crate) fn looks_like_address(token: &str) -> bool {
    token == "localhost"
        || token.contains('.')
        || token.contains(':')
        || token.starts_with('*')
        || token.starts_with('[')
}

fn split_addresses(tokens: &[Token]) -> Vec<String> {
    tokens
        .iter()
        .flat_map(|t| t.text.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
