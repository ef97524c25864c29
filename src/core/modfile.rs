//! `go.mod` descriptor files.
//!
//! The parser keeps every source line as written. Edits replace single
//! tokens in place, so a file serializes byte-for-byte identically except
//! for the values that were changed.
//!
//! ```text
//! module example.com/app
//!
//! go 1.20
//!
//! require (
//!     example.com/lib v1.0.0
//!     example.com/other v0.3.1 // indirect
//! )
//! ```

use std::fmt;
use std::ops::Range;

use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Directives accepted at the top level of a `go.mod` file.
const KNOWN_VERBS: &[&str] = &[
    "module", "go", "toolchain", "godebug", "require", "exclude", "replace", "retract", "tool",
    "ignore",
];

/// Directives that may open a `verb ( ... )` block.
const BLOCK_VERBS: &[&str] = &[
    "godebug", "require", "exclude", "replace", "retract", "tool", "ignore",
];

/// A syntax error in a descriptor file.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{file}:{line}: {message}")]
pub struct ParseError {
    pub file: String,
    /// 1-based line number
    pub line: usize,
    pub message: String,
}

impl ParseError {
    /// A diagnostic pointing at the offending line.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(format!("failed to parse {}", self.file))
            .with_location(format!("{}:{}", self.file, self.line))
            .with_context(self.message.clone())
    }
}

/// One `require` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub path: String,
    pub version: String,
    /// Marked `// indirect`
    pub indirect: bool,
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    span: Range<usize>,
    quoted: bool,
}

/// Position of an editable token.
#[derive(Debug, Clone)]
struct Slot {
    line: usize,
    span: Range<usize>,
    quoted: bool,
}

#[derive(Debug, Clone)]
struct RequireEntry {
    requirement: Requirement,
    version: Slot,
}

/// A parsed `go.mod` file.
#[derive(Debug, Clone)]
pub struct ModFile {
    /// Source lines without their `\n`; a trailing newline leaves a final empty line
    lines: Vec<String>,
    module: Option<(String, usize)>,
    go: Option<(String, Slot)>,
    requires: Vec<RequireEntry>,
}

impl ModFile {
    /// Parse descriptor content. `file` is only used in error messages.
    pub fn parse(file: &str, content: &str) -> Result<Self, ParseError> {
        let lines: Vec<String> = content.split('\n').map(str::to_string).collect();
        let mut modfile = ModFile {
            lines: Vec::new(),
            module: None,
            go: None,
            requires: Vec::new(),
        };
        let err = |line: usize, message: String| ParseError {
            file: file.to_string(),
            line: line + 1,
            message,
        };

        let mut block: Option<(String, usize)> = None;
        for (idx, line) in lines.iter().enumerate() {
            let (tokens, comment) = lex(line).map_err(|m| err(idx, m))?;
            if tokens.is_empty() {
                continue;
            }

            if let Some((verb, _)) = &block {
                if tokens[0].text == ")" && !tokens[0].quoted {
                    if tokens.len() > 1 {
                        return Err(err(idx, "unexpected tokens after `)`".to_string()));
                    }
                    block = None;
                    continue;
                }
                let verb = verb.clone();
                modfile
                    .statement(&verb, idx, &tokens, comment)
                    .map_err(|m| err(idx, m))?;
                continue;
            }

            let verb = tokens[0].text.as_str();
            if tokens[0].quoted || !KNOWN_VERBS.contains(&verb) {
                return Err(err(idx, format!("unknown directive: {}", tokens[0].text)));
            }

            let opens_block = tokens.len() >= 2 && tokens[1].text == "(" && !tokens[1].quoted;
            if opens_block {
                if !BLOCK_VERBS.contains(&verb) {
                    return Err(err(idx, format!("`{}` does not take a block", verb)));
                }
                match tokens.len() {
                    2 => block = Some((verb.to_string(), idx)),
                    3 if tokens[2].text == ")" => {}
                    _ => return Err(err(idx, "unexpected tokens after `(`".to_string())),
                }
                continue;
            }

            modfile
                .statement(verb, idx, &tokens[1..], comment)
                .map_err(|m| err(idx, m))?;
        }

        if let Some((verb, start)) = block {
            return Err(err(start, format!("unterminated `{}` block", verb)));
        }

        modfile.lines = lines;
        Ok(modfile)
    }

    fn statement(
        &mut self,
        verb: &str,
        line: usize,
        args: &[Token],
        comment: Option<&str>,
    ) -> Result<(), String> {
        match verb {
            "module" => {
                if args.len() != 1 {
                    return Err("usage: module module/path".to_string());
                }
                if self.module.is_some() {
                    return Err("repeated module statement".to_string());
                }
                self.module = Some((args[0].text.clone(), line));
            }
            "go" => {
                if args.len() != 1 {
                    return Err("usage: go 1.23".to_string());
                }
                if self.go.is_some() {
                    return Err("repeated go statement".to_string());
                }
                self.go = Some((args[0].text.clone(), slot(line, &args[0])));
            }
            "require" => {
                if args.len() != 2 {
                    return Err("usage: require module/path v1.2.3".to_string());
                }
                self.requires.push(RequireEntry {
                    requirement: Requirement {
                        path: args[0].text.clone(),
                        version: args[1].text.clone(),
                        indirect: comment.is_some_and(is_indirect),
                    },
                    version: slot(line, &args[1]),
                });
            }
            // Other directives are carried through untouched.
            _ => {}
        }
        Ok(())
    }

    /// The module path from the `module` statement.
    pub fn module_path(&self) -> Option<&str> {
        self.module.as_ref().map(|(path, _)| path.as_str())
    }

    /// The version from the `go` directive.
    pub fn go_version(&self) -> Option<&str> {
        self.go.as_ref().map(|(version, _)| version.as_str())
    }

    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.requires.iter().map(|r| &r.requirement)
    }

    /// Set the `go` directive, adding one after the `module` line if missing.
    pub fn set_go_version(&mut self, version: &str) {
        if let Some((current, slot)) = &mut self.go {
            let slot = slot.clone();
            *current = version.to_string();
            let new_slot = self.replace_token(&slot, version);
            if let Some((_, s)) = &mut self.go {
                *s = new_slot;
            }
            return;
        }

        let at = self.module.as_ref().map(|(_, line)| line + 1).unwrap_or(0);
        let cr = self.line_suffix();
        let directive = format!("go {}{}", version, cr);
        let inserted = if at == 0 {
            vec![directive, cr.to_string()]
        } else {
            vec![cr.to_string(), directive]
        };
        let go_line = if at == 0 { at } else { at + 1 };
        self.insert_lines(at, inserted);
        self.go = Some((
            version.to_string(),
            Slot {
                line: go_line,
                span: 3..3 + version.len(),
                quoted: false,
            },
        ));
    }

    /// Set the version of the `index`-th requirement.
    pub fn set_requirement_version(&mut self, index: usize, version: &str) {
        let Some(entry) = self.requires.get(index) else {
            return;
        };
        let slot = entry.version.clone();
        let new_slot = self.replace_token(&slot, version);

        let entry = &mut self.requires[index];
        entry.requirement.version = version.to_string();
        entry.version = new_slot;
    }

    /// Text of the last comment-only line, if the file ends in one.
    pub fn trailing_comment(&self) -> Option<&str> {
        let last = self.lines.iter().rev().find(|l| !l.trim().is_empty())?;
        last.trim().strip_prefix("//").map(str::trim)
    }

    /// Append a `// text` comment line at the end of the file.
    pub fn add_comment(&mut self, text: &str) {
        let cr = self.line_suffix();
        let ends_with_newline = self.lines.last().is_some_and(String::is_empty);
        if ends_with_newline {
            self.lines.pop();
        } else if let Some(last) = self.lines.last_mut() {
            last.push_str(cr);
        }
        let needs_gap = self
            .lines
            .last()
            .is_some_and(|l| !l.trim().is_empty() && !l.trim().starts_with("//"));
        if needs_gap {
            self.lines.push(cr.to_string());
        }
        self.lines.push(format!("// {}{}", text, cr));
        self.lines.push(String::new());
    }

    /// `"\r"` for CRLF files, so inserted lines keep the file's line endings.
    fn line_suffix(&self) -> &'static str {
        if self.lines.iter().any(|l| l.ends_with('\r')) {
            "\r"
        } else {
            ""
        }
    }

    /// Serialize back to text.
    pub fn format(&self) -> String {
        self.lines.join("\n")
    }

    fn replace_token(&mut self, slot: &Slot, value: &str) -> Slot {
        let rendered = if slot.quoted {
            format!("{:?}", value)
        } else {
            value.to_string()
        };
        let line = &mut self.lines[slot.line];
        line.replace_range(slot.span.clone(), &rendered);

        let end = slot.span.start + rendered.len();
        // Later slots on the same line shift by the length difference.
        let shift = |s: &mut Slot| {
            if s.line == slot.line && s.span.start >= slot.span.end {
                let len = s.span.len();
                s.span.start = s.span.start + end - slot.span.end;
                s.span.end = s.span.start + len;
            }
        };
        if let Some((_, s)) = &mut self.go {
            shift(s);
        }
        for entry in &mut self.requires {
            shift(&mut entry.version);
        }

        Slot {
            line: slot.line,
            span: slot.span.start..end,
            quoted: slot.quoted,
        }
    }

    fn insert_lines(&mut self, at: usize, new_lines: Vec<String>) {
        let count = new_lines.len();
        self.lines.splice(at..at, new_lines);

        if let Some((_, line)) = &mut self.module {
            if *line >= at {
                *line += count;
            }
        }
        if let Some((_, s)) = &mut self.go {
            if s.line >= at {
                s.line += count;
            }
        }
        for entry in &mut self.requires {
            if entry.version.line >= at {
                entry.version.line += count;
            }
        }
    }
}

impl fmt::Display for ModFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

fn slot(line: usize, token: &Token) -> Slot {
    Slot {
        line,
        span: token.span.clone(),
        quoted: token.quoted,
    }
}

/// `// indirect` or `// indirect; other notes`.
fn is_indirect(comment: &str) -> bool {
    let fields: Vec<&str> = comment.split_whitespace().collect();
    matches!(fields.as_slice(), ["indirect"]) || matches!(fields.as_slice(), ["indirect;", _, ..])
}

/// Split one line into tokens and an optional trailing comment body.
fn lex(line: &str) -> Result<(Vec<Token>, Option<&str>), String> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c == b' ' || c == b'\t' || c == b'\r' {
            i += 1;
            continue;
        }
        if line[i..].starts_with("//") {
            return Ok((tokens, Some(&line[i + 2..])));
        }

        let start = i;
        match c {
            b'(' | b')' => {
                i += 1;
                tokens.push(Token {
                    text: line[start..i].to_string(),
                    span: start..i,
                    quoted: false,
                });
            }
            b'"' => {
                let mut text = String::new();
                i += 1;
                loop {
                    match bytes.get(i) {
                        None => return Err("unterminated quoted string".to_string()),
                        Some(b'"') => break,
                        Some(b'\\') => {
                            let Some(escaped) = line[i + 1..].chars().next() else {
                                return Err("unterminated quoted string".to_string());
                            };
                            text.push(escaped);
                            i += 1 + escaped.len_utf8();
                        }
                        Some(_) => {
                            let ch = line[i..].chars().next().unwrap_or_default();
                            text.push(ch);
                            i += ch.len_utf8();
                        }
                    }
                }
                i += 1;
                tokens.push(Token {
                    text,
                    span: start..i,
                    quoted: true,
                });
            }
            b'`' => {
                let Some(len) = line[i + 1..].find('`') else {
                    return Err("unterminated raw string".to_string());
                };
                i += len + 2;
                tokens.push(Token {
                    text: line[start + 1..i - 1].to_string(),
                    span: start..i,
                    quoted: true,
                });
            }
            _ => {
                while i < bytes.len()
                    && !matches!(bytes[i], b' ' | b'\t' | b'\r' | b'(' | b')' | b'"' | b'`')
                {
                    i += 1;
                }
                tokens.push(Token {
                    text: line[start..i].to_string(),
                    span: start..i,
                    quoted: false,
                });
            }
        }
    }

    Ok((tokens, None))
}
