//! Comment stripping and statement splitting for migration scripts.
//!
//! A statement ends only where the delimiter is the last token on a line, so
//! a `;` in the middle of a line (or inside a string literal) never splits.
//! Dialect quirks are expressed through [`SplitOptions`].

/// Dialect-specific splitting rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOptions {
    /// Statement delimiter, expected at the end of a line
    pub delimiter: String,

    /// Line that on its own separates batches (MSSQL `GO`)
    pub batch_separator: Option<String>,

    /// Treat `#` as a line comment (MySQL)
    pub hash_comments: bool,

    /// Honour `DELIMITER xx` directive lines (MySQL client syntax)
    pub delimiter_directive: bool,

    /// Backslash escapes the next character inside string literals (MySQL)
    pub backslash_escapes: bool,

    /// Recognise `$$ ... $$` / `$tag$ ... $tag$` bodies (PostgreSQL)
    pub dollar_quotes: bool,

    /// Backslash escapes apply inside `E'...'` literals only (PostgreSQL)
    pub escape_strings: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            delimiter: ";".to_string(),
            batch_separator: None,
            hash_comments: false,
            delimiter_directive: false,
            backslash_escapes: false,
            dollar_quotes: false,
            escape_strings: false,
        }
    }
}

/// Strip comments and split a script into individual statements.
///
/// Returned statements are trimmed and carry no trailing delimiter. Empty
/// statements (e.g. a script holding only comments) are dropped.
pub fn split_statements(script: &str, opts: &SplitOptions) -> Vec<String> {
    let mut statements = Vec::new();
    let mut buffer = String::new();
    let mut delimiter = opts.delimiter.clone();
    let mut state = LexState::Normal;

    for raw_line in script.lines() {
        if state == LexState::Normal {
            let trimmed = raw_line.trim();

            if opts.delimiter_directive {
                if let Some(new_delim) = parse_delimiter_directive(trimmed) {
                    flush(&mut buffer, &mut statements);
                    delimiter = new_delim;
                    continue;
                }
            }

            if let Some(sep) = &opts.batch_separator {
                if trimmed.eq_ignore_ascii_case(sep) {
                    flush(&mut buffer, &mut statements);
                    continue;
                }
            }
        }

        let cleaned = strip_line(raw_line, &mut state, opts);

        if state == LexState::Normal {
            let tail = cleaned.trim_end();
            if let Some(body) = tail.strip_suffix(delimiter.as_str()) {
                buffer.push_str(body);
                flush(&mut buffer, &mut statements);
                continue;
            }
        }

        buffer.push_str(&cleaned);
        buffer.push('\n');
    }

    flush(&mut buffer, &mut statements);
    statements
}

/// Remove all comments from a script while keeping string literals intact.
pub fn strip_comments(script: &str, opts: &SplitOptions) -> String {
    let mut state = LexState::Normal;
    script
        .lines()
        .map(|line| strip_line(line, &mut state, opts))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Canonical form of a statement used to compare script fragments.
///
/// Outside quoted literals, text is lowercased and whitespace runs collapse
/// to one space. Literal contents are kept as written.
pub fn normalize_statement(statement: &str) -> String {
    let mut out = String::with_capacity(statement.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for c in statement.trim().chars() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => pending_space = true,
            None => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                if matches!(c, '\'' | '"' | '`') {
                    quote = Some(c);
                }
                out.extend(c.to_lowercase());
            }
        }
    }

    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LexState {
    Normal,
    /// Inside a literal; the flag is set when backslash escapes apply
    Quoted(char, bool),
    DollarQuoted(String),
    BlockComment,
}

fn strip_line(line: &str, state: &mut LexState, opts: &SplitOptions) -> String {
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while let Some(c) = line[i..].chars().next() {
        let rest = &line[i..];
        match state {
            LexState::BlockComment => {
                if rest.starts_with("*/") {
                    i += 2;
                    *state = LexState::Normal;
                    continue;
                }
            }
            LexState::DollarQuoted(tag) => {
                if rest.starts_with(tag.as_str()) {
                    out.push_str(tag);
                    i += tag.len();
                    *state = LexState::Normal;
                    continue;
                }
                out.push(c);
            }
            LexState::Quoted(q, escapes) => {
                let q = *q;
                let escapes = *escapes;
                out.push(c);
                if escapes && c == '\\' {
                    if let Some(next) = rest[1..].chars().next() {
                        out.push(next);
                        i += 1 + next.len_utf8();
                        continue;
                    }
                } else if c == q {
                    // doubled quote is an escaped quote
                    if rest[1..].starts_with(q) {
                        out.push(q);
                        i += 2;
                        continue;
                    }
                    *state = LexState::Normal;
                }
            }
            LexState::Normal => {
                if rest.starts_with("--") || (opts.hash_comments && c == '#') {
                    break;
                }
                if rest.starts_with("/*") {
                    *state = LexState::BlockComment;
                    i += 2;
                    continue;
                }
                if opts.dollar_quotes && c == '$' {
                    if let Some(tag) = dollar_tag(rest) {
                        out.push_str(&tag);
                        i += tag.len();
                        *state = LexState::DollarQuoted(tag);
                        continue;
                    }
                }
                if matches!(c, '\'' | '"' | '`') {
                    let escapes = opts.backslash_escapes
                        || (opts.escape_strings && c == '\'' && is_escape_prefix(&line[..i]));
                    *state = LexState::Quoted(c, escapes);
                }
                out.push(c);
            }
        }
        i += c.len_utf8();
    }

    out
}

/// Whether `before` ends in a standalone `E`/`e`, making the next literal a
/// PostgreSQL escape string.
fn is_escape_prefix(before: &str) -> bool {
    let mut rev = before.chars().rev();
    match rev.next() {
        Some('E' | 'e') => !rev
            .next()
            .is_some_and(|ch| ch.is_alphanumeric() || ch == '_' || ch == '$'),
        _ => false,
    }
}

/// Read a PostgreSQL dollar-quote opener (`$$` or `$tag$`) at the start of `s`.
fn dollar_tag(s: &str) -> Option<String> {
    let body = &s[1..];
    let end = body.find('$')?;
    let tag = &body[..end];
    let valid = tag
        .chars()
        .enumerate()
        .all(|(n, ch)| ch == '_' || ch.is_ascii_alphabetic() || (n > 0 && ch.is_ascii_digit()));
    if valid {
        Some(format!("${tag}$"))
    } else {
        None
    }
}

fn parse_delimiter_directive(trimmed: &str) -> Option<String> {
    let (keyword, rest) = trimmed.split_once(char::is_whitespace)?;
    if !keyword.eq_ignore_ascii_case("DELIMITER") {
        return None;
    }
    let delim = rest.trim();
    if delim.is_empty() {
        None
    } else {
        Some(delim.to_string())
    }
}

fn flush(buffer: &mut String, statements: &mut Vec<String>) {
    let stmt = buffer.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }
    buffer.clear();
}

#[cfg(test)]
#[path = "splitter_test.rs"]
mod tests;
