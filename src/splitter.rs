/// Split one script body into individual SQL statements.
///
/// A semicolon terminates a statement only when it immediately precedes a
/// line terminator, or when it is the final non-whitespace character of the
/// body. Semicolons elsewhere on a line are passed through untouched, which
/// lets trigger and function bodies carry inner semicolons as long as
/// something (conventionally a `--` comment) follows them on the same line.
///
/// The splitter is text-only. It does not understand quotes or comments.
pub fn split_statements(body: &str) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;

    for i in 0..bytes.len() {
        if bytes[i] != b';' {
            continue;
        }
        let rest = &body[i + 1..];
        let at_eol = rest.starts_with('\n') || rest.starts_with("\r\n");
        let at_eof = rest.chars().all(char::is_whitespace);
        if at_eol || at_eof {
            let stmt = body[start..i].trim();
            if !stmt.is_empty() {
                statements.push(stmt.to_string());
            }
            start = i + 1;
        }
    }

    let tail = body[start..].trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }

    statements
}
