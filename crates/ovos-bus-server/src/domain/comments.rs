//! Comment stripping for `mycroft.conf` style documents.
//!
//! Those files are JSON with `//` and `/* */` comments, which neither a
//! JSON nor a YAML parser accepts. Full-line `#` comments are removed too.

/// Remove comments while leaving string literals untouched.
///
/// Newlines inside block comments are preserved so parser errors still
/// point at the right line.
pub fn strip_comments(contents: &str) -> String {
    let mut out = String::with_capacity(contents.len());
    let mut chars = contents.chars().peekable();
    let mut at_line_start = true;

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                at_line_start = false;
                out.push(c);
                let quote = c;
                while let Some(inner) = chars.next() {
                    out.push(inner);
                    if inner == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if inner == quote {
                        break;
                    } else if inner == '\n' {
                        // Unbalanced quote, e.g. an apostrophe in plain YAML.
                        at_line_start = true;
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for inner in chars.by_ref() {
                    if previous == '*' && inner == '/' {
                        break;
                    }
                    if inner == '\n' {
                        out.push('\n');
                    }
                    previous = inner;
                }
            }
            '#' if at_line_start => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '\n' => {
                at_line_start = true;
                out.push(c);
            }
            c if c.is_whitespace() => out.push(c),
            _ => {
                at_line_start = false;
                out.push(c);
            }
        }
    }

    out
}
