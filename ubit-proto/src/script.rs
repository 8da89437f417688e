//! Python snippets the host sends to the board.
//!
//! User code is never sent verbatim. It runs through `exec` against a
//! `(globals, locals)` pair of dicts stored under the session id in two
//! board-wide dicts, `g` and `l`, so sessions sharing one board keep
//! separate variables.

use std::fmt::Write as _;

/// Renders `s` as a Python string literal, the way `repr()` would.
///
/// Single quotes are preferred; double quotes are used when the text
/// contains a single quote and no double quote.
pub fn py_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            // Control characters all sit below U+00A0.
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Creates the session's scope dicts, creating `g` and `l` if this is the
/// first session on a freshly reset board.
pub fn scope_init(session: &str) -> String {
    let id = py_repr(session);
    format!(
        "try:\n    g[{id}] = {{}}\nexcept NameError:\n    g = {{{id}: {{}}}}\n\
         try:\n    l[{id}] = {{}}\nexcept NameError:\n    l = {{{id}: {{}}}}\n"
    )
}

/// Drops the session's scope dicts.
pub fn scope_teardown(session: &str) -> String {
    let id = py_repr(session);
    format!("del g[{id}]; del l[{id}]")
}

/// Wraps user code so it runs inside the session's scope.
pub fn exec_in_scope(code: &str, session: &str) -> String {
    let id = py_repr(session);
    format!("exec({}, g[{id}], l[{id}])", py_repr(code))
}

/// Code that prints the value of `expr`.
pub fn print_expr(expr: &str) -> String {
    format!("print({expr})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str_list;

    #[test]
    fn repr_plain_and_quotes() {
        assert_eq!(py_repr("x = 1"), "'x = 1'");
        assert_eq!(py_repr("it's"), "\"it's\"");
        assert_eq!(py_repr(r#"it's "q""#), r#"'it\'s "q"'"#);
    }

    #[test]
    fn repr_escapes_control_chars() {
        assert_eq!(py_repr("a\nb\tc\\"), r"'a\nb\tc\\'");
        assert_eq!(py_repr("\x03\x7f"), r"'\x03\x7f'");
        assert_eq!(py_repr("\u{85}\u{9f}"), r"'\x85\x9f'");
        assert_eq!(py_repr("é"), "'é'");
    }

    #[test]
    fn repr_reads_back_through_literal_parser() {
        for s in ["", "for i in range(3):\n    print(i)\n", "'\"\\", "\x04>"] {
            let text = format!("[{}]", py_repr(s));
            assert_eq!(parse_str_list(&text).unwrap(), vec![s]);
        }
    }

    #[test]
    fn exec_wrapper() {
        assert_eq!(
            exec_in_scope("x = 1", "abc"),
            "exec('x = 1', g['abc'], l['abc'])"
        );
    }

    #[test]
    fn scope_snippets() {
        let init = scope_init("abc");
        assert!(init.starts_with("try:\n    g['abc'] = {}\nexcept NameError:\n    g = {'abc': {}}\n"));
        assert!(init.ends_with("    l = {'abc': {}}\n"));
        assert_eq!(scope_teardown("abc"), "del g['abc']; del l['abc']");
    }

    #[test]
    fn print_wrapper() {
        assert_eq!(print_expr("dir()"), "print(dir())");
    }
}
