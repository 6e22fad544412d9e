//! Glob pattern matching for KEYS and scan MATCH filters.
//!
//! Supports `*`, `?`, `[...]` classes (with `^` negation and ranges),
//! matching bytewise so binary keys behave.

pub(crate) fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern, text) {
        ([], []) => true,
        ([], _) => false,
        ([b'*', rest @ ..], _) => {
            glob_match(rest, text) || (!text.is_empty() && glob_match(pattern, &text[1..]))
        }
        (_, []) => false,
        ([b'?', p_rest @ ..], [_, t_rest @ ..]) => glob_match(p_rest, t_rest),
        ([b'[', p_rest @ ..], [ch, t_rest @ ..]) => match p_rest.iter().position(|&b| b == b']') {
            None => *ch == b'[' && glob_match(p_rest, t_rest),
            Some(end) => class_match(&p_rest[..end], *ch) && glob_match(&p_rest[end + 1..], t_rest),
        },
        ([b'\\', p, p_rest @ ..], [t, t_rest @ ..]) => *p == *t && glob_match(p_rest, t_rest),
        ([p, p_rest @ ..], [t, t_rest @ ..]) => *p == *t && glob_match(p_rest, t_rest),
    }
}

fn class_match(class: &[u8], ch: u8) -> bool {
    let (negated, class) = match class {
        [b'^', rest @ ..] => (true, rest),
        _ => (false, class),
    };

    let mut hit = false;
    let mut i = 0;
    while i < class.len() {
        if i + 2 < class.len() && class[i + 1] == b'-' {
            if class[i] <= ch && ch <= class[i + 2] {
                hit = true;
            }
            i += 3;
        } else {
            if class[i] == ch {
                hit = true;
            }
            i += 1;
        }
    }

    hit != negated
}
