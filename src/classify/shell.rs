/// Split a shell command line into the simple commands it chains together.
///
/// Separators are `&&`, `||`, `;`, `|`, `&` and newlines. Subshells `( ... )`,
/// command substitutions `$( ... )` and backticks also start new segments,
/// including substitutions inside double quotes. Quoted text (single or
/// double quotes, with backslash escapes outside single quotes) is otherwise
/// kept intact, so `git commit -m "a; b"` stays a single segment. Empty
/// segments are dropped; the rest are trimmed.
pub fn split_segments(command: &str) -> Vec<&str> {
    let bytes = command.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut single_quoted = false;
    // open double quotes, `$(`/`(` groups and backticks, innermost last
    let mut nesting: Vec<u8> = Vec::new();

    while i < bytes.len() {
        let b = bytes[i];
        if single_quoted {
            if b == b'\'' {
                single_quoted = false;
            }
            i += 1;
            continue;
        }
        let substitution = b == b'$' && bytes.get(i + 1) == Some(&b'(');
        if nesting.last() == Some(&b'"') {
            match b {
                b'\\' => i += 2,
                b'"' => {
                    nesting.pop();
                    i += 1;
                }
                b'`' | b'$' if b == b'`' || substitution => {
                    push_segment(&mut segments, &command[start..i]);
                    nesting.push(if b == b'`' { b'`' } else { b'(' });
                    i += if substitution { 2 } else { 1 };
                    start = i;
                }
                _ => i += 1,
            }
            continue;
        }
        match b {
            b'\'' => {
                single_quoted = true;
                i += 1;
            }
            b'"' => {
                nesting.push(b'"');
                i += 1;
            }
            b'\\' => i += 2,
            b'(' | b'`' | b')' | b'$' if b != b'$' || substitution => {
                push_segment(&mut segments, &command[start..i]);
                match b {
                    b'`' if nesting.last() == Some(&b'`') => {
                        nesting.pop();
                    }
                    b')' => {
                        if nesting.last() == Some(&b'(') {
                            nesting.pop();
                        }
                    }
                    b'`' => nesting.push(b'`'),
                    _ => nesting.push(b'('),
                }
                i += if substitution { 2 } else { 1 };
                start = i;
            }
            b'&' | b'|' if is_redirection(bytes, i) => i += 1,
            b';' | b'\n' | b'|' | b'&' => {
                push_segment(&mut segments, &command[start..i]);
                let doubled = matches!(b, b'|' | b'&') && bytes.get(i + 1) == Some(&b);
                i += if doubled { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < command.len() {
        push_segment(&mut segments, &command[start..]);
    }
    segments
}

// `2>&1`, `&>file`, `>|file`
fn is_redirection(bytes: &[u8], i: usize) -> bool {
    let prev = i.checked_sub(1).map(|p| bytes[p]);
    let next = bytes.get(i + 1).copied();
    match bytes[i] {
        b'&' => matches!(prev, Some(b'>') | Some(b'<')) || next == Some(b'>'),
        b'|' => prev == Some(b'>'),
        _ => false,
    }
}

fn push_segment<'a>(segments: &mut Vec<&'a str>, raw: &'a str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed);
    }
}

/// First word of a segment after leading `VAR=value` assignments and common
/// wrappers (`sudo`, `env`, `time`, `command`) or a `{` group opener, without
/// any directory prefix.
pub fn program_name(segment: &str) -> &str {
    const WRAPPERS: &[&str] = &["sudo", "env", "time", "command", "exec", "nohup", "{", "!"];
    for word in segment.split_whitespace() {
        if word.contains('=') && !word.starts_with('-') && !word.starts_with('=') {
            continue;
        }
        let base = word.rsplit(['/', '\\']).next().unwrap_or(word);
        if WRAPPERS.contains(&base) {
            continue;
        }
        return base;
    }
    ""
}
