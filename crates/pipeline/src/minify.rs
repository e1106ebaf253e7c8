//! Conservative output minification.
//!
//! Only removals that cannot change meaning are performed: HTML comments and
//! inter-tag whitespace, JS comments, blank lines and trailing whitespace.
//! Content inside `<pre>`, `<textarea>`, `<script>` and `<style>` blocks, and
//! inside JS string/template/regex literals, is copied verbatim.

/// Tags whose contents are copied through untouched.
const PROTECTED_TAGS: [&str; 4] = ["pre", "textarea", "script", "style"];

pub fn minify_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    'outer: while !rest.is_empty() {
        if rest.starts_with("<!--") {
            match rest.find("-->") {
                Some(end) => {
                    rest = &rest[end + 3..];
                    continue;
                }
                None => {
                    // Unterminated comment: keep the tail rather than eat it.
                    out.push_str(rest);
                    break;
                }
            }
        }

        for tag in PROTECTED_TAGS {
            if starts_protected_tag(rest, tag) {
                let end = protected_block_end(rest, tag);
                let (block, remainder) = rest.split_at(end);
                out.push_str(block);
                rest = remainder;
                continue 'outer;
            }
        }

        let ch = rest.chars().next().expect("non-empty input");
        if ch.is_whitespace() {
            let run_len = rest.len() - rest.trim_start().len();
            let next = rest[run_len..].chars().next();
            let prev = out.chars().last();
            // Whitespace between tags disappears entirely; elsewhere the run
            // collapses to a single space.
            if !(matches!(prev, Some('>') | None) && matches!(next, Some('<') | None)) {
                out.push(' ');
            }
            rest = &rest[run_len..];
        } else {
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    out
}

fn starts_protected_tag(rest: &str, tag: &str) -> bool {
    let bytes = rest.as_bytes();
    if bytes.len() < tag.len() + 2 || bytes[0] != b'<' {
        return false;
    }
    if !bytes[1..1 + tag.len()].eq_ignore_ascii_case(tag.as_bytes()) {
        return false;
    }
    matches!(
        bytes[1 + tag.len()],
        b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/'
    )
}

/// Byte offset just past the tag's closing `</tag>`, or the end of input for
/// an unterminated block.
fn protected_block_end(rest: &str, tag: &str) -> usize {
    let close = format!("</{tag}");
    let Some(idx) = find_ascii_ci(rest, &close) else {
        return rest.len();
    };
    match rest[idx..].find('>') {
        Some(gt) => idx + gt + 1,
        None => rest.len(),
    }
}

/// Case-insensitive substring search; `needle` must be ASCII.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsState {
    Code,
    LineComment,
    BlockComment { saw_newline: bool },
    Str(char),
    Template,
    Regex { in_class: bool },
}

/// Characters after which a `/` begins a regex literal rather than division.
fn regex_can_follow(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(ch) => matches!(
            ch,
            '(' | ',' | '=' | ':' | '[' | '!' | '&' | '|' | '?' | '{' | '}' | ';' | '+' | '-'
                | '*' | '%' | '<' | '>' | '~' | '^'
        ),
    }
}

/// Strips comments, blank lines and trailing whitespace. String, template and
/// regex literals pass through untouched; everything else is kept as written.
pub fn minify_js(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut state = JsState::Code;
    // Last non-whitespace character emitted while in code, for the
    // regex-vs-division decision.
    let mut prev_significant: Option<char> = None;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            JsState::Code => match ch {
                '/' => match chars.peek() {
                    Some('/') => {
                        chars.next();
                        state = JsState::LineComment;
                    }
                    Some('*') => {
                        chars.next();
                        state = JsState::BlockComment { saw_newline: false };
                    }
                    _ if regex_can_follow(prev_significant) => {
                        out.push(ch);
                        prev_significant = Some(ch);
                        state = JsState::Regex { in_class: false };
                    }
                    _ => {
                        out.push(ch);
                        prev_significant = Some(ch);
                    }
                },
                '\'' | '"' => {
                    out.push(ch);
                    prev_significant = Some(ch);
                    state = JsState::Str(ch);
                }
                '`' => {
                    out.push(ch);
                    prev_significant = Some(ch);
                    state = JsState::Template;
                }
                '\n' => push_newline(&mut out),
                _ => {
                    if !ch.is_whitespace() {
                        prev_significant = Some(ch);
                    }
                    out.push(ch);
                }
            },
            JsState::LineComment => {
                if ch == '\n' {
                    push_newline(&mut out);
                    state = JsState::Code;
                }
            }
            JsState::BlockComment { saw_newline } => {
                if ch == '\n' {
                    state = JsState::BlockComment { saw_newline: true };
                } else if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    // Keep tokens on either side separated.
                    if saw_newline {
                        push_newline(&mut out);
                    } else if !out.ends_with([' ', '\n']) && !out.is_empty() {
                        out.push(' ');
                    }
                    state = JsState::Code;
                }
            }
            JsState::Str(quote) => {
                out.push(ch);
                if ch == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if ch == quote || ch == '\n' {
                    state = JsState::Code;
                    prev_significant = Some(quote);
                }
            }
            JsState::Template => {
                out.push(ch);
                if ch == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if ch == '`' {
                    state = JsState::Code;
                    prev_significant = Some('`');
                }
            }
            JsState::Regex { in_class } => {
                out.push(ch);
                if ch == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if ch == '[' {
                    state = JsState::Regex { in_class: true };
                } else if ch == ']' && in_class {
                    state = JsState::Regex { in_class: false };
                } else if (ch == '/' && !in_class) || ch == '\n' {
                    state = JsState::Code;
                    prev_significant = Some('/');
                }
            }
        }
    }

    out
}

/// Appends a newline after trimming trailing spaces, suppressing blank lines.
fn push_newline(out: &mut String) {
    while out.ends_with([' ', '\t']) {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_comments_are_removed() {
        assert_eq!(
            minify_html("<div><!-- note --><span>hi</span></div>"),
            "<div><span>hi</span></div>"
        );
    }

    #[test]
    fn html_whitespace_between_tags_is_dropped() {
        let input = "<ul>\n    <li>Tip Calculator</li>\n    <li>BMI Calculator</li>\n</ul>";
        assert_eq!(
            minify_html(input),
            "<ul><li>Tip Calculator</li><li>BMI Calculator</li></ul>"
        );
    }

    #[test]
    fn html_text_whitespace_collapses_to_one_space() {
        assert_eq!(
            minify_html("<p>hello    brave\n\n new   world</p>"),
            "<p>hello brave new world</p>"
        );
    }

    #[test]
    fn pre_blocks_keep_their_whitespace() {
        let input = "<div>  <pre>\n  indented\n    more\n</pre>  </div>";
        assert_eq!(
            minify_html(input),
            "<div><pre>\n  indented\n    more\n</pre></div>"
        );
    }

    #[test]
    fn script_blocks_are_untouched() {
        let input = "<script>\nif (a < b) { run();   }\n</script>";
        assert_eq!(minify_html(input), input);
    }

    #[test]
    fn unterminated_comment_is_preserved() {
        assert_eq!(minify_html("<p>a</p><!-- oops"), "<p>a</p><!-- oops");
    }

    #[test]
    fn js_line_comments_and_blank_lines_are_removed() {
        let input = "// header\nconst a = 1;\n\n  \nconst b = 2; // tail\n";
        assert_eq!(minify_js(input), "const a = 1;\nconst b = 2;\n");
    }

    #[test]
    fn js_block_comments_collapse_without_joining_tokens() {
        assert_eq!(minify_js("const a/*x*/= 1;"), "const a = 1;");
        assert_eq!(
            minify_js("const a = 1;\n/* multi\n   line */\nconst b = 2;"),
            "const a = 1;\nconst b = 2;"
        );
    }

    #[test]
    fn js_strings_keep_comment_lookalikes() {
        let input = "const url = \"https://example.com\";";
        assert_eq!(minify_js(input), input);
    }

    #[test]
    fn js_template_literals_are_untouched() {
        let input = "const s = `line\n  // not a comment\n`;";
        assert_eq!(minify_js(input), input);
    }

    #[test]
    fn js_regex_with_escaped_slash_survives() {
        let input = "const re = /a\\/\\/b/; re.test(x);";
        assert_eq!(minify_js(input), input);
    }

    #[test]
    fn js_division_is_not_mistaken_for_regex() {
        let input = "const ratio = total / count / 2;";
        assert_eq!(minify_js(input), input);
    }
}
