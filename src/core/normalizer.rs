use regex::Regex;
use std::sync::OnceLock;

fn stereo_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:dl|d|l)-\s*").unwrap())
}

fn trailing_percentage() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\d+(?:\.\d+)?\s*%$").unwrap())
}

/// 將成分名稱正規化為比對用的標準形式。
///
/// Steps, in order: lowercase, collapse whitespace, strip parenthetical content, truncate
/// at the first `,` or `;`, strip a leading `d-`/`l-`/`dl-` stereoisomer prefix, strip a
/// trailing percentage, trim. The steps are repeated until the output stops changing, so
/// `normalize(normalize(x)) == normalize(x)` holds for every input.
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_once(raw);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let collapsed = collapse_whitespace(&lowered);
    let without_parens = collapse_whitespace(&strip_parentheticals(&collapsed));
    let truncated = truncate_qualifiers(&without_parens).trim();
    let without_prefix = strip_stereo_prefix(truncated);
    let without_percentage = strip_trailing_percentage(without_prefix);
    collapse_whitespace(without_percentage)
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 移除括號內容；未閉合的 `(` 會捨棄其後所有內容，多餘的 `)` 直接移除
fn strip_parentheticals(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut depth = 0usize;

    for c in input.chars() {
        match c {
            '(' => {
                if depth == 0 {
                    output.push(' ');
                }
                depth += 1;
            }
            ')' => {
                if depth > 0 {
                    depth -= 1;
                }
            }
            _ if depth == 0 => output.push(c),
            _ => {}
        }
    }

    output
}

fn truncate_qualifiers(input: &str) -> &str {
    match input.find([',', ';']) {
        Some(index) => &input[..index],
        None => input,
    }
}

fn strip_stereo_prefix(input: &str) -> &str {
    let mut current = input;
    while let Some(found) = stereo_prefix().find(current) {
        current = &current[found.end()..];
    }
    current
}

fn strip_trailing_percentage(input: &str) -> &str {
    let mut current = input.trim_end();
    while let Some(found) = trailing_percentage().find(current) {
        current = current[..found.start()].trim_end();
    }
    current
}
