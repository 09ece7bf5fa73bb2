//! Instructor name canonicalization
//!
//! Listing rows look like `"<Last>[, <First>][status noise]"`, with staff notes
//! typed straight into the name fields ("Needs Monitoring", "(Complete and
//! sent to ...)", "**...**"). [`canonicalize`] turns that into a stable
//! `"First Last"` folder key. It is total: the worst case is [`UNKNOWN_OWNER`].
//!
//! Both name segments keep Unicode letters (`char::is_alphabetic`) and `-`;
//! accented names survive intact on either side of the comma.

/// Sentinel for input that carries no usable name
pub const UNKNOWN_OWNER: &str = "unknown";

/// Status words staff append to name fields
const STOP_WORDS: &[&str] = &[
    "monitoring",
    "complete",
    "completed",
    "needs",
    "sent",
    "to",
    "with",
    "and",
    "codeblue",
    "cpr",
    "classes",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.iter().any(|w| w.eq_ignore_ascii_case(token))
}

/// Canonical `"First Last"` key for a raw listing name
pub fn canonicalize(raw: &str) -> String {
    let cleaned = strip_annotations(raw);

    let (last_segment, first_segment) = match cleaned.split_once(',') {
        Some((last, first)) => (last, first),
        None => (cleaned.as_str(), ""),
    };

    let surname = extract_surname(last_segment);
    let given = extract_given_name(first_segment);

    if given.is_empty() {
        surname
    } else {
        format!("{} {}", given, surname)
    }
}

/// Last non-stop-word alphabetic/hyphen token of the surname segment
fn extract_surname(segment: &str) -> String {
    segment
        .split(|c: char| !(c.is_alphabetic() || c == '-'))
        .filter(|token| token.chars().any(char::is_alphabetic))
        .rev()
        .find(|token| !is_stop_word(token))
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_OWNER.to_string())
}

fn extract_given_name(segment: &str) -> String {
    let filtered: String = segment
        .chars()
        .filter(|c| c.is_alphabetic() || *c == '-' || *c == ' ')
        .collect();

    filtered
        .split_whitespace()
        .filter(|token| token.chars().any(char::is_alphabetic))
        .filter(|token| !is_stop_word(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove `(...)` and `**...**` spans; unbalanced openers are kept as text
fn strip_annotations(raw: &str) -> String {
    let without_emphasis = remove_spans(raw, "**", "**");
    remove_spans(&without_emphasis, "(", ")")
}

fn remove_spans(text: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(open) {
        let after_open = &rest[start + open.len()..];
        match after_open.find(close) {
            Some(end) => {
                out.push_str(&rest[..start]);
                out.push(' ');
                rest = &after_open[end + close.len()..];
            }
            None => break,
        }
    }

    out.push_str(rest);
    out
}
