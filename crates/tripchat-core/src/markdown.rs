//! Light markdown to HTML formatting for bot replies.
//!
//! The formatter is a fixed pipeline of small text stages. Each stage works on
//! the output of the previous one, so the order in [`STAGES`] matters: escaping
//! has to happen before any markup is injected, and cost highlighting runs last
//! so it never touches structural tags.

use std::sync::LazyLock;

use regex::Regex;

/// A single rewrite pass over the formatted text.
pub type Stage = fn(&str) -> String;

/// The formatting pipeline, in application order.
pub const STAGES: [(&str, Stage); 7] = [
    ("escape", escape_html),
    ("headers", headers),
    ("bold", bold),
    ("italic", italic),
    ("bullets", bullet_lists),
    ("line_breaks", line_breaks),
    ("costs", highlight_costs),
];

static LABEL_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mR)^([A-Za-z0-9 \t]+:)$").expect("valid header regex"));
static DAY_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mR)^(Day [0-9]+:.*?)$").expect("valid day regex"));
static BOLD_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex"));
static BOLD_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(.+?)__").expect("valid bold regex"));
static ITALIC_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("valid italic regex"));
static ITALIC_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(.+?)_").expect("valid italic regex"));
static COST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[0-9]+(?:-[0-9]+)?").expect("valid cost regex"));

/// Format a bot reply as HTML.
pub fn format(text: &str) -> String {
    STAGES
        .iter()
        .fold(text.to_string(), |html, (_, stage)| stage(&html))
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `Budget:` style label lines, then `Day 3: ...` lines, become `<h3>`.
pub fn headers(text: &str) -> String {
    let labelled = LABEL_HEADER.replace_all(text, "<h3>${1}</h3>");
    DAY_HEADER.replace_all(&labelled, "<h3>${1}</h3>").into_owned()
}

pub fn bold(text: &str) -> String {
    let stars = BOLD_STARS.replace_all(text, "<strong>${1}</strong>");
    BOLD_UNDERSCORES
        .replace_all(&stars, "<strong>${1}</strong>")
        .into_owned()
}

pub fn italic(text: &str) -> String {
    let star = ITALIC_STAR.replace_all(text, "<em>${1}</em>");
    ITALIC_UNDERSCORE
        .replace_all(&star, "<em>${1}</em>")
        .into_owned()
}

/// Wrap each run of `- item` lines in a `<ul>` block.
pub fn bullet_lists(text: &str) -> String {
    let mut result: Vec<String> = Vec::new();
    let mut in_list = false;

    for line in text.split('\n') {
        let trimmed = line.trim();

        if let Some(item) = trimmed.strip_prefix("- ") {
            if !in_list {
                result.push("<ul>".to_string());
                in_list = true;
            }
            result.push(format!("<li>{}</li>", item));
        } else {
            if in_list {
                result.push("</ul>".to_string());
                in_list = false;
            }
            result.push(line.to_string());
        }
    }

    if in_list {
        result.push("</ul>".to_string());
    }

    result.join("\n")
}

/// Newlines become `<br>` unless the next line already starts with a tag.
pub fn line_breaks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' && chars.peek() != Some(&'<') {
            out.push_str("<br>");
        } else {
            out.push(c);
        }
    }

    out
}

pub fn highlight_costs(text: &str) -> String {
    COST.replace_all(text, r#"<span class="cost-badge">${0}</span>"#)
        .into_owned()
}
