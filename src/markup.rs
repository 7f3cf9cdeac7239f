use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Inline state while walking the formatted reply.
#[derive(Default)]
struct Styling {
    heading: bool,
    strong: usize,
    em: usize,
    cost: bool,
}

impl Styling {
    fn style(&self) -> Style {
        let mut style = Style::default();
        if self.heading {
            style = style
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        if self.strong > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.em > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.cost {
            style = style.fg(Color::Green).add_modifier(Modifier::BOLD);
        }
        style
    }
}

struct LineBuilder {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
}

impl LineBuilder {
    fn push_text(&mut self, text: &str, style: Style) {
        if !text.is_empty() {
            self.spans.push(Span::styled(unescape(text), style));
        }
    }

    /// End the current line, keeping it even when empty.
    fn break_line(&mut self) {
        self.lines.push(Line::from(std::mem::take(&mut self.spans)));
    }

    /// End the current line only if something is on it.
    fn close_line(&mut self) {
        if !self.spans.is_empty() {
            self.break_line();
        }
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Turn formatted bot markup into styled terminal lines.
///
/// Understands the tags the formatter emits: `h3`, `strong`, `em`, `ul`,
/// `li`, `br` and the cost badge `span`. Anything else is dropped.
pub fn to_lines(html: &str) -> Vec<Line<'static>> {
    let mut styling = Styling::default();
    let mut out = LineBuilder {
        lines: Vec::new(),
        spans: Vec::new(),
    };
    let mut rest = html;

    while !rest.is_empty() {
        let Some(open) = rest.find(['<', '\n']) else {
            out.push_text(rest, styling.style());
            break;
        };

        out.push_text(&rest[..open], styling.style());
        rest = &rest[open..];

        if rest.starts_with('\n') {
            out.close_line();
            rest = &rest[1..];
            continue;
        }

        let Some(close) = rest.find('>') else {
            // Escaped input never leaves a bare '<'; show it rather than lose it.
            out.push_text(rest, styling.style());
            break;
        };

        let tag = &rest[1..close];
        rest = &rest[close + 1..];

        let name = tag.split_whitespace().next().unwrap_or_default();
        match name {
            "h3" => {
                out.close_line();
                styling.heading = true;
            }
            "/h3" => {
                styling.heading = false;
                out.close_line();
            }
            "strong" => styling.strong += 1,
            "/strong" => styling.strong = styling.strong.saturating_sub(1),
            "em" => styling.em += 1,
            "/em" => styling.em = styling.em.saturating_sub(1),
            "ul" | "/ul" => out.close_line(),
            "li" => {
                out.close_line();
                out.spans.push(Span::styled("  • ", Style::default().fg(Color::Cyan)));
            }
            "/li" => out.close_line(),
            "br" => out.break_line(),
            "span" => styling.cost = tag.contains("cost-badge"),
            "/span" => styling.cost = false,
            _ => {}
        }
    }

    out.close_line();
    out.lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripchat_core::markdown;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_plain_text_with_breaks() {
        let lines = to_lines(&markdown::format("Hello\nthere\n\nfriend"));
        assert_eq!(plain(&lines), ["Hello", "there", "", "friend"]);
    }

    #[test]
    fn test_headings_and_lists() {
        let html = markdown::format("Day 1: Arrival\n- Check in\n- Dinner $30");
        let lines = to_lines(&html);
        assert_eq!(
            plain(&lines),
            ["Day 1: Arrival", "  • Check in", "  • Dinner $30"]
        );
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::UNDERLINED));
        let cost = lines[2].spans.last().unwrap();
        assert_eq!(cost.content, "$30");
        assert_eq!(cost.style.fg, Some(Color::Green));
    }

    #[test]
    fn test_inline_styles() {
        let lines = to_lines(&markdown::format("a **b** *c*"));
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 4);
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert!(spans[3].style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn test_entities_are_unescaped() {
        let lines = to_lines(&markdown::format("<tag> & co"));
        assert_eq!(plain(&lines), ["<tag> & co"]);
    }

    #[test]
    fn test_empty() {
        assert!(to_lines("").is_empty());
    }
}
