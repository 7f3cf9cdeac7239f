use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use tripchat_core::{BadgeDisplay, Sender, TempBand};
use crate::app::{App, FocusPane, NO_LOCATION};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [locations_area, chat_pane] = Layout::horizontal([
        Constraint::Length(26),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_locations(app, frame, locations_area);
    render_chat(app, frame, chat_pane);

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let location = app
        .current_location()
        .map(|l| format!(" [{}]", l))
        .unwrap_or_default();

    let title = Line::from(vec![
        Span::styled(" Travel Planner ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(location, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.focus {
        FocusPane::Locations => (" LOCATION ", Style::default().bg(Color::Blue).fg(Color::White)),
        FocusPane::Input => (" CHAT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    match app.focus {
        FocusPane::Locations => hints.extend([
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ]),
        FocusPane::Input => hints.extend([
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" locations ", label_style),
        ]),
    }
    hints.extend([
        Span::styled(" Tab ", key_style),
        Span::styled(" focus ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" ^Y ", key_style),
        Span::styled(" copy ", label_style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_locations(app: &mut App, frame: &mut Frame, area: Rect) {
    app.locations_area = Some(area);

    let focused = app.focus == FocusPane::Locations;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Destination ");

    let current = app.current_location();
    let items: Vec<ListItem> = std::iter::once(NO_LOCATION)
        .chain(app.locations.iter().map(String::as_str))
        .map(|name| {
            let style = if Some(name) == current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if name == NO_LOCATION {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", name)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.location_state);
}

fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let view = app.view();
    let mut lines: Vec<Line<'static>> = Vec::new();

    for (i, entry) in view.entries.iter().enumerate() {
        let message = &entry.rendered.message;
        match message.sender {
            Sender::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in message.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Sender::Bot => {
                let mut role = vec![Span::styled(
                    "Guide:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )];
                if view.is_copied(i) {
                    role.push(Span::styled(" ✓ copied", Style::default().fg(Color::Green)));
                }
                lines.push(Line::from(role));
                lines.extend(entry.lines.iter().cloned());
            }
        }
        lines.push(Line::default());
    }

    if view.loading {
        lines.push(Line::from(Span::styled(
            "Guide:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Planning{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.chat_area = Some(chat_area);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let lines = chat_lines(app);
    let chat_text = if lines.is_empty() {
        let hint = if app.current_location().is_some() {
            "Ask anything about your trip..."
        } else {
            "Pick a destination to start planning..."
        };
        Text::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
    } else {
        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text).wrap(Wrap { trim: false });

    // Clamp scroll against the word-wrapped content height
    let inner_height = chat_area.height.saturating_sub(2);
    let inner_width = chat_area.width.saturating_sub(2);
    let content_height = u16::try_from(chat.line_count(inner_width)).unwrap_or(u16::MAX);
    let max_scroll = content_height.saturating_sub(inner_height);
    if app.follow_bottom || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_bottom = true;
    }

    let chat = chat.block(chat_block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    if let Some(badge) = &app.view().badge {
        render_badge(badge, frame, chat_area);
    }

    render_input(app, frame, input_area);
}

fn band_color(band: TempBand) -> Color {
    let (r, g, b) = band.rgb();
    Color::Rgb(r, g, b)
}

/// Weather badge floating in the top-right corner of the chat pane.
fn render_badge(badge: &BadgeDisplay, frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(vec![
            Span::raw(format!("{} ", badge.icon)),
            Span::styled(badge.location.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(Span::styled(
            badge.temperature.clone(),
            Style::default().fg(band_color(badge.band)).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            badge.description.clone(),
            Style::default().fg(Color::Gray),
        )),
        Line::from(format!("💧 {}  💨 {}", badge.humidity, badge.wind)),
    ];

    let content_width = lines.iter().map(Line::width).max().unwrap_or(0) as u16;
    let width = (content_width + 4).min(area.width.saturating_sub(2));
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    if width < 8 || height < 3 {
        return;
    }

    let badge_area = Rect::new(
        area.x + area.width.saturating_sub(width + 1),
        area.y + 1,
        width,
        height,
    );

    // Clear the area behind the badge
    frame.render_widget(Clear, badge_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(band_color(badge.band)));

    frame.render_widget(Paragraph::new(lines).block(block), badge_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.focus == FocusPane::Input && app.input_enabled();
    let border_color = if !app.input_enabled() {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };

    let title = if app.input_enabled() {
        " Message (Enter to send) "
    } else {
        " Waiting for reply... "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input_style = if app.input_enabled() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let input = Paragraph::new(visible_text)
        .style(input_style)
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((
            area.x + cursor_x + 1,
            area.y + 1,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;
    use tripchat_core::{Message, RenderSink, RenderedMessage};

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_follow_bottom_shows_end_of_wrapped_reply() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new("http://127.0.0.1:9", None, false, tx);

        let mut reply: Vec<String> = (1..=40).map(|i| format!("word{:02}xx", i)).collect();
        reply.push("FINALTAIL".to_string());
        let reply = Message::bot(reply.join(" "));
        app.chat
            .sink_mut()
            .render_message(RenderedMessage::from_message(&reply));
        app.follow_bottom = true;

        // 43 columns leaves a 15 column chat pane, so every line word-wraps
        let mut terminal = Terminal::new(TestBackend::new(43, 12)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        assert!(screen(&terminal).contains("FINALTAIL"));
        assert!(app.follow_bottom);
    }

    #[tokio::test]
    async fn test_scroll_down_reaches_end_of_wrapped_reply() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new("http://127.0.0.1:9", None, false, tx);

        let reply: Vec<String> = (1..=30).map(|i| format!("stop{:02}", i)).collect();
        let reply = Message::bot(format!("{} LASTWORD", reply.join(" ")));
        app.chat
            .sink_mut()
            .render_message(RenderedMessage::from_message(&reply));

        let mut terminal = Terminal::new(TestBackend::new(43, 12)).unwrap();
        app.follow_bottom = false;
        app.chat_scroll = 0;
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(!screen(&terminal).contains("LASTWORD"));

        app.scroll_down(u16::MAX);
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(screen(&terminal).contains("LASTWORD"));
    }
}
