//! Rendering of formatted replies
//!
//! Maps [`ContentBlock`]s onto styled ratatui lines. Emphasis arrives as
//! structured spans and is applied with style modifiers; no markup string
//! is ever interpreted at this layer.

use crate::format::{ContentBlock, Emphasis, InlineSpan, format_response};
use crate::theme::Theme;
use ratatui::{
    style::Modifier,
    text::{Line, Span},
};

/// Format a reply's text and render it as styled lines
pub fn render_response(text: &str, theme: &Theme) -> Vec<Line<'static>> {
    let blocks = format_response(text);
    let mut lines = Vec::new();
    for block in &blocks {
        render_block(block, theme, &mut lines);
    }

    // Drop trailing blank separator lines
    while lines
        .last()
        .is_some_and(|l: &Line| l.spans.iter().all(|s| s.content.is_empty()))
    {
        lines.pop();
    }

    lines
}

fn render_block(block: &ContentBlock, theme: &Theme, lines: &mut Vec<Line<'static>>) {
    match block {
        ContentBlock::Header { text } => {
            lines.push(Line::from(Span::styled(text.clone(), theme.header_style())));
        }
        ContentBlock::Paragraph { blocks } => {
            for inner in blocks {
                render_block(inner, theme, lines);
            }
            lines.push(Line::from("")); // blank line after each paragraph
        }
        ContentBlock::Bullet { text } => {
            lines.push(Line::from(vec![
                Span::styled("• ", theme.dim_style()),
                Span::styled(text.clone(), theme.base_style()),
            ]));
        }
        ContentBlock::Numbered { index, text } => {
            lines.push(Line::from(vec![
                Span::styled(format!("{}. ", index), theme.dim_style()),
                Span::styled(text.clone(), theme.base_style()),
            ]));
        }
        ContentBlock::ComparisonRow { cells } => {
            let mut spans = Vec::new();
            for (i, cell) in cells.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::styled(" │ ", theme.dim_style()));
                }
                spans.push(Span::styled(cell.clone(), theme.base_style()));
            }
            lines.push(Line::from(spans));
        }
        ContentBlock::Plain { spans } => {
            lines.push(Line::from(
                spans
                    .iter()
                    .map(|span| inline_span(span, theme))
                    .collect::<Vec<_>>(),
            ));
        }
    }
}

fn inline_span(span: &InlineSpan, theme: &Theme) -> Span<'static> {
    let style = match span.emphasis {
        Emphasis::None => theme.base_style(),
        Emphasis::Strong => theme.base_style().add_modifier(Modifier::BOLD),
        Emphasis::Emph => theme.base_style().add_modifier(Modifier::ITALIC),
    };
    Span::styled(span.text.clone(), style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_body() {
        let theme = Theme::dark();
        let lines = render_response("**Symptoms**\nDark spots on leaves", &theme);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans[0].content, "Symptoms");
    }

    #[test]
    fn test_bullet_marker_prepended() {
        let theme = Theme::dark();
        let lines = render_response("- Apply fungicide weekly", &theme);
        assert_eq!(lines[0].spans[0].content, "• ");
        assert_eq!(lines[0].spans[1].content, "Apply fungicide weekly");
    }

    #[test]
    fn test_emphasis_becomes_modifier_not_markup() {
        let theme = Theme::dark();
        let lines = render_response("Use **copper** sprays", &theme);
        let rendered: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(rendered, "Use copper sprays");
        assert!(
            lines[0].spans[1]
                .style
                .add_modifier
                .contains(Modifier::BOLD)
        );
    }

    #[test]
    fn test_empty_reply_renders_nothing() {
        let theme = Theme::dark();
        assert!(render_response("", &theme).is_empty());
    }
}
