//! Raw message text to render-safe display markup.
//!
//! Message content may originate from an external answer service, so the
//! whole input is HTML-escaped before any substitution runs. Transform order
//! is load-bearing: fenced code first (bodies are exempt from the inline
//! rules), bold before italic so asterisk runs nest, headings and bullets
//! per line, surviving newlines last.

/// Render a message's raw text to display markup.
///
/// Supports the constrained subset the portal emits: fenced code blocks with
/// an optional language tag, `**bold**`, `*italic*`, `##`/`###` headings,
/// hyphen bullets (the caller wraps consecutive `<li>`s in a list container),
/// and line breaks.
pub fn render_markup(text: &str) -> String {
    let escaped = escape_html(text);
    let mut output = String::with_capacity(escaped.len());
    for segment in split_fenced(&escaped) {
        match segment {
            Segment::Code { language, body } => {
                output.push_str("<pre><code class=\"language-");
                output.push_str(language);
                output.push_str("\">");
                output.push_str(body);
                output.push_str("</code></pre>");
            }
            Segment::Text(text) => output.push_str(&render_text(text)),
        }
    }
    output
}

enum Segment<'a> {
    Text(&'a str),
    Code { language: &'a str, body: &'a str },
}

/// Split out ``` fenced blocks so their bodies skip the inline transforms.
/// An unterminated fence is left in place as plain text.
fn split_fenced(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = input;
    loop {
        let Some(open) = rest.find("```") else { break };
        let after_open = &rest[open + 3..];
        let Some(lang_end) = after_open.find('\n') else { break };
        let body_start = lang_end + 1;
        let Some(close) = after_open[body_start..].find("```") else {
            break;
        };

        if open > 0 {
            segments.push(Segment::Text(&rest[..open]));
        }
        segments.push(Segment::Code {
            language: after_open[..lang_end].trim(),
            body: &after_open[body_start..body_start + close],
        });
        rest = &after_open[body_start + close + 3..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    segments
}

fn render_text(text: &str) -> String {
    text.split('\n')
        .map(render_line)
        .collect::<Vec<_>>()
        .join("<br />")
}

fn render_line(line: &str) -> String {
    let bolded = wrap_delimited(line, "**", "<strong>", "</strong>");
    let emphasized = wrap_delimited(&bolded, "*", "<em>", "</em>");

    if let Some(rest) = emphasized.strip_prefix("### ") {
        format!("<h3>{rest}</h3>")
    } else if let Some(rest) = emphasized.strip_prefix("## ") {
        format!("<h2>{rest}</h2>")
    } else if let Some(rest) = emphasized.strip_prefix("- ") {
        format!("<li>{rest}</li>")
    } else {
        emphasized
    }
}

/// Non-greedy pair replacement: the closest closing delimiter wins. In the
/// bold pass a `***run***` keeps its innermost asterisks for the italic pass,
/// so triple runs resolve to nested bold+italic.
fn wrap_delimited(input: &str, delimiter: &str, open: &str, close: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find(delimiter) {
        let content_start = start + delimiter.len();
        let Some(found) = rest[content_start..].find(delimiter) else {
            break;
        };
        let mut content_end = content_start + found;
        if delimiter == "**"
            && rest[content_start..].starts_with('*')
            && rest[content_end + delimiter.len()..].starts_with('*')
        {
            content_end += 1;
        }

        output.push_str(&rest[..start]);
        output.push_str(open);
        output.push_str(&rest[content_start..content_end]);
        output.push_str(close);
        rest = &rest[content_end + delimiter.len()..];
    }
    output.push_str(rest);
    output
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_and_italic_render_without_stray_asterisks() {
        let markup = render_markup("**bold** and *italic*");
        assert_eq!(markup, "<strong>bold</strong> and <em>italic</em>");
    }

    #[test]
    fn triple_asterisk_run_nests_bold_and_italic() {
        let markup = render_markup("***both***");
        assert_eq!(markup, "<strong><em>both</em></strong>");
    }

    #[test]
    fn untrusted_tags_are_neutralized() {
        let markup = render_markup("<script>alert('hi')</script>");
        assert!(!markup.contains("<script>"));
        assert!(markup.contains("&lt;script&gt;"));
        assert!(markup.contains("&#39;hi&#39;"));
    }

    #[test]
    fn fenced_block_keeps_language_tag_and_raw_body() {
        let markup = render_markup("```json\n{\n  \"analysis\": \"complete\"\n}\n```");
        assert!(markup.starts_with("<pre><code class=\"language-json\">"));
        assert!(markup.contains("&quot;analysis&quot;"));
        assert!(markup.ends_with("</code></pre>"));
    }

    #[test]
    fn inline_rules_do_not_reach_into_code_bodies() {
        let markup = render_markup("```\n**kept** and - kept\n```");
        assert!(markup.contains("**kept** and - kept"));
        assert!(!markup.contains("<strong>"));
        assert!(!markup.contains("<li>"));
    }

    #[test]
    fn unterminated_fence_stays_literal() {
        let markup = render_markup("```rust\nlet x = 1;");
        assert!(!markup.contains("<pre>"));
        assert!(markup.contains("```rust"));
    }

    #[test]
    fn headings_match_at_line_start_only() {
        let markup = render_markup("## Key findings\nnot a ## heading");
        assert_eq!(
            markup,
            "<h2>Key findings</h2><br />not a ## heading"
        );
    }

    #[test]
    fn level_three_heading_wins_over_level_two() {
        assert_eq!(render_markup("### Detail"), "<h3>Detail</h3>");
    }

    #[test]
    fn bullet_lines_become_list_items() {
        let markup = render_markup("- Point 1\n- Point 2");
        assert_eq!(markup, "<li>Point 1</li><br /><li>Point 2</li>");
    }

    #[test]
    fn emphasis_applies_inside_headings_and_bullets() {
        assert_eq!(render_markup("## **Big**"), "<h2><strong>Big</strong></h2>");
        assert_eq!(render_markup("- *small*"), "<li><em>small</em></li>");
    }

    #[test]
    fn remaining_newlines_become_breaks() {
        assert_eq!(render_markup("one\ntwo\n\nthree"), "one<br />two<br /><br />three");
    }

    #[test]
    fn mixed_document_renders_every_rule() {
        let markup = render_markup(
            "## Summary\nSee **bold** and *italic*\n- item\n```json\n{}\n```",
        );
        assert!(markup.contains("<h2>Summary</h2>"));
        assert!(markup.contains("<strong>bold</strong>"));
        assert!(markup.contains("<em>italic</em>"));
        assert!(markup.contains("<li>item</li>"));
        assert!(markup.contains("<pre><code class=\"language-json\">{}"));
    }
}
