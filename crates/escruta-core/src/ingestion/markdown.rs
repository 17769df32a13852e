//! HTML to Markdown conversion

use scraper::{ElementRef, Html, Node};

/// Inline rendering state
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    /// Inside `<pre>`: whitespace is preserved
    preformatted: bool,
}

/// Convert an HTML fragment or document into Markdown
///
/// Headings become ATX headings, lists keep their nesting, tables are
/// rendered as pipe rows and scripts or styles are dropped.
pub fn html_to_markdown(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let raw = render_children(fragment.root_element(), Context::default());
    normalize(&raw)
}

fn render_children(element: ElementRef<'_>, ctx: Context) -> String {
    let mut out = String::new();

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if ctx.preformatted {
                    out.push_str(text);
                } else {
                    push_collapsed(&mut out, text);
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    out.push_str(&render_element(child, ctx));
                }
            }
            _ => {}
        }
    }

    out
}

fn render_element(element: ElementRef<'_>, ctx: Context) -> String {
    let name = element.value().name();

    match name {
        "script" | "style" | "noscript" | "template" | "head" | "iframe" | "svg" | "canvas" => {
            String::new()
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            let text = single_line(&render_children(element, ctx));
            if text.is_empty() {
                String::new()
            } else {
                block(&format!("{} {}", "#".repeat(level), text))
            }
        }
        "br" => "\n".to_string(),
        "hr" => block("---"),
        "strong" | "b" => wrap_inline(&render_children(element, ctx), "**"),
        "em" | "i" => wrap_inline(&render_children(element, ctx), "*"),
        "del" | "s" | "strike" => wrap_inline(&render_children(element, ctx), "~~"),
        "code" if !ctx.preformatted => inline_code(&element.text().collect::<String>()),
        "pre" => code_block(element),
        "a" => link(element, ctx),
        "img" => image(element),
        "ul" => list(element, ctx, false),
        "ol" => list(element, ctx, true),
        "blockquote" => blockquote(element, ctx),
        "table" => table(element),
        "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "aside" | "nav"
        | "figure" | "figcaption" | "address" | "details" | "summary" | "dl" | "dt" | "dd"
        | "li" | "form" | "fieldset" | "body" | "html" => {
            let content = render_children(element, ctx);
            if content.trim().is_empty() {
                String::new()
            } else {
                block(content.trim())
            }
        }
        _ => render_children(element, ctx),
    }
}

fn block(content: &str) -> String {
    format!("\n\n{}\n\n", content)
}

fn push_collapsed(out: &mut String, text: &str) {
    let mut last_was_space = out.ends_with(' ') || out.ends_with('\n');
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn wrap_inline(content: &str, marker: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return content.to_string();
    }

    // Keep the surrounding spaces outside the markers
    let leading = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trailing = if content.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{leading}{marker}{trimmed}{marker}{trailing}")
}

fn inline_code(code: &str) -> String {
    let code = single_line(code);
    if code.is_empty() {
        return String::new();
    }
    if code.contains('`') {
        format!("`` {} ``", code)
    } else {
        format!("`{}`", code)
    }
}

fn code_block(element: ElementRef<'_>) -> String {
    let code = element.text().collect::<String>();
    let code = code.trim_matches('\n');
    if code.trim().is_empty() {
        return String::new();
    }

    let language = element
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "code")
        .and_then(|code| {
            code.value()
                .classes()
                .find_map(|class| class.strip_prefix("language-").map(str::to_string))
        })
        .unwrap_or_default();

    block(&format!("```{}\n{}\n```", language, code))
}

fn link(element: ElementRef<'_>, ctx: Context) -> String {
    let content = render_children(element, ctx);
    let text = content.trim();
    let href = element.value().attr("href").unwrap_or("").trim();

    if text.is_empty() {
        return String::new();
    }
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return content;
    }

    format!("[{}]({})", text, href)
}

fn image(element: ElementRef<'_>) -> String {
    let src = element.value().attr("src").unwrap_or("").trim();
    if src.is_empty() {
        return String::new();
    }
    let alt = element.value().attr("alt").unwrap_or("").trim();
    format!("![{}]({})", alt, src)
}

fn list(element: ElementRef<'_>, ctx: Context, ordered: bool) -> String {
    let mut index = element
        .value()
        .attr("start")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1);
    let mut out = String::new();

    for item in element.children().filter_map(ElementRef::wrap) {
        if item.value().name() != "li" {
            continue;
        }

        let marker = if ordered {
            format!("{}. ", index)
        } else {
            "- ".to_string()
        };
        let indent = " ".repeat(marker.len());
        let body = render_children(item, ctx);

        let mut lines = body.lines().map(str::trim_end).filter(|l| !l.trim().is_empty());
        let first = lines.next().map(str::trim_start).unwrap_or("");
        out.push_str(&marker);
        out.push_str(first);
        out.push('\n');
        for line in lines {
            out.push_str(&indent);
            out.push_str(line);
            out.push('\n');
        }

        index += 1;
    }

    if out.is_empty() {
        String::new()
    } else {
        block(out.trim_end())
    }
}

fn blockquote(element: ElementRef<'_>, ctx: Context) -> String {
    let content = normalize(&render_children(element, ctx));
    if content.is_empty() {
        return String::new();
    }

    let quoted = content
        .lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    block(&quoted)
}

fn table(element: ElementRef<'_>) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();
    collect_rows(element, &mut rows);
    if rows.is_empty() {
        return String::new();
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = String::new();

    for (i, row) in rows.iter().enumerate() {
        let mut cells = row.clone();
        cells.resize(columns, String::new());
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
        if i == 0 {
            out.push_str(&format!("|{}\n", " --- |".repeat(columns)));
        }
    }

    block(out.trim_end())
}

fn collect_rows(element: ElementRef<'_>, rows: &mut Vec<Vec<String>>) {
    for child in element.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => {
                let cells = child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                    .map(|cell| {
                        single_line(&render_children(cell, Context::default())).replace('|', "\\|")
                    })
                    .collect::<Vec<_>>();
                if !cells.is_empty() {
                    rows.push(cells);
                }
            }
            "thead" | "tbody" | "tfoot" => collect_rows(child, rows),
            _ => {}
        }
    }
}

/// Trim lines, collapse blank runs and strip indentation that follows a blank line
fn normalize(raw: &str) -> String {
    let mut out = String::new();
    let mut blank_run = 0;
    let mut in_fence = false;

    for line in raw.lines() {
        let line = line.trim_end();

        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }

        if line.trim().is_empty() && !in_fence {
            blank_run += 1;
            continue;
        }

        if !out.is_empty() && blank_run > 0 {
            out.push_str("\n\n");
        } else if !out.is_empty() {
            out.push('\n');
        }

        let starts_block = out.is_empty() || blank_run > 0;
        if starts_block && !in_fence {
            out.push_str(line.trim_start());
        } else {
            out.push_str(line);
        }
        blank_run = 0;
    }

    out
}
