//! Second rendering pass: the recursive HTML writer.

use super::heading::HeadingIds;
use super::tree::{plain_text, Node};
use super::MarkupOptions;
use docview_config::RawHtmlPolicy;
use html_escape::{encode_double_quoted_attribute, encode_text};
use pulldown_cmark::{Alignment, CodeBlockKind, Event, Tag};
use std::collections::HashSet;
use std::fmt::Write;

/// Table context handed down to the cells.
#[derive(Debug, Clone, Copy, Default)]
struct Ctx<'t> {
    alignments: &'t [Alignment],
    in_table_head: bool,
}

pub(crate) struct HtmlWriter<'o> {
    out: String,
    options: &'o MarkupOptions,
    placeholders: &'o HashSet<&'o str>,
    heading_ids: HeadingIds,
}

impl<'o> HtmlWriter<'o> {
    pub(crate) fn new(options: &'o MarkupOptions, placeholders: &'o HashSet<&'o str>) -> Self {
        Self {
            out: String::new(),
            options,
            placeholders,
            heading_ids: HeadingIds::default(),
        }
    }

    pub(crate) fn write(mut self, nodes: &[Node<'_>]) -> String {
        self.write_nodes(nodes, Ctx::default());
        self.out
    }

    fn write_nodes(&mut self, nodes: &[Node<'_>], ctx: Ctx<'_>) {
        for node in nodes {
            self.write_node(node, ctx);
        }
    }

    fn write_node(&mut self, node: &Node<'_>, ctx: Ctx<'_>) {
        match node {
            Node::Element { tag, children } => self.write_element(tag, children, ctx),
            Node::Leaf(event) => self.write_leaf(event),
        }
    }

    fn write_element(&mut self, tag: &Tag<'_>, children: &[Node<'_>], ctx: Ctx<'_>) {
        match tag {
            Tag::Paragraph => self.wrap("p", children, ctx, "\n"),
            Tag::Heading { level, id, .. } => {
                let level = *level as usize;
                let id = match id {
                    Some(id) => id.to_string(),
                    None => self.heading_ids.unique(&plain_text(children)),
                };
                let _ = write!(
                    self.out,
                    "<h{level} id=\"{}\">",
                    encode_double_quoted_attribute(&id)
                );
                self.write_nodes(children, ctx);
                let _ = writeln!(self.out, "</h{level}>");
            }
            Tag::BlockQuote => {
                self.out.push_str("<blockquote>\n");
                self.write_nodes(children, ctx);
                self.out.push_str("</blockquote>\n");
            }
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next(),
                    CodeBlockKind::Indented => None,
                };
                match lang {
                    Some(lang) => {
                        let _ = write!(
                            self.out,
                            "<pre><code class=\"language-{}\">",
                            encode_double_quoted_attribute(lang)
                        );
                    }
                    None => self.out.push_str("<pre><code>"),
                }
                for child in children {
                    if let Node::Leaf(Event::Text(code)) = child {
                        self.out.push_str(&encode_text(&**code));
                    }
                }
                self.out.push_str("</code></pre>\n");
            }
            Tag::List(Some(1)) => self.wrap_block("ol", children, ctx),
            Tag::List(Some(start)) => {
                let _ = writeln!(self.out, "<ol start=\"{start}\">");
                self.write_nodes(children, ctx);
                self.out.push_str("</ol>\n");
            }
            Tag::List(None) => self.wrap_block("ul", children, ctx),
            Tag::Item => {
                self.out.push_str("<li>");
                match children {
                    // Loose lists wrap the content of an item in a paragraph.
                    [Node::Element {
                        tag: Tag::Paragraph,
                        children: inner,
                    }] => self.write_nodes(inner, ctx),
                    _ => self.write_nodes(children, ctx),
                }
                self.out.push_str("</li>\n");
            }
            Tag::Table(alignments) => self.write_table(alignments, children),
            Tag::TableHead => {
                let ctx = Ctx {
                    in_table_head: true,
                    ..ctx
                };
                self.out.push_str("<thead>\n<tr>");
                self.write_cells(children, ctx);
                self.out.push_str("</tr>\n</thead>\n");
            }
            Tag::TableRow => {
                self.out.push_str("<tr>");
                self.write_cells(children, ctx);
                self.out.push_str("</tr>\n");
            }
            // Cells are written by `write_cells`, which knows the column.
            Tag::TableCell => self.write_cell(children, ctx, 0),
            Tag::Emphasis => self.wrap("em", children, ctx, ""),
            Tag::Strong => self.wrap("strong", children, ctx, ""),
            Tag::Strikethrough => self.wrap("del", children, ctx, ""),
            Tag::Link {
                dest_url, title, ..
            } => {
                let _ = write!(
                    self.out,
                    "<a href=\"{}\"",
                    encode_double_quoted_attribute(&**dest_url)
                );
                if !title.is_empty() {
                    let _ = write!(
                        self.out,
                        " title=\"{}\"",
                        encode_double_quoted_attribute(&**title)
                    );
                }
                self.out.push('>');
                self.write_nodes(children, ctx);
                self.out.push_str("</a>");
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let _ = write!(
                    self.out,
                    "<img src=\"{}\" alt=\"{}\"",
                    encode_double_quoted_attribute(&**dest_url),
                    encode_double_quoted_attribute(&plain_text(children))
                );
                if !title.is_empty() {
                    let _ = write!(
                        self.out,
                        " title=\"{}\"",
                        encode_double_quoted_attribute(&**title)
                    );
                }
                self.out.push_str(" />");
            }
            Tag::MetadataBlock(_) => {}
            _ => self.write_nodes(children, ctx),
        }
    }

    fn write_table(&mut self, alignments: &[Alignment], children: &[Node<'_>]) {
        let ctx = Ctx {
            alignments,
            in_table_head: false,
        };

        self.out.push_str("<table>\n");

        let (head, body): (Vec<&Node<'_>>, Vec<&Node<'_>>) = children.iter().partition(|node| {
            matches!(
                node,
                Node::Element {
                    tag: Tag::TableHead,
                    ..
                }
            )
        });

        for node in head {
            self.write_node(node, ctx);
        }
        if !body.is_empty() {
            self.out.push_str("<tbody>\n");
            for node in body {
                self.write_node(node, ctx);
            }
            self.out.push_str("</tbody>\n");
        }

        self.out.push_str("</table>\n");
    }

    fn write_cells(&mut self, cells: &[Node<'_>], ctx: Ctx<'_>) {
        for (column, cell) in cells.iter().enumerate() {
            match cell {
                Node::Element {
                    tag: Tag::TableCell,
                    children,
                } => self.write_cell(children, ctx, column),
                other => self.write_node(other, ctx),
            }
        }
    }

    fn write_cell(&mut self, children: &[Node<'_>], ctx: Ctx<'_>, column: usize) {
        let tag = if ctx.in_table_head { "th" } else { "td" };
        let style = match ctx.alignments.get(column) {
            Some(Alignment::Left) => " style=\"text-align: left\"",
            Some(Alignment::Center) => " style=\"text-align: center\"",
            Some(Alignment::Right) => " style=\"text-align: right\"",
            Some(Alignment::None) | None => "",
        };
        let _ = write!(self.out, "<{tag}{style}>");
        self.write_nodes(children, ctx);
        let _ = write!(self.out, "</{tag}>");
    }

    fn write_leaf(&mut self, event: &Event<'_>) {
        match event {
            Event::Text(text) => self.out.push_str(&encode_text(&**text)),
            Event::Code(code) => {
                let _ = write!(self.out, "<code>{}</code>", encode_text(&**code));
            }
            Event::Html(html) | Event::InlineHtml(html) => self.write_raw_html(html),
            Event::SoftBreak => self.out.push('\n'),
            Event::HardBreak => self.out.push_str("<br />\n"),
            Event::Rule => self.out.push_str("<hr />\n"),
            Event::TaskListMarker(checked) => {
                let checked = if *checked { " checked=\"\"" } else { "" };
                let _ = writeln!(
                    self.out,
                    "<input disabled=\"\" type=\"checkbox\"{checked}/>"
                );
            }
            _ => {}
        }
    }

    fn write_raw_html(&mut self, html: &str) {
        if self.is_placeholder(html) {
            self.out.push_str(html);
            return;
        }
        match self.options.raw_html {
            RawHtmlPolicy::Passthrough => self.out.push_str(html),
            RawHtmlPolicy::Escape => self.out.push_str(&encode_text(html)),
        }
    }

    fn is_placeholder(&self, html: &str) -> bool {
        html.trim()
            .strip_prefix("<!--")
            .and_then(|rest| rest.strip_suffix("-->"))
            .is_some_and(|token| self.placeholders.contains(token.trim()))
    }

    fn wrap(&mut self, tag: &str, children: &[Node<'_>], ctx: Ctx<'_>, trailer: &str) {
        let _ = write!(self.out, "<{tag}>");
        self.write_nodes(children, ctx);
        let _ = write!(self.out, "</{tag}>{trailer}");
    }

    fn wrap_block(&mut self, tag: &str, children: &[Node<'_>], ctx: Ctx<'_>) {
        let _ = writeln!(self.out, "<{tag}>");
        self.write_nodes(children, ctx);
        let _ = writeln!(self.out, "</{tag}>");
    }
}
