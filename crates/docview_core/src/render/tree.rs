//! Folds the flat pulldown-cmark event stream into a document tree.

use super::RenderError;
use pulldown_cmark::{Event, Tag};

/// Elements nested deeper than this are flattened into their parent.
///
/// Keeps the recursive HTML writer from exhausting the stack on input such as
/// thousands of nested block quotes.
const MAX_NESTING: usize = 128;

#[derive(Debug)]
pub(crate) enum Node<'a> {
    Element { tag: Tag<'a>, children: Vec<Node<'a>> },
    Leaf(Event<'a>),
}

impl<'a> Node<'a> {
    /// Concatenated text of the subtree, markup stripped.
    pub(crate) fn plain_text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, text: &mut String) {
        match self {
            Self::Leaf(Event::Text(t) | Event::Code(t)) => text.push_str(t),
            Self::Leaf(Event::SoftBreak | Event::HardBreak) => text.push(' '),
            Self::Leaf(_) => {}
            Self::Element { children, .. } => {
                children.iter().for_each(|child| child.collect_text(text))
            }
        }
    }
}

pub(crate) fn plain_text(nodes: &[Node<'_>]) -> String {
    nodes.iter().map(Node::plain_text).collect()
}

/// Builds the tree from `events`.
///
/// Fails only if the event stream is unbalanced, which the parser never
/// produces for any input.
pub(crate) fn build<'a>(
    events: impl IntoIterator<Item = Event<'a>>,
) -> Result<Vec<Node<'a>>, RenderError> {
    let mut root = Vec::new();
    let mut stack: Vec<(Tag<'a>, Vec<Node<'a>>)> = Vec::new();
    // One entry per open `Start`, `false` for the flattened ones.
    let mut opened: Vec<bool> = Vec::new();

    for event in events {
        match event {
            Event::Start(tag) => {
                if stack.len() < MAX_NESTING {
                    stack.push((tag, Vec::new()));
                    opened.push(true);
                } else {
                    opened.push(false);
                }
            }
            Event::End(end) => {
                let was_opened = opened.pop().ok_or_else(|| {
                    RenderError::Malformed(format!("unexpected end of {end:?}"))
                })?;
                if !was_opened {
                    continue;
                }
                let (tag, children) = stack.pop().ok_or_else(|| {
                    RenderError::Malformed(format!("unexpected end of {end:?}"))
                })?;
                push_node(&mut stack, &mut root, Node::Element { tag, children });
            }
            leaf => push_node(&mut stack, &mut root, Node::Leaf(leaf)),
        }
    }

    if let Some((tag, _)) = stack.last() {
        return Err(RenderError::Malformed(format!("unclosed {tag:?}")));
    }

    Ok(root)
}

fn push_node<'a>(stack: &mut [(Tag<'a>, Vec<Node<'a>>)], root: &mut Vec<Node<'a>>, node: Node<'a>) {
    match stack.last_mut() {
        Some((_, children)) => children.push(node),
        None => root.push(node),
    }
}
