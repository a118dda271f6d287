//! Terminal views of an annotated tree.
//!
//! Renderers only read through [`BiogeographyView`]; they never recompute
//! probabilities.

use colored::{ColoredString, Colorize};
use tracing::instrument;

use crate::application::color::NodeColorizer;
use crate::application::ApplicationResult;
use crate::domain::{BiogeographyView, DomainError, NodeId, PhyloTree};

/// Output layout for the `annotate` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Indented tree
    #[default]
    Tree,
    /// Tab-separated rows, one per node
    Table,
}

pub struct TreeRenderer<'a> {
    colorizer: &'a NodeColorizer,
    paint: bool,
}

impl<'a> TreeRenderer<'a> {
    pub fn new(colorizer: &'a NodeColorizer, paint: bool) -> Self {
        Self { colorizer, paint }
    }

    /// Tree view of the subtree at `start`, one line per node:
    /// `name [AF 0.67, NA 0.33] colour`.
    ///
    /// ```text
    /// <internal> [AF 0.50, NA 0.50] #1E88E5
    /// ├── Panthera leo [AF 1.00] #FFC107
    /// └── Puma concolor [NA 1.00] #1E88E5
    /// ```
    ///
    /// Lines are written in pre-order from an explicit stack, each entry
    /// carrying the prefix its children inherit, so no nested value as deep
    /// as the tree is ever built or dropped.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn render_tree(&self, tree: &PhyloTree, start: NodeId) -> ApplicationResult<String> {
        let mut out = String::new();
        let mut stack: Vec<(NodeId, String, Connector)> = vec![(start, String::new(), Connector::Root)];

        while let Some((idx, prefix, connector)) = stack.pop() {
            let node = tree.node(idx).ok_or(DomainError::NodeNotFound)?;
            out.push_str(&prefix);
            out.push_str(connector.branch());
            out.push_str(&self.node_line(tree, idx)?);
            out.push('\n');

            let inherited = format!("{prefix}{}", connector.indent());
            let last = node.children.len().saturating_sub(1);
            for (i, &child) in node.children.iter().enumerate().rev() {
                let connector = if i == last { Connector::Last } else { Connector::Middle };
                stack.push((child, inherited.clone(), connector));
            }
        }
        Ok(out)
    }

    /// Tab-separated table of the subtree at `start` in pre-order.
    pub fn render_table(&self, tree: &PhyloTree, start: NodeId) -> ApplicationResult<String> {
        let mut out = String::from("kind\tname\tcolor\tsize\tbiogeography\n");
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            let node = tree.node(idx).ok_or(DomainError::NodeNotFound)?;
            stack.extend(node.children.iter().rev());

            let style = self.colorizer.style(tree, idx)?;
            let kind = if node.is_leaf() { "leaf" } else { "internal" };
            let distribution = tree
                .biogeography(idx)
                .map(|b| b.to_string())
                .unwrap_or_default();
            out.push_str(&format!(
                "{kind}\t{}\t{}\t{}\t{distribution}\n",
                node_name(tree, idx),
                style.color,
                style.size
            ));
        }
        Ok(out)
    }

    fn node_line(&self, tree: &PhyloTree, idx: NodeId) -> ApplicationResult<String> {
        let style = self.colorizer.style(tree, idx)?;
        let name = self.paint(&node_name(tree, idx), &style.color);
        let distribution = tree
            .biogeography(idx)
            .map(|b| b.to_string())
            .unwrap_or_default();
        Ok(format!("{name} [{distribution}] {}", style.color))
    }

    fn paint(&self, text: &str, color: &str) -> ColoredString {
        match (self.paint, rgb(color)) {
            (true, Some((r, g, b))) => text.truecolor(r, g, b).bold(),
            _ => text.normal(),
        }
    }
}

/// Position of a line among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connector {
    Root,
    Middle,
    Last,
}

impl Connector {
    fn branch(self) -> &'static str {
        match self {
            Connector::Root => "",
            Connector::Middle => "├── ",
            Connector::Last => "└── ",
        }
    }

    fn indent(self) -> &'static str {
        match self {
            Connector::Root => "",
            Connector::Middle => "│   ",
            Connector::Last => "    ",
        }
    }
}

fn node_name(tree: &PhyloTree, idx: NodeId) -> String {
    match (tree.display_name(idx), tree.node(idx)) {
        (Some(name), _) => name.to_string(),
        (None, Some(node)) => node.to_string(),
        (None, None) => String::new(),
    }
}

/// `#RRGGBB` or one of the common CSS colour names.
fn rgb(color: &str) -> Option<(u8, u8, u8)> {
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return Some((channel(0)?, channel(2)?, channel(4)?));
    }
    let named = match color.to_ascii_lowercase().as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "brown" => (165, 42, 42),
        "chocolate" => (210, 105, 30),
        "purple" => (128, 0, 128),
        "gray" | "grey" => (128, 128, 128),
        _ => return None,
    };
    Some(named)
}
