//! Newick (parenthetical) tree reader.
//!
//! Supports nested parentheses, unquoted and single-quoted labels, branch
//! lengths, internal node names and `[...]` comments. Unquoted underscores
//! are kept verbatim since leaf labels carry `Genus_species_accession_location`.
//! The reader keeps its own stack of open clades, so nesting depth is not
//! limited by the call stack.

use std::iter::Peekable;
use std::str::CharIndices;

use tracing::{debug, instrument};

use crate::domain::arena::{NodeId, PhyloTree};
use crate::domain::error::{DomainError, DomainResult};

/// Parse a single Newick tree terminated by `;`.
#[instrument(level = "debug", skip(input), fields(len = input.len()))]
pub fn parse_newick(input: &str) -> DomainResult<PhyloTree> {
    let tree = NewickReader::new(input).read()?;
    debug!(nodes = tree.len(), "parsed newick tree");
    Ok(tree)
}

struct NewickReader<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    tree: PhyloTree,
    /// Open clades, innermost last
    open: Vec<NodeId>,
    /// Most recently completed node, waiting for a name or branch length
    current: Option<NodeId>,
    named: bool,
}

impl<'a> NewickReader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            tree: PhyloTree::new(),
            open: Vec::new(),
            current: None,
            named: false,
        }
    }

    fn read(mut self) -> DomainResult<PhyloTree> {
        self.skip_insignificant()?;
        if self.peek_char().is_none() {
            return Err(DomainError::newick(0, "empty input"));
        }

        loop {
            self.skip_insignificant()?;
            let pos = self.current_pos();
            let Some(c) = self.peek_char() else {
                return Err(DomainError::newick(pos, "missing terminating ';'"));
            };
            match c {
                '(' => {
                    self.advance();
                    self.open_clade(pos)?;
                }
                ',' => {
                    self.advance();
                    if self.open.is_empty() {
                        return Err(DomainError::newick(pos, "',' outside of parentheses"));
                    }
                    self.close_sibling()?;
                    self.current = None;
                }
                ')' => {
                    self.advance();
                    if self.open.is_empty() {
                        return Err(DomainError::newick(pos, "unbalanced ')'"));
                    }
                    self.close_sibling()?;
                    self.current = self.open.pop();
                    self.named = false;
                }
                ':' => {
                    self.advance();
                    let length = self.read_length()?;
                    let node = self
                        .current
                        .and_then(|idx| self.tree.node_mut(idx))
                        .ok_or_else(|| DomainError::newick(pos, "branch length without a node"))?;
                    node.branch_length = Some(length);
                }
                ';' => {
                    self.advance();
                    return self.finish(pos);
                }
                _ => {
                    let label = self.read_label()?;
                    self.assign_label(pos, label)?;
                }
            }
        }
    }

    fn open_clade(&mut self, pos: usize) -> DomainResult<()> {
        if self.current.is_some() {
            return Err(DomainError::newick(pos, "unexpected '('"));
        }
        let parent = self.parent_for_new_node(pos)?;
        let idx = self.tree.insert_internal("", parent)?;
        self.open.push(idx);
        Ok(())
    }

    /// An empty sibling slot such as `(,A)` is an unnamed leaf.
    fn close_sibling(&mut self) -> DomainResult<()> {
        if self.current.is_none() {
            let parent = self.open.last().copied();
            self.tree.insert_leaf("", parent)?;
        }
        Ok(())
    }

    fn assign_label(&mut self, pos: usize, label: String) -> DomainResult<()> {
        match self.current {
            None => {
                let parent = self.parent_for_new_node(pos)?;
                let idx = self.tree.insert_leaf(label, parent)?;
                self.current = Some(idx);
                self.named = true;
            }
            Some(idx) if !self.named => {
                if let Some(node) = self.tree.node_mut(idx) {
                    node.label = label;
                }
                self.named = true;
            }
            Some(_) => return Err(DomainError::newick(pos, format!("unexpected label '{label}'"))),
        }
        Ok(())
    }

    fn parent_for_new_node(&self, pos: usize) -> DomainResult<Option<NodeId>> {
        match self.open.last() {
            Some(&parent) => Ok(Some(parent)),
            None if self.tree.root().is_some() => {
                Err(DomainError::newick(pos, "more than one tree before ';'"))
            }
            None => Ok(None),
        }
    }

    fn finish(mut self, pos: usize) -> DomainResult<PhyloTree> {
        if !self.open.is_empty() {
            return Err(DomainError::newick(pos, "unbalanced '(': missing ')'"));
        }
        if self.tree.root().is_none() {
            return Err(DomainError::newick(pos, "no tree before ';'"));
        }
        self.skip_insignificant()?;
        if self.peek_char().is_some() {
            let trailing = self.current_pos();
            return Err(DomainError::newick(trailing, "trailing input after ';'"));
        }
        Ok(self.tree)
    }

    fn read_label(&mut self) -> DomainResult<String> {
        let start = self.current_pos();
        if self.peek_char() == Some('\'') {
            self.advance();
            let mut label = String::new();
            loop {
                match self.advance() {
                    Some('\'') if self.peek_char() == Some('\'') => {
                        self.advance();
                        label.push('\'');
                    }
                    Some('\'') => return Ok(label),
                    Some(c) => label.push(c),
                    None => return Err(DomainError::newick(start, "unterminated quoted label")),
                }
            }
        }

        while let Some(c) = self.peek_char() {
            if is_label_char(c) {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.current_pos();
        if start == end {
            return Err(DomainError::newick(start, "unexpected character"));
        }
        Ok(self.input[start..end].to_string())
    }

    fn read_length(&mut self) -> DomainResult<f64> {
        self.skip_insignificant()?;
        let start = self.current_pos();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E') {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.current_pos()];
        text.parse::<f64>()
            .map_err(|_| DomainError::newick(start, format!("invalid branch length '{text}'")))
    }

    /// Skip whitespace and `[...]` comments.
    fn skip_insignificant(&mut self) -> DomainResult<()> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('[') => {
                    let start = self.current_pos();
                    while let Some(c) = self.advance() {
                        if c == ']' {
                            break;
                        }
                        if self.peek_char().is_none() {
                            return Err(DomainError::newick(start, "unterminated comment"));
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    fn current_pos(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len())
    }
}

fn is_label_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '[' | ']' | '\'' | ':' | ';' | ',')
}
