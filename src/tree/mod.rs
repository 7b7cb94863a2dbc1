//! Message tree builder.
//!
//! Turns the flat, emission-ordered message list into a threaded forest for
//! display. The tree is derived data: it is rebuilt from scratch whenever the
//! message set changes and never stored.
//!
//! Building, searching, walking and dropping never recurse, so a long reply
//! chain cannot exhaust the stack. The derived `Clone`, `PartialEq` and
//! `Serialize` impls do recurse once per nesting level.

use std::collections::HashMap;

use serde::Serialize;

use crate::message::Message;

/// A message with its replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageNode {
    /// The message at this node.
    pub message: Message,
    /// Distance from the root (roots are 0).
    pub depth: usize,
    /// Direct replies, in source order.
    pub children: Vec<MessageNode>,
}

impl Drop for MessageNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Threaded forest of messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageTree {
    roots: Vec<MessageNode>,
    len: usize,
}

impl MessageTree {
    /// Top-level messages, in source order.
    pub fn roots(&self) -> &[MessageNode] {
        &self.roots
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no messages.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Find the node holding message `id`.
    pub fn find(&self, id: &str) -> Option<&MessageNode> {
        self.walk().into_iter().find(|node| node.message.id == id)
    }

    /// Depth-first, pre-order traversal: each node precedes its replies.
    pub fn walk(&self) -> Vec<&MessageNode> {
        let mut out = Vec::with_capacity(self.len);
        let mut stack: Vec<&MessageNode> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// Build the reply forest for `messages`.
///
/// A message attaches under the first message carrying its `parent_id`.
/// Missing parents and self-references make the message a root. Siblings
/// keep source order. Parent cycles are broken by promoting the cycle
/// member that appears first in the input, so every message appears
/// exactly once.
pub fn build_message_tree(messages: &[Message]) -> MessageTree {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(messages.len());
    for (i, message) in messages.iter().enumerate() {
        index.entry(message.id.as_str()).or_insert(i);
    }

    let mut parent_of: Vec<Option<usize>> = messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let parent_id = message.parent_id.as_deref()?;
            if parent_id == message.id {
                return None;
            }
            index.get(parent_id).copied().filter(|&p| p != i)
        })
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); messages.len()];
    for (i, parent) in parent_of.iter().enumerate() {
        if let Some(p) = parent {
            children[*p].push(i);
        }
    }

    let mut reached = vec![false; messages.len()];
    for i in 0..messages.len() {
        if parent_of[i].is_none() {
            mark_reached(i, &children, &mut reached);
        }
    }

    // Anything still unreached hangs off a parent cycle.
    for i in 0..messages.len() {
        if reached[i] {
            continue;
        }
        let promoted = first_cycle_member(i, &parent_of);
        if let Some(p) = parent_of[promoted].take() {
            children[p].retain(|&c| c != promoted);
        }
        mark_reached(promoted, &children, &mut reached);
    }

    let roots: Vec<usize> = (0..messages.len())
        .filter(|&i| parent_of[i].is_none())
        .collect();

    MessageTree {
        roots: assemble(&roots, messages, &children),
        len: messages.len(),
    }
}

fn mark_reached(start: usize, children: &[Vec<usize>], reached: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(i) = stack.pop() {
        if reached[i] {
            continue;
        }
        reached[i] = true;
        stack.extend(children[i].iter().copied());
    }
}

/// Follow parent links from `start` until they loop, and return the
/// lowest-index message on the loop.
fn first_cycle_member(start: usize, parent_of: &[Option<usize>]) -> usize {
    let mut position: HashMap<usize, usize> = HashMap::new();
    let mut path = Vec::new();
    let mut current = start;
    loop {
        if let Some(&at) = position.get(&current) {
            return path[at..].iter().copied().min().unwrap_or(current);
        }
        position.insert(current, path.len());
        path.push(current);
        match parent_of[current] {
            Some(parent) => current = parent,
            // Unreachable for an unreached node, but a root ends the walk.
            None => return current,
        }
    }
}

/// Materialize nodes bottom-up: a pre-order pass fixes depths, then the
/// reverse pass builds every node after all of its replies.
fn assemble(roots: &[usize], messages: &[Message], children: &[Vec<usize>]) -> Vec<MessageNode> {
    let mut depth = vec![0; messages.len()];
    let mut order = Vec::with_capacity(messages.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        order.push(i);
        for &c in children[i].iter().rev() {
            depth[c] = depth[i] + 1;
            stack.push(c);
        }
    }

    let mut built: Vec<Option<MessageNode>> = (0..messages.len()).map(|_| None).collect();
    for &i in order.iter().rev() {
        let replies = children[i]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[i] = Some(MessageNode {
            message: messages[i].clone(),
            depth: depth[i],
            children: replies,
        });
    }
    roots.iter().filter_map(|&r| built[r].take()).collect()
}
