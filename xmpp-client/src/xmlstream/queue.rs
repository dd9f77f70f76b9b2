// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::VecDeque;

use minidom::Element;

/// Tag which matches any element.
pub const ANY: &str = "*";

/// Elements parsed off the stream and not yet consumed.
///
/// Elements stay in the order they were queued. Taking one out never
/// disturbs the relative order of the others.
#[derive(Debug, Default)]
pub struct StanzaQueue {
    elements: VecDeque<Element>,
}

impl StanzaQueue {
    /// Creates an empty queue.
    pub fn new() -> StanzaQueue {
        StanzaQueue::default()
    }

    /// Appends an element at the back.
    pub fn push(&mut self, element: Element) {
        self.elements.push_back(element);
    }

    /// Number of queued elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Removes and returns the first element named `tag`, or the head of the
    /// queue if `tag` is [`ANY`].
    ///
    /// A namespace prefix on `tag` is ignored, so `stream:features` and
    /// `features` select the same elements.
    pub fn pop(&mut self, tag: &str) -> Option<Element> {
        if tag == ANY {
            return self.elements.pop_front();
        }
        let name = local_name(tag);
        self.pop_matching(|elem| elem.name() == name)
    }

    /// Removes and returns the first element for which `predicate` holds.
    pub fn pop_matching<F: FnMut(&Element) -> bool>(&mut self, predicate: F) -> Option<Element> {
        let index = self.elements.iter().position(predicate)?;
        self.elements.remove(index)
    }

    /// Iterates over the queued elements, front first.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Drops everything queued.
    pub fn clear(&mut self) {
        self.elements.clear();
    }
}

pub(crate) fn local_name(tag: &str) -> &str {
    match tag.rsplit_once(':') {
        Some((_, name)) => name,
        None => tag,
    }
}
