//! Radix tree route matching.
//!
//! The tree stores one node per pattern segment. Leaves carry a small
//! (method, slot) table pointing into the router's compiled route list.
//! Matching walks segments in priority order: static children first, then
//! constrained parameters, then unconstrained parameters, then the
//! wildcard. A branch that matches the segment but dead-ends deeper in
//! the path is backtracked out of, captured parameters included, so a
//! constrained route falls through cleanly to the next candidate.

use http::Method;
use trellis_core::Params;

use crate::pattern::{Segment, SegmentKind};

/// Outcome of matching one request against the tree.
#[derive(Debug)]
pub enum MatchOutcome {
    /// A route matched; `slot` indexes the compiled route list.
    Found {
        /// Index into the compiled route list.
        slot: usize,
        /// Parameters captured along the matched branch.
        params: Params,
    },
    /// The path is routable but not under this method.
    MethodNotAllowed,
    /// Nothing matches the path.
    NotFound,
}

/// A node in the route tree.
#[derive(Debug)]
pub(crate) struct Node {
    literal: String,
    kind: SegmentKind,
    methods: Vec<(Method, usize)>,
    /// Static children, sorted by literal for binary search.
    static_children: Vec<Node>,
    /// Parameter children: constrained ones first, in insertion order.
    param_children: Vec<Node>,
    wildcard_child: Option<Box<Node>>,
}

impl Node {
    fn new(literal: String, kind: SegmentKind) -> Self {
        Self {
            literal,
            kind,
            methods: Vec::new(),
            static_children: Vec::new(),
            param_children: Vec::new(),
            wildcard_child: None,
        }
    }

    /// Creates the tree root.
    pub fn root() -> Self {
        Self::new(String::new(), SegmentKind::Static)
    }

    /// Inserts a route at the node reached by `segments`.
    ///
    /// Duplicate (method, pattern) pairs are filtered out before
    /// insertion, so an existing entry for the same method is a logic
    /// error upstream.
    pub fn insert(&mut self, segments: &[Segment], method: Method, slot: usize) {
        let Some(segment) = segments.first() else {
            debug_assert!(
                self.methods.iter().all(|(m, _)| *m != method),
                "route table deduplication let a duplicate through"
            );
            self.methods.push((method, slot));
            return;
        };
        let remaining = &segments[1..];

        match &segment.kind {
            SegmentKind::Static => {
                let child = match self
                    .static_children
                    .binary_search_by(|c| c.literal.as_str().cmp(&segment.literal))
                {
                    Ok(i) => &mut self.static_children[i],
                    Err(i) => {
                        self.static_children
                            .insert(i, Node::new(segment.literal.clone(), SegmentKind::Static));
                        &mut self.static_children[i]
                    }
                };
                child.insert(remaining, method, slot);
            }
            SegmentKind::Param { .. } => {
                if !self
                    .param_children
                    .iter()
                    .any(|c| c.literal == segment.literal)
                {
                    self.param_children
                        .push(Node::new(segment.literal.clone(), segment.kind.clone()));
                    // Unconstrained parameters always try last.
                    self.param_children.sort_by_key(|c| {
                        matches!(c.kind, SegmentKind::Param { constraint: None, .. })
                    });
                }
                if let Some(child) = self
                    .param_children
                    .iter_mut()
                    .find(|c| c.literal == segment.literal)
                {
                    child.insert(remaining, method, slot);
                }
            }
            SegmentKind::Wildcard(_) => {
                // Pattern parsing guarantees the wildcard is final.
                let child = self.wildcard_child.get_or_insert_with(|| {
                    Box::new(Node::new(segment.literal.clone(), segment.kind.clone()))
                });
                child.insert(remaining, method, slot);
            }
        }
    }

    /// Matches a request path against the tree.
    pub fn lookup(&self, method: &Method, path: &str) -> MatchOutcome {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let mut path_matched = false;
        match self.find(method, &segments, &mut params, &mut path_matched) {
            Some(slot) => MatchOutcome::Found { slot, params },
            None if path_matched => MatchOutcome::MethodNotAllowed,
            None => MatchOutcome::NotFound,
        }
    }

    fn slot_for(&self, method: &Method, path_matched: &mut bool) -> Option<usize> {
        if !self.methods.is_empty() {
            *path_matched = true;
        }
        self.methods
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, slot)| *slot)
    }

    fn find(
        &self,
        method: &Method,
        segments: &[&str],
        params: &mut Params,
        path_matched: &mut bool,
    ) -> Option<usize> {
        let Some(&segment) = segments.first() else {
            return self.slot_for(method, path_matched);
        };
        let remaining = &segments[1..];

        if let Ok(i) = self
            .static_children
            .binary_search_by(|c| c.literal.as_str().cmp(segment))
        {
            if let Some(slot) = self.static_children[i].find(method, remaining, params, path_matched)
            {
                return Some(slot);
            }
        }

        for child in &self.param_children {
            let SegmentKind::Param { name, constraint } = &child.kind else {
                continue;
            };
            if constraint.as_ref().is_some_and(|re| !re.is_match(segment)) {
                continue;
            }
            let checkpoint = params.len();
            params.push(name.clone(), segment.to_owned());
            if let Some(slot) = child.find(method, remaining, params, path_matched) {
                return Some(slot);
            }
            params.truncate(checkpoint);
        }

        if let Some(child) = &self.wildcard_child {
            if let SegmentKind::Wildcard(name) = &child.kind {
                let checkpoint = params.len();
                params.push(name.clone(), segments.join("/"));
                if let Some(slot) = child.slot_for(method, path_matched) {
                    return Some(slot);
                }
                params.truncate(checkpoint);
            }
        }

        None
    }
}
