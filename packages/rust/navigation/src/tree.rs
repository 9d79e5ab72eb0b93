//! Arena-backed navigation tree.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. Children
//! are owned as index lists; the parent link is only used for lookups
//! (breadcrumbs), so there are no ownership cycles.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use docstitch_shared::{DocStitchError, OrderedUrl, Result, normalize_url};

/// Index of a node inside its [`NavigationTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Which strategy produced a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationSource {
    Semantic,
    Pattern,
    LinkCluster,
    Sitemap,
}

/// One entry of the navigation hierarchy.
#[derive(Debug, Clone)]
pub struct NavigationNode {
    pub title: String,
    /// Absolute, normalized URL. Empty for the synthetic root.
    pub url: String,
    /// Nesting depth; the root is `-1`. Semantic entries count their enclosing lists.
    pub level: i32,
    /// Discovery counter, strictly increasing in insertion order.
    pub order: usize,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

/// A site's reading hierarchy under a single synthetic root.
#[derive(Debug, Clone)]
pub struct NavigationTree {
    nodes: Vec<NavigationNode>,
    source: NavigationSource,
}

impl NavigationTree {
    /// Create a tree holding only its synthetic root.
    pub fn new(root_title: impl Into<String>, source: NavigationSource) -> Self {
        let root = NavigationNode {
            title: root_title.into(),
            url: String::new(),
            level: -1,
            order: 0,
            children: Vec::new(),
            parent: None,
        };
        Self {
            nodes: vec![root],
            source,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn source(&self) -> NavigationSource {
        self.source
    }

    pub fn node(&self, id: NodeId) -> &NavigationNode {
        &self.nodes[id.0]
    }

    /// Number of entries, not counting the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a child under `parent` and return its id.
    pub fn push_child(
        &mut self,
        parent: NodeId,
        title: impl Into<String>,
        url: impl Into<String>,
        level: i32,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NavigationNode {
            title: title.into(),
            url: url.into(),
            level,
            order: id.0,
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// All entries in preorder (document reading order), root excluded.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<NodeId> = self.node(self.root()).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// Titles from the outermost ancestor down to `id`, root excluded.
    pub fn breadcrumb(&self, id: NodeId) -> Vec<String> {
        let mut trail = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.node(cur);
            if node.parent.is_none() {
                break;
            }
            trail.push(node.title.clone());
            current = node.parent;
        }
        trail.reverse();
        trail
    }

    /// Flatten into reading order with breadcrumbs and sequential positions.
    pub fn ordered_urls(&self) -> Vec<OrderedUrl> {
        self.preorder()
            .into_iter()
            .enumerate()
            .map(|(order, id)| {
                let node = self.node(id);
                OrderedUrl {
                    url: node.url.clone(),
                    title: node.title.clone(),
                    level: node.level,
                    breadcrumb: self.breadcrumb(id),
                    order,
                }
            })
            .collect()
    }

    /// Reading-order position and breadcrumb of `url`, if it is in the tree.
    pub fn find_position(&self, url: &str) -> Option<(usize, Vec<String>)> {
        let target = normalize_url(url);
        self.preorder()
            .into_iter()
            .enumerate()
            .find(|(_, id)| self.node(*id).url == target)
            .map(|(position, id)| (position, self.breadcrumb(id)))
    }

    /// Nested JSON rendering of the whole tree.
    pub fn to_json(&self) -> Result<String> {
        let export = ExportTree {
            source: self.source,
            root: self.export_node(self.root()),
        };
        serde_json::to_string_pretty(&export)
            .map_err(|e| DocStitchError::parse(format!("failed to serialize navigation: {e}")))
    }

    /// Write [`Self::to_json`] to `path`.
    pub fn export_structure(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| DocStitchError::io(path, e))
    }

    /// Indented text outline, one entry per line.
    pub fn render_outline(&self) -> String {
        let mut out = String::new();
        for id in self.preorder() {
            let node = self.node(id);
            let indent = "  ".repeat(node.level.max(0) as usize);
            let _ = writeln!(out, "{indent}- {} ({})", node.title, node.url);
        }
        out
    }

    fn export_node(&self, id: NodeId) -> ExportNode {
        let node = self.node(id);
        ExportNode {
            title: node.title.clone(),
            url: node.url.clone(),
            level: node.level,
            order: node.order,
            children: node.children.iter().map(|c| self.export_node(*c)).collect(),
        }
    }
}

#[derive(Serialize)]
struct ExportTree {
    source: NavigationSource,
    #[serde(flatten)]
    root: ExportNode,
}

#[derive(Serialize)]
struct ExportNode {
    title: String,
    url: String,
    level: i32,
    order: usize,
    children: Vec<ExportNode>,
}
