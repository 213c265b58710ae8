//! Retained vector scene graph.
//!
//! An arena of SVG-shaped elements addressed by [`NodeId`]. The engine mounts
//! into an element carrying a known `id` attribute, builds its groups and
//! paths beneath it once and afterwards only rewrites attributes.

use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Svg,
    Group,
    Path,
    Defs,
    ClipPath,
    Rect,
    LinearGradient,
    RadialGradient,
    Stop,
}

impl ElementKind {
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Svg => "svg",
            ElementKind::Group => "g",
            ElementKind::Path => "path",
            ElementKind::Defs => "defs",
            ElementKind::ClipPath => "clipPath",
            ElementKind::Rect => "rect",
            ElementKind::LinearGradient => "linearGradient",
            ElementKind::RadialGradient => "radialGradient",
            ElementKind::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub kind: ElementKind,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<Element>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// An `<svg>` document of the given size holding one empty `<g id=..>`
    /// container to mount into.
    pub fn with_container(width: u32, height: u32, container_id: &str) -> Self {
        let mut scene = Self::new();
        let root = scene.create(ElementKind::Svg);
        scene.set_attr(root, "xmlns", "http://www.w3.org/2000/svg");
        scene.set_attr(root, "width", width.to_string());
        scene.set_attr(root, "height", height.to_string());
        scene.set_attr(root, "viewBox", format!("0 0 {width} {height}"));
        let container = scene.create(ElementKind::Group);
        scene.set_attr(container, "id", container_id);
        scene.append_child(root, container);
        scene
    }

    pub fn create(&mut self, kind: ElementKind) -> NodeId {
        self.nodes.push(Element {
            kind,
            attrs: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Moves `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].children.retain(|c| *c != child);
        }
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attrs = &mut self.nodes[node.0].attrs;
        match attrs.get_mut(name) {
            Some(existing) => *existing = value,
            None => {
                attrs.insert(name.to_string(), value);
            }
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        self.nodes[node.0].attrs.remove(name);
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0].attrs.get(name).map(String::as_str)
    }

    pub fn element(&self, node: NodeId) -> &Element {
        &self.nodes[node.0]
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.attrs.get("id").is_some_and(|v| v == id))
            .map(NodeId)
    }

    /// Hidden when the node or any ancestor carries `display="none"`.
    pub fn is_displayed(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.attr(id, "display") == Some("none") {
                return false;
            }
            current = self.parent(id);
        }
        true
    }

    /// Serializes every root element and its subtree.
    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.parent.is_none() {
                self.write_node(NodeId(idx), &mut out);
            }
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        let tag = node.kind.tag();
        out.push('<');
        out.push_str(tag);
        for (name, value) in &node.attrs {
            let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
        }
        if node.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &node.children {
            self.write_node(*child, out);
        }
        let _ = write!(out, "</{tag}>");
    }
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}
