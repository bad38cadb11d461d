//! Materialization surface
//!
//! Tree nodes never touch a presentation layer directly. Every visible
//! effect goes through `Surface`, addressed by the node's position in its
//! tree plus the item identity, so lookups never leave one tree.

use dashmap::DashMap;
use ldshape_core::{BindTarget, ItemId, NodeAddress};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// How a slot comes into being.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// A clone of the node's template, appended after the previous slot.
    Template,
    /// The pristine template itself, tagged with the item identity.
    InPlace,
    /// A fresh bare element holding a literal.
    Generated,
}

pub trait Surface: Send + Sync {
    /// A tree node now exists at `node`.
    fn attach(&self, node: &NodeAddress, label: &str);
    fn detach(&self, node: &NodeAddress);

    fn materialize(&self, node: &NodeAddress, id: &ItemId, placement: Placement);
    /// Write `value` to the slot's text, or to `target` inside it.
    fn write(&self, node: &NodeAddress, id: &ItemId, target: Option<&BindTarget>, value: &str);
    fn remove(&self, node: &NodeAddress, id: &ItemId);
    /// Back to the pristine template: generated slots gone, in-place
    /// content cleared.
    fn restore(&self, node: &NodeAddress);
    fn set_visible(&self, node: &NodeAddress, visible: bool);
    fn set_marker(&self, node: &NodeAddress, id: &ItemId, marker: &str, on: bool);
}

// ============================================================
// MemorySurface
// ============================================================

#[derive(Clone, Debug, Serialize)]
pub struct NodeView {
    pub label: String,
    pub visible: bool,
    pub slots: Vec<SlotView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SlotView {
    pub id: String,
    pub placement: Placement,
    /// Keyed by bind target; `""` is the slot's own text.
    pub fields: BTreeMap<String, String>,
    pub markers: BTreeSet<String>,
}

impl NodeView {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            visible: true,
            slots: Vec::new(),
        }
    }

    fn slot_mut(&mut self, id: &ItemId) -> Option<&mut SlotView> {
        self.slots.iter_mut().find(|s| s.id == id.as_str())
    }
}

impl SlotView {
    pub fn text(&self) -> Option<&str> {
        self.fields.get("").map(String::as_str)
    }
}

/// In-memory surface, used by the CLI to print a bound tree.
#[derive(Default)]
pub struct MemorySurface {
    nodes: DashMap<NodeAddress, NodeView>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self, node: &NodeAddress) -> Option<NodeView> {
        self.nodes.get(node).map(|v| v.value().clone())
    }

    pub fn is_attached(&self, node: &NodeAddress) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn is_visible(&self, node: &NodeAddress) -> bool {
        self.nodes.get(node).map(|v| v.visible).unwrap_or(false)
    }

    pub fn slot_ids(&self, node: &NodeAddress) -> Vec<String> {
        self.nodes
            .get(node)
            .map(|v| v.slots.iter().map(|s| s.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Text (or first written field) of each slot, in slot order.
    pub fn texts(&self, node: &NodeAddress) -> Vec<String> {
        self.nodes
            .get(node)
            .map(|v| {
                v.slots
                    .iter()
                    .filter_map(|s| s.text().or_else(|| s.fields.values().next().map(String::as_str)))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn attached(&self) -> Vec<NodeAddress> {
        let mut all: Vec<NodeAddress> = self.nodes.iter().map(|e| e.key().clone()).collect();
        all.sort();
        all
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map: BTreeMap<String, NodeView> = self
            .nodes
            .iter()
            .map(|e| (e.key().to_string(), e.value().clone()))
            .collect();
        serde_json::to_value(map).unwrap_or_default()
    }

    /// Indented text rendering of the tree rooted at `/root`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(&NodeAddress::root(), 0, &mut out);
        out
    }

    fn render_node(&self, address: &NodeAddress, depth: usize, out: &mut String) {
        let Some(view) = self.view(address) else {
            return;
        };
        let indent = "  ".repeat(depth);
        let hidden = if view.visible { "" } else { " (hidden)" };
        let _ = writeln!(out, "{}{}{}", indent, view.label, hidden);

        for slot in &view.slots {
            let mut line = format!("{}  - ", indent);
            let fields: Vec<String> = slot
                .fields
                .iter()
                .map(|(target, value)| {
                    if target.is_empty() {
                        value.clone()
                    } else {
                        format!("{} = {}", target, value)
                    }
                })
                .collect();
            line.push_str(&fields.join(", "));
            if !slot.markers.is_empty() {
                let markers: Vec<&str> = slot.markers.iter().map(String::as_str).collect();
                let _ = write!(line, " [{}]", markers.join(" "));
            }
            let _ = writeln!(out, "{}", line);

            let slot_address = address.child(&slot.id);
            for child in self.children_of(&slot_address) {
                self.render_node(&child, depth + 2, out);
            }
        }

        for child in self.children_of(address) {
            self.render_node(&child, depth + 1, out);
        }
    }

    /// Attached nodes one level below `parent` with a numeric segment.
    fn children_of(&self, parent: &NodeAddress) -> Vec<NodeAddress> {
        let prefix = format!("{}/", parent);
        let mut children: Vec<(usize, NodeAddress)> = self
            .nodes
            .iter()
            .filter_map(|e| {
                let rest = e.key().as_str().strip_prefix(&prefix)?;
                let index = rest.parse::<usize>().ok()?;
                Some((index, e.key().clone()))
            })
            .collect();
        children.sort_by_key(|(index, _)| *index);
        children.into_iter().map(|(_, address)| address).collect()
    }
}

impl Surface for MemorySurface {
    fn attach(&self, node: &NodeAddress, label: &str) {
        self.nodes
            .entry(node.clone())
            .or_insert_with(|| NodeView::new(label));
    }

    fn detach(&self, node: &NodeAddress) {
        self.nodes.remove(node);
    }

    fn materialize(&self, node: &NodeAddress, id: &ItemId, placement: Placement) {
        let mut view = self
            .nodes
            .entry(node.clone())
            .or_insert_with(|| NodeView::new(""));
        if view.slot_mut(id).is_some() {
            return;
        }
        view.slots.push(SlotView {
            id: id.to_string(),
            placement,
            fields: BTreeMap::new(),
            markers: BTreeSet::new(),
        });
    }

    fn write(&self, node: &NodeAddress, id: &ItemId, target: Option<&BindTarget>, value: &str) {
        if let Some(mut view) = self.nodes.get_mut(node) {
            if let Some(slot) = view.slot_mut(id) {
                let key = target.map(ToString::to_string).unwrap_or_default();
                slot.fields.insert(key, value.to_string());
            }
        }
    }

    fn remove(&self, node: &NodeAddress, id: &ItemId) {
        if let Some(mut view) = self.nodes.get_mut(node) {
            view.slots.retain(|s| s.id != id.as_str());
        }
    }

    fn restore(&self, node: &NodeAddress) {
        if let Some(mut view) = self.nodes.get_mut(node) {
            view.slots.retain(|s| s.placement == Placement::InPlace);
            for slot in view.slots.iter_mut() {
                slot.fields.clear();
                slot.markers.clear();
            }
        }
    }

    fn set_visible(&self, node: &NodeAddress, visible: bool) {
        if let Some(mut view) = self.nodes.get_mut(node) {
            view.visible = visible;
        }
    }

    fn set_marker(&self, node: &NodeAddress, id: &ItemId, marker: &str, on: bool) {
        if let Some(mut view) = self.nodes.get_mut(node) {
            if let Some(slot) = view.slot_mut(id) {
                if on {
                    slot.markers.insert(marker.to_string());
                } else {
                    slot.markers.remove(marker);
                }
            }
        }
    }
}
