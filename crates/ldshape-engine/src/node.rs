//! Tree nodes
//!
//! Each node owns the slots it materialized and the child nodes inside
//! them. A focus assignment starts a numbered pass; results are applied only
//! if no newer pass (or clean) started meanwhile. The state lock is never
//! held across an await: a pass resolves, then locks, applies and starts its
//! children's passes, and awaits those only after unlocking.

use crate::engine::Engine;
use crate::lifecycle;
use crate::resolve::{locate, ResolvedItem};
use crate::surface::Placement;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use ldshape_core::oxrdf::{NamedNode, Term, TermRef, Triple};
use ldshape_core::vocab::LDP_CONTAINS;
use ldshape_core::{term_value, Focus, Graph, ItemId, NodeAddress, Shape};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A child node and the focus it should receive.
type Assignment = (Arc<TreeNode>, Option<Focus>);

pub struct TreeNode {
    address: NodeAddress,
    shape: Arc<Shape>,
    engine: Arc<Engine>,
    /// Latest pass number; bumped by every focus assignment and every clean.
    pass: AtomicU64,
    state: Mutex<NodeState>,
    cancel: CancellationToken,
    refresh_started: AtomicBool,
    inbox_started: AtomicBool,
}

#[derive(Default)]
struct NodeState {
    focus: Option<Focus>,
    slots: Vec<Slot>,
    /// Fixed children of a container. Property nodes keep theirs per slot.
    children: Vec<Arc<TreeNode>>,
}

struct Slot {
    id: ItemId,
    /// The literal or resource currently shown; `None` once a singleton
    /// slot has been cleaned.
    bound: Option<Term>,
    children: Vec<Arc<TreeNode>>,
}

impl TreeNode {
    pub(crate) fn new(
        address: NodeAddress,
        shape: Arc<Shape>,
        engine: Arc<Engine>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let label = match (&shape.path, &shape.target_class) {
            (Some(path), _) => path.as_str().to_string(),
            (None, Some(class)) => format!("a {}", class.as_str()),
            (None, None) => "container".to_string(),
        };
        let surface = engine.surface();
        surface.attach(&address, &label);
        if shape.hide_when_empty {
            surface.set_visible(&address, false);
        }

        let children = if shape.is_container() {
            shape
                .children
                .iter()
                .enumerate()
                .map(|(i, child)| {
                    TreeNode::new(
                        address.child(i),
                        Arc::clone(child),
                        Arc::clone(&engine),
                        cancel.child_token(),
                    )
                })
                .collect()
        } else {
            Vec::new()
        };

        Arc::new(Self {
            address,
            shape,
            engine,
            pass: AtomicU64::new(0),
            state: Mutex::new(NodeState {
                children,
                ..Default::default()
            }),
            cancel,
            refresh_started: AtomicBool::new(false),
            inbox_started: AtomicBool::new(false),
        })
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub fn focus(&self) -> Option<Focus> {
        self.lock().focus.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Identities of the slots currently materialized, in order.
    pub fn materialized_ids(&self) -> Vec<ItemId> {
        self.lock().slots.iter().map(|s| s.id.clone()).collect()
    }

    /// Lexical values currently bound, in slot order.
    pub fn values(&self) -> Vec<String> {
        self.lock()
            .slots
            .iter()
            .filter_map(|s| s.bound.as_ref())
            .map(|t| term_value(t.as_ref()))
            .collect()
    }

    /// Every direct child node: a container's fixed children, or the
    /// children of every slot in order.
    pub fn children(&self) -> Vec<Arc<TreeNode>> {
        let state = self.lock();
        let mut children = state.children.clone();
        for slot in &state.slots {
            children.extend(slot.children.iter().cloned());
        }
        children
    }

    pub fn slot_children(&self, id: &ItemId) -> Vec<Arc<TreeNode>> {
        self.lock()
            .slots
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.children.clone())
            .unwrap_or_default()
    }

    /// Assign a new focus. `None` tears the node down; `Some` starts a pass
    /// that supersedes any pass still in flight.
    pub fn set_focus(self: &Arc<Self>, focus: Option<Focus>) -> BoxFuture<'static, ()> {
        let Some(focus) = focus else {
            self.clean();
            return futures::future::ready(()).boxed();
        };
        if self.is_disposed() {
            debug!(node = %self.address, "Ignoring focus on disposed node");
            return futures::future::ready(()).boxed();
        }
        let pass = self.pass.fetch_add(1, Ordering::SeqCst) + 1;
        let node = Arc::clone(self);
        async move { node.run_pass(pass, focus).await }.boxed()
    }

    async fn run_pass(self: Arc<Self>, pass: u64, focus: Focus) {
        let pending = if self.shape.is_container() {
            let located = locate(&focus.graph, &focus.resource, &self.shape);
            let mut state = self.lock();
            if !self.is_current(pass) {
                debug!(node = %self.address, pass, "Ignoring stale container pass");
                return;
            }
            let child_focus = match located {
                Some(resource) => Some(Focus::new(focus.graph.clone(), resource)),
                None => {
                    debug!(node = %self.address, "No instance of target class");
                    None
                }
            };
            state.focus = Some(focus);
            let pending: Vec<BoxFuture<'static, ()>> = state
                .children
                .iter()
                .map(|child| child.set_focus(child_focus.clone()))
                .collect();
            pending
        } else {
            let refresh = self.shape.refresh.is_some();
            let items = self
                .engine
                .resolver()
                .resolve(&focus.graph, &focus.resource, &self.shape, refresh)
                .await;
            let mut state = self.lock();
            if !self.is_current(pass) {
                debug!(node = %self.address, pass, "Ignoring stale resolution pass");
                return;
            }
            debug!(node = %self.address, pass, items = items.len(), "Applying resolution pass");
            state.focus = Some(focus);
            let assignments = self.apply(&mut state, items);
            dispatch(assignments)
        };

        join_all(pending).await;
        self.start_lifecycle();
    }

    /// Idempotent teardown. Supersedes any pass in flight.
    pub fn clean(&self) {
        self.teardown(false);
    }

    /// `clean` plus cancellation of every timer in this subtree.
    pub fn dispose(&self) {
        self.cancel.cancel();
        self.teardown(true);
        self.engine.surface().detach(&self.address);
    }

    /// Bound state as triples rooted at the current focus resource.
    pub fn snapshot(&self) -> Graph {
        let (triples, children) = {
            let state = self.lock();
            let Some(focus) = state.focus.as_ref() else {
                return Graph::new();
            };
            let mut triples = Vec::new();
            let mut children = state.children.clone();
            if let Some(path) = &self.shape.path {
                for slot in &state.slots {
                    if let Some(term) = &slot.bound {
                        triples.push(Triple::new(
                            focus.resource.clone(),
                            path.clone(),
                            term.clone(),
                        ));
                        children.extend(slot.children.iter().cloned());
                    }
                }
            }
            (triples, children)
        };

        children
            .iter()
            .map(|child| child.snapshot())
            .fold(Graph::from_triples(triples), |acc, g| acc.merge(&g))
    }

    // ============================================================
    // Applying a pass
    // ============================================================

    fn apply(&self, state: &mut NodeState, items: Vec<ResolvedItem>) -> Vec<Assignment> {
        let items: Vec<ResolvedItem> = if self.shape.hide_when_empty {
            items
                .into_iter()
                .filter(|item| {
                    !matches!(item, ResolvedItem::Literal { value, .. } if value.value().is_empty())
                })
                .collect()
        } else {
            items
        };
        let any = !items.is_empty();

        let assignments = if self.shape.is_growth_only() {
            self.append_items(state, items)
        } else if self.shape.singleton {
            self.bind_singleton(state, items)
        } else {
            self.replace_slots(state, items)
        };

        if self.shape.hide_when_empty {
            let visible = any || (self.shape.is_growth_only() && !state.slots.is_empty());
            self.engine.surface().set_visible(&self.address, visible);
        }
        assignments
    }

    fn replace_slots(&self, state: &mut NodeState, items: Vec<ResolvedItem>) -> Vec<Assignment> {
        let surface = self.engine.surface();
        for slot in state.slots.drain(..) {
            for child in &slot.children {
                child.dispose();
            }
            surface.remove(&self.address, &slot.id);
        }

        let mut assignments = Vec::new();
        for item in items {
            let (slot, mut bound) = self.materialize(item);
            state.slots.push(slot);
            assignments.append(&mut bound);
        }
        assignments
    }

    fn bind_singleton(&self, state: &mut NodeState, items: Vec<ResolvedItem>) -> Vec<Assignment> {
        let surface = self.engine.surface();
        let mut items = items.into_iter();
        let Some(first) = items.next() else {
            surface.restore(&self.address);
            let mut assignments = Vec::new();
            for slot in state.slots.iter_mut() {
                slot.bound = None;
                assignments.extend(slot.children.iter().map(|c| (Arc::clone(c), None)));
            }
            return assignments;
        };
        let ignored = items.count();
        if ignored > 0 {
            debug!(node = %self.address, ignored, "Singleton binds only the first item");
        }

        match state.slots.first_mut() {
            Some(slot) => {
                surface.restore(&self.address);
                self.bind_slot(slot, first)
            }
            None => {
                let mut slot = Slot {
                    id: first.id().clone(),
                    bound: None,
                    children: Vec::new(),
                };
                surface.materialize(&self.address, &slot.id, Placement::InPlace);
                let assignments = self.bind_slot(&mut slot, first);
                state.slots.push(slot);
                assignments
            }
        }
    }

    /// Growth-only: append items not already shown, destroy nothing.
    fn append_items(&self, state: &mut NodeState, items: Vec<ResolvedItem>) -> Vec<Assignment> {
        let mut assignments = Vec::new();
        for item in items {
            let term = item.term();
            if state.slots.iter().any(|s| s.bound.as_ref() == Some(&term)) {
                debug!(node = %self.address, value = %term, "Already materialized");
                continue;
            }
            let (slot, mut bound) = self.materialize(item);
            state.slots.push(slot);
            assignments.append(&mut bound);
        }
        assignments
    }

    fn materialize(&self, item: ResolvedItem) -> (Slot, Vec<Assignment>) {
        let placement = match (&item, &self.shape.bind) {
            (ResolvedItem::Literal { .. }, None) => Placement::Generated,
            _ => Placement::Template,
        };
        let mut slot = Slot {
            id: item.id().clone(),
            bound: None,
            children: Vec::new(),
        };
        self.engine
            .surface()
            .materialize(&self.address, &slot.id, placement);
        let assignments = self.bind_slot(&mut slot, item);
        (slot, assignments)
    }

    /// Write an item into a slot and work out what its children receive.
    fn bind_slot(&self, slot: &mut Slot, item: ResolvedItem) -> Vec<Assignment> {
        let surface = self.engine.surface();
        let bind = self.shape.bind.as_ref();
        match &item {
            ResolvedItem::Literal { value, .. } => {
                surface.write(&self.address, &slot.id, bind, value.value());
            }
            ResolvedItem::Node { .. } => {
                if bind.is_some() {
                    surface.write(&self.address, &slot.id, bind, &item.value());
                }
            }
        }
        slot.bound = Some(item.term());

        match item {
            ResolvedItem::Literal { .. } => slot
                .children
                .iter()
                .map(|child| (Arc::clone(child), None))
                .collect(),
            ResolvedItem::Node { graph, resource, .. } => {
                if slot.children.is_empty() {
                    slot.children = self.spawn_children(&slot.id);
                }
                let focus = Focus::new(graph, resource);
                slot.children
                    .iter()
                    .map(|child| (Arc::clone(child), Some(focus.clone())))
                    .collect()
            }
        }
    }

    fn spawn_children(&self, id: &ItemId) -> Vec<Arc<TreeNode>> {
        let slot_address = self.address.child(id);
        self.shape
            .children
            .iter()
            .enumerate()
            .map(|(i, shape)| {
                TreeNode::new(
                    slot_address.child(i),
                    Arc::clone(shape),
                    Arc::clone(&self.engine),
                    self.cancel.child_token(),
                )
            })
            .collect()
    }

    fn teardown(&self, disposing: bool) {
        self.pass.fetch_add(1, Ordering::SeqCst);
        let surface = self.engine.surface();

        let (released, kept) = {
            let mut state = self.lock();
            state.focus = None;
            let mut released = Vec::new();
            let mut kept = Vec::new();
            if self.shape.singleton && !disposing {
                for slot in state.slots.iter_mut() {
                    slot.bound = None;
                    released.append(&mut slot.children);
                }
            } else {
                for slot in state.slots.drain(..) {
                    surface.remove(&self.address, &slot.id);
                    released.extend(slot.children);
                }
            }
            if disposing {
                released.append(&mut state.children);
            } else {
                kept.extend(state.children.iter().cloned());
            }
            (released, kept)
        };

        for child in released {
            child.dispose();
        }
        for child in kept {
            child.clean();
        }
        surface.restore(&self.address);
        if self.shape.hide_when_empty {
            surface.set_visible(&self.address, false);
        }
    }

    // ============================================================
    // Lifecycle hooks
    // ============================================================

    fn start_lifecycle(self: &Arc<Self>) {
        if let Some(interval) = self.shape.refresh {
            if !self.refresh_started.swap(true, Ordering::SeqCst) {
                lifecycle::spawn_refresh(Arc::downgrade(self), interval, self.cancel.clone());
            }
        }
        if let Some(inbox) = self.shape.inbox_target() {
            if !self.inbox_started.swap(true, Ordering::SeqCst) {
                lifecycle::spawn_inbox(
                    Arc::downgrade(self),
                    inbox.clone(),
                    self.engine.config().inbox.poll_delays(),
                    self.cancel.clone(),
                );
            }
        }
    }

    /// Fetch the inbox listing and append every member not yet shown.
    pub(crate) async fn poll_inbox(self: &Arc<Self>, inbox: &NamedNode) {
        let pass = self.pass.load(Ordering::SeqCst);
        let Some(focus_graph) = self.focus().map(|focus| focus.graph) else {
            debug!(node = %self.address, "Skipping inbox poll without focus");
            return;
        };
        let surface = Arc::clone(self.engine.surface());
        if let Some(style) = &self.shape.ldn_style {
            for id in self.materialized_ids() {
                surface.set_marker(&self.address, &id, style, false);
            }
        }

        let fetcher = Arc::clone(self.engine.fetcher());
        let listing = match fetcher.fetch(inbox.as_str()).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(node = %self.address, inbox = %inbox, error = %e, "Inbox fetch failed");
                return;
            }
        };
        let members: Vec<NamedNode> = listing
            .objects(inbox.as_ref().into(), LDP_CONTAINS)
            .filter_map(|term| match term {
                TermRef::NamedNode(member) => Some(member.into_owned()),
                _ => None,
            })
            .collect();

        let fresh: Vec<NamedNode> = {
            let state = self.lock();
            members
                .into_iter()
                .filter(|member| {
                    let term = Term::from(member.clone());
                    !state.slots.iter().any(|s| s.bound.as_ref() == Some(&term))
                })
                .collect()
        };
        debug!(node = %self.address, inbox = %inbox, fresh = fresh.len(), "Polled inbox");

        let fetched = join_all(fresh.into_iter().map(|member| {
            let fetcher = Arc::clone(&fetcher);
            async move {
                let result = fetcher.fetch(member.as_str()).await;
                (member, result)
            }
        }))
        .await;
        let items: Vec<ResolvedItem> = fetched
            .into_iter()
            .filter_map(|(member, result)| match result {
                Ok(graph) if !graph.is_empty() => Some(ResolvedItem::Node {
                    id: ItemId::generate(),
                    graph: focus_graph.merge(&graph),
                    resource: member.into(),
                    sort_key: None,
                }),
                Ok(_) => {
                    warn!(member = %member, "Inbox member is empty");
                    None
                }
                Err(e) => {
                    warn!(member = %member, error = %e, "Inbox member fetch failed");
                    None
                }
            })
            .collect();

        let pending = {
            let mut state = self.lock();
            if !self.is_current(pass) {
                debug!(node = %self.address, "Discarding superseded inbox poll");
                return;
            }
            let before = state.slots.len();
            let assignments = self.append_items(&mut state, items);
            if let Some(style) = &self.shape.ldn_style {
                for slot in &state.slots[before..] {
                    surface.set_marker(&self.address, &slot.id, style, true);
                }
            }
            if self.shape.hide_when_empty {
                surface.set_visible(&self.address, !state.slots.is_empty());
            }
            info!(
                node = %self.address,
                added = state.slots.len() - before,
                "Appended inbox members"
            );
            dispatch(assignments)
        };

        join_all(pending).await;
    }

    fn is_current(&self, pass: u64) -> bool {
        self.pass.load(Ordering::SeqCst) == pass
    }

    fn lock(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Start every child's pass in order. Called with the parent's state lock
/// held so overlapping parent passes hand focus down in pass order.
fn dispatch(assignments: Vec<Assignment>) -> Vec<BoxFuture<'static, ()>> {
    assignments
        .into_iter()
        .map(|(child, focus)| child.set_focus(focus))
        .collect()
}

impl std::fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNode")
            .field("address", &self.address)
            .field("pass", &self.pass.load(Ordering::SeqCst))
            .finish()
    }
}
