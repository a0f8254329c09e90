#![forbid(unsafe_code)]

//! The widget tree: owned nodes, event bindings, and input bubbling.
//!
//! A [`Node`] is a rectangle on the display with a tag, optional handlers,
//! and children it owns. Parents hold the strong handles; children point
//! back with weak ones, so dropping a subtree releases every node in it
//! and no reference cycle can keep a dead page alive.
//!
//! # Design
//!
//! Nodes are shared (`Arc`) because dispatchers hold weak handles to them
//! and events may still be in flight when a page is torn down. Interior
//! state sits behind small mutexes; the intended discipline is that tree
//! mutations happen on the consumer thread, while queries are safe from
//! anywhere.
//!
//! Destruction needs no ceremony: dropping the last handle detaches the
//! node from every dispatcher it was bound to (eagerly, via the recorded
//! bindings) and the registry's weak handles make even a missed unbind
//! harmless.
//!
//! # Input bubbling
//!
//! Gestures walk up the tree: a node without an input handler, or whose
//! handler declines the event, forwards it to its parent. The root is the
//! catch-all.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use hud_core::dispatch::Dispatcher;
use hud_core::event::{InputEvent, RemoteEvent};
use hud_core::registry::{Subscriber, SubscriberId};

use crate::error::TreeError;
use crate::geometry::{Point, Rect, Size};

/// Handler for link traffic delivered to a node.
pub type RemoteHandler = dyn Fn(&Node, &RemoteEvent) + Send + Sync;

/// Handler for gestures. Returns `true` to consume the event, `false` to
/// let it bubble to the parent.
pub type InputHandler = dyn Fn(&Node, &InputEvent) -> bool + Send + Sync;

#[derive(Debug, Clone, Copy)]
struct NodeState {
    frame: Rect,
    visible: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One element of the widget tree.
pub struct Node {
    tag: String,
    state: Mutex<NodeState>,
    parent: Mutex<Weak<Node>>,
    children: Mutex<Vec<Arc<Node>>>,
    on_remote: Mutex<Option<Arc<RemoteHandler>>>,
    on_input: Mutex<Option<Arc<InputHandler>>>,
    remote_bindings: Mutex<Vec<Dispatcher<RemoteEvent>>>,
    input_bindings: Mutex<Vec<Dispatcher<InputEvent>>>,
}

impl Node {
    /// Create a detached, visible node.
    #[must_use]
    pub fn new(tag: impl Into<String>, frame: Rect) -> Arc<Self> {
        Arc::new(Self {
            tag: tag.into(),
            state: Mutex::new(NodeState {
                frame,
                visible: true,
            }),
            parent: Mutex::new(Weak::new()),
            children: Mutex::new(Vec::new()),
            on_remote: Mutex::new(None),
            on_input: Mutex::new(None),
            remote_bindings: Mutex::new(Vec::new()),
            input_bindings: Mutex::new(Vec::new()),
        })
    }

    // ─── Identity and geometry ──────────────────────────────────────────────

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// This node's identity in dispatcher registries.
    #[must_use]
    pub fn subscriber_id(&self) -> SubscriberId {
        SubscriberId::of_ref(self)
    }

    #[must_use]
    pub fn frame(&self) -> Rect {
        lock(&self.state).frame
    }

    pub fn set_position(&self, origin: Point) {
        let mut state = lock(&self.state);
        state.frame = state.frame.with_origin(origin);
    }

    pub fn resize(&self, size: Size) {
        let mut state = lock(&self.state);
        state.frame = state.frame.with_size(size);
    }

    #[must_use]
    pub fn center(&self) -> Point {
        lock(&self.state).frame.center()
    }

    pub fn set_center(&self, center: Point) {
        let mut state = lock(&self.state);
        state.frame = state.frame.with_center(center);
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        lock(&self.state).visible
    }

    pub fn set_visible(&self, visible: bool) {
        lock(&self.state).visible = visible;
    }

    // ─── Handlers ───────────────────────────────────────────────────────────

    /// Install the handler run when bound link traffic arrives.
    pub fn set_on_remote<F>(&self, handler: F)
    where
        F: Fn(&Node, &RemoteEvent) + Send + Sync + 'static,
    {
        let handler: Arc<RemoteHandler> = Arc::new(handler);
        *lock(&self.on_remote) = Some(handler);
    }

    /// Install the handler consulted for gestures before they bubble.
    pub fn set_on_input<F>(&self, handler: F)
    where
        F: Fn(&Node, &InputEvent) -> bool + Send + Sync + 'static,
    {
        let handler: Arc<InputHandler> = Arc::new(handler);
        *lock(&self.on_input) = Some(handler);
    }

    // ─── Tree structure ─────────────────────────────────────────────────────

    #[must_use]
    pub fn parent(&self) -> Option<Arc<Node>> {
        lock(&self.parent).upgrade()
    }

    /// Whether this node currently has a parent.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.parent().is_some()
    }

    /// Snapshot of the child list.
    #[must_use]
    pub fn children(&self) -> Vec<Arc<Node>> {
        lock(&self.children).clone()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        lock(&self.children).len()
    }

    #[must_use]
    pub fn child_at(&self, index: usize) -> Option<Arc<Node>> {
        lock(&self.children).get(index).cloned()
    }

    /// Whether `node` is in this node's subtree (itself included).
    #[must_use]
    pub fn contains(&self, node: &Node) -> bool {
        if std::ptr::eq(std::ptr::from_ref(self), std::ptr::from_ref(node)) {
            return true;
        }
        self.children()
            .iter()
            .any(|child| child.contains(node))
    }

    /// Make this node a child of `parent`.
    ///
    /// Fails if the node already has a parent, or if `parent` lies inside
    /// this node's own subtree (self-attachment included).
    pub fn attach(self: &Arc<Self>, parent: &Arc<Node>) -> Result<(), TreeError> {
        if self.is_attached() {
            return Err(TreeError::AlreadyAttached {
                tag: self.tag.clone(),
            });
        }
        if self.contains(parent) {
            return Err(TreeError::WouldCycle {
                tag: self.tag.clone(),
                target: parent.tag.clone(),
            });
        }
        lock(&parent.children).push(Arc::clone(self));
        *lock(&self.parent) = Arc::downgrade(parent);
        tracing::debug!(tag = self.tag.as_str(), parent = parent.tag.as_str(), "attached");
        Ok(())
    }

    /// Remove this node from its parent and hand the owning handle back.
    ///
    /// The subtree below it stays intact; the caller decides whether it is
    /// re-attached somewhere else or dropped.
    pub fn detach(self: &Arc<Self>) -> Result<Arc<Node>, TreeError> {
        let parent = self.parent().ok_or_else(|| TreeError::NotAttached {
            tag: self.tag.clone(),
        })?;
        let owned = parent
            .remove_child(self)
            .ok_or_else(|| TreeError::NotAttached {
                tag: self.tag.clone(),
            })?;
        *lock(&self.parent) = Weak::new();
        tracing::debug!(tag = self.tag.as_str(), parent = parent.tag.as_str(), "detached");
        Ok(owned)
    }

    /// Reparent this node under `new_parent`, keeping its subtree.
    ///
    /// Moving to the current parent is a no-op. Fails if the node is
    /// detached or `new_parent` lies inside its subtree.
    pub fn move_to(self: &Arc<Self>, new_parent: &Arc<Node>) -> Result<(), TreeError> {
        let old_parent = self.parent().ok_or_else(|| TreeError::NotAttached {
            tag: self.tag.clone(),
        })?;
        if Arc::ptr_eq(&old_parent, new_parent) {
            return Ok(());
        }
        if self.contains(new_parent) {
            return Err(TreeError::WouldCycle {
                tag: self.tag.clone(),
                target: new_parent.tag.clone(),
            });
        }
        // Hold the owning handle locally so the node is alive throughout.
        let owned = old_parent
            .remove_child(self)
            .ok_or_else(|| TreeError::NotAttached {
                tag: self.tag.clone(),
            })?;
        lock(&new_parent.children).push(owned);
        *lock(&self.parent) = Arc::downgrade(new_parent);
        tracing::debug!(
            tag = self.tag.as_str(),
            from = old_parent.tag.as_str(),
            to = new_parent.tag.as_str(),
            "moved"
        );
        Ok(())
    }

    fn remove_child(&self, child: &Node) -> Option<Arc<Node>> {
        let mut children = lock(&self.children);
        let index = children
            .iter()
            .position(|c| std::ptr::eq(Arc::as_ptr(c), std::ptr::from_ref(child)))?;
        Some(children.remove(index))
    }

    /// Visit the subtree bottom-up: children first, then the node itself.
    pub fn apply_recursively(&self, f: &mut dyn FnMut(&Node)) {
        for child in self.children() {
            child.apply_recursively(f);
        }
        f(self);
    }

    /// Indented dump of the subtree, for logs and debugging.
    #[must_use]
    pub fn format_tree(&self) -> String {
        let mut out = String::new();
        self.format_into(&mut out, 0);
        out
    }

    fn format_into(&self, out: &mut String, depth: usize) {
        use std::fmt::Write;
        let state = *lock(&self.state);
        let Rect { origin, size } = state.frame;
        let _ = writeln!(
            out,
            "{:indent$}{} [{}x{} at {},{}]{}",
            "",
            self.tag,
            size.width,
            size.height,
            origin.x,
            origin.y,
            if state.visible { "" } else { " hidden" },
            indent = depth * 2
        );
        for child in self.children() {
            child.format_into(out, depth + 1);
        }
    }

    // ─── Event wiring ───────────────────────────────────────────────────────

    /// Subscribe this node to `name` on a remote-event dispatcher and
    /// remember the registration for teardown at drop.
    pub fn bind_remote(self: &Arc<Self>, dispatcher: &Dispatcher<RemoteEvent>, name: &str) {
        dispatcher.subscribe(name, self);
        let mut bindings = lock(&self.remote_bindings);
        // One recorded clone per dispatcher, however many names it carries.
        if !bindings.iter().any(|b| b.same_dispatcher(dispatcher)) {
            bindings.push(dispatcher.clone());
        }
    }

    /// Subscribe this node to `name` on an input-event dispatcher.
    pub fn bind_input(self: &Arc<Self>, dispatcher: &Dispatcher<InputEvent>, name: &str) {
        dispatcher.subscribe(name, self);
        let mut bindings = lock(&self.input_bindings);
        if !bindings.iter().any(|b| b.same_dispatcher(dispatcher)) {
            bindings.push(dispatcher.clone());
        }
    }

    /// Offer a gesture to this node, bubbling to ancestors until someone
    /// consumes it. Returns whether anyone did.
    pub fn route_input(&self, event: &InputEvent) -> bool {
        let handler = lock(&self.on_input).clone();
        if let Some(handler) = handler {
            if handler(self, event) {
                tracing::trace!(tag = self.tag.as_str(), "input consumed");
                return true;
            }
        }
        match self.parent() {
            Some(parent) => parent.route_input(event),
            None => {
                tracing::trace!(tag = self.tag.as_str(), "input fell off the tree");
                false
            }
        }
    }
}

impl Subscriber<RemoteEvent> for Node {
    fn on_event(&self, event: &RemoteEvent) {
        // Take the handler out of the lock before running it, so a handler
        // may replace itself (or this node's other handlers) freely.
        let handler = lock(&self.on_remote).clone();
        if let Some(handler) = handler {
            handler(self, event);
        }
    }

    fn tag(&self) -> &str {
        &self.tag
    }
}

impl Subscriber<InputEvent> for Node {
    fn on_event(&self, event: &InputEvent) {
        self.route_input(event);
    }

    fn tag(&self) -> &str {
        &self.tag
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let id = SubscriberId::of_ref(&*self);
        let remote = self
            .remote_bindings
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for dispatcher in remote.drain(..) {
            dispatcher.unsubscribe_from_all(id);
        }
        let input = self
            .input_bindings
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for dispatcher in input.drain(..) {
            dispatcher.unsubscribe_from_all(id);
        }
        tracing::trace!(tag = self.tag.as_str(), "node dropped");
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = *lock(&self.state);
        f.debug_struct("Node")
            .field("tag", &self.tag)
            .field("frame", &state.frame)
            .field("visible", &state.visible)
            .field("children", &self.child_count())
            .finish()
    }
}
