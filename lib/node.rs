//! Lazy rebuild primitives for trees of dependent computations.
//!
//! Every node carries a [`Status`]: a shared "ready" flag with a non-owning
//! link to the status of its parent. Mutating a node invalidates it and all of
//! its ancestors; reading a derived value from a node rebuilds exactly the
//! stale nodes beneath it, children first.
//!
//! Three operations make up the whole contract:
//! - [`Status::invalidate`] must be called by every method that changes a
//!   node's parameters, after the new parameters have been validated;
//! - [`Status::when_stale`] runs an internal build step only if the node is
//!   stale, without touching the flag;
//! - [`Rebuild::make_ready`] must be called before any derived value is
//!   returned.

use std::{
    cell::{ Cell, RefCell },
    fmt,
    ops::{ Deref, DerefMut },
    rc::{ Rc, Weak },
};
use crate::error::Result;

#[derive(Debug, Default)]
struct Flag {
    ready: Cell<bool>,
    parent: RefCell<Weak<Flag>>,
}

/// Ready flag of a single node, linked to its parent's.
///
/// Statuses are created not-ready and without a parent.
#[derive(Default)]
pub struct Status(Rc<Flag>);

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
            "Status {{ ready: {}, attached: {} }}",
            self.0.ready.get(),
            self.0.parent.borrow().strong_count() > 0,
        )
    }
}

impl Status {
    /// Create a new, not-ready status with no parent.
    pub fn new() -> Self { Self::default() }

    /// Return `true` if the node's derived state is up to date.
    pub fn is_ready(&self) -> bool { self.0.ready.get() }

    /// Set `parent` as the parent of `self`, replacing any previous link.
    ///
    /// The parent is invalidated, since it now depends on a new child.
    pub fn attach_to(&self, parent: &Status) {
        *self.0.parent.borrow_mut() = Rc::downgrade(&parent.0);
        parent.invalidate();
    }

    /// Remove the link to the parent, if any.
    pub fn detach(&self) {
        *self.0.parent.borrow_mut() = Weak::new();
    }

    /// Return a handle to the parent's status, if the parent is still alive.
    pub fn parent(&self) -> Option<Status> {
        self.0.parent.borrow().upgrade().map(Status)
    }

    /// Return `true` if `self` and `other` are the same node's status.
    pub fn same_as(&self, other: &Status) -> bool { Rc::ptr_eq(&self.0, &other.0) }

    /// Mark `self` and every ancestor as stale.
    ///
    /// The walk stops at the first node that is already stale: a stale node
    /// cannot have a ready ancestor.
    pub fn invalidate(&self) {
        let mut cur: Option<Rc<Flag>> = Some(Rc::clone(&self.0));
        let mut depth: usize = 0;
        while let Some(flag) = cur {
            if !flag.ready.get() { break; }
            flag.ready.set(false);
            depth += 1;
            cur = flag.parent.borrow().upgrade();
        }
        if depth > 0 {
            tracing::trace!(depth, "invalidated node chain");
        }
    }

    /// Run `build` only if the node is stale, leaving the flag untouched.
    pub fn when_stale<F, T>(&self, build: F) -> Option<T>
    where F: FnOnce() -> T
    {
        (!self.is_ready()).then(build)
    }

    pub(crate) fn mark_ready(&self) { self.0.ready.set(true); }
}

/// A node whose derived state can be recomputed from its parameters and the
/// derived state of its children.
pub trait Rebuild {
    /// Return the node's status.
    fn status(&self) -> &Status;

    /// Recompute all derived state.
    ///
    /// Implementors should bring any children up to date first (via their
    /// [`make_ready`][Self::make_ready]) and must not change their own
    /// parameters. This method is only called on stale nodes.
    fn rebuild(&mut self) -> Result<()>;

    /// Return `true` if the node's derived state is up to date.
    fn is_ready(&self) -> bool { self.status().is_ready() }

    /// Mark the node and its ancestors stale.
    fn invalidate(&self) { self.status().invalidate() }

    /// Rebuild the node if it is stale.
    ///
    /// If [`rebuild`][Self::rebuild] fails, the node stays stale so that a
    /// later call retries from scratch.
    fn make_ready(&mut self) -> Result<()> {
        if !self.status().is_ready() {
            self.rebuild()?;
            self.status().mark_ready();
        }
        Ok(())
    }
}

/// Mutable handle to a child node, tied to its parent's status.
///
/// The child's own setters invalidate the parent as usual. If the child is
/// replaced wholesale through this handle, the replacement is linked to the
/// parent (and the parent invalidated) when the handle is dropped.
pub struct ChildMut<'a, T>
where T: Rebuild + ?Sized
{
    node: &'a mut T,
    parent: &'a Status,
}

impl<'a, T> ChildMut<'a, T>
where T: Rebuild + ?Sized
{
    /// Wrap `node`, a child of the node owning `parent`.
    pub fn new(node: &'a mut T, parent: &'a Status) -> Self {
        Self { node, parent }
    }
}

impl<T> Deref for ChildMut<'_, T>
where T: Rebuild + ?Sized
{
    type Target = T;

    fn deref(&self) -> &Self::Target { self.node }
}

impl<T> DerefMut for ChildMut<'_, T>
where T: Rebuild + ?Sized
{
    fn deref_mut(&mut self) -> &mut Self::Target { self.node }
}

impl<T> Drop for ChildMut<'_, T>
where T: Rebuild + ?Sized
{
    fn drop(&mut self) {
        let status = self.node.status();
        let linked
            = status.parent().is_some_and(|p| p.same_as(self.parent));
        if !linked {
            tracing::trace!("relinking replaced child node");
            status.attach_to(self.parent);
        }
    }
}
