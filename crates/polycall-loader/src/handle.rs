use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

use polycall_reflect::{Context, Scope};

use crate::adapter::Adapter;

struct HandleInner {
    id: u64,
    tag: String,
    adapter: Arc<dyn Adapter>,
    raw: Mutex<Option<Box<dyn Any + Send + Sync>>>,
    context: Arc<Context>,
}

/// An adapter-owned load result. Clearing a Handle only releases the
/// adapter's resources once every clone of it is gone — the last
/// `Arc<HandleInner>` to drop runs `Adapter::clear` exactly once via
/// `Drop`, which gives "may be deferred if values originating from it
/// are still live" for free instead of needing separate bookkeeping.
#[derive(Clone)]
pub struct Handle(Arc<HandleInner>);

impl Handle {
    pub(crate) fn new(
        id: u64,
        tag: impl Into<String>,
        adapter: Arc<dyn Adapter>,
        raw: Box<dyn Any + Send + Sync>,
        context: Arc<Context>,
    ) -> Handle {
        Handle(Arc::new(HandleInner {
            id,
            tag: tag.into(),
            adapter,
            raw: Mutex::new(Some(raw)),
            context,
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.0.context
    }

    pub fn scope(&self) -> &Arc<Scope> {
        &self.0.context.scope
    }

    /// Run a closure against the raw adapter-owned payload, e.g. so the
    /// adapter can re-cast it during `discover`.
    pub fn with_raw<R>(&self, f: impl FnOnce(Option<&(dyn Any + Send + Sync)>) -> R) -> R {
        let guard = self.0.raw.lock().expect("handle lock poisoned");
        f(guard.as_deref())
    }

    pub fn is_cleared(&self) -> bool {
        self.0.raw.lock().expect("handle lock poisoned").is_none()
    }

    /// Number of live clones of this Handle, including this one — what
    /// `clear`'s deferral rule checks to decide whether other holders are
    /// still alive.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.lock().expect("handle lock poisoned").take() {
            self.adapter.clear(raw);
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.0.id)
            .field("tag", &self.0.tag)
            .field("cleared", &self.is_cleared())
            .finish()
    }
}
