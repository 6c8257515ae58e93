//! Pre/post hook chains around field events
//!
//! Hooks are registered per event and phase and run strictly in registration
//! order. The first hook to fail stops the chain and its error is returned
//! unchanged. No timeout is applied: a hook that never completes stalls the
//! upload that triggered it.

use super::record::StoredFileRecord;
use crate::document::Item;
use crate::error::BoxError;
use crate::storage::IncomingFile;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Result returned by a hook
pub type HookResult = Result<(), BoxError>;

/// Events that support hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Moving an upload into its destination
    Move,
}

impl HookEvent {
    /// Event name as used in hook identifiers (`pre:move`)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
        }
    }
}

/// Whether a hook runs before or after the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// Runs before the event; failure prevents it
    Pre,
    /// Runs after the event; failure is reported but nothing is undone
    Post,
}

impl HookPhase {
    /// Phase name as used in hook identifiers (`pre:move`)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}

/// Arguments passed to `move` hooks
///
/// `record` is only present for `post:move`.
#[derive(Clone, Copy)]
pub struct MoveContext<'a> {
    /// Document the upload belongs to
    pub item: &'a dyn Item,
    /// The upload being moved
    pub file: &'a IncomingFile,
    /// The assembled record (post-move only)
    pub record: Option<&'a StoredFileRecord>,
}

impl fmt::Debug for MoveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoveContext")
            .field("file", &self.file)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

/// A hook run around the `move` event
#[async_trait]
pub trait MoveHook: Send + Sync {
    /// Runs the hook; an error aborts the remaining chain
    async fn call(&self, ctx: &MoveContext<'_>) -> HookResult;
}

/// Adapter turning a synchronous closure into a [`MoveHook`]
pub struct FnHook<F>(pub F);

#[async_trait]
impl<F> MoveHook for FnHook<F>
where
    F: Fn(&MoveContext<'_>) -> HookResult + Send + Sync,
{
    async fn call(&self, ctx: &MoveContext<'_>) -> HookResult {
        (self.0)(ctx)
    }
}

/// Ordered hooks per phase and event
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: HashMap<(HookPhase, HookEvent), Vec<Arc<dyn MoveHook>>>,
}

impl HookChain {
    /// Creates an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook for `phase:event`
    pub fn register(&mut self, phase: HookPhase, event: HookEvent, hook: Arc<dyn MoveHook>) {
        self.hooks.entry((phase, event)).or_default().push(hook);
    }

    /// Number of hooks registered for `phase:event`
    #[must_use]
    pub fn len(&self, phase: HookPhase, event: HookEvent) -> usize {
        self.hooks.get(&(phase, event)).map_or(0, Vec::len)
    }

    /// Whether no hooks are registered at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(Vec::is_empty)
    }

    /// Runs the hooks for `phase:event` in registration order
    ///
    /// # Errors
    ///
    /// Returns the first hook error; later hooks do not run.
    pub async fn run(&self, phase: HookPhase, event: HookEvent, ctx: &MoveContext<'_>) -> HookResult {
        let Some(hooks) = self.hooks.get(&(phase, event)) else {
            return Ok(());
        };

        for (index, hook) in hooks.iter().enumerate() {
            if let Err(err) = hook.call(ctx).await {
                tracing::warn!(
                    phase = phase.as_str(),
                    event = event.as_str(),
                    index,
                    error = %err,
                    "Hook failed"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for ((phase, event), hooks) in &self.hooks {
            map.entry(&format_args!("{}:{}", phase.as_str(), event.as_str()), &hooks.len());
        }
        map.finish()
    }
}
