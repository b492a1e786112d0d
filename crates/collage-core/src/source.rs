//! Imported source images and their display handles.
//!
//! A source is the decoded image an item draws from. Pixels live in the
//! renderer's bitmap store; the core only tracks the natural size and the
//! transient display handle (thumbnail URL, texture id, ...) handed out by
//! the UI layer, so that it can be released exactly once.

use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of an imported source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u64);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "src-{}", self.0)
    }
}

/// Opaque display-only resource owned by an imported image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayHandle(pub String);

impl DisplayHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// External collaborator that frees display handles (`revokeHandle`).
pub trait HandleReleaser {
    /// Release a handle that no item references any more.
    fn release(&mut self, handle: &DisplayHandle);
}

/// Releaser that only records what it was asked to release.
#[derive(Debug, Clone, Default)]
pub struct RecordingReleaser {
    pub released: Vec<DisplayHandle>,
}

impl HandleReleaser for RecordingReleaser {
    fn release(&mut self, handle: &DisplayHandle) {
        self.released.push(handle.clone());
    }
}

/// When handles of removed items are released.
///
/// The freeform editor defers release until the session is cleared: a
/// deleted layer's thumbnail may still be on screen while the layer list
/// re-renders, so the handle is kept alive until `clear`. The cost is that
/// handles of deleted items stay allocated for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Release as soon as the last item using the source is removed.
    OnRemove,
    /// Keep handles until the whole session is cleared.
    #[default]
    OnClear,
}

/// Metadata of one imported image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceImage {
    pub id: SourceId,
    /// Display name (usually the file name).
    pub name: String,
    /// Intrinsic size in pixels.
    pub natural: Size,
    /// Display handle, `None` once released.
    pub handle: Option<DisplayHandle>,
    /// Number of items currently drawing from this source.
    refs: usize,
}

impl SourceImage {
    pub fn refs(&self) -> usize {
        self.refs
    }
}

/// Registry of imported sources with reference counts.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<SourceId, SourceImage>,
    next_id: u64,
    policy: ReleasePolicy,
}

impl SourceRegistry {
    pub fn new(policy: ReleasePolicy) -> Self {
        Self {
            sources: HashMap::new(),
            next_id: 1,
            policy,
        }
    }

    pub fn policy(&self) -> ReleasePolicy {
        self.policy
    }

    /// Register a decoded image. The source starts with zero references.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        natural: Size,
        handle: Option<DisplayHandle>,
    ) -> SourceId {
        let id = SourceId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.sources.insert(
            id,
            SourceImage {
                id,
                name: name.into(),
                natural,
                handle,
                refs: 0,
            },
        );
        id
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceImage> {
        self.sources.get(&id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Note that one more item draws from `id`.
    pub fn retain(&mut self, id: SourceId) {
        if let Some(source) = self.sources.get_mut(&id) {
            source.refs += 1;
        }
    }

    /// Note that an item drawing from `id` went away.
    ///
    /// Under [`ReleasePolicy::OnRemove`] the handle is released and the
    /// source dropped when the count reaches zero. Returns `true` if the
    /// source was dropped.
    pub fn release_ref(&mut self, id: SourceId, releaser: &mut dyn HandleReleaser) -> bool {
        let Some(source) = self.sources.get_mut(&id) else {
            return false;
        };
        source.refs = source.refs.saturating_sub(1);
        if source.refs > 0 || self.policy == ReleasePolicy::OnClear {
            return false;
        }
        if let Some(source) = self.sources.remove(&id) {
            if let Some(handle) = &source.handle {
                releaser.release(handle);
            }
            log::debug!("Released source {}", id);
        }
        true
    }

    /// Release every remaining handle once and forget all sources.
    ///
    /// Returns the ids that were dropped so the caller can evict pixels.
    pub fn clear(&mut self, releaser: &mut dyn HandleReleaser) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self.sources.keys().copied().collect();
        ids.sort();
        for id in &ids {
            if let Some(source) = self.sources.remove(id) {
                if let Some(handle) = &source.handle {
                    releaser.release(handle);
                }
            }
        }
        ids
    }

    /// Iterate sources in import order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceImage> {
        let mut all: Vec<&SourceImage> = self.sources.values().collect();
        all.sort_by_key(|s| s.id);
        all.into_iter()
    }
}
