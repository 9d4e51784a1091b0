//! State Store - the client-side mirror of shared presentation state
//!
//! Every observable field is published as an `Arc`. Updates never mutate a
//! published value in place: they build the next value from the previous one
//! and swap in a fresh `Arc`, so observers can detect change with
//! [`Arc::ptr_eq`]. Update closures run under the field's write lock and must
//! not call back into the store.

use crate::model::{Participant, Presentation, Slide, SlideElement, SlideId};
use crate::role::Role;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Element lists keyed by owning slide
pub type ElementMap = HashMap<SlideId, Vec<SlideElement>>;

/// Capacity of the change notification channel
const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Identifies which observable field an update touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreField {
    Slides,
    Elements,
    Participants,
    CurrentRole,
    Connected,
}

/// Point-in-time view of every field
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub slides: Arc<Vec<Slide>>,
    pub elements: Arc<ElementMap>,
    pub participants: Arc<Vec<Participant>>,
    pub current_role: Role,
    pub connected: bool,
}

/// Authoritative local mirror of one room visit
pub struct StateStore {
    slides: RwLock<Arc<Vec<Slide>>>,
    elements: RwLock<Arc<ElementMap>>,
    participants: RwLock<Arc<Vec<Participant>>>,
    current_role: RwLock<Role>,
    connected: RwLock<bool>,
    changes: broadcast::Sender<StoreField>,
}

impl StateStore {
    /// Create an empty, disconnected store
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Self {
            slides: RwLock::new(Arc::new(Vec::new())),
            elements: RwLock::new(Arc::new(HashMap::new())),
            participants: RwLock::new(Arc::new(Vec::new())),
            current_role: RwLock::new(Role::default()),
            connected: RwLock::new(false),
            changes,
        }
    }

    pub fn slides(&self) -> Arc<Vec<Slide>> {
        self.slides.read().clone()
    }

    pub fn elements(&self) -> Arc<ElementMap> {
        self.elements.read().clone()
    }

    /// Elements of a single slide (empty if the slide is unknown)
    pub fn elements_of(&self, slide_id: &str) -> Vec<SlideElement> {
        self.elements
            .read()
            .get(slide_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn participants(&self) -> Arc<Vec<Participant>> {
        self.participants.read().clone()
    }

    pub fn current_role(&self) -> Role {
        *self.current_role.read()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.read()
    }

    /// Read every field at once
    pub fn snapshot(&self) -> StoreSnapshot {
        let (slides, elements) = {
            let slides = self.slides.read();
            let elements = self.elements.read();
            (slides.clone(), elements.clone())
        };
        StoreSnapshot {
            slides,
            elements,
            participants: self.participants(),
            current_role: self.current_role(),
            connected: self.is_connected(),
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreField> {
        self.changes.subscribe()
    }

    /// Replace the slide list. `None` from `f` leaves the published value untouched.
    pub fn update_slides<F>(&self, f: F) -> bool
    where
        F: FnOnce(&Vec<Slide>) -> Option<Vec<Slide>>,
    {
        let changed = swap(&self.slides, f);
        self.notify(changed, StoreField::Slides)
    }

    /// Replace the element map. `None` from `f` leaves the published value untouched.
    pub fn update_elements<F>(&self, f: F) -> bool
    where
        F: FnOnce(&ElementMap) -> Option<ElementMap>,
    {
        let changed = swap(&self.elements, f);
        self.notify(changed, StoreField::Elements)
    }

    /// Replace slides and the element map as one step.
    ///
    /// Both write locks are held (slides first) while `f` runs, so a
    /// [`snapshot`](Self::snapshot) never pairs a slide list with an element
    /// map from a different update. `None` leaves both untouched.
    pub fn update_document<F>(&self, f: F) -> bool
    where
        F: FnOnce(&Vec<Slide>, &ElementMap) -> Option<(Vec<Slide>, ElementMap)>,
    {
        let changed = {
            let mut slides = self.slides.write();
            let mut elements = self.elements.write();
            match f(&slides, &elements) {
                Some((next_slides, next_elements)) => {
                    *slides = Arc::new(next_slides);
                    *elements = Arc::new(next_elements);
                    true
                }
                None => false,
            }
        };
        self.notify(changed, StoreField::Slides);
        self.notify(changed, StoreField::Elements)
    }

    /// Replace the roster. `None` from `f` leaves the published value untouched.
    pub fn update_participants<F>(&self, f: F) -> bool
    where
        F: FnOnce(&Vec<Participant>) -> Option<Vec<Participant>>,
    {
        let changed = swap(&self.participants, f);
        self.notify(changed, StoreField::Participants)
    }

    pub fn update_current_role<F>(&self, f: F) -> bool
    where
        F: FnOnce(Role) -> Role,
    {
        let changed = {
            let mut role = self.current_role.write();
            let next = f(*role);
            let changed = next != *role;
            *role = next;
            changed
        };
        self.notify(changed, StoreField::CurrentRole)
    }

    pub fn set_current_role(&self, role: Role) -> bool {
        self.update_current_role(|_| role)
    }

    pub fn set_connected(&self, connected: bool) -> bool {
        let changed = {
            let mut flag = self.connected.write();
            let changed = *flag != connected;
            *flag = connected;
            changed
        };
        self.notify(changed, StoreField::Connected)
    }

    /// Overwrite slides and the element map with a fetched document.
    ///
    /// This is a full replace: anything folded since the last snapshot is dropped.
    pub fn replace_document(&self, presentation: &Presentation) {
        let slides = presentation.slides.clone();
        let elements: ElementMap = presentation
            .slides
            .iter()
            .map(|s| (s.id.clone(), s.elements.clone()))
            .collect();

        debug!(
            presentation = %presentation.id,
            slides = slides.len(),
            "Replacing store contents with snapshot"
        );

        self.update_document(|_, _| Some((slides, elements)));
    }

    /// Clear all state, as on entering a room
    pub fn reset(&self) {
        self.update_slides(|_| Some(Vec::new()));
        self.update_elements(|_| Some(HashMap::new()));
        self.update_participants(|_| Some(Vec::new()));
        self.set_current_role(Role::default());
        self.set_connected(false);
    }

    fn notify(&self, changed: bool, field: StoreField) -> bool {
        if changed {
            let _ = self.changes.send(field);
        }
        changed
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("slides", &self.slides.read().len())
            .field("participants", &self.participants.read().len())
            .field("current_role", &self.current_role())
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn swap<T, F>(cell: &RwLock<Arc<T>>, f: F) -> bool
where
    F: FnOnce(&T) -> Option<T>,
{
    let mut published = cell.write();
    match f(&published) {
        Some(next) => {
            *published = Arc::new(next);
            true
        }
        None => false,
    }
}
