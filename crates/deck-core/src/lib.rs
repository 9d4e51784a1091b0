//! Deck Core - Entity Model and Client State Store
//!
//! This crate provides the state side of the Deck sync client:
//! - Presentation, slide, element and participant types
//! - Inbound event type and the pure folds that apply it
//! - The copy-on-write State Store observed by the UI layer
//! - Local identity providers

pub mod error;
pub mod event;
pub mod identity;
pub mod model;
pub mod reconcile;
pub mod role;
pub mod store;

pub use error::{Error, Result};
pub use event::{Event, EVENT_NAMES};
pub use identity::{FileIdentity, IdentityProvider, StaticIdentity, User, ANONYMOUS};
pub use model::{
    ElementId, ImageBlock, Participant, Presentation, PresentationId, Slide, SlideElement,
    SlideId, TextBlock,
};
pub use role::{AssignableRole, Role};
pub use store::{ElementMap, StateStore, StoreField, StoreSnapshot};
