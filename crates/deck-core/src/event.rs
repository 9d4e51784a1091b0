//! Inbound change notifications pushed by the shared-state server

use crate::model::{ElementId, Participant, Slide, SlideElement, SlideId};
use crate::role::Role;

/// A named event received over the realtime channel
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Full roster, sent once after joining
    InitialUsers(Vec<Participant>),
    UserJoined { name: String, role: Role },
    UserLeft { name: String },
    UserRoleUpdated { name: String, role: Role },
    /// Server-directed correction of the local user's own role
    RoleChanged { role: Role },
    SlideAdded(Slide),
    ElementAdded { slide_id: SlideId, element: SlideElement },
    ElementUpdated { slide_id: SlideId, element: SlideElement },
    ElementRemoved { slide_id: SlideId, element_id: ElementId },
}

impl Event {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Event::InitialUsers(_) => "InitialUsers",
            Event::UserJoined { .. } => "UserJoined",
            Event::UserLeft { .. } => "UserLeft",
            Event::UserRoleUpdated { .. } => "UserRoleUpdated",
            Event::RoleChanged { .. } => "RoleChanged",
            Event::SlideAdded(_) => "SlideAdded",
            Event::ElementAdded { .. } => "ElementAdded",
            Event::ElementUpdated { .. } => "ElementUpdated",
            Event::ElementRemoved { .. } => "ElementRemoved",
        }
    }
}

/// All event names understood by the client
pub const EVENT_NAMES: [&str; 9] = [
    "InitialUsers",
    "UserJoined",
    "UserLeft",
    "UserRoleUpdated",
    "RoleChanged",
    "SlideAdded",
    "ElementAdded",
    "ElementUpdated",
    "ElementRemoved",
];
