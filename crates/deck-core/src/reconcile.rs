//! Folding inbound events into the State Store
//!
//! Each fold is a pure function from the previous value of one field to its
//! next value. `None` means the event does not change that field, which is
//! also how references to unknown slides or elements are ignored.

use crate::event::Event;
use crate::model::{Participant, Slide, SlideElement};
use crate::role::Role;
use crate::store::{ElementMap, StateStore};
use tracing::{debug, trace};

/// Next roster after `event`
pub fn fold_participants(roster: &[Participant], event: &Event) -> Option<Vec<Participant>> {
    match event {
        Event::InitialUsers(list) => Some(list.clone()),
        Event::UserJoined { name, role } => {
            let mut next = roster.to_vec();
            next.push(Participant::new(name.clone(), *role));
            Some(next)
        }
        Event::UserLeft { name } => {
            if !roster.iter().any(|p| &p.name == name) {
                return None;
            }
            Some(roster.iter().filter(|p| &p.name != name).cloned().collect())
        }
        Event::UserRoleUpdated { name, role } => {
            if !roster.iter().any(|p| &p.name == name && p.role != *role) {
                return None;
            }
            Some(
                roster
                    .iter()
                    .map(|p| {
                        if &p.name == name {
                            Participant::new(p.name.clone(), *role)
                        } else {
                            p.clone()
                        }
                    })
                    .collect(),
            )
        }
        Event::RoleChanged { .. }
        | Event::SlideAdded(_)
        | Event::ElementAdded { .. }
        | Event::ElementUpdated { .. }
        | Event::ElementRemoved { .. } => None,
    }
}

/// Next role of the local user after `event`
pub fn fold_current_role(current: Role, event: &Event, local_user: Option<&str>) -> Role {
    match event {
        Event::InitialUsers(list) => local_user
            .and_then(|me| list.iter().find(|p| p.name == me))
            .map_or(current, |p| p.role),
        Event::UserRoleUpdated { name, role } if Some(name.as_str()) == local_user => *role,
        Event::RoleChanged { role } => *role,
        Event::UserRoleUpdated { .. }
        | Event::UserJoined { .. }
        | Event::UserLeft { .. }
        | Event::SlideAdded(_)
        | Event::ElementAdded { .. }
        | Event::ElementUpdated { .. }
        | Event::ElementRemoved { .. } => current,
    }
}

/// Next slide list after `event`
pub fn fold_slides(slides: &[Slide], event: &Event) -> Option<Vec<Slide>> {
    match event {
        Event::SlideAdded(slide) => {
            let mut next = slides.to_vec();
            next.push(slide.clone());
            Some(next)
        }
        Event::InitialUsers(_)
        | Event::UserJoined { .. }
        | Event::UserLeft { .. }
        | Event::UserRoleUpdated { .. }
        | Event::RoleChanged { .. }
        | Event::ElementAdded { .. }
        | Event::ElementUpdated { .. }
        | Event::ElementRemoved { .. } => None,
    }
}

/// Next element map after `event`
pub fn fold_elements(map: &ElementMap, event: &Event) -> Option<ElementMap> {
    match event {
        Event::SlideAdded(slide) => {
            let mut next = map.clone();
            next.insert(slide.id.clone(), Vec::new());
            Some(next)
        }
        Event::ElementAdded { slide_id, element } => {
            let list = map.get(slide_id)?;
            let mut appended = list.clone();
            appended.push(element.clone());
            Some(with_list(map, slide_id, appended))
        }
        Event::ElementUpdated { slide_id, element } => {
            let list = map.get(slide_id)?;
            let index = list.iter().position(|e| e.id() == element.id())?;
            if list[index] == *element {
                return None;
            }
            let mut replaced = list.clone();
            replaced[index] = element.clone();
            Some(with_list(map, slide_id, replaced))
        }
        Event::ElementRemoved { slide_id, element_id } => {
            let list = map.get(slide_id)?;
            if !list.iter().any(|e| e.id() == element_id) {
                return None;
            }
            let kept: Vec<SlideElement> = list
                .iter()
                .filter(|e| e.id() != element_id)
                .cloned()
                .collect();
            Some(with_list(map, slide_id, kept))
        }
        Event::InitialUsers(_)
        | Event::UserJoined { .. }
        | Event::UserLeft { .. }
        | Event::UserRoleUpdated { .. }
        | Event::RoleChanged { .. } => None,
    }
}

/// Apply one inbound event to the store
pub fn apply(store: &StateStore, event: &Event, local_user: Option<&str>) {
    trace!(event = event.name(), "Folding event");

    let changed = match event {
        Event::InitialUsers(_) | Event::UserRoleUpdated { .. } => {
            let roster = store.update_participants(|r| fold_participants(r, event));
            let role = store.update_current_role(|r| fold_current_role(r, event, local_user));
            roster || role
        }
        Event::UserJoined { .. } | Event::UserLeft { .. } => {
            store.update_participants(|r| fold_participants(r, event))
        }
        Event::RoleChanged { .. } => {
            store.update_current_role(|r| fold_current_role(r, event, local_user))
        }
        Event::SlideAdded(_) => store.update_document(|slides, elements| {
            let next_slides = fold_slides(slides, event)?;
            let next_elements =
                fold_elements(elements, event).unwrap_or_else(|| elements.clone());
            Some((next_slides, next_elements))
        }),
        Event::ElementAdded { .. } | Event::ElementUpdated { .. } | Event::ElementRemoved { .. } => {
            store.update_elements(|m| fold_elements(m, event))
        }
    };

    if !changed {
        debug!(event = event.name(), "Event left store unchanged");
    }
}

fn with_list(map: &ElementMap, slide_id: &str, list: Vec<SlideElement>) -> ElementMap {
    let mut next = map.clone();
    next.insert(slide_id.to_string(), list);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageBlock, TextBlock};

    fn text_at(id: &str, x: f64, y: f64) -> SlideElement {
        SlideElement::Text(TextBlock {
            id: id.into(),
            x,
            y,
            width: 10.0,
            height: 10.0,
            text: "hi".into(),
            font_size: 16.0,
            font_family: "Arial".into(),
            color: "#000000".into(),
        })
    }

    fn image(id: &str) -> SlideElement {
        SlideElement::Image(ImageBlock {
            id: id.into(),
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 80.0,
            url: "welcome.png".into(),
        })
    }

    fn store_with_slide(slide_id: &str) -> StateStore {
        let store = StateStore::new();
        apply(&store, &Event::SlideAdded(Slide::new(slide_id, 0)), None);
        store
    }

    #[test]
    fn test_initial_users_sets_local_role() {
        let store = StateStore::new();
        let event = Event::InitialUsers(vec![
            Participant::new("bob", Role::Creator),
            Participant::new("alice", Role::Editor),
        ]);

        apply(&store, &event, Some("alice"));

        assert_eq!(store.participants().len(), 2);
        assert_eq!(store.current_role(), Role::Editor);
    }

    #[test]
    fn test_initial_users_without_local_entry_keeps_role() {
        let store = StateStore::new();
        apply(
            &store,
            &Event::InitialUsers(vec![Participant::new("bob", Role::Creator)]),
            Some("alice"),
        );
        assert_eq!(store.current_role(), Role::Viewer);
    }

    #[test]
    fn test_role_update_for_local_user() {
        let store = StateStore::new();
        apply(
            &store,
            &Event::InitialUsers(vec![Participant::new("alice", Role::Editor)]),
            Some("alice"),
        );
        assert_eq!(store.current_role(), Role::Editor);

        apply(
            &store,
            &Event::UserRoleUpdated { name: "alice".into(), role: Role::Viewer },
            Some("alice"),
        );

        assert_eq!(store.current_role(), Role::Viewer);
        assert_eq!(*store.participants(), vec![Participant::new("alice", Role::Viewer)]);
    }

    #[test]
    fn test_role_update_for_other_user() {
        let store = StateStore::new();
        apply(
            &store,
            &Event::InitialUsers(vec![
                Participant::new("alice", Role::Creator),
                Participant::new("bob", Role::Viewer),
            ]),
            Some("alice"),
        );

        apply(
            &store,
            &Event::UserRoleUpdated { name: "bob".into(), role: Role::Editor },
            Some("alice"),
        );

        assert_eq!(store.current_role(), Role::Creator);
        assert_eq!(store.participants()[1].role, Role::Editor);
    }

    #[test]
    fn test_role_changed_is_unconditional() {
        let store = StateStore::new();
        apply(&store, &Event::RoleChanged { role: Role::Editor }, None);
        assert_eq!(store.current_role(), Role::Editor);
    }

    #[test]
    fn test_join_and_leave() {
        let store = StateStore::new();
        apply(&store, &Event::UserJoined { name: "carol".into(), role: Role::Viewer }, None);
        apply(&store, &Event::UserJoined { name: "dave".into(), role: Role::Editor }, None);
        apply(&store, &Event::UserLeft { name: "carol".into() }, None);

        assert_eq!(*store.participants(), vec![Participant::new("dave", Role::Editor)]);

        // Unknown name is a no-op
        let before = store.participants();
        apply(&store, &Event::UserLeft { name: "nobody".into() }, None);
        assert!(std::sync::Arc::ptr_eq(&before, &store.participants()));
    }

    #[test]
    fn test_slide_added_initializes_element_list() {
        let store = store_with_slide("s1");

        assert_eq!(store.slides().len(), 1);
        assert_eq!(store.elements().get("s1"), Some(&Vec::new()));
    }

    #[test]
    fn test_element_add_then_remove() {
        let store = store_with_slide("s1");
        let element = text_at("e1", 0.0, 0.0);

        apply(
            &store,
            &Event::ElementAdded { slide_id: "s1".into(), element: element.clone() },
            None,
        );
        assert_eq!(store.elements_of("s1"), vec![element]);

        apply(
            &store,
            &Event::ElementRemoved { slide_id: "s1".into(), element_id: "e1".into() },
            None,
        );
        assert!(store.elements_of("s1").is_empty());
    }

    #[test]
    fn test_element_events_for_unknown_slide_are_ignored() {
        let store = StateStore::new();
        let before = store.elements();

        apply(&store, &Event::ElementAdded { slide_id: "nope".into(), element: image("i1") }, None);
        apply(&store, &Event::ElementUpdated { slide_id: "nope".into(), element: image("i1") }, None);
        apply(
            &store,
            &Event::ElementRemoved { slide_id: "nope".into(), element_id: "i1".into() },
            None,
        );

        assert!(std::sync::Arc::ptr_eq(&before, &store.elements()));
    }

    #[test]
    fn test_update_unknown_element_is_noop() {
        let store = store_with_slide("s1");
        apply(&store, &Event::ElementAdded { slide_id: "s1".into(), element: image("i1") }, None);

        apply(
            &store,
            &Event::ElementUpdated { slide_id: "s1".into(), element: text_at("missing", 1.0, 1.0) },
            None,
        );

        assert_eq!(store.elements_of("s1"), vec![image("i1")]);
    }

    #[test]
    fn test_element_updated_is_idempotent() {
        let store = store_with_slide("s1");
        apply(
            &store,
            &Event::ElementAdded { slide_id: "s1".into(), element: text_at("e1", 0.0, 0.0) },
            None,
        );

        let update = Event::ElementUpdated { slide_id: "s1".into(), element: text_at("e1", 3.0, 4.0) };
        apply(&store, &update, None);
        let once = store.elements_of("s1");
        apply(&store, &update, None);

        assert_eq!(store.elements_of("s1"), once);
        assert_eq!(once, vec![text_at("e1", 3.0, 4.0)]);
    }

    #[test]
    fn test_sequential_store_folds_match_pure_folds() {
        let events = vec![
            Event::ElementAdded { slide_id: "s1".into(), element: text_at("e1", 0.0, 0.0) },
            Event::ElementAdded { slide_id: "s1".into(), element: image("i1") },
            Event::ElementUpdated { slide_id: "s1".into(), element: text_at("e1", 9.0, 9.0) },
            Event::ElementRemoved { slide_id: "s1".into(), element_id: "i1".into() },
            Event::ElementAdded { slide_id: "s1".into(), element: image("i2") },
            Event::ElementRemoved { slide_id: "s1".into(), element_id: "absent".into() },
        ];

        let store = store_with_slide("s1");
        for event in &events {
            apply(&store, event, None);
        }

        let mut expected: ElementMap = ElementMap::new();
        expected.insert("s1".into(), Vec::new());
        for event in &events {
            if let Some(next) = fold_elements(&expected, event) {
                expected = next;
            }
        }

        assert_eq!(*store.elements(), expected);
        assert_eq!(
            store.elements_of("s1"),
            vec![text_at("e1", 9.0, 9.0), image("i2")]
        );
    }

    #[test]
    fn test_authoritative_event_overrides_optimistic_state() {
        let store = store_with_slide("s1");
        apply(
            &store,
            &Event::ElementAdded { slide_id: "s1".into(), element: text_at("e1", 0.0, 0.0) },
            None,
        );

        // Local optimistic move to (5, 5)
        store.update_elements(|m| {
            fold_elements(
                m,
                &Event::ElementUpdated { slide_id: "s1".into(), element: text_at("e1", 5.0, 5.0) },
            )
        });
        // Authoritative position arrives afterwards
        apply(
            &store,
            &Event::ElementUpdated { slide_id: "s1".into(), element: text_at("e1", 7.0, 7.0) },
            None,
        );

        assert_eq!(store.elements_of("s1")[0].position(), (7.0, 7.0));
    }
}
