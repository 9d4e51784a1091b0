//! Inbound event decoding

use crate::args::{to_value, Arguments};
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::HubMessage;
use deck_core::{Event, Participant, Role};
use serde_json::Value;

/// Decode an event from a non-blocking invocation's target and arguments
pub fn decode_event(target: &str, arguments: Vec<Value>) -> ProtocolResult<Event> {
    let event = match target {
        "InitialUsers" => {
            let mut args = Arguments::expect(target, arguments, 1)?;
            Event::InitialUsers(args.next::<Vec<Participant>>()?)
        }
        "UserJoined" => {
            let mut args = Arguments::expect(target, arguments, 2)?;
            Event::UserJoined {
                name: args.next()?,
                role: args.next()?,
            }
        }
        "UserLeft" => {
            let mut args = Arguments::expect(target, arguments, 1)?;
            Event::UserLeft { name: args.next()? }
        }
        "UserRoleUpdated" => {
            let mut args = Arguments::expect(target, arguments, 2)?;
            Event::UserRoleUpdated {
                name: args.next()?,
                role: args.next()?,
            }
        }
        "RoleChanged" => {
            let mut args = Arguments::expect(target, arguments, 1)?;
            Event::RoleChanged {
                role: args.next::<Role>()?,
            }
        }
        "SlideAdded" => {
            let mut args = Arguments::expect(target, arguments, 1)?;
            Event::SlideAdded(args.next()?)
        }
        "ElementAdded" => {
            let mut args = Arguments::expect(target, arguments, 2)?;
            Event::ElementAdded {
                slide_id: args.next()?,
                element: args.next()?,
            }
        }
        "ElementUpdated" => {
            let mut args = Arguments::expect(target, arguments, 2)?;
            Event::ElementUpdated {
                slide_id: args.next()?,
                element: args.next()?,
            }
        }
        "ElementRemoved" => {
            let mut args = Arguments::expect(target, arguments, 2)?;
            Event::ElementRemoved {
                slide_id: args.next()?,
                element_id: args.next()?,
            }
        }
        _ => return Err(ProtocolError::UnknownEvent(target.to_string())),
    };

    Ok(event)
}

/// Positional arguments of an event, as the server sends them
pub fn event_arguments(event: &Event) -> ProtocolResult<Vec<Value>> {
    let args = match event {
        Event::InitialUsers(list) => vec![to_value(list)?],
        Event::UserJoined { name, role } | Event::UserRoleUpdated { name, role } => {
            vec![Value::String(name.clone()), to_value(role)?]
        }
        Event::UserLeft { name } => vec![Value::String(name.clone())],
        Event::RoleChanged { role } => vec![to_value(role)?],
        Event::SlideAdded(slide) => vec![to_value(slide)?],
        Event::ElementAdded { slide_id, element } | Event::ElementUpdated { slide_id, element } => {
            vec![Value::String(slide_id.clone()), to_value(element)?]
        }
        Event::ElementRemoved { slide_id, element_id } => {
            vec![Value::String(slide_id.clone()), Value::String(element_id.clone())]
        }
    };

    Ok(args)
}

/// Build the non-blocking invocation a hub sends for `event`
pub fn event_message(event: &Event) -> ProtocolResult<HubMessage> {
    Ok(HubMessage::invocation(None, event.name(), event_arguments(event)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::{Slide, SlideElement};
    use serde_json::json;

    #[test]
    fn test_decode_initial_users() {
        let event = decode_event(
            "InitialUsers",
            vec![json!([{"name": "alice", "role": "editor"}, {"name": "bob", "role": "creator"}])],
        )
        .unwrap();

        assert_eq!(
            event,
            Event::InitialUsers(vec![
                Participant::new("alice", Role::Editor),
                Participant::new("bob", Role::Creator),
            ])
        );
    }

    #[test]
    fn test_decode_element_added() {
        let event = decode_event(
            "ElementAdded",
            vec![
                json!("s1"),
                json!({"$type": "text", "id": "e1", "x": 0, "y": 0, "width": 10, "height": 10,
                       "text": "hi", "fontSize": 18, "fontFamily": "Arial", "color": "#000"}),
            ],
        )
        .unwrap();

        match event {
            Event::ElementAdded { slide_id, element: SlideElement::Text(text) } => {
                assert_eq!(slide_id, "s1");
                assert_eq!(text.text, "hi");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_slide_added_without_elements() {
        let event = decode_event("SlideAdded", vec![json!({"id": "s2", "order": 1})]).unwrap();
        assert_eq!(event, Event::SlideAdded(Slide::new("s2", 1)));
    }

    #[test]
    fn test_decode_slide_added_with_null_elements() {
        let event = decode_event(
            "SlideAdded",
            vec![json!({"id": "s3", "order": 2, "elements": null})],
        )
        .unwrap();
        assert_eq!(event, Event::SlideAdded(Slide::new("s3", 2)));
    }

    #[test]
    fn test_unknown_event() {
        assert!(matches!(
            decode_event("CursorMoved", vec![]),
            Err(ProtocolError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_bad_payload() {
        assert!(matches!(
            decode_event("RoleChanged", vec![json!("owner")]),
            Err(ProtocolError::InvalidArgument { .. })
        ));
        assert!(matches!(
            decode_event("UserLeft", vec![json!("a"), json!("b")]),
            Err(ProtocolError::Arity { .. })
        ));
    }

    #[test]
    fn test_event_message_decodes_back() {
        let event = Event::ElementRemoved {
            slide_id: "s1".into(),
            element_id: "e1".into(),
        };

        match event_message(&event).unwrap() {
            HubMessage::Invocation { invocation_id: None, target, arguments } => {
                assert_eq!(decode_event(&target, arguments).unwrap(), event);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
