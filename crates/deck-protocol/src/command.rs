//! Outbound hub commands

use crate::args::{to_value, Arguments};
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::HubMessage;
use deck_core::{AssignableRole, ElementId, PresentationId, SlideElement, SlideId};
use serde_json::Value;

/// All supported commands, with positional arguments in wire order
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// JoinPresentation(presentationId, userName)
    JoinPresentation {
        presentation_id: PresentationId,
        user_name: String,
    },

    /// AddSlide(presentationId)
    AddSlide { presentation_id: PresentationId },

    /// AddTextBlock(presentationId, slideId, text)
    AddTextBlock {
        presentation_id: PresentationId,
        slide_id: SlideId,
        text: String,
    },

    /// AddImageBlock(presentationId, slideId, url)
    AddImageBlock {
        presentation_id: PresentationId,
        slide_id: SlideId,
        url: String,
    },

    /// UpdateElement(presentationId, slideId, element)
    UpdateElement {
        presentation_id: PresentationId,
        slide_id: SlideId,
        element: SlideElement,
    },

    /// RemoveElement(presentationId, slideId, elementId)
    RemoveElement {
        presentation_id: PresentationId,
        slide_id: SlideId,
        element_id: ElementId,
    },

    /// ChangeRole(presentationId, targetUserName, newRole)
    ChangeRole {
        presentation_id: PresentationId,
        target_user_name: String,
        new_role: AssignableRole,
    },
}

impl Command {
    pub fn join(presentation_id: PresentationId, user_name: impl Into<String>) -> Self {
        Command::JoinPresentation {
            presentation_id,
            user_name: user_name.into(),
        }
    }

    pub fn add_slide(presentation_id: PresentationId) -> Self {
        Command::AddSlide { presentation_id }
    }

    pub fn add_text_block(presentation_id: PresentationId, slide_id: SlideId, text: String) -> Self {
        Command::AddTextBlock {
            presentation_id,
            slide_id,
            text,
        }
    }

    pub fn add_image_block(presentation_id: PresentationId, slide_id: SlideId, url: String) -> Self {
        Command::AddImageBlock {
            presentation_id,
            slide_id,
            url,
        }
    }

    pub fn update_element(presentation_id: PresentationId, slide_id: SlideId, element: SlideElement) -> Self {
        Command::UpdateElement {
            presentation_id,
            slide_id,
            element,
        }
    }

    pub fn remove_element(presentation_id: PresentationId, slide_id: SlideId, element_id: ElementId) -> Self {
        Command::RemoveElement {
            presentation_id,
            slide_id,
            element_id,
        }
    }

    pub fn change_role(
        presentation_id: PresentationId,
        target_user_name: String,
        new_role: AssignableRole,
    ) -> Self {
        Command::ChangeRole {
            presentation_id,
            target_user_name,
            new_role,
        }
    }

    /// Hub method name
    pub fn target(&self) -> &'static str {
        match self {
            Command::JoinPresentation { .. } => "JoinPresentation",
            Command::AddSlide { .. } => "AddSlide",
            Command::AddTextBlock { .. } => "AddTextBlock",
            Command::AddImageBlock { .. } => "AddImageBlock",
            Command::UpdateElement { .. } => "UpdateElement",
            Command::RemoveElement { .. } => "RemoveElement",
            Command::ChangeRole { .. } => "ChangeRole",
        }
    }

    pub fn presentation_id(&self) -> &PresentationId {
        match self {
            Command::JoinPresentation { presentation_id, .. }
            | Command::AddSlide { presentation_id }
            | Command::AddTextBlock { presentation_id, .. }
            | Command::AddImageBlock { presentation_id, .. }
            | Command::UpdateElement { presentation_id, .. }
            | Command::RemoveElement { presentation_id, .. }
            | Command::ChangeRole { presentation_id, .. } => presentation_id,
        }
    }

    /// Positional arguments in wire order
    pub fn arguments(&self) -> ProtocolResult<Vec<Value>> {
        let id = Value::String(self.presentation_id().to_string());

        let args = match self {
            Command::JoinPresentation { user_name, .. } => vec![id, Value::String(user_name.clone())],
            Command::AddSlide { .. } => vec![id],
            Command::AddTextBlock { slide_id, text, .. } => {
                vec![id, Value::String(slide_id.clone()), Value::String(text.clone())]
            }
            Command::AddImageBlock { slide_id, url, .. } => {
                vec![id, Value::String(slide_id.clone()), Value::String(url.clone())]
            }
            Command::UpdateElement { slide_id, element, .. } => {
                vec![id, Value::String(slide_id.clone()), to_value(element)?]
            }
            Command::RemoveElement { slide_id, element_id, .. } => {
                vec![id, Value::String(slide_id.clone()), Value::String(element_id.clone())]
            }
            Command::ChangeRole { target_user_name, new_role, .. } => {
                vec![id, Value::String(target_user_name.clone()), to_value(new_role)?]
            }
        };

        Ok(args)
    }

    /// Build the blocking invocation message for this command
    pub fn to_message(&self, invocation_id: impl Into<String>) -> ProtocolResult<HubMessage> {
        Ok(HubMessage::invocation(
            Some(invocation_id.into()),
            self.target(),
            self.arguments()?,
        ))
    }

    /// Decode a command from an invocation, as a hub would
    pub fn decode(target: &str, arguments: Vec<Value>) -> ProtocolResult<Self> {
        match target {
            "JoinPresentation" => {
                let mut args = Arguments::expect(target, arguments, 2)?;
                Ok(Command::join(args.next()?, args.next::<String>()?))
            }
            "AddSlide" => {
                let mut args = Arguments::expect(target, arguments, 1)?;
                Ok(Command::add_slide(args.next()?))
            }
            "AddTextBlock" => {
                let mut args = Arguments::expect(target, arguments, 3)?;
                Ok(Command::add_text_block(args.next()?, args.next()?, args.next()?))
            }
            "AddImageBlock" => {
                let mut args = Arguments::expect(target, arguments, 3)?;
                Ok(Command::add_image_block(args.next()?, args.next()?, args.next()?))
            }
            "UpdateElement" => {
                let mut args = Arguments::expect(target, arguments, 3)?;
                Ok(Command::update_element(args.next()?, args.next()?, args.next()?))
            }
            "RemoveElement" => {
                let mut args = Arguments::expect(target, arguments, 3)?;
                Ok(Command::remove_element(args.next()?, args.next()?, args.next()?))
            }
            "ChangeRole" => {
                let mut args = Arguments::expect(target, arguments, 3)?;
                Ok(Command::change_role(args.next()?, args.next()?, args.next()?))
            }
            _ => Err(ProtocolError::InvalidArgument {
                target: target.to_string(),
                message: "unknown hub method".into(),
            }),
        }
    }
}
