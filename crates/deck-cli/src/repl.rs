//! Room REPL commands: parsing, role gating and help

use colored::*;
use deck_core::{AssignableRole, Role};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Slides,
    Users,
    Role,
    AddSlide,
    Text { slide: String, text: String },
    Image { slide: String, url: String },
    Move { slide: String, element: String, x: f64, y: f64 },
    Remove { slide: String, element: String },
    Grant { user: String, role: AssignableRole },
    Upload { slide: String, path: PathBuf },
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or_else(|| "empty command".to_string())?;
        let args: Vec<&str> = words.collect();

        let command = match name.to_lowercase().as_str() {
            "slides" | "ls" => ReplCommand::Slides,
            "users" | "who" => ReplCommand::Users,
            "role" => ReplCommand::Role,
            "add-slide" => ReplCommand::AddSlide,
            "text" => {
                if args.len() < 2 {
                    return Err("usage: text <slide> <text..>".into());
                }
                ReplCommand::Text {
                    slide: args[0].to_string(),
                    text: args[1..].join(" "),
                }
            }
            "image" => match args.as_slice() {
                [slide, url] => ReplCommand::Image {
                    slide: slide.to_string(),
                    url: url.to_string(),
                },
                _ => return Err("usage: image <slide> <url>".into()),
            },
            "move" => match args.as_slice() {
                [slide, element, x, y] => ReplCommand::Move {
                    slide: slide.to_string(),
                    element: element.to_string(),
                    x: parse_number(x)?,
                    y: parse_number(y)?,
                },
                _ => return Err("usage: move <slide> <element> <x> <y>".into()),
            },
            "rm" => match args.as_slice() {
                [slide, element] => ReplCommand::Remove {
                    slide: slide.to_string(),
                    element: element.to_string(),
                },
                _ => return Err("usage: rm <slide> <element>".into()),
            },
            "grant" => match args.as_slice() {
                [user, role] => ReplCommand::Grant {
                    user: user.to_string(),
                    role: role
                        .parse()
                        .map_err(|_| format!("role must be editor or viewer, got '{}'", role))?,
                },
                _ => return Err("usage: grant <user> <editor|viewer>".into()),
            },
            "upload" => match args.as_slice() {
                [slide, path] => ReplCommand::Upload {
                    slide: slide.to_string(),
                    path: PathBuf::from(path),
                },
                _ => return Err("usage: upload <slide> <path>".into()),
            },
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" => ReplCommand::Quit,
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };

        Ok(command)
    }

    /// Whether a participant with `role` may run this command
    pub fn permitted(&self, role: Role) -> Result<(), &'static str> {
        match self {
            ReplCommand::Grant { .. } if !role.can_manage_roles() => {
                Err("only the creator can change roles")
            }
            ReplCommand::AddSlide
            | ReplCommand::Text { .. }
            | ReplCommand::Image { .. }
            | ReplCommand::Move { .. }
            | ReplCommand::Remove { .. }
            | ReplCommand::Upload { .. }
                if !role.can_edit() =>
            {
                Err("viewers cannot edit this presentation")
            }
            _ => Ok(()),
        }
    }
}

fn parse_number(s: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("'{}' is not a number", s))
}

pub fn print_help() {
    println!(
        r#"
{}

{}
  slides                          List slides and their elements
  users                           List participants
  role                            Show your role

{}
  add-slide                       Append a slide
  text <slide> <text..>           Add a text block
  image <slide> <url>             Add an image by URL
  upload <slide> <path>           Upload an image file
  move <slide> <element> <x> <y>  Move an element
  rm <slide> <element>            Remove an element

{}
  grant <user> <editor|viewer>    Change a participant's role

{}
  help                            Show this help
  quit/exit                       Leave the room
"#,
        "Room Commands".cyan().bold(),
        "View".yellow().bold(),
        "Edit (editor, creator)".yellow().bold(),
        "Roles (creator)".yellow().bold(),
        "Local".yellow().bold(),
    );
}
