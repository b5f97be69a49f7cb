//! The line protocol spoken over the WebSocket.
//!
//! One text frame carries one command. Words are separated by single spaces;
//! the final argument of `login`, `register` and `post` runs to the end of
//! the frame.

use crate::kernel::SubscriptionChange;
use crate::state::{Message, MessageId};
use serde::Serialize;
use std::fmt;

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { username: String, password: String },
    Login { username: String, password: String },
    Logout,
    Post { text: String },
    Follow { username: String },
    Unfollow { username: String },
    Messages { username: String },
    Tagged { tag: String },
    Whois { username: String },
}

impl Command {
    /// Parse one frame. `None` means the frame is not a well-formed command.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (verb, rest) = match line.split_once(' ') {
            Some((verb, rest)) => (verb, Some(rest)),
            None => (line, None),
        };

        let cmd = match verb {
            "register" | "login" => {
                let (username, password) = rest?.split_once(' ')?;
                let (username, password) = (username.to_string(), password.to_string());
                if verb == "register" {
                    Self::Register { username, password }
                } else {
                    Self::Login { username, password }
                }
            }
            "logout" => Self::Logout,
            "post" => Self::Post {
                text: rest.unwrap_or_default().to_string(),
            },
            "follow" => Self::Follow {
                username: single(rest)?,
            },
            "unfollow" => Self::Unfollow {
                username: single(rest)?,
            },
            "messages" => Self::Messages {
                username: single(rest)?,
            },
            "tagged" => Self::Tagged { tag: single(rest)? },
            "whois" => Self::Whois {
                username: single(rest)?,
            },
            _ => return None,
        };
        Some(cmd)
    }

    /// Commands that need a logged-in connection.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::Post { .. } | Self::Follow { .. } | Self::Unfollow { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::Post { .. } => "post",
            Self::Follow { .. } => "follow",
            Self::Unfollow { .. } => "unfollow",
            Self::Messages { .. } => "messages",
            Self::Tagged { .. } => "tagged",
            Self::Whois { .. } => "whois",
        }
    }
}

fn single(rest: Option<&str>) -> Option<String> {
    match rest {
        Some(arg) if !arg.is_empty() && !arg.contains(' ') => Some(arg.to_string()),
        _ => None,
    }
}

/// A reply to exactly one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Posted(MessageId),
    Json(String),
    Error(String),
}

impl Reply {
    pub fn unauthorized() -> Self {
        Self::Error("Unauthorized".into())
    }

    pub fn bad_request() -> Self {
        Self::Error("Bad Request".into())
    }

    pub fn error(err: impl fmt::Display) -> Self {
        Self::Error(err.to_string())
    }

    /// Serialize `value` into an `OK <json>` reply.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => Self::Json(json),
            Err(e) => Self::error(e),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Posted(id) => write!(f, "OK {id}"),
            Self::Json(json) => write!(f, "OK {json}"),
            Self::Error(text) => write!(f, "error {text}"),
        }
    }
}

/// `message <json>` push frame.
pub fn message_push(message: &Message) -> serde_json::Result<String> {
    Ok(format!("message {}", serde_json::to_string(message)?))
}

/// `subscription <json>` push frame.
pub fn subscription_push(change: &SubscriptionChange) -> serde_json::Result<String> {
    Ok(format!("subscription {}", serde_json::to_string(change)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_credentials_with_spaces_in_password() {
        assert_eq!(
            Command::parse("register alice correct horse"),
            Some(Command::Register {
                username: "alice".into(),
                password: "correct horse".into(),
            })
        );
        assert_eq!(
            Command::parse("login bob pw\r\n"),
            Some(Command::Login {
                username: "bob".into(),
                password: "pw".into(),
            })
        );
        assert_eq!(Command::parse("login bob"), None);
        assert_eq!(Command::parse("register"), None);
    }

    #[test]
    fn post_keeps_the_rest_of_the_frame() {
        assert_eq!(
            Command::parse("post hello  @bob #Rust"),
            Some(Command::Post {
                text: "hello  @bob #Rust".into()
            })
        );
        assert_eq!(Command::parse("post"), Some(Command::Post { text: String::new() }));
    }

    #[test]
    fn single_argument_commands() {
        assert_eq!(
            Command::parse("follow bob"),
            Some(Command::Follow {
                username: "bob".into()
            })
        );
        assert_eq!(Command::parse("tagged go"), Some(Command::Tagged { tag: "go".into() }));
        assert_eq!(Command::parse("follow"), None);
        assert_eq!(Command::parse("whois a b"), None);
        assert_eq!(Command::parse("logout"), Some(Command::Logout));
    }

    #[test]
    fn unknown_verbs_are_rejected() {
        assert_eq!(Command::parse("PRIVMSG #chan :hi"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("Post hi"), None);
    }

    #[test]
    fn login_gate() {
        assert!(Command::parse("post x").unwrap().requires_login());
        assert!(Command::parse("unfollow x").unwrap().requires_login());
        assert!(!Command::parse("messages x").unwrap().requires_login());
        assert!(!Command::parse("logout").unwrap().requires_login());
    }

    #[test]
    fn reply_formatting() {
        assert_eq!(Reply::Ok.to_string(), "OK");
        assert_eq!(Reply::Posted(MessageId(7)).to_string(), "OK 7");
        assert_eq!(Reply::json(&[1, 2]).to_string(), "OK [1,2]");
        assert_eq!(Reply::unauthorized().to_string(), "error Unauthorized");
        assert_eq!(Reply::bad_request().to_string(), "error Bad Request");
    }

    #[test]
    fn subscription_push_format() {
        let change = SubscriptionChange {
            followee: "alice".into(),
            follower: "bob".into(),
            unfollow: false,
        };
        assert_eq!(
            subscription_push(&change).unwrap(),
            r#"subscription {"followee":"alice","follower":"bob","unfollow":false}"#
        );
    }
}
