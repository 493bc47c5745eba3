//! Messages passed between chat connections and the chat server.

use actix::prelude::*;
use serde::{Deserialize, Serialize};

/// Server -> connection frame, already serialized.
pub struct Reply(pub String);

impl Message for Reply {
    type Result = ();
}

/// New connection joining a room.
pub struct Connect {
    pub addr: Recipient<Reply>,
    pub room: u32,
}

impl Message for Connect {
    /// Returns connection ID
    type Result = usize;
}

pub struct Disconnect {
    pub id: usize,
}

impl Message for Disconnect {
    type Result = ();
}

/// Who a chat message is shown as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatAuthor {
    pub user_id: Option<i32>,
    pub full_name: String,
}

impl ChatAuthor {
    pub fn guest() -> Self {
        Self {
            user_id: None,
            full_name: "Guest".to_owned(),
        }
    }
}

/// Text a connection wants relayed to its room.
pub struct Post {
    pub id: usize,
    pub author: ChatAuthor,
    pub message: String,
}

impl Message for Post {
    type Result = ();
}

/// Number of live connections in the room.
pub struct GetConnectionCount;

impl Message for GetConnectionCount {
    type Result = usize;
}

/// Frame sent to every member of the room.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Broadcast {
    pub full_name: String,
    pub user_id: Option<i32>,
    /// Censored, escaped and linkified HTML.
    pub message: String,
}

/// Frames a client may send.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ClientCommand {
    Send { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"command":"send","message":"hi"}"#).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::Send {
                message: "hi".to_owned()
            }
        );
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<ClientCommand>(r#"{"command":"join","room":2}"#).is_err());
        assert!(serde_json::from_str::<ClientCommand>("not json").is_err());
    }

    #[test]
    fn test_guest_broadcast_shape() {
        let guest = ChatAuthor::guest();
        let frame = serde_json::to_value(Broadcast {
            full_name: guest.full_name,
            user_id: guest.user_id,
            message: "hello".to_owned(),
        })
        .unwrap();
        assert_eq!(
            frame,
            serde_json::json!({"full_name": "Guest", "user_id": null, "message": "hello"})
        );
    }
}
