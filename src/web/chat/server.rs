use super::message::{self, Broadcast, ChatAuthor};
use crate::app_config::ChatConfig;
use crate::{sanitize, word_filter};
use actix::prelude::*;
use std::collections::{HashMap, HashSet};

/// `ChatServer` relays messages between the connections of its room.
/// Nothing is stored; a message reaches whoever is connected at the time.
pub struct ChatServer {
    next_id: usize,
    /// The public room every connection joins
    room_id: u32,
    /// Hosts whose links are not marked external
    local_domains: Vec<String>,

    /// Connection Id -> Recipient Addr
    connections: HashMap<usize, Recipient<message::Reply>>,
    /// Room Id -> Conn Ids
    rooms: HashMap<u32, HashSet<usize>>,
}

impl ChatServer {
    pub fn new(config: &ChatConfig) -> Self {
        log::info!("Chat actor starting up.");

        Self {
            next_id: 1,
            room_id: config.room_id,
            local_domains: config.local_domains.clone(),
            connections: HashMap::new(),
            rooms: HashMap::from([(config.room_id, HashSet::new())]),
        }
    }

    pub fn room_id(&self) -> u32 {
        self.room_id
    }

    /// Turns raw client text into a broadcast frame, or None if there is
    /// nothing worth sending. Both the name and the message go out as HTML.
    pub fn prepare_broadcast(&self, author: ChatAuthor, raw: &str) -> Option<Broadcast> {
        if raw.trim_start().is_empty() {
            return None;
        }

        let censored = word_filter::censor(raw);
        Some(Broadcast {
            full_name: sanitize::escape_html(&author.full_name),
            user_id: author.user_id,
            message: sanitize::linkify_text(&censored, &self.local_domains),
        })
    }

    /// Send message to all connections in a room
    fn send_message_to_room(&self, room: u32, message: String) {
        if let Some(connections) = self.rooms.get(&room) {
            for id in connections {
                if let Some(recipient) = self.connections.get(id) {
                    recipient.do_send(message::Reply(message.to_owned()));
                }
            }
        }
    }

    fn room_of(&self, id: usize) -> Option<u32> {
        self.rooms
            .iter()
            .find(|(_, conns)| conns.contains(&id))
            .map(|(room, _)| *room)
    }
}

impl Actor for ChatServer {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.set_mailbox_capacity(64);
    }
}

impl Handler<message::Connect> for ChatServer {
    type Result = usize;

    fn handle(&mut self, msg: message::Connect, _: &mut Context<Self>) -> Self::Result {
        let id = self.next_id;
        self.next_id += 1;

        self.connections.insert(id, msg.addr);
        self.rooms.entry(msg.room).or_default().insert(id);

        log::info!("Chat connection {} joined room {}", id, msg.room);
        id
    }
}

impl Handler<message::Disconnect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: message::Disconnect, _: &mut Context<Self>) {
        for conns in self.rooms.values_mut() {
            conns.remove(&msg.id);
        }
        if self.connections.remove(&msg.id).is_some() {
            log::info!("Chat connection {} left", msg.id);
        }
    }
}

impl Handler<message::Post> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: message::Post, _: &mut Context<Self>) {
        let room = self.room_of(msg.id).unwrap_or(self.room_id);

        let frame = match self.prepare_broadcast(msg.author, &msg.message) {
            Some(frame) => frame,
            None => {
                log::debug!("Dropping blank chat message from connection {}", msg.id);
                return;
            }
        };

        match serde_json::to_string(&frame) {
            Ok(json) => self.send_message_to_room(room, json),
            Err(e) => log::error!("Failed to serialize chat frame: {}", e),
        }
    }
}

impl Handler<message::GetConnectionCount> for ChatServer {
    type Result = usize;

    fn handle(&mut self, _: message::GetConnectionCount, _: &mut Context<Self>) -> Self::Result {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ChatServer {
        ChatServer::new(&ChatConfig {
            room_id: 1,
            local_domains: vec!["localhost".to_owned()],
            censor_words: Vec::new(),
        })
    }

    fn jane() -> ChatAuthor {
        ChatAuthor {
            user_id: Some(7),
            full_name: "Jane Smith".to_owned(),
        }
    }

    #[test]
    fn test_blank_messages_dropped() {
        let server = server();
        assert!(server.prepare_broadcast(jane(), "").is_none());
        assert!(server.prepare_broadcast(jane(), "   \n\t").is_none());
        assert!(server.prepare_broadcast(jane(), "  hi").is_some());
    }

    #[test]
    fn test_markup_is_escaped() {
        let frame = server()
            .prepare_broadcast(jane(), "<img src=x onerror=alert(1)>")
            .unwrap();
        assert_eq!(frame.message, "&lt;img src=x onerror=alert(1)&gt;");
        assert_eq!(frame.user_id, Some(7));
        assert_eq!(frame.full_name, "Jane Smith");
    }

    #[test]
    fn test_links_are_marked() {
        let frame = server()
            .prepare_broadcast(ChatAuthor::guest(), "https://example.com")
            .unwrap();
        assert!(frame.message.contains("class=\"external\""));
        assert_eq!(frame.user_id, None);
    }

    #[test]
    fn test_author_name_is_escaped() {
        let author = ChatAuthor {
            user_id: Some(9),
            full_name: "<b>Bobby</b> O'Hara".to_owned(),
        };
        let frame = server().prepare_broadcast(author, "hello").unwrap();
        assert_eq!(frame.full_name, "&lt;b&gt;Bobby&lt;/b&gt; O&#x27;Hara");
    }
}
