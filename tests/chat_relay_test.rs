//! The chat server relays censored, escaped and linkified text to every
//! connection in the room

use actix::prelude::*;
use lounge::app_config::ChatConfig;
use lounge::web::chat::message::{
    Broadcast, ChatAuthor, Connect, Disconnect, GetConnectionCount, Post, Reply,
};
use lounge::web::chat::server::ChatServer;

/// Stands in for a websocket connection and records what it receives.
#[derive(Default)]
struct Collector {
    frames: Vec<String>,
}

impl Actor for Collector {
    type Context = Context<Self>;
}

impl Handler<Reply> for Collector {
    type Result = ();

    fn handle(&mut self, msg: Reply, _: &mut Context<Self>) {
        self.frames.push(msg.0);
    }
}

struct Drain;

impl Message for Drain {
    type Result = Vec<String>;
}

impl Handler<Drain> for Collector {
    type Result = MessageResult<Drain>;

    fn handle(&mut self, _: Drain, _: &mut Context<Self>) -> Self::Result {
        MessageResult(std::mem::take(&mut self.frames))
    }
}

fn config() -> ChatConfig {
    ChatConfig {
        room_id: 1,
        local_domains: vec!["localhost".to_string()],
        censor_words: vec!["heck".to_string()],
    }
}

async fn drain(collector: &Addr<Collector>) -> Vec<Broadcast> {
    collector
        .send(Drain)
        .await
        .unwrap()
        .iter()
        .map(|frame| serde_json::from_str(frame).unwrap())
        .collect()
}

#[actix_rt::test]
async fn test_message_reaches_everyone_in_room() {
    lounge::word_filter::init_filters(&config().censor_words);
    let server = ChatServer::new(&config()).start();
    let alice = Collector::default().start();
    let bob = Collector::default().start();

    let alice_id = server
        .send(Connect {
            addr: alice.clone().recipient(),
            room: 1,
        })
        .await
        .unwrap();
    server
        .send(Connect {
            addr: bob.clone().recipient(),
            room: 1,
        })
        .await
        .unwrap();

    server.do_send(Post {
        id: alice_id,
        author: ChatAuthor {
            user_id: Some(7),
            full_name: "Alice Smith".to_string(),
        },
        message: "what the heck <b>is</b> https://rust-lang.org".to_string(),
    });
    // Mailboxes are FIFO, so the post has been relayed once this returns.
    assert_eq!(server.send(GetConnectionCount).await.unwrap(), 2);

    let expected = Broadcast {
        full_name: "Alice Smith".to_string(),
        user_id: Some(7),
        message: "what the **** &lt;b&gt;is&lt;/b&gt; <a href=\"https://rust-lang.org\" target=\"_blank\" class=\"external\">https://rust-lang.org</a>".to_string(),
    };
    assert_eq!(drain(&alice).await, vec![expected.clone()]);
    assert_eq!(drain(&bob).await, vec![expected]);
}

#[actix_rt::test]
async fn test_blank_messages_and_departed_connections() {
    let server = ChatServer::new(&config()).start();
    let alice = Collector::default().start();
    let bob = Collector::default().start();

    let alice_id = server
        .send(Connect {
            addr: alice.clone().recipient(),
            room: 1,
        })
        .await
        .unwrap();
    let bob_id = server
        .send(Connect {
            addr: bob.clone().recipient(),
            room: 1,
        })
        .await
        .unwrap();

    server.do_send(Post {
        id: alice_id,
        author: ChatAuthor::guest(),
        message: "   ".to_string(),
    });
    server.do_send(Disconnect { id: bob_id });
    server.do_send(Post {
        id: alice_id,
        author: ChatAuthor::guest(),
        message: "  hello".to_string(),
    });
    assert_eq!(server.send(GetConnectionCount).await.unwrap(), 1);

    let frames = drain(&alice).await;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].full_name, "Guest");
    assert_eq!(frames[0].user_id, None);
    assert_eq!(frames[0].message, "  hello");
    assert!(drain(&bob).await.is_empty());
}
