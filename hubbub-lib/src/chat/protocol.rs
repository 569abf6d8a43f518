//! Wire messages for the chat protocol.
//!
//! Text frames are JSON objects tagged by a `"type"` field; binary frames
//! are WAV clips for the mixer, attributed to the userid of the most
//! recent chat message. Servers add fields freely, so parsing tolerates
//! extras and unknown message types are skipped, not errors.

use log::debug;
use serde::{Deserialize, Serialize};

/// Profile fields the server attaches to a user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserParams {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
}

/// One roster row of a `userlist` message.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub userid: String,
    pub params: UserParams,
}

/// A message from the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Userlist { users: Vec<UserEntry> },
    Connect { userid: String, params: UserParams },
    Disconnect { userid: String },
    #[serde(rename = "msg")]
    Chat { userid: String, msg: String },
}

impl ServerMessage {
    /// Parse a text frame. Unknown types and malformed frames come back as
    /// `None`; the transport moves on.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(message) => Some(message),
            Err(err) => {
                debug!("skipping unhandled frame: {}", err);
                None
            }
        }
    }
}

/// A message to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Msg { msg: String, lang: String },
    Attack { target: String, order: u32 },
}

/// Undo the HTML escaping the server applies to chat text.
pub fn unescape_text(text: &str) -> String {
    // `&amp;` goes last so escaped entities stay escaped once.
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_userlist() {
        let text = r##"{"type":"userlist","users":[
            {"userid":"aaa","params":{"name":"Sandgrouse","color":"#a6e6b4"}},
            {"userid":"bbb","params":{"name":"Loach"}}
        ]}"##;
        let Some(ServerMessage::Userlist { users }) = ServerMessage::parse(text) else {
            panic!("expected a userlist");
        };
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].userid, "aaa");
        assert_eq!(users[0].params.name, "Sandgrouse");
        assert_eq!(users[0].params.color.as_deref(), Some("#a6e6b4"));
        assert_eq!(users[1].params.color, None);
    }

    #[test]
    fn parses_connect_and_disconnect() {
        let joined = r#"{"type":"connect","userid":"ccc","params":{"name":"Tern"}}"#;
        assert!(matches!(
            ServerMessage::parse(joined),
            Some(ServerMessage::Connect { userid, .. }) if userid == "ccc"
        ));

        let left = r#"{"type":"disconnect","userid":"ccc"}"#;
        assert!(matches!(
            ServerMessage::parse(left),
            Some(ServerMessage::Disconnect { userid }) if userid == "ccc"
        ));
    }

    #[test]
    fn parses_chat_lines_with_extra_fields() {
        let text = r#"{"type":"msg","userid":"aaa","msg":"bonjour","date":1700000000}"#;
        let Some(ServerMessage::Chat { userid, msg }) = ServerMessage::parse(text) else {
            panic!("expected a chat line");
        };
        assert_eq!(userid, "aaa");
        assert_eq!(msg, "bonjour");
    }

    #[test]
    fn unknown_types_and_junk_are_skipped() {
        assert!(ServerMessage::parse(r#"{"type":"antiflood","msg":"calm down"}"#).is_none());
        assert!(ServerMessage::parse("not json at all").is_none());
        assert!(ServerMessage::parse(r#"{"no":"type"}"#).is_none());
    }

    #[test]
    fn unescapes_server_side_html_encoding() {
        assert_eq!(unescape_text("&lt;3 &amp; l&#39;eau"), "<3 & l'eau");
        assert_eq!(unescape_text("&amp;lt;"), "&lt;");
        assert_eq!(unescape_text("plain text"), "plain text");
    }

    #[test]
    fn outgoing_messages_carry_the_type_tag() {
        let msg = ClientMessage::Msg {
            msg: "salut".to_string(),
            lang: "fr".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"msg","msg":"salut","lang":"fr"}"#
        );

        let attack = ClientMessage::Attack {
            target: "Loach".to_string(),
            order: 0,
        };
        assert_eq!(
            serde_json::to_string(&attack).unwrap(),
            r#"{"type":"attack","target":"Loach","order":0}"#
        );
    }
}
