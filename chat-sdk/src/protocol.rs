//! Command parsing and serialization for the chat wire protocol.
//!
//! A command line has the shape `TAG[:FIELD1[:FIELD2 ...]]`. Fields are
//! split on `:` left to right, except the last structural field for a given
//! tag, which swallows the remainder of the line verbatim (further `:`
//! included). Arity is fixed per tag and per direction (to-server vs.
//! to-client); a line that doesn't fit its tag's arity is dropped silently.
//!
//! For a zero-field tag, `TAG` and `TAG:` are both valid (the trailing
//! colon carries no information when there is no field position for it to
//! mark); `TAG:x` is not, since that `x` is an unexpected field. For a tag
//! whose arity is fixed at exactly one field, the field is always present
//! and swallows everything after the first `:`, colons included.

/// A command sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    Auth(String),
    Name(String),
    Say(Option<String>),
    Kick(String),
    List,
    Leave,
}

/// A command sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Who,
    NameTaken,
    Auth,
    Ok,
    Kick,
    List(String),
    Msg(String, Option<String>),
    Enter(String),
    Leave(String),
}

/// Split `line` into `TAG` and the raw, unsplit remainder after the first
/// `:` (or `None` if there is no `:` at all).
fn split_tag(line: &str) -> (&str, Option<&str>) {
    match line.split_once(':') {
        Some((tag, rest)) => (tag, Some(rest)),
        None => (line, None),
    }
}

/// A zero-field tag is valid with no colon at all, or with a colon
/// followed by nothing; anything else after the colon is an unexpected
/// field.
fn zero_fields(rest: Option<&str>) -> bool {
    matches!(rest, None) || matches!(rest, Some(s) if s.is_empty())
}

/// A fixed one-field tag requires the field to be present; it swallows the
/// rest of the line verbatim, further colons included.
fn one_field(rest: Option<&str>) -> Option<String> {
    rest.map(str::to_string)
}

impl ServerCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let (tag, rest) = split_tag(line);
        match tag {
            "AUTH" => one_field(rest).map(ServerCommand::Auth),
            "NAME" => one_field(rest).map(ServerCommand::Name),
            "SAY" => match rest {
                None => None,
                Some(s) if s.is_empty() => Some(ServerCommand::Say(None)),
                Some(s) => Some(ServerCommand::Say(Some(s.to_string()))),
            },
            "KICK" => one_field(rest).map(ServerCommand::Kick),
            "LIST" => zero_fields(rest).then_some(ServerCommand::List),
            "LEAVE" => zero_fields(rest).then_some(ServerCommand::Leave),
            _ => None,
        }
    }

    pub fn serialize(&self) -> String {
        match self {
            ServerCommand::Auth(p) => format!("AUTH:{p}"),
            ServerCommand::Name(n) => format!("NAME:{n}"),
            ServerCommand::Say(Some(m)) => format!("SAY:{m}"),
            ServerCommand::Say(None) => "SAY:".to_string(),
            ServerCommand::Kick(n) => format!("KICK:{n}"),
            ServerCommand::List => "LIST:".to_string(),
            ServerCommand::Leave => "LEAVE:".to_string(),
        }
    }
}

impl ClientCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let (tag, rest) = split_tag(line);
        match tag {
            "WHO" => zero_fields(rest).then_some(ClientCommand::Who),
            "NAME_TAKEN" => zero_fields(rest).then_some(ClientCommand::NameTaken),
            "AUTH" => zero_fields(rest).then_some(ClientCommand::Auth),
            "OK" => zero_fields(rest).then_some(ClientCommand::Ok),
            "KICK" => zero_fields(rest).then_some(ClientCommand::Kick),
            "LIST" => one_field(rest).map(ClientCommand::List),
            "MSG" => one_field(rest).and_then(|s| parse_msg_payload(&s)),
            "ENTER" => one_field(rest).map(ClientCommand::Enter),
            "LEAVE" => one_field(rest).map(ClientCommand::Leave),
            _ => None,
        }
    }

    pub fn serialize(&self) -> String {
        match self {
            ClientCommand::Who => "WHO:".to_string(),
            ClientCommand::NameTaken => "NAME_TAKEN:".to_string(),
            ClientCommand::Auth => "AUTH:".to_string(),
            ClientCommand::Ok => "OK:".to_string(),
            ClientCommand::Kick => "KICK:".to_string(),
            ClientCommand::List(names) => format!("LIST:{names}"),
            ClientCommand::Msg(name, Some(m)) => format!("MSG:{name}:{m}"),
            ClientCommand::Msg(name, None) => format!("MSG:{name}"),
            ClientCommand::Enter(name) => format!("ENTER:{name}"),
            ClientCommand::Leave(name) => format!("LEAVE:{name}"),
        }
    }
}

/// `MSG` is 1..2 fields: a mandatory name, then an optional payload that
/// swallows the remainder. `name` with no further `:` means "no payload";
/// a `:` with an empty tail means an empty-but-present payload, which is
/// wire-equivalent to no payload at all (§4.C).
fn parse_msg_payload(field: &str) -> Option<ClientCommand> {
    match field.split_once(':') {
        None => Some(ClientCommand::Msg(field.to_string(), None)),
        Some((name, payload)) if payload.is_empty() => {
            Some(ClientCommand::Msg(name.to_string(), None))
        }
        Some((name, payload)) => Some(ClientCommand::Msg(name.to_string(), Some(payload.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_requires_field_but_allows_empty() {
        assert_eq!(
            ServerCommand::parse("AUTH:hunter2"),
            Some(ServerCommand::Auth("hunter2".into()))
        );
        assert_eq!(ServerCommand::parse("AUTH"), None);
        assert_eq!(ServerCommand::parse("AUTH:"), Some(ServerCommand::Auth("".into())));
    }

    #[test]
    fn auth_field_swallows_embedded_colons() {
        assert_eq!(
            ServerCommand::parse("AUTH:pass:word"),
            Some(ServerCommand::Auth("pass:word".into()))
        );
    }

    #[test]
    fn say_absent_and_empty_payload_both_parse_as_none() {
        assert_eq!(ServerCommand::parse("SAY"), None);
        assert_eq!(ServerCommand::parse("SAY:"), Some(ServerCommand::Say(None)));
        assert_eq!(
            ServerCommand::parse("SAY:hi: there"),
            Some(ServerCommand::Say(Some("hi: there".into())))
        );
    }

    #[test]
    fn list_and_leave_to_server_accept_bare_or_trailing_colon() {
        assert_eq!(ServerCommand::parse("LIST"), Some(ServerCommand::List));
        assert_eq!(ServerCommand::parse("LIST:"), Some(ServerCommand::List));
        assert_eq!(ServerCommand::parse("LIST:x"), None);
        assert_eq!(ServerCommand::parse("LEAVE"), Some(ServerCommand::Leave));
        assert_eq!(ServerCommand::parse("LEAVE:"), Some(ServerCommand::Leave));
    }

    #[test]
    fn kick_requires_a_name() {
        assert_eq!(
            ServerCommand::parse("KICK:bob"),
            Some(ServerCommand::Kick("bob".into()))
        );
        assert_eq!(ServerCommand::parse("KICK"), None);
    }

    #[test]
    fn unknown_tag_is_dropped() {
        assert_eq!(ServerCommand::parse("FROBNICATE:x"), None);
    }

    #[test]
    fn client_msg_with_and_without_payload() {
        assert_eq!(
            ClientCommand::parse("MSG:alice:hi: there"),
            Some(ClientCommand::Msg("alice".into(), Some("hi: there".into())))
        );
        assert_eq!(
            ClientCommand::parse("MSG:alice"),
            Some(ClientCommand::Msg("alice".into(), None))
        );
        assert_eq!(
            ClientCommand::parse("MSG:alice:"),
            Some(ClientCommand::Msg("alice".into(), None))
        );
    }

    #[test]
    fn client_simple_tags_accept_bare_or_trailing_colon_only() {
        assert_eq!(ClientCommand::parse("WHO"), Some(ClientCommand::Who));
        assert_eq!(ClientCommand::parse("WHO:"), Some(ClientCommand::Who));
        assert_eq!(ClientCommand::parse("WHO:x"), None);
        assert_eq!(ClientCommand::parse("OK:"), Some(ClientCommand::Ok));
    }

    #[test]
    fn client_enter_leave_require_name_field() {
        assert_eq!(
            ClientCommand::parse("ENTER:alice"),
            Some(ClientCommand::Enter("alice".into()))
        );
        assert_eq!(ClientCommand::parse("ENTER"), None);
    }

    #[test]
    fn list_to_client_requires_field() {
        assert_eq!(
            ClientCommand::parse("LIST:alice,bob"),
            Some(ClientCommand::List("alice,bob".into()))
        );
        assert_eq!(ClientCommand::parse("LIST"), None);
        assert_eq!(ClientCommand::parse("LIST:"), Some(ClientCommand::List("".into())));
    }

    #[test]
    fn roundtrip_preserves_meaning() {
        for line in ["SAY:hi: there", "KICK:bob", "LIST", "LEAVE", "NAME:alice"] {
            let parsed = ServerCommand::parse(line).unwrap();
            let reparsed = ServerCommand::parse(&parsed.serialize()).unwrap();
            assert_eq!(parsed, reparsed);
        }
    }
}
