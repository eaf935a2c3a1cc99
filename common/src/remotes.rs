//! Remote hosts registry
//!
//! Remotes are declared under the top-level `remotes` key:
//!
//! ```yaml
//! remotes:
//!   - name: web-1
//!     user: deploy
//!     pass: secret
//!     ip: 10.0.0.1
//!     port: 22
//! ```
//!
//! Fields accumulate into a pending candidate; every `name` field starts a new candidate and
//! commits the previous one. Names and `ip:port` pairs must be unique.

use std::net::{Ipv4Addr, SocketAddrV4};

use serde::Serialize;

use crate::document::Node;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteDescriptor {
    pub name: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub pass: String,
    pub address: Ipv4Addr,
    pub port: u16,
}

impl RemoteDescriptor {
    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.address, self.port)
    }
}

impl std::fmt::Display for RemoteDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "name=`{}` ip=`{}` port=`{}`",
            self.name, self.address, self.port
        )
    }
}

/// Validated remotes in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RemoteSet {
    remotes: Vec<RemoteDescriptor>,
}

impl RemoteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `candidate` against the set and append it.
    pub fn add(&mut self, candidate: RemoteDescriptor) -> Result<(), ConfigError> {
        if candidate.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if candidate.user.is_empty() {
            return Err(ConfigError::EmptyUser {
                name: candidate.name,
            });
        }
        if candidate.address.is_unspecified() || candidate.port == 0 {
            return Err(ConfigError::InvalidAddress {
                name: candidate.name,
                ip: candidate.address,
                port: candidate.port,
            });
        }
        for remote in &self.remotes {
            if remote.name == candidate.name {
                return Err(ConfigError::DuplicateName {
                    name: candidate.name,
                });
            }
            if remote.address == candidate.address && remote.port == candidate.port {
                return Err(ConfigError::DuplicateAddress {
                    name: candidate.name,
                    ip: candidate.address,
                    port: candidate.port,
                });
            }
        }
        tracing::debug!("remote registered: {}", candidate);
        self.remotes.push(candidate);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.remotes.iter().any(|remote| remote.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.remotes.iter().map(|remote| remote.name.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RemoteDescriptor> {
        self.remotes.iter()
    }

    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }
}

impl<'a> IntoIterator for &'a RemoteSet {
    type Item = &'a RemoteDescriptor;
    type IntoIter = std::slice::Iter<'a, RemoteDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.remotes.iter()
    }
}

#[derive(Debug, Default)]
struct Candidate {
    name: String,
    user: String,
    pass: String,
    address: Option<Ipv4Addr>,
    port: u16,
}

impl Candidate {
    fn into_descriptor(self) -> RemoteDescriptor {
        RemoteDescriptor {
            name: self.name,
            user: self.user,
            pass: self.pass,
            address: self.address.unwrap_or(Ipv4Addr::UNSPECIFIED),
            port: self.port,
        }
    }
}

/// Build the remote set from the `remotes` node.
///
/// An empty result is not an error here, callers decide whether a configuration without
/// remotes makes sense.
pub fn parse(node: &Node<'_>) -> Result<RemoteSet, ConfigError> {
    if !node.is_seq() && !node.is_null() {
        return Err(ConfigError::malformed("remotes"));
    }
    let mut remotes = RemoteSet::new();
    let mut pending: Option<Candidate> = None;
    for entry in node.children() {
        if !entry.is_map() {
            tracing::warn!("ignoring remotes entry which is not a mapping: {:?}", entry.val());
            continue;
        }
        for field in entry.children() {
            let Some(key) = field.key() else {
                continue;
            };
            if key == "name" {
                if let Some(candidate) = pending.take() {
                    remotes.add(candidate.into_descriptor())?;
                }
                pending = Some(Candidate {
                    name: field.val().unwrap_or_default().into_owned(),
                    ..Default::default()
                });
                continue;
            }
            let candidate = pending.get_or_insert_with(Candidate::default);
            match key.as_ref() {
                "user" => {
                    if let Some(user) = field.val() {
                        candidate.user = user.into_owned();
                    }
                }
                "pass" => {
                    if let Some(pass) = field.val() {
                        candidate.pass = pass.into_owned();
                    }
                }
                "ip" => {
                    if let Some(ip) = field.val() {
                        candidate.address = Some(ip.trim().parse().unwrap_or_else(|_| {
                            tracing::warn!("remote ip is not a dotted-decimal IPv4 address: {ip}");
                            Ipv4Addr::UNSPECIFIED
                        }));
                    }
                }
                "port" => {
                    if field.has_val() {
                        candidate.port = field
                            .val_integer()
                            .and_then(|port| u16::try_from(port).ok())
                            .unwrap_or(0);
                    }
                }
                other => tracing::debug!("ignoring unknown remote field `{other}`"),
            }
        }
    }
    if let Some(candidate) = pending.take() {
        remotes.add(candidate.into_descriptor())?;
    }
    Ok(remotes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document;
    use proptest::prelude::*;

    fn remote(name: &str, ip: [u8; 4], port: u16) -> RemoteDescriptor {
        RemoteDescriptor {
            name: name.to_string(),
            user: "u".to_string(),
            pass: String::new(),
            address: Ipv4Addr::from(ip),
            port,
        }
    }

    fn parse_yaml(text: &str) -> Result<RemoteSet, ConfigError> {
        let doc = document::parse(text).unwrap();
        parse(&Node::root(&doc))
    }

    #[test]
    fn add_validates_required_fields() {
        let mut set = RemoteSet::new();
        assert_eq!(
            set.add(remote("", [10, 0, 0, 1], 22)),
            Err(ConfigError::EmptyName)
        );
        let mut no_user = remote("a", [10, 0, 0, 1], 22);
        no_user.user.clear();
        assert!(matches!(set.add(no_user), Err(ConfigError::EmptyUser { .. })));
        assert!(matches!(
            set.add(remote("a", [0, 0, 0, 0], 22)),
            Err(ConfigError::InvalidAddress { .. })
        ));
        assert!(matches!(
            set.add(remote("a", [10, 0, 0, 1], 0)),
            Err(ConfigError::InvalidAddress { .. })
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn empty_password_is_fine() {
        let mut set = RemoteSet::new();
        set.add(remote("a", [10, 0, 0, 1], 22)).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn same_ip_different_port_is_fine() {
        let mut set = RemoteSet::new();
        set.add(remote("a", [10, 0, 0, 1], 22)).unwrap();
        set.add(remote("b", [10, 0, 0, 1], 2222)).unwrap();
        assert_eq!(set.names(), ["a", "b"]);
    }

    #[test]
    fn rejection_message_names_the_remote() {
        let mut set = RemoteSet::new();
        set.add(remote("a", [10, 0, 0, 1], 22)).unwrap();
        let error = set.add(remote("b", [10, 0, 0, 1], 22)).unwrap_err();
        assert_eq!(
            error.to_string(),
            "remote ip and port is not unique: name=`b` ip=`10.0.0.1` port=`22`"
        );
    }

    proptest! {
        #[test]
        fn duplicates_rejected_in_any_order(
            names in proptest::collection::vec("[a-c]", 2..6),
            ports in proptest::collection::vec(1u16..4, 2..6),
        ) {
            let mut set = RemoteSet::new();
            let mut seen_names = std::collections::HashSet::new();
            let mut seen_ports = std::collections::HashSet::new();
            for (name, port) in names.iter().zip(ports.iter().copied()) {
                let unique = !seen_names.contains(name) && !seen_ports.contains(&port);
                let result = set.add(remote(name, [10, 0, 0, 1], port));
                prop_assert_eq!(result.is_ok(), unique);
                if unique {
                    seen_names.insert(name.clone());
                    seen_ports.insert(port);
                }
            }
            prop_assert_eq!(set.len(), seen_names.len());
        }
    }

    #[test]
    fn parses_entries_in_order() {
        let set = parse_yaml(
            "- name: a\n  user: u\n  pass: p\n  ip: 10.0.0.1\n  port: 22\n\
             - name: b\n  user: v\n  ip: 10.0.0.2\n  port: 2222\n",
        )
        .unwrap();
        assert_eq!(set.names(), ["a", "b"]);
        let first = set.iter().next().unwrap();
        assert_eq!(first.pass, "p");
        assert_eq!(first.socket_addr().to_string(), "10.0.0.1:22");
    }

    #[test]
    fn fields_before_first_name_belong_to_first_remote() {
        let set = parse_yaml("- user: u\n  ip: 10.0.0.1\n  port: 22\n  name: a\n");
        // the `name` field starts a fresh candidate, leaving the earlier fields in a nameless one
        assert_eq!(set, Err(ConfigError::EmptyName));
    }

    #[test]
    fn candidate_spans_entries_until_next_name() {
        let set = parse_yaml("- name: a\n- user: u\n  ip: 10.0.0.1\n  port: 22\n").unwrap();
        assert_eq!(set.names(), ["a"]);
    }

    #[test]
    fn bad_ip_or_port_is_invalid() {
        let error = parse_yaml("- {name: a, user: u, ip: not-an-ip, port: 22}").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidAddress { .. }));
        let error = parse_yaml("- {name: a, user: u, ip: 10.0.0.1, port: 70000}").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidAddress { port: 0, .. }));
        let error = parse_yaml("- {name: a, user: u, ip: 10.0.0.1, port: ssh}").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidAddress { port: 0, .. }));
    }

    #[test]
    fn duplicate_name_fails_parse() {
        let error = parse_yaml(
            "- {name: a, user: u, ip: 10.0.0.1, port: 22}\n- {name: a, user: u, ip: 10.0.0.2, port: 22}\n",
        )
        .unwrap_err();
        assert_eq!(error, ConfigError::DuplicateName { name: "a".into() });
    }

    #[test]
    fn empty_and_null_give_empty_set() {
        assert!(parse_yaml("[]").unwrap().is_empty());
        assert!(parse_yaml("~").unwrap().is_empty());
    }

    #[test]
    fn non_sequence_is_malformed() {
        assert_eq!(parse_yaml("name: a"), Err(ConfigError::malformed("remotes")));
    }
}
