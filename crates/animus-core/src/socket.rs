//! Sockets: verbs an agent offers to whitelisted peers holding its token.

use crate::error::SocketError;
use crate::executive::Verb;
use crate::types::AgentId;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socket {
    name: String,
    verb: Verb,
    phrase: String,
    token: String,
    whitelist: BTreeSet<AgentId>,
}

impl Socket {
    pub fn new(
        name: impl Into<String>,
        verb: Verb,
        phrase: impl Into<String>,
        token: impl Into<String>,
        whitelist: impl IntoIterator<Item = AgentId>,
    ) -> Self {
        Self {
            name: name.into(),
            verb,
            phrase: phrase.into(),
            token: token.into(),
            whitelist: whitelist.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn whitelist(&self) -> &BTreeSet<AgentId> {
        &self.whitelist
    }

    pub fn allow(&mut self, peer: AgentId) {
        self.whitelist.insert(peer);
    }

    /// Check a connection attempt. Anonymous callers are never whitelisted.
    pub fn admit(&self, caller: Option<AgentId>, token: &str) -> Result<(), SocketError> {
        if token != self.token {
            return Err(SocketError::BadToken(self.name.clone()));
        }
        match caller {
            Some(id) if self.whitelist.contains(&id) => Ok(()),
            _ => Err(SocketError::NotWhitelisted {
                socket: self.name.clone(),
                caller,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_only_whitelisted_token_holders() {
        let friend = AgentId::new();
        let stranger = AgentId::new();
        let socket = Socket::new("door", Verb::Tickle, "reveal", "secret", [friend]);

        assert_eq!(socket.admit(Some(friend), "secret"), Ok(()));
        assert_eq!(socket.admit(Some(friend), "guess"), Err(SocketError::BadToken("door".into())));
        assert!(matches!(
            socket.admit(Some(stranger), "secret"),
            Err(SocketError::NotWhitelisted { .. })
        ));
        assert!(socket.admit(None, "secret").is_err());
    }
}
