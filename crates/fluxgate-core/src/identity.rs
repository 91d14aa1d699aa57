//! Identity-path extraction from record keys.
//!
//! Every consumed record is keyed by a hierarchical identity path of the
//! form `owner/<owner>/thing/<thing>/node/<node>`. The path may appear
//! anywhere inside the key text; each segment is a `\w+` word.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

const IDENTITY_PATTERN: &str = r"owner/(?P<owner>\w+)/thing/(?P<thing>\w+)/node/(?P<node>\w+)";

fn identity_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(IDENTITY_PATTERN).expect("identity pattern compiles"))
}

/// The three-part identity extracted from a record key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    pub owner: String,
    pub thing: String,
    pub node: String,
}

impl IdentityKey {
    /// Extract the identity path from `key`, searching anywhere in the text.
    ///
    /// Returns `None` when no `owner/<o>/thing/<t>/node/<n>` sequence with
    /// word-character segments is present.
    pub fn parse(key: &str) -> Option<Self> {
        let captures = identity_regex().captures(key)?;
        Some(Self {
            owner: captures["owner"].to_string(),
            thing: captures["thing"].to_string(),
            node: captures["node"].to_string(),
        })
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "owner/{}/thing/{}/node/{}",
            self.owner, self.thing, self.node
        )
    }
}
