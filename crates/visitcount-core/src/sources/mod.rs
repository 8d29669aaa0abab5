//! Remote count sources and the chain that resolves them.
//!
//! A [`CounterSource`] is static configuration describing one counting
//! service. The [`SourceChainResolver`] expands the configured sources into
//! an ordered list of [`Candidate`]s (direct first, then each proxy for
//! sources that need one) and tries them one at a time.

pub mod resolver;
pub mod transport;

pub use resolver::{parse_count, SourceChainResolver};
pub use transport::{CountTransport, HttpTransport, TransportResponse};

use serde::{Deserialize, Serialize};

use crate::key::CounterKey;

/// The two operations every source supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Increment,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Increment => "increment",
        }
    }
}

/// How an operation maps onto a URL shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpStyle {
    /// `{base}/{verb}/{namespace}/{key}`
    VerbPath {
        #[serde(default = "default_read_verb")]
        read_verb: String,
        #[serde(default = "default_increment_verb")]
        increment_verb: String,
    },
    /// Read `{base}/{namespace}/{key}`, increment `{base}/{namespace}/{key}/{suffix}`
    Suffix {
        #[serde(default = "default_increment_suffix")]
        increment_suffix: String,
    },
}

fn default_read_verb() -> String {
    "get".into()
}
fn default_increment_verb() -> String {
    "hit".into()
}
fn default_increment_suffix() -> String {
    "up".into()
}
fn default_fields() -> Vec<String> {
    vec!["value".into(), "count".into()]
}

/// One remote counting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSource {
    pub name: String,
    pub base_url: String,
    /// Accepted numeric field names, in priority order.
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
    /// Also try this source through every configured proxy.
    #[serde(default)]
    pub requires_proxy: bool,
    pub style: OpStyle,
}

impl CounterSource {
    /// Operation-specific URL for `key`, without any proxy wrapping.
    pub fn url_for(&self, op: Operation, key: &CounterKey) -> String {
        let base = self.base_url.trim_end_matches('/');
        let ns = urlencoding::encode(&key.namespace);
        let k = urlencoding::encode(&key.key);
        match (&self.style, op) {
            (OpStyle::VerbPath { read_verb, .. }, Operation::Read) => {
                format!("{base}/{read_verb}/{ns}/{k}")
            }
            (OpStyle::VerbPath { increment_verb, .. }, Operation::Increment) => {
                format!("{base}/{increment_verb}/{ns}/{k}")
            }
            (OpStyle::Suffix { .. }, Operation::Read) => format!("{base}/{ns}/{k}"),
            (OpStyle::Suffix { increment_suffix }, Operation::Increment) => {
                format!("{base}/{ns}/{k}/{increment_suffix}")
            }
        }
    }
}

/// An endpoint that forwards a wrapped request to its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    pub name: String,
    /// Prefix the target URL is appended to.
    pub prefix: String,
    /// Percent-encode the target before appending.
    #[serde(default = "default_true")]
    pub encode: bool,
}

fn default_true() -> bool {
    true
}

impl Proxy {
    pub fn wrap(&self, target: &str) -> String {
        if self.encode {
            format!("{}{}", self.prefix, urlencoding::encode(target))
        } else {
            format!("{}{}", self.prefix, target)
        }
    }
}

/// One concrete (source, proxy) combination.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub source: &'a CounterSource,
    pub proxy: Option<&'a Proxy>,
}

impl Candidate<'_> {
    pub fn label(&self) -> String {
        match self.proxy {
            Some(proxy) => format!("{} via {}", self.source.name, proxy.name),
            None => self.source.name.clone(),
        }
    }

    pub fn url_for(&self, op: Operation, key: &CounterKey) -> String {
        let target = self.source.url_for(op, key);
        match self.proxy {
            Some(proxy) => proxy.wrap(&target),
            None => target,
        }
    }
}

/// Expand sources into candidates: each source direct, then through every
/// proxy in order when the source requires proxying.
pub fn candidates<'a>(sources: &'a [CounterSource], proxies: &'a [Proxy]) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    for source in sources {
        out.push(Candidate { source, proxy: None });
        if source.requires_proxy {
            out.extend(proxies.iter().map(|proxy| Candidate {
                source,
                proxy: Some(proxy),
            }));
        }
    }
    out
}

/// Services the widget talks to when no configuration overrides them.
pub fn default_sources() -> Vec<CounterSource> {
    vec![
        CounterSource {
            name: "countapi".into(),
            base_url: "https://api.countapi.xyz".into(),
            style: OpStyle::VerbPath {
                read_verb: default_read_verb(),
                increment_verb: default_increment_verb(),
            },
            fields: vec!["value".into()],
            requires_proxy: true,
        },
        CounterSource {
            name: "counterapi".into(),
            base_url: "https://api.counterapi.dev/v1".into(),
            style: OpStyle::Suffix {
                increment_suffix: default_increment_suffix(),
            },
            fields: vec!["count".into(), "value".into()],
            requires_proxy: false,
        },
    ]
}

pub fn default_proxies() -> Vec<Proxy> {
    vec![
        Proxy {
            name: "allorigins".into(),
            prefix: "https://api.allorigins.win/raw?url=".into(),
            encode: true,
        },
        Proxy {
            name: "corsproxy".into(),
            prefix: "https://corsproxy.io/?".into(),
            encode: true,
        },
    ]
}
