//! Cache key derivation
//!
//! Every child of a [`Section`](crate::Section) is stored under a
//! [`CacheKey`]. Sections are keyed by their full header, directives by a
//! prefix of their arguments whose length is looked up in
//! [`MULTI_KEY_DIRECTIVES`].

use std::fmt;

/// Header tag of the server-like section
pub const SERVER: &str = "server";

/// Directives which are not unique by name alone.
///
/// The number is how many leading arguments together form the cache key.
/// Anything not listed uses a single argument (the directive name).
pub const MULTI_KEY_DIRECTIVES: &[(&str, usize)] = &[
    ("proxy_set_header", 2),
    ("add_header", 2),
    ("server", 2),
];

/// Number of leading arguments identifying a directive
pub fn key_arity(name: &str) -> usize {
    MULTI_KEY_DIRECTIVES
        .iter()
        .find(|(directive, _)| *directive == name)
        .map_or(1, |(_, arity)| *arity)
}

/// Identity of a child within its parent section
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Section(Vec<String>),
    Directive(Vec<String>),
}

impl CacheKey {
    /// Key of a generic section `name first_arg other_args...`
    pub fn section(name: &str, first_arg: &str, other_args: &[&str]) -> Self {
        let mut parts = Vec::with_capacity(other_args.len() + 2);
        parts.push(name.to_string());
        parts.push(first_arg.to_string());
        parts.extend(other_args.iter().map(|arg| arg.to_string()));
        CacheKey::Section(parts)
    }

    /// Key of the server-like section
    pub fn server(listen: &str, names: &[&str]) -> Self {
        Self::section(SERVER, listen, names)
    }

    /// Split directive arguments into the key and the remaining values.
    ///
    /// The key is clamped to the arguments available, so `add_header` alone
    /// is keyed by its name.
    pub fn directive(name: &str, args: &[&str]) -> (Self, Vec<String>) {
        let split = (key_arity(name) - 1).min(args.len());
        let (key_args, values) = args.split_at(split);

        let mut parts = Vec::with_capacity(split + 1);
        parts.push(name.to_string());
        parts.extend(key_args.iter().map(|arg| arg.to_string()));

        let values = values.iter().map(|arg| arg.to_string()).collect();
        (CacheKey::Directive(parts), values)
    }

    /// The arguments forming this key
    pub fn parts(&self) -> &[String] {
        match self {
            CacheKey::Section(parts) | CacheKey::Directive(parts) => parts,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            CacheKey::Section(_) => "section",
            CacheKey::Directive(_) => "directive",
        };
        write!(f, "{} `{}`", kind, self.parts().join(" "))
    }
}
