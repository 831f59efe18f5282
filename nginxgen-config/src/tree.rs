//! Configuration tree
//!
//! A [`Section`] holds an ordered set of children, each stored under the
//! [`CacheKey`] derived from the arguments it was created with. Asking for the
//! same section or directive twice hands back the existing child, so callers
//! can build the tree incrementally without producing duplicates.
//!
//! ```
//! use nginxgen_config::{Section, render};
//!
//! let mut conf = Section::new();
//! conf.section("location", "/", &[])?.set(&["root", "/var/www"])?;
//!
//! assert_eq!(render(&conf), "location / {\n    root /var/www;\n}\n");
//! # Ok::<(), nginxgen_config::DslError>(())
//! ```

use crate::error::{DslError, DslResult};
use crate::policy::{CacheKey, SERVER};
use indexmap::IndexMap;

/// A child of a section
#[derive(Debug, Clone)]
pub enum Node {
    Section(Section),
    Directive(Directive),
}

impl Node {
    fn render_into(&self, lines: &mut Vec<String>) {
        match self {
            Node::Section(section) => section.render_into(lines),
            Node::Directive(directive) => lines.push(directive.render()),
        }
    }
}

/// A single configuration directive
#[derive(Debug, Clone)]
pub struct Directive {
    keys: Vec<String>,
    values: Vec<String>,
}

impl Directive {
    fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            values: Vec::new(),
        }
    }

    /// Arguments identifying this directive
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Current values
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Replace the values
    pub fn set_values(&mut self, values: Vec<String>) {
        self.values = values;
    }

    /// Render as a single `;`-terminated line
    pub fn render(&self) -> String {
        let parts: Vec<&str> = self.keys.iter().chain(&self.values).map(String::as_str).collect();
        format!("{};", parts.join(" "))
    }
}

/// A configuration section (or the root)
#[derive(Debug, Clone, Default)]
pub struct Section {
    args: Vec<String>,
    children: IndexMap<CacheKey, Node>,
}

impl Section {
    /// Create a root section. It has no header and renders without braces.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_args(args: Vec<String>) -> Self {
        Self {
            args,
            children: IndexMap::new(),
        }
    }

    /// Header arguments (empty for the root)
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether this is a root section
    pub fn is_root(&self) -> bool {
        self.args.is_empty()
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether this section has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Children in insertion order
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.values()
    }

    /// Get or create the section `name first_arg other_args...`.
    ///
    /// `first_arg` is separate because a section needs at least two
    /// arguments to be cached without ambiguous keys. Server sections have
    /// their own constructor, see [`Section::server`].
    pub fn section(&mut self, name: &str, first_arg: &str, other_args: &[&str]) -> DslResult<&mut Section> {
        if name == SERVER {
            return Err(DslError::InvalidUsage {
                message: "use Section::server() instead of Section::section(\"server\", ..)".to_string(),
            });
        }

        let key = CacheKey::section(name, first_arg, other_args);
        let node = self.children.entry(key).or_insert_with_key(|key| {
            Node::Section(Section::with_args(key.parts().to_vec()))
        });
        Ok(expect_section(node))
    }

    /// Look up an existing section without creating it
    pub fn get_section(&self, name: &str, first_arg: &str, other_args: &[&str]) -> DslResult<&Section> {
        let key = CacheKey::section(name, first_arg, other_args);
        match self.children.get(&key) {
            Some(Node::Section(section)) => Ok(section),
            _ => Err(DslError::KeyNotFound { key }),
        }
    }

    /// Get or create a `server` section.
    ///
    /// The header is just `server`; `listen` and `server_name` are set as
    /// directives when the section is first created.
    pub fn server(&mut self, listen: &str, names: &[&str]) -> &mut Section {
        let key = CacheKey::server(listen, names);
        let node = self.children.entry(key).or_insert_with(|| {
            let mut server = Section::with_args(vec![SERVER.to_string()]);
            server.set_directive("listen", &[listen]);
            server.set_directive("server_name", names);
            Node::Section(server)
        });
        expect_section(node)
    }

    /// Remove a section created through [`Section::section`].
    pub fn remove_section(&mut self, name: &str, first_arg: &str, other_args: &[&str]) -> DslResult<()> {
        if name == SERVER {
            return Err(DslError::InvalidUsage {
                message: "server sections cannot be removed".to_string(),
            });
        }
        self.remove_key(CacheKey::section(name, first_arg, other_args))
    }

    /// Set a directive, replacing the values of an earlier one with the same key.
    ///
    /// Which leading arguments form the key is decided by
    /// [`key_arity`](crate::policy::key_arity).
    pub fn set(&mut self, args: &[&str]) -> DslResult<&mut Directive> {
        let (name, rest) = split_name(args)?;
        Ok(self.set_directive(name, rest))
    }

    /// Values of a previously set directive.
    ///
    /// Only the key part of `args` is significant.
    pub fn get(&self, args: &[&str]) -> DslResult<&[String]> {
        let (name, rest) = split_name(args)?;
        let (key, _) = CacheKey::directive(name, rest);
        match self.children.get(&key) {
            Some(Node::Directive(directive)) => Ok(directive.values()),
            _ => Err(DslError::KeyNotFound { key }),
        }
    }

    /// Remove a directive. Only the key part of `args` is significant.
    pub fn remove(&mut self, args: &[&str]) -> DslResult<()> {
        let (name, rest) = split_name(args)?;
        let (key, _) = CacheKey::directive(name, rest);
        self.remove_key(key)
    }

    /// Flatten into unindented lines
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.render_into(&mut lines);
        lines
    }

    fn set_directive(&mut self, name: &str, rest: &[&str]) -> &mut Directive {
        let (key, values) = CacheKey::directive(name, rest);
        let node = self
            .children
            .entry(key)
            .or_insert_with_key(|key| Node::Directive(Directive::new(key.parts().to_vec())));
        let directive = match node {
            Node::Directive(directive) => directive,
            Node::Section(_) => unreachable!("directive keys only map to directives"),
        };
        directive.set_values(values);
        directive
    }

    fn remove_key(&mut self, key: CacheKey) -> DslResult<()> {
        // shift_remove keeps the order of the remaining children
        match self.children.shift_remove(&key) {
            Some(_) => Ok(()),
            None => Err(DslError::KeyNotFound { key }),
        }
    }

    fn render_into(&self, lines: &mut Vec<String>) {
        if !self.is_root() {
            lines.push(format!("{} {{", self.args.join(" ")));
        }
        for child in self.children.values() {
            child.render_into(lines);
        }
        if !self.is_root() {
            lines.push("}".to_string());
        }
    }
}

fn expect_section(node: &mut Node) -> &mut Section {
    match node {
        Node::Section(section) => section,
        Node::Directive(_) => unreachable!("section keys only map to sections"),
    }
}

fn split_name<'a, 'b>(args: &'a [&'b str]) -> DslResult<(&'b str, &'a [&'b str])> {
    match args.split_first() {
        Some((name, rest)) => Ok((*name, rest)),
        None => Err(DslError::InvalidUsage {
            message: "a directive needs at least a name".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::render;

    #[test]
    fn test_section_is_cached() {
        let mut conf = Section::new();
        conf.section("location", "/", &[]).unwrap().set(&["root", "/var/www"]).unwrap();
        assert_eq!(conf.len(), 1);

        let again = conf.section("location", "/", &[]).unwrap();
        assert_eq!(again.args(), ["location", "/"]);
        assert_eq!(again.get(&["root"]).unwrap(), ["/var/www"]);
        assert_eq!(conf.len(), 1);
    }

    #[test]
    fn test_first_insertion_order() {
        let mut conf = Section::new();
        conf.section("location", "/a", &[]).unwrap();
        conf.section("location", "/b", &[]).unwrap();
        conf.set(&["gzip", "on"]).unwrap();
        conf.section("location", "/a", &[]).unwrap().set(&["root", "/a"]).unwrap();
        conf.set(&["gzip", "off"]).unwrap();

        assert_eq!(
            conf.render(),
            vec!["location /a {", "root /a;", "}", "location /b {", "}", "gzip off;"]
        );
    }

    #[test]
    fn test_directive_overwrite() {
        let mut conf = Section::new();
        conf.set(&["timeout", "30"]).unwrap();
        conf.set(&["timeout", "60"]).unwrap();

        assert_eq!(conf.render(), vec!["timeout 60;"]);
    }

    #[test]
    fn test_multi_key_directive() {
        let mut conf = Section::new();
        conf.set(&["add_header", "X-Foo", "1"]).unwrap();
        conf.set(&["add_header", "X-Foo", "2"]).unwrap();
        conf.set(&["add_header", "X-Bar", "1"]).unwrap();

        assert_eq!(conf.render(), vec!["add_header X-Foo 2;", "add_header X-Bar 1;"]);
        assert_eq!(conf.get(&["add_header", "X-Foo"]).unwrap(), ["2"]);
    }

    #[test]
    fn test_directive_without_values() {
        let mut conf = Section::new();
        let directive = conf.set(&["internal"]).unwrap();
        assert_eq!(directive.keys(), ["internal"]);
        assert!(directive.values().is_empty());
        assert_eq!(conf.render(), vec!["internal;"]);
    }

    #[test]
    fn test_empty_directive_rejected() {
        let mut conf = Section::new();
        assert!(matches!(conf.set(&[]), Err(DslError::InvalidUsage { .. })));
    }

    #[test]
    fn test_get_missing_directive() {
        let conf = Section::new();
        let err = conf.get(&["root"]).unwrap_err();
        assert_eq!(
            err,
            DslError::KeyNotFound {
                key: CacheKey::Directive(vec!["root".to_string()])
            }
        );
    }

    #[test]
    fn test_remove_directive() {
        let mut conf = Section::new();
        conf.set(&["proxy_set_header", "Host", "$host"]).unwrap();
        conf.set(&["proxy_set_header", "X-Real-IP", "$remote_addr"]).unwrap();
        conf.set(&["proxy_redirect", "off"]).unwrap();

        conf.remove(&["proxy_set_header", "Host"]).unwrap();
        assert_eq!(
            conf.render(),
            vec!["proxy_set_header X-Real-IP $remote_addr;", "proxy_redirect off;"]
        );

        assert!(matches!(
            conf.remove(&["proxy_set_header", "Host"]),
            Err(DslError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_server_section() {
        let mut conf = Section::new();
        let server = conf.server("0.0.0.0:80", &["example.com"]);
        assert_eq!(server.args(), ["server"]);
        assert_eq!(server.len(), 2);

        assert_eq!(
            render(&conf),
            "server {\n    listen 0.0.0.0:80;\n    server_name example.com;\n}\n"
        );
    }

    #[test]
    fn test_server_is_cached() {
        let mut conf = Section::new();
        conf.server("*:80", &["a.com", "b.com"]).set(&["access_log", "off"]).unwrap();
        let server = conf.server("*:80", &["a.com", "b.com"]);
        assert_eq!(server.get(&["access_log"]).unwrap(), ["off"]);

        conf.server("*:443", &["a.com", "b.com"]);
        assert_eq!(conf.len(), 2);
    }

    #[test]
    fn test_server_directives_removable() {
        let mut conf = Section::new();
        let server = conf.server("*:80", &["a.com"]);
        server.remove(&["server_name"]).unwrap();
        assert_eq!(server.render(), vec!["server {", "listen *:80;", "}"]);
    }

    #[test]
    fn test_generic_server_rejected() {
        let mut conf = Section::new();
        assert!(matches!(
            conf.section("server", "*:80", &[]),
            Err(DslError::InvalidUsage { .. })
        ));

        conf.server("*:80", &["a.com"]);
        assert!(matches!(
            conf.remove_section("server", "*:80", &["a.com"]),
            Err(DslError::InvalidUsage { .. })
        ));
        assert_eq!(conf.len(), 1);
    }

    #[test]
    fn test_remove_section() {
        let mut conf = Section::new();
        conf.section("location", "/a", &[]).unwrap();
        conf.section("location", "=", &["/50x.html"]).unwrap();
        conf.section("location", "/c", &[]).unwrap();

        conf.remove_section("location", "=", &["/50x.html"]).unwrap();
        assert_eq!(conf.render(), vec!["location /a {", "}", "location /c {", "}"]);

        let err = conf.remove_section("location", "/missing", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Key not found: section `location /missing`");
    }

    #[test]
    fn test_get_section() {
        let mut conf = Section::new();
        conf.section("upstream", "app", &[]).unwrap().set(&["server", "unix:/tmp/app.sock", "fail_timeout=0"]).unwrap();

        let upstream = conf.get_section("upstream", "app", &[]).unwrap();
        assert_eq!(upstream.get(&["server", "unix:/tmp/app.sock"]).unwrap(), ["fail_timeout=0"]);
        assert!(conf.get_section("upstream", "other", &[]).is_err());
    }

    #[test]
    fn test_section_and_directive_keys_are_separate() {
        let mut conf = Section::new();
        conf.set(&["add_header", "X-Foo", "1"]).unwrap();
        conf.section("add_header", "X-Foo", &[]).unwrap();
        assert_eq!(conf.len(), 2);
    }

    #[test]
    fn test_children_walk() {
        let mut conf = Section::new();
        conf.section("upstream", "app", &[]).unwrap();
        conf.set(&["gzip", "on"]).unwrap();
        conf.server("*:80", &["a.com"]);

        let summary: Vec<String> = conf
            .children()
            .map(|node| match node {
                Node::Section(section) => format!("section {} ({})", section.args().join(" "), section.len()),
                Node::Directive(directive) => format!("directive {}", directive.keys().join(" ")),
            })
            .collect();
        assert_eq!(summary, vec!["section upstream app (0)", "directive gzip", "section server (2)"]);
        assert!(conf.get_section("upstream", "app", &[]).unwrap().is_empty());
        assert!(!conf.is_empty());
    }

    #[test]
    fn test_nested_render() {
        let mut conf = Section::new();
        conf.server("*:80", &["example.com"])
            .section("location", "/", &[])
            .unwrap()
            .section("if", "($request_method", &["=", "POST)"])
            .unwrap()
            .set(&["return", "405"])
            .unwrap();

        assert_eq!(
            conf.render(),
            vec![
                "server {",
                "listen *:80;",
                "server_name example.com;",
                "location / {",
                "if ($request_method = POST) {",
                "return 405;",
                "}",
                "}",
                "}",
            ]
        );
    }
}
