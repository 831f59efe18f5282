//! nginxgen configuration DSL
//!
//! This crate builds nginx-style block configuration as a tree and renders it
//! to indented text. Sections and directives are cached by their arguments,
//! so building the same part of the tree twice updates it in place instead of
//! duplicating it.
//!
//! # Example
//!
//! ```rust
//! use nginxgen_config::{Section, render};
//!
//! let mut conf = Section::new();
//! let server = conf.server("0.0.0.0:80", &["example.com"]);
//! server.set(&["add_header", "X-Frame-Options", "DENY"])?;
//! server.section("location", "/", &[])?.set(&["root", "/var/www"])?;
//!
//! let text = render(&conf);
//! assert!(text.starts_with("server {\n    listen 0.0.0.0:80;\n    server_name example.com;\n"));
//! assert!(text.contains("    location / {\n        root /var/www;\n    }\n"));
//! # Ok::<(), nginxgen_config::DslError>(())
//! ```

pub mod error;
pub mod policy;
pub mod printer;
pub mod site;
pub mod tree;

pub use error::{DslError, DslResult, RenderError};
pub use policy::{CacheKey, key_arity};
pub use printer::{flatten, pretty_print, render};
pub use site::{render_site, render_sites, slugify};
pub use tree::{Directive, Node, Section};
