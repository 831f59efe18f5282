//! Configuration type definitions
//!
//! These types describe the deployment of one or more sites. They are
//! supplied by the operator and consumed by the site renderer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root deployment descriptor
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeployConfig {
    /// Sites, rendered in the order they appear in the file
    #[serde(default)]
    pub sites: IndexMap<String, SiteConfig>,

    /// Where to install the rendered text and how to reload nginx
    #[serde(default)]
    pub reload: ReloadConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DeployConfig {
    /// Resolve the install path for the rendered configuration.
    ///
    /// Falls back to `<path>../config/nginx.conf` of the first site.
    pub fn output_path(&self) -> Option<PathBuf> {
        if let Some(output) = &self.reload.output {
            return Some(PathBuf::from(output));
        }
        self.sites
            .values()
            .next()
            .map(|site| PathBuf::from(format!("{}../config/nginx.conf", site.deployment.path)))
    }
}

/// A single site (one upstream plus its virtual hosts)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SiteConfig {
    /// Domains served by this site; the first one is the canonical name
    pub domains: Vec<String>,

    /// Processes backing this site, keyed by process name
    #[serde(default)]
    pub processes: IndexMap<String, ProcessConfig>,

    /// Deployment settings
    #[serde(default)]
    pub deployment: DeploymentConfig,

    /// Extra directives for the `location /` block
    #[serde(default)]
    pub nginx: IndexMap<String, String>,

    /// Static file mappings (url -> path relative to the deployment path)
    #[serde(default, rename = "static")]
    pub static_files: IndexMap<String, String>,

    /// Internal (X-Accel) file mappings (url -> relative path)
    #[serde(default)]
    pub sendfile: IndexMap<String, String>,

    /// htpasswd file used when basic auth is enabled
    #[serde(default)]
    pub basic_auth_path: Option<String>,
}

impl SiteConfig {
    /// Iterate the gunicorn processes of this site
    pub fn gunicorn_processes(&self) -> impl Iterator<Item = (&String, &ProcessConfig)> {
        self.processes
            .iter()
            .filter(|(_, process)| process.kind == ProcessKind::Gunicorn)
    }
}

/// A process belonging to a site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Process type
    #[serde(rename = "type")]
    pub kind: ProcessKind,

    /// Unix socket the process listens on
    #[serde(default)]
    pub socket: Option<String>,
}

/// Process types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Gunicorn,
    Redis,
    #[serde(other)]
    Other,
}

/// Deployment settings of a site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// IP address the virtual hosts bind to
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,

    /// Serve over HTTPS (plain HTTP is redirected)
    #[serde(default)]
    pub ssl: bool,

    /// Certificate file path
    #[serde(default)]
    pub ssl_cert_path: Option<String>,

    /// Key file path
    #[serde(default)]
    pub ssl_key_path: Option<String>,

    /// Deployment root, with a trailing slash
    #[serde(default)]
    pub path: String,

    /// Locations that accept larger request bodies
    #[serde(default)]
    pub big_body_endpoints: Vec<BigBodyEndpoint>,

    /// URL rewrites inside the main virtual host
    #[serde(default)]
    pub url_redirect: Vec<UrlRedirect>,

    /// Protect the site with HTTP basic auth
    #[serde(default)]
    pub basic_auth: bool,

    /// Error pages served from static files
    #[serde(default)]
    pub static_error_pages: Vec<StaticErrorPage>,

    /// Whole domains redirected to another domain
    #[serde(default)]
    pub domains_redirect: Vec<DomainRedirect>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            bind_ip: default_bind_ip(),
            ssl: false,
            ssl_cert_path: None,
            ssl_key_path: None,
            path: String::new(),
            big_body_endpoints: Vec::new(),
            url_redirect: Vec::new(),
            basic_auth: false,
            static_error_pages: Vec::new(),
            domains_redirect: Vec::new(),
        }
    }
}

fn default_bind_ip() -> String {
    "*".to_string()
}

/// A location with a raised `client_max_body_size`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigBodyEndpoint {
    pub location: String,
    pub max_body_size: String,
}

/// A `rewrite` rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRedirect {
    pub source: String,
    pub destination: String,
    #[serde(default = "default_redirect_options")]
    pub options: String,
}

fn default_redirect_options() -> String {
    "permanent".to_string()
}

/// An error page served from a static file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticErrorPage {
    /// Status codes answered with this page
    pub codes: Vec<u16>,
    /// File name, also used as the location
    pub filename: String,
    /// Directory holding the file
    pub root: String,
}

/// Redirect of a whole domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRedirect {
    pub domain: String,
    pub destination_domain: String,
}

/// Install and reload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadConfig {
    /// Shell command reloading nginx
    #[serde(default = "default_reload_command")]
    pub command: String,

    /// Install path of the rendered configuration
    #[serde(default)]
    pub output: Option<String>,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            command: default_reload_command(),
            output: None,
        }
    }
}

fn default_reload_command() -> String {
    "sudo /etc/init.d/nginx reload".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeployConfig::default();
        assert!(config.sites.is_empty());
        assert_eq!(config.reload.command, "sudo /etc/init.d/nginx reload");
        assert_eq!(config.logging.level, "info");
        assert!(config.output_path().is_none());
    }

    #[test]
    fn test_json_deserialize() {
        let json = r#"{
            "sites": {
                "main": {
                    "domains": ["example.com"],
                    "processes": {
                        "web": {"type": "gunicorn", "socket": "/tmp/web.sock"},
                        "cache": {"type": "redis"},
                        "worker": {"type": "celery"}
                    },
                    "deployment": {"path": "/srv/main/", "ssl": true}
                }
            }
        }"#;
        let config: DeployConfig = serde_json::from_str(json).unwrap();
        let site = &config.sites["main"];
        assert!(site.deployment.ssl);
        assert_eq!(site.deployment.bind_ip, "*");
        assert_eq!(site.processes["worker"].kind, ProcessKind::Other);

        let gunicorn: Vec<_> = site.gunicorn_processes().map(|(name, _)| name.as_str()).collect();
        assert_eq!(gunicorn, vec!["web"]);
    }

    #[test]
    fn test_output_path_fallback() {
        let mut config = DeployConfig::default();
        let mut site = SiteConfig::default();
        site.deployment.path = "/srv/app/current/".to_string();
        config.sites.insert("app".to_string(), site);

        assert_eq!(
            config.output_path(),
            Some(PathBuf::from("/srv/app/current/../config/nginx.conf"))
        );

        config.reload.output = Some("/etc/nginx/sites-enabled/app".to_string());
        assert_eq!(
            config.output_path(),
            Some(PathBuf::from("/etc/nginx/sites-enabled/app"))
        );
    }

    #[test]
    fn test_redirect_defaults() {
        let redirect: UrlRedirect =
            serde_json::from_str(r#"{"source": "^/old$", "destination": "/new"}"#).unwrap();
        assert_eq!(redirect.options, "permanent");
    }
}
