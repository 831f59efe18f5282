//! Site renderer
//!
//! Turns deployment descriptors into nginx configuration: one upstream for
//! the gunicorn processes of a site, the main virtual host, and the redirect
//! hosts around it.

use crate::error::{DslResult, RenderError};
use crate::printer::render;
use crate::tree::Section;
use nginxgen_core::config::{DeployConfig, SiteConfig};

/// Render every site of a descriptor, in file order.
///
/// `postprocess` runs on each finished tree before it is rendered. The first
/// failing site aborts rendering, so no partial output is produced.
pub fn render_sites<F>(config: &DeployConfig, mut postprocess: F) -> Result<String, RenderError>
where
    F: FnMut(&str, &mut Section) -> DslResult<()>,
{
    let mut rendered = Vec::with_capacity(config.sites.len());
    for (name, site) in &config.sites {
        rendered.push(render_site(name, site, |conf| postprocess(name, conf))?);
    }
    tracing::info!("Rendered {} site(s)", rendered.len());
    Ok(rendered.join("\n"))
}

/// Render a single site
pub fn render_site<F>(name: &str, site: &SiteConfig, postprocess: F) -> Result<String, RenderError>
where
    F: FnOnce(&mut Section) -> DslResult<()>,
{
    tracing::debug!("Rendering site {}", name);
    let context = SiteContext::new(name, site)?;

    let mut conf = Section::new();
    let tree_error = |source| RenderError::Tree {
        site: name.to_string(),
        source,
    };
    context.build(&mut conf).map_err(tree_error)?;
    postprocess(&mut conf).map_err(tree_error)?;

    Ok(render(&conf))
}

/// Django-style slug: `"example.com www.example.com"` becomes
/// `"examplecom-wwwexamplecom"`.
pub fn slugify(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();

    let mut slug = String::with_capacity(cleaned.len());
    let mut in_separator = false;
    for c in cleaned.trim().chars() {
        if c == '-' || c.is_whitespace() {
            if !in_separator {
                slug.push('-');
                in_separator = true;
            }
        } else {
            slug.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    slug
}

/// Validated, borrowed view of a site descriptor
struct SiteContext<'a> {
    site: &'a SiteConfig,
    domains: Vec<&'a str>,
    upstream: String,
    certificate: Option<(&'a str, &'a str)>,
    basic_auth_file: Option<&'a str>,
    access_log: String,
    error_log: String,
}

impl<'a> SiteContext<'a> {
    fn new(name: &str, site: &'a SiteConfig) -> Result<Self, RenderError> {
        let invalid = |message: &str| RenderError::Descriptor {
            site: name.to_string(),
            message: message.to_string(),
        };
        let deployment = &site.deployment;

        if site.domains.is_empty() {
            return Err(invalid("no domains configured"));
        }

        let certificate = if deployment.ssl {
            match (&deployment.ssl_cert_path, &deployment.ssl_key_path) {
                (Some(cert), Some(key)) => Some((cert.as_str(), key.as_str())),
                _ => return Err(invalid("ssl requires ssl_cert_path and ssl_key_path")),
            }
        } else {
            None
        };

        let basic_auth_file = if deployment.basic_auth {
            match &site.basic_auth_path {
                Some(path) => Some(path.as_str()),
                None => return Err(invalid("basic_auth requires basic_auth_path")),
            }
        } else {
            None
        };

        let mut gunicorn = 0;
        for (process, config) in site.gunicorn_processes() {
            if config.socket.is_none() {
                return Err(invalid(&format!("gunicorn process '{}' has no socket", process)));
            }
            gunicorn += 1;
        }
        if gunicorn == 0 {
            tracing::warn!("Site {} has no gunicorn processes, its upstream is empty", name);
        }

        Ok(Self {
            site,
            domains: site.domains.iter().map(String::as_str).collect(),
            upstream: slugify(&site.domains.join(" ")),
            certificate,
            basic_auth_file,
            access_log: format!("{}../log/nginx/access.log", deployment.path),
            error_log: format!("{}../log/nginx/error.log", deployment.path),
        })
    }

    fn build(&self, conf: &mut Section) -> DslResult<()> {
        let deployment = &self.site.deployment;

        let upstream = conf.section("upstream", &self.upstream, &[])?;
        for (_, process) in self.site.gunicorn_processes() {
            if let Some(socket) = &process.socket {
                upstream.set(&["server", &format!("unix:{}", socket), "fail_timeout=0"])?;
            }
        }

        let port = if deployment.ssl { "443" } else { "80" };
        let listen = format!("{}:{}", deployment.bind_ip, port);
        self.build_main_server(conf.server(&listen, &self.domains))?;

        let plain_listen = format!("{}:80", deployment.bind_ip);
        if deployment.ssl {
            conf.server(&plain_listen, &self.domains)
                .set(&["rewrite", "^(.*)", "https://$host$1", "permanent"])?;
        }

        for redirect in &deployment.domains_redirect {
            let destination = format!("http://{}$1", redirect.destination_domain);
            let domain = [redirect.domain.as_str()];

            let server = conf.server(&plain_listen, &domain);
            server.set(&["rewrite", "^(.*)", &destination, "permanent"])?;
            self.set_logs(server)?;

            if let Some(certificate) = self.certificate {
                let server = conf.server(&format!("{}:443", deployment.bind_ip), &domain);
                set_certificate(server, certificate)?;
                server.set(&["rewrite", "^(.*)", &destination, "permanent"])?;
                self.set_logs(server)?;
            }
        }

        Ok(())
    }

    fn build_main_server(&self, server: &mut Section) -> DslResult<()> {
        let deployment = &self.site.deployment;

        if let Some(certificate) = self.certificate {
            set_certificate(server, certificate)?;
        }
        self.set_logs(server)?;

        let root = server.section("location", "/", &[])?;
        self.set_proxy_pass(root)?;
        for (key, value) in &self.site.nginx {
            root.set(&[key.as_str(), value.as_str()])?;
        }

        for endpoint in &deployment.big_body_endpoints {
            let location = server.section("location", &endpoint.location, &[])?;
            self.set_proxy_pass(location)?;
            location.set(&["client_max_body_size", &endpoint.max_body_size])?;
        }

        for (url, relpath) in &self.site.static_files {
            let location = server.section("location", url, &[])?;
            location.set(&["access_log", "off"])?;
            location.set(&["alias", &format!("{}{}", deployment.path, relpath)])?;
        }

        for (url, relpath) in &self.site.sendfile {
            let location = server.section("location", url, &[])?;
            location.set(&["internal"])?;
            location.set(&["alias", &format!("{}{}", deployment.path, relpath)])?;
        }

        for redirect in &deployment.url_redirect {
            server.set(&["rewrite", &redirect.source, &redirect.destination, &redirect.options])?;
        }

        if let Some(file) = self.basic_auth_file {
            server.set(&["auth_basic", "\"Restricted\""])?;
            server.set(&["auth_basic_user_file", file])?;
        }

        for page in &deployment.static_error_pages {
            let location_name = format!("/{}", page.filename);
            let codes: Vec<String> = page.codes.iter().map(u16::to_string).collect();

            let mut args = vec!["error_page"];
            args.extend(codes.iter().map(String::as_str));
            args.push(&location_name);
            server.set(&args)?;

            let location = server.section("location", "=", &[&location_name])?;
            location.set(&["root", &page.root])?;
            location.set(&["allow", "all"])?;
        }

        Ok(())
    }

    fn set_logs(&self, server: &mut Section) -> DslResult<()> {
        server.set(&["access_log", &self.access_log])?;
        server.set(&["error_log", &self.error_log])?;
        Ok(())
    }

    fn set_proxy_pass(&self, location: &mut Section) -> DslResult<()> {
        let (protocol, ssl) = if self.certificate.is_some() {
            ("https", "on")
        } else {
            ("http", "off")
        };

        location.set(&["proxy_pass", &format!("http://{}", self.upstream)])?;
        location.set(&["proxy_redirect", "off"])?;
        location.set(&["proxy_set_header", "Host", "$host"])?;
        location.set(&["proxy_set_header", "X-Real-IP", "$remote_addr"])?;
        location.set(&["proxy_set_header", "X-Forwarded-For", "$proxy_add_x_forwarded_for"])?;
        location.set(&["proxy_set_header", "X-Forwarded-Protocol", protocol])?;
        location.set(&["proxy_set_header", "X-Forwarded-SSL", ssl])?;
        location.set(&["client_body_buffer_size", "128k"])?;
        location.set(&["proxy_connect_timeout", "90"])?;
        location.set(&["proxy_send_timeout", "90"])?;
        location.set(&["proxy_read_timeout", "90"])?;
        location.set(&["proxy_buffer_size", "4k"])?;
        location.set(&["proxy_buffers", "4", "32k"])?;
        location.set(&["proxy_busy_buffers_size", "64k"])?;
        location.set(&["proxy_temp_file_write_size", "64k"])?;
        Ok(())
    }
}

fn set_certificate(server: &mut Section, (cert, key): (&str, &str)) -> DslResult<()> {
    server.set(&["ssl", "on"])?;
    server.set(&["ssl_certificate", cert])?;
    server.set(&["ssl_certificate_key", key])?;
    Ok(())
}
