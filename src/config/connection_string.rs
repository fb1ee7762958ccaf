//! Connection string parsing
//!
//! Supports `postgres://[user[:password]@][host][:port][/database][?params]`
//! with the `sslmode`, `sslrootcert` and `application_name` parameters.

use super::{ConnectionConfig, Secret};
use crate::connection::{SslMode, TlsOptions};
use crate::{Error, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Extract a query parameter value from a query string
fn parse_query_param(query_string: &str, param: &str) -> Option<String> {
    if query_string.is_empty() {
        return None;
    }

    let query = query_string.trim_start_matches('?');

    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == param {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Characters escaped when rendering user and database names
const COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'/')
    .add(b':')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b']');

/// Percent-decode one URL component
fn decode(component: &str, what: &str) -> Result<String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| Error::Config(format!("{} is not valid UTF-8 after percent-decoding", what)))
}

/// Split `host[:port]` or `[v6addr][:port]`. IPv6 hosts are returned without brackets.
fn split_host_port(host_port: &str) -> Result<(String, Option<u16>)> {
    let parse_port = |port: &str| {
        port.parse::<u16>()
            .map_err(|_| Error::Config(format!("invalid port '{}'", port)))
    };

    if let Some(bracketed) = host_port.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| Error::Config("unterminated IPv6 address".into()))?;
        let port = match after {
            "" => None,
            after => {
                let port = after.strip_prefix(':').ok_or_else(|| {
                    Error::Config(format!("unexpected '{}' after IPv6 address", after))
                })?;
                Some(parse_port(port)?)
            }
        };
        return Ok((host.to_string(), port));
    }

    match host_port.rsplit_once(':') {
        Some((host, port)) => Ok((host.to_string(), Some(parse_port(port)?))),
        None => Ok((host_port.to_string(), None)),
    }
}

impl ConnectionConfig {
    /// Parse a `postgres://` connection string.
    ///
    /// User, password and database may be percent-encoded. IPv6 hosts are
    /// written in brackets (`postgres://[::1]:5432/db`). Without `sslmode`
    /// the default (`verify-full`) applies. Unix socket URLs
    /// (`postgres:///db`) are not supported.
    pub fn from_url(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix("postgres://")
            .or_else(|| s.strip_prefix("postgresql://"))
            .ok_or_else(|| {
                Error::Config("connection string must start with postgres://".into())
            })?;

        if rest.starts_with('/') {
            return Err(Error::Config(
                "Unix socket connection strings are not supported".into(),
            ));
        }

        // Format: [user[:password]@]host[:port][/database][?params]
        let (rest, query_string) = match rest.find('?') {
            Some(q_pos) => rest.split_at(q_pos),
            None => (rest, ""),
        };

        let (authority, database) = match rest.split_once('/') {
            Some((authority, db)) => (authority, decode(db, "database")?),
            None => (rest, String::new()),
        };

        // '@' is only a separator inside the authority
        let (auth, host_port) = match authority.rfind('@') {
            Some(pos) => (Some(&authority[..pos]), &authority[pos + 1..]),
            None => (None, authority),
        };

        let (user, password) = match auth {
            Some(auth) => match auth.split_once(':') {
                Some((user, pass)) => (
                    decode(user, "user")?,
                    Secret::new(decode(pass, "password")?),
                ),
                None => (decode(auth, "user")?, Secret::default()),
            },
            None => (String::new(), Secret::default()),
        };

        let (host, port) = split_host_port(host_port)?;

        let mut tls = match parse_query_param(query_string, "sslmode") {
            Some(mode_str) => TlsOptions::new(mode_str.parse::<SslMode>()?),
            None => TlsOptions::default(),
        };
        if let Some(ca_path) = parse_query_param(query_string, "sslrootcert") {
            tls = tls.with_ca_cert_path(decode(&ca_path, "sslrootcert")?);
        }

        let mut builder = ConnectionConfig::builder(database, user)
            .password(password)
            .host(host)
            .tls(tls);
        if let Some(port) = port {
            builder = builder.port(port);
        }
        if let Some(name) = parse_query_param(query_string, "application_name") {
            builder = builder.application_name(decode(&name, "application_name")?);
        }

        Ok(builder.build())
    }

    /// Render as a connection string with the password masked, for logs.
    pub fn redacted_url(&self) -> String {
        let mut url = String::from("postgres://");

        if !self.user.is_empty() {
            url.extend(utf8_percent_encode(&self.user, COMPONENT));
            if !self.password.is_empty() {
                url.push_str(":***");
            }
            url.push('@');
        }

        if self.host.contains(':') {
            url.push('[');
            url.push_str(&self.host);
            url.push(']');
        } else {
            url.push_str(&self.host);
        }
        if let Some(port) = self.port {
            url.push_str(&format!(":{}", port));
        }
        if !self.database.is_empty() {
            url.push('/');
            url.extend(utf8_percent_encode(&self.database, COMPONENT));
        }
        url.push_str(&format!("?sslmode={}", self.tls.mode));

        url
    }
}
