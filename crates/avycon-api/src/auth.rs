// Digest access authentication (RFC 2617 / RFC 2069)
//
// The DVR's login endpoint only accepts Digest auth, which reqwest does not
// speak. This module parses the `WWW-Authenticate` challenge and computes the
// `Authorization` header by hand. Everything here is pure; the nonce count
// lives in the client's session snapshot.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Placeholder Basic credentials (base64 of `:`). The DVR expects this
/// header on every call, alongside the session cookie.
pub const PLACEHOLDER_BASIC: &str = "Basic Og==";

/// Number of random bytes in a client nonce before encoding.
const CNONCE_BYTES: usize = 32;

// ── Credentials ──────────────────────────────────────────────────────

/// Username and password for the DVR's web login.
///
/// The password is a [`SecretString`], so `Debug` output redacts it.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

// ── Challenge ────────────────────────────────────────────────────────

/// Quality-of-protection directive selected from a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qop {
    Auth,
    AuthInt,
    /// Anything else the server sent. Passed through untouched so the
    /// server can reject it.
    Other(String),
}

impl Qop {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Auth => "auth",
            Self::AuthInt => "auth-int",
            Self::Other(raw) => raw,
        }
    }

    /// Pick a directive from the challenge's `qop` value, which may be a
    /// comma-separated list. `auth` wins over `auth-int`.
    fn select(raw: &str) -> Self {
        let options: Vec<&str> = raw.split(',').map(str::trim).collect();
        if options.contains(&"auth") {
            Self::Auth
        } else if options.contains(&"auth-int") {
            Self::AuthInt
        } else {
            Self::Other(raw.to_owned())
        }
    }
}

impl fmt::Display for Qop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
///
/// `realm` and `nonce` are always present; parsing fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Option<Qop>,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
}

impl Challenge {
    /// Parse a `WWW-Authenticate` header value.
    pub fn parse(header: &str) -> Result<Self, Error> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(char::is_whitespace).unwrap_or((header, ""));
        if !scheme.eq_ignore_ascii_case("digest") {
            return Err(Error::protocol(format!(
                "expected a Digest challenge, got scheme {scheme:?}"
            )));
        }

        let mut params = parse_auth_params(rest)?;
        let realm = params
            .remove("realm")
            .ok_or_else(|| Error::protocol("Digest challenge is missing realm"))?;
        let nonce = params
            .remove("nonce")
            .ok_or_else(|| Error::protocol("Digest challenge is missing nonce"))?;

        Ok(Self {
            realm,
            nonce,
            qop: params.remove("qop").map(|raw| Qop::select(&raw)),
            opaque: params.remove("opaque"),
            algorithm: params.remove("algorithm"),
        })
    }
}

impl FromStr for Challenge {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split `key=value, key="quoted, value"` pairs. Keys are lowercased.
fn parse_auth_params(input: &str) -> Result<HashMap<String, String>, Error> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && *c != ',') {
            key.push(c);
        }
        let key = key.trim().to_ascii_lowercase();
        if chars.next_if_eq(&'=').is_none() {
            return Err(Error::protocol(format!(
                "malformed Digest challenge parameter {key:?}"
            )));
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err(Error::protocol(format!(
                    "unterminated quoted value for {key:?}"
                )));
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                value.push(c);
            }
            value = value.trim().to_owned();
        }

        params.insert(key, value);
    }

    Ok(params)
}

// ── Handshake ────────────────────────────────────────────────────────

/// Inputs for one Digest response computation.
///
/// `entity_body` is the body of the unauthenticated priming response; it is
/// only hashed when the challenge selected `auth-int`.
#[derive(Debug, Clone, Copy)]
pub struct DigestHandshake<'a> {
    pub method: &'a str,
    pub uri: &'a str,
    pub challenge: &'a Challenge,
    pub credentials: &'a Credentials,
    pub cnonce: &'a str,
    pub nonce_count: u32,
    pub entity_body: &'a [u8],
}

impl DigestHandshake<'_> {
    /// `MD5(username:realm:password)`
    fn ha1(&self) -> String {
        hex_md5(&[
            self.credentials.username().as_bytes(),
            self.challenge.realm.as_bytes(),
            self.credentials.password().expose_secret().as_bytes(),
        ])
    }

    /// `MD5(method:uri)`, or `MD5(method:uri:MD5(body))` for `auth-int`.
    fn ha2(&self) -> String {
        if self.challenge.qop == Some(Qop::AuthInt) {
            let body_hash = hex_md5(&[self.entity_body]);
            hex_md5(&[
                self.method.as_bytes(),
                self.uri.as_bytes(),
                body_hash.as_bytes(),
            ])
        } else {
            hex_md5(&[self.method.as_bytes(), self.uri.as_bytes()])
        }
    }

    /// The `response` digest value.
    pub fn response(&self) -> String {
        let ha1 = self.ha1();
        let ha2 = self.ha2();
        let nonce = self.challenge.nonce.as_bytes();

        match &self.challenge.qop {
            Some(qop @ (Qop::Auth | Qop::AuthInt)) => {
                let nc = self.nonce_count.to_string();
                hex_md5(&[
                    ha1.as_bytes(),
                    nonce,
                    nc.as_bytes(),
                    self.cnonce.as_bytes(),
                    qop.as_str().as_bytes(),
                    ha2.as_bytes(),
                ])
            }
            _ => hex_md5(&[ha1.as_bytes(), nonce, ha2.as_bytes()]),
        }
    }

    /// The complete `Authorization` header value.
    pub fn authorization(&self) -> String {
        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", response="{}""#,
            self.credentials.username(),
            self.challenge.realm,
            self.challenge.nonce,
            self.uri,
            self.response(),
        );
        if let Some(qop) = &self.challenge.qop {
            header.push_str(&format!(
                r#", qop={qop}, nc={}, cnonce="{}""#,
                self.nonce_count, self.cnonce
            ));
        }
        header
    }
}

/// A fresh client nonce: 32 bytes from the thread CSPRNG, base64url encoded.
pub fn generate_cnonce() -> String {
    let mut bytes = [0u8; CNONCE_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lowercase hex MD5 of the parts joined with `:`.
fn hex_md5(parts: &[&[u8]]) -> String {
    let mut ctx = md5::Context::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            ctx.consume(b":");
        }
        ctx.consume(part);
    }
    format!("{:x}", ctx.compute())
}
