use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use jiff::Timestamp;
use mini_moka::sync::Cache;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use gatehouse_config::{ApiKeyConfig, AuthConfig};

use crate::AuthError;

/// Capability scope that grants access to every registered server
const WILDCARD_SCOPE: &str = "mcp:*";

/// Per-key call counters, bumped on every successful authentication
///
/// Best-effort: relaxed ordering is fine, nothing reads these for
/// control flow.
#[derive(Debug, Default)]
struct KeyUsage {
    requests: AtomicU64,
    last_used_unix: AtomicI64,
}

/// An authenticated caller
///
/// Cheap to clone via `Arc`; handed through the request pipeline so
/// downstream layers never see the raw token.
#[derive(Debug)]
pub struct KeyContext {
    pub id: i64,
    pub name: String,
    pub member_id: i64,
    /// Privilege level fed to the rule engine; lower is more
    /// privileged
    pub member_level: i64,
    pub scopes: Vec<String>,
    allowed_servers: Vec<String>,
    usage: Arc<KeyUsage>,
}

impl KeyContext {
    /// Whether this key may call the given server
    ///
    /// An empty allowlist means unrestricted; the wildcard scope
    /// overrides any allowlist.
    pub fn can_access_server(&self, slug: &str) -> bool {
        self.allowed_servers.is_empty()
            || self.allowed_servers.iter().any(|s| s == slug)
            || self.scopes.iter().any(|s| s == WILDCARD_SCOPE)
    }

    pub fn request_count(&self) -> u64 {
        self.usage.requests.load(Ordering::Relaxed)
    }

    pub fn last_used(&self) -> Option<Timestamp> {
        match self.usage.last_used_unix.load(Ordering::Relaxed) {
            0 => None,
            secs => Timestamp::from_second(secs).ok(),
        }
    }

    fn touch(&self) {
        self.usage.requests.fetch_add(1, Ordering::Relaxed);
        self.usage
            .last_used_unix
            .store(Timestamp::now().as_second(), Ordering::Relaxed);
    }
}

struct KeyEntry {
    config: ApiKeyConfig,
    usage: Arc<KeyUsage>,
}

/// The configured API key roster
///
/// Tokens are stored and looked up by SHA-256 digest, so the raw
/// secret never sits in a map key. Accepted verdicts are cached for a
/// short TTL; a key revoked mid-window stays valid until the cached
/// verdict ages out.
pub struct Keyring {
    keys: HashMap<String, KeyEntry>,
    verdicts: Cache<String, Arc<KeyContext>>,
}

impl Keyring {
    pub fn new(config: &AuthConfig) -> Self {
        let keys = config
            .keys
            .iter()
            .map(|k| {
                let digest = sha256_hex(k.token.expose_secret());
                let entry = KeyEntry {
                    config: k.clone(),
                    usage: Arc::new(KeyUsage::default()),
                };
                (digest, entry)
            })
            .collect();

        let verdicts = Cache::builder()
            .time_to_live(Duration::from_secs(config.cache_ttl))
            .max_capacity(10_000)
            .build();

        Self { keys, verdicts }
    }

    /// Authenticate a raw credential from either accepted header
    ///
    /// A `Bearer ` prefix is stripped if present; the remainder is the
    /// token. Bumps the key's usage counters on success.
    pub fn authenticate(&self, raw: &str) -> Result<Arc<KeyContext>, AuthError> {
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let digest = sha256_hex(token);

        if let Some(ctx) = self.verdicts.get(&digest) {
            ctx.touch();
            return Ok(ctx);
        }

        let entry = self.keys.get(&digest).ok_or(AuthError::UnknownToken)?;
        if !entry.config.is_active {
            return Err(AuthError::InactiveKey);
        }
        if let Some(expires_at) = entry.config.expires_at
            && expires_at <= Timestamp::now()
        {
            return Err(AuthError::ExpiredKey);
        }

        let ctx = Arc::new(KeyContext {
            id: entry.config.id,
            name: entry.config.name.clone(),
            member_id: entry.config.member_id,
            member_level: entry.config.member_level,
            scopes: entry.config.scopes.clone(),
            allowed_servers: entry.config.allowed_servers.clone(),
            usage: Arc::clone(&entry.usage),
        });
        ctx.touch();
        self.verdicts.insert(digest, Arc::clone(&ctx));

        Ok(ctx)
    }
}

/// SHA-256 hex digest of a token
fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        // Writing hex to a String is infallible
        write!(hex, "{byte:02x}").unwrap();
    }
    hex
}
