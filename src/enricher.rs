use crate::anonymize::{is_anonymous_user, obfuscate_value};
use crate::context::ContextProvider;
use crate::processor::Processor;
use crate::record::LogRecord;
use serde_json::Value;

/// Anonymization switches of a [`ContextEnricher`], fixed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnricherConfig {
    /// Hash `userid`/`username` of authenticated users.
    pub pseudonymize: bool,
    /// Hash the client IP.
    pub obfuscate: bool,
}

impl EnricherConfig {
    /// Read the switches from `LOG_ENRICH_PSEUDONYMIZE` / `LOG_ENRICH_OBFUSCATE`.
    pub fn from_env() -> Self {
        EnricherConfig {
            pseudonymize: crate::env::env_flag(crate::env::LOG_ENRICH_PSEUDONYMIZE_ENV),
            obfuscate: crate::env::env_flag(crate::env::LOG_ENRICH_OBFUSCATE_ENV),
        }
    }
}

/// Attaches site, user and client address to `extra`, then applies the
/// configured anonymization.
///
/// Keys written: `siteid`, `sitename`, `userid`, `username` always, `ip`
/// only when the context resolves an address. A `userid` of `0` means no
/// authenticated user and is never hashed; `username` is hashed under the
/// same guard.
#[derive(Debug, Clone, Default)]
pub struct ContextEnricher {
    config: EnricherConfig,
}

impl ContextEnricher {
    pub fn new(config: EnricherConfig) -> Self {
        tracing::debug!(
            pseudonymize = config.pseudonymize,
            obfuscate = config.obfuscate,
            "context enricher configured"
        );
        Self { config }
    }

    pub fn config(&self) -> EnricherConfig {
        self.config
    }

    pub fn enrich(&self, record: &mut LogRecord, ctx: &dyn ContextProvider) {
        let extra = &mut record.extra;
        extra.insert("siteid".to_string(), Value::from(ctx.site_id().unwrap_or(0)));
        extra.insert("sitename".to_string(), Value::String(ctx.site_name().unwrap_or_default()));
        extra.insert("userid".to_string(), Value::from(ctx.user_id().unwrap_or(0)));
        extra.insert("username".to_string(), Value::String(ctx.user_name().unwrap_or_default()));
        if let Some(ip) = ctx.remote_addr().filter(|ip| !ip.is_empty()) {
            extra.insert("ip".to_string(), Value::String(ip));
        }

        if self.config.obfuscate {
            if let Some(ip) = extra.get_mut("ip") {
                *ip = obfuscate_value(ip);
            }
        }

        if self.config.pseudonymize {
            let authenticated = extra.get("userid").map(|id| !is_anonymous_user(id));
            if authenticated == Some(true) {
                if let Some(id) = extra.get_mut("userid") {
                    *id = obfuscate_value(id);
                }
                if let Some(name) = extra.get_mut("username") {
                    *name = obfuscate_value(name);
                }
            }
        }
    }
}

impl Processor for ContextEnricher {
    fn name(&self) -> &'static str {
        "context"
    }

    fn process(&self, record: &mut LogRecord, ctx: &dyn ContextProvider) {
        self.enrich(record, ctx);
    }
}
