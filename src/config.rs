use crate::service::audit_logger::AuditSettings;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    Sandbox,
    Live,
}

impl GatewayMode {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("live") {
            GatewayMode::Live
        } else {
            GatewayMode::Sandbox
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GatewayMode::Sandbox => "sandbox",
            GatewayMode::Live => "live",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub secret_key: String,
    pub publishable_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub base_url: Option<String>,
    pub currency: String,
    pub mode: GatewayMode,
    pub payment_methods: Vec<String>,
    pub timeout_ms: u64,
    pub webhook_tolerance_secs: i64,
    pub mock_behavior: Option<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            publishable_key: None,
            webhook_secret: None,
            base_url: None,
            currency: "usd".to_string(),
            mode: GatewayMode::Sandbox,
            payment_methods: vec!["card".to_string()],
            timeout_ms: 10_000,
            webhook_tolerance_secs: 300,
            mock_behavior: None,
        }
    }
}

impl GatewaySettings {
    /// Reads `PAYMENT_<ID>_*` variables for one registered gateway.
    pub fn from_env(gateway_id: &str) -> Self {
        let prefix = format!("PAYMENT_{}_", gateway_id.to_ascii_uppercase().replace('-', "_"));
        let var = |name: &str| std::env::var(format!("{prefix}{name}")).ok().filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            secret_key: var("SECRET_KEY").unwrap_or_default(),
            publishable_key: var("PUBLISHABLE_KEY"),
            webhook_secret: var("WEBHOOK_SECRET"),
            base_url: var("BASE_URL"),
            currency: var("CURRENCY").unwrap_or(defaults.currency),
            mode: var("MODE").map(|m| GatewayMode::parse(&m)).unwrap_or(defaults.mode),
            payment_methods: var("PAYMENT_METHODS")
                .map(|m| split_list(&m))
                .unwrap_or(defaults.payment_methods),
            timeout_ms: var("TIMEOUT_MS")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(defaults.timeout_ms),
            webhook_tolerance_secs: var("WEBHOOK_TOLERANCE_SECS")
                .and_then(|s| s.parse::<i64>().ok())
                .unwrap_or(defaults.webhook_tolerance_secs),
            mock_behavior: var("MOCK_BEHAVIOR"),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One registry binding: identifier, which adapter builds it, and its settings.
#[derive(Debug, Clone)]
pub struct GatewayEntry {
    pub id: String,
    pub driver: String,
    pub settings: GatewaySettings,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub default_gateway: String,
    pub gateways: Vec<GatewayEntry>,
    pub audit: AuditSettings,
}

impl PaymentConfig {
    pub fn from_env() -> Self {
        let mapping = std::env::var("PAYMENT_GATEWAYS")
            .unwrap_or_else(|_| "stripe=stripe,razorpay=razorpay".to_string());
        let gateways = parse_gateway_mapping(&mapping)
            .into_iter()
            .map(|(id, driver)| GatewayEntry {
                settings: GatewaySettings::from_env(&id),
                id,
                driver,
            })
            .collect();

        Self {
            default_gateway: std::env::var("PAYMENT_GATEWAY").unwrap_or_else(|_| "stripe".to_string()),
            gateways,
            audit: AuditSettings {
                enabled: std::env::var("PAYMENT_LOGGING")
                    .map(|v| parse_bool(&v))
                    .unwrap_or(true),
                channel: std::env::var("PAYMENT_LOG_CHANNEL").unwrap_or_else(|_| "payments".to_string()),
                write_timeout: Duration::from_millis(
                    std::env::var("PAYMENT_AUDIT_TIMEOUT_MS")
                        .ok()
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(2000),
                ),
            },
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub payment: PaymentConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            payment: PaymentConfig::from_env(),
        }
    }
}

/// `id=driver` pairs; a bare `id` uses itself as the driver name.
pub fn parse_gateway_mapping(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((id, driver)) => (id.trim().to_string(), driver.trim().to_string()),
            None => (pair.to_string(), pair.to_string()),
        })
        .collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> bool {
    !matches!(raw.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}
