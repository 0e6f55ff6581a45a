use crate::config::{GatewayEntry, GatewayMode, PaymentConfig};
use crate::gateways::mock::MockGateway;
use crate::gateways::razorpay::RazorpayGateway;
use crate::gateways::stripe::StripeGateway;
use crate::gateways::PaymentGateway;
use crate::service::audit_logger::AuditLogger;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Payment gateway [{0}] is not supported.")]
    UnsupportedGateway(String),
    #[error("gateway [{id}] uses unknown driver `{driver}`")]
    UnknownDriver { id: String, driver: String },
    #[error("default gateway [{0}] is not registered")]
    DefaultNotRegistered(String),
    #[error("gateway [{0}] is registered more than once")]
    Duplicate(String),
    #[error("gateway [{id}] is missing required setting `{setting}`")]
    MissingSetting { id: String, setting: &'static str },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Shared collaborators handed to every adapter constructor.
#[derive(Clone)]
pub struct GatewayDeps {
    pub client: reqwest::Client,
    pub audit: Arc<AuditLogger>,
}

pub type GatewayFactory = fn(&GatewayEntry, &GatewayDeps) -> Result<Arc<dyn PaymentGateway>, RegistryError>;

pub fn factory_for(driver: &str) -> Option<GatewayFactory> {
    match driver {
        "stripe" => Some(build_stripe),
        "razorpay" => Some(build_razorpay),
        "mock" => Some(build_mock),
        _ => None,
    }
}

fn require_webhook_secret(entry: &GatewayEntry) -> Result<(), RegistryError> {
    if entry.settings.webhook_secret.as_deref().unwrap_or("").is_empty() {
        return Err(RegistryError::MissingSetting {
            id: entry.id.clone(),
            setting: "webhook_secret",
        });
    }
    Ok(())
}

fn require_live_credentials(entry: &GatewayEntry) -> Result<(), RegistryError> {
    if entry.settings.secret_key.is_empty() {
        if entry.settings.mode == GatewayMode::Live {
            return Err(RegistryError::MissingSetting {
                id: entry.id.clone(),
                setting: "secret_key",
            });
        }
        tracing::warn!(gateway = %entry.id, "no secret key configured; remote calls will be rejected");
    }
    Ok(())
}

fn build_stripe(entry: &GatewayEntry, deps: &GatewayDeps) -> Result<Arc<dyn PaymentGateway>, RegistryError> {
    require_webhook_secret(entry)?;
    require_live_credentials(entry)?;
    Ok(Arc::new(StripeGateway::new(
        &entry.id,
        &entry.settings,
        deps.client.clone(),
        deps.audit.clone(),
    )))
}

fn build_razorpay(entry: &GatewayEntry, deps: &GatewayDeps) -> Result<Arc<dyn PaymentGateway>, RegistryError> {
    require_webhook_secret(entry)?;
    require_live_credentials(entry)?;
    if entry.settings.mode == GatewayMode::Live && entry.settings.publishable_key.is_none() {
        return Err(RegistryError::MissingSetting {
            id: entry.id.clone(),
            setting: "publishable_key",
        });
    }
    Ok(Arc::new(RazorpayGateway::new(
        &entry.id,
        &entry.settings,
        deps.client.clone(),
        deps.audit.clone(),
    )))
}

fn build_mock(entry: &GatewayEntry, deps: &GatewayDeps) -> Result<Arc<dyn PaymentGateway>, RegistryError> {
    require_webhook_secret(entry)?;
    Ok(Arc::new(MockGateway::new(&entry.id, &entry.settings, deps.audit.clone())))
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayInfo {
    pub gateway_id: String,
    pub driver: String,
    pub mode: String,
    pub payment_methods: Vec<String>,
    pub is_default: bool,
}

/// Identifier -> adapter bindings, fixed after construction.
pub struct GatewayRegistry {
    default_gateway: String,
    gateways: BTreeMap<String, Arc<dyn PaymentGateway>>,
    info: Vec<GatewayInfo>,
}

impl GatewayRegistry {
    /// Builds every configured adapter up front so a bad mapping fails at startup.
    pub fn from_config(cfg: &PaymentConfig, deps: &GatewayDeps) -> Result<Self, RegistryError> {
        let mut bindings = Vec::with_capacity(cfg.gateways.len());
        let mut info = Vec::with_capacity(cfg.gateways.len());
        for entry in &cfg.gateways {
            let factory = factory_for(&entry.driver).ok_or_else(|| RegistryError::UnknownDriver {
                id: entry.id.clone(),
                driver: entry.driver.clone(),
            })?;
            bindings.push((entry.id.clone(), factory(entry, deps)?));
            info.push(GatewayInfo {
                gateway_id: entry.id.clone(),
                driver: entry.driver.clone(),
                mode: entry.settings.mode.as_str().to_string(),
                payment_methods: entry.settings.payment_methods.clone(),
                is_default: entry.id == cfg.default_gateway,
            });
        }

        Self::assemble(&cfg.default_gateway, bindings, info)
    }

    fn assemble(
        default_gateway: &str,
        bindings: Vec<(String, Arc<dyn PaymentGateway>)>,
        info: Vec<GatewayInfo>,
    ) -> Result<Self, RegistryError> {
        let mut gateways = BTreeMap::new();
        for (id, gateway) in bindings {
            if gateways.insert(id.clone(), gateway).is_some() {
                return Err(RegistryError::Duplicate(id));
            }
        }
        if !gateways.contains_key(default_gateway) {
            return Err(RegistryError::DefaultNotRegistered(default_gateway.to_string()));
        }

        Ok(Self {
            default_gateway: default_gateway.to_string(),
            gateways,
            info,
        })
    }

    pub fn gateway(&self, name: Option<&str>) -> Result<Arc<dyn PaymentGateway>, RegistryError> {
        let name = name.unwrap_or(&self.default_gateway);
        self.gateways
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnsupportedGateway(name.to_string()))
    }

    pub fn available_gateways(&self) -> Vec<String> {
        self.gateways.keys().cloned().collect()
    }

    pub fn has_gateway(&self, name: &str) -> bool {
        self.gateways.contains_key(name)
    }

    pub fn default_gateway(&self) -> &str {
        &self.default_gateway
    }

    pub fn info(&self) -> &[GatewayInfo] {
        &self.info
    }
}
