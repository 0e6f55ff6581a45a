use crate::gateways::registry::{GatewayInfo, GatewayRegistry, RegistryError};
use crate::gateways::PaymentGateway;
use std::sync::Arc;

/// Single entry point for callers. Cloning shares the same immutable registry.
#[derive(Clone)]
pub struct PaymentService {
    registry: Arc<GatewayRegistry>,
}

impl PaymentService {
    pub fn new(registry: Arc<GatewayRegistry>) -> Self {
        Self { registry }
    }

    /// Resolves `name`, or the configured default when `None`. Unknown names
    /// fail before any adapter is touched.
    pub fn gateway(&self, name: Option<&str>) -> Result<Arc<dyn PaymentGateway>, RegistryError> {
        self.registry.gateway(name)
    }

    pub fn available_gateways(&self) -> Vec<String> {
        self.registry.available_gateways()
    }

    pub fn has_gateway(&self, name: &str) -> bool {
        self.registry.has_gateway(name)
    }

    pub fn default_gateway(&self) -> &str {
        self.registry.default_gateway()
    }

    pub fn gateways_info(&self) -> &[GatewayInfo] {
        self.registry.info()
    }
}
