//! Service advertisement of the driver.
//!
//! The remote finds integration drivers with mDNS. The API computes the
//! advertisement once at startup and hands it to a [`ServicePublisher`];
//! the mDNS backend itself is supplied by the driver.

use crate::config::DriverMetadata;
use crate::error::Result;
use std::collections::BTreeMap;

/// mDNS service type of integration drivers
pub const SERVICE_TYPE: &str = "_uc-integration._tcp.local.";

/// Service record to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAdvertisement {
    pub service_type: String,
    /// `<driver_id>._uc-integration._tcp.local.`
    pub instance_name: String,
    /// Address to announce; `None` lets the publisher pick the host address
    pub address: Option<String>,
    pub port: u16,
    /// TXT properties `name`, `ver` and `developer`
    pub properties: BTreeMap<String, String>,
}

impl ServiceAdvertisement {
    pub fn new(metadata: &DriverMetadata, address: Option<String>, port: u16) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("name".to_string(), metadata.display_name());
        properties.insert("ver".to_string(), metadata.version.clone());
        properties.insert("developer".to_string(), metadata.developer.name.clone());
        Self {
            service_type: SERVICE_TYPE.to_string(),
            instance_name: format!("{}.{}", metadata.driver_id, SERVICE_TYPE),
            address,
            port,
            properties,
        }
    }
}

/// Publishes the driver service, e.g. through an mDNS responder
pub trait ServicePublisher: Send + Sync {
    fn publish(&self, advertisement: &ServiceAdvertisement) -> Result<()>;
}

impl<F> ServicePublisher for F
where
    F: Fn(&ServiceAdvertisement) -> Result<()> + Send + Sync,
{
    fn publish(&self, advertisement: &ServiceAdvertisement) -> Result<()> {
        self(advertisement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn advertisement_from_metadata() {
        let metadata: DriverMetadata = serde_json::from_value(json!({
            "driver_id": "hello",
            "name": {"en": "Hello integration"},
            "version": "0.2.0",
            "developer": {"name": "Jane"}
        }))
        .unwrap();

        let ad = ServiceAdvertisement::new(&metadata, None, 9090);
        assert_eq!(ad.instance_name, "hello._uc-integration._tcp.local.");
        assert_eq!(ad.properties["name"], "Hello integration");
        assert_eq!(ad.properties["ver"], "0.2.0");
        assert_eq!(ad.properties["developer"], "Jane");
    }
}
