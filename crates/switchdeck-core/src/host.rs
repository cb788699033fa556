// ── Host contract ──
//
// What the card engine needs from its host: two registry queries for
// discovery and one service-invocation entry point for actions. The
// `Controller` implements both over Home Assistant; tests use fakes.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::error::CoreError;
use crate::model::{DeviceEntry, EntityEntry};

/// Read access to the device and entity registries.
pub trait DeviceDirectory: Send + Sync {
    fn list_devices(&self) -> impl Future<Output = Result<Vec<DeviceEntry>, CoreError>> + Send;

    fn list_entities(&self) -> impl Future<Output = Result<Vec<EntityEntry>, CoreError>> + Send;
}

/// Invoke a host service, e.g. `switch.turn_on`.
pub trait ServiceCaller: Send + Sync {
    fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl<T: DeviceDirectory> DeviceDirectory for Arc<T> {
    fn list_devices(&self) -> impl Future<Output = Result<Vec<DeviceEntry>, CoreError>> + Send {
        (**self).list_devices()
    }

    fn list_entities(&self) -> impl Future<Output = Result<Vec<EntityEntry>, CoreError>> + Send {
        (**self).list_entities()
    }
}

impl<T: ServiceCaller> ServiceCaller for Arc<T> {
    fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
    ) -> impl Future<Output = Result<(), CoreError>> + Send {
        (**self).call_service(domain, service, data)
    }
}
