//! Names published by the SNMP switch integration and Home Assistant.

/// Domain of controllable port entities.
pub const SWITCH_DOMAIN: &str = "switch";

/// Registry `platform` tag of entities created by the integration.
pub const INTEGRATION_PLATFORM: &str = "snmp_switch_manager";

/// Service that writes a port description (`ifAlias`).
pub const SET_DESCRIPTION_SERVICE: &str = "set_port_description";

/// Interface name of the management pseudo-port, never a real port.
pub const CPU_SENTINEL: &str = "cpu";
