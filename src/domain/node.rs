//! Node attribute types returned by node queries.

use serde::Serialize;

/// Address of a node within an application network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeRef {
    /// Owning network.
    pub network_id: super::NetworkId,
    /// Node id within that network.
    pub node_id: u8,
}

/// Z-Wave basic device class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeBasicType {
    /// Not reported, or the network is unknown.
    #[default]
    Unknown,
    /// Portable controller.
    Controller,
    /// Static (mains powered) controller.
    StaticController,
    /// Slave without routing.
    Slave,
    /// Routing slave.
    RoutingSlave,
}

impl From<u8> for NodeBasicType {
    fn from(raw: u8) -> Self {
        match raw {
            0x01 => Self::Controller,
            0x02 => Self::StaticController,
            0x03 => Self::Slave,
            0x04 => Self::RoutingSlave,
            _ => Self::Unknown,
        }
    }
}

/// Z-Wave Plus role type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Central static controller.
    CentralController,
    /// Sub static controller.
    SubController,
    /// Portable controller.
    PortableController,
    /// Portable reporting controller.
    PortableReportingController,
    /// Portable slave.
    PortableSlave,
    /// Always-on slave.
    AlwaysOnSlave,
    /// Sleeping slave that reports on wake-up.
    ReportingSleepingSlave,
    /// Sleeping slave that listens periodically.
    ListeningSleepingSlave,
    /// Not reported, or the network is unknown.
    #[default]
    Unknown,
}

impl From<u8> for NodeRole {
    fn from(raw: u8) -> Self {
        match raw {
            0x00 => Self::CentralController,
            0x01 => Self::SubController,
            0x02 => Self::PortableController,
            0x03 => Self::PortableReportingController,
            0x04 => Self::PortableSlave,
            0x05 => Self::AlwaysOnSlave,
            0x06 => Self::ReportingSleepingSlave,
            0x07 => Self::ListeningSleepingSlave,
            _ => Self::Unknown,
        }
    }
}

/// Parses a manufacturer/product identifier the engine reports as a hex
/// string such as `"0x010f"`. Unparsable input yields `0`.
#[must_use]
pub fn parse_hex_id(raw: &str) -> u16 {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u16::from_str_radix(digits, 16).unwrap_or(0)
}
