//! Raw notifications delivered by the transport engine.
//!
//! One tagged [`Notification`] per engine notification type. Numeric codes
//! follow the engine's own numbering so transport bindings can convert with
//! `TryFrom<u8>`.

use crate::domain::ValueDescriptor;

/// Generic status code carried by a [`Notification::Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCode {
    /// A message completed.
    MsgComplete,
    /// A message timed out. With home id `0` during setup: add-driver timeout.
    Timeout,
    /// A NoOperation message completed.
    NoOperation,
    /// A sleeping node woke up.
    Awake,
    /// A node went to sleep.
    Sleep,
    /// A node is presumed dead.
    Dead,
    /// A dead node came back.
    Alive,
    /// Any code this gateway does not know.
    Other(u8),
}

impl From<u8> for NotificationCode {
    fn from(raw: u8) -> Self {
        match raw {
            0 => Self::MsgComplete,
            1 => Self::Timeout,
            2 => Self::NoOperation,
            3 => Self::Awake,
            4 => Self::Sleep,
            5 => Self::Dead,
            6 => Self::Alive,
            other => Self::Other(other),
        }
    }
}

/// Controller command a progress notification refers to.
///
/// Legacy engines always report [`ControllerCommand::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerCommand {
    /// No command, or not reported.
    None,
    /// Include a device.
    AddDevice,
    /// Create a new primary controller.
    CreateNewPrimary,
    /// Receive network configuration from another controller.
    ReceiveConfiguration,
    /// Exclude a device.
    RemoveDevice,
    /// Remove a node from the failed-node list.
    RemoveFailedNode,
    /// Check whether a node is in the failed-node list.
    HasNodeFailed,
    /// Replace a failed node.
    ReplaceFailedNode,
    /// Hand over the primary role.
    TransferPrimaryRole,
    /// Request a network update from the SUC/SIS.
    RequestNetworkUpdate,
    /// Rebuild a node's neighbour list.
    RequestNodeNeighborUpdate,
    /// Assign return routes.
    AssignReturnRoute,
    /// Delete all return routes.
    DeleteAllReturnRoutes,
    /// Send a node information frame.
    SendNodeInformation,
    /// Replicate to a secondary controller.
    ReplicationSend,
    /// Create a handheld button id.
    CreateButton,
    /// Delete a handheld button id.
    DeleteButton,
}

impl From<u8> for ControllerCommand {
    fn from(raw: u8) -> Self {
        match raw {
            1 => Self::AddDevice,
            2 => Self::CreateNewPrimary,
            3 => Self::ReceiveConfiguration,
            4 => Self::RemoveDevice,
            5 => Self::RemoveFailedNode,
            6 => Self::HasNodeFailed,
            7 => Self::ReplaceFailedNode,
            8 => Self::TransferPrimaryRole,
            9 => Self::RequestNetworkUpdate,
            10 => Self::RequestNodeNeighborUpdate,
            11 => Self::AssignReturnRoute,
            12 => Self::DeleteAllReturnRoutes,
            13 => Self::SendNodeInformation,
            14 => Self::ReplicationSend,
            15 => Self::CreateButton,
            16 => Self::DeleteButton,
            _ => Self::None,
        }
    }
}

/// Progress state of a controller command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// No command in progress.
    Normal,
    /// The command is starting.
    Starting,
    /// The command was cancelled.
    Cancel,
    /// The command had errors and was aborted.
    Error,
    /// Waiting for a user action on the device.
    Waiting,
    /// Queued until a sleeping device wakes.
    Sleeping,
    /// Communicating with the device.
    InProgress,
    /// The command completed successfully.
    Completed,
    /// The command failed.
    Failed,
    /// `HasNodeFailed` only: the node is fine.
    NodeOk,
    /// `HasNodeFailed` only: the node has failed.
    NodeFailed,
}

impl TryFrom<u8> for ControllerState {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, u8> {
        match raw {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Starting),
            2 => Ok(Self::Cancel),
            3 => Ok(Self::Error),
            4 => Ok(Self::Waiting),
            5 => Ok(Self::Sleeping),
            6 => Ok(Self::InProgress),
            7 => Ok(Self::Completed),
            8 => Ok(Self::Failed),
            9 => Ok(Self::NodeOk),
            10 => Ok(Self::NodeFailed),
            other => Err(other),
        }
    }
}

/// One raw notification from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A value was discovered.
    ValueAdded {
        /// Value address (carries home and node id).
        value: ValueDescriptor,
    },
    /// A value changed.
    ValueChanged {
        /// Value address.
        value: ValueDescriptor,
    },
    /// A value was re-read without necessarily changing.
    ValueRefreshed {
        /// Value address.
        value: ValueDescriptor,
    },
    /// A value disappeared.
    ValueRemoved {
        /// Home id.
        home_id: u32,
        /// Node id.
        node_id: u8,
        /// Engine value id.
        value_id: u64,
    },
    /// Association group information changed.
    Group {
        /// Home id.
        home_id: u32,
        /// Node id.
        node_id: u8,
    },
    /// A node joined for the first time.
    NodeNew {
        /// Home id.
        home_id: u32,
        /// Node id.
        node_id: u8,
    },
    /// A node was added to the engine's node table (also on every restart).
    NodeAdded {
        /// Home id.
        home_id: u32,
        /// Node id.
        node_id: u8,
    },
    /// A node was removed.
    NodeRemoved {
        /// Home id.
        home_id: u32,
        /// Node id.
        node_id: u8,
    },
    /// Node protocol info arrived.
    NodeProtocolInfo {
        /// Home id.
        home_id: u32,
        /// Node id.
        node_id: u8,
    },
    /// Node name or location changed.
    NodeNaming {
        /// Home id.
        home_id: u32,
        /// Node id.
        node_id: u8,
    },
    /// A node sent a basic-set event.
    NodeEvent {
        /// Home id.
        home_id: u32,
        /// Node id.
        node_id: u8,
        /// Event payload byte.
        event: u8,
    },
    /// A driver is ready and has been assigned `home_id`.
    DriverReady {
        /// Home id.
        home_id: u32,
    },
    /// A driver failed to start. Modern engines name the address.
    DriverFailed {
        /// Transport address, if the engine reports it.
        address: Option<String>,
    },
    /// A driver was reset.
    DriverReset {
        /// Home id.
        home_id: u32,
    },
    /// A driver was removed.
    DriverRemoved {
        /// Home id.
        home_id: u32,
    },
    /// Essential queries for all nodes finished.
    EssentialNodeQueriesComplete {
        /// Home id.
        home_id: u32,
    },
    /// All queries for one node finished.
    NodeQueriesComplete {
        /// Home id.
        home_id: u32,
        /// Node id.
        node_id: u8,
    },
    /// All awake nodes were queried.
    AwakeNodesQueried {
        /// Home id.
        home_id: u32,
    },
    /// All nodes were queried, some are dead.
    AllNodesQueriedSomeDead {
        /// Home id.
        home_id: u32,
    },
    /// All nodes were queried.
    AllNodesQueried {
        /// Home id.
        home_id: u32,
    },
    /// Generic status code.
    Status {
        /// Home id, `0` for driver-level codes.
        home_id: u32,
        /// Node id.
        node_id: u8,
        /// Status code.
        code: NotificationCode,
    },
    /// Controller command progress.
    ControllerCommand {
        /// Home id.
        home_id: u32,
        /// Command, always `None` on legacy engines.
        command: ControllerCommand,
        /// Command state.
        state: ControllerState,
    },
    /// User-facing alert raised by the engine.
    UserAlert {
        /// Home id.
        home_id: u32,
        /// Raw alert type.
        alert: u8,
        /// Engine-provided description.
        message: String,
    },
    /// Any notification type this gateway does not classify.
    Unknown {
        /// Raw notification type.
        kind: u8,
    },
}

impl Notification {
    /// Returns the notification type as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::ValueAdded { .. } => "value_added",
            Self::ValueChanged { .. } => "value_changed",
            Self::ValueRefreshed { .. } => "value_refreshed",
            Self::ValueRemoved { .. } => "value_removed",
            Self::Group { .. } => "group",
            Self::NodeNew { .. } => "node_new",
            Self::NodeAdded { .. } => "node_added",
            Self::NodeRemoved { .. } => "node_removed",
            Self::NodeProtocolInfo { .. } => "node_protocol_info",
            Self::NodeNaming { .. } => "node_naming",
            Self::NodeEvent { .. } => "node_event",
            Self::DriverReady { .. } => "driver_ready",
            Self::DriverFailed { .. } => "driver_failed",
            Self::DriverReset { .. } => "driver_reset",
            Self::DriverRemoved { .. } => "driver_removed",
            Self::EssentialNodeQueriesComplete { .. } => "essential_node_queries_complete",
            Self::NodeQueriesComplete { .. } => "node_queries_complete",
            Self::AwakeNodesQueried { .. } => "awake_nodes_queried",
            Self::AllNodesQueriedSomeDead { .. } => "all_nodes_queried_some_dead",
            Self::AllNodesQueried { .. } => "all_nodes_queried",
            Self::Status { .. } => "status",
            Self::ControllerCommand { .. } => "controller_command",
            Self::UserAlert { .. } => "user_alert",
            Self::Unknown { .. } => "unknown",
        }
    }
}
