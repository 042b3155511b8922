//! alert_transfer_supervisor
//!
//! Outside-world facing composition layer for `alert_transfer_core`.
//!
//! Responsibilities:
//! - own the alert presenters and the group policy
//! - deliver entry events in order from one channel
//! - replay group and presenter changes into the transfer machine
//!
//! Non-goals:
//! - no IO
//! - no async
//! - no grouping policy beyond the reference `GroupTable`

pub mod adapter;
pub mod group_table;
pub mod supervisor;

pub use adapter::{
    BasicAlertPresenter,
    BasicRow,
    AMBIENT_PULSE_CONTENT,
    HEADS_UP_CONTENT,
};

pub use group_table::GroupTable;

pub use supervisor::{
    GroupSnapshot,
    TransferSnapshot,
    TransferSupervisor,
};
