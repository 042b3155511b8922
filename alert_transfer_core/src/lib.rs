pub mod entry;
pub mod event;
pub mod presenter;
pub mod groups;

pub mod cfg;
pub mod error;
pub mod pending;
pub mod state;
pub mod machine;

pub use entry::{AlertPolicy, ContentFlag, ContentRow, Entry, GroupAlertBehavior, Membership, Role};
pub use event::{AlertChange, DiscardReason, EntryEvent, GroupEvent, TransferAction};
pub use presenter::{AlertKind, AlertPresenter, Presenters};
pub use groups::GroupPolicy;

pub use cfg::{Clock, ManualClock, SystemClock, TransferCfg};
pub use error::TransferError;
pub use pending::{PendingTransfer, PendingTransfers};
pub use state::{GroupAlertState, ScheduledAlert};
pub use machine::{Collaborators, TransferStateMachine};
