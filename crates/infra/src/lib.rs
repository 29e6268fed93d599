//! Infrastructure layer: storage, dispatch, payouts, read models and the
//! `EventLedger` service.

pub mod command_dispatcher;
pub mod config;
pub mod funds;
pub mod id_sequence;
pub mod ledger;
pub mod locks;
pub mod notification_store;
pub mod projections;
pub mod read_model;
pub mod workers;

mod integration_tests;

pub use command_dispatcher::{CommandDispatcher, Committed, DispatchError, PublishError};
pub use config::LedgerConfig;
pub use funds::{FundsTransfer, InMemoryFunds, Payout, TransferError};
pub use id_sequence::{AtomicIdSequence, IdSequence, SequenceExhausted};
pub use ledger::{EventLedger, ServiceError};
pub use locks::EventLocks;
pub use notification_store::{InMemoryNotificationStore, NotificationStore, StoreError};
pub use projections::{CustodyEntry, CustodyProjection, StakeStatus};
pub use read_model::{InMemoryKeyedStore, KeyedStore};
pub use workers::{ProjectionWorker, WorkerHandle};
