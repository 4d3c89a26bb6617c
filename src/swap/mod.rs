//! Swap session: admission, fee patching and status on top of the
//! submission pipeline

pub mod session;
pub mod status;

pub use session::{PreparedSwap, SessionError, SwapReceipt, SwapSession};
pub use status::{SwapStatus, TxStatus};
