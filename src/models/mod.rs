pub mod cursor;
pub mod deposit;

pub use cursor::{Cursor, ScanRange};
pub use deposit::{DecodedDeposit, RawLog};
