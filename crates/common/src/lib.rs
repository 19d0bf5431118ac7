pub mod error;
pub mod nullifier;
pub mod primitives;
pub mod quantity;
pub mod request;

pub use error::{Error, ErrorKind, Result};
pub use nullifier::{Nullifier, NULLIFIER_DOMAIN_TAG};
pub use primitives::{Address, TxHash};
pub use request::{MintRequest, MintResponse};
