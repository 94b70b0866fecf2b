// ABOUTME: Validated domain types shared across the receiver.
// ABOUTME: Currently the content digest that names version directories.

mod digest;

pub use digest::{DIGEST_HEX_LEN, Digest, DigestError};
