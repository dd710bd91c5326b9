/**
 * Cryptographic primitives for the MEGA scheme.
 *  - AES-128 ECB/CBC/CTR helpers and 32-bit word packing
 *  - Password key derivation and the email handle hash
 *  - Encrypted node attributes and RSA session-id recovery
 */
pub mod crypto;
/**
 * The authenticated JSON request channel.
 * Handles sequence numbers, session attachment, retries
 *  and server error decoding, plus all wire message types.
 */
pub mod api;
/**
 * The client-side mirror of the remote filesystem:
 *  node records, the hash index, share keys, and the
 *  tree builder that decrypts incoming node records.
 */
pub mod fs;
/**
 * Server-pushed event stream. A single long-poll task
 *  reconciles add/update/delete events into the tree.
 */
pub mod events;
/**
 * Chunked transfer engine: the chunk schedule, the
 *  download/upload worker pools, CTR payload crypto and
 *  the condensed CBC-MAC accumulation.
 */
pub mod transfer;
/**
 * The `Mega` handle tying the above together: login,
 *  tree fetch, node operations and transfers.
 */
pub mod client;

pub mod config;
pub mod error;

pub mod prelude {
    pub use crate::client::Mega;
    pub use crate::config::Options;
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::fs::{FileSystem, Node, NodeKind};
    pub use crate::transfer::Progress;
}
