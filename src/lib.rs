//! Secure two- and multi-party computation of boolean circuits.
//!
//! Two (or more) mutually distrusting parties jointly evaluate a boolean
//! function over private inputs without revealing anything beyond the
//! output. Three cooperating layers make up the engine:
//!
//! * [`garble`]: a garbled-circuit generator and evaluator with free XOR,
//!   point-and-permute and row reduction,
//! * [`ot`]: oblivious transfer, a Chou-Orlandi base OT extended to
//!   arbitrarily many transfers with the IKNP protocol,
//! * [`gmw`]: the GMW protocol over XOR-shared words with precomputed Beaver
//!   triples, for any number of parties.
//!
//! Parties communicate over the [`channel::Channel`] abstraction; everything
//! assumes semi-honest participants and tears the session down on the first
//! error.
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod bits;
pub mod channel;
pub mod error;
pub mod garble;
pub mod gmw;
pub mod hash;
pub mod ot;

pub use error::Error;
