//! Oblivious transfer: base-OT traits, a Chou-Orlandi instantiation and the
//! IKNP OT-extension that amortizes the base OTs into arbitrarily many
//! transfers.
//!
//! The base-OT traits transfer batches of equal-length byte vectors. The
//! extension consumes a base OT with the roles swapped: the extension sender
//! runs a base-OT *receiver* and vice versa.

pub mod chou_orlandi;
pub mod extend;

use curve25519_dalek::ristretto::RistrettoPoint;
use rand::{CryptoRng, Rng};

use crate::{channel::Channel, error::Error};

/// One-out-of-two oblivious transfer from the sender's point of view.
pub trait OtSender: Sized {
    /// Runs the one-time initialization handshake with the receiver.
    #[allow(async_fn_in_trait)]
    async fn init<C: Channel, RNG: CryptoRng + Rng>(
        channel: &C,
        rng: &mut RNG,
        p_to: usize,
    ) -> Result<Self, Error>;

    /// Transfers one message of each pair; the receiver learns the message
    /// matching its choice bit, the sender learns nothing.
    ///
    /// All messages in the batch must have the same length.
    #[allow(async_fn_in_trait)]
    async fn send<C: Channel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        rng: &mut RNG,
        p_to: usize,
        inputs: &[(Vec<u8>, Vec<u8>)],
    ) -> Result<(), Error>;
}

/// One-out-of-two oblivious transfer from the receiver's point of view.
pub trait OtReceiver: Sized {
    /// Runs the one-time initialization handshake with the sender.
    #[allow(async_fn_in_trait)]
    async fn init<C: Channel, RNG: CryptoRng + Rng>(
        channel: &C,
        rng: &mut RNG,
        p_to: usize,
    ) -> Result<Self, Error>;

    /// Receives one message per choice bit; the sender learns nothing about
    /// the choices, the receiver nothing about the unchosen messages.
    #[allow(async_fn_in_trait)]
    async fn receive<C: Channel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        rng: &mut RNG,
        p_to: usize,
        choices: &[bool],
    ) -> Result<Vec<Vec<u8>>, Error>;
}

/// Derives a one-time pad of `len` bytes from a Ristretto point and a tweak.
pub(crate) fn hash_pt(tweak: u128, pt: &RistrettoPoint, len: usize) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new_keyed(pt.compress().as_bytes());
    hasher.update(&tweak.to_le_bytes());
    let mut pad = vec![0u8; len];
    hasher.finalize_xof().fill(&mut pad);
    pad
}
