//! Implementation of the Chou-Orlandi oblivious transfer protocol (cf.
//! <https://eprint.iacr.org/2015/267>) over the Ristretto prime order group.
//!
//! The key derivation hashes in the transfer index, so the random OTs of a
//! batch stay independent even when the receiver reuses blinding values.
//! Pads are stretched to the message length with a keyed XOF, which lets the
//! protocol carry byte vectors of any (batch-uniform) length.

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_TABLE,
    ristretto::{CompressedRistretto, RistrettoBasepointTable, RistrettoPoint},
    scalar::Scalar,
};
use rand::{CryptoRng, Rng};

use crate::{
    bits::xor_bytes,
    channel::{recv_vec_from, send_to, Channel},
    error::Error,
    ot::{hash_pt, OtReceiver, OtSender},
};

/// Oblivious transfer sender.
pub struct Sender {
    y: Scalar,
    s: RistrettoPoint,
    counter: u128,
}

impl OtSender for Sender {
    async fn init<C: Channel, RNG: CryptoRng + Rng>(
        channel: &C,
        mut rng: &mut RNG,
        p_to: usize,
    ) -> Result<Self, Error> {
        let y = Scalar::random(&mut rng);
        let s = &y * RISTRETTO_BASEPOINT_TABLE;
        send_to(channel, p_to, "base OT point", s.compress().as_bytes().as_ref()).await?;
        Ok(Self { y, s, counter: 0 })
    }

    async fn send<C: Channel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        _: &mut RNG,
        p_to: usize,
        inputs: &[(Vec<u8>, Vec<u8>)],
    ) -> Result<(), Error> {
        let msg_len = inputs.first().map(|(m0, _)| m0.len()).unwrap_or(0);
        if inputs
            .iter()
            .any(|(m0, m1)| m0.len() != msg_len || m1.len() != msg_len)
        {
            return Err(Error::InvalidSize(msg_len * 8));
        }
        let ys = self.y * self.s;
        let points: Vec<Vec<u8>> =
            recv_vec_from(channel, p_to, "base OT blinded points", inputs.len()).await?;
        let mut ciphertexts = Vec::with_capacity(inputs.len());
        for (i, ((m0, m1), r_bytes)) in inputs.iter().zip(points.into_iter()).enumerate() {
            let r = decode_point(r_bytes)?;
            let yr = self.y * r;
            let k0 = hash_pt(self.counter + i as u128, &yr, msg_len);
            let k1 = hash_pt(self.counter + i as u128, &(yr - ys), msg_len);
            ciphertexts.push((xor_bytes(m0, &k0)?, xor_bytes(m1, &k1)?));
        }
        self.counter += inputs.len() as u128;
        send_to(channel, p_to, "base OT ciphertexts", &ciphertexts).await?;
        Ok(())
    }
}

/// Oblivious transfer receiver.
pub struct Receiver {
    s: RistrettoBasepointTable,
    counter: u128,
}

impl OtReceiver for Receiver {
    async fn init<C: Channel, RNG: CryptoRng + Rng>(
        channel: &C,
        _: &mut RNG,
        p_to: usize,
    ) -> Result<Self, Error> {
        let s_bytes: Vec<u8> = recv_vec_from(channel, p_to, "base OT point", 32).await?;
        let s = decode_point(s_bytes)?;
        let s = RistrettoBasepointTable::create(&s);
        Ok(Self { s, counter: 0 })
    }

    async fn receive<C: Channel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        mut rng: &mut RNG,
        p_to: usize,
        choices: &[bool],
    ) -> Result<Vec<Vec<u8>>, Error> {
        let zero = &Scalar::ZERO * &self.s;
        let one = &Scalar::ONE * &self.s;
        let mut blinded = Vec::with_capacity(choices.len());
        let mut keys = Vec::with_capacity(choices.len());
        for b in choices {
            let x = Scalar::random(&mut rng);
            let c = if *b { one } else { zero };
            let r = c + &x * RISTRETTO_BASEPOINT_TABLE;
            blinded.push(r.compress().as_bytes().to_vec());
            keys.push(&x * &self.s);
        }
        send_to(channel, p_to, "base OT blinded points", &blinded).await?;

        let ciphertexts: Vec<(Vec<u8>, Vec<u8>)> =
            recv_vec_from(channel, p_to, "base OT ciphertexts", choices.len()).await?;
        let mut result = Vec::with_capacity(choices.len());
        for (i, ((b, key), (c0, c1))) in choices.iter().zip(keys).zip(ciphertexts).enumerate() {
            let c = if *b { c1 } else { c0 };
            let pad = hash_pt(self.counter + i as u128, &key, c.len());
            result.push(xor_bytes(&c, &pad)?);
        }
        self.counter += choices.len() as u128;
        Ok(result)
    }
}

fn decode_point(data: Vec<u8>) -> Result<RistrettoPoint, Error> {
    let bytes: [u8; 32] = data
        .try_into()
        .map_err(|_| Error::ProtocolMismatch("point is not 32 bytes".into()))?;
    let compressed = CompressedRistretto::from_slice(&bytes)
        .map_err(|_| Error::ProtocolMismatch("invalid compressed point".into()))?;
    compressed
        .decompress()
        .ok_or_else(|| Error::ProtocolMismatch("invalid ristretto point".into()))
}
