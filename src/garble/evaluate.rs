//! The evaluator side of the garbling protocol.
//!
//! The evaluator holds exactly one label per wire and never learns the
//! second one. Every operation here mirrors a generator operation and must
//! be called in the same order, otherwise the parties desynchronize and the
//! session is lost.

use rand::{CryptoRng, Rng};

use crate::{
    channel::{recv_vec_from, send_to, Channel},
    error::Error,
    ot::{extend::ExtendReceiver, OtSender},
};

use super::{decrypt, decrypt_pair, encrypt_pair, slot, GarbledTable, Key, KEY_SIZE};

/// An evaluation session, the counterpart of one generator session.
pub struct Evaluator {
    p_gen: usize,
    consts: Option<(Key, Key)>,
}

impl Evaluator {
    /// Creates a session with the generator at the given party index.
    pub fn new(p_gen: usize) -> Self {
        Evaluator {
            p_gen,
            consts: None,
        }
    }

    async fn recv_table(
        &self,
        channel: &impl Channel,
        rows: usize,
    ) -> Result<GarbledTable, Error> {
        let rows = recv_vec_from::<u128>(channel, self.p_gen, "garbled table", rows).await?;
        Ok(GarbledTable(rows))
    }

    /// Decrypts one garbled gate per label pair. The slot index formed by
    /// the two permutation bits picks the row; slot 0 is the elided
    /// row-reduced row whose ciphertext is the all-zero block.
    async fn gate(
        &mut self,
        channel: &impl Channel,
        a: &[Key],
        b: &[Key],
    ) -> Result<Vec<Key>, Error> {
        if a.len() != b.len() {
            return Err(Error::WireMismatch(a.len(), b.len()));
        }
        let mut result = Vec::with_capacity(a.len());
        for (ka, kb) in a.iter().zip(b) {
            let table = self.recv_table(channel, 3).await?;
            let s = slot(ka, kb);
            let out = if s == 0 {
                Key(encrypt_pair(ka, kb, 0))
            } else {
                Key(decrypt_pair(ka, kb, table.row(s - 1)))
            };
            result.push(out);
        }
        Ok(result)
    }

    /// Evaluates AND gates garbled by the paired generator call.
    pub async fn and(
        &mut self,
        channel: &impl Channel,
        a: &[Key],
        b: &[Key],
    ) -> Result<Vec<Key>, Error> {
        self.gate(channel, a, b).await
    }

    /// Evaluates OR gates garbled by the paired generator call.
    ///
    /// Decryption is operator-agnostic, but a separate entry point keeps the
    /// call sequences of both parties aligned one-to-one.
    pub async fn or(
        &mut self,
        channel: &impl Channel,
        a: &[Key],
        b: &[Key],
    ) -> Result<Vec<Key>, Error> {
        self.gate(channel, a, b).await
    }

    /// XORs label vectors without any communication.
    pub fn xor(&self, a: &[Key], b: &[Key]) -> Result<Vec<Key>, Error> {
        if a.len() != b.len() {
            return Err(Error::WireMismatch(a.len(), b.len()));
        }
        Ok(a.iter().zip(b).map(|(ka, kb)| *ka ^ *kb).collect())
    }

    async fn constants(&mut self, channel: &impl Channel) -> Result<(Key, Key), Error> {
        if let Some(consts) = self.consts {
            return Ok(consts);
        }
        let const0 = recv_vec_from::<Key>(channel, self.p_gen, "constant label", 1).await?[0];
        let const1 = recv_vec_from::<Key>(channel, self.p_gen, "constant label", 1).await?[0];
        self.consts = Some((const0, const1));
        Ok((const0, const1))
    }

    /// The label of the constant-0 wire, received on first use.
    pub async fn false_wire(&mut self, channel: &impl Channel) -> Result<Key, Error> {
        Ok(self.constants(channel).await?.0)
    }

    /// The label of the constant-1 wire, received on first use.
    pub async fn true_wire(&mut self, channel: &impl Channel) -> Result<Key, Error> {
        Ok(self.constants(channel).await?.1)
    }

    /// Receives the labels encoding the generator's input bits.
    pub async fn garbler_input(
        &mut self,
        channel: &impl Channel,
        bits: usize,
    ) -> Result<Vec<Key>, Error> {
        if bits == 0 {
            return Err(Error::InvalidSize(bits));
        }
        let mut result = Vec::with_capacity(bits);
        for _ in 0..bits {
            let key = recv_vec_from::<Key>(channel, self.p_gen, "input label", 1).await?[0];
            result.push(key);
        }
        Ok(result)
    }

    /// Picks up one label per private input bit through the OT extension.
    pub async fn evaluator_input<C: Channel, OT: OtSender, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        rng: &mut RNG,
        ot: &mut ExtendReceiver<OT>,
        bits: &[bool],
    ) -> Result<Vec<Key>, Error> {
        if bits.is_empty() {
            return Err(Error::InvalidSize(0));
        }
        let mut result = Vec::with_capacity(bits.len());
        for bit in bits {
            result.push(key_from_bytes(ot.receive(channel, rng, *bit).await?)?);
        }
        Ok(result)
    }

    /// Receives labels carrying bits neither party controls: the generator
    /// coin-flips the transfer order, this side coin-flips its choice bit,
    /// and OT receiver-privacy keeps the choice hidden, so the resulting
    /// logical bit is the XOR of two coins no single party knows.
    pub async fn random<C: Channel, OT: OtSender, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        rng: &mut RNG,
        ot: &mut ExtendReceiver<OT>,
        bits: usize,
    ) -> Result<Vec<Key>, Error> {
        if bits == 0 {
            return Err(Error::InvalidSize(bits));
        }
        let mut result = Vec::with_capacity(bits);
        for _ in 0..bits {
            let choice = rng.gen::<bool>();
            result.push(key_from_bytes(ot.receive(channel, rng, choice).await?)?);
        }
        Ok(result)
    }

    /// Uploads the held labels so the generator can resolve the output bits.
    pub async fn reveal(&mut self, channel: &impl Channel, a: &[Key]) -> Result<(), Error> {
        for key in a {
            send_to(channel, self.p_gen, "revealed label", &[*key]).await?;
        }
        Ok(())
    }

    /// Decrypts the output bits the generator revealed towards this party.
    pub async fn reveal_to_evaluator(
        &mut self,
        channel: &impl Channel,
        a: &[Key],
    ) -> Result<Vec<bool>, Error> {
        let mut result = Vec::with_capacity(a.len());
        for key in a {
            let table = self.recv_table(channel, 2).await?;
            let plain = decrypt(key, table.row(key.permute_bit() as usize));
            match plain & 0xff {
                0 => result.push(false),
                1 => result.push(true),
                byte => {
                    return Err(Error::ProtocolMismatch(format!(
                        "revealed bit decrypts to invalid byte {byte}"
                    )))
                }
            }
        }
        Ok(result)
    }
}

fn key_from_bytes(bytes: Vec<u8>) -> Result<Key, Error> {
    let bytes: [u8; KEY_SIZE] = bytes
        .try_into()
        .map_err(|_| Error::ProtocolMismatch("transferred label is not one block".into()))?;
    Ok(Key(u128::from_le_bytes(bytes)))
}
