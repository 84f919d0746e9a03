//! The generator side of the garbling protocol.

use rand::{CryptoRng, Rng};
use tracing::trace;

use crate::{
    channel::{recv_vec_from, send_to, Channel},
    error::Error,
    ot::{extend::ExtendSender, OtReceiver},
};

use super::{encrypt, encrypt_pair, Delta, GarbledTable, Key, Wire};

/// A garbling session.
///
/// Owns the session secrets: the free-XOR offset, the two constant wires and
/// a running gate counter. All of them are created lazily on first use and
/// torn down by [`Garbler::reset`]; one `Garbler` instance drives exactly one
/// session with one evaluator.
pub struct Garbler {
    p_eval: usize,
    delta: Option<Delta>,
    consts: Option<(Wire, Wire)>,
    gates: u64,
}

impl Garbler {
    /// Creates a session with the evaluator at the given party index.
    pub fn new(p_eval: usize) -> Self {
        Garbler {
            p_eval,
            delta: None,
            consts: None,
            gates: 0,
        }
    }

    fn delta(&mut self) -> Result<Delta, Error> {
        match self.delta {
            Some(delta) => Ok(delta),
            None => {
                let delta = Delta::random()?;
                self.delta = Some(delta);
                Ok(delta)
            }
        }
    }

    fn gen_wire(&mut self) -> Result<Wire, Error> {
        let delta = self.delta()?;
        Ok(Wire::new(Key::random()?, delta))
    }

    fn gen_wires(&mut self, bits: usize) -> Result<Vec<Wire>, Error> {
        if bits == 0 {
            return Err(Error::InvalidSize(bits));
        }
        (0..bits).map(|_| self.gen_wire()).collect()
    }

    /// Derives a row-reduced output wire: the label for `gate_val` is the
    /// double encryption of the all-zero block under the slot-0 input labels,
    /// which pins the slot-0 ciphertext to zero and saves one table row.
    fn gen_wire_rr(&mut self, in_a: &Key, in_b: &Key, gate_val: bool) -> Result<Wire, Error> {
        let delta = self.delta()?;
        let k = Key(encrypt_pair(in_a, in_b, 0));
        Ok(if gate_val {
            Wire {
                k0: k ^ delta,
                k1: k,
            }
        } else {
            Wire {
                k0: k,
                k1: k ^ delta,
            }
        })
    }

    async fn garbled_gate(
        &mut self,
        channel: &impl Channel,
        a: &[Wire],
        b: &[Wire],
        op: fn(bool, bool) -> bool,
    ) -> Result<Vec<Wire>, Error> {
        if a.len() != b.len() {
            return Err(Error::WireMismatch(a.len(), b.len()));
        }
        let mut result = Vec::with_capacity(a.len());
        for (wa, wb) in a.iter().zip(b) {
            let pa = wa.label(false).permute_bit() == 1;
            let pb = wb.label(false).permute_bit() == 1;
            let w = self.gen_wire_rr(&wa.label(pa), &wb.label(pb), op(pa, pb))?;
            let mut rows = Vec::with_capacity(3);
            for s in 1..4usize {
                // the labels whose permutation bits select slot s
                let ia = ((s >> 1) & 1 == 1) ^ pa;
                let ib = (s & 1 == 1) ^ pb;
                rows.push(encrypt_pair(
                    &wa.label(ia),
                    &wb.label(ib),
                    w.label(op(ia, ib)).0,
                ));
            }
            let table = GarbledTable(rows);
            send_to(channel, self.p_eval, "garbled table", &table.0).await?;
            self.gates += 1;
            trace!(gates = self.gates, "sent garbled gate");
            result.push(w);
        }
        Ok(result)
    }

    /// Garbles one AND gate per wire pair and sends the tables.
    pub async fn and(
        &mut self,
        channel: &impl Channel,
        a: &[Wire],
        b: &[Wire],
    ) -> Result<Vec<Wire>, Error> {
        self.garbled_gate(channel, a, b, |x, y| x & y).await
    }

    /// Garbles one OR gate per wire pair and sends the tables.
    pub async fn or(
        &mut self,
        channel: &impl Channel,
        a: &[Wire],
        b: &[Wire],
    ) -> Result<Vec<Wire>, Error> {
        self.garbled_gate(channel, a, b, |x, y| x | y).await
    }

    /// XORs wire vectors without any ciphertext.
    pub fn xor(&self, a: &[Wire], b: &[Wire]) -> Result<Vec<Wire>, Error> {
        if a.len() != b.len() {
            return Err(Error::WireMismatch(a.len(), b.len()));
        }
        Ok(a.iter()
            .zip(b)
            .map(|(wa, wb)| Wire {
                k0: wa.label(false) ^ wb.label(false),
                k1: wa.label(false) ^ wb.label(true),
            })
            .collect())
    }

    async fn constants(&mut self, channel: &impl Channel) -> Result<(Wire, Wire), Error> {
        if let Some(consts) = self.consts {
            return Ok(consts);
        }
        let const0 = self.gen_wire()?;
        let const1 = self.gen_wire()?;
        send_to(channel, self.p_eval, "constant label", &[const0.label(false)]).await?;
        send_to(channel, self.p_eval, "constant label", &[const1.label(true)]).await?;
        self.consts = Some((const0, const1));
        Ok((const0, const1))
    }

    /// The constant-0 wire of this session, sent to the evaluator on first use.
    pub async fn false_wire(&mut self, channel: &impl Channel) -> Result<Wire, Error> {
        Ok(self.constants(channel).await?.0)
    }

    /// The constant-1 wire of this session, sent to the evaluator on first use.
    pub async fn true_wire(&mut self, channel: &impl Channel) -> Result<Wire, Error> {
        Ok(self.constants(channel).await?.1)
    }

    /// Feeds `bits` bits of the generator's own input into the circuit by
    /// sending the matching label of each fresh wire.
    pub async fn garbler_input(
        &mut self,
        channel: &impl Channel,
        value: u64,
        bits: usize,
    ) -> Result<Vec<Wire>, Error> {
        if bits > 64 {
            return Err(Error::InvalidSize(bits));
        }
        let wires = self.gen_wires(bits)?;
        for (i, w) in wires.iter().enumerate() {
            let bit = (value >> i) & 1 == 1;
            send_to(channel, self.p_eval, "input label", &[w.label(bit)]).await?;
        }
        Ok(wires)
    }

    /// Feeds `bits` bits of the evaluator's input into the circuit: both
    /// labels of each fresh wire go through the OT extension and the
    /// evaluator picks the one matching its private bit.
    pub async fn evaluator_input<C: Channel, OT: OtReceiver, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        rng: &mut RNG,
        ot: &mut ExtendSender<OT>,
        bits: usize,
    ) -> Result<Vec<Wire>, Error> {
        let wires = self.gen_wires(bits)?;
        for w in &wires {
            ot.send(
                channel,
                rng,
                &w.label(false).0.to_le_bytes(),
                &w.label(true).0.to_le_bytes(),
            )
            .await?;
        }
        Ok(wires)
    }

    /// Generates wires carrying bits unknown to the generator: the labels are
    /// transferred in coin-flipped order, so the evaluator's label encodes a
    /// random bit the generator cannot predict.
    pub async fn random<C: Channel, OT: OtReceiver, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        rng: &mut RNG,
        ot: &mut ExtendSender<OT>,
        bits: usize,
    ) -> Result<Vec<Wire>, Error> {
        let wires = self.gen_wires(bits)?;
        for w in &wires {
            let k0 = w.label(false).0.to_le_bytes();
            let k1 = w.label(true).0.to_le_bytes();
            if rng.gen::<bool>() {
                ot.send(channel, rng, &k1, &k0).await?;
            } else {
                ot.send(channel, rng, &k0, &k1).await?;
            }
        }
        Ok(wires)
    }

    /// Resolves the circuit output towards the generator: receives the
    /// evaluator's label for each wire and looks it up against the two known
    /// labels.
    pub async fn reveal(
        &mut self,
        channel: &impl Channel,
        a: &[Wire],
    ) -> Result<Vec<bool>, Error> {
        let mut result = Vec::with_capacity(a.len());
        for w in a {
            let key = recv_vec_from::<Key>(channel, self.p_eval, "revealed label", 1).await?[0];
            result.push(resolve_key(w, key)?);
        }
        Ok(result)
    }

    /// Reveals the circuit output towards the evaluator: each wire gets a
    /// two-row table encrypting fresh blocks whose low byte spells the bit.
    pub async fn reveal_to_evaluator(
        &mut self,
        channel: &impl Channel,
        a: &[Wire],
    ) -> Result<(), Error> {
        for w in a {
            let mut w0 = Key::random()?;
            let mut w1 = Key::random()?;
            w0.0 &= !0xff;
            w1.0 = (w1.0 & !0xff) | 1;
            let k0 = w.label(false);
            let k1 = w.label(true);
            let mut rows = vec![0u128; 2];
            rows[k0.permute_bit() as usize] = encrypt(&k0, w0.0);
            rows[k1.permute_bit() as usize] = encrypt(&k1, w1.0);
            let table = GarbledTable(rows);
            send_to(channel, self.p_eval, "garbled table", &table.0).await?;
        }
        Ok(())
    }

    /// Clears the session secrets so the instance can start a fresh session.
    pub fn reset(&mut self) {
        self.delta = None;
        self.consts = None;
        self.gates = 0;
    }
}

fn resolve_key(wire: &Wire, key: Key) -> Result<bool, Error> {
    if key == wire.label(false) {
        Ok(false)
    } else if key == wire.label(true) {
        Ok(true)
    } else {
        Err(Error::ProtocolMismatch(
            "revealed label matches neither wire label".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_wires_of_a_session_share_the_same_offset() {
        let mut garbler = Garbler::new(1);
        let wires = garbler.gen_wires(64).unwrap();
        let delta = garbler.delta.unwrap();
        for w in wires {
            assert_eq!(w.label(false).0 ^ w.label(true).0, delta.0);
            assert_ne!(w.label(false).permute_bit(), w.label(true).permute_bit());
        }
    }

    #[test]
    fn zero_wires_is_invalid() {
        let mut garbler = Garbler::new(1);
        assert!(matches!(garbler.gen_wires(0), Err(Error::InvalidSize(0))));
    }

    #[test]
    fn xor_rejects_mismatched_arity() {
        let mut garbler = Garbler::new(1);
        let a = garbler.gen_wires(2).unwrap();
        let b = garbler.gen_wires(3).unwrap();
        assert!(matches!(
            garbler.xor(&a, &b),
            Err(Error::WireMismatch(2, 3))
        ));
    }

    #[test]
    fn xor_preserves_the_offset_for_free() {
        let mut garbler = Garbler::new(1);
        let a = garbler.gen_wires(1).unwrap();
        let b = garbler.gen_wires(1).unwrap();
        let c = garbler.xor(&a, &b).unwrap();
        let delta = garbler.delta.unwrap();
        assert_eq!(c[0].label(false).0 ^ c[0].label(true).0, delta.0);
        assert_eq!(
            c[0].label(false),
            a[0].label(false) ^ b[0].label(false)
        );
    }

    #[test]
    fn reset_clears_session_state() {
        let mut garbler = Garbler::new(1);
        garbler.gen_wires(1).unwrap();
        assert!(garbler.delta.is_some());
        garbler.reset();
        assert!(garbler.delta.is_none());
        assert!(garbler.consts.is_none());
        assert_eq!(garbler.gates, 0);
    }

    #[test]
    fn resolving_a_foreign_key_fails() {
        let mut garbler = Garbler::new(1);
        let w = garbler.gen_wire().unwrap();
        assert_eq!(resolve_key(&w, w.label(false)).unwrap(), false);
        assert_eq!(resolve_key(&w, w.label(true)).unwrap(), true);
        let foreign = Key::random().unwrap();
        assert!(matches!(
            resolve_key(&w, foreign),
            Err(Error::ProtocolMismatch(_))
        ));
    }
}
