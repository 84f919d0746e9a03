//! Extending oblivious transfers efficiently (Ishai, Kilian, Nissim,
//! Petrank, CRYPTO 2003), with a preprocessing step.
//!
//! A batch of `k` base OTs on `m`-bit columns is stretched into `m` extended
//! OTs on `l`-bit messages. Preprocessing runs lazily before the first
//! transfer and re-runs transparently every `m` transfers.
//!
//! Each online transfer exchanges exactly one selector byte (receiver to
//! sender) followed by two message words (sender to receiver). The two
//! directions are logically distinct streams; drivers must pair every `send`
//! with a `receive` in matching order or both sides deadlock.

use rand::{CryptoRng, Rng};
use tracing::debug;

use crate::{
    bits::{get_bit, random_bits, xor_bytes, BitMatrix},
    channel::{recv_vec_from, send_to, Channel},
    error::Error,
    hash::random_oracle,
    ot::{OtReceiver, OtSender},
};

fn check_params(k: usize, l: usize, m: usize) -> Result<(), Error> {
    for param in [k, l, m] {
        if param == 0 || param % 8 != 0 {
            return Err(Error::InvalidSize(param));
        }
    }
    Ok(())
}

/// The sending side of the OT extension.
///
/// Holds the pads `z0`/`z1` for the current batch and a pair counter; the
/// underlying base OT is consumed with the roles reversed.
pub struct ExtendSender<OT: OtReceiver> {
    base: OT,
    p_to: usize,
    k: usize,
    l: usize,
    m: usize,
    s: Vec<u8>,
    z0: Vec<Vec<u8>>,
    z1: Vec<Vec<u8>>,
    cur_pair: usize,
}

impl<OT: OtReceiver> ExtendSender<OT> {
    /// Creates a sender for `m`-sized batches of `l`-bit messages with
    /// security parameter `k`, running the base-OT handshake with party
    /// `p_to`. All three parameters must be positive multiples of 8.
    pub async fn new<C: Channel, RNG: CryptoRng + Rng>(
        channel: &C,
        rng: &mut RNG,
        p_to: usize,
        k: usize,
        l: usize,
        m: usize,
    ) -> Result<Self, Error> {
        check_params(k, l, m)?;
        let base = OT::init(channel, rng, p_to).await?;
        Ok(Self {
            base,
            p_to,
            k,
            l,
            m,
            s: vec![],
            z0: vec![],
            z1: vec![],
            cur_pair: m,
        })
    }

    async fn preprocess<C: Channel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        rng: &mut RNG,
    ) -> Result<(), Error> {
        debug!(m = self.m, "pre-processing OT extension sender");
        self.cur_pair = 0;
        let mut s = vec![0u8; self.k / 8];
        random_bits(rng, &mut s)?;
        let choices: Vec<bool> = (0..self.k).map(|i| get_bit(&s, i) == 1).collect();
        let columns = self.base.receive(channel, rng, self.p_to, &choices).await?;
        let mut qt = BitMatrix::new(self.k, self.m)?;
        for (i, column) in columns.iter().enumerate() {
            if column.len() != self.m / 8 {
                return Err(Error::ProtocolMismatch(format!(
                    "incorrect column length received: {} != {}",
                    column.len(),
                    self.m / 8
                )));
            }
            qt.set_row(i, column)?;
        }
        let q = qt.transpose();
        self.s = s;
        self.z0 = Vec::with_capacity(self.m);
        self.z1 = Vec::with_capacity(self.m);
        for j in 0..self.m {
            self.z0.push(random_oracle(q.row(j), self.l)?);
            self.z1
                .push(random_oracle(&xor_bytes(q.row(j), &self.s)?, self.l)?);
        }
        Ok(())
    }

    /// Transfers one of `m0`/`m1`; which one the receiver obtains is decided
    /// by the choice bit of the paired [`ExtendReceiver::receive`] call.
    pub async fn send<C: Channel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        rng: &mut RNG,
        m0: &[u8],
        m1: &[u8],
    ) -> Result<(), Error> {
        if m0.len() * 8 != self.l {
            return Err(Error::InvalidSize(m0.len() * 8));
        }
        if m1.len() * 8 != self.l {
            return Err(Error::InvalidSize(m1.len() * 8));
        }
        if self.cur_pair == self.m {
            self.preprocess(channel, rng).await?;
        }
        let smod = recv_vec_from::<u8>(channel, self.p_to, "ot select", 1).await?[0];
        let (y0, y1) = match smod {
            0 => (
                xor_bytes(m0, &self.z0[self.cur_pair])?,
                xor_bytes(m1, &self.z1[self.cur_pair])?,
            ),
            1 => (
                xor_bytes(m1, &self.z0[self.cur_pair])?,
                xor_bytes(m0, &self.z1[self.cur_pair])?,
            ),
            smod => {
                return Err(Error::ProtocolMismatch(format!(
                    "unexpected selector value {smod}"
                )))
            }
        };
        send_to(channel, self.p_to, "ot transfer", &y0).await?;
        send_to(channel, self.p_to, "ot transfer", &y1).await?;
        self.cur_pair += 1;
        Ok(())
    }
}

/// The receiving side of the OT extension.
///
/// Holds the random choice vector `r` and the matrix `T` of the current
/// batch; row `j` of `T` answers transfer `j`.
pub struct ExtendReceiver<OT: OtSender> {
    base: OT,
    p_to: usize,
    k: usize,
    l: usize,
    m: usize,
    r: Vec<u8>,
    t: BitMatrix,
    cur_pair: usize,
}

impl<OT: OtSender> ExtendReceiver<OT> {
    /// Creates a receiver with the same parameters as the paired
    /// [`ExtendSender::new`] call.
    pub async fn new<C: Channel, RNG: CryptoRng + Rng>(
        channel: &C,
        rng: &mut RNG,
        p_to: usize,
        k: usize,
        l: usize,
        m: usize,
    ) -> Result<Self, Error> {
        check_params(k, l, m)?;
        let base = OT::init(channel, rng, p_to).await?;
        Ok(Self {
            base,
            p_to,
            k,
            l,
            m,
            r: vec![],
            t: BitMatrix::new(m, k)?,
            cur_pair: m,
        })
    }

    async fn preprocess<C: Channel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        rng: &mut RNG,
    ) -> Result<(), Error> {
        debug!(m = self.m, "pre-processing OT extension receiver");
        self.cur_pair = 0;
        let mut r = vec![0u8; self.m / 8];
        random_bits(rng, &mut r)?;
        self.t.randomize(rng)?;
        let tt = self.t.transpose();
        let mut inputs = Vec::with_capacity(self.k);
        for i in 0..self.k {
            let column = tt.row(i).to_vec();
            let masked = xor_bytes(&column, &r)?;
            inputs.push((column, masked));
        }
        self.base.send(channel, rng, self.p_to, &inputs).await?;
        self.r = r;
        Ok(())
    }

    /// Receives the message selected by `s` from the paired
    /// [`ExtendSender::send`] call.
    pub async fn receive<C: Channel, RNG: CryptoRng + Rng>(
        &mut self,
        channel: &C,
        rng: &mut RNG,
        s: bool,
    ) -> Result<Vec<u8>, Error> {
        if self.cur_pair == self.m {
            self.preprocess(channel, rng).await?;
        }
        let r_bit = get_bit(&self.r, self.cur_pair);
        let smod = s as u8 ^ r_bit;
        send_to(channel, self.p_to, "ot select", &[smod]).await?;
        let y0 = recv_vec_from::<u8>(channel, self.p_to, "ot transfer", self.l / 8).await?;
        let y1 = recv_vec_from::<u8>(channel, self.p_to, "ot transfer", self.l / 8).await?;
        let y = if r_bit == 1 { y1 } else { y0 };
        let pad = random_oracle(self.t.row(self.cur_pair), self.l)?;
        let w = xor_bytes(&y, &pad)?;
        self.cur_pair += 1;
        Ok(w)
    }
}
