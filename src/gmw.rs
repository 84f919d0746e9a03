//! The GMW protocol: boolean MPC over XOR-shared words with precomputed
//! Beaver multiplication triples.
//!
//! Each of the `n` parties holds an XOR share of every logical value; XOR and
//! NOT are local, AND consumes one triple and opens two masked values.
//! Shares come in 1-, 8- and 32-bit widths, all transported in the low bits
//! of a 32-bit carrier word. The ripple-carry adder and the borrow-based
//! subtractor decompose into one communicating AND per bit.

use std::collections::VecDeque;
use std::ops::{BitAnd, BitXor};

use futures::future::try_join_all;
use rand::{CryptoRng, Rng};
use tracing::debug;

use crate::{
    channel::{recv_vec_from, send_to, Channel},
    error::Error,
};

/// A 32-bit multiplication triple share: one party's XOR share of `(a, b, c)`
/// with `c = a & b` across all parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triple(pub(crate) u32, pub(crate) u32, pub(crate) u32);

/// Deals a preprocessing batch of 32-bit triples, XOR-split across `parties`.
///
/// This takes the role of a trusted dealer; the shares of each party must be
/// handed to its [`GmwParty`] before the computation starts.
pub fn deal_triples<RNG: Rng + CryptoRng>(
    rng: &mut RNG,
    parties: usize,
    count: usize,
) -> Result<Vec<Vec<Triple>>, Error> {
    if parties == 0 {
        return Err(Error::InvalidSize(0));
    }
    let mut shares: Vec<Vec<Triple>> = (0..parties).map(|_| Vec::with_capacity(count)).collect();
    for _ in 0..count {
        let a: u32 = rng.gen();
        let b: u32 = rng.gen();
        let c = a & b;
        let a_shares = split(rng, a, parties);
        let b_shares = split(rng, b, parties);
        let c_shares = split(rng, c, parties);
        for (i, party) in shares.iter_mut().enumerate() {
            party.push(Triple(a_shares[i], b_shares[i], c_shares[i]));
        }
    }
    Ok(shares)
}

/// Splits `value` into `parties` random u32 values that XOR to it.
fn split<RNG: Rng + CryptoRng>(rng: &mut RNG, value: u32, parties: usize) -> Vec<u32> {
    let mut shares = vec![0u32; parties];
    let mut first = value;
    for share in shares.iter_mut().skip(1) {
        let r: u32 = rng.gen();
        *share = r;
        first ^= r;
    }
    shares[0] = first;
    shares
}

/// A share word: one party's XOR share of a 1-, 8- or 32-bit logical value.
pub trait Word:
    Copy + Eq + BitXor<Output = Self> + BitAnd<Output = Self> + std::fmt::Debug
{
    /// The width of the word in bits.
    const BITS: usize;
    /// The all-zero word.
    const ZERO: Self;
    /// The all-one word, XORed in by party 0 to negate.
    const ONES: Self;

    /// Bit `i` of the word.
    fn bit(self, i: usize) -> bool;
    /// The word with bit `i` replaced by `b`.
    fn with_bit(self, i: usize, b: bool) -> Self;
    /// Packs the word into the low bits of the 32-bit transport carrier.
    fn into_carrier(self) -> u32;
    /// Unpacks the word from the low bits of the 32-bit transport carrier.
    fn from_carrier(carrier: u32) -> Self;
    /// Pops one triple of this width from the party's pool.
    #[doc(hidden)]
    fn pop_triple<C: Channel>(party: &mut GmwParty<C>) -> Result<(Self, Self, Self), Error>;
}

impl Word for bool {
    const BITS: usize = 1;
    const ZERO: Self = false;
    const ONES: Self = true;

    fn bit(self, _i: usize) -> bool {
        self
    }

    fn with_bit(self, _i: usize, b: bool) -> Self {
        b
    }

    fn into_carrier(self) -> u32 {
        self as u32
    }

    fn from_carrier(carrier: u32) -> Self {
        carrier != 0
    }

    fn pop_triple<C: Channel>(party: &mut GmwParty<C>) -> Result<(Self, Self, Self), Error> {
        party.triple1()
    }
}

impl Word for u8 {
    const BITS: usize = 8;
    const ZERO: Self = 0;
    const ONES: Self = 0xff;

    fn bit(self, i: usize) -> bool {
        (self >> i) & 1 == 1
    }

    fn with_bit(self, i: usize, b: bool) -> Self {
        if b {
            self | (1 << i)
        } else {
            self & !(1 << i)
        }
    }

    fn into_carrier(self) -> u32 {
        self as u32
    }

    fn from_carrier(carrier: u32) -> Self {
        carrier as u8
    }

    fn pop_triple<C: Channel>(party: &mut GmwParty<C>) -> Result<(Self, Self, Self), Error> {
        party.triple8()
    }
}

impl Word for u32 {
    const BITS: usize = 32;
    const ZERO: Self = 0;
    const ONES: Self = 0xffff_ffff;

    fn bit(self, i: usize) -> bool {
        (self >> i) & 1 == 1
    }

    fn with_bit(self, i: usize, b: bool) -> Self {
        if b {
            self | (1 << i)
        } else {
            self & !(1 << i)
        }
    }

    fn into_carrier(self) -> u32 {
        self
    }

    fn from_carrier(carrier: u32) -> Self {
        carrier
    }

    fn pop_triple<C: Channel>(party: &mut GmwParty<C>) -> Result<(Self, Self, Self), Error> {
        party.triple32()
    }
}

/// One party of a GMW computation.
///
/// Owns the party's channel endpoint and its triple pools. 8- and 1-bit
/// triples are carved out of 32-bit ones on demand; every triple is consumed
/// exactly once.
pub struct GmwParty<C: Channel> {
    channel: C,
    id: usize,
    parties: usize,
    triples32: VecDeque<Triple>,
    triples8: VecDeque<(u8, u8, u8)>,
    triples1: VecDeque<(bool, bool, bool)>,
}

impl<C: Channel> GmwParty<C> {
    /// Creates party `id` of `parties`, seeded with its dealt triple shares.
    pub fn new(channel: C, id: usize, parties: usize, triples: Vec<Triple>) -> Self {
        GmwParty {
            channel,
            id,
            parties,
            triples32: VecDeque::from(triples),
            triples8: VecDeque::new(),
            triples1: VecDeque::new(),
        }
    }

    /// The index of this party.
    pub fn id(&self) -> usize {
        self.id
    }

    fn triple32(&mut self) -> Result<(u32, u32, u32), Error> {
        let Triple(a, b, c) = self.triples32.pop_front().ok_or(Error::ExhaustedPool)?;
        Ok((a, b, c))
    }

    fn triple8(&mut self) -> Result<(u8, u8, u8), Error> {
        if let Some(t) = self.triples8.pop_front() {
            return Ok(t);
        }
        let (a, b, c) = self.triple32()?;
        for lane in 0..4 {
            self.triples8.push_back((
                (a >> (8 * lane)) as u8,
                (b >> (8 * lane)) as u8,
                (c >> (8 * lane)) as u8,
            ));
        }
        self.triples8.pop_front().ok_or(Error::ExhaustedPool)
    }

    fn triple1(&mut self) -> Result<(bool, bool, bool), Error> {
        if let Some(t) = self.triples1.pop_front() {
            return Ok(t);
        }
        let (a, b, c) = self.triple32()?;
        for i in 0..32 {
            self.triples1.push_back((
                (a >> i) & 1 == 1,
                (b >> i) & 1 == 1,
                (c >> i) & 1 == 1,
            ));
        }
        self.triples1.pop_front().ok_or(Error::ExhaustedPool)
    }

    /// The share of `value` entering the circuit as party `party`'s input:
    /// the owner contributes the value itself, everyone else zero.
    pub fn input<T: Word>(&self, party: usize, value: T) -> T {
        if self.id == party {
            value
        } else {
            T::ZERO
        }
    }

    /// XOR of two shared words, computed locally.
    pub fn xor<T: Word>(&self, x: T, y: T) -> T {
        x ^ y
    }

    /// Logical NOT of a shared word: party 0 flips its share.
    pub fn not<T: Word>(&self, x: T) -> T {
        if self.id == 0 {
            x ^ T::ONES
        } else {
            x
        }
    }

    /// Bitwise AND of two shared words, consuming one Beaver triple.
    pub async fn and<T: Word>(&mut self, x: T, y: T) -> Result<T, Error> {
        let (a, b, c) = T::pop_triple(self)?;
        let d = self.open(x ^ a).await?;
        let e = self.open(y ^ b).await?;
        let mut z = c ^ (d & b) ^ (e & a);
        if self.id == 0 {
            z = z ^ (d & e);
        }
        Ok(z)
    }

    /// Reconstructs the logical value behind a share: broadcasts the own
    /// share and XORs in the share of every peer. Does not return before all
    /// peers have answered.
    pub async fn open<T: Word>(&self, share: T) -> Result<T, Error> {
        self.broadcast(share).await?;
        let mut result = share;
        for p in 0..self.parties {
            if p == self.id {
                continue;
            }
            result = result ^ self.receive::<T>(p).await?;
        }
        Ok(result)
    }

    /// Sends a value to every peer, without serializing on any single one.
    pub async fn broadcast<T: Word>(&self, value: T) -> Result<(), Error> {
        let msg = [value.into_carrier()];
        debug!(party = self.id, value = format_args!("{:#010x}", msg[0]), "broadcast");
        let sends = (0..self.parties)
            .filter(|p| *p != self.id)
            .map(|p| send_to(&self.channel, p, "gmw open", &msg));
        try_join_all(sends).await?;
        Ok(())
    }

    /// Reads one value from the given peer; a self-receive yields zero.
    pub async fn receive<T: Word>(&self, party: usize) -> Result<T, Error> {
        if party == self.id {
            return Ok(T::ZERO);
        }
        let carrier = recv_vec_from::<u32>(&self.channel, party, "gmw open", 1).await?[0];
        debug!(
            party = self.id,
            from = party,
            value = format_args!("{carrier:#010x}"),
            "received"
        );
        Ok(T::from_carrier(carrier))
    }

    /// Opens the final share of an output wire and logs the result.
    pub async fn output<T: Word>(&self, x: T) -> Result<T, Error> {
        let result = self.open(x).await?;
        debug!(party = self.id, result = ?result, "result");
        Ok(result)
    }

    /// Ripple-carry addition of two shared words, one AND per carry bit.
    pub async fn add<T: Word>(&mut self, a: T, b: T) -> Result<T, Error> {
        let mut result = T::ZERO;
        let mut carry = false;
        for i in 0..T::BITS {
            let ai = a.bit(i);
            let bi = b.bit(i);
            result = result.with_bit(i, ai ^ bi ^ carry);
            if i + 1 < T::BITS {
                carry = carry ^ self.and(ai ^ carry, bi ^ carry).await?;
            }
        }
        Ok(result)
    }

    /// Subtraction `a - b` of two shared words via the borrow recurrence.
    pub async fn sub<T: Word>(&mut self, a: T, b: T) -> Result<T, Error> {
        let a0 = a.bit(0);
        let b0 = b.bit(0);
        let mut result = T::ZERO.with_bit(0, a0 ^ b0);
        let not_a0 = self.not(a0);
        let not_b0 = self.not(b0);
        let mut borrow = a0 ^ self.and(not_a0, not_b0).await?;
        for i in 1..T::BITS {
            let ai = a.bit(i);
            let bi = b.bit(i);
            result = result.with_bit(i, self.not(ai ^ bi ^ borrow));
            borrow = ai ^ self.and(ai ^ borrow, bi ^ borrow).await?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use crate::channel::SimpleChannel;

    use super::*;

    #[test]
    fn dealt_triples_satisfy_the_multiplication_invariant() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let shares = deal_triples(&mut rng, 5, 20).unwrap();
        for j in 0..20 {
            let (mut a, mut b, mut c) = (0u32, 0u32, 0u32);
            for party in &shares {
                let Triple(ai, bi, ci) = party[j];
                a ^= ai;
                b ^= bi;
                c ^= ci;
            }
            assert_eq!(a & b, c);
        }
    }

    #[test]
    fn split_shares_reconstruct_the_value() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let shares = split(&mut rng, 0xdead_beef, 7);
        assert_eq!(shares.len(), 7);
        assert_eq!(shares.iter().fold(0, |acc, s| acc ^ s), 0xdead_beef);
    }

    #[test]
    fn carved_triples_preserve_the_invariant() {
        let mut rng = ChaCha20Rng::seed_from_u64(13);
        let shares = deal_triples(&mut rng, 3, 2).unwrap();
        let channels = SimpleChannel::channels(3);
        let mut parties: Vec<_> = channels
            .into_iter()
            .zip(shares)
            .enumerate()
            .map(|(id, (channel, triples))| GmwParty::new(channel, id, 3, triples))
            .collect();
        for _ in 0..4 {
            let carved: Vec<_> = parties.iter_mut().map(|p| p.triple8().unwrap()).collect();
            let (mut a, mut b, mut c) = (0u8, 0u8, 0u8);
            for (ai, bi, ci) in carved {
                a ^= ai;
                b ^= bi;
                c ^= ci;
            }
            assert_eq!(a & b, c);
        }
        for _ in 0..32 {
            let carved: Vec<_> = parties.iter_mut().map(|p| p.triple1().unwrap()).collect();
            let (mut a, mut b, mut c) = (false, false, false);
            for (ai, bi, ci) in carved {
                a ^= ai;
                b ^= bi;
                c ^= ci;
            }
            assert_eq!(a & b, c);
        }
    }

    #[test]
    fn empty_pool_is_reported() {
        let channels = SimpleChannel::channels(2);
        let mut parties: Vec<_> = channels
            .into_iter()
            .enumerate()
            .map(|(id, channel)| GmwParty::new(channel, id, 2, vec![]))
            .collect();
        assert!(matches!(parties[0].triple32(), Err(Error::ExhaustedPool)));
        assert!(matches!(parties[1].triple1(), Err(Error::ExhaustedPool)));
    }

    #[test]
    fn words_pack_into_the_carrier() {
        assert_eq!(bool::from_carrier(true.into_carrier()), true);
        assert_eq!(u8::from_carrier(0xa5u8.into_carrier()), 0xa5);
        assert_eq!(u32::from_carrier(0xdead_beefu32.into_carrier()), 0xdead_beef);
        assert_eq!(0u8.with_bit(3, true), 0b1000);
        assert_eq!(0xffu8.with_bit(3, false), 0b1111_0111);
        assert!(0x8000_0000u32.bit(31));
    }
}
