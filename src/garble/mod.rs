//! Garbled-circuit construction and evaluation.
//!
//! Wire labels are 128-bit AES blocks. Every wire's two labels differ by a
//! session-global offset whose lowest bit is forced to 1, so XOR gates are
//! free and the least significant bit of a label doubles as its permutation
//! bit. AND/OR gates are garbled with point-and-permute and row reduction:
//! only three of the four ciphertext rows are ever transmitted.
//!
//! [`generate::Garbler`] produces the encrypted tables, [`evaluate::Evaluator`]
//! decrypts exactly one row per gate. Both sides must call the mirrored
//! operations in the same order.

pub mod evaluate;
pub mod generate;

use std::ops::BitXor;

use aes::{
    cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit},
    Aes128,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The size of a wire label in bytes, one AES block.
pub const KEY_SIZE: usize = 16;

/// A wire label, interpreted as an AES block in little-endian byte order.
///
/// The least significant bit is the label's permutation bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key(pub(crate) u128);

impl BitXor for Key {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Key(self.0 ^ rhs.0)
    }
}

impl BitXor<Delta> for Key {
    type Output = Self;

    fn bitxor(self, rhs: Delta) -> Self::Output {
        Key(self.0 ^ rhs.0)
    }
}

impl Key {
    /// Draws a fresh label from the OS CSPRNG.
    pub(crate) fn random() -> Result<Self, Error> {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| Error::RandomnessFailure)?;
        Ok(Key(u128::from_le_bytes(bytes)))
    }

    /// The label's permutation bit.
    pub fn permute_bit(&self) -> u8 {
        (self.0 & 1) as u8
    }
}

/// The secret free-XOR offset between the two labels of every wire.
///
/// Known only to the generator; its lowest bit is always 1, so the two
/// labels of a wire carry opposite permutation bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Delta(pub(crate) u128);

impl Delta {
    pub(crate) fn random() -> Result<Self, Error> {
        let key = Key::random()?;
        Ok(Delta(key.0 | 1))
    }
}

/// A wire: the pair of labels standing for logical 0 and logical 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wire {
    k0: Key,
    k1: Key,
}

impl Wire {
    pub(crate) fn new(k0: Key, delta: Delta) -> Self {
        Wire { k0, k1: k0 ^ delta }
    }

    /// The label encoding the given logical bit.
    pub fn label(&self, bit: bool) -> Key {
        if bit {
            self.k1
        } else {
            self.k0
        }
    }
}

/// The transmitted ciphertext rows of one garbled gate.
///
/// Rows are ordered by the slot index of the input labels that decrypt them;
/// for row-reduced AND/OR gates the all-zero slot-0 row is elided, so the
/// vector holds 3 rows (2 for bit-reveal gates).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarbledTable(pub(crate) Vec<u128>);

impl GarbledTable {
    pub(crate) fn row(&self, i: usize) -> u128 {
        self.0[i]
    }
}

/// The slot index selecting which garbled row a pair of labels decrypts.
pub(crate) fn slot(ka: &Key, kb: &Key) -> usize {
    ((ka.permute_bit() << 1) | kb.permute_bit()) as usize
}

/// AES-128 encryption of one block under one label.
pub(crate) fn encrypt(key: &Key, block: u128) -> u128 {
    let cipher = Aes128::new(GenericArray::from_slice(&key.0.to_le_bytes()));
    let mut block_bytes = *GenericArray::from_slice(&block.to_le_bytes());
    cipher.encrypt_block(&mut block_bytes);
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&block_bytes);
    u128::from_le_bytes(bytes)
}

/// AES-128 decryption of one block under one label.
pub(crate) fn decrypt(key: &Key, block: u128) -> u128 {
    let cipher = Aes128::new(GenericArray::from_slice(&key.0.to_le_bytes()));
    let mut block_bytes = *GenericArray::from_slice(&block.to_le_bytes());
    cipher.decrypt_block(&mut block_bytes);
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&block_bytes);
    u128::from_le_bytes(bytes)
}

/// Double encryption of a plaintext block under a pair of labels.
pub(crate) fn encrypt_pair(ka: &Key, kb: &Key, plain: u128) -> u128 {
    encrypt(kb, encrypt(ka, plain))
}

/// Inverse of [`encrypt_pair`].
pub(crate) fn decrypt_pair(ka: &Key, kb: &Key, ciphertext: u128) -> u128 {
    decrypt(ka, decrypt(kb, ciphertext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt() {
        let ka = Key::random().unwrap();
        let kb = Key::random().unwrap();
        let plain = Key::random().unwrap().0;
        let ct = encrypt_pair(&ka, &kb, plain);
        assert_ne!(ct, plain);
        assert_eq!(decrypt_pair(&ka, &kb, ct), plain);
    }

    #[test]
    fn slot_packs_permute_bits_high_to_low() {
        let k0 = Key(0);
        let k1 = Key(1);
        assert_eq!(slot(&k0, &k0), 0);
        assert_eq!(slot(&k0, &k1), 1);
        assert_eq!(slot(&k1, &k0), 2);
        assert_eq!(slot(&k1, &k1), 3);
    }

    #[test]
    fn delta_always_has_its_low_bit_set() {
        for _ in 0..16 {
            assert_eq!(Delta::random().unwrap().0 & 1, 1);
        }
    }

    #[test]
    fn wire_labels_have_opposite_permute_bits() {
        let delta = Delta::random().unwrap();
        let wire = Wire::new(Key::random().unwrap(), delta);
        assert_eq!(wire.label(false) ^ wire.label(true), Key(delta.0));
        assert_ne!(
            wire.label(false).permute_bit(),
            wire.label(true).permute_bit()
        );
    }
}
