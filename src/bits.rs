//! Bit vectors and bit matrices with row-major byte packing.
//!
//! Bit `i` of a byte slice lives in byte `i / 8` at position `i % 8`, counted
//! from the least significant bit. Both parties of a protocol must agree on
//! this convention bit-for-bit, so every layer of this crate uses the helpers
//! here instead of rolling its own indexing.

use rand::{CryptoRng, RngCore};

use crate::error::Error;

/// XORs `b` into `a` in place.
///
/// # Panics
/// If `b` is shorter than `a`.
pub fn xor_inplace(a: &mut [u8], b: &[u8]) {
    a.iter_mut().zip(b).for_each(|(a, b)| {
        *a ^= *b;
    });
}

/// Returns `a ^ b` as a new vector, failing if the lengths differ.
pub fn xor_bytes(a: &[u8], b: &[u8]) -> Result<Vec<u8>, Error> {
    if a.len() != b.len() {
        return Err(Error::ProtocolMismatch(format!(
            "cannot XOR byte strings of lengths {} and {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter().zip(b).map(|(a, b)| a ^ b).collect())
}

/// Returns bit `i` of the little-endian packed byte slice.
pub fn get_bit(bytes: &[u8], i: usize) -> u8 {
    (bytes[i / 8] >> (i % 8)) & 1
}

/// Sets bit `i` of the little-endian packed byte slice to `b`.
pub fn set_bit(bytes: &mut [u8], i: usize, b: u8) {
    if b == 1 {
        bytes[i / 8] |= 1 << (i % 8);
    } else {
        bytes[i / 8] &= !(1 << (i % 8));
    }
}

/// Fills the slice with bytes from the OS CSPRNG.
pub fn random_bits<R: RngCore + CryptoRng>(rng: &mut R, bytes: &mut [u8]) -> Result<(), Error> {
    rng.try_fill_bytes(bytes).map_err(|_| Error::RandomnessFailure)
}

/// A two-dimensional bit array with row-major byte packing.
///
/// Both dimensions must be multiples of 8 so that every row starts at a byte
/// boundary and can be handed out as a plain byte slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl BitMatrix {
    /// Creates an all-zero matrix of the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Result<Self, Error> {
        if rows == 0 || rows % 8 != 0 {
            return Err(Error::InvalidSize(rows));
        }
        if cols == 0 || cols % 8 != 0 {
            return Err(Error::InvalidSize(cols));
        }
        Ok(BitMatrix {
            rows,
            cols,
            data: vec![0; rows * cols / 8],
        })
    }

    /// The number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns row `i` as a byte slice of length `cols / 8`.
    pub fn row(&self, i: usize) -> &[u8] {
        let w = self.cols / 8;
        &self.data[i * w..(i + 1) * w]
    }

    /// Overwrites row `i`, failing if `bytes` does not hold exactly `cols` bits.
    pub fn set_row(&mut self, i: usize, bytes: &[u8]) -> Result<(), Error> {
        let w = self.cols / 8;
        if bytes.len() != w {
            return Err(Error::InvalidSize(bytes.len() * 8));
        }
        self.data[i * w..(i + 1) * w].copy_from_slice(bytes);
        Ok(())
    }

    /// Overwrites the matrix with uniformly random bits.
    pub fn randomize<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<(), Error> {
        random_bits(rng, &mut self.data)
    }

    /// Returns the transposed matrix, so that `t.row(j)` is column `j` of `self`.
    pub fn transpose(&self) -> BitMatrix {
        let mut out = BitMatrix {
            rows: self.cols,
            cols: self.rows,
            data: vec![0; self.data.len()],
        };
        for r in 0..self.rows {
            for c in 0..self.cols {
                if get_bit(self.row(r), c) == 1 {
                    set_bit(&mut out.data, c * self.rows + r, 1);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::OsRng;

    use super::*;

    #[test]
    fn bit_indexing_is_lsb_first() {
        let bytes = [0b0000_0010u8, 0b1000_0000];
        assert_eq!(get_bit(&bytes, 0), 0);
        assert_eq!(get_bit(&bytes, 1), 1);
        assert_eq!(get_bit(&bytes, 15), 1);
        let mut bytes = [0u8; 2];
        set_bit(&mut bytes, 9, 1);
        assert_eq!(bytes, [0, 0b0000_0010]);
        set_bit(&mut bytes, 9, 0);
        assert_eq!(bytes, [0, 0]);
    }

    #[test]
    fn dimensions_must_be_multiples_of_8() {
        assert!(matches!(BitMatrix::new(12, 8), Err(Error::InvalidSize(12))));
        assert!(matches!(BitMatrix::new(8, 0), Err(Error::InvalidSize(0))));
        assert!(BitMatrix::new(8, 16).is_ok());
    }

    #[test]
    fn transposed_rows_are_source_columns() {
        let mut m = BitMatrix::new(16, 8).unwrap();
        m.randomize(&mut OsRng).unwrap();
        let t = m.transpose();
        for c in 0..m.cols() {
            for r in 0..m.rows() {
                assert_eq!(get_bit(t.row(c), r), get_bit(m.row(r), c));
            }
        }
    }

    proptest! {
        #[test]
        fn double_transpose_is_identity(
            rows in (1usize..8).prop_map(|r| r * 8),
            cols in (1usize..8).prop_map(|c| c * 8),
            seed in any::<u64>(),
        ) {
            use rand::SeedableRng;
            let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(seed);
            let mut m = BitMatrix::new(rows, cols).unwrap();
            m.randomize(&mut rng).unwrap();
            prop_assert_eq!(m.transpose().transpose(), m);
        }
    }
}
