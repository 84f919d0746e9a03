//! The hash function instantiating the random oracle of the OT extension.

use sha3::{
    digest::{ExtendableOutput, Update},
    Shake256,
};

use crate::error::Error;

/// Derives `out_bits / 8` pseudorandom bytes from `input` with a SHA-3 XOF.
///
/// `out_bits` must be a positive multiple of 8. The output is read directly
/// from the XOF, so calls with the same input but different lengths agree on
/// their common prefix.
pub fn random_oracle(input: &[u8], out_bits: usize) -> Result<Vec<u8>, Error> {
    if out_bits == 0 || out_bits % 8 != 0 {
        return Err(Error::InvalidSize(out_bits));
    }
    let mut hasher = Shake256::default();
    hasher.update(input);
    let mut output = vec![0u8; out_bits / 8];
    hasher.finalize_xof_into(&mut output);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_with_requested_length() {
        let a = random_oracle(b"query", 128).unwrap();
        let b = random_oracle(b"query", 128).unwrap();
        assert_eq!(a.len(), 16);
        assert_eq!(a, b);
        let c = random_oracle(b"other", 128).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_invalid_output_sizes() {
        assert!(matches!(random_oracle(b"x", 0), Err(Error::InvalidSize(0))));
        assert!(matches!(
            random_oracle(b"x", 12),
            Err(Error::InvalidSize(12))
        ));
    }
}
