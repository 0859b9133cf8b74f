//! RSA public-key operation and PKCS#1 v1.5 block-type-1 unpadding.

use num_bigint::BigUint;
use sectls_crypto::{Error, Result, RsaPublicKey};
use zeroize::{Zeroize, Zeroizing};

/// Minimum number of `0xff` padding bytes in an EMSA-PKCS1-v1_5 block.
const MIN_PADDING_LEN: usize = 8;

/// Raise `signature` to the public exponent and unpad the result.
pub(crate) fn public_decrypt(
    key: &RsaPublicKey,
    signature: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let k = key.modulus_len();
    if k < MIN_PADDING_LEN + 3 || key.exponent().is_empty() {
        return Err(Error::InvalidPublicKey);
    }
    if signature.len() != k {
        return Err(Error::InvalidSignature);
    }

    let n = BigUint::from_bytes_be(key.modulus());
    let e = BigUint::from_bytes_be(key.exponent());
    let s = BigUint::from_bytes_be(signature);
    if s >= n {
        return Err(Error::InvalidSignature);
    }

    let mut m = s.modpow(&e, &n).to_bytes_be();
    let mut block = Zeroizing::new(vec![0u8; k]);
    block[k - m.len()..].copy_from_slice(&m);
    m.zeroize();

    unpad_type1(&block)
}

/// Strip `00 01 FF.. 00` from an encoded block of modulus length.
fn unpad_type1(block: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if block.len() < 2 || block[0] != 0x00 || block[1] != 0x01 {
        return Err(Error::InvalidPadding);
    }

    let mut pos = 2;
    while pos < block.len() && block[pos] == 0xff {
        pos += 1;
    }
    if pos - 2 < MIN_PADDING_LEN || pos >= block.len() || block[pos] != 0x00 {
        return Err(Error::InvalidPadding);
    }

    Ok(Zeroizing::new(block[pos + 1..].to_vec()))
}
