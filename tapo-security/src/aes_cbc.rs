//! AES-128-CBC with PKCS7 padding
//!
//! The secure passthrough envelope encrypts every command with AES-128 in CBC
//! mode. Padding is applied and checked here, outside the block mode, so that
//! padding failures are reported precisely.

use aes::Aes128;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use tapo_core::CryptoError;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// AES-128 key (and CBC IV) size in bytes
pub const KEY_SIZE: usize = 16;

fn check_key_material(key: &[u8], iv: &[u8]) -> Result<(), CryptoError> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyMaterial {
            what: "key",
            len: key.len(),
        });
    }
    if iv.len() != BLOCK_SIZE {
        return Err(CryptoError::InvalidKeyMaterial {
            what: "IV",
            len: iv.len(),
        });
    }
    Ok(())
}

/// Append PKCS7 padding
///
/// Always adds between 1 and 16 bytes; input that is already block aligned
/// receives a full extra block.
pub fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let padding = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(data.len() + padding);
    padded.extend_from_slice(data);
    padded.resize(data.len() + padding, padding as u8);
    padded
}

/// Strip and validate PKCS7 padding
///
/// # Errors
/// Returns [`CryptoError::InvalidPadding`] if the input is empty, the trailing
/// byte is `0` or larger than the block size or the data, or any of the last
/// `p` bytes differs from `p`.
pub fn pkcs7_unpad(data: &[u8]) -> Result<&[u8], CryptoError> {
    let padding = match data.last() {
        Some(&p) => p as usize,
        None => return Err(CryptoError::InvalidPadding),
    };

    if padding == 0 || padding > BLOCK_SIZE || padding > data.len() {
        return Err(CryptoError::InvalidPadding);
    }

    let (content, pad) = data.split_at(data.len() - padding);
    if pad.iter().any(|&b| b as usize != padding) {
        return Err(CryptoError::InvalidPadding);
    }

    Ok(content)
}

/// Encrypt with AES-128-CBC and PKCS7 padding
///
/// # Arguments
/// * `plaintext` - Data to encrypt, any length
/// * `key` - 16-byte AES key
/// * `iv` - 16-byte initialization vector
///
/// # Errors
/// Returns [`CryptoError::InvalidKeyMaterial`] if `key` or `iv` is not 16 bytes.
pub fn encrypt(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_key_material(key, iv)?;

    let mut encryptor =
        Aes128CbcEnc::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
    let mut data = pkcs7_pad(plaintext);
    for block in data.chunks_exact_mut(BLOCK_SIZE) {
        encryptor.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }

    Ok(data)
}

/// Decrypt AES-128-CBC ciphertext and remove PKCS7 padding
///
/// # Errors
/// - [`CryptoError::InvalidKeyMaterial`] if `key` or `iv` is not 16 bytes
/// - [`CryptoError::InvalidCiphertextLength`] if the ciphertext is not block aligned
/// - [`CryptoError::InvalidPadding`] if the decrypted padding is malformed
pub fn decrypt(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_key_material(key, iv)?;
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertextLength(ciphertext.len()));
    }

    let mut decryptor =
        Aes128CbcDec::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
    let mut data = ciphertext.to_vec();
    for block in data.chunks_exact_mut(BLOCK_SIZE) {
        decryptor.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }

    let content_len = pkcs7_unpad(&data)?.len();
    data.truncate(content_len);
    Ok(data)
}
