//! Minimal Solidity ABI encoding for the registry contracts
//!
//! Covers exactly the argument and return types the registries use:
//! `bytes32`, `address`, `bool`, unsigned integers up to 128 bits and a
//! single trailing `string`.

use crate::{Error, Result};
use sha3::{Digest, Keccak256};

/// One 32-byte ABI word
pub type Word = [u8; 32];

/// Function selector: first four bytes of keccak256 of the signature
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

fn uint_word(value: u128) -> Word {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Call argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Any static 32-byte value
    Word(Word),
    /// Dynamic UTF-8 string
    String(String),
}

impl Token {
    /// Unsigned integer
    pub fn uint(value: u128) -> Self {
        Token::Word(uint_word(value))
    }

    /// Boolean
    pub fn bool(value: bool) -> Self {
        Token::uint(u128::from(value))
    }

    /// Address (`0x` + 40 hex), left-padded
    pub fn address(address: &str) -> Result<Self> {
        let normalized = crate::types::normalize_address(address)?;
        let bytes = hex::decode(&normalized[2..])
            .map_err(|e| Error::Validation(format!("Invalid address hex: {}", e)))?;
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&bytes);
        Ok(Token::Word(word))
    }

    /// `bytes32` from `0x` + 64 hex
    pub fn bytes32(hash: &str) -> Result<Self> {
        crate::types::validate_hash(hash)?;
        let bytes = hex::decode(&hash[2..])
            .map_err(|e| Error::Validation(format!("Invalid hash hex: {}", e)))?;
        let mut word = [0u8; 32];
        word.copy_from_slice(&bytes);
        Ok(Token::Word(word))
    }

    /// String
    pub fn string(value: &str) -> Self {
        Token::String(value.to_string())
    }
}

/// Encode a call: selector, head words, then dynamic tails
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * 32;
    let mut head = Vec::with_capacity(4 + head_len);
    let mut tail = Vec::new();
    head.extend_from_slice(&selector(signature));

    for token in tokens {
        match token {
            Token::Word(word) => head.extend_from_slice(word),
            Token::String(s) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
                tail.extend_from_slice(&uint_word(s.len() as u128));
                tail.extend_from_slice(s.as_bytes());
                let padding = (32 - s.len() % 32) % 32;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Reader over ABI-encoded return data
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Wrap raw return data
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word_at(&self, offset: usize) -> Result<&'a [u8]> {
        self.data
            .get(offset..offset + 32)
            .ok_or_else(|| Error::Abi(format!("Return data too short for word at byte {}", offset)))
    }

    /// Raw word `index`
    pub fn word(&self, index: usize) -> Result<&'a [u8]> {
        self.word_at(index * 32)
    }

    /// Unsigned integer in word `index`; fails above 128 bits
    pub fn uint(&self, index: usize) -> Result<u128> {
        Self::to_uint(self.word(index)?)
    }

    fn to_uint(word: &[u8]) -> Result<u128> {
        if word[..16].iter().any(|b| *b != 0) {
            return Err(Error::Abi("Integer exceeds 128 bits".to_string()));
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(bytes))
    }

    /// Boolean in word `index`
    pub fn bool(&self, index: usize) -> Result<bool> {
        match self.uint(index)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::Abi(format!("Invalid bool value {}", other))),
        }
    }

    /// `bytes32` in word `index` as `0x` + 64 hex
    pub fn bytes32(&self, index: usize) -> Result<String> {
        Ok(format!("0x{}", hex::encode(self.word(index)?)))
    }

    /// Dynamic string whose offset is in word `index`
    pub fn string(&self, index: usize) -> Result<String> {
        let offset = usize::try_from(self.uint(index)?)
            .map_err(|_| Error::Abi("String offset out of range".to_string()))?;
        let len = usize::try_from(Self::to_uint(self.word_at(offset)?)?)
            .map_err(|_| Error::Abi("String length out of range".to_string()))?;
        let start = offset + 32;
        let bytes = self
            .data
            .get(start..start + len)
            .ok_or_else(|| Error::Abi("String data truncated".to_string()))?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Abi(format!("String is not UTF-8: {}", e)))
    }
}
