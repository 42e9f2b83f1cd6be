// src/encode/huffman.rs

//! Huffman coding of quantized subband symbols.
//!
//! A table is built fresh from the exact symbol multiset of one channel.
//! The merge tree lives in an arena of index-addressed nodes; ties in the
//! priority queue are broken by arena index, so the same multiset always
//! yields the same table. The payload is a plain concatenation of
//! codewords in a `BitVec<u8, Msb0>` and carries no terminator: the decoder
//! must be told how many symbols to read.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::fmt;

use bitvec::prelude::*;
use log::debug;

use crate::utils::error::{CodecError, Result};

/// Packed bit payload, most significant bit of each byte first.
pub type Bitstream = BitVec<u8, Msb0>;

/// Longest codeword a table may hold.
pub const MAX_CODE_LEN: u8 = 64;

/// A variable-length codeword: the low `len` bits of `bits`, first bit most significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Codeword {
    bits: u64,
    len: u8,
}

impl Codeword {
    pub fn new(bits: u64, len: u8) -> Result<Self> {
        if len == 0 || len > MAX_CODE_LEN {
            return Err(CodecError::CorruptStream(format!(
                "codeword length {} outside 1..={}",
                len, MAX_CODE_LEN
            )));
        }
        if len < 64 && bits >> len != 0 {
            return Err(CodecError::CorruptStream(format!(
                "codeword bits {:#x} do not fit in {} bits",
                bits, len
            )));
        }
        Ok(Codeword { bits, len })
    }

    const EMPTY: Codeword = Codeword { bits: 0, len: 0 };

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn push(self, bit: bool) -> Self {
        Codeword {
            bits: (self.bits << 1) | bit as u64,
            len: self.len + 1,
        }
    }

    /// Bit `i` counted from the first transmitted bit.
    #[inline]
    pub fn bit(&self, i: u8) -> bool {
        (self.bits >> (self.len - 1 - i)) & 1 == 1
    }

    /// True if `self` is a (non-strict) prefix of `other`.
    pub fn is_prefix_of(&self, other: &Codeword) -> bool {
        if self.len == 0 {
            return true;
        }
        self.len <= other.len && other.bits >> (other.len - self.len) == self.bits
    }

    /// Left-aligned value, for lexicographic ordering.
    fn aligned(&self) -> u64 {
        self.bits << (64 - self.len as u32)
    }
}

impl fmt::Display for Codeword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len {
            f.write_str(if self.bit(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Node in the merge-tree arena.
#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(i32),
    Internal { left: usize, right: usize },
}

/// Symbol-to-codeword table together with its inverse.
#[derive(Debug, Clone, PartialEq)]
pub struct HuffmanTable {
    codes: HashMap<i32, Codeword>,
    reverse: HashMap<Codeword, i32>,
    max_len: u8,
}

impl HuffmanTable {
    /// Builds a table from the symbol multiset `symbols`.
    pub fn build(symbols: &[i32]) -> Result<Self> {
        let mut frequencies = BTreeMap::new();
        for &s in symbols {
            *frequencies.entry(s).or_insert(0u64) += 1;
        }
        Self::from_frequencies(&frequencies)
    }

    /// Builds a table from symbol counts.
    pub fn from_frequencies(frequencies: &BTreeMap<i32, u64>) -> Result<Self> {
        if frequencies.is_empty() {
            return Err(CodecError::EmptyInput);
        }

        if frequencies.len() == 1 {
            let (&symbol, _) = frequencies.iter().next().ok_or(CodecError::EmptyInput)?;
            return Self::from_entries([(symbol, Codeword { bits: 0, len: 1 })]);
        }

        // Leaves enter the arena in ascending symbol order; the arena index
        // doubles as the tie-breaking rank.
        let mut arena: Vec<Node> = Vec::with_capacity(frequencies.len() * 2 - 1);
        let mut heap = BinaryHeap::with_capacity(frequencies.len());
        for (&symbol, &freq) in frequencies {
            heap.push(Reverse((freq, arena.len())));
            arena.push(Node::Leaf(symbol));
        }

        while heap.len() > 1 {
            let (Some(Reverse((fa, a))), Some(Reverse((fb, b)))) = (heap.pop(), heap.pop()) else {
                break;
            };
            heap.push(Reverse((fa + fb, arena.len())));
            arena.push(Node::Internal { left: b, right: a });
        }
        let root = match heap.pop() {
            Some(Reverse((_, root))) => root,
            None => return Err(CodecError::EmptyInput),
        };

        let mut entries = Vec::with_capacity(frequencies.len());
        let mut stack = vec![(root, Codeword::EMPTY)];
        while let Some((index, code)) = stack.pop() {
            match arena[index] {
                Node::Leaf(symbol) => entries.push((symbol, code)),
                Node::Internal { left, right } => {
                    if code.len >= MAX_CODE_LEN {
                        return Err(CodecError::InvalidArgument(format!(
                            "symbol distribution needs codewords longer than {} bits",
                            MAX_CODE_LEN
                        )));
                    }
                    stack.push((right, code.push(true)));
                    stack.push((left, code.push(false)));
                }
            }
        }

        let table = Self::from_entries(entries)?;
        debug!(
            "built Huffman table: {} symbols, max codeword {} bits",
            table.len(),
            table.max_len
        );
        Ok(table)
    }

    /// Rebuilds a table from `(symbol, codeword)` pairs, e.g. after
    /// deserialization. Rejects duplicates and non-prefix-free sets.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i32, Codeword)>,
    {
        let mut codes = HashMap::new();
        let mut reverse = HashMap::new();
        let mut max_len = 0;
        for (symbol, code) in entries {
            if code.is_empty() || code.len > MAX_CODE_LEN {
                return Err(CodecError::CorruptStream(format!(
                    "symbol {} has an invalid codeword length {}",
                    symbol, code.len
                )));
            }
            if codes.insert(symbol, code).is_some() {
                return Err(CodecError::CorruptStream(format!(
                    "symbol {} appears twice in the code table",
                    symbol
                )));
            }
            if reverse.insert(code, symbol).is_some() {
                return Err(CodecError::CorruptStream(format!(
                    "codeword {} is assigned twice",
                    code
                )));
            }
            max_len = max_len.max(code.len);
        }
        if codes.is_empty() {
            return Err(CodecError::EmptyInput);
        }
        let table = HuffmanTable {
            codes,
            reverse,
            max_len,
        };
        if !table.is_prefix_free() {
            return Err(CodecError::CorruptStream(
                "code table is not prefix-free".to_string(),
            ));
        }
        Ok(table)
    }

    pub fn get_code(&self, symbol: i32) -> Option<Codeword> {
        self.codes.get(&symbol).copied()
    }

    pub fn symbol_for(&self, code: &Codeword) -> Option<i32> {
        self.reverse.get(code).copied()
    }

    /// Length of the longest codeword.
    pub fn max_code_len(&self) -> u8 {
        self.max_len
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// All entries, sorted by symbol.
    pub fn entries(&self) -> Vec<(i32, Codeword)> {
        let mut entries: Vec<_> = self.codes.iter().map(|(&s, &c)| (s, c)).collect();
        entries.sort_unstable_by_key(|&(s, _)| s);
        entries
    }

    /// True if no codeword is a prefix of another.
    pub fn is_prefix_free(&self) -> bool {
        // In lexicographic order a prefix sits directly before one of the
        // words it prefixes.
        let mut words: Vec<Codeword> = self.codes.values().copied().collect();
        words.sort_unstable_by_key(|c| (c.aligned(), c.len));
        words.windows(2).all(|w| !w[0].is_prefix_of(&w[1]))
    }
}

/// Builds a code table from a symbol sequence.
pub fn build_table(symbols: &[i32]) -> Result<HuffmanTable> {
    HuffmanTable::build(symbols)
}

/// Concatenates the codewords of `symbols` in input order.
pub fn encode(symbols: &[i32], table: &HuffmanTable) -> Result<Bitstream> {
    let mut bits = Bitstream::with_capacity(symbols.len() * table.max_len.max(1) as usize / 2);
    for &symbol in symbols {
        let code = table
            .get_code(symbol)
            .ok_or(CodecError::UnknownSymbol(symbol))?;
        for i in 0..code.len {
            bits.push(code.bit(i));
        }
    }
    Ok(bits)
}

/// Decodes exactly `expected` symbols from `bits`.
///
/// Bits after the last expected symbol are ignored.
pub fn decode(bits: &BitSlice<u8, Msb0>, table: &HuffmanTable, expected: usize) -> Result<Vec<i32>> {
    // Every symbol costs at least one bit.
    let mut out = Vec::with_capacity(expected.min(bits.len()));
    if expected == 0 {
        return Ok(out);
    }

    let mut candidate = Codeword::EMPTY;
    for bit in bits.iter().by_vals() {
        candidate = candidate.push(bit);
        if let Some(symbol) = table.symbol_for(&candidate) {
            out.push(symbol);
            if out.len() == expected {
                return Ok(out);
            }
            candidate = Codeword::EMPTY;
        } else if candidate.len >= table.max_len {
            return Err(CodecError::CorruptStream(format!(
                "no codeword matches {} after {} symbols",
                candidate,
                out.len()
            )));
        }
    }

    Err(CodecError::TruncatedStream {
        decoded: out.len(),
        expected,
    })
}
