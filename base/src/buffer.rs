//! Transfers between 36-bit words and 8-bit byte streams.
//!
//! Disk and tape media hold words in the packed 9-8 format: each
//! consecutive pair of words W1, W2 occupies exactly nine bytes
//! (72 bits) B0..B8:
//!
//! <pre>
//! B0..B3   W1 bits 35..4
//! B4       W1 bits 3..0 (high nibble), W2 bits 35..32 (low nibble)
//! B5..B8   W2 bits 31..0
//! </pre>
//!
//! Because words only ever travel in pairs, every transfer must
//! cover an even number of words.
use super::error::PackingError;
use super::word36::Word36;


/// Number of bytes occupied by a pair of packed words.
pub const BYTES_PER_WORD_PAIR: usize = 9;

/// Block sizes (in words) used for disk and tape transfers.  The
/// packed size of each is a little smaller than the power-of-two byte
/// block which carries it on a host file; the remainder is slop.
pub const STANDARD_BLOCK_SIZES: [usize; 7] = [28, 56, 112, 224, 448, 896, 1792];

/// The host block size (in bytes) which carries a packed block of
/// `words` words, if `words` is one of the standard block sizes.
#[must_use]
pub fn host_block_bytes(words: usize) -> Option<usize> {
    STANDARD_BLOCK_SIZES
        .iter()
        .position(|size| *size == words)
        .map(|index| 128 << index)
}

/// The number of bytes which `word_count` words occupy when packed.
/// `word_count` must be even for the result to be meaningful.
#[must_use]
pub const fn packed_len(word_count: usize) -> usize {
    word_count * BYTES_PER_WORD_PAIR / 2
}

fn check_even(word_count: usize) -> Result<(), PackingError> {
    if word_count % 2 == 0 {
        Ok(())
    } else {
        Err(PackingError::LengthNotEven(word_count))
    }
}

fn check_range(
    buffer: &'static str,
    offset: usize,
    needed: usize,
    available: usize,
) -> Result<(), PackingError> {
    match offset.checked_add(needed) {
        Some(end) if end <= available => Ok(()),
        _ => Err(PackingError::RangeExceedsBuffer {
            buffer,
            offset,
            needed,
            available,
        }),
    }
}

/// Pack one pair of words into nine bytes.
fn pack_pair(w1: Word36, w2: Word36, out: &mut [u8]) {
    let (v1, v2) = (w1.w(), w2.w());
    out[0] = (v1 >> 28) as u8;
    out[1] = (v1 >> 20) as u8;
    out[2] = (v1 >> 12) as u8;
    out[3] = (v1 >> 4) as u8;
    out[4] = (((v1 & 0xF) << 4) | (v2 >> 32)) as u8;
    out[5] = (v2 >> 24) as u8;
    out[6] = (v2 >> 16) as u8;
    out[7] = (v2 >> 8) as u8;
    out[8] = v2 as u8;
}

/// Unpack nine bytes into a pair of words.
fn unpack_pair(bytes: &[u8]) -> (Word36, Word36) {
    let b = |i: usize| u64::from(bytes[i]);
    let v1 = (b(0) << 28) | (b(1) << 20) | (b(2) << 12) | (b(3) << 4) | (b(4) >> 4);
    let v2 = ((b(4) & 0xF) << 32) | (b(5) << 24) | (b(6) << 16) | (b(7) << 8) | b(8);
    (Word36::new(v1), Word36::new(v2))
}

/// An ordered, growable sequence of words which can be transferred
/// to and from byte arrays in the packed format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Word36Buffer {
    words: Vec<Word36>,
}

impl Word36Buffer {
    /// A buffer of `len` positive-zero words.
    #[must_use]
    pub fn new(len: usize) -> Word36Buffer {
        Word36Buffer {
            words: vec![Word36::ZERO; len],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Word36> {
        self.words.get(index).copied()
    }

    /// Store a word; returns `false` (and changes nothing) when
    /// `index` is out of range.
    pub fn set(&mut self, index: usize, value: Word36) -> bool {
        match self.words.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Word36] {
        &self.words
    }

    pub fn as_mut_slice(&mut self) -> &mut [Word36] {
        &mut self.words
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Word36> {
        self.words
    }

    /// Encode `word_count` words starting at `src_word_offset` into
    /// `dst` starting at `dst_byte_offset`.  Returns the number of
    /// bytes written, which is `word_count * 9 / 2`.
    ///
    /// # Errors
    ///
    /// Fails, leaving `dst` untouched, when `word_count` is odd or
    /// when either extent runs off the end of its buffer.
    pub fn pack_into(
        &self,
        src_word_offset: usize,
        word_count: usize,
        dst: &mut [u8],
        dst_byte_offset: usize,
    ) -> Result<usize, PackingError> {
        check_even(word_count)?;
        check_range("word", src_word_offset, word_count, self.words.len())?;
        let byte_count = packed_len(word_count);
        check_range("byte", dst_byte_offset, byte_count, dst.len())?;

        let src = &self.words[src_word_offset..src_word_offset + word_count];
        let out = &mut dst[dst_byte_offset..dst_byte_offset + byte_count];
        for (pair, chunk) in src
            .chunks_exact(2)
            .zip(out.chunks_exact_mut(BYTES_PER_WORD_PAIR))
        {
            pack_pair(pair[0], pair[1], chunk);
        }
        Ok(byte_count)
    }

    /// Decode `word_count` words from `src` (starting at
    /// `src_byte_offset`) into this buffer starting at
    /// `dst_word_offset`.  Returns the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Fails, leaving the buffer untouched, when `word_count` is odd
    /// or when either extent runs off the end of its buffer.
    pub fn unpack_from(
        &mut self,
        src: &[u8],
        src_byte_offset: usize,
        word_count: usize,
        dst_word_offset: usize,
    ) -> Result<usize, PackingError> {
        check_even(word_count)?;
        let byte_count = packed_len(word_count);
        check_range("byte", src_byte_offset, byte_count, src.len())?;
        check_range("word", dst_word_offset, word_count, self.words.len())?;

        let input = &src[src_byte_offset..src_byte_offset + byte_count];
        let dst = &mut self.words[dst_word_offset..dst_word_offset + word_count];
        for (chunk, pair) in input
            .chunks_exact(BYTES_PER_WORD_PAIR)
            .zip(dst.chunks_exact_mut(2))
        {
            let (w1, w2) = unpack_pair(chunk);
            pair[0] = w1;
            pair[1] = w2;
        }
        Ok(byte_count)
    }
}

impl From<Vec<Word36>> for Word36Buffer {
    fn from(words: Vec<Word36>) -> Word36Buffer {
        Word36Buffer { words }
    }
}

impl From<&[Word36]> for Word36Buffer {
    fn from(words: &[Word36]) -> Word36Buffer {
        Word36Buffer {
            words: words.to_vec(),
        }
    }
}

/// Pack a whole slice of words.
///
/// # Errors
///
/// Fails when the slice holds an odd number of words.
pub fn pack_words(words: &[Word36]) -> Result<Vec<u8>, PackingError> {
    check_even(words.len())?;
    let mut out = vec![0_u8; packed_len(words.len())];
    for (pair, chunk) in words
        .chunks_exact(2)
        .zip(out.chunks_exact_mut(BYTES_PER_WORD_PAIR))
    {
        pack_pair(pair[0], pair[1], chunk);
    }
    Ok(out)
}

/// Unpack a whole byte slice.
///
/// # Errors
///
/// Fails when the slice length is not a multiple of nine.
pub fn unpack_bytes(bytes: &[u8]) -> Result<Vec<Word36>, PackingError> {
    if bytes.len() % BYTES_PER_WORD_PAIR != 0 {
        return Err(PackingError::NotWholeBlocks(bytes.len()));
    }
    let mut words = Vec::with_capacity(bytes.len() / BYTES_PER_WORD_PAIR * 2);
    for chunk in bytes.chunks_exact(BYTES_PER_WORD_PAIR) {
        let (w1, w2) = unpack_pair(chunk);
        words.push(w1);
        words.push(w2);
    }
    Ok(words)
}
