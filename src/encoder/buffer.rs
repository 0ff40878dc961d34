use super::EncodeError;

/// Default capacity in words. Generous for a single guest instruction.
pub const DEFAULT_CAPACITY: usize = 512;

/// Append-only stream of host instruction words for one routine.
///
/// The buffer has a fixed word capacity; emitting beyond it is an error rather than a
/// silent reallocation. Words are only rewritten through [`CodeBuffer::patch`], which
/// is reserved for literal slots and forward branch offsets of the routine itself.
/// [`CodeBuffer::finalize`] consumes the buffer and hands the words to their owner.
#[derive(Debug, Clone)]
pub struct CodeBuffer {
    words: Vec<u32>,
    capacity: usize,
}

impl CodeBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            words: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Index of the next word to be emitted.
    #[inline]
    pub fn offset(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.words.len()
    }

    pub fn emit(&mut self, word: u32) -> Result<(), EncodeError> {
        if self.words.len() >= self.capacity {
            return Err(EncodeError::BufferFull { capacity: self.capacity });
        }
        self.words.push(word);
        Ok(())
    }

    /// Overwrite an already emitted word.
    pub fn patch(&mut self, index: usize, word: u32) -> Result<(), EncodeError> {
        let len = self.words.len();
        let slot = self
            .words
            .get_mut(index)
            .ok_or(EncodeError::PatchOutOfRange { index, len })?;
        *slot = word;
        Ok(())
    }

    #[inline]
    pub fn read(&self, index: usize) -> Option<u32> {
        self.words.get(index).copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.words
    }

    /// Close the stream and take the words.
    pub fn finalize(self) -> Vec<u32> {
        self.words
    }
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
