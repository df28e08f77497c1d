/// Bitmask to track NULL values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMask {
    data: Vec<u8>,
    len: usize,
}

impl BitMask {
    /// Creates a bitmask with all bits set to 0
    pub fn zeros(length: usize) -> Self {
        Self {
            data: vec![0u8; (length + 7) / 8],
            len: length,
        }
    }

    /// Creates a bitmask from a vector of boolean values
    pub fn from_bools(bools: &[bool]) -> Self {
        let mut mask = Self::zeros(bools.len());
        for (i, &is_set) in bools.iter().enumerate() {
            if is_set {
                mask.set(i);
            }
        }
        mask
    }

    /// Sets the bit at `index`; out of range indices are ignored
    pub fn set(&mut self, index: usize) {
        if index < self.len {
            self.data[index / 8] |= 1 << (index % 8);
        }
    }

    /// Checks if a bit is set (false when out of range)
    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        (self.data[index / 8] & (1 << (index % 8))) != 0
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Bitwise AND of two masks of the same length
    pub fn and(&self, other: &BitMask) -> BitMask {
        debug_assert_eq!(self.len, other.len);
        BitMask {
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| a & b)
                .collect(),
            len: self.len.min(other.len),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
