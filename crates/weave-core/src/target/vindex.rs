use std::fmt;

/// Position in the doubled index space of a list
///
/// `2k` is the zero-width gap before real element `k`, `2k + 1` is element
/// `k` itself. A list of `n` elements has virtual positions `0..=2n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualIndex(usize);

impl VirtualIndex {
    /// Gap before real element `index`
    pub fn gap(index: usize) -> Self {
        VirtualIndex(index * 2)
    }

    /// Real element `index`
    pub fn element(index: usize) -> Self {
        VirtualIndex(index * 2 + 1)
    }

    pub fn from_raw(raw: usize) -> Self {
        VirtualIndex(raw)
    }

    pub fn raw(self) -> usize {
        self.0
    }

    pub fn is_gap(self) -> bool {
        self.0 % 2 == 0
    }

    pub fn is_element(self) -> bool {
        !self.is_gap()
    }

    /// Element index for element positions; the following element for gaps
    pub fn real(self) -> usize {
        self.0 / 2
    }

    /// Largest valid position for a list of `len` elements
    pub fn end_of(len: usize) -> Self {
        VirtualIndex::gap(len)
    }
}

impl fmt::Display for VirtualIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_gap() {
            write!(f, "^{}", self.real())
        } else {
            write!(f, "#{}", self.real())
        }
    }
}

/// Real elements covered by the virtual range `[start, end)`
pub fn real_range(start: usize, end: usize) -> std::ops::Range<usize> {
    if end <= start {
        let at = start / 2;
        return at..at;
    }
    start / 2..end / 2
}

/// Whether the virtual range `[start, end)` covers real element `index`
pub fn covers_element(start: usize, end: usize, index: usize) -> bool {
    let position = index * 2 + 1;
    start <= position && position < end
}

/// Whether an edit at `[start, end)` touches the read window `[from, to)`.
///
/// Zero-width edits touch a window when their gap lies inside it, or when
/// the window is the same zero-width gap.
pub fn touches(from: usize, to: usize, start: usize, end: usize) -> bool {
    if real_range(start, end).is_empty() {
        (from <= start && start < to) || (from == to && start == from)
    } else {
        start < to && from < end
    }
}
