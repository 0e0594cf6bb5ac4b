//! Index masks select the elements an evaluation writes.

use std::ops::Range;

use crate::error::FieldError;

/// A strictly increasing set of element indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexMask {
    repr: MaskRepr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum MaskRepr {
    /// Every index in a contiguous range.
    Range { start: usize, end: usize },
    /// Explicit sorted, unique indices.
    Indices(Vec<usize>),
}

impl IndexMask {
    pub fn from_range(range: Range<usize>) -> Self {
        let end = range.end.max(range.start);
        IndexMask {
            repr: MaskRepr::Range {
                start: range.start,
                end,
            },
        }
    }

    /// Mask covering `0..size`.
    pub fn full(size: usize) -> Self {
        Self::from_range(0..size)
    }

    /// Build a mask from explicit indices. Indices must be strictly increasing and
    /// addressable, so `usize::MAX` is rejected.
    pub fn from_indices(indices: Vec<usize>) -> Result<Self, FieldError> {
        if indices.last() == Some(&usize::MAX) {
            return Err(FieldError::InvalidMask(
                "index usize::MAX cannot be stored in an array".to_string(),
            ));
        }
        if let Some(pos) = indices.windows(2).position(|w| w[0] >= w[1]) {
            return Err(FieldError::InvalidMask(format!(
                "indices must be strictly increasing, found {} followed by {}",
                indices[pos],
                indices[pos + 1]
            )));
        }
        Ok(IndexMask {
            repr: MaskRepr::Indices(indices),
        })
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            MaskRepr::Range { start, end } => end - start,
            MaskRepr::Indices(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest array length that can hold every masked index.
    pub fn min_array_size(&self) -> usize {
        match &self.repr {
            MaskRepr::Range { start, end } if end > start => *end,
            MaskRepr::Range { .. } => 0,
            MaskRepr::Indices(indices) => indices.last().map_or(0, |last| last + 1),
        }
    }

    pub fn iter(&self) -> MaskIter<'_> {
        match &self.repr {
            MaskRepr::Range { start, end } => MaskIter::Range(*start..*end),
            MaskRepr::Indices(indices) => MaskIter::Indices(indices.iter()),
        }
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

pub enum MaskIter<'a> {
    Range(Range<usize>),
    Indices(std::slice::Iter<'a, usize>),
}

impl Iterator for MaskIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            MaskIter::Range(range) => range.next(),
            MaskIter::Indices(iter) => iter.next().copied(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            MaskIter::Range(range) => range.size_hint(),
            MaskIter::Indices(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for MaskIter<'_> {}
