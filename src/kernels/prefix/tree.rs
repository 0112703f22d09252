//! Index-addressed arenas for the prefix coder: the merge tree used to build a
//! minimum-redundancy code, and the decode tree rebuilt from a serialized table.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use super::Codeword;
use crate::error::CodecError;

//==================================================================================
// 1. Heap Construction
//==================================================================================

#[derive(Debug, Clone, Copy)]
enum MergeNode {
    Leaf(u32),
    Internal { left: usize, right: usize },
}

/// Builds codewords by repeatedly merging the two lightest nodes.
///
/// Equal frequencies are ordered by arena index, i.e. creation order, so the
/// result depends only on the frequency map. The first node popped becomes the
/// `0` branch.
pub fn build_heap_codes(
    frequencies: &BTreeMap<u32, u64>,
) -> Result<BTreeMap<u32, Codeword>, CodecError> {
    let mut arena: Vec<MergeNode> = Vec::with_capacity(frequencies.len() * 2);
    let mut heap = BinaryHeap::with_capacity(frequencies.len());

    for (&symbol, &freq) in frequencies {
        heap.push(Reverse((freq, arena.len())));
        arena.push(MergeNode::Leaf(symbol));
    }

    if arena.len() == 1 {
        if let MergeNode::Leaf(symbol) = arena[0] {
            return Ok(BTreeMap::from([(symbol, Codeword { bits: 0, len: 1 })]));
        }
    }

    while heap.len() > 1 {
        let (Some(Reverse((f_left, left))), Some(Reverse((f_right, right)))) =
            (heap.pop(), heap.pop())
        else {
            break;
        };
        heap.push(Reverse((f_left + f_right, arena.len())));
        arena.push(MergeNode::Internal { left, right });
    }

    let Some(Reverse((_, root))) = heap.pop() else {
        return Err(CodecError::InvalidParameterError(
            "cannot build a prefix code from an empty frequency table".to_string(),
        ));
    };

    let mut codes = BTreeMap::new();
    let mut stack = vec![(root, 0u64, 0u8)];
    while let Some((idx, bits, len)) = stack.pop() {
        match arena[idx] {
            MergeNode::Leaf(symbol) => {
                codes.insert(symbol, Codeword { bits, len });
            }
            MergeNode::Internal { left, right } => {
                if len >= 64 {
                    return Err(CodecError::InternalError(
                        "prefix code deeper than 64 bits".to_string(),
                    ));
                }
                stack.push((right, (bits << 1) | 1, len + 1));
                stack.push((left, bits << 1, len + 1));
            }
        }
    }
    Ok(codes)
}

//==================================================================================
// 2. Decode Tree
//==================================================================================

#[derive(Debug, Clone, Copy, Default)]
struct DecodeNode {
    children: [Option<usize>; 2],
    symbol: Option<u32>,
}

/// A binary trie over codewords. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct DecodeTree {
    nodes: Vec<DecodeNode>,
}

impl DecodeTree {
    /// Rebuilds the trie, rejecting tables that are not prefix-free.
    pub fn from_codes(codes: &BTreeMap<u32, Codeword>) -> Result<Self, CodecError> {
        let mut nodes = vec![DecodeNode::default()];
        for (&symbol, code) in codes {
            let mut cursor = 0usize;
            for depth in (0..code.len).rev() {
                if nodes[cursor].symbol.is_some() {
                    return Err(not_prefix_free(symbol));
                }
                let branch = ((code.bits >> depth) & 1) as usize;
                cursor = match nodes[cursor].children[branch] {
                    Some(next) => next,
                    None => {
                        nodes.push(DecodeNode::default());
                        let next = nodes.len() - 1;
                        nodes[cursor].children[branch] = Some(next);
                        next
                    }
                };
            }
            let leaf = &mut nodes[cursor];
            if leaf.symbol.is_some() || leaf.children.iter().any(Option::is_some) {
                return Err(not_prefix_free(symbol));
            }
            leaf.symbol = Some(symbol);
        }
        Ok(Self { nodes })
    }

    /// Walks from the root, pulling one bit per edge from `next_bit`.
    pub fn decode_with<F>(&self, mut next_bit: F) -> Result<u32, CodecError>
    where
        F: FnMut() -> Result<bool, CodecError>,
    {
        let mut cursor = 0usize;
        loop {
            if let Some(symbol) = self.nodes[cursor].symbol {
                return Ok(symbol);
            }
            let branch = usize::from(next_bit()?);
            cursor = self.nodes[cursor].children[branch].ok_or_else(|| {
                CodecError::ConsistencyError("bit path matches no code".to_string())
            })?;
        }
    }
}

fn not_prefix_free(symbol: u32) -> CodecError {
    CodecError::ConsistencyError(format!(
        "code table is not prefix-free at symbol {}",
        symbol
    ))
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn freqs(pairs: &[(u32, u64)]) -> BTreeMap<u32, u64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_heap_code_lengths() {
        let codes = build_heap_codes(&freqs(&[(0, 45), (1, 13), (2, 12), (3, 16), (4, 9), (5, 5)]))
            .unwrap();
        assert_eq!(codes[&0].len, 1);
        assert_eq!(codes[&1].len, 3);
        assert_eq!(codes[&2].len, 3);
        assert_eq!(codes[&3].len, 3);
        assert_eq!(codes[&4].len, 4);
        assert_eq!(codes[&5].len, 4);
    }

    #[test]
    fn test_single_symbol_gets_one_bit_zero() {
        let codes = build_heap_codes(&freqs(&[(7, 100)])).unwrap();
        assert_eq!(codes[&7], Codeword { bits: 0, len: 1 });
    }

    #[test]
    fn test_empty_frequencies_rejected() {
        assert!(matches!(
            build_heap_codes(&BTreeMap::new()),
            Err(CodecError::InvalidParameterError(_))
        ));
    }

    #[test]
    fn test_ties_are_deterministic() {
        let table = freqs(&[(1, 1), (2, 1), (3, 1), (4, 1)]);
        assert_eq!(
            build_heap_codes(&table).unwrap(),
            build_heap_codes(&table).unwrap()
        );
    }

    #[test]
    fn test_decode_tree_walk() {
        let codes = build_heap_codes(&freqs(&[(10, 5), (20, 3), (30, 1)])).unwrap();
        let tree = DecodeTree::from_codes(&codes).unwrap();
        for (&symbol, code) in &codes {
            let mut depth = code.len;
            let decoded = tree
                .decode_with(|| {
                    depth -= 1;
                    Ok((code.bits >> depth) & 1 == 1)
                })
                .unwrap();
            assert_eq!(decoded, symbol);
        }
    }

    #[test]
    fn test_rejects_non_prefix_free_table() {
        let codes = BTreeMap::from([
            (1, Codeword { bits: 0b0, len: 1 }),
            (2, Codeword { bits: 0b01, len: 2 }),
        ]);
        assert!(matches!(
            DecodeTree::from_codes(&codes),
            Err(CodecError::ConsistencyError(_))
        ));
    }

    #[test]
    fn test_path_leaving_the_tree() {
        let codes = BTreeMap::from([(1, Codeword { bits: 0b00, len: 2 })]);
        let tree = DecodeTree::from_codes(&codes).unwrap();
        assert!(matches!(
            tree.decode_with(|| Ok(true)),
            Err(CodecError::ConsistencyError(_))
        ));
    }
}
