// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Member tree operations
//!
//! `MDSCHEMA_MEMBERS` accepts a `TREE_OP` restriction: a bitmask selecting
//! which relatives of the restricted member to return. The server answers
//! with the union of all selected relatives.

use bitflags::bitflags;

bitflags! {
    /// Set of relative-navigation operations, encoded as the `TREE_OP` mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TreeOps: u32 {
        /// Immediate children of the member
        const CHILDREN = 0x01;
        /// Members sharing the member's parent, excluding the member
        const SIBLINGS = 0x02;
        /// Immediate parent
        const PARENT = 0x04;
        /// The member itself
        const SELF = 0x08;
        /// All descendants
        const DESCENDANTS = 0x10;
        /// All ancestors
        const ANCESTORS = 0x20;
    }
}

/// A single tree operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeOp {
    Children,
    Siblings,
    Parent,
    SelfMember,
    Descendants,
    Ancestors,
}

impl TreeOp {
    pub const ALL: [TreeOp; 6] = [
        TreeOp::Children,
        TreeOp::Siblings,
        TreeOp::Parent,
        TreeOp::SelfMember,
        TreeOp::Descendants,
        TreeOp::Ancestors,
    ];

    /// The flag for this operation
    pub fn flag(self) -> TreeOps {
        match self {
            TreeOp::Children => TreeOps::CHILDREN,
            TreeOp::Siblings => TreeOps::SIBLINGS,
            TreeOp::Parent => TreeOps::PARENT,
            TreeOp::SelfMember => TreeOps::SELF,
            TreeOp::Descendants => TreeOps::DESCENDANTS,
            TreeOp::Ancestors => TreeOps::ANCESTORS,
        }
    }
}

impl TreeOps {
    /// Encode as the integer sent in the `TREE_OP` restriction
    pub fn to_mask(self) -> u32 {
        self.bits()
    }

    /// Decode a `TREE_OP` mask; unknown bits are dropped
    pub fn from_mask(mask: u32) -> Self {
        TreeOps::from_bits_truncate(mask)
    }

    /// Restriction value for this set
    pub fn restriction_value(self) -> String {
        self.to_mask().to_string()
    }

    /// The individual operations in this set
    pub fn ops(self) -> Vec<TreeOp> {
        TreeOp::ALL
            .into_iter()
            .filter(|op| self.contains(op.flag()))
            .collect()
    }
}

impl FromIterator<TreeOp> for TreeOps {
    fn from_iter<I: IntoIterator<Item = TreeOp>>(iter: I) -> Self {
        iter.into_iter()
            .fold(TreeOps::empty(), |acc, op| acc | op.flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_values() {
        assert_eq!(TreeOps::SELF.to_mask(), 8);
        assert_eq!(TreeOps::CHILDREN.to_mask(), 1);
        assert_eq!(TreeOps::ANCESTORS.to_mask(), 0x20);
        assert_eq!((TreeOps::PARENT | TreeOps::SELF).restriction_value(), "12");
    }

    #[test]
    fn test_every_subset_round_trips() {
        for bits in 0u32..64 {
            let ops: Vec<TreeOp> = TreeOp::ALL
                .into_iter()
                .enumerate()
                .filter(|(i, _)| bits & (1 << i) != 0)
                .map(|(_, op)| op)
                .collect();
            let set: TreeOps = ops.iter().copied().collect();
            let decoded = TreeOps::from_mask(set.to_mask());
            assert_eq!(decoded.ops(), ops);
        }
    }

    #[test]
    fn test_unknown_bits_dropped() {
        assert_eq!(TreeOps::from_mask(0x48), TreeOps::SELF);
    }
}
