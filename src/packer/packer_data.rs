//! Rectangle Packer Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in packer_operations.rs

/// Node flag: leaf holds a placed rectangle
pub const PACKER_FLAG_USED: u32 = 1 << 0;

/// Child slot value meaning "no child". Index 0 is always the root,
/// which can never be anyone's child.
pub const PACKER_NO_CHILD: u32 = 0;

/// Axis-aligned region covered by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackerBound {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Node of the binary partition tree
///
/// A node with both children set is an internal split node and holds no
/// rectangle. A leaf holds at most one rectangle, flagged `PACKER_FLAG_USED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackerNode {
    pub child: [u32; 2],
    pub bound: PackerBound,
    /// Index into `PackerData::rects`, valid only when USED
    pub rect_index: u32,
    pub flags: u32,
}

/// A placed rectangle, content area only (padding stripped)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackerRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Caller supplied identifier
    pub id: u32,
    pub flags: u32,
}

/// Binary-tree rectangle packer for one fixed-size master region
///
/// Invariants:
/// - `nodes[0]` is the root and covers `[0, 0, width, height]`
/// - `free + used == width * height`
pub struct PackerData {
    pub width: u32,
    pub height: u32,
    /// Flat arena of tree nodes, children referenced by index
    pub nodes: Vec<PackerNode>,
    /// Placed rectangles in insertion order
    pub rects: Vec<PackerRect>,
    pub free: u64,
    pub used: u64,
}

/// Packer statistics
#[derive(Debug, Clone, PartialEq)]
pub struct PackerStats {
    pub rect_count: usize,
    pub node_count: usize,
    pub node_capacity: usize,
    pub free_area: u64,
    pub used_area: u64,
}
