//! Rectangle Packer Operations - Pure DOP Functions
//!
//! Binary-tree bin packing. Each insertion walks the tree from the root,
//! child 0 before child 1, and takes the first free leaf that can hold the
//! padded rectangle. A leaf larger than the rectangle is split along the axis
//! with more slack; child 0 is always the part the rectangle will occupy.
//!
//! The split heuristic is greedy. Callers that care about density should sort
//! their inputs (e.g. by decreasing area) before inserting.

use super::packer_data::{
    PackerBound, PackerData, PackerNode, PackerRect, PackerStats, PACKER_FLAG_USED,
    PACKER_NO_CHILD,
};
use crate::error::{AtlasError, AtlasResult};

/// Node growth doubles below this many slots and grows linearly above it
pub const PACKER_GROW_LIMIT: usize = 2048;

/// Node slots pre-sized per expected rectangle
const PACKER_NODES_PER_RECT: usize = 3;

/// Worst case nodes created by one insertion: one split per axis
const PACKER_SPLIT_RESERVE: usize = 4;

/// Check if a node is an internal split node
pub fn is_split(node: &PackerNode) -> bool {
    node.child[0] != PACKER_NO_CHILD && node.child[1] != PACKER_NO_CHILD
}

/// Check if a leaf holds a rectangle
pub fn is_used(node: &PackerNode) -> bool {
    node.flags & PACKER_FLAG_USED != 0
}

fn leaf(bound: PackerBound) -> PackerNode {
    PackerNode {
        child: [PACKER_NO_CHILD; 2],
        bound,
        rect_index: 0,
        flags: 0,
    }
}

fn root(width: u32, height: u32) -> PackerNode {
    leaf(PackerBound {
        x: 0,
        y: 0,
        width,
        height,
    })
}

/// Next capacity under the growth policy that holds at least `needed` slots
pub fn grown_capacity(current: usize, needed: usize) -> usize {
    let mut capacity = current.max(1);
    while capacity < needed {
        capacity = if capacity < PACKER_GROW_LIMIT {
            capacity * 2
        } else {
            capacity + PACKER_GROW_LIMIT
        };
    }
    capacity
}

/// Make room for `needed` slots. Returns false, leaving `vec` untouched, if
/// the allocation fails.
fn reserve_slots<T>(vec: &mut Vec<T>, needed: usize) -> bool {
    if vec.capacity() >= needed {
        return true;
    }
    let target = grown_capacity(vec.capacity(), needed);
    vec.try_reserve_exact(target - vec.len()).is_ok()
}

/// Create a packer covering `width` x `height`, pre-sized for `capacity` rectangles
pub fn create_packer(width: u32, height: u32, capacity: usize) -> AtlasResult<PackerData> {
    if width == 0 || height == 0 {
        return Err(AtlasError::InvalidConfig {
            field: "packer size".to_string(),
            value: format!("{}x{}", width, height),
            reason: "packer dimensions must be non-zero".to_string(),
        });
    }

    let capacity = capacity.max(1);
    let node_slots = 1 + capacity * PACKER_NODES_PER_RECT;

    let mut nodes = Vec::new();
    nodes
        .try_reserve_exact(node_slots)
        .map_err(|_| AtlasError::AllocationFailed {
            what: "packer nodes".to_string(),
            requested: node_slots,
        })?;
    let mut rects = Vec::new();
    rects
        .try_reserve_exact(capacity)
        .map_err(|_| AtlasError::AllocationFailed {
            what: "packer rects".to_string(),
            requested: capacity,
        })?;

    nodes.push(root(width, height));

    Ok(PackerData {
        width,
        height,
        nodes,
        rects,
        free: width as u64 * height as u64,
        used: 0,
    })
}

/// Restore the single-root empty state, keeping allocated storage
pub fn reset_packer(data: &mut PackerData) {
    data.nodes.clear();
    data.nodes.push(root(data.width, data.height));
    data.rects.clear();
    data.free = data.width as u64 * data.height as u64;
    data.used = 0;
}

/// Release all packer storage
pub fn delete_packer(data: PackerData) {
    log::trace!(
        "[packer_operations::delete] Releasing {}x{} packer ({} rects, {} nodes)",
        data.width,
        data.height,
        data.rects.len(),
        data.nodes.len()
    );
}

/// Place a `width` x `height` rectangle surrounded by `hpad`/`vpad` padding.
///
/// Returns the content rectangle (padding stripped) on success. On failure
/// the packer is left exactly as it was.
pub fn insert_rect(
    data: &mut PackerData,
    width: u32,
    height: u32,
    hpad: u32,
    vpad: u32,
    id: u32,
) -> Option<PackerRect> {
    let padded_width = width as u64 + 2 * hpad as u64;
    let padded_height = height as u64 + 2 * vpad as u64;

    if padded_width == 0 || padded_height == 0 {
        return None;
    }
    if padded_width > data.width as u64 || padded_height > data.height as u64 {
        return None;
    }

    let area = padded_width * padded_height;
    if area > data.free {
        return None;
    }

    let nodes_needed = data.nodes.len() + PACKER_SPLIT_RESERVE;
    let rects_needed = data.rects.len() + 1;
    if !reserve_slots(&mut data.nodes, nodes_needed) || !reserve_slots(&mut data.rects, rects_needed)
    {
        log::warn!(
            "[packer_operations::insert] Failed to grow packer storage ({} nodes, {} rects)",
            data.nodes.len(),
            data.rects.len()
        );
        return None;
    }

    let node_index = find_node(data, padded_width as u32, padded_height as u32)?;

    let rect_index = data.rects.len() as u32;
    let node = &mut data.nodes[node_index];
    node.flags |= PACKER_FLAG_USED;
    node.rect_index = rect_index;

    let rect = PackerRect {
        x: node.bound.x + hpad,
        y: node.bound.y + vpad,
        width,
        height,
        id,
        flags: node.flags,
    };
    data.rects.push(rect);
    data.free -= area;
    data.used += area;

    log::trace!(
        "[packer_operations::insert] Placed id {} at ({}, {}) size {}x{}",
        id,
        rect.x,
        rect.y,
        width,
        height
    );

    Some(rect)
}

/// Find (splitting as needed) a free leaf exactly `width` x `height`.
///
/// Depth-first, child 0 before child 1. The walk keeps its own stack of node
/// indices since a page filled along one axis grows a chain as deep as the
/// number of rects in it.
fn find_node(data: &mut PackerData, width: u32, height: u32) -> Option<usize> {
    let mut pending: Vec<u32> = vec![0];

    while let Some(index) = pending.pop() {
        let node = data.nodes[index as usize];

        if is_split(&node) {
            pending.push(node.child[1]);
            pending.push(node.child[0]);
            continue;
        }

        if is_used(&node) || width > node.bound.width || height > node.bound.height {
            continue;
        }

        return Some(split_node(data, index as usize, width, height));
    }

    None
}

/// Subdivide a free leaf that can hold `width` x `height` until child 0 fits
/// exactly. At most two splits, one per axis.
fn split_node(data: &mut PackerData, mut index: usize, width: u32, height: u32) -> usize {
    loop {
        let bound = data.nodes[index].bound;

        // Exact fit: no subdivision, no zero-sized children
        if width == bound.width && height == bound.height {
            return index;
        }

        let dw = bound.width - width;
        let dh = bound.height - height;

        let (occupied, remainder) = if dw > dh {
            (
                PackerBound {
                    x: bound.x,
                    y: bound.y,
                    width,
                    height: bound.height,
                },
                PackerBound {
                    x: bound.x + width,
                    y: bound.y,
                    width: dw,
                    height: bound.height,
                },
            )
        } else {
            (
                PackerBound {
                    x: bound.x,
                    y: bound.y,
                    width: bound.width,
                    height,
                },
                PackerBound {
                    x: bound.x,
                    y: bound.y + height,
                    width: bound.width,
                    height: dh,
                },
            )
        };

        let first = data.nodes.len() as u32;
        data.nodes.push(leaf(occupied));
        data.nodes.push(leaf(remainder));
        data.nodes[index].child = [first, first + 1];

        index = first as usize;
    }
}

/// Get packer statistics
pub fn get_stats(data: &PackerData) -> PackerStats {
    PackerStats {
        rect_count: data.rects.len(),
        node_count: data.nodes.len(),
        node_capacity: data.nodes.capacity(),
        free_area: data.free,
        used_area: data.used,
    }
}

/// Get packer utilization percentage
pub fn packer_utilization(data: &PackerData) -> f32 {
    let total_area = data.width as u64 * data.height as u64;
    (data.used as f64 / total_area as f64 * 100.0) as f32
}
