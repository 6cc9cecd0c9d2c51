//! Rectangle Packer - binary space partition bin packing
//!
//! Data lives in packer_data.rs, transformations in packer_operations.rs.

pub mod packer_data;
pub mod packer_operations;

pub use packer_data::{
    PackerBound, PackerData, PackerNode, PackerRect, PackerStats, PACKER_FLAG_USED,
    PACKER_NO_CHILD,
};
pub use packer_operations::{
    create_packer, delete_packer, insert_rect, packer_utilization, reset_packer,
};
