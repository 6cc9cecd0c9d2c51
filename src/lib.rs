// R2D Atlas - Data-Oriented Programming (DOP) Architecture
//
// Texture atlas and rectangle packing engine.
// - Data lives in *_data modules as plain structs
// - Transformations live in *_operations modules as free functions
// - Graphics APIs sit behind the gpu::AtlasBackend trait
//
// Typical flow:
// - atlas::create_atlas with an AtlasConfig and a backend
// - atlas::add_named_entry / atlas::place_frame per sprite frame
// - atlas::transfer_frame to stream pixels into the placed region
// - atlas::freeze_atlas once authoring is done

pub mod atlas;
pub mod config;
pub mod error;
pub mod gpu;
pub mod packer;
pub mod pixel_format;

pub use atlas::{
    add_entry, add_named_entry, create_atlas, create_shared_atlas, destroy_atlas, find_entry,
    find_named_entry, frame_uv, freeze_atlas, get_entry, name_hash, place_frame,
    place_frame_padded, transfer_frame, transfer_frame_image, transfer_frame_pod, AtlasData,
    AtlasEntry, AtlasStats, AtlasUV, FramePlacement, FrameRect, SharedAtlas,
};
pub use config::AtlasConfig;
pub use error::{AtlasError, AtlasResult, ErrorContext, OptionExt};
pub use gpu::{AtlasBackend, CopyRegion, MemoryBackend};
pub use packer::{create_packer, insert_rect, PackerData, PackerRect};
pub use pixel_format::{PixelFormat, PixelType};

#[cfg(feature = "wgpu-backend")]
pub use gpu::WgpuBackend;

// Re-export wgpu for callers constructing a WgpuBackend
#[cfg(feature = "wgpu-backend")]
pub use wgpu;
