//! Packs a set of generated sprites into a multi-page atlas
//!
//! Usage: `cargo run --example pack_sprites [config.toml] [output_dir]`
//!
//! Each sprite gets a solid color with a darker border so page layout and
//! padding are easy to inspect in the dumped PNG files.

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use r2d_atlas::atlas::{
    add_named_entry, create_atlas, find_named_entry, frame_uv, freeze_atlas, get_stats,
    is_multipage, place_frame, transfer_frame_image,
};
use r2d_atlas::{AtlasConfig, MemoryBackend};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

const SPRITE_COUNT: usize = 120;
const ANIMATED_EVERY: usize = 10;
const ANIMATION_FRAMES: u32 = 4;

fn sprite_image(width: u32, height: u32, color: [u8; 3]) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
        let [r, g, b] = if border {
            color.map(|c| c / 2)
        } else {
            color
        };
        Rgba([r, g, b, 255])
    })
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => AtlasConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => AtlasConfig {
            page_width: 256,
            page_height: 256,
            horizontal_padding: 2,
            vertical_padding: 2,
            expected_entries: SPRITE_COUNT as u32,
            ..AtlasConfig::default()
        },
    };
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "atlas_pages".to_string()));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    println!("Sprite Atlas Packing Example");
    println!("============================");
    println!(
        "Pages: {}x{}, padding {}x{}",
        config.page_width, config.page_height, config.horizontal_padding, config.vertical_padding
    );

    let mut atlas = create_atlas(config, MemoryBackend::new())?;
    let mut rng = StdRng::seed_from_u64(42);

    for i in 0..SPRITE_COUNT {
        let name = format!("sprite_{:03}", i);
        let frames = if i % ANIMATED_EVERY == 0 {
            ANIMATION_FRAMES
        } else {
            1
        };
        let index = add_named_entry(&mut atlas, &name, frames)?;

        for frame in 0..frames as usize {
            let width = rng.gen_range(8..=48);
            let height = rng.gen_range(8..=48);
            let color = [rng.gen(), rng.gen(), rng.gen()];

            place_frame(&mut atlas, index, frame, width, height)?;
            transfer_frame_image(&mut atlas, index, frame, &sprite_image(width, height, color))?;
        }
    }

    freeze_atlas(&mut atlas);

    let stats = get_stats(&atlas);
    println!("\nPacked {} frames from {} entries", stats.placed_frames, stats.entry_count);
    println!("  Pages: {}", stats.page_count);
    println!("  Utilization: {:.1}%", stats.utilization);
    println!(
        "  Name index: {} buckets, longest {}",
        stats.bucket_count, stats.longest_bucket
    );

    let spanning = atlas
        .entries
        .iter()
        .filter(|entry| is_multipage(entry))
        .count();
    println!("  Entries spanning pages: {}", spanning);

    if find_named_entry(&atlas, "sprite_000").is_some() {
        if let Some(uv) = frame_uv(&atlas, 0, 0) {
            println!(
                "  sprite_000 frame 0: page {} uv ({:.3}, {:.3})..({:.3}, {:.3})",
                uv.page, uv.min.x, uv.min.y, uv.max.x, uv.max.y
            );
        }
    }

    for (page, surface) in atlas.pages.iter().enumerate() {
        let path = output_dir.join(format!("page_{}.png", page));
        atlas.backend.save_surface_debug(surface, &path)?;
        println!("  Wrote {}", path.display());
    }

    Ok(())
}
