// Draws three tinted quads into an offscreen texture.
// Pass a fragment shader path to draw with it instead of the default program.

use std::path::Path;

use anyhow::Result;
use ember::{
    init_logging, share, Drawable, LoggingConfig, RenderConfig, RenderPass, ShaderManager,
    SpriteRegion, TextureAsset, Vec2, WgpuBackend,
};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 256;
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let backend = share(WgpuBackend::new_headless()?);
    let config = RenderConfig::default().with_clear_color([0.1, 0.1, 0.2, 1.0]);
    let mut shaders = ShaderManager::with_config(backend.clone(), config.clone())?;

    if let Some(path) = std::env::args().nth(1) {
        let shader = shaders.load(None, Path::new(&path))?;
        shaders.enable(shader)?;
    }

    let target = backend.borrow().device().create_texture(&wgpu::TextureDescriptor {
        label: Some("headless-quad-target"),
        size: wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    // 16x16 checkerboard with 4px cells
    let checker: Vec<u8> = (0..16 * 16)
        .flat_map(|i| {
            if (i % 16 / 4 + i / 16 / 4) % 2 == 0 {
                [255u8, 255, 255, 255]
            } else {
                [40, 40, 40, 255]
            }
        })
        .collect();
    let mut texture = TextureAsset::from_rgba(&mut *backend.borrow_mut(), "checker", 16, 16, &checker)?;

    let mut pass = RenderPass::with_config(backend.clone(), config);
    pass.init(FORMAT, WIDTH, HEIGHT, "offscreen")?;

    let tints = [[1.0, 0.4, 0.4, 1.0], [0.4, 1.0, 0.4, 1.0], [0.4, 0.4, 1.0, 0.8]];
    for (i, tint) in tints.into_iter().enumerate() {
        let position = Vec2::new(64.0 + 64.0 * i as f32, 128.0);
        let region = SpriteRegion::from_pixels(0, 0, 8, 16, 16, 16).flipped(i == 1, false);
        pass.push(
            Drawable::sprite(&texture, position, Vec2::splat(3.0), 0.3 * i as f32)
                .with_region(region)
                .with_tint(tint),
        );
    }

    let camera = pass.pixel_projection();
    let mut encoder = backend
        .borrow()
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("headless-quad"),
        });
    pass.render(&mut encoder, &view, &camera)?;
    backend.borrow().queue().submit(Some(encoder.finish()));
    log::info!("rendered a {WIDTH}x{HEIGHT} frame with shader {:?}", shaders.current());

    pass.release();
    texture.release(&mut *backend.borrow_mut());
    Ok(())
}
