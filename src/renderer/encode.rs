//! 二维码矩阵 → RGBA 位图
//!
//! 1. `qrcode` 生成模块矩阵
//! 2. 按整数倍放大并加静区
//! 3. 与目标尺寸不一致时用 `fast_image_resize`（最近邻）缩放，失败回退 `image::imageops::resize`

use fast_image_resize as fr;
use image::{ImageBuffer, Rgba, RgbaImage};
use qrcode::{Color, QrCode};

use crate::config::RenderConfig;
use crate::error::ShareError;

/// 调色板。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Palette {
    pub dark: [u8; 3],
    pub light: [u8; 3],
}

impl Palette {
    pub(crate) fn from_config(config: &RenderConfig) -> Result<Self, ShareError> {
        Ok(Self {
            dark: config.dark_rgb()?,
            light: config.light_rgb()?,
        })
    }
}

/// 将 `data` 编码为 `size × size` 的二维码位图。
pub(crate) fn encode_matrix(
    data: &str,
    config: &RenderConfig,
    palette: Palette,
    size: u32,
) -> Result<RgbaImage, ShareError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), config.error_correction.to_qr())
        .map_err(|e| ShareError::InvalidInput(format!("无法编码为二维码：{}", e)))?;

    let modules = code.width() as u32;
    let colors = code.to_colors();
    let margin = config.margin_modules;
    let total = modules + margin * 2;
    let scale = (size / total).max(1);

    let dark = Rgba([palette.dark[0], palette.dark[1], palette.dark[2], 255]);
    let light = Rgba([palette.light[0], palette.light[1], palette.light[2], 255]);

    let base: RgbaImage = ImageBuffer::from_fn(total * scale, total * scale, |x, y| {
        let (mx, my) = (x / scale, y / scale);
        if mx < margin || my < margin || mx >= margin + modules || my >= margin + modules {
            return light;
        }
        let index = ((my - margin) * modules + (mx - margin)) as usize;
        match colors.get(index) {
            Some(Color::Dark) => dark,
            _ => light,
        }
    });

    if base.width() == size {
        return Ok(base);
    }

    log::debug!("🧩 二维码缩放：{}px -> {}px", base.width(), size);
    match resize_nearest(&base, size) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::imageops::resize：{}", err);
            Ok(image::imageops::resize(
                &base,
                size,
                size,
                image::imageops::FilterType::Nearest,
            ))
        }
    }
}

fn resize_nearest(source: &RgbaImage, size: u32) -> Result<RgbaImage, ShareError> {
    let (width, height) = source.dimensions();
    let src_image = fr::images::Image::from_vec_u8(width, height, source.as_raw().clone(), fr::PixelType::U8x4)
        .map_err(|e| ShareError::RenderTransient(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(size, size, fr::PixelType::U8x4);
    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Nearest);

    fr::Resizer::new()
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ShareError::RenderTransient(format!("fast_image_resize 执行失败：{}", e)))?;

    ImageBuffer::from_raw(size, size, dst_image.into_vec())
        .ok_or_else(|| ShareError::RenderTransient("缩放输出缓冲长度异常".to_string()))
}
