//! 绘制目标
//!
//! 类似浏览器 canvas 的可绘制表面。渲染器只通过 `SurfaceTarget` 访问它，
//! 导出器只读取 `snapshot()`。

use std::sync::{Arc, Mutex};

use image::RgbaImage;

/// 单次绘制失败。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaintError {
    #[error("绘制目标已卸载")]
    Detached,

    #[error("{0}")]
    Failed(String),
}

pub trait SurfaceTarget: Send {
    /// 绘制目标当前是否仍然存在。
    fn is_attached(&self) -> bool;

    fn paint(&mut self, image: &RgbaImage) -> Result<(), PaintError>;

    /// 清空已绘制内容。失败路径上必须调用，避免留下半成品。
    fn clear(&mut self);

    /// 已完成绘制的内容。
    fn snapshot(&self) -> Option<&RgbaImage>;
}

/// 由单个编排器独占的共享绘制目标。
pub type SharedSurface = Arc<Mutex<dyn SurfaceTarget>>;

pub fn shared_surface<S: SurfaceTarget + 'static>(surface: S) -> SharedSurface {
    Arc::new(Mutex::new(surface))
}

/// 内存画布。
#[derive(Debug, Clone)]
pub struct CanvasSurface {
    attached: bool,
    pixels: Option<RgbaImage>,
}

impl Default for CanvasSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasSurface {
    pub fn new() -> Self {
        Self {
            attached: true,
            pixels: None,
        }
    }

    /// 模拟视图卸载：之后的绘制全部失败。
    pub fn detach(&mut self) {
        self.attached = false;
        self.pixels = None;
    }
}

impl SurfaceTarget for CanvasSurface {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn paint(&mut self, image: &RgbaImage) -> Result<(), PaintError> {
        if !self.attached {
            return Err(PaintError::Detached);
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(PaintError::Failed("图像尺寸为 0".to_string()));
        }
        self.pixels = Some(image.clone());
        Ok(())
    }

    fn clear(&mut self) {
        self.pixels = None;
    }

    fn snapshot(&self) -> Option<&RgbaImage> {
        self.pixels.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_canvas_rejects_paint() {
        let mut canvas = CanvasSurface::new();
        canvas.detach();
        let image = RgbaImage::new(4, 4);
        assert_eq!(canvas.paint(&image), Err(PaintError::Detached));
        assert!(canvas.snapshot().is_none());
    }

    #[test]
    fn clear_drops_snapshot() {
        let mut canvas = CanvasSurface::new();
        canvas.paint(&RgbaImage::new(4, 4)).expect("paint");
        assert!(canvas.snapshot().is_some());
        canvas.clear();
        assert!(canvas.snapshot().is_none());
    }
}
