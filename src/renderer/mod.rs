//! 二维码渲染模块
//!
//! # 设计思路
//!
//! 渲染器把一个已校验的分发链接绘制到绘制目标上，状态机为
//! `Idle → Generating → (Ready | Failed)`：
//!
//! - URL 语法非法或绘制目标不存在：直接 `Failed(InvalidInput)`，不重试。
//! - 单次绘制失败：计入重试预算，预算未耗尽则按指数退避等待后重试。
//! - 预算耗尽：`Failed(RenderExhausted)`，不再自动重试。
//!
//! 失败路径上绘制目标会被清空，调用方可以把 `Failed` 当作“没有任何可用内容”。
//!
//! # 实现思路
//!
//! - 退避等待是唯一的挂起点，用 `tokio::time::sleep` 实现，调用方保持响应。
//!   整个序列通常由编排器放进 `ScheduledTask`，取消任务即取消挂起的重试。
//! - 每次尝试通过 `RenderEvent` 回调通知编排器，便于更新状态与日志。
//! - 子模块：`surface`（绘制目标）、`encode`（矩阵编码）、`retry`（预算/退避）、
//!   `schedule`（可取消任务）。

mod encode;
pub mod retry;
pub mod schedule;
pub mod surface;

use std::time::Duration;

use serde::Serialize;

use crate::config::RenderConfig;
use crate::error::ShareError;
use crate::resolver::{is_valid_url, redact_url_for_log};

use encode::{Palette, encode_matrix};
pub use retry::{RetryBudget, backoff_delay};
pub use schedule::ScheduledTask;
pub use surface::{CanvasSurface, PaintError, SharedSurface, SurfaceTarget, shared_surface};

/// 渲染过程中的事件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderEvent {
    AttemptStarted { attempt: u32 },
    AttemptFailed {
        attempt: u32,
        error: ShareError,
        /// 下一次自动重试前的等待；预算耗尽时为 `None`。
        retry_in: Option<Duration>,
    },
}

/// 一个生成序列的最终结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    Ready { attempts: u32, size: u32 },
    Failed { error: ShareError },
}

impl RenderOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

pub struct ArtifactRenderer {
    config: RenderConfig,
    palette: Palette,
}

impl ArtifactRenderer {
    pub fn new(config: RenderConfig) -> Result<Self, ShareError> {
        let palette = Palette::from_config(&config)?;
        Ok(Self { config, palette })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn validate_url(url: &str) -> Result<(), ShareError> {
        if is_valid_url(url) {
            Ok(())
        } else {
            Err(ShareError::InvalidInput(format!("URL 格式无效：{}", redact_url_for_log(url))))
        }
    }

    /// 单次绘制。失败时清空绘制目标。
    pub fn paint_once(&self, url: &str, surface: &SharedSurface, size: u32) -> Result<(), ShareError> {
        let mut target = surface
            .lock()
            .map_err(|_| ShareError::RenderTransient("绘制目标锁已中毒".to_string()))?;

        if !target.is_attached() {
            return Err(ShareError::InvalidInput("绘制目标不存在".to_string()));
        }

        let image = match encode_matrix(url, &self.config, self.palette, size) {
            Ok(image) => image,
            Err(err) => {
                target.clear();
                return Err(err);
            }
        };

        let painted = target.paint(&image);
        if painted.is_err() {
            target.clear();
        }
        painted.map_err(|err| match err {
            PaintError::Detached => ShareError::InvalidInput("绘制目标不存在".to_string()),
            PaintError::Failed(message) => ShareError::RenderTransient(message),
        })
    }

    /// 执行完整的生成序列（含自动重试）。
    pub async fn render<F>(&self, url: &str, surface: &SharedSurface, size: u32, mut on_event: F) -> RenderOutcome
    where
        F: FnMut(RenderEvent) + Send,
    {
        if let Err(error) = Self::validate_url(url) {
            log::warn!("❌ 拒绝渲染：{}", error);
            return RenderOutcome::Failed { error };
        }

        let mut budget = RetryBudget::new(self.config.max_attempts);
        log::info!(
            "🎨 开始生成二维码：{} ({}px，最多 {} 次)",
            redact_url_for_log(url),
            size,
            budget.ceiling()
        );

        loop {
            let attempt = budget.used() + 1;
            on_event(RenderEvent::AttemptStarted { attempt });

            match self.paint_once(url, surface, size) {
                Ok(()) => {
                    log::info!("✅ 二维码生成成功（第 {} 次尝试）", attempt);
                    return RenderOutcome::Ready { attempts: attempt, size };
                }
                Err(error) if error.is_retryable() => {
                    budget.record_failure();

                    if budget.is_exhausted() {
                        log::error!("❌ 二维码生成失败，已用尽 {} 次尝试：{}", budget.used(), error);
                        on_event(RenderEvent::AttemptFailed {
                            attempt,
                            error: error.clone(),
                            retry_in: None,
                        });
                        return RenderOutcome::Failed {
                            error: ShareError::RenderExhausted {
                                attempts: budget.used(),
                                last_error: error.to_string(),
                            },
                        };
                    }

                    let delay = backoff_delay(
                        self.config.base_retry_delay_ms,
                        budget.used(),
                        self.config.max_retry_delay_ms,
                    );
                    log::warn!("🔄 第 {} 次绘制失败，{:?} 后重试：{}", attempt, delay, error);
                    on_event(RenderEvent::AttemptFailed {
                        attempt,
                        error,
                        retry_in: Some(delay),
                    });
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    log::warn!("❌ 二维码生成终止：{}", error);
                    on_event(RenderEvent::AttemptFailed {
                        attempt,
                        error: error.clone(),
                        retry_in: None,
                    });
                    return RenderOutcome::Failed { error };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    const URL: &str = "https://app.example.com/survey/85ec5b20-5af6-4479-8bd8-34ae409e2d64";

    /// 前 `failures` 次绘制失败的绘制目标。
    struct FlakySurface {
        failures: u32,
        paints: u32,
        pixels: Option<RgbaImage>,
    }

    impl FlakySurface {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                paints: 0,
                pixels: None,
            }
        }
    }

    impl SurfaceTarget for FlakySurface {
        fn is_attached(&self) -> bool {
            true
        }

        fn paint(&mut self, image: &RgbaImage) -> Result<(), PaintError> {
            self.paints += 1;
            if self.paints <= self.failures {
                self.pixels = Some(image.clone());
                return Err(PaintError::Failed("context lost".to_string()));
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

    fn renderer() -> ArtifactRenderer {
        ArtifactRenderer::new(RenderConfig::default()).expect("default config")
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_first_attempt() {
        let surface = shared_surface(CanvasSurface::new());
        let outcome = renderer().render(URL, &surface, 200, |_| {}).await;

        assert_eq!(outcome, RenderOutcome::Ready { attempts: 1, size: 200 });
        let guard = surface.lock().expect("lock");
        assert_eq!(guard.snapshot().map(|img| img.dimensions()), Some((200, 200)));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_exact_backoff_then_succeeds() {
        let surface: SharedSurface = Arc::new(Mutex::new(FlakySurface::new(2)));
        let started = Instant::now();
        let mut starts = Vec::new();

        let outcome = renderer()
            .render(URL, &surface, 200, |event| {
                if let RenderEvent::AttemptStarted { attempt } = event {
                    starts.push((attempt, started.elapsed()));
                }
            })
            .await;

        assert_eq!(outcome, RenderOutcome::Ready { attempts: 3, size: 200 });
        assert_eq!(
            starts,
            vec![
                (1, Duration::ZERO),
                (2, Duration::from_millis(1_000)),
                (3, Duration::from_millis(3_000)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_leaves_surface_empty() {
        let surface: SharedSurface = Arc::new(Mutex::new(FlakySurface::new(u32::MAX)));
        let mut attempts = 0;

        let outcome = renderer()
            .render(URL, &surface, 200, |event| {
                if matches!(event, RenderEvent::AttemptStarted { .. }) {
                    attempts += 1;
                }
            })
            .await;

        assert_eq!(attempts, 3);
        assert!(matches!(
            outcome,
            RenderOutcome::Failed {
                error: ShareError::RenderExhausted { attempts: 3, .. }
            }
        ));
        assert!(surface.lock().expect("lock").snapshot().is_none());
    }

    #[tokio::test]
    async fn invalid_url_fails_without_painting() {
        let surface = shared_surface(CanvasSurface::new());
        let outcome = renderer().render("not a url", &surface, 200, |_| {}).await;

        assert!(matches!(
            outcome,
            RenderOutcome::Failed {
                error: ShareError::InvalidInput(_)
            }
        ));
        assert!(surface.lock().expect("lock").snapshot().is_none());
    }

    #[tokio::test]
    async fn detached_surface_is_terminal() {
        let mut canvas = CanvasSurface::new();
        canvas.detach();
        let surface = shared_surface(canvas);
        let mut events = Vec::new();

        let outcome = renderer().render(URL, &surface, 200, |event| events.push(event)).await;

        assert!(matches!(
            outcome,
            RenderOutcome::Failed {
                error: ShareError::InvalidInput(_)
            }
        ));
        assert_eq!(events.len(), 2);
    }
}
