//! # 问卷分享 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            调用方（视图层 / CLI / 数据层）                 │
//! │   ShareRequest + RuntimeEnvironment（origin·网络·设备）   │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ ActionOutcome / Notice（不抛错）
//! ┌───────┴──────────────────────────────────────────────────┐
//! │  orchestrator ── 状态机 + 重试 + 复制/下载/打开/分享      │
//! │   ├─ device        UA + 视口 → 二维码尺寸                 │
//! │   └─ notice        面向用户的提示                         │
//! │       │                                                  │
//! │  ┌────┼──────────────┬───────────────┬────────────────┐  │
//! │  ↓    ↓              ↓               ↓                ↓  │
//! │ identifier  resolver   renderer       exporter   clipboard│
//! │ 标识符校验  链接解析   绘制+退避重试  PNG+文件名  策略链  │
//! │                        ├─ surface                 ├─ strategy
//! │                        ├─ retry                   └─ native
//! │                        └─ schedule                       │
//! │                                                          │
//! │  share · reachability · capability · platform            │
//! │  config · error                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `ShareError`，含错误码、阶段与用户提示 |
//! | [`config`] | `ShareConfig`：生产域名、重试退避、外观、尺寸表、导出、可达性 |
//! | [`identifier`] | 问卷标识符格式校验 |
//! | [`resolver`] | 按运行时 origin 即时解析规范链接与短链接 |
//! | [`renderer`] | 二维码绘制、重试预算、确定性指数退避、可取消任务 |
//! | [`exporter`] | PNG 导出、文件名清洗、目录保存 |
//! | [`clipboard`] | 有序复制策略链（异步剪贴板 → 选区复制） |
//! | [`orchestrator`] | 单个二维码的状态与用户动作编排 |
//! | [`share`] | 邮件 / 短信 / 社交平台分享链接 |
//! | [`reachability`] | 可选的链接 `HEAD` 探测 |
//! | [`capability`] | 平台能力探测（进程内一次） |
//! | [`platform`] | 平台边界 trait 与原生打开链接实现 |

pub mod capability;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod exporter;
pub mod identifier;
pub mod orchestrator;
pub mod platform;
pub mod reachability;
pub mod renderer;
pub mod resolver;
pub mod share;

pub use error::ShareError;
