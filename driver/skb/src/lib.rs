//! Socket buffer (skb) 模块 — 对应 asr wifidrv 依赖的 `skbuf.h` / `dev_kfree_skb` 族
//!
//! 提供与内核 `struct sk_buff` 语义对齐的包缓冲、FIFO 队列与固定容量回收池，
//! 便于 edrv 收发包路径与 uwifi C 源对照。
//!
//! - **[SkBuff]**：单包缓冲，`data`/`len`/`headroom`/`tailroom`、`put`/`pull`/`push`/`reserve`
//! - **[SkbQueue]**：FIFO 队列（对应 `struct sk_buff_head`），用于 TXQ 帧链、RX 分发等
//! - **[SkbPool]**：固定容量回收池（对应 `tx_sk_free_list` / SDIO rx 空闲缓冲链）

#![no_std]

extern crate alloc;

mod pool;
mod queue;
mod skbuff;

pub use pool::SkbPool;
pub use queue::SkbQueue;
pub use skbuff::SkBuff;
