//! SkbPool — 固定容量的 skb 回收池
//!
//! 对应 uwifi 的 `tx_sk_free_list`（发送侧空闲链）与 SDIO 收包空闲缓冲链：
//! 初始化时一次性灌满，所有缓冲在池与使用者之间流转、只回收不释放。
//! 池内部以自旋锁保护，`alloc` 耗尽时立即失败、从不阻塞。

use alloc::collections::VecDeque;
use spin::Mutex;

use super::SkBuff;

/// 固定容量回收池。出池的 skb 已按 `headroom` 复位。
pub struct SkbPool {
    free: Mutex<VecDeque<SkBuff>>,
    capacity: usize,
    buf_size: usize,
    headroom: usize,
}

impl SkbPool {
    /// 建池并灌入 `count` 个容量为 `buf_size` 的缓冲，每个预留 `headroom`。
    pub fn new(count: usize, buf_size: usize, headroom: usize) -> Self {
        let mut free = VecDeque::with_capacity(count);
        for _ in 0..count {
            free.push_back(SkBuff::alloc_with_headroom(buf_size, headroom));
        }
        SkbPool {
            free: Mutex::new(free),
            capacity: count,
            buf_size,
            headroom,
        }
    }

    /// 取一个空闲缓冲；池空则返回 None（调用方按 NoMemory 处理）。
    /// 对应 `skb_dequeue(&asr_hw->tx_sk_free_list)` 判空分支。
    pub fn alloc(&self) -> Option<SkBuff> {
        self.free.lock().pop_front()
    }

    /// 归还缓冲；复位到刚分配的状态后挂回空闲链。
    pub fn release(&self, mut skb: SkBuff) {
        skb.reinit(self.headroom);
        let mut free = self.free.lock();
        debug_assert!(free.len() < self.capacity, "pool over-release");
        free.push_back(skb);
    }

    /// 当前空闲数。
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }

    /// 当前在外流转的缓冲数。
    pub fn in_use(&self) -> usize {
        self.capacity - self.free_count()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn buf_size(&self) -> usize {
        self.buf_size
    }

    #[inline]
    pub fn headroom(&self) -> usize {
        self.headroom
    }
}
