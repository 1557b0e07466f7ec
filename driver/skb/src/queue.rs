//! SkbQueue — 对应内核 `struct sk_buff_head` 的 FIFO 队列
//!
//! 用于 TXQ 帧链（`txq->sk_list`）、调度器批量摘取与 RX 分发列表。
//! 锁由持有者负责（edrv 侧在 tx_lock 内操作），队列本身不加锁。

use alloc::collections::VecDeque;

use super::SkBuff;

/// skb 的 FIFO 队列，对应 uwifi `struct sk_buff_head` + `skb_queue_tail` / `__skb_dequeue`。
pub struct SkbQueue {
    queue: VecDeque<SkBuff>,
}

impl SkbQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// 队尾入队。对应 `__skb_queue_tail`。
    pub fn push_tail(&mut self, skb: SkBuff) {
        self.queue.push_back(skb);
    }

    /// 队首入队。对应 `__skb_queue_head`。
    pub fn push_head(&mut self, skb: SkBuff) {
        self.queue.push_front(skb);
    }

    /// 在下标 `pos` 处插入（`pos` 及之后的元素后移）；`pos` 超出队长时落到队尾。
    /// 对应重传帧的 `skb_append`（插在最后一个重传帧之后）。
    pub fn insert(&mut self, pos: usize, skb: SkBuff) {
        let pos = pos.min(self.queue.len());
        self.queue.insert(pos, skb);
    }

    /// 队首出队。对应 `__skb_dequeue`。
    pub fn pop_head(&mut self) -> Option<SkBuff> {
        self.queue.pop_front()
    }

    /// 队尾出队。对应 `skb_dequeue_tail`。
    pub fn pop_tail(&mut self) -> Option<SkBuff> {
        self.queue.pop_back()
    }

    /// 队首只读视图。对应 `skb_peek`。
    pub fn peek(&self) -> Option<&SkBuff> {
        self.queue.front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// 将 `other` 整体接到本队列尾部，`other` 变空。
    /// 对应调度器摘空 TXQ 时的 `skb_queue_splice_init`。
    pub fn splice_tail(&mut self, other: &mut SkbQueue) {
        self.queue.append(&mut other.queue);
    }

    /// 从队首摘取最多 `n` 个 skb 接到 `dst` 尾部，返回实际摘取数。
    /// 对应调度器按信用额度部分摘取 TXQ 的路径。
    pub fn extract_into(&mut self, n: usize, dst: &mut SkbQueue) -> usize {
        let take = n.min(self.queue.len());
        for _ in 0..take {
            if let Some(skb) = self.queue.pop_front() {
                dst.queue.push_back(skb);
            }
        }
        take
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkBuff> {
        self.queue.iter()
    }

    /// 清空并丢弃所有 skb。
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Default for SkbQueue {
    fn default() -> Self {
        Self::new()
    }
}
