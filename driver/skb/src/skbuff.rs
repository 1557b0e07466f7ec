//! SkBuff — 对应内核 `struct sk_buff` 的包缓冲
//!
//! 布局：`[ headroom | data (len) | tailroom ]`，与 uwifi `skb->data`、`skb_put`、
//! `skb_pull`、`skb_push`、`skb_reserve` 语义一致。

use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

/// 单包缓冲，与 uwifi `struct sk_buff` 语义对齐。
///
/// - `data`：当前有效载荷起始（head 之后）
/// - `len`：有效载荷长度
/// - headroom：data 前的预留字节；tailroom：data 末之后的剩余空间
/// - `put(n)`：在尾部追加 n 字节（tailroom 减少）；对应 `skb_put`
/// - `pull(n)`：从头部消费 n 字节（data 前移，len 减少）；对应 `skb_pull`
/// - `push(n)`：在 data 前预留 n 字节（headroom 减少，len 增加）；对应 `skb_push`
///
/// 越界的 `put`/`pull`/`push` 一律失败且不改动缓冲。
#[derive(Clone)]
pub struct SkBuff {
    /// 整块存储： [0..head] = headroom, [head..head+len] = data, [head+len..] = tailroom
    storage: Vec<u8>,
    /// data 区在 storage 中的起始下标
    head: usize,
    /// 当前有效 data 长度
    len: usize,
    /// 发送优先级标记（select_queue 写入；对应 `skb->priority`）
    priority: u8,
}

impl SkBuff {
    /// 分配指定总容量的缓冲；初始 data 长度 0。
    /// 对应 `dev_alloc_skb_tx` / `dev_alloc_skb_rx`。
    pub fn alloc(capacity: usize) -> Self {
        Self::alloc_with_headroom(capacity, 0)
    }

    /// 分配容量并在前端预留 headroom 字节。
    pub fn alloc_with_headroom(capacity: usize, headroom: usize) -> Self {
        let head = headroom.min(capacity);
        let mut storage = Vec::with_capacity(capacity);
        storage.resize(capacity, 0);
        SkBuff {
            storage,
            head,
            len: 0,
            priority: 0,
        }
    }

    /// 当前有效载荷（data 区）只读视图。
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.storage[self.head..self.head + self.len]
    }

    /// 当前有效载荷可写视图（含 tailroom，用于传输层写入后配合 `set_len`）。
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        let end = self.storage.len();
        &mut self.storage[self.head..end]
    }

    /// 设置当前有效 data 长度（收包写入后调用）。
    #[inline]
    pub fn set_len(&mut self, len: usize) {
        let max = self.storage.len().saturating_sub(self.head);
        self.len = len.min(max);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// headroom 字节数（data 前的空间）。
    #[inline]
    pub fn headroom(&self) -> usize {
        self.head
    }

    /// tailroom 字节数（data 后的空间）。
    #[inline]
    pub fn tailroom(&self) -> usize {
        self.storage.len().saturating_sub(self.head + self.len)
    }

    /// 整块存储容量。
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn priority(&self) -> u8 {
        self.priority
    }

    #[inline]
    pub fn set_priority(&mut self, prio: u8) {
        self.priority = prio;
    }

    /// 在尾部追加 n 字节，返回可写切片；空间不足则返回 None。对应 `skb_put(skb, n)`。
    #[inline]
    pub fn put(&mut self, n: usize) -> Option<&mut [u8]> {
        if self.tailroom() < n {
            return None;
        }
        let start = self.head + self.len;
        self.len += n;
        Some(&mut self.storage[start..start + n])
    }

    /// 在尾部追加一段字节（`memcpy` + `skb_put` 的组合）；空间不足则失败。
    #[inline]
    pub fn put_slice(&mut self, src: &[u8]) -> bool {
        match self.put(src.len()) {
            Some(dst) => {
                dst.copy_from_slice(src);
                true
            }
            None => false,
        }
    }

    /// 从 data 头部消费 n 字节（data 指针前移、len 减少）；超出当前长度则失败。
    /// 对应 `skb_pull(skb, n)`。
    #[inline]
    pub fn pull(&mut self, n: usize) -> bool {
        if n > self.len {
            return false;
        }
        self.head += n;
        self.len -= n;
        true
    }

    /// 在 data 前扩展 n 字节（head 减少、len 增加）；headroom 不足则失败。
    /// 对应 `skb_push(skb, n)`。
    #[inline]
    pub fn push(&mut self, n: usize) -> bool {
        if self.head < n {
            return false;
        }
        self.head -= n;
        self.len += n;
        true
    }

    /// 空缓冲上前移 data 起点预留 headroom。对应 `skb_reserve(skb, n)`，
    /// 仅对 `len == 0` 的缓冲有意义。
    #[inline]
    pub fn reserve(&mut self, n: usize) -> bool {
        if self.len != 0 || self.head + n > self.storage.len() {
            return false;
        }
        self.head += n;
        true
    }

    /// 复位为刚分配的状态（data 起点回到 headroom、长度与优先级清零），
    /// 供缓冲池回收复用。对应 uwifi 的 `skb_reinit`。
    #[inline]
    pub fn reinit(&mut self, headroom: usize) {
        self.head = headroom.min(self.storage.len());
        self.len = 0;
        self.priority = 0;
    }

    /// 将 data 区从偏移 `off` 起、长度 `n` 复制到 `dst`；若范围越界则复制有效部分。
    #[inline]
    pub fn copy_bits(&self, dst: &mut [u8], off: usize, n: usize) -> usize {
        let data = self.data();
        let start = off.min(data.len());
        let count = (data.len() - start).min(n).min(dst.len());
        dst[..count].copy_from_slice(&data[start..start + count]);
        count
    }
}

impl Deref for SkBuff {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.data()
    }
}

impl DerefMut for SkBuff {
    fn deref_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut self.storage[self.head..self.head + len]
    }
}
