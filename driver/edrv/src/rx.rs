//! 接收路径 — 对应 `uwifi_rx.c` 的聚合解包、AMSDU 重组与派发
//!
//! 一次 SDIO 聚合传输里平铺若干条记录，每条以 [`HostRxDesc`]（合并了
//! C 侧 `host_rx_desc` 传输字段与 `hw_rxhdr` 派发字段）开头，按
//! `sdio_rx_len` 步进走完。超过单次传输上限的 A-MSDU 被固件切片，
//! 主机侧用单例重组槽按 (seq, sta, tid, fn) 续片，凑齐总长后整帧派发；
//! 标签不接续或滞留超时的半成品直接清弃。
//!
//! 派发区分三路：802.11 原帧交管理路径，A-MSDU 拆成逐条 802.3 子帧，
//! 普通数据帧直接递交。AP 模式下组播帧递交之余还要折返重发（DHCP
//! 客户端广播除外），目的站点在本 BSS 内的单播帧只折返不上送。

use axerrno::{AxError, AxResult};
use skb::SkBuff;

use crate::cfg::*;
use crate::hw::{AsrHw, VifType};
use crate::netdev::{FwBus, NetIf};
use crate::tx::{is_multicast_ether, udp_ports};

/// 序列化后的接收描述符长度。
pub const HOST_RX_DESC_LEN: usize = 32;

/// 数据记录的 id 标记；其余取值是控制面记录，不走本路径。
pub const RX_DESC_ID_DATA: u16 = 0xFFFF;

const RX_FLAG_AMSDU: u8 = 1 << 0;
const RX_FLAG_80211_MPDU: u8 = 1 << 1;
const RX_FLAG_4ADDR: u8 = 1 << 2;
const RX_FLAG_NEW_PEER: u8 = 1 << 3;

/// 每记录接收描述符，合并 C 侧 `struct host_rx_desc` 与 `struct hw_rxhdr`。
///
/// 布局是主机侧自用约定；`0xFF` 的 `vif_idx` / `dst_idx` 表示固件
/// 未能归属。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostRxDesc {
    pub id: u16,
    /// A-MPDU 去重序号，也是分片重组的标签主键。
    pub seq_num: u16,
    /// 分片序号，0 为首片。
    pub fn_num: u8,
    /// 本次聚合传输的记录总数（仅首条记录有效）。
    pub num: u8,
    /// 到下一条记录的步进（对齐后）。
    pub sdio_rx_len: u16,
    /// 载荷在记录内的起始偏移。
    pub pld_offset: u16,
    /// 本记录载荷长度。
    pub frmlen: u16,
    /// 整帧总长；大于 `frmlen` 说明是切片传输。
    pub totol_frmlen: u32,
    pub ampdu_stat_info: u32,
    pub rx_status: u32,
    pub sta_idx: u8,
    pub tid: u8,
    flags: u8,
    pub user_prio: u8,
    pub vif_idx: u8,
    pub dst_idx: u8,
}

impl HostRxDesc {
    #[inline]
    pub fn is_amsdu(&self) -> bool {
        self.flags & RX_FLAG_AMSDU != 0
    }

    #[inline]
    pub fn is_80211_mpdu(&self) -> bool {
        self.flags & RX_FLAG_80211_MPDU != 0
    }

    #[inline]
    pub fn is_4addr(&self) -> bool {
        self.flags & RX_FLAG_4ADDR != 0
    }

    #[inline]
    pub fn is_new_peer(&self) -> bool {
        self.flags & RX_FLAG_NEW_PEER != 0
    }

    pub(crate) fn read_from(src: &[u8]) -> Option<Self> {
        if src.len() < HOST_RX_DESC_LEN {
            return None;
        }
        Some(HostRxDesc {
            id: u16::from_le_bytes([src[0], src[1]]),
            seq_num: u16::from_le_bytes([src[2], src[3]]),
            fn_num: src[4],
            num: src[5],
            sdio_rx_len: u16::from_le_bytes([src[6], src[7]]),
            pld_offset: u16::from_le_bytes([src[8], src[9]]),
            frmlen: u16::from_le_bytes([src[10], src[11]]),
            totol_frmlen: u32::from_le_bytes([src[12], src[13], src[14], src[15]]),
            ampdu_stat_info: u32::from_le_bytes([src[16], src[17], src[18], src[19]]),
            rx_status: u32::from_le_bytes([src[20], src[21], src[22], src[23]]),
            sta_idx: src[24],
            tid: src[25],
            flags: src[26],
            user_prio: src[27],
            vif_idx: src[28],
            dst_idx: src[29],
        })
    }

    #[cfg(test)]
    pub(crate) fn write_to(&self, dst: &mut [u8]) {
        dst[0..2].copy_from_slice(&self.id.to_le_bytes());
        dst[2..4].copy_from_slice(&self.seq_num.to_le_bytes());
        dst[4] = self.fn_num;
        dst[5] = self.num;
        dst[6..8].copy_from_slice(&self.sdio_rx_len.to_le_bytes());
        dst[8..10].copy_from_slice(&self.pld_offset.to_le_bytes());
        dst[10..12].copy_from_slice(&self.frmlen.to_le_bytes());
        dst[12..16].copy_from_slice(&self.totol_frmlen.to_le_bytes());
        dst[16..20].copy_from_slice(&self.ampdu_stat_info.to_le_bytes());
        dst[20..24].copy_from_slice(&self.rx_status.to_le_bytes());
        dst[24] = self.sta_idx;
        dst[25] = self.tid;
        dst[26] = self.flags;
        dst[27] = self.user_prio;
        dst[28] = self.vif_idx;
        dst[29] = self.dst_idx;
        dst[30..32].fill(0);
    }

    #[cfg(test)]
    pub(crate) fn data_record(frmlen: u16, vif_idx: u8, sta_idx: u8) -> Self {
        HostRxDesc {
            id: RX_DESC_ID_DATA,
            seq_num: 0,
            fn_num: 0,
            num: 1,
            sdio_rx_len: 0,
            pld_offset: HOST_RX_DESC_LEN as u16,
            frmlen,
            totol_frmlen: frmlen as u32,
            ampdu_stat_info: 0,
            rx_status: 0,
            sta_idx,
            tid: 0,
            flags: 0,
            user_prio: 0,
            vif_idx,
            dst_idx: INVALID_IDX,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_flags(&mut self, amsdu: bool, mpdu_80211: bool) {
        self.flags = 0;
        if amsdu {
            self.flags |= RX_FLAG_AMSDU;
        }
        if mpdu_80211 {
            self.flags |= RX_FLAG_80211_MPDU;
        }
    }
}

/// A-MSDU 切片重组槽（单例），对应 `uwifi_rx.c` 的 `g_amsdu_malloc_buf` 族。
pub(crate) struct Reassembly {
    buf: Option<SkBuff>,
    first: Option<HostRxDesc>,
    next_fn: u8,
    last_ms: u64,
}

/// `feed` 的结果：锁外需要善后的事。
pub(crate) enum FeedResult {
    /// 片段已收下（或已丢弃并计数），无事可做。
    Consumed,
    /// 凑齐整帧：按首片描述符派发，缓冲用完归还池。
    Complete(HostRxDesc, SkBuff),
    /// 半成品作废，缓冲归还池。
    Discard(SkBuff),
}

impl Reassembly {
    pub(crate) fn new() -> Self {
        Reassembly {
            buf: None,
            first: None,
            next_fn: 0,
            last_ms: 0,
        }
    }

    fn take(&mut self) -> Option<SkBuff> {
        self.first = None;
        self.next_fn = 0;
        self.buf.take()
    }

    /// 收一个切片。首片（fn 0）开槽，后续片标签全匹配才续上；
    /// 标签断裂即丢弃存量，首片可原地重开。
    fn feed(
        &mut self,
        desc: &HostRxDesc,
        payload: &[u8],
        now_ms: u64,
        pool: &skb::SkbPool,
        amsdu_cap: usize,
    ) -> FeedResult {
        if payload.is_empty() {
            log::debug!(
                target: "uwifi::edrv::rx",
                "empty fragment seq {} fn {}, drop", desc.seq_num, desc.fn_num
            );
            return FeedResult::Consumed;
        }
        if let Some(first) = self.first {
            let remaining = first
                .totol_frmlen
                .saturating_sub(self.buf.as_ref().map_or(0, |b| b.len() as u32));
            let fits = desc.seq_num == first.seq_num
                && desc.sta_idx == first.sta_idx
                && desc.tid == first.tid
                && desc.totol_frmlen == first.totol_frmlen
                && desc.fn_num == self.next_fn
                && remaining >= payload.len() as u32;
            if !fits {
                log::debug!(
                    target: "uwifi::edrv::rx",
                    "reassembly tag broken: have seq {} fn {}, got seq {} fn {}",
                    first.seq_num, self.next_fn, desc.seq_num, desc.fn_num
                );
                let stale = self.take();
                let res = match stale {
                    Some(buf) => FeedResult::Discard(buf),
                    None => FeedResult::Consumed,
                };
                if desc.fn_num == 0 {
                    // 旧槽已清，首片重开；善后交给调用方
                    match self.feed(desc, payload, now_ms, pool, amsdu_cap) {
                        FeedResult::Consumed => {}
                        _ => debug_assert!(false, "fresh slot cannot complete"),
                    }
                }
                return res;
            }
        } else {
            if desc.fn_num != 0 {
                log::debug!(
                    target: "uwifi::edrv::rx",
                    "orphan fragment seq {} fn {}, drop", desc.seq_num, desc.fn_num
                );
                return FeedResult::Consumed;
            }
            if desc.totol_frmlen as usize > amsdu_cap {
                log::warn!(
                    target: "uwifi::edrv::rx",
                    "amsdu total {} over cap {}, drop", desc.totol_frmlen, amsdu_cap
                );
                return FeedResult::Consumed;
            }
            let buf = match pool.alloc() {
                Some(b) => b,
                None => {
                    log::warn!(target: "uwifi::edrv::rx", "no rx buffer for reassembly, drop");
                    return FeedResult::Consumed;
                }
            };
            self.buf = Some(buf);
            self.first = Some(*desc);
            self.next_fn = 0;
        }

        let buf = match self.buf.as_mut() {
            Some(b) => b,
            None => return FeedResult::Consumed,
        };
        if !buf.put_slice(payload) {
            log::warn!(target: "uwifi::edrv::rx", "reassembly overflow, drop");
            return match self.take() {
                Some(b) => FeedResult::Discard(b),
                None => FeedResult::Consumed,
            };
        }
        self.next_fn += 1;
        self.last_ms = now_ms;

        let first = match self.first {
            Some(f) => f,
            None => return FeedResult::Consumed,
        };
        if buf.len() as u32 >= first.totol_frmlen {
            let buf = match self.take() {
                Some(b) => b,
                None => return FeedResult::Consumed,
            };
            return FeedResult::Complete(first, buf);
        }
        FeedResult::Consumed
    }

    /// 滞留清理：超过时限的半成品交出清弃。
    fn age(&mut self, now_ms: u64, timeout_ms: u64) -> Option<SkBuff> {
        if self.first.is_some() && now_ms.saturating_sub(self.last_ms) > timeout_ms {
            log::debug!(target: "uwifi::edrv::rx", "reassembly timed out, purge");
            return self.take();
        }
        None
    }
}

/// RFC1042 LLC/SNAP 头。
const LLC_RFC1042: [u8; 6] = [0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00];
/// 桥接隧道 LLC/SNAP 头。
const LLC_BRIDGE_TUNNEL: [u8; 6] = [0xaa, 0xaa, 0x03, 0x00, 0x00, 0xf8];

/// 一条 A-MSDU 子帧解出的 802.3 视图。
struct Subframe<'a> {
    da: &'a [u8],
    sa: &'a [u8],
    /// 解封后的 EtherType（或保留的 802.3 长度字段）。
    ethertype: u16,
    payload: &'a [u8],
    /// 未做 LLC 解封时子帧本身就是合法 802.3 帧，可原地递交。
    raw: Option<&'a [u8]>,
}

/// 按 802.11 规则切下一条子帧；返回 (子帧, 剩余)。
fn next_subframe(buf: &[u8]) -> Option<(Subframe<'_>, &[u8])> {
    if buf.len() < ETH_HLEN {
        return None;
    }
    let sublen = u16::from_be_bytes([buf[12], buf[13]]) as usize;
    let end = ETH_HLEN + sublen;
    if end > buf.len() {
        return None;
    }
    let mut ethertype = sublen as u16;
    let mut payload = &buf[ETH_HLEN..end];
    let mut raw = Some(&buf[..end]);
    // RFC1042/桥接隧道 LLC 解封；AARP 与 IPX 按惯例保留原样
    if payload.len() >= 8 {
        let proto = u16::from_be_bytes([payload[6], payload[7]]);
        let rfc1042 = payload[..6] == LLC_RFC1042 && proto != ETH_P_AARP && proto != ETH_P_IPX;
        let bridge = payload[..6] == LLC_BRIDGE_TUNNEL;
        if rfc1042 || bridge {
            ethertype = proto;
            payload = &payload[8..];
            raw = None;
        }
    }
    // 子帧间按 4 字节对齐补零
    let pad = (4 - end % 4) % 4;
    let rest_at = (end + pad).min(buf.len());
    Some((
        Subframe {
            da: &buf[0..6],
            sa: &buf[6..12],
            ethertype,
            payload,
            raw,
        },
        &buf[rest_at..],
    ))
}

impl<B: FwBus, N: NetIf> AsrHw<B, N> {
    /// 一次 SDIO 聚合传输的入口，对应 `asr_rx_data_handler` 的解包循环。
    ///
    /// 首条记录的 `num` 给出记录总数，每条按 `sdio_rx_len` 步进；
    /// 控制面记录（id 非 0xFFFF）跳过。`now_ms` 是调用方时钟，只用于
    /// 重组滞留判定。
    pub fn rx_process(&self, buf: &[u8], now_ms: u64) -> AxResult<()> {
        let mut off = 0usize;
        let mut left: Option<u8> = None;
        while off + HOST_RX_DESC_LEN <= buf.len() {
            let desc = match HostRxDesc::read_from(&buf[off..]) {
                Some(d) => d,
                None => break,
            };
            let stride = desc.sdio_rx_len as usize;
            if stride < HOST_RX_DESC_LEN || off + stride > buf.len() {
                log::warn!(
                    target: "uwifi::edrv::rx",
                    "rx record stride {} broken at {}, abort walk", stride, off
                );
                self.count_rx_error(desc.vif_idx);
                return Err(AxError::InvalidData);
            }
            let n = *left.get_or_insert(desc.num);
            if n == 0 {
                break;
            }
            left = Some(n - 1);

            let pld = desc.pld_offset as usize;
            let end = pld + desc.frmlen as usize;
            if end > stride {
                log::warn!(
                    target: "uwifi::edrv::rx",
                    "rx payload {}..{} over record {}, abort walk", pld, end, stride
                );
                self.count_rx_error(desc.vif_idx);
                return Err(AxError::InvalidData);
            }
            if desc.id == RX_DESC_ID_DATA {
                self.rx_frame(&desc, &buf[off + pld..off + end], now_ms);
            } else {
                log::trace!(
                    target: "uwifi::edrv::rx",
                    "skip non-data record id {:#06x}", desc.id
                );
            }
            off += stride;
        }
        Ok(())
    }

    /// 单条数据记录：切片走重组槽，完整帧直接派发。
    fn rx_frame(&self, desc: &HostRxDesc, payload: &[u8], now_ms: u64) {
        if desc.totol_frmlen > desc.frmlen as u32 {
            let result = {
                let mut rx = self.rx.lock();
                rx.reass
                    .feed(desc, payload, now_ms, &self.rx_pool, self.cfg.amsdu_rx_len)
            };
            match result {
                FeedResult::Consumed => {}
                FeedResult::Complete(first, buf) => {
                    self.rx_dispatch(&first, buf.data());
                    self.rx_pool.release(buf);
                }
                FeedResult::Discard(buf) => {
                    self.rx_pool.release(buf);
                    self.count_rx_error(desc.vif_idx);
                }
            }
            return;
        }
        self.rx_dispatch(desc, payload);
    }

    /// 重组滞留巡检，由上层周期时钟驱动。
    pub fn rx_reassembly_check(&self, now_ms: u64) -> AxResult<()> {
        let stale = {
            let mut rx = self.rx.lock();
            rx.reass.age(now_ms, self.cfg.reassembly_timeout_ms)
        };
        if let Some(buf) = stale {
            self.rx_pool.release(buf);
        }
        Ok(())
    }

    /// 三路派发：802.11 原帧 / A-MSDU 拆分 / 普通 802.3。
    /// 对应 `asr_rx_data_skb` 的主干。
    fn rx_dispatch(&self, desc: &HostRxDesc, frame: &[u8]) {
        if desc.rx_status != 0 {
            log::trace!(
                target: "uwifi::edrv::rx",
                "rx status {:#010x} sta {} tid {}", desc.rx_status, desc.sta_idx, desc.tid
            );
        }
        if desc.is_80211_mpdu() {
            self.rx_mgmt_frame(desc, frame);
            return;
        }

        let vif_idx = match self.resolve_rx_vif(desc.vif_idx) {
            Some(v) => v,
            None => {
                log::debug!(target: "uwifi::edrv::rx", "rx frame without live vif, drop");
                return;
            }
        };
        if desc.is_new_peer() {
            log::debug!(
                target: "uwifi::edrv::rx",
                "new peer traffic on vif {}, sta {}", vif_idx, desc.sta_idx
            );
        }

        if desc.is_amsdu() {
            let mut rest = frame;
            while !rest.is_empty() {
                match next_subframe(rest) {
                    Some((sub, tail)) => {
                        self.deliver_subframe(vif_idx, desc, &sub);
                        rest = tail;
                    }
                    None => {
                        // 子帧长度字段烂了：整串作废
                        log::warn!(
                            target: "uwifi::edrv::rx",
                            "malformed amsdu subframe, purge {} byte(s)", rest.len()
                        );
                        self.count_rx_error(vif_idx);
                        break;
                    }
                }
            }
            return;
        }

        self.forward_or_resend(vif_idx, desc, frame);
    }

    /// A-MSDU 子帧重新拼成 802.3 帧后走与普通帧相同的转发判定。
    /// 无需解封的子帧原地递交，解封过的借池缓冲重排头部。
    fn deliver_subframe(&self, vif_idx: u8, desc: &HostRxDesc, sub: &Subframe<'_>) {
        if let Some(raw) = sub.raw {
            self.forward_or_resend(vif_idx, desc, raw);
            return;
        }
        let mut skb = match self.rx_pool.alloc() {
            Some(s) => s,
            None => {
                self.count_rx_dropped(vif_idx);
                return;
            }
        };
        let ok = skb.put_slice(sub.da)
            && skb.put_slice(sub.sa)
            && skb.put_slice(&sub.ethertype.to_be_bytes())
            && skb.put_slice(sub.payload);
        if ok {
            self.forward_or_resend(vif_idx, desc, skb.data());
        } else {
            self.count_rx_dropped(vif_idx);
        }
        self.rx_pool.release(skb);
    }

    /// 递交 / 折返判定，对应 `asr_rx_data_skb` 的 AP 桥接段。
    ///
    /// AP 且未开隔离时：组播帧递交并折返（DHCP 客户端广播不折返，
    /// 免得打扰别家客户端的租约流程）；目的站点在本 BSS 的单播帧只
    /// 折返不递交。折返走正常发送路径，占用发送池与水位。
    fn forward_or_resend(&self, vif_idx: u8, desc: &HostRxDesc, frame: &[u8]) {
        if frame.len() < ETH_HLEN {
            self.count_rx_error(vif_idx);
            return;
        }
        let mut forward = true;
        let mut resend = false;
        let mut home_vif = vif_idx;
        {
            let tx = self.tx.lock();
            let vif = &tx.vifs[vif_idx as usize];
            if !vif.up {
                drop(tx);
                self.count_rx_dropped(vif_idx);
                return;
            }
            if vif.iftype == VifType::Ap && !vif.isolate {
                if is_multicast_ether(&frame[0..6]) {
                    resend = !is_dhcp_client_broadcast(frame);
                } else if desc.dst_idx != INVALID_IDX
                    && (desc.dst_idx as usize) < tx.stas.len()
                    && tx.stas[desc.dst_idx as usize].valid
                {
                    // 目的站点挂在哪个 BSS 就折返到哪个接口
                    let vlan = tx.stas[desc.dst_idx as usize].vlan_idx;
                    if (vlan as usize) < tx.vifs.len() && tx.vifs[vlan as usize].up {
                        home_vif = vlan;
                        forward = false;
                        resend = true;
                    }
                }
            }
        }

        if forward {
            self.net.deliver(vif_idx, frame);
            let mut tx = self.tx.lock();
            let stats = &mut tx.vifs[vif_idx as usize].stats;
            stats.rx_packets += 1;
            stats.rx_bytes += frame.len() as u32;
        }
        if resend {
            self.resend_frame(home_vif, frame);
        }
    }

    /// 折返一帧回空口，对应 `asr_rx_data_skb_resend`。
    fn resend_frame(&self, vif_idx: u8, frame: &[u8]) {
        {
            let mut tx = self.tx.lock();
            tx.vifs[vif_idx as usize].is_resending = true;
        }
        let res = self.start_xmit(vif_idx, frame);
        {
            let mut tx = self.tx.lock();
            tx.vifs[vif_idx as usize].is_resending = false;
        }
        if let Err(e) = res {
            log::debug!(
                target: "uwifi::edrv::rx",
                "resend on vif {} failed: {:?}", vif_idx, e
            );
        }
    }

    /// 802.11 原帧走管理路径；固件没归属的帧按惯例广播给相关接口。
    fn rx_mgmt_frame(&self, desc: &HostRxDesc, frame: &[u8]) {
        if desc.vif_idx != INVALID_IDX {
            if (desc.vif_idx as usize) < self.cfg.vif_max as usize {
                self.net.rx_mgmt(desc.vif_idx, frame);
            }
            return;
        }
        // probe req 只对 AP 有意义，其余给所有在用接口
        let probe_req = frame.len() >= 2 && frame[0] & 0xfc == 0x40;
        let targets: alloc::vec::Vec<u8> = {
            let tx = self.tx.lock();
            tx.vifs
                .iter()
                .filter(|v| v.up && (!probe_req || v.iftype == VifType::Ap))
                .map(|v| v.vif_idx)
                .collect()
        };
        for vif_idx in targets {
            self.net.rx_mgmt(vif_idx, frame);
        }
    }

    /// 固件未归属的数据帧落到第一个在用接口。
    fn resolve_rx_vif(&self, vif_idx: u8) -> Option<u8> {
        if vif_idx != INVALID_IDX {
            if (vif_idx as usize) < self.cfg.vif_max as usize {
                return Some(vif_idx);
            }
            return None;
        }
        let tx = self.tx.lock();
        tx.vifs.iter().find(|v| v.up).map(|v| v.vif_idx)
    }

    fn count_rx_error(&self, vif_idx: u8) {
        let mut tx = self.tx.lock();
        if (vif_idx as usize) < tx.vifs.len() {
            tx.vifs[vif_idx as usize].stats.rx_errors += 1;
        }
    }

    fn count_rx_dropped(&self, vif_idx: u8) {
        let mut tx = self.tx.lock();
        if (vif_idx as usize) < tx.vifs.len() {
            tx.vifs[vif_idx as usize].stats.rx_dropped += 1;
        }
    }
}

/// IPv4/UDP 68→67：DHCP 客户端广播（DISCOVER/REQUEST）。
fn is_dhcp_client_broadcast(frame: &[u8]) -> bool {
    matches!(
        udp_ports(frame),
        Some((DHCP_PORT_CLIENT, DHCP_PORT_SERVER))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::VifType;
    use crate::test_support::*;
    use alloc::vec::Vec;

    fn eth(dest: [u8; 6], src: [u8; 6], ethertype: u16, payload: &[u8]) -> Vec<u8> {
        let mut f = Vec::new();
        f.extend_from_slice(&dest);
        f.extend_from_slice(&src);
        f.extend_from_slice(&ethertype.to_be_bytes());
        f.extend_from_slice(payload);
        f
    }

    /// 把若干 (描述符, 载荷) 拼成一次聚合传输。
    fn transfer(records: &[(HostRxDesc, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        let num = records.len() as u8;
        for (desc, payload) in records {
            let mut desc = *desc;
            desc.num = num;
            desc.frmlen = payload.len() as u16;
            if desc.totol_frmlen == 0 {
                desc.totol_frmlen = payload.len() as u32;
            }
            desc.pld_offset = HOST_RX_DESC_LEN as u16;
            let stride = align_blksz_hi(HOST_RX_DESC_LEN + payload.len());
            desc.sdio_rx_len = stride as u16;
            let at = buf.len();
            buf.resize(at + stride, 0);
            desc.write_to(&mut buf[at..at + HOST_RX_DESC_LEN]);
            buf[at + HOST_RX_DESC_LEN..at + HOST_RX_DESC_LEN + payload.len()]
                .copy_from_slice(payload);
        }
        buf
    }

    #[test]
    fn single_frame_delivers_to_stack() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Station, 0);
        let frame = eth([2; 6], sta_mac(0), ETH_P_IP, &[0u8; 40]);
        let buf = transfer(&[(HostRxDesc::data_record(0, 0, 0), &frame)]);
        hw.rx_process(&buf, 0).unwrap();
        assert_eq!(hw.net().delivered(), alloc::vec![(0u8, frame.clone())]);
        let tx = hw.tx_lock();
        assert_eq!(tx.vifs[0].stats.rx_packets, 1);
        assert_eq!(tx.vifs[0].stats.rx_bytes, frame.len() as u32);
    }

    #[test]
    fn aggregated_transfer_walks_all_records() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Station, 0);
        let f1 = eth([2; 6], sta_mac(0), ETH_P_IP, &[1u8; 30]);
        let f2 = eth([2; 6], sta_mac(0), ETH_P_IP, &[2u8; 50]);
        let f3 = eth([2; 6], sta_mac(0), ETH_P_IP, &[3u8; 20]);
        let d = HostRxDesc::data_record(0, 0, 0);
        let buf = transfer(&[(d, &f1), (d, &f2), (d, &f3)]);
        hw.rx_process(&buf, 0).unwrap();
        assert_eq!(hw.net().delivered().len(), 3);
        assert_eq!(hw.net().delivered()[1].1, f2);
    }

    #[test]
    fn non_data_records_are_skipped() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Station, 0);
        let frame = eth([2; 6], sta_mac(0), ETH_P_IP, &[0u8; 30]);
        let mut msg = HostRxDesc::data_record(0, 0, 0);
        msg.id = 0x1234;
        let buf = transfer(&[(msg, &[0u8; 16]), (HostRxDesc::data_record(0, 0, 0), &frame)]);
        hw.rx_process(&buf, 0).unwrap();
        assert_eq!(hw.net().delivered().len(), 1);
    }

    #[test]
    fn broken_stride_rejected() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Station, 0);
        let frame = eth([2; 6], sta_mac(0), ETH_P_IP, &[0u8; 30]);
        let mut buf = transfer(&[(HostRxDesc::data_record(0, 0, 0), &frame)]);
        // 步进字段清零
        buf[6] = 0;
        buf[7] = 0;
        assert_eq!(hw.rx_process(&buf, 0), Err(axerrno::AxError::InvalidData));
    }

    #[test]
    fn ap_multicast_forwards_and_resends() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        let frame = eth([0xff; 6], sta_mac(0), ETH_P_IP, &[0u8; 40]);
        let buf = transfer(&[(HostRxDesc::data_record(0, 0, 0), &frame)]);
        hw.rx_process(&buf, 0).unwrap();
        // 递交一份、折返一份
        assert_eq!(hw.net().delivered().len(), 1);
        let pushes = hw.bus().pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0.eth_dest_addr, [0xff; 6]);
    }

    #[test]
    fn dhcp_client_broadcast_not_resent() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        // IPv4/UDP 68→67
        let mut ip = alloc::vec![0u8; 28];
        ip[0] = 0x45;
        ip[9] = 17;
        ip[20..22].copy_from_slice(&DHCP_PORT_CLIENT.to_be_bytes());
        ip[22..24].copy_from_slice(&DHCP_PORT_SERVER.to_be_bytes());
        let frame = eth([0xff; 6], sta_mac(0), ETH_P_IP, &ip);
        let buf = transfer(&[(HostRxDesc::data_record(0, 0, 0), &frame)]);
        hw.rx_process(&buf, 0).unwrap();
        assert_eq!(hw.net().delivered().len(), 1);
        assert_eq!(hw.bus().push_count(), 0);
    }

    #[test]
    fn intra_bss_unicast_resends_without_delivery() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        hw.sta_attach(1, 0, sta_mac(1), true, 0, 0).unwrap();
        let frame = eth(sta_mac(1), sta_mac(0), ETH_P_IP, &[0u8; 40]);
        let mut desc = HostRxDesc::data_record(0, 0, 0);
        desc.dst_idx = 1;
        let buf = transfer(&[(desc, &frame)]);
        hw.rx_process(&buf, 0).unwrap();
        assert!(hw.net().delivered().is_empty());
        let pushes = hw.bus().pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0.staid, 1);
    }

    #[test]
    fn isolate_blocks_bridging() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        hw.sta_attach(1, 0, sta_mac(1), true, 0, 0).unwrap();
        hw.tx_lock().vifs[0].isolate = true;
        let frame = eth(sta_mac(1), sta_mac(0), ETH_P_IP, &[0u8; 40]);
        let mut desc = HostRxDesc::data_record(0, 0, 0);
        desc.dst_idx = 1;
        let buf = transfer(&[(desc, &frame)]);
        hw.rx_process(&buf, 0).unwrap();
        // 隔离模式：只递交，不折返
        assert_eq!(hw.net().delivered().len(), 1);
        assert_eq!(hw.bus().push_count(), 0);
    }

    fn amsdu_payload() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        // 子帧 1：RFC1042 封装的 IPv4
        let inner1: Vec<u8> = [0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00, 0x08, 0x00]
            .iter()
            .copied()
            .chain([0x45u8, 0, 0, 20].iter().copied())
            .chain(core::iter::repeat(0u8).take(16))
            .collect();
        let expect1 = eth([2; 6], [3; 6], ETH_P_IP, &inner1[8..]);
        // 子帧 2：裸 802.3（无 SNAP）
        let inner2 = alloc::vec![0x11u8; 6];
        let mut amsdu = Vec::new();
        amsdu.extend_from_slice(&[2; 6]);
        amsdu.extend_from_slice(&[3; 6]);
        amsdu.extend_from_slice(&(inner1.len() as u16).to_be_bytes());
        amsdu.extend_from_slice(&inner1);
        let pad = (4 - (ETH_HLEN + inner1.len()) % 4) % 4;
        amsdu.extend(core::iter::repeat(0u8).take(pad));
        amsdu.extend_from_slice(&[2; 6]);
        amsdu.extend_from_slice(&[4; 6]);
        amsdu.extend_from_slice(&(inner2.len() as u16).to_be_bytes());
        amsdu.extend_from_slice(&inner2);
        let mut expect2 = Vec::new();
        expect2.extend_from_slice(&[2; 6]);
        expect2.extend_from_slice(&[4; 6]);
        expect2.extend_from_slice(&(inner2.len() as u16).to_be_bytes());
        expect2.extend_from_slice(&inner2);
        (amsdu, expect1, expect2)
    }

    #[test]
    fn amsdu_splits_into_8023_frames() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Station, 0);
        let (amsdu, expect1, expect2) = amsdu_payload();
        let mut desc = HostRxDesc::data_record(0, 0, 0);
        desc.set_flags(true, false);
        let buf = transfer(&[(desc, &amsdu)]);
        hw.rx_process(&buf, 0).unwrap();
        let delivered = hw.net().delivered();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].1, expect1);
        assert_eq!(delivered[1].1, expect2);
    }

    #[test]
    fn fragmented_amsdu_reassembles_across_transfers() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Station, 0);
        let (amsdu, expect1, expect2) = amsdu_payload();
        let cut1 = 20usize;
        let cut2 = 36usize;
        let total = amsdu.len() as u32;
        let mut d0 = HostRxDesc::data_record(0, 0, 0);
        d0.set_flags(true, false);
        d0.seq_num = 7;
        d0.totol_frmlen = total;
        let mut d1 = d0;
        d1.fn_num = 1;
        let mut d2 = d0;
        d2.fn_num = 2;
        // 三次传输各带一片
        hw.rx_process(&transfer(&[(d0, &amsdu[..cut1])]), 10).unwrap();
        assert!(hw.net().delivered().is_empty());
        hw.rx_process(&transfer(&[(d1, &amsdu[cut1..cut2])]), 20).unwrap();
        assert!(hw.net().delivered().is_empty());
        hw.rx_process(&transfer(&[(d2, &amsdu[cut2..])]), 30).unwrap();
        let delivered = hw.net().delivered();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].1, expect1);
        assert_eq!(delivered[1].1, expect2);
        // 重组缓冲已归还
        assert_eq!(hw.rx_pool_free(), hw.rx_pool_capacity());
    }

    #[test]
    fn reassembly_tag_mismatch_discards() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Station, 0);
        let (amsdu, ..) = amsdu_payload();
        let total = amsdu.len() as u32;
        let mut d0 = HostRxDesc::data_record(0, 0, 0);
        d0.set_flags(true, false);
        d0.seq_num = 7;
        d0.totol_frmlen = total;
        hw.rx_process(&transfer(&[(d0, &amsdu[..20])]), 0).unwrap();
        // 序号断裂的续片：存量作废
        let mut bad = d0;
        bad.seq_num = 8;
        bad.fn_num = 1;
        hw.rx_process(&transfer(&[(bad, &amsdu[20..30])]), 0).unwrap();
        assert!(hw.net().delivered().is_empty());
        assert_eq!(hw.tx_lock().vifs[0].stats.rx_errors, 1);
        assert_eq!(hw.rx_pool_free(), hw.rx_pool_capacity());
    }

    #[test]
    fn reassembly_timeout_purges_slot() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Station, 0);
        let (amsdu, ..) = amsdu_payload();
        let mut d0 = HostRxDesc::data_record(0, 0, 0);
        d0.set_flags(true, false);
        d0.totol_frmlen = amsdu.len() as u32;
        hw.rx_process(&transfer(&[(d0, &amsdu[..20])]), 0).unwrap();
        assert_eq!(hw.rx_pool_free(), hw.rx_pool_capacity() - 1);
        let timeout = hw.cfg().reassembly_timeout_ms;
        hw.rx_reassembly_check(timeout + 1).unwrap();
        assert_eq!(hw.rx_pool_free(), hw.rx_pool_capacity());
        // 迟到的续片成了孤儿
        let mut d1 = d0;
        d1.fn_num = 1;
        hw.rx_process(&transfer(&[(d1, &amsdu[20..30])]), timeout + 2).unwrap();
        assert!(hw.net().delivered().is_empty());
    }

    #[test]
    fn mgmt_frame_routes_to_mgmt_path() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Station, 0);
        let mut beacon = alloc::vec![0u8; 36];
        beacon[0] = 0x80;
        let mut desc = HostRxDesc::data_record(0, 0, 0);
        desc.set_flags(false, true);
        let buf = transfer(&[(desc, &beacon)]);
        hw.rx_process(&buf, 0).unwrap();
        assert!(hw.net().delivered().is_empty());
        assert_eq!(hw.net().mgmt(), alloc::vec![(0u8, beacon.clone())]);
    }

    #[test]
    fn orphan_probe_req_goes_to_ap_vifs_only() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        hw.vif_attach(1, VifType::Station, [3; 6]).unwrap();
        let mut probe = alloc::vec![0u8; 24];
        probe[0] = 0x40;
        let mut desc = HostRxDesc::data_record(0, INVALID_IDX, INVALID_IDX);
        desc.set_flags(false, true);
        let buf = transfer(&[(desc, &probe)]);
        hw.rx_process(&buf, 0).unwrap();
        assert_eq!(hw.net().mgmt(), alloc::vec![(0u8, probe.clone())]);
    }

    #[test]
    fn unowned_data_falls_to_first_up_vif() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Station, 0);
        let frame = eth([2; 6], sta_mac(0), ETH_P_IP, &[0u8; 30]);
        let desc = HostRxDesc::data_record(0, INVALID_IDX, 0);
        let buf = transfer(&[(desc, &frame)]);
        hw.rx_process(&buf, 0).unwrap();
        assert_eq!(hw.net().delivered(), alloc::vec![(0u8, frame.clone())]);
    }
}
