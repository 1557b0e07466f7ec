//! 发送路径 — 对应 `uwifi_tx.c` 的分类、组描述符、入队与确认回收
//!
//! 数据帧：以太头解出 TID 与目标站点，ACM 位图逐级降级 AC，组
//! [`Hostdesc`] 序列化进 skb 头部后压入对应 TXQ；管理帧按站点管理
//! 队列 / 离信道队列 / 未知站点队列三选一。推送成功的帧挂在途链，
//! 固件确认时归还硬件信用、释放水位占用并回收缓冲，要求重传的帧
//! 带 RETRY 标志插回队首重传簇。

use axerrno::{AxError, AxResult};
use skb::SkBuff;

use crate::cfg::*;
use crate::flow;
use crate::hw::{AsrHw, TxEnv, VifType};
use crate::netdev::{FwBus, NetIf};
use crate::ps::TrafficInd;
use crate::txq::{txq_offchan_idx, txq_vif_idx, VifTxqType};

/// 序列化后的描述符长度（帧前缀，含补零到 8 字节对齐）。
pub const HOSTDESC_LEN: usize = 40;

/// TX 控制标志位，对应 `uwifi_tx.h` 的 TXU_CNTRL_* 组。
pub const TXU_CNTRL_RETRY: u16 = 1 << 0;
pub const TXU_CNTRL_MORE_DATA: u16 = 1 << 2;
pub const TXU_CNTRL_MGMT: u16 = 1 << 3;
pub const TXU_CNTRL_MGMT_NO_CCK: u16 = 1 << 4;
pub const TXU_CNTRL_AMSDU: u16 = 1 << 6;
pub const TXU_CNTRL_MGMT_ROBUST: u16 = 1 << 7;
pub const TXU_CNTRL_USE_4ADDR: u16 = 1 << 8;
pub const TXU_CNTRL_EOSP: u16 = 1 << 9;
pub const TXU_CNTRL_POSTPONE_PS: u16 = 1 << 12;
pub const TXU_CNTRL_DROP: u16 = 1 << 15;

/// 每帧发送描述符，对应 `struct hostdesc`。
///
/// C 侧把它直接铺在帧前的 headroom 里；这里同样序列化进 skb 头部，
/// 字段含义一致，`txq_idx` 取代了 C 的 `txq` 指针（竞技场句柄）。
/// 布局是主机侧自用约定，不是芯片 ABI。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hostdesc {
    /// 本帧 SDIO 传输长度（= 对齐后总长 - 2）。
    pub sdio_tx_len: u16,
    /// 描述符 + 载荷的未对齐总长。
    pub sdio_tx_total_len: u16,
    /// 目标硬件队列编号。
    pub queue_idx: u8,
    /// SDIO 聚合帧数（单帧为 0）。
    pub agg_num: u8,
    /// 载荷起始偏移（数据帧越过描述符与以太头）。
    pub packet_offset: u16,
    /// 载荷长度（数据帧不含以太头）。
    pub packet_len: u16,
    /// 帧 TID，管理帧与非 QoS 为 0xFF。
    pub tid: u8,
    pub vif_idx: u8,
    /// 目标站点，未知为 0xFF。
    pub staid: u8,
    pub flags: u16,
    /// 来源 TXQ 竞技场句柄（确认路径回溯用）。
    pub txq_idx: u16,
    /// 序列号，未分配为 0xFFFF。
    pub sn: u16,
    pub ethertype: u16,
    pub eth_dest_addr: [u8; ETH_ALEN],
    pub eth_src_addr: [u8; ETH_ALEN],
}

impl Hostdesc {
    pub(crate) fn zeroed() -> Self {
        Hostdesc {
            sdio_tx_len: 0,
            sdio_tx_total_len: 0,
            queue_idx: 0,
            agg_num: 0,
            packet_offset: 0,
            packet_len: 0,
            tid: 0,
            vif_idx: 0,
            staid: INVALID_IDX,
            flags: 0,
            txq_idx: TXQ_INACTIVE,
            sn: 0xFFFF,
            ethertype: 0,
            eth_dest_addr: [0; ETH_ALEN],
            eth_src_addr: [0; ETH_ALEN],
        }
    }

    /// 序列化到帧前缀（小端定长布局）。
    pub(crate) fn write_to(&self, dst: &mut [u8]) {
        debug_assert!(dst.len() >= HOSTDESC_LEN);
        dst[0..2].copy_from_slice(&self.sdio_tx_len.to_le_bytes());
        dst[2..4].copy_from_slice(&self.sdio_tx_total_len.to_le_bytes());
        dst[4] = self.queue_idx;
        dst[5] = self.agg_num;
        dst[6..8].copy_from_slice(&self.packet_offset.to_le_bytes());
        dst[8..10].copy_from_slice(&self.packet_len.to_le_bytes());
        dst[10] = self.tid;
        dst[11] = self.vif_idx;
        dst[12] = self.staid;
        dst[13] = 0;
        dst[14..16].copy_from_slice(&self.flags.to_le_bytes());
        dst[16..18].copy_from_slice(&self.txq_idx.to_le_bytes());
        dst[18..20].copy_from_slice(&self.sn.to_le_bytes());
        dst[20..22].copy_from_slice(&self.ethertype.to_le_bytes());
        dst[22..28].copy_from_slice(&self.eth_dest_addr);
        dst[28..34].copy_from_slice(&self.eth_src_addr);
        dst[34..HOSTDESC_LEN].fill(0);
    }

    /// 从帧前缀解析回描述符；长度不足返回 None。
    pub(crate) fn read_from(src: &[u8]) -> Option<Self> {
        if src.len() < HOSTDESC_LEN {
            return None;
        }
        Some(Hostdesc {
            sdio_tx_len: u16::from_le_bytes([src[0], src[1]]),
            sdio_tx_total_len: u16::from_le_bytes([src[2], src[3]]),
            queue_idx: src[4],
            agg_num: src[5],
            packet_offset: u16::from_le_bytes([src[6], src[7]]),
            packet_len: u16::from_le_bytes([src[8], src[9]]),
            tid: src[10],
            vif_idx: src[11],
            staid: src[12],
            flags: u16::from_le_bytes([src[14], src[15]]),
            txq_idx: u16::from_le_bytes([src[16], src[17]]),
            sn: u16::from_le_bytes([src[18], src[19]]),
            ethertype: u16::from_le_bytes([src[20], src[21]]),
            eth_dest_addr: [src[22], src[23], src[24], src[25], src[26], src[27]],
            eth_src_addr: [src[28], src[29], src[30], src[31], src[32], src[33]],
        })
    }

    /// 只读出 flags 字段（重传帧识别用，免整层解析）。
    pub(crate) fn peek_flags(src: &[u8]) -> Option<u16> {
        if src.len() < HOSTDESC_LEN {
            return None;
        }
        Some(u16::from_le_bytes([src[14], src[15]]))
    }

    /// 在已序列化的前缀上改写 flags（确认路径补 RETRY 位）。
    pub(crate) fn patch_flags(dst: &mut [u8], flags: u16) {
        debug_assert!(dst.len() >= HOSTDESC_LEN);
        dst[14..16].copy_from_slice(&flags.to_le_bytes());
    }

    /// 本帧占用的传输字节数（对齐后，含尾部结束标记）。
    #[inline]
    pub(crate) fn ring_len(&self) -> u32 {
        self.sdio_tx_len as u32 + 2
    }
}

/// 发送状态字，对应 `union asr_hw_txstatus`。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxStatus(pub u32);

impl TxStatus {
    pub const TX_DONE: u32 = 1 << 0;
    pub const RETRY_REQUIRED: u32 = 1 << 1;
    pub const SW_RETRY_REQUIRED: u32 = 1 << 2;

    #[inline]
    pub fn tx_done(self) -> bool {
        self.0 & Self::TX_DONE != 0
    }

    #[inline]
    pub fn retry_required(self) -> bool {
        self.0 & (Self::RETRY_REQUIRED | Self::SW_RETRY_REQUIRED) != 0
    }
}

/// 发送确认，对应 `struct tx_cfm_tag`。
#[derive(Clone, Copy, Debug)]
pub struct TxCfmTag {
    pub pn: [u16; 4],
    pub sn: u16,
    pub timestamp: u16,
    /// 本次确认返还给 TXQ 的信用（0 或 1）。
    pub credits: i8,
    pub ampdu_size: u8,
    pub status: TxStatus,
}

impl TxCfmTag {
    /// 成功确认。
    pub fn done(credits: i8) -> Self {
        TxCfmTag {
            pn: [0; 4],
            sn: 0,
            timestamp: 0,
            credits,
            ampdu_size: 1,
            status: TxStatus(TxStatus::TX_DONE),
        }
    }

    /// 要求重传的确认。
    pub fn retry(credits: i8) -> Self {
        TxCfmTag {
            pn: [0; 4],
            sn: 0,
            timestamp: 0,
            credits,
            ampdu_size: 0,
            status: TxStatus(TxStatus::RETRY_REQUIRED),
        }
    }
}

/// 从以太帧解 TID：IPv4/IPv6 取 DSCP 高三位，802.21 帧固定 7，其余 0。
/// 对应 `asr_get_tid_from_skb_data`。
pub(crate) fn tid_from_frame(frame: &[u8]) -> u8 {
    if frame.len() < ETH_HLEN + 2 {
        return 0;
    }
    let ethertype = u16::from_be_bytes([frame[12], frame[13]]);
    let dsfield = match ethertype {
        ETH_P_IP => frame[ETH_HLEN + 1] & 0xfc,
        ETH_P_IPV6 => (((u16::from_be_bytes([frame[ETH_HLEN], frame[ETH_HLEN + 1]]) >> 4) & 0xff)
            as u8)
            & 0xfc,
        ETH_P_80221 => return 7,
        _ => return 0,
    };
    dsfield >> 5
}

/// 按站点 ACM 位图降级：当前 AC 被管制就落一级并换用该级代表 TID，
/// 落到 BK 为止。对应 `asr_downgrade_ac`。
pub(crate) fn downgrade_ac(acm: u8, tid: u8) -> u8 {
    let mut ac = ASR_TID2HWQ[(tid & 7) as usize];
    let mut tid = tid;
    while acm & (1 << ac) != 0 {
        if ac == ASR_HWQ_BK {
            return 1;
        }
        ac -= 1;
        tid = ASR_DOWN_HWQ2TID[ac as usize];
    }
    tid
}

#[inline]
pub(crate) fn is_multicast_ether(addr: &[u8]) -> bool {
    addr[0] & 1 != 0
}

/// IPv4/UDP 帧解出 (源端口, 目的端口)；非 UDP 返回 None。
/// DHCP 转发抑制与发送日志共用。
pub(crate) fn udp_ports(frame: &[u8]) -> Option<(u16, u16)> {
    if frame.len() < ETH_HLEN + 20 + 8 {
        return None;
    }
    if u16::from_be_bytes([frame[12], frame[13]]) != ETH_P_IP {
        return None;
    }
    let ihl = (frame[ETH_HLEN] & 0x0f) as usize * 4;
    if frame[ETH_HLEN + 9] != 17 {
        return None;
    }
    let udp = ETH_HLEN + ihl;
    if frame.len() < udp + 4 {
        return None;
    }
    Some((
        u16::from_be_bytes([frame[udp], frame[udp + 1]]),
        u16::from_be_bytes([frame[udp + 2], frame[udp + 3]]),
    ))
}

/// 管理帧是否属于受保护类别（deauth / disassoc / 非公开 action）。
/// 对应 `asr_is_robust_mgmt_frame`。
pub(crate) fn is_robust_mgmt(frame: &[u8]) -> bool {
    if frame.len() < 2 {
        return false;
    }
    let fc = u16::from_le_bytes([frame[0], frame[1]]);
    if fc & 0x0c != 0 {
        return false;
    }
    match fc & 0xf0 {
        0xa0 | 0xc0 => true,
        0xd0 => frame
            .get(24)
            .map(|&cat| !matches!(cat, 4 | 7 | 15 | 127))
            .unwrap_or(false),
        _ => false,
    }
}

/// 数据帧的目标解析结果。
struct TxInfo {
    sta_idx: u8,
    tid: u8,
}

impl TxEnv {
    /// 解析数据帧目标站点与 TID，对应 `asr_select_queue` + `asr_get_tx_info`。
    ///
    /// STATION 模式固定走 AP 对端；AP 模式按目的 MAC 匹配关联站点，
    /// 组播落到 BCMC 伪站点。QoS 站点按 DSCP 分 TID 并过 ACM 降级，
    /// 非 QoS 一律 TID 0。无法匹配返回 None（PRIO_STA_NULL 语义）。
    fn tx_info(&self, cfg: &ModParams, vif_idx: u8, frame: &[u8]) -> Option<TxInfo> {
        let vif = &self.vifs[vif_idx as usize];
        let dest = &frame[0..ETH_ALEN];
        let sta_idx = match vif.iftype {
            VifType::Station => {
                if vif.sta_ap_idx == INVALID_IDX {
                    return None;
                }
                vif.sta_ap_idx
            }
            VifType::Ap => {
                if is_multicast_ether(dest) {
                    cfg.bcmc_sta_idx(vif_idx)
                } else {
                    *vif.sta_list.iter().find(|&&i| {
                        let sta = &self.stas[i as usize];
                        sta.valid && sta.mac_addr == dest
                    })?
                }
            }
        };
        let sta = &self.stas[sta_idx as usize];
        let tid = if sta_idx < cfg.sta_max && sta.qos {
            let mut tid = tid_from_frame(frame) & 7;
            if sta.acm != 0 {
                tid = downgrade_ac(sta.acm, tid);
            }
            tid
        } else {
            0
        };
        Some(TxInfo { sta_idx, tid })
    }
}

impl<B: FwBus, N: NetIf> AsrHw<B, N> {
    /// 数据帧发送入口，对应 `asr_start_xmit` 的聚合路径。
    ///
    /// 帧被复制进池缓冲、前缀描述符后压入目标 TXQ 并立即调度一轮。
    /// 闸门关闭时拒绝（`ResourceBusy`，帧不计丢包、不消费，转发重注
    /// 的帧豁免）；无目标站点、超长、池竭则丢弃计数。
    pub fn start_xmit(&self, vif_idx: u8, frame: &[u8]) -> AxResult<()> {
        if vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        if !tx.vifs[vif_idx as usize].up {
            return Err(AxError::BadState);
        }
        if frame.len() < ETH_HLEN {
            tx.vifs[vif_idx as usize].stats.tx_dropped += 1;
            return Err(AxError::InvalidData);
        }

        let info = match tx.tx_info(&self.cfg, vif_idx, frame) {
            Some(info) => info,
            None => {
                tx.vifs[vif_idx as usize].stats.tx_dropped += 1;
                log::debug!(
                    target: "uwifi::edrv::tx",
                    "vif {} no sta for dest {:02x}:{:02x}:..:{:02x}, drop",
                    vif_idx, frame[0], frame[1], frame[5]
                );
                return Err(AxError::NotConnected);
            }
        };
        if !tx.stas[info.sta_idx as usize].valid {
            tx.vifs[vif_idx as usize].stats.tx_dropped += 1;
            return Err(AxError::NotConnected);
        }

        // 高水位评估；关着的闸门只放行转发重注帧
        let gate = flow::tx_flow_ctrl(&mut tx, &self.cfg, vif_idx, true);
        self.apply_gate(vif_idx, gate);
        if tx.vifs[vif_idx as usize].vif_disable_tx && !tx.vifs[vif_idx as usize].is_resending {
            return Err(AxError::ResourceBusy);
        }

        let txq_idx = tx.txq_sta_get(&self.cfg, info.sta_idx, info.tid);
        if !tx.txqs[txq_idx as usize].is_active() {
            tx.vifs[vif_idx as usize].stats.tx_dropped += 1;
            return Err(AxError::ResourceBusy);
        }

        let total_len = (HOSTDESC_LEN + frame.len()) as u16;
        let temp_len = align_blksz_hi(total_len as usize + 4);
        if temp_len > self.cfg.tx_agg_buf_unit {
            tx.vifs[vif_idx as usize].stats.tx_dropped += 1;
            log::warn!(
                target: "uwifi::edrv::tx",
                "vif {} frame len {} over unit {}, drop",
                vif_idx, frame.len(), self.cfg.tx_agg_buf_unit
            );
            return Err(AxError::InvalidData);
        }
        if tx.agg.used + temp_len as u32 > tx.agg.total {
            tx.vifs[vif_idx as usize].stats.tx_dropped += 1;
            return Err(AxError::NoMemory);
        }

        let mut skb = match self.tx_pool.alloc() {
            Some(skb) => skb,
            None => {
                tx.vifs[vif_idx as usize].stats.tx_dropped += 1;
                return Err(AxError::NoMemory);
            }
        };

        let mut desc = Hostdesc::zeroed();
        desc.queue_idx = tx.txqs[txq_idx as usize].hwq;
        desc.packet_len = (frame.len() - ETH_HLEN) as u16;
        desc.packet_offset = (HOSTDESC_LEN + ETH_HLEN) as u16;
        desc.sdio_tx_total_len = total_len;
        desc.sdio_tx_len = (temp_len - 2) as u16;
        desc.tid = info.tid;
        desc.vif_idx = vif_idx;
        desc.staid = info.sta_idx;
        desc.txq_idx = txq_idx;
        desc.ethertype = u16::from_be_bytes([frame[12], frame[13]]);
        desc.eth_dest_addr.copy_from_slice(&frame[0..6]);
        desc.eth_src_addr.copy_from_slice(&frame[6..12]);
        if tx.vifs[vif_idx as usize].use_4addr && info.sta_idx < self.cfg.sta_max {
            desc.flags |= TXU_CNTRL_USE_4ADDR;
        }

        if !skb.put_slice(frame) || !skb.push(HOSTDESC_LEN) {
            self.tx_pool.release(skb);
            tx.vifs[vif_idx as usize].stats.tx_dropped += 1;
            return Err(AxError::NoMemory);
        }
        desc.write_to(&mut skb[..HOSTDESC_LEN]);

        if let Some((sport, dport)) = udp_ports(frame) {
            if (sport == DHCP_PORT_CLIENT && dport == DHCP_PORT_SERVER)
                || (sport == DHCP_PORT_SERVER && dport == DHCP_PORT_CLIENT)
            {
                log::debug!(
                    target: "uwifi::edrv::tx",
                    "vif {} tx dhcp frame {} -> {}",
                    vif_idx, sport, dport
                );
            }
        }

        // 入队即占用水位：字节按对齐后传输长度，帧数加一
        tx.agg.used += temp_len as u32;
        tx.agg.cnt += 1;
        {
            let vif = &mut tx.vifs[vif_idx as usize];
            vif.txring_bytes += temp_len as u32;
            vif.tx_skb_cnt += 1;
            vif.stats.tx_packets += 1;
            vif.stats.tx_bytes += frame.len() as u32;
        }

        let out = tx.txq_queue_skb(txq_idx, skb, false);
        if out.scheduled {
            self.hwq_process_all(&mut tx);
        }
        drop(tx);

        if let Some(ndev_idx) = out.stop_ndev {
            self.net.stop_queue(ndev_idx);
        }
        if let Some(ind) = out.traffic_ind {
            self.send_traffic_ind(ind);
        }
        Ok(())
    }

    /// 管理帧发送入口，对应 `asr_start_mgmt_xmit`。
    ///
    /// 已关联站点走其管理队列（TID 8），离信道请求走离信道队列，
    /// 其余走接口的未知站点队列；目标队列未激活返回 `ResourceBusy`
    /// 且不计丢包（调用方可重试）。
    pub fn start_mgmt_xmit(
        &self,
        vif_idx: u8,
        frame: &[u8],
        offchan: bool,
        no_cck: bool,
    ) -> AxResult<()> {
        if vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        if frame.len() < 10 {
            return Err(AxError::InvalidData);
        }
        let mut tx = self.tx.lock();
        if !tx.vifs[vif_idx as usize].up {
            return Err(AxError::BadState);
        }

        // 管理帧 DA 在 addr1（偏移 4），匹配已关联站点
        let da = &frame[4..10];
        let sta_idx = match tx.vifs[vif_idx as usize].iftype {
            VifType::Station => {
                let peer = tx.vifs[vif_idx as usize].sta_ap_idx;
                (peer != INVALID_IDX && tx.stas[peer as usize].mac_addr == da).then_some(peer)
            }
            VifType::Ap => tx.vifs[vif_idx as usize]
                .sta_list
                .iter()
                .copied()
                .find(|&i| tx.stas[i as usize].valid && tx.stas[i as usize].mac_addr == da),
        };

        let txq_idx = match sta_idx {
            Some(sta) => tx.txq_sta_get(&self.cfg, sta, NX_MGMT_TID),
            None if offchan => txq_offchan_idx(&self.cfg),
            None => txq_vif_idx(&self.cfg, vif_idx, VifTxqType::Unknown),
        };
        if !tx.txqs[txq_idx as usize].is_active() {
            return Err(AxError::ResourceBusy);
        }

        let total_len = (HOSTDESC_LEN + frame.len()) as u16;
        let temp_len = align_blksz_hi(total_len as usize + 4);
        if temp_len > self.cfg.tx_agg_buf_unit {
            return Err(AxError::InvalidData);
        }
        if tx.agg.used + temp_len as u32 > tx.agg.total {
            return Err(AxError::NoMemory);
        }
        let mut skb = match self.tx_pool.alloc() {
            Some(skb) => skb,
            None => return Err(AxError::NoMemory),
        };

        let mut desc = Hostdesc::zeroed();
        desc.queue_idx = tx.txqs[txq_idx as usize].hwq;
        desc.packet_len = frame.len() as u16;
        desc.packet_offset = HOSTDESC_LEN as u16;
        desc.sdio_tx_total_len = total_len;
        desc.sdio_tx_len = (temp_len - 2) as u16;
        desc.tid = 0xFF;
        desc.vif_idx = vif_idx;
        desc.staid = sta_idx.unwrap_or(INVALID_IDX);
        desc.txq_idx = txq_idx;
        desc.flags = TXU_CNTRL_MGMT;
        if is_robust_mgmt(frame) {
            desc.flags |= TXU_CNTRL_MGMT_ROBUST;
        }
        if no_cck {
            desc.flags |= TXU_CNTRL_MGMT_NO_CCK;
        }

        if !skb.put_slice(frame) || !skb.push(HOSTDESC_LEN) {
            self.tx_pool.release(skb);
            return Err(AxError::NoMemory);
        }
        desc.write_to(&mut skb[..HOSTDESC_LEN]);

        tx.agg.used += temp_len as u32;
        tx.agg.cnt += 1;
        {
            let vif = &mut tx.vifs[vif_idx as usize];
            vif.txring_bytes += temp_len as u32;
            vif.tx_skb_cnt += 1;
        }

        let out = tx.txq_queue_skb(txq_idx, skb, false);
        if out.scheduled {
            self.hwq_process_all(&mut tx);
        }
        drop(tx);

        if let Some(ind) = out.traffic_ind {
            self.send_traffic_ind(ind);
        }
        Ok(())
    }

    /// 发送确认，对应 `asr_txdatacfm` + `asr_txq_confirm_any`。
    ///
    /// 按 AC 顺序取在途链首帧：归还硬件信用并标记重调度、按确认的
    /// 信用增量调整 TXQ（0 边界连动 STOP_FULL）、释放两级水位占用。
    /// 要求重传的帧补 RETRY 标志插回队首，其余回收入池。
    pub fn tx_cfm(&self, ac: u8, cfm: &TxCfmTag) -> AxResult<()> {
        if ac as usize >= NX_TXQ_CNT {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        let mut skb = match tx.tx_pending[ac as usize].pop_head() {
            Some(skb) => skb,
            None => {
                log::warn!(target: "uwifi::edrv::tx", "hwq {} cfm without pending frame", ac);
                return Err(AxError::InvalidData);
            }
        };
        let desc = match Hostdesc::read_from(skb.data()) {
            Some(d) => d,
            None => {
                self.tx_pool.release(skb);
                return Err(AxError::InvalidData);
            }
        };

        {
            let hwq = &mut tx.hwqs[ac as usize];
            if hwq.credits < hwq.size {
                hwq.credits += 1;
            }
            hwq.need_processing = true;
        }

        let txq_idx = desc.txq_idx;
        let txq_active = (txq_idx as usize) < tx.txqs.len() && tx.txqs[txq_idx as usize].is_active();
        if txq_active {
            let txq = &mut tx.txqs[txq_idx as usize];
            txq.pkt_pushed = txq.pkt_pushed.saturating_sub(1);
            if cfm.credits != 0 {
                txq.credits = txq.credits.saturating_add(cfm.credits);
            }
            if tx.txqs[txq_idx as usize].credits <= 0 {
                tx.txq_stop(txq_idx, crate::txq::TxqFlags::STOP_FULL);
            } else {
                tx.txq_start(txq_idx, crate::txq::TxqFlags::STOP_FULL);
            }
        }

        // 水位释放
        let ring_len = desc.ring_len();
        tx.agg.used = tx.agg.used.saturating_sub(ring_len);
        tx.agg.cnt = tx.agg.cnt.saturating_sub(1);
        let vif_ok = (desc.vif_idx as usize) < tx.vifs.len();
        if vif_ok {
            let vif = &mut tx.vifs[desc.vif_idx as usize];
            vif.txring_bytes = vif.txring_bytes.saturating_sub(ring_len);
            vif.tx_skb_cnt = vif.tx_skb_cnt.saturating_sub(1);
        }

        let mut traffic_ind = None;
        if cfm.status.retry_required() && txq_active && desc.flags & TXU_CNTRL_DROP == 0 {
            let flags = desc.flags | TXU_CNTRL_RETRY;
            Hostdesc::patch_flags(&mut skb[..HOSTDESC_LEN], flags);
            let out = tx.txq_queue_skb(txq_idx, skb, true);
            traffic_ind = out.traffic_ind;
        } else {
            // 服务期在途帧清账；两类缓存都见底就补"无货"指示
            if txq_active {
                let (ps_id, sta_opt) = {
                    let txq = &tx.txqs[txq_idx as usize];
                    (txq.ps_id, txq.sta)
                };
                if let Some(sta_idx) = sta_opt {
                    let ps = &mut tx.stas[sta_idx as usize].ps;
                    if ps.active && ps.sp_cnt[ps_id as usize] > 0 {
                        ps.sp_cnt[ps_id as usize] -= 1;
                        ps.pkt_ready[ps_id as usize] =
                            ps.pkt_ready[ps_id as usize].saturating_sub(1);
                        if ps.pkt_ready[LEGACY_PS_ID as usize] == 0
                            && ps.pkt_ready[UAPSD_ID as usize] == 0
                        {
                            traffic_ind = Some(TrafficInd {
                                sta_idx,
                                uapsd: ps_id == UAPSD_ID,
                                available: false,
                            });
                        }
                    }
                }
            }
            if !cfm.status.tx_done() && vif_ok {
                tx.vifs[desc.vif_idx as usize].stats.tx_errors += 1;
            }
            self.tx_pool.release(skb);
        }

        // 低水位评估：占用回落则解除闸门
        if vif_ok {
            let gate = flow::tx_flow_ctrl(&mut tx, &self.cfg, desc.vif_idx, false);
            self.apply_gate(desc.vif_idx, gate);
        }

        self.hwq_process_all(&mut tx);
        drop(tx);

        if let Some(ind) = traffic_ind {
            self.send_traffic_ind(ind);
        }
        Ok(())
    }
}
