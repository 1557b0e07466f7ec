//! 软件发送队列（TXQ）与硬件队列（HWQ）调度 — 对应 `uwifi_txq.c` / `uwifi_txq.h`
//!
//! 每个 (站点, TID) 一条 TXQ（TID 0..7 数据 + TID 8 管理），每 vif 另有
//! BCMC / 未知站点两条，整机再加一条离信道队列；全部平铺在竞技场里以
//! `u16` 句柄寻址，`TXQ_INACTIVE` 表示未启用。HWQ 按 AC 分五条，挂接
//! 待调度 TXQ 的句柄链，信用额度守恒：每推一帧扣一分，确认回一分。
//!
//! 停启原因是位集而非布尔：同一条队列可同时因满额、省电、信道切换等
//! 多个原因停住，全部原因清零且队列非空才回到调度链。

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use skb::{SkBuff, SkbQueue};

use crate::cfg::*;
use crate::hw::{AsrHw, TxEnv};
use crate::netdev::{FwBus, NetIf};
use crate::ps::TrafficInd;
use crate::tx::{Hostdesc, HOSTDESC_LEN, TXU_CNTRL_RETRY};

/// TXQ 状态位，对应 `uwifi_txq.h` 的 ASR_TXQ_* 位组。
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TxqFlags(u8);

impl TxqFlags {
    /// 已挂入 HWQ 调度链。
    pub const IN_HWQ_LIST: TxqFlags = TxqFlags(1 << 0);
    /// 信用额度耗尽。
    pub const STOP_FULL: TxqFlags = TxqFlags(1 << 1);
    /// 信道切换通告进行中。
    pub const STOP_CSA: TxqFlags = TxqFlags(1 << 2);
    /// 目的站点处于省电。
    pub const STOP_STA_PS: TxqFlags = TxqFlags(1 << 3);
    /// 本接口省电。
    pub const STOP_VIF_PS: TxqFlags = TxqFlags(1 << 4);
    /// 不在工作信道。
    pub const STOP_CHAN: TxqFlags = TxqFlags(1 << 5);
    /// TWT 静默窗口。
    pub const STOP_TWT: TxqFlags = TxqFlags(1 << 6);
    /// ndev 发送环已被回压停住（非停队原因）。
    pub const NDEV_FLOW_CTRL: TxqFlags = TxqFlags(1 << 7);

    /// 全部停队原因的并集。
    pub const STOP_MASK: TxqFlags = TxqFlags(
        Self::STOP_FULL.0
            | Self::STOP_CSA.0
            | Self::STOP_STA_PS.0
            | Self::STOP_VIF_PS.0
            | Self::STOP_CHAN.0
            | Self::STOP_TWT.0,
    );

    #[inline]
    pub const fn empty() -> Self {
        TxqFlags(0)
    }

    #[inline]
    pub fn contains(self, other: TxqFlags) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: TxqFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: TxqFlags) {
        self.0 &= !other.0;
    }

    /// 是否因任一原因停队（NDEV_FLOW_CTRL 不算）。
    #[inline]
    pub fn is_stopped(self) -> bool {
        self.0 & Self::STOP_MASK.0 != 0
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl core::ops::BitOr for TxqFlags {
    type Output = TxqFlags;
    fn bitor(self, rhs: TxqFlags) -> TxqFlags {
        TxqFlags(self.0 | rhs.0)
    }
}

impl core::fmt::Debug for TxqFlags {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "TxqFlags({:#04x})", self.0)
    }
}

/// vif 级队列类别：广播/组播与未知站点。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VifTxqType {
    Bcmc = 0,
    Unknown = 1,
}

/// 单条软件发送队列，对应 `struct asr_txq`。
///
/// `idx` 等于自身竞技场下标时为激活态，`TXQ_INACTIVE` 为拆除态；
/// 帧链中的 skb 头部均带序列化的 [`Hostdesc`]。
pub struct Txq {
    pub(crate) idx: u16,
    pub(crate) status: TxqFlags,
    pub(crate) credits: i8,
    pub(crate) pkt_sent: u16,
    pub(crate) pkt_pushed: u16,
    pub(crate) sk_list: SkbQueue,
    /// 队首重传帧个数（重传帧永远聚在队首，新重传插在其后）。
    pub(crate) nb_retry: u16,
    /// 所属硬件队列编号。
    pub(crate) hwq: u8,
    /// 所属站点（BCMC 队列指向伪站点，UNK/离信道无站点）。
    pub(crate) sta: Option<u8>,
    /// 本队列流量归入的省电类别。
    pub(crate) ps_id: u8,
    /// 本服务期剩余可推帧数，0 表示无限制。
    pub(crate) push_limit: u16,
    /// 映射的 ndev 发送环，`NDEV_NO_TXQ` 表示无映射。
    pub(crate) ndev_idx: u16,
}

impl Txq {
    pub(crate) fn new_inactive() -> Self {
        Txq {
            idx: TXQ_INACTIVE,
            status: TxqFlags::empty(),
            credits: 0,
            pkt_sent: 0,
            pkt_pushed: 0,
            sk_list: SkbQueue::new(),
            nb_retry: 0,
            hwq: ASR_HWQ_BE,
            sta: None,
            ps_id: LEGACY_PS_ID,
            push_limit: 0,
            ndev_idx: NDEV_NO_TXQ,
        }
    }

    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.idx != TXQ_INACTIVE
    }

    /// 复位为 `txq_init` 后的状态并交出积压帧链。
    fn reset(&mut self) -> SkbQueue {
        self.idx = TXQ_INACTIVE;
        self.status = TxqFlags::empty();
        self.credits = 0;
        self.pkt_sent = 0;
        self.pkt_pushed = 0;
        self.nb_retry = 0;
        self.push_limit = 0;
        self.ndev_idx = NDEV_NO_TXQ;
        self.sta = None;
        core::mem::take(&mut self.sk_list)
    }
}

/// 单条硬件队列，对应 `struct asr_hwq`。
pub struct Hwq {
    /// 待调度 TXQ 句柄链（队首先服务）。
    pub(crate) list: VecDeque<u16>,
    pub(crate) credits: u8,
    pub(crate) size: u8,
    pub(crate) id: u8,
    pub(crate) need_processing: bool,
}

impl Hwq {
    pub(crate) fn new(id: u8, size: u8) -> Self {
        Hwq {
            list: VecDeque::new(),
            credits: size,
            size,
            id,
            need_processing: false,
        }
    }
}

/// `queue_skb` 的外带结果：锁外需要执行的信号。
pub(crate) struct QueueOutcome {
    /// 队列是否进入了调度链。
    pub scheduled: bool,
    /// 需要停住的 ndev 环。
    pub stop_ndev: Option<u16>,
    /// 省电站点 0→1 触发的流量指示。
    pub traffic_ind: Option<TrafficInd>,
}

/// 单播 TXQ 竞技场下标。
#[inline]
pub(crate) fn txq_sta_idx(sta_idx: u8, tid: u8) -> u16 {
    sta_idx as u16 * NX_NB_TXQ_PER_STA as u16 + tid as u16
}

/// vif 级 TXQ 竞技场下标（BCMC 段在前、UNK 段在后）。
#[inline]
pub(crate) fn txq_vif_idx(cfg: &ModParams, vif_idx: u8, ty: VifTxqType) -> u16 {
    (cfg.sta_max as usize * NX_NB_TXQ_PER_STA
        + vif_idx as usize
        + ty as usize * cfg.vif_max as usize) as u16
}

/// 离信道 TXQ 竞技场下标（竞技场末槽）。
#[inline]
pub(crate) fn txq_offchan_idx(cfg: &ModParams) -> u16 {
    (cfg.sta_max as usize * NX_NB_TXQ_PER_STA + cfg.vif_max as usize * 2) as u16
}

/// 挂入调度链（幂等），对应 `asr_txq_add_to_hw_list`。
pub(crate) fn hw_list_add(txq: &mut Txq, hwq: &mut Hwq) {
    if !txq.status.contains(TxqFlags::IN_HWQ_LIST) {
        txq.status.insert(TxqFlags::IN_HWQ_LIST);
        hwq.list.push_back(txq.idx);
        hwq.need_processing = true;
    }
}

/// 摘出调度链（幂等），对应 `asr_txq_del_from_hw_list`。
pub(crate) fn hw_list_del(txq: &mut Txq, hwq: &mut Hwq) {
    if txq.status.contains(TxqFlags::IN_HWQ_LIST) {
        txq.status.remove(TxqFlags::IN_HWQ_LIST);
        if let Some(pos) = hwq.list.iter().position(|&i| i == txq.idx) {
            hwq.list.remove(pos);
        }
    }
}

impl TxEnv {
    /// 初始化一条 TXQ，对应 `asr_txq_init`。
    pub(crate) fn txq_init(
        &mut self,
        txq_idx: u16,
        status: TxqFlags,
        hwq: u8,
        sta: Option<u8>,
        ps_id: u8,
        ndev_idx: u16,
    ) {
        let txq = &mut self.txqs[txq_idx as usize];
        debug_assert!(!txq.is_active(), "txq {} double init", txq_idx);
        txq.idx = txq_idx;
        txq.status = status;
        txq.credits = NX_TXQ_INITIAL_CREDITS;
        txq.pkt_sent = 0;
        txq.pkt_pushed = 0;
        txq.nb_retry = 0;
        txq.push_limit = 0;
        txq.hwq = hwq;
        txq.sta = sta;
        txq.ps_id = ps_id;
        txq.ndev_idx = ndev_idx;
    }

    /// 拆除一条 TXQ：先摘出调度链、置非激活，帧链交还调用方在锁外释放。
    /// 对应 `asr_txq_deinit` 的锁内部分。
    pub(crate) fn txq_deinit(&mut self, txq_idx: u16) -> SkbQueue {
        let i = txq_idx as usize;
        let (txqs, hwqs) = (&mut self.txqs, &mut self.hwqs);
        let txq = &mut txqs[i];
        if !txq.is_active() {
            return SkbQueue::new();
        }
        hw_list_del(txq, &mut hwqs[txq.hwq as usize]);
        txq.reset()
    }

    /// 站点入网时建 9 条队列（TID 0..7 数据 + TID 8 管理），
    /// 对应 `asr_txq_sta_init`。U-APSD 订阅的 TID 归入 UAPSD 类别。
    pub(crate) fn txq_sta_init(&mut self, sta_idx: u8, status: TxqFlags) {
        let uapsd_tids = self.stas[sta_idx as usize].uapsd_tids;
        for tid in 0..NX_NB_TXQ_PER_STA as u8 {
            let ps_id = if tid < NX_NB_TID_PER_STA as u8 && uapsd_tids & (1 << tid) != 0 {
                UAPSD_ID
            } else {
                LEGACY_PS_ID
            };
            let ndev_idx = if tid < NX_NB_TID_PER_STA as u8 {
                tid as u16 + sta_idx as u16 * NX_NB_TID_PER_STA as u16
            } else {
                NDEV_NO_TXQ
            };
            let hwq = ASR_TID2HWQ[tid as usize];
            self.txq_init(txq_sta_idx(sta_idx, tid), status, hwq, Some(sta_idx), ps_id, ndev_idx);
        }
    }

    /// 站点离网拆队列，合并交出全部积压帧。对应 `asr_txq_sta_deinit`。
    pub(crate) fn txq_sta_deinit(&mut self, sta_idx: u8) -> SkbQueue {
        let mut freed = SkbQueue::new();
        for tid in 0..NX_NB_TXQ_PER_STA as u8 {
            let mut q = self.txq_deinit(txq_sta_idx(sta_idx, tid));
            freed.splice_tail(&mut q);
        }
        freed
    }

    /// 接口启用时建 BCMC 与未知站点两条队列，对应 `asr_txq_vif_init`。
    /// BCMC 走 BE 硬件队列并挂接口的伪站点；UNK 走 VO、无站点。
    pub(crate) fn txq_vif_init(&mut self, cfg: &ModParams, vif_idx: u8, status: TxqFlags) {
        let bcmc_sta = cfg.bcmc_sta_idx(vif_idx);
        self.txq_init(
            txq_vif_idx(cfg, vif_idx, VifTxqType::Bcmc),
            status,
            ASR_HWQ_BE,
            Some(bcmc_sta),
            LEGACY_PS_ID,
            cfg.bcmc_ndev_idx(),
        );
        self.txq_init(
            txq_vif_idx(cfg, vif_idx, VifTxqType::Unknown),
            status,
            ASR_HWQ_VO,
            None,
            LEGACY_PS_ID,
            NDEV_NO_TXQ,
        );
    }

    /// 接口停用拆 vif 级队列。对应 `asr_txq_vif_deinit`。
    pub(crate) fn txq_vif_deinit(&mut self, cfg: &ModParams, vif_idx: u8) -> SkbQueue {
        let mut freed = self.txq_deinit(txq_vif_idx(cfg, vif_idx, VifTxqType::Bcmc));
        let mut q = self.txq_deinit(txq_vif_idx(cfg, vif_idx, VifTxqType::Unknown));
        freed.splice_tail(&mut q);
        freed
    }

    /// 离信道管理帧队列：初始即带 STOP_CHAN，上信道后放行。
    /// 对应 `asr_txq_offchan_init`。
    pub(crate) fn txq_offchan_init(&mut self, cfg: &ModParams) {
        self.txq_init(
            txq_offchan_idx(cfg),
            TxqFlags::STOP_CHAN,
            ASR_HWQ_VO,
            None,
            LEGACY_PS_ID,
            NDEV_NO_TXQ,
        );
    }

    pub(crate) fn txq_offchan_deinit(&mut self, cfg: &ModParams) -> SkbQueue {
        self.txq_deinit(txq_offchan_idx(cfg))
    }

    /// 取站点某 TID 的 TXQ 句柄；组播伪站点一律落到所属 vif 的 BCMC 队列。
    /// 对应 `asr_txq_sta_get`。
    pub(crate) fn txq_sta_get(&self, cfg: &ModParams, sta_idx: u8, tid: u8) -> u16 {
        let tid = if tid as usize >= NX_NB_TXQ_PER_STA { 0 } else { tid };
        if sta_idx >= cfg.sta_max {
            let vif_idx = self.stas[sta_idx as usize].vif_idx;
            txq_vif_idx(cfg, vif_idx, VifTxqType::Bcmc)
        } else {
            txq_sta_idx(sta_idx, tid)
        }
    }

    /// 清除一个停队原因；全部原因解除且有积压则回到调度链。
    /// 对应 `asr_txq_start`。
    pub(crate) fn txq_start(&mut self, txq_idx: u16, reason: TxqFlags) {
        let i = txq_idx as usize;
        let (txqs, hwqs) = (&mut self.txqs, &mut self.hwqs);
        let txq = &mut txqs[i];
        if txq.is_active() && txq.status.contains(reason) {
            txq.status.remove(reason);
            if !txq.status.is_stopped() && !txq.sk_list.is_empty() {
                hw_list_add(txq, &mut hwqs[txq.hwq as usize]);
            }
        }
    }

    /// 记一个停队原因并摘出调度链。对应 `asr_txq_stop`。
    pub(crate) fn txq_stop(&mut self, txq_idx: u16, reason: TxqFlags) {
        let i = txq_idx as usize;
        let (txqs, hwqs) = (&mut self.txqs, &mut self.hwqs);
        let txq = &mut txqs[i];
        if txq.is_active() {
            txq.status.insert(reason);
            hw_list_del(txq, &mut hwqs[txq.hwq as usize]);
        }
    }

    /// 站点级放行：组播伪站点只有 BCMC 一条，普通站点放行全部 9 条。
    /// 对应 `asr_txq_sta_start`。
    pub(crate) fn txq_sta_start(&mut self, cfg: &ModParams, sta_idx: u8, reason: TxqFlags) {
        if sta_idx >= cfg.sta_max {
            let idx = self.txq_sta_get(cfg, sta_idx, 0);
            self.txq_start(idx, reason);
        } else {
            for tid in 0..NX_NB_TXQ_PER_STA as u8 {
                self.txq_start(txq_sta_idx(sta_idx, tid), reason);
            }
        }
    }

    /// 站点级停队。对应 `asr_txq_sta_stop`。
    pub(crate) fn txq_sta_stop(&mut self, cfg: &ModParams, sta_idx: u8, reason: TxqFlags) {
        if sta_idx >= cfg.sta_max {
            let idx = self.txq_sta_get(cfg, sta_idx, 0);
            self.txq_stop(idx, reason);
        } else {
            for tid in 0..NX_NB_TXQ_PER_STA as u8 {
                self.txq_stop(txq_sta_idx(sta_idx, tid), reason);
            }
        }
    }

    /// 接口级放行：遍历接口名下全部站点队列 + BCMC + UNK。
    /// 对应 `asr_txq_vif_start` 的锁内部分。
    pub(crate) fn txq_vif_start(&mut self, cfg: &ModParams, vif_idx: u8, reason: TxqFlags) {
        for sta_idx in self.vif_sta_indices(vif_idx) {
            self.txq_sta_start(cfg, sta_idx, reason);
        }
        self.txq_start(txq_vif_idx(cfg, vif_idx, VifTxqType::Bcmc), reason);
        self.txq_start(txq_vif_idx(cfg, vif_idx, VifTxqType::Unknown), reason);
    }

    /// 接口级停队。对应 `asr_txq_vif_stop` 的锁内部分。
    pub(crate) fn txq_vif_stop(&mut self, cfg: &ModParams, vif_idx: u8, reason: TxqFlags) {
        for sta_idx in self.vif_sta_indices(vif_idx) {
            self.txq_sta_stop(cfg, sta_idx, reason);
        }
        self.txq_stop(txq_vif_idx(cfg, vif_idx, VifTxqType::Bcmc), reason);
        self.txq_stop(txq_vif_idx(cfg, vif_idx, VifTxqType::Unknown), reason);
    }

    /// 接口名下真实站点的下标集合：STATION 模式为 AP 对端，AP 模式为关联列表。
    fn vif_sta_indices(&self, vif_idx: u8) -> Vec<u8> {
        let vif = &self.vifs[vif_idx as usize];
        match vif.iftype {
            crate::hw::VifType::Station => {
                if vif.sta_ap_idx != INVALID_IDX {
                    alloc::vec![vif.sta_ap_idx]
                } else {
                    Vec::new()
                }
            }
            crate::hw::VifType::Ap => vif.sta_list.clone(),
        }
    }

    /// 接口是否整体被信道/省电原因封着（以 BCMC 队列状态为准）。
    /// 对应 `asr_txq_vif_get_status`。
    pub(crate) fn txq_vif_blocked(&self, cfg: &ModParams, vif_idx: u8) -> bool {
        let txq = &self.txqs[txq_vif_idx(cfg, vif_idx, VifTxqType::Bcmc) as usize];
        txq.status.contains(TxqFlags::STOP_CHAN | TxqFlags::STOP_VIF_PS)
    }

    /// 帧入队，对应 `asr_txq_queue_skb`。
    ///
    /// 重传帧插在队首重传簇之后，普通帧追加队尾；省电站点帧计入
    /// `pkt_ready`，0→1 时外带一条流量指示；队长越过回压阈值时外带
    /// ndev 停环信号。队列就绪则挂入调度链并返回 scheduled。
    pub(crate) fn txq_queue_skb(&mut self, txq_idx: u16, skb: SkBuff, retry: bool) -> QueueOutcome {
        let i = txq_idx as usize;
        let (txqs, hwqs, stas) = (&mut self.txqs, &mut self.hwqs, &mut self.stas);
        let txq = &mut txqs[i];
        debug_assert!(txq.is_active(), "queue_skb on inactive txq");

        let mut traffic_ind = None;
        if let Some(sta_idx) = txq.sta {
            let sta = &mut stas[sta_idx as usize];
            if sta.ps.active {
                let ps_id = txq.ps_id as usize;
                sta.ps.pkt_ready[ps_id] += 1;
                if sta.ps.pkt_ready[ps_id] == 1 {
                    traffic_ind = Some(TrafficInd {
                        sta_idx,
                        uapsd: txq.ps_id != LEGACY_PS_ID,
                        available: true,
                    });
                }
            }
        }

        if retry {
            let pos = txq.nb_retry as usize;
            txq.sk_list.insert(pos, skb);
            txq.nb_retry += 1;
        } else {
            txq.sk_list.push_tail(skb);
        }

        let mut stop_ndev = None;
        if txq.ndev_idx != NDEV_NO_TXQ
            && txq.sk_list.len() > ASR_NDEV_FLOW_CTRL_STOP
            && !txq.status.contains(TxqFlags::NDEV_FLOW_CTRL)
        {
            txq.status.insert(TxqFlags::NDEV_FLOW_CTRL);
            stop_ndev = Some(txq.ndev_idx);
            log::debug!(
                target: "uwifi::edrv::txq",
                "txq {} ndev ring {} stopped, qlen {}",
                txq.idx, txq.ndev_idx, txq.sk_list.len()
            );
        }

        let scheduled = if !txq.status.is_stopped() {
            hw_list_add(txq, &mut hwqs[txq.hwq as usize]);
            true
        } else {
            false
        };

        QueueOutcome {
            scheduled,
            stop_ndev,
            traffic_ind,
        }
    }

    /// 固件信用增减，对应 `asr_txq_credit_update`：落到 0 及以下记
    /// STOP_FULL 停队，回正则解除。
    pub(crate) fn txq_credit_update(&mut self, cfg: &ModParams, sta_idx: u8, tid: u8, delta: i8) {
        let txq_idx = self.txq_sta_get(cfg, sta_idx, tid);
        {
            let txq = &mut self.txqs[txq_idx as usize];
            if !txq.is_active() {
                return;
            }
            txq.credits = txq.credits.saturating_add(delta);
            log::trace!(
                target: "uwifi::edrv::txq",
                "txq {} credits {:+} -> {}",
                txq_idx, delta, txq.credits
            );
        }
        if self.txqs[txq_idx as usize].credits <= 0 {
            self.txq_stop(txq_idx, TxqFlags::STOP_FULL);
        } else {
            self.txq_start(txq_idx, TxqFlags::STOP_FULL);
        }
    }
}

/// 单条 TXQ 服务结束后的去向，驱动调度游标。
enum Served {
    /// 已离开调度链（摘除或停队），游标原地。
    Removed,
    /// 轮转到链尾，游标原地。
    Rotated,
    /// 仍在原位，游标后移。
    Kept,
    /// 传输层故障，本轮调度中止。
    Abort,
}

impl<B: FwBus, N: NetIf> AsrHw<B, N> {
    /// 服务一条硬件队列，对应 `asr_hwq_process`。
    ///
    /// 从调度链头起逐条 TXQ 摘帧推送，硬件信用耗尽即停；摘空的 TXQ
    /// 离开调度链，吃满一轮配额的轮转到链尾保证公平。
    pub(crate) fn hwq_process(&self, tx: &mut TxEnv, hwq_id: usize) {
        tx.hwqs[hwq_id].need_processing = false;

        let mut cursor = 0usize;
        loop {
            if tx.hwqs[hwq_id].credits == 0 {
                break;
            }
            let txq_idx = match tx.hwqs[hwq_id].list.get(cursor) {
                Some(&idx) => idx,
                None => break,
            };
            match self.txq_serve(tx, hwq_id, txq_idx, cursor) {
                Served::Removed | Served::Rotated => {}
                Served::Kept => cursor += 1,
                Served::Abort => break,
            }
        }
    }

    /// 服务全部待处理硬件队列，从 BCMC 往 BK 逆序扫，
    /// 对应 `asr_hwq_process_all`。
    pub(crate) fn hwq_process_all(&self, tx: &mut TxEnv) {
        for hwq_id in (0..NX_TXQ_CNT).rev() {
            if tx.hwqs[hwq_id].need_processing {
                self.hwq_process(tx, hwq_id);
            }
        }
    }

    /// 按信用额度从一条 TXQ 摘帧并逐帧推给固件。
    ///
    /// 摘取量 = min(TXQ 信用 [受 push_limit 再限], HWQ 信用)；额度覆盖
    /// 整条积压时整链摘空。推送成功的帧转入在途链等确认。
    fn txq_serve(&self, tx: &mut TxEnv, hwq_id: usize, txq_idx: u16, cursor: usize) -> Served {
        let txq_i = txq_idx as usize;
        let TxEnv {
            txqs,
            hwqs,
            tx_pending,
            stas,
            ..
        } = tx;
        let txq = &mut txqs[txq_i];
        let hwq = &mut hwqs[hwq_id];
        let pending = &mut tx_pending[hwq_id];

        // 本次服务的摘取额度
        let mut credits = txq.credits.max(0) as u16;
        if txq.push_limit != 0 {
            credits = credits.min(txq.push_limit);
        }
        credits = credits.min(hwq.credits as u16);

        let qlen = txq.sk_list.len() as u16;
        let mut batch = SkbQueue::new();
        let emptied = if credits >= qlen {
            batch.splice_tail(&mut txq.sk_list);
            true
        } else {
            txq.sk_list.extract_into(credits as usize, &mut batch);
            txq.push_limit != 0 && (txq.ps_id == LEGACY_PS_ID || credits >= txq.push_limit)
        };
        let taken = batch.len() as u16;
        txq.nb_retry -= taken.min(txq.nb_retry);

        // 逐帧推送；传输层失败时余帧原序退回队首等待重试
        let mut abort = false;
        while let Some(skb) = batch.pop_head() {
            let desc = match Hostdesc::read_from(skb.data()) {
                Some(d) => d,
                None => {
                    debug_assert!(false, "queued frame without hostdesc");
                    continue;
                }
            };
            match self.bus.push_data(&desc, &skb.data()[HOSTDESC_LEN..]) {
                Ok(()) => {
                    hwq.credits -= 1;
                    txq.credits = txq.credits.saturating_sub(1);
                    txq.pkt_sent += 1;
                    txq.pkt_pushed += 1;
                    if txq.push_limit > 0 {
                        txq.push_limit -= 1;
                    }
                    pending.push_tail(skb);
                }
                Err(e) => {
                    log::warn!(
                        target: "uwifi::edrv::txq",
                        "hwq {} push failed: {:?}, requeue {} frame(s)",
                        hwq_id, e, batch.len() + 1
                    );
                    let mut requeue = SkbQueue::new();
                    requeue.push_tail(skb);
                    requeue.splice_tail(&mut batch);
                    while let Some(s) = requeue.pop_tail() {
                        if Hostdesc::peek_flags(s.data())
                            .map(|f| f & TXU_CNTRL_RETRY != 0)
                            .unwrap_or(false)
                        {
                            txq.nb_retry += 1;
                        }
                        txq.sk_list.push_head(s);
                    }
                    hwq.need_processing = true;
                    abort = true;
                    break;
                }
            }
        }
        if abort {
            return Served::Abort;
        }

        let mut outcome = Served::Kept;
        if emptied {
            hw_list_del(txq, hwq);
            txq.pkt_sent = 0;
            // 服务期没凑满请求量：传统类别直接废弃本期，等固件重新拉
            if txq.push_limit != 0 {
                if txq.ps_id == LEGACY_PS_ID {
                    if let Some(sta_idx) = txq.sta {
                        let sp = &mut stas[sta_idx as usize].ps.sp_cnt[LEGACY_PS_ID as usize];
                        *sp -= txq.push_limit.min(*sp);
                    }
                    txq.push_limit = 0;
                }
            }
            outcome = Served::Removed;
        } else if hwq.credits == 0
            && txq.status.contains(TxqFlags::IN_HWQ_LIST)
            && txq.pkt_sent > hwq.size as u16
        {
            // 吃满配额还有积压：轮转到链尾，下一轮信用留给别家
            txq.pkt_sent = 0;
            if hwq.list.get(cursor) == Some(&txq_idx) {
                hwq.list.remove(cursor);
                hwq.list.push_back(txq_idx);
            }
            outcome = Served::Rotated;
        }

        // 信用耗尽的队列停住，等确认或信用更新解除
        if txq.credits <= 0 && txq.is_active() {
            txq.status.insert(TxqFlags::STOP_FULL);
            if txq.status.contains(TxqFlags::IN_HWQ_LIST) {
                hw_list_del(txq, hwq);
                outcome = Served::Removed;
            }
        }

        // 积压回落则唤醒 ndev 环
        if txq.status.contains(TxqFlags::NDEV_FLOW_CTRL)
            && txq.sk_list.len() < ASR_NDEV_FLOW_CTRL_RESTART
        {
            txq.status.remove(TxqFlags::NDEV_FLOW_CTRL);
            self.net.wake_queue(txq.ndev_idx);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::VifType;
    use crate::test_support::*;

    #[test]
    fn arena_index_layout() {
        let cfg = ModParams::default();
        assert_eq!(txq_sta_idx(0, 0), 0);
        assert_eq!(txq_sta_idx(1, 8), 17);
        assert_eq!(txq_vif_idx(&cfg, 0, VifTxqType::Bcmc), 36);
        assert_eq!(txq_vif_idx(&cfg, 1, VifTxqType::Bcmc), 37);
        assert_eq!(txq_vif_idx(&cfg, 0, VifTxqType::Unknown), 38);
        assert_eq!(txq_offchan_idx(&cfg), 40);
        assert_eq!(cfg.nb_txq(), 41);
    }

    #[test]
    fn sta_init_maps_tid_to_hwq_and_ndev() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        let tx = hw.tx_lock();
        let bk = &tx.txqs[txq_sta_idx(0, 1) as usize];
        assert_eq!(bk.hwq, ASR_HWQ_BK);
        assert_eq!(bk.ndev_idx, 1);
        assert_eq!(bk.credits, NX_TXQ_INITIAL_CREDITS);
        let mgmt = &tx.txqs[txq_sta_idx(0, 8) as usize];
        assert_eq!(mgmt.hwq, ASR_HWQ_VO);
        assert_eq!(mgmt.ndev_idx, NDEV_NO_TXQ);
    }

    #[test]
    fn uapsd_tids_select_ps_class() {
        let hw = make_hw();
        hw.vif_attach(0, VifType::Ap, [2; 6]).unwrap();
        hw.sta_attach(0, 0, [1; 6], true, 0, 0b0000_1100).unwrap();
        let tx = hw.tx_lock();
        assert_eq!(tx.txqs[txq_sta_idx(0, 2) as usize].ps_id, UAPSD_ID);
        assert_eq!(tx.txqs[txq_sta_idx(0, 3) as usize].ps_id, UAPSD_ID);
        assert_eq!(tx.txqs[txq_sta_idx(0, 0) as usize].ps_id, LEGACY_PS_ID);
        assert_eq!(tx.txqs[txq_sta_idx(0, 8) as usize].ps_id, LEGACY_PS_ID);
    }

    #[test]
    fn queue_skb_retry_clusters_at_head() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        let s1 = data_skb(&hw, 1);
        let s2 = data_skb(&hw, 2);
        let s3 = data_skb(&hw, 3);
        let r10 = retry_skb(&hw, 10);
        let r11 = retry_skb(&hw, 11);
        let mut tx = hw.tx_lock();
        let txq_idx = txq_sta_idx(0, 0);
        tx.txq_queue_skb(txq_idx, s1, false);
        tx.txq_queue_skb(txq_idx, s2, false);
        tx.txq_queue_skb(txq_idx, r10, true);
        tx.txq_queue_skb(txq_idx, r11, true);
        tx.txq_queue_skb(txq_idx, s3, false);
        let order: alloc::vec::Vec<u8> = tx.txqs[txq_idx as usize]
            .sk_list
            .iter()
            .map(payload_byte)
            .collect();
        assert_eq!(order, [10, 11, 1, 2, 3]);
        assert_eq!(tx.txqs[txq_idx as usize].nb_retry, 2);
    }

    #[test]
    fn queue_skb_schedules_only_when_runnable() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        let skb = data_skb(&hw, 1);
        let mut tx = hw.tx_lock();
        let txq_idx = txq_sta_idx(0, 0);
        tx.txq_stop(txq_idx, TxqFlags::STOP_CSA);
        let out = tx.txq_queue_skb(txq_idx, skb, false);
        assert!(!out.scheduled);
        assert!(tx.hwqs[ASR_HWQ_BE as usize].list.is_empty());

        tx.txq_start(txq_idx, TxqFlags::STOP_CSA);
        assert!(tx.txqs[txq_idx as usize].status.contains(TxqFlags::IN_HWQ_LIST));
        assert_eq!(tx.hwqs[ASR_HWQ_BE as usize].list.front(), Some(&txq_idx));
        assert!(tx.hwqs[ASR_HWQ_BE as usize].need_processing);
    }

    #[test]
    fn stop_start_idempotent_and_masked() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        let skb = data_skb(&hw, 1);
        let mut tx = hw.tx_lock();
        let txq_idx = txq_sta_idx(0, 3);
        tx.txq_queue_skb(txq_idx, skb, false);
        tx.txq_stop(txq_idx, TxqFlags::STOP_STA_PS);
        tx.txq_stop(txq_idx, TxqFlags::STOP_STA_PS);
        tx.txq_stop(txq_idx, TxqFlags::STOP_CHAN);
        // 只解除一个原因仍停队
        tx.txq_start(txq_idx, TxqFlags::STOP_STA_PS);
        assert!(!tx.txqs[txq_idx as usize].status.contains(TxqFlags::IN_HWQ_LIST));
        tx.txq_start(txq_idx, TxqFlags::STOP_CHAN);
        assert!(tx.txqs[txq_idx as usize].status.contains(TxqFlags::IN_HWQ_LIST));
    }

    #[test]
    fn credit_update_stops_at_zero_boundary() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        let cfg = hw.cfg().clone();
        let skb = data_skb(&hw, 1);
        let mut tx = hw.tx_lock();
        let txq_idx = txq_sta_idx(0, 0);
        tx.txq_queue_skb(txq_idx, skb, false);
        tx.txq_credit_update(&cfg, 0, 0, -NX_TXQ_INITIAL_CREDITS);
        assert!(tx.txqs[txq_idx as usize].status.contains(TxqFlags::STOP_FULL));
        assert!(!tx.txqs[txq_idx as usize].status.contains(TxqFlags::IN_HWQ_LIST));
        tx.txq_credit_update(&cfg, 0, 0, 2);
        assert!(!tx.txqs[txq_idx as usize].status.contains(TxqFlags::STOP_FULL));
        assert!(tx.txqs[txq_idx as usize].status.contains(TxqFlags::IN_HWQ_LIST));
    }

    #[test]
    fn scheduler_serves_head_until_empty() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        hw.sta_attach(1, 0, [9; 6], true, 0, 0).unwrap();
        {
            let mut tx = hw.tx_lock();
            // BE 硬件信用压到 8（队列深度保持默认 32），两条 TXQ 各压 12 帧
            tx.hwqs[ASR_HWQ_BE as usize].credits = 8;
            let q0 = txq_sta_idx(0, 0);
            let q1 = txq_sta_idx(1, 0);
            tx.txqs[q0 as usize].credits = 100;
            tx.txqs[q1 as usize].credits = 100;
            for i in 0..12 {
                tx.txq_queue_skb(q0, data_skb(&hw, i), false);
                tx.txq_queue_skb(q1, data_skb(&hw, 100 + i), false);
            }
        }
        hw.schedule();
        {
            let tx = hw.tx_lock();
            // 先到的队列吃满 8 个硬件信用，且仍占链首
            assert_eq!(tx.txqs[txq_sta_idx(0, 0) as usize].sk_list.len(), 4);
            assert_eq!(tx.txqs[txq_sta_idx(1, 0) as usize].sk_list.len(), 12);
            assert_eq!(tx.hwqs[ASR_HWQ_BE as usize].credits, 0);
            assert_eq!(
                tx.hwqs[ASR_HWQ_BE as usize].list.front(),
                Some(&txq_sta_idx(0, 0))
            );
        }
        // 信用逐个回补：链首先清空，之后才轮到第二条
        for _ in 0..8 {
            hw.tx_cfm(ASR_HWQ_BE, &crate::tx::TxCfmTag::done(0)).unwrap();
        }
        {
            let tx = hw.tx_lock();
            assert!(tx.txqs[txq_sta_idx(0, 0) as usize].sk_list.is_empty());
            assert_eq!(tx.txqs[txq_sta_idx(1, 0) as usize].sk_list.len(), 8);
            assert_eq!(hw.bus().push_count(), 16);
        }
    }

    #[test]
    fn scheduler_rotates_after_full_quota() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        hw.sta_attach(1, 0, [9; 6], true, 0, 0).unwrap();
        {
            let mut tx = hw.tx_lock();
            // 深度 4 的小队列便于触发公平轮转
            tx.hwqs[ASR_HWQ_BE as usize].credits = 4;
            tx.hwqs[ASR_HWQ_BE as usize].size = 4;
            let q0 = txq_sta_idx(0, 0);
            let q1 = txq_sta_idx(1, 0);
            tx.txqs[q0 as usize].credits = 100;
            tx.txqs[q1 as usize].credits = 100;
            for i in 0..12 {
                tx.txq_queue_skb(q0, data_skb(&hw, i), false);
                tx.txq_queue_skb(q1, data_skb(&hw, 100 + i), false);
            }
        }
        hw.schedule();
        // 第一轮：链首吃满 4，累计 4 不超过深度，原位不动
        assert_eq!(
            hw.tx_lock().hwqs[ASR_HWQ_BE as usize].list.front(),
            Some(&txq_sta_idx(0, 0))
        );
        // 回一个信用再推一帧：累计 5 > 深度 4，轮转到链尾
        hw.tx_cfm(ASR_HWQ_BE, &crate::tx::TxCfmTag::done(0)).unwrap();
        let tx = hw.tx_lock();
        assert_eq!(
            tx.hwqs[ASR_HWQ_BE as usize].list.front(),
            Some(&txq_sta_idx(1, 0))
        );
        assert_eq!(tx.txqs[txq_sta_idx(0, 0) as usize].pkt_sent, 0);
    }

    #[test]
    fn scheduler_requeues_on_bus_failure() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        {
            let skbs: alloc::vec::Vec<_> = (0..3).map(|i| data_skb(&hw, i)).collect();
            let mut tx = hw.tx_lock();
            let q0 = txq_sta_idx(0, 0);
            tx.txqs[q0 as usize].credits = 4;
            for skb in skbs {
                tx.txq_queue_skb(q0, skb, false);
            }
        }
        hw.bus().fail_pushes(true);
        hw.schedule();
        let tx = hw.tx_lock();
        let q0 = txq_sta_idx(0, 0);
        assert_eq!(tx.txqs[q0 as usize].sk_list.len(), 3);
        assert_eq!(tx.txqs[q0 as usize].pkt_pushed, 0);
        assert!(tx.hwqs[ASR_HWQ_BE as usize].need_processing);
        // 信用未消耗
        let size = tx.hwqs[ASR_HWQ_BE as usize].size;
        assert_eq!(tx.hwqs[ASR_HWQ_BE as usize].credits, size);
    }

    #[test]
    fn ndev_ring_stops_at_threshold_and_restarts() {
        let hw = make_big_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        {
            let skbs: alloc::vec::Vec<_> = (0..=ASR_NDEV_FLOW_CTRL_STOP)
                .map(|i| data_skb(&hw, i as u8))
                .collect();
            let mut tx = hw.tx_lock();
            let q0 = txq_sta_idx(0, 0);
            tx.txq_stop(q0, TxqFlags::STOP_CSA);
            for (i, skb) in skbs.into_iter().enumerate() {
                let out = tx.txq_queue_skb(q0, skb, false);
                if i < ASR_NDEV_FLOW_CTRL_STOP {
                    assert!(out.stop_ndev.is_none());
                } else {
                    assert_eq!(out.stop_ndev, Some(0));
                }
            }
            assert!(tx.txqs[q0 as usize].status.contains(TxqFlags::NDEV_FLOW_CTRL));
            // 给足两侧信用，一轮调度摘到回压线以下
            tx.txqs[q0 as usize].credits = 120;
            tx.hwqs[ASR_HWQ_BE as usize].credits = 120;
            tx.txq_start(q0, TxqFlags::STOP_CSA);
        }
        hw.schedule();
        let tx = hw.tx_lock();
        let q0 = txq_sta_idx(0, 0);
        assert!(tx.txqs[q0 as usize].sk_list.len() < ASR_NDEV_FLOW_CTRL_RESTART);
        assert!(!tx.txqs[q0 as usize].status.contains(TxqFlags::NDEV_FLOW_CTRL));
        assert_eq!(hw.net().woken(), alloc::vec![0u16]);
    }

    #[test]
    fn deinit_leaves_schedule_list_before_flush() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        {
            let skbs: alloc::vec::Vec<_> = (0..4).map(|i| data_skb(&hw, i)).collect();
            let mut tx = hw.tx_lock();
            let q0 = txq_sta_idx(0, 0);
            for skb in skbs {
                tx.txq_queue_skb(q0, skb, false);
            }
            assert!(tx.txqs[q0 as usize].status.contains(TxqFlags::IN_HWQ_LIST));
        }
        let before = hw.tx_lock().hwqs[ASR_HWQ_BE as usize].credits;
        hw.sta_detach(0).unwrap();
        let tx = hw.tx_lock();
        let q0 = txq_sta_idx(0, 0);
        assert!(!tx.hwqs[ASR_HWQ_BE as usize].list.contains(&q0));
        assert_eq!(tx.txqs[q0 as usize].idx, TXQ_INACTIVE);
        assert!(tx.txqs[q0 as usize].sk_list.is_empty());
        assert_eq!(tx.hwqs[ASR_HWQ_BE as usize].credits, before);
    }
}
