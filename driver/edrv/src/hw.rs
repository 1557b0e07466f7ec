//! 设备上下文与接口 / 站点生命周期 — 对应 `asr_main.c` 的主结构簿记
//!
//! [`AsrHw`] 聚合整个数据面：发送侧状态（队列竞技场、硬件队列、
//! 站点 / 接口表、水位占用）收在一把 `tx` 锁下，接收侧只有重组槽、
//! 单独一把 `rx` 锁，两个缓冲池各自内部上锁。总线与协议栈通过
//! [`FwBus`] / [`NetIf`] 两个 trait 注入，测试里换成录制桩。
//!
//! 生命周期约定：接口启用时一并立起其 BCMC 伪站点与 vif 级队列；
//! 站点入网建 9 条队列并挂到接口名下；拆除一律先在锁内摘链、置
//! 非激活并扣回水位，帧在解锁后才还池。

use alloc::vec::Vec;
use axerrno::{AxError, AxResult};
use skb::{SkbPool, SkbQueue};
use spin::Mutex;

use crate::cfg::*;
use crate::netdev::{FwBus, NetIf, NetStats};
use crate::ps::{StaPs, TrafficStatus};
use crate::rx::Reassembly;
use crate::tx::Hostdesc;
use crate::txq::{txq_offchan_idx, Hwq, Txq, TxqFlags};

/// 接口角色，对应 `NL80211_IFTYPE_*` 里本驱动支持的两种。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VifType {
    Station,
    Ap,
}

/// 站点表项，对应 `struct asr_sta`。
///
/// 真实站点占 `0..sta_max`，其后每接口一个 BCMC 伪站点。
#[derive(Clone, Debug)]
pub struct Sta {
    pub sta_idx: u8,
    pub valid: bool,
    /// 归属接口。
    pub vif_idx: u8,
    /// 站点实际挂靠的 BSS 接口，AP 桥接折返按它定向。
    pub vlan_idx: u8,
    pub mac_addr: [u8; 6],
    /// 对端带 QoS 能力，决定 TID 分类还是一律 TID 0。
    pub qos: bool,
    /// 准入控制位图（bit 序同 AC），命中的 AC 逐级降级。
    pub acm: u8,
    /// 订阅 U-APSD 的 TID 位图。
    pub uapsd_tids: u8,
    pub ps: StaPs,
}

impl Sta {
    fn empty(sta_idx: u8) -> Self {
        Sta {
            sta_idx,
            valid: false,
            vif_idx: INVALID_IDX,
            vlan_idx: INVALID_IDX,
            mac_addr: [0; 6],
            qos: false,
            acm: 0,
            uapsd_tids: 0,
            ps: StaPs::default(),
        }
    }
}

/// 接口表项，对应 `struct asr_vif`。
#[derive(Clone, Debug)]
pub struct Vif {
    pub vif_idx: u8,
    pub iftype: VifType,
    pub up: bool,
    /// 4 地址（WDS）封装。
    pub use_4addr: bool,
    /// AP 客户端隔离：关掉 BSS 内桥接。
    pub isolate: bool,
    /// STATION 角色下已关联 AP 的站点号，未关联为 `INVALID_IDX`。
    pub sta_ap_idx: u8,
    /// AP 角色下在网站点。
    pub sta_list: Vec<u8>,
    /// 本接口在途字节（按对齐后传输长度计）。
    pub txring_bytes: u32,
    /// 本接口在途帧数。
    pub tx_skb_cnt: u16,
    /// 水位闸门：关着时发送入口拒收（折返重注豁免）。
    pub vif_disable_tx: bool,
    /// RX 折返正在借道发送入口。
    pub is_resending: bool,
    pub stats: NetStats,
}

impl Vif {
    fn empty(vif_idx: u8) -> Self {
        Vif {
            vif_idx,
            iftype: VifType::Station,
            up: false,
            use_4addr: false,
            isolate: false,
            sta_ap_idx: INVALID_IDX,
            sta_list: Vec::new(),
            txring_bytes: 0,
            tx_skb_cnt: 0,
            vif_disable_tx: false,
            is_resending: false,
            stats: NetStats::default(),
        }
    }
}

/// 发送聚合缓冲占用，对应 `struct asr_tx_agg` 的水位部分。
#[derive(Clone, Copy, Debug)]
pub struct AggEnv {
    /// 在途字节。
    pub used: u32,
    /// 在途帧数。
    pub cnt: u32,
    /// 环容量（字节）。
    pub total: u32,
}

/// 发送侧全部可变状态，整体置于一把自旋锁下。
pub struct TxEnv {
    pub stas: Vec<Sta>,
    pub vifs: Vec<Vif>,
    /// TXQ 竞技场，布局见 `txq_sta_idx` 族。
    pub txqs: Vec<Txq>,
    pub hwqs: [Hwq; NX_TXQ_CNT],
    /// 各硬件队列的在途帧链，确认按 FIFO 对账。
    pub tx_pending: [SkbQueue; NX_TXQ_CNT],
    pub agg: AggEnv,
    pub(crate) traffic_sts: TrafficStatus,
    /// 在用接口数，决定水位配额分法。
    pub vif_started: u8,
}

pub(crate) struct RxEnv {
    pub(crate) reass: Reassembly,
}

/// 设备上下文，对应 `struct asr_hw`。
pub struct AsrHw<B, N> {
    pub(crate) cfg: ModParams,
    pub(crate) bus: B,
    pub(crate) net: N,
    pub(crate) tx: Mutex<TxEnv>,
    pub(crate) rx: Mutex<RxEnv>,
    pub(crate) tx_pool: SkbPool,
    pub(crate) rx_pool: SkbPool,
}

/// 扣回一串待释放帧的水位占用，按各自描述符对账。
fn uncharge_backlog(tx: &mut TxEnv, freed: &SkbQueue) {
    for skb in freed.iter() {
        let desc = match Hostdesc::read_from(&skb[..]) {
            Some(d) => d,
            None => continue,
        };
        let ring_len = desc.ring_len();
        tx.agg.used = tx.agg.used.saturating_sub(ring_len);
        tx.agg.cnt = tx.agg.cnt.saturating_sub(1);
        if (desc.vif_idx as usize) < tx.vifs.len() {
            let vif = &mut tx.vifs[desc.vif_idx as usize];
            vif.txring_bytes = vif.txring_bytes.saturating_sub(ring_len);
            vif.tx_skb_cnt = vif.tx_skb_cnt.saturating_sub(1);
        }
    }
}

impl<B: FwBus, N: NetIf> AsrHw<B, N> {
    /// 建上下文：池、竞技场、硬件队列按模块参数铺开，离信道队列
    /// 预先立起（初始带 STOP_CHAN）。对应 `asr_platform_init` 的
    /// 主结构部分。
    pub fn new(cfg: ModParams, bus: B, net: N) -> Self {
        let tx_pool = SkbPool::new(cfg.tx_agg_buf_cnt, cfg.tx_agg_buf_unit, PKT_BUF_RESERVE_HEAD);
        let rx_pool = SkbPool::new(cfg.rx_pool_cnt, cfg.rx_buf_size, 0);
        let mut env = TxEnv {
            stas: (0..cfg.sta_slots()).map(|i| Sta::empty(i as u8)).collect(),
            vifs: (0..cfg.vif_max).map(Vif::empty).collect(),
            txqs: (0..cfg.nb_txq()).map(|_| Txq::new_inactive()).collect(),
            hwqs: core::array::from_fn(|i| Hwq::new(i as u8, cfg.txdesc_cnt[i])),
            tx_pending: core::array::from_fn(|_| SkbQueue::new()),
            agg: AggEnv {
                used: 0,
                cnt: 0,
                total: cfg.agg_total_bytes(),
            },
            traffic_sts: TrafficStatus::default(),
            vif_started: 0,
        };
        env.txq_offchan_init(&cfg);
        AsrHw {
            cfg,
            bus,
            net,
            tx: Mutex::new(env),
            rx: Mutex::new(RxEnv {
                reass: Reassembly::new(),
            }),
            tx_pool,
            rx_pool,
        }
    }

    /// 模块参数。
    #[inline]
    pub fn cfg(&self) -> &ModParams {
        &self.cfg
    }

    /// 接口计数快照。
    pub fn stats(&self, vif_idx: u8) -> AxResult<NetStats> {
        if vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        Ok(self.tx.lock().vifs[vif_idx as usize].stats)
    }

    /// 启用接口，对应 `asr_interface_add` 确认后的驱动侧簿记。
    /// BCMC 伪站点与 vif 级队列随接口一并立起。
    pub fn vif_attach(&self, vif_idx: u8, iftype: VifType, mac: [u8; 6]) -> AxResult<()> {
        if vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        if tx.vifs[vif_idx as usize].up {
            return Err(AxError::AlreadyExists);
        }
        let mut vif = Vif::empty(vif_idx);
        vif.iftype = iftype;
        vif.up = true;
        tx.vifs[vif_idx as usize] = vif;

        let bcmc = self.cfg.bcmc_sta_idx(vif_idx);
        tx.stas[bcmc as usize] = Sta {
            sta_idx: bcmc,
            valid: true,
            vif_idx,
            vlan_idx: vif_idx,
            mac_addr: [0xff; 6],
            qos: false,
            acm: 0,
            uapsd_tids: 0,
            ps: StaPs::default(),
        };
        tx.txq_vif_init(&self.cfg, vif_idx, TxqFlags::empty());
        tx.vif_started += 1;
        log::info!(
            target: "uwifi::edrv::hw",
            "vif {} up, type {:?}, mac {:02x}:{:02x}:..:{:02x}",
            vif_idx, iftype, mac[0], mac[1], mac[5]
        );
        Ok(())
    }

    /// 停用接口：先散伙名下站点，再拆 vif 级队列与 BCMC 伪站点，
    /// 积压帧在解锁后还池。对应 `asr_interface_del`。
    pub fn vif_detach(&self, vif_idx: u8) -> AxResult<()> {
        if vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        let freed = {
            let mut tx = self.tx.lock();
            if !tx.vifs[vif_idx as usize].up {
                return Err(AxError::BadState);
            }
            let members = match tx.vifs[vif_idx as usize].iftype {
                VifType::Ap => tx.vifs[vif_idx as usize].sta_list.clone(),
                VifType::Station => {
                    let peer = tx.vifs[vif_idx as usize].sta_ap_idx;
                    if peer != INVALID_IDX {
                        alloc::vec![peer]
                    } else {
                        Vec::new()
                    }
                }
            };
            let mut freed = SkbQueue::new();
            for sta_idx in members {
                let mut q = tx.txq_sta_deinit(sta_idx);
                freed.splice_tail(&mut q);
                tx.stas[sta_idx as usize] = Sta::empty(sta_idx);
            }
            let mut q = tx.txq_vif_deinit(&self.cfg, vif_idx);
            freed.splice_tail(&mut q);
            uncharge_backlog(&mut tx, &freed);

            let bcmc = self.cfg.bcmc_sta_idx(vif_idx);
            tx.stas[bcmc as usize] = Sta::empty(bcmc);
            tx.vifs[vif_idx as usize] = Vif::empty(vif_idx);
            tx.vif_started = tx.vif_started.saturating_sub(1);
            freed
        };
        self.release_backlog(freed);
        log::info!(target: "uwifi::edrv::hw", "vif {} down", vif_idx);
        Ok(())
    }

    /// 站点入网：填表、建 9 条队列、挂到接口名下。
    /// 对应 `asr_cfg80211_add_station` 的驱动侧。
    pub fn sta_attach(
        &self,
        sta_idx: u8,
        vif_idx: u8,
        mac: [u8; 6],
        qos: bool,
        acm: u8,
        uapsd_tids: u8,
    ) -> AxResult<()> {
        if sta_idx >= self.cfg.sta_max || vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        if !tx.vifs[vif_idx as usize].up {
            return Err(AxError::BadState);
        }
        if tx.stas[sta_idx as usize].valid {
            return Err(AxError::AlreadyExists);
        }
        tx.stas[sta_idx as usize] = Sta {
            sta_idx,
            valid: true,
            vif_idx,
            vlan_idx: vif_idx,
            mac_addr: mac,
            qos,
            acm,
            uapsd_tids,
            ps: StaPs::default(),
        };
        tx.txq_sta_init(sta_idx, TxqFlags::empty());
        match tx.vifs[vif_idx as usize].iftype {
            VifType::Ap => tx.vifs[vif_idx as usize].sta_list.push(sta_idx),
            VifType::Station => tx.vifs[vif_idx as usize].sta_ap_idx = sta_idx,
        }
        log::info!(
            target: "uwifi::edrv::hw",
            "sta {} joined vif {}, qos {} acm {:#04x} uapsd {:#04x}",
            sta_idx, vif_idx, qos, acm, uapsd_tids
        );
        Ok(())
    }

    /// 站点离网：锁内摘链拆队列、扣水位、脱钩角色字段，
    /// 帧在解锁后还池。对应 `asr_cfg80211_del_station`。
    pub fn sta_detach(&self, sta_idx: u8) -> AxResult<()> {
        if sta_idx >= self.cfg.sta_max {
            return Err(AxError::InvalidInput);
        }
        let freed = {
            let mut tx = self.tx.lock();
            if !tx.stas[sta_idx as usize].valid {
                return Err(AxError::NotFound);
            }
            let vif_idx = tx.stas[sta_idx as usize].vif_idx;
            let freed = tx.txq_sta_deinit(sta_idx);
            uncharge_backlog(&mut tx, &freed);
            tx.stas[sta_idx as usize] = Sta::empty(sta_idx);
            if (vif_idx as usize) < tx.vifs.len() {
                let vif = &mut tx.vifs[vif_idx as usize];
                vif.sta_list.retain(|s| *s != sta_idx);
                if vif.sta_ap_idx == sta_idx {
                    vif.sta_ap_idx = INVALID_IDX;
                }
            }
            freed
        };
        self.release_backlog(freed);
        log::info!(target: "uwifi::edrv::hw", "sta {} left", sta_idx);
        Ok(())
    }

    /// 踢一轮调度：把所有标记过的硬件队列过一遍。
    /// 对应中断下半部里的 `asr_hwq_process_all`。
    pub fn schedule(&self) {
        let mut tx = self.tx.lock();
        self.hwq_process_all(&mut tx);
    }

    /// 队列信用修正入口（BA 建拆 / 聚合收窄）。
    pub fn credit_update(&self, sta_idx: u8, tid: u8, delta: i8) -> AxResult<()> {
        if sta_idx >= self.cfg.sta_max || tid as usize >= NX_NB_TXQ_PER_STA {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        if !tx.stas[sta_idx as usize].valid {
            return Err(AxError::NotFound);
        }
        tx.txq_credit_update(&self.cfg, sta_idx, tid, delta);
        self.hwq_process_all(&mut tx);
        Ok(())
    }

    /// 接口离开工作信道：全队列挂 STOP_CHAN。帧留在队里不清。
    pub fn chan_stop(&self, vif_idx: u8) -> AxResult<()> {
        if vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        tx.txq_vif_stop(&self.cfg, vif_idx, TxqFlags::STOP_CHAN);
        Ok(())
    }

    /// 接口回到工作信道：解除 STOP_CHAN 并立即调度。
    pub fn chan_start(&self, vif_idx: u8) -> AxResult<()> {
        if vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        tx.txq_vif_start(&self.cfg, vif_idx, TxqFlags::STOP_CHAN);
        self.hwq_process_all(&mut tx);
        Ok(())
    }

    /// 信道切换通告开始：静默整个接口。
    pub fn csa_stop(&self, vif_idx: u8) -> AxResult<()> {
        if vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        tx.txq_vif_stop(&self.cfg, vif_idx, TxqFlags::STOP_CSA);
        Ok(())
    }

    /// 信道切换完成：解除静默并放行积压。
    pub fn csa_start(&self, vif_idx: u8) -> AxResult<()> {
        if vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        tx.txq_vif_start(&self.cfg, vif_idx, TxqFlags::STOP_CSA);
        self.hwq_process_all(&mut tx);
        Ok(())
    }

    /// 接口级省电翻转（P2P NoA 等），挂/摘 STOP_VIF_PS。
    pub fn vif_ps_set(&self, vif_idx: u8, on: bool) -> AxResult<()> {
        if vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        if on {
            tx.txq_vif_stop(&self.cfg, vif_idx, TxqFlags::STOP_VIF_PS);
        } else {
            tx.txq_vif_start(&self.cfg, vif_idx, TxqFlags::STOP_VIF_PS);
            self.hwq_process_all(&mut tx);
        }
        Ok(())
    }

    /// 离信道窗口授予 / 收回，控制离信道管理帧队列的 STOP_CHAN。
    /// 对应 `MM_REMAIN_ON_CHANNEL` 确认后的放行。
    pub fn offchan_grant(&self, on: bool) {
        let mut tx = self.tx.lock();
        let idx = txq_offchan_idx(&self.cfg);
        if on {
            tx.txq_start(idx, TxqFlags::STOP_CHAN);
            self.hwq_process_all(&mut tx);
        } else {
            tx.txq_stop(idx, TxqFlags::STOP_CHAN);
        }
    }

    /// 接口是否被信道 / 省电原因整体封着。
    pub fn vif_tx_blocked(&self, vif_idx: u8) -> AxResult<bool> {
        if vif_idx >= self.cfg.vif_max {
            return Err(AxError::InvalidInput);
        }
        let tx = self.tx.lock();
        Ok(tx.txq_vif_blocked(&self.cfg, vif_idx))
    }

    /// 锁外归还一串帧。
    fn release_backlog(&self, mut freed: SkbQueue) {
        while let Some(skb) = freed.pop_head() {
            self.tx_pool.release(skb);
        }
    }
}

#[cfg(test)]
impl<B: FwBus, N: NetIf> AsrHw<B, N> {
    pub(crate) fn tx_lock(&self) -> spin::MutexGuard<'_, TxEnv> {
        self.tx.lock()
    }

    pub(crate) fn bus(&self) -> &B {
        &self.bus
    }

    pub(crate) fn net(&self) -> &N {
        &self.net
    }

    pub(crate) fn tx_pool_capacity(&self) -> usize {
        self.tx_pool.capacity()
    }

    pub(crate) fn tx_pool_free(&self) -> usize {
        self.tx_pool.free_count()
    }

    pub(crate) fn rx_pool_capacity(&self) -> usize {
        self.rx_pool.capacity()
    }

    pub(crate) fn rx_pool_free(&self) -> usize {
        self.rx_pool.free_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn ip(dest: [u8; 6]) -> alloc::vec::Vec<u8> {
        let mut f = alloc::vec::Vec::new();
        f.extend_from_slice(&dest);
        f.extend_from_slice(&[0x02, 0, 0, 0, 0, 1]);
        f.extend_from_slice(&ETH_P_IP.to_be_bytes());
        let mut ip = alloc::vec![0u8; 26];
        ip[0] = 0x45;
        f.extend_from_slice(&ip);
        f
    }

    #[test]
    fn vif_lifecycle_guards_duplicates() {
        let hw = make_hw();
        hw.vif_attach(0, VifType::Ap, [2; 6]).unwrap();
        assert_eq!(
            hw.vif_attach(0, VifType::Ap, [2; 6]),
            Err(AxError::AlreadyExists)
        );
        let bcmc = hw.cfg().bcmc_sta_idx(0);
        assert!(hw.tx_lock().stas[bcmc as usize].valid);
        hw.vif_detach(0).unwrap();
        assert_eq!(hw.vif_detach(0), Err(AxError::BadState));
        assert!(!hw.tx_lock().stas[bcmc as usize].valid);
        hw.vif_attach(0, VifType::Station, [2; 6]).unwrap();
        assert_eq!(hw.tx_lock().vif_started, 1);
    }

    #[test]
    fn sta_attach_links_roles() {
        let hw = make_hw();
        hw.vif_attach(0, VifType::Station, [2; 6]).unwrap();
        hw.sta_attach(0, 0, [9; 6], true, 0, 0).unwrap();
        assert_eq!(hw.tx_lock().vifs[0].sta_ap_idx, 0);
        hw.vif_attach(1, VifType::Ap, [3; 6]).unwrap();
        hw.sta_attach(1, 1, [8; 6], false, 0, 0).unwrap();
        assert_eq!(hw.tx_lock().vifs[1].sta_list, alloc::vec![1u8]);
        assert_eq!(
            hw.sta_attach(1, 1, [8; 6], false, 0, 0),
            Err(AxError::AlreadyExists)
        );
        hw.sta_detach(1).unwrap();
        assert!(hw.tx_lock().vifs[1].sta_list.is_empty());
        assert_eq!(hw.sta_detach(1), Err(AxError::NotFound));
    }

    #[test]
    fn sta_detach_flushes_and_uncharges() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        hw.csa_stop(0).unwrap();
        for _ in 0..3 {
            hw.start_xmit(0, &ip(sta_mac(0))).unwrap();
        }
        {
            let tx = hw.tx_lock();
            assert_eq!(tx.agg.cnt, 3);
            assert!(tx.agg.used > 0);
        }
        assert_eq!(hw.tx_pool_free(), hw.tx_pool_capacity() - 3);
        hw.sta_detach(0).unwrap();
        assert_eq!(hw.tx_pool_free(), hw.tx_pool_capacity());
        {
            let tx = hw.tx_lock();
            assert_eq!(tx.agg.used, 0);
            assert_eq!(tx.agg.cnt, 0);
            assert_eq!(tx.vifs[0].txring_bytes, 0);
            assert_eq!(tx.vifs[0].tx_skb_cnt, 0);
        }
        // 站点没了：同一目的地址不再可达
        assert_eq!(hw.start_xmit(0, &ip(sta_mac(0))), Err(AxError::NotConnected));
    }

    #[test]
    fn csa_quiets_then_releases() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        hw.csa_stop(0).unwrap();
        hw.start_xmit(0, &ip(sta_mac(0))).unwrap();
        assert_eq!(hw.bus().push_count(), 0);
        hw.csa_start(0).unwrap();
        assert_eq!(hw.bus().push_count(), 1);
    }

    #[test]
    fn chan_gating_covers_bcmc_and_accessor() {
        let hw = make_hw();
        hw.attach_vif_sta(0, VifType::Ap, 0);
        assert!(!hw.vif_tx_blocked(0).unwrap());
        hw.chan_stop(0).unwrap();
        assert!(hw.vif_tx_blocked(0).unwrap());
        hw.start_xmit(0, &ip([0xff; 6])).unwrap();
        assert_eq!(hw.bus().push_count(), 0);
        hw.chan_start(0).unwrap();
        assert!(!hw.vif_tx_blocked(0).unwrap());
        assert_eq!(hw.bus().push_count(), 1);
    }

    #[test]
    fn offchan_grant_gates_offchan_queue() {
        let hw = make_hw();
        hw.vif_attach(0, VifType::Station, [2; 6]).unwrap();
        let mut probe = alloc::vec![0u8; 26];
        probe[0] = 0x40;
        probe[4..10].copy_from_slice(&[0xff; 6]);
        hw.start_mgmt_xmit(0, &probe, true, false).unwrap();
        assert_eq!(hw.bus().push_count(), 0);
        hw.offchan_grant(true);
        assert_eq!(hw.bus().push_count(), 1);
        hw.offchan_grant(false);
        // 窗口收回：新帧继续等
        hw.start_mgmt_xmit(0, &probe, true, false).unwrap();
        assert_eq!(hw.bus().push_count(), 1);
    }

    #[test]
    fn down_or_bogus_vif_rejected() {
        let hw = make_hw();
        assert_eq!(hw.start_xmit(0, &ip([2; 6])), Err(AxError::BadState));
        assert_eq!(hw.start_xmit(9, &ip([2; 6])), Err(AxError::InvalidInput));
        assert_eq!(hw.vif_tx_blocked(9), Err(AxError::InvalidInput));
        assert_eq!(hw.sta_attach(0, 0, [9; 6], true, 0, 0), Err(AxError::BadState));
    }
}
