//! 省电协调 — 对应 `uwifi_tx.c` 的 PS 段（`asr_ps_bh_enable` 等）
//!
//! 站点入睡即停其全部队列并重新清点两类（传统 / U-APSD）缓存帧数，
//! 向固件通告"有货"；固件代站点拉货时发 traffic request，按请求量在
//! 高 TID 优先的顺序给各队列发服务期配额（push_limit），调度器照额
//! 推送。醒来解除停队、通告"无货"并立即放行积压。
//!
//! 指示分两路：入队 0→1 的即时指示走 [`QueueOutcome`] 外带；睡醒两个
//! 批处理路径先把指示暂存在 [`TrafficStatus`]，锁外一次冲刷。
//!
//! [`QueueOutcome`]: crate::txq::QueueOutcome

use axerrno::{AxError, AxResult};

use crate::cfg::*;
use crate::hw::{AsrHw, TxEnv};
use crate::netdev::{FwBus, NetIf};
use crate::txq::{hw_list_add, txq_sta_idx, TxqFlags, VifTxqType};

/// 一条待发的流量指示，对应 `ME_TRAFFIC_IND_REQ` 的参数组。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrafficInd {
    pub sta_idx: u8,
    /// 指示的是 U-APSD 类别还是传统类别。
    pub uapsd: bool,
    /// 主机侧是否还有该站点的缓存流量。
    pub available: bool,
}

/// 批处理路径的指示暂存，对应 `g_asr_traffic_sts`。
#[derive(Clone, Copy, Debug, Default)]
pub struct TrafficStatus {
    pub send: bool,
    pub sta_idx: u8,
    pub tx_avail: bool,
    /// bit0 传统、bit1 U-APSD。
    pub ps_id_bits: u8,
}

/// 站点省电簿记，对应 `struct asr_sta_ps`。
#[derive(Clone, Copy, Debug, Default)]
pub struct StaPs {
    pub active: bool,
    /// 两类缓存帧数（下标为 ps_id）。
    pub pkt_ready: [u16; 2],
    /// 两类服务期在途帧数。
    pub sp_cnt: [u16; 2],
}

impl TxEnv {
    /// 站点入睡，对应 `asr_ps_bh_enable` 的启用分支。
    ///
    /// 调用方须先以 STOP_STA_PS 停住站点队列。缓存帧数按队列现存
    /// 积压重新清点；BCMC 伪站点同时把队列改挂 BCMC 硬件队列，
    /// 让固件在 beacon 后的 DTIM 窗口发送。
    pub(crate) fn ps_enable(&mut self, cfg: &ModParams, sta_idx: u8) {
        let mut ready = [0u16; 2];
        if sta_idx >= cfg.sta_max {
            let txq_idx = self.txq_sta_get(cfg, sta_idx, 0);
            let txq = &mut self.txqs[txq_idx as usize];
            ready[txq.ps_id as usize] = txq.sk_list.len() as u16;
            txq.hwq = ASR_HWQ_BCMC;
        } else {
            for tid in 0..NX_NB_TXQ_PER_STA as u8 {
                let txq = &self.txqs[txq_sta_idx(sta_idx, tid) as usize];
                ready[txq.ps_id as usize] += txq.sk_list.len() as u16;
            }
        }

        let ps = &mut self.stas[sta_idx as usize].ps;
        ps.active = true;
        ps.pkt_ready = ready;
        ps.sp_cnt = [0; 2];

        let bits = (ready[LEGACY_PS_ID as usize] > 0) as u8
            | (((ready[UAPSD_ID as usize] > 0) as u8) << 1);
        self.traffic_sts = TrafficStatus {
            send: bits != 0,
            sta_idx,
            tx_avail: true,
            ps_id_bits: bits,
        };
        log::debug!(
            target: "uwifi::edrv::ps",
            "sta {} enters ps, ready legacy {} uapsd {}",
            sta_idx, ready[LEGACY_PS_ID as usize], ready[UAPSD_ID as usize]
        );
    }

    /// 站点苏醒，对应 `asr_ps_bh_enable` 的解除分支。
    ///
    /// 对醒前仍有缓存的类别通告"无货"，清空簿记与各队列残余的
    /// 服务期配额；BCMC 队列改回 BE 硬件队列。
    pub(crate) fn ps_disable(&mut self, cfg: &ModParams, sta_idx: u8) {
        let ready = self.stas[sta_idx as usize].ps.pkt_ready;
        let bits = (ready[LEGACY_PS_ID as usize] > 0) as u8
            | (((ready[UAPSD_ID as usize] > 0) as u8) << 1);
        self.traffic_sts = TrafficStatus {
            send: bits != 0,
            sta_idx,
            tx_avail: false,
            ps_id_bits: bits,
        };

        {
            let ps = &mut self.stas[sta_idx as usize].ps;
            ps.active = false;
            ps.pkt_ready = [0; 2];
            ps.sp_cnt = [0; 2];
        }
        if sta_idx >= cfg.sta_max {
            let txq_idx = self.txq_sta_get(cfg, sta_idx, 0);
            let txq = &mut self.txqs[txq_idx as usize];
            txq.push_limit = 0;
            txq.hwq = ASR_HWQ_BE;
        } else {
            for tid in 0..NX_NB_TXQ_PER_STA as u8 {
                self.txqs[txq_sta_idx(sta_idx, tid) as usize].push_limit = 0;
            }
        }
        log::debug!(target: "uwifi::edrv::ps", "sta {} leaves ps", sta_idx);
    }

    /// 固件代省电站点拉货，对应 `asr_traffic_req_ind`。
    ///
    /// `pkt_req` 为 0 或超过现存量时按现存量发满。配额从 TID 8 往
    /// TID 0 分摊（高优先级先走），各队列还受自身信用封顶；上一个
    /// 服务期未结束（sp_cnt 非零）时忽略本次请求。
    pub(crate) fn traffic_req(&mut self, cfg: &ModParams, sta_idx: u8, pkt_req: u16, ps_id: u8) {
        let ps = &self.stas[sta_idx as usize].ps;
        if !ps.active {
            log::warn!(
                target: "uwifi::edrv::ps",
                "traffic req for awake sta {}", sta_idx
            );
            return;
        }
        if ps.sp_cnt[ps_id as usize] != 0 {
            return;
        }
        let avail = ps.pkt_ready[ps_id as usize];
        if avail == 0 {
            return;
        }
        let req = if pkt_req == 0 || pkt_req > avail {
            avail
        } else {
            pkt_req
        };
        log::debug!(
            target: "uwifi::edrv::ps",
            "sta {} ps_id {} sp of {} frame(s)",
            sta_idx, ps_id, req
        );

        let TxEnv {
            txqs, hwqs, stas, ..
        } = self;

        if sta_idx >= cfg.sta_max {
            let vif_idx = stas[sta_idx as usize].vif_idx;
            let txq_idx = crate::txq::txq_vif_idx(cfg, vif_idx, VifTxqType::Bcmc);
            let txq = &mut txqs[txq_idx as usize];
            if txq.credits <= 0 {
                return;
            }
            let granted = req.min(txq.credits as u16);
            txq.push_limit = granted;
            stas[sta_idx as usize].ps.sp_cnt[ps_id as usize] = granted;
            hw_list_add(txq, &mut hwqs[txq.hwq as usize]);
            return;
        }

        let mut remaining = req;
        for tid in (0..NX_NB_TXQ_PER_STA as u8).rev() {
            let txq = &mut txqs[txq_sta_idx(sta_idx, tid) as usize];
            if !txq.is_active() || txq.ps_id != ps_id {
                continue;
            }
            let txq_len = (txq.sk_list.len() as u16).min(txq.credits.max(0) as u16);
            if txq_len == 0 {
                continue;
            }
            if txq_len < remaining {
                txq.push_limit = txq_len;
                remaining -= txq_len;
                hw_list_add(txq, &mut hwqs[txq.hwq as usize]);
            } else {
                txq.push_limit = remaining;
                hw_list_add(txq, &mut hwqs[txq.hwq as usize]);
                remaining = 0;
                break;
            }
        }
        stas[sta_idx as usize].ps.sp_cnt[ps_id as usize] = req - remaining;
    }
}

impl<B: FwBus, N: NetIf> AsrHw<B, N> {
    /// 站点省电状态翻转，对应 `asr_rx_ps_change_ind`。
    ///
    /// 入睡先停队再清点；苏醒先清簿记再放行并立即调度积压。
    /// 暂存的流量指示在锁外冲刷。
    pub fn ps_change(&self, sta_idx: u8, on: bool) -> AxResult<()> {
        if sta_idx as usize >= self.cfg.sta_slots() {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        if !tx.stas[sta_idx as usize].valid {
            return Err(AxError::NotFound);
        }
        if tx.stas[sta_idx as usize].ps.active == on {
            log::warn!(
                target: "uwifi::edrv::ps",
                "sta {} ps already {}", sta_idx, on
            );
            return Ok(());
        }
        if on {
            tx.txq_sta_stop(&self.cfg, sta_idx, TxqFlags::STOP_STA_PS);
            tx.ps_enable(&self.cfg, sta_idx);
        } else {
            tx.ps_disable(&self.cfg, sta_idx);
            tx.txq_sta_start(&self.cfg, sta_idx, TxqFlags::STOP_STA_PS);
            self.hwq_process_all(&mut tx);
        }
        let sts = core::mem::take(&mut tx.traffic_sts);
        drop(tx);
        self.flush_traffic_status(sts);
        Ok(())
    }

    /// 固件拉货请求入口，对应 `asr_rx_traffic_req_ind`。
    pub fn traffic_req(&self, sta_idx: u8, pkt_req: u16, ps_id: u8) -> AxResult<()> {
        if sta_idx as usize >= self.cfg.sta_slots() || ps_id > UAPSD_ID {
            return Err(AxError::InvalidInput);
        }
        let mut tx = self.tx.lock();
        if !tx.stas[sta_idx as usize].valid {
            return Err(AxError::NotFound);
        }
        tx.traffic_req(&self.cfg, sta_idx, pkt_req, ps_id);
        self.hwq_process_all(&mut tx);
        Ok(())
    }

    /// 发一条流量指示；指示失败只记日志，不影响队列状态。
    pub(crate) fn send_traffic_ind(&self, ind: TrafficInd) {
        if let Err(e) = self.bus.send_traffic_ind(ind.sta_idx, ind.uapsd, ind.available) {
            log::warn!(
                target: "uwifi::edrv::ps",
                "traffic ind for sta {} failed: {:?}", ind.sta_idx, e
            );
        }
    }

    /// 把暂存的批量指示逐类别发出。
    pub(crate) fn flush_traffic_status(&self, sts: TrafficStatus) {
        if !sts.send {
            return;
        }
        if sts.ps_id_bits & (1 << LEGACY_PS_ID) != 0 {
            self.send_traffic_ind(TrafficInd {
                sta_idx: sts.sta_idx,
                uapsd: false,
                available: sts.tx_avail,
            });
        }
        if sts.ps_id_bits & (1 << UAPSD_ID) != 0 {
            self.send_traffic_ind(TrafficInd {
                sta_idx: sts.sta_idx,
                uapsd: true,
                available: sts.tx_avail,
            });
        }
    }
}
