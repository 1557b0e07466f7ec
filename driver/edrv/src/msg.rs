//! 固件上行事件 — 对应 `uwifi_msg_rx.c` 的消息分流
//!
//! 控制面消息由总线侧解出后收敛成 [`FwEvent`]，这里按类别转交
//! 省电协调与信用管理。发送确认走 [`AsrHw::tx_cfm`]，不在此列。

use axerrno::AxResult;

use crate::hw::AsrHw;
use crate::netdev::{FwBus, NetIf};

/// 驱动关心的固件事件。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FwEvent {
    /// 站点省电状态翻转，对应 `MM_PS_CHANGE_IND`。
    PsChange { sta_idx: u8, on: bool },
    /// 站点讨要缓存帧（PS-Poll / U-APSD 触发），对应 `MM_TRAFFIC_REQ_IND`。
    TrafficReq { sta_idx: u8, pkt_req: u8, ps_id: u8 },
    /// 聚合收窄或 BA 建拆导致的队列信用修正，对应 `ME_TX_CREDITS_UPDATE_IND`。
    CreditUpdate { sta_idx: u8, tid: u8, delta: i8 },
}

impl<B: FwBus, N: NetIf> AsrHw<B, N> {
    /// 事件分流入口。
    pub fn fw_event(&self, ev: FwEvent) -> AxResult<()> {
        log::trace!(target: "uwifi::edrv::msg", "fw event {:?}", ev);
        match ev {
            FwEvent::PsChange { sta_idx, on } => self.ps_change(sta_idx, on),
            FwEvent::TrafficReq {
                sta_idx,
                pkt_req,
                ps_id,
            } => self.traffic_req(sta_idx, pkt_req as u16, ps_id),
            FwEvent::CreditUpdate { sta_idx, tid, delta } => {
                self.credit_update(sta_idx, tid, delta)
            }
        }
    }
}
