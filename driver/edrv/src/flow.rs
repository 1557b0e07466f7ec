//! 发送侧水位闸门 — 对应 `uwifi_tx.h` 的 txring 配额宏族
//!
//! 每接口按角色分得聚合缓冲的一份配额：多角色并存时 AP 拿大头、
//! STA 拿 TRAFFIC 份额，单接口独占全量。占用（字节与帧数双轨）越过
//! 高水位就关闸停环，确认回收把占用压回低水位才重新放行，迟滞区间
//! 避免闸门抖动。

use crate::cfg::{ModParams, MROLE_VIF_FC_DIV, TRAFFIC_VIF_FC_LEVEL};
use crate::hw::{AsrHw, TxEnv, VifType};
use crate::netdev::{FwBus, NetIf};

/// 接口可占聚合缓冲的配额类别。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShareClass {
    /// 多角色下的 AP 份额。
    Cfg,
    /// 多角色下的 STA 份额。
    Traffic,
    /// 单接口独占。
    Unique,
}

fn share_class(tx: &TxEnv, cfg: &ModParams, vif_idx: u8) -> ShareClass {
    if cfg.mrole && tx.vif_started > 1 {
        match tx.vifs[vif_idx as usize].iftype {
            VifType::Ap => ShareClass::Cfg,
            VifType::Station => ShareClass::Traffic,
        }
    } else {
        ShareClass::Unique
    }
}

fn share(total: u32, class: ShareClass) -> u32 {
    match class {
        ShareClass::Cfg => total * (MROLE_VIF_FC_DIV - TRAFFIC_VIF_FC_LEVEL) / MROLE_VIF_FC_DIV,
        ShareClass::Traffic => total * TRAFFIC_VIF_FC_LEVEL / MROLE_VIF_FC_DIV,
        ShareClass::Unique => total,
    }
}

/// 接口的在途字节配额，对应 `asr_tx_get_vif_max_bytes`。
pub(crate) fn vif_max_bytes(tx: &TxEnv, cfg: &ModParams, vif_idx: u8) -> u32 {
    share(cfg.agg_total_bytes(), share_class(tx, cfg, vif_idx))
}

/// 接口的在途帧数配额，对应 `asr_tx_get_vif_max_cnts`。
pub(crate) fn vif_max_cnts(tx: &TxEnv, cfg: &ModParams, vif_idx: u8) -> u32 {
    share(cfg.tx_agg_buf_cnt as u32, share_class(tx, cfg, vif_idx))
}

#[inline]
fn hwm(max: u32) -> u32 {
    max / 8 * 7
}

#[inline]
fn lwm(max: u32) -> u32 {
    max / 8
}

/// 水位评估，对应 `asr_tx_flow_ctrl_stop` / `asr_tx_flow_ctrl_start`。
///
/// `check_high` 为真走发送路径的高水位检查：字节或帧数任一越线即
/// 关闸；为假走确认路径的低水位检查：两轨都回落才开闸。返回
/// `Some(true)` 表示本次关闸、`Some(false)` 表示本次开闸，调用方
/// 据此向协议栈发停/醒信号。
pub(crate) fn tx_flow_ctrl(
    tx: &mut TxEnv,
    cfg: &ModParams,
    vif_idx: u8,
    check_high: bool,
) -> Option<bool> {
    let max_bytes = vif_max_bytes(tx, cfg, vif_idx);
    let max_cnts = vif_max_cnts(tx, cfg, vif_idx);
    let vif = &mut tx.vifs[vif_idx as usize];
    if check_high {
        if !vif.vif_disable_tx
            && (vif.txring_bytes > hwm(max_bytes) || vif.tx_skb_cnt as u32 > hwm(max_cnts))
        {
            vif.vif_disable_tx = true;
            log::info!(
                target: "uwifi::edrv::flow",
                "vif {} tx gate closed: bytes {}/{} cnt {}/{}",
                vif_idx, vif.txring_bytes, max_bytes, vif.tx_skb_cnt, max_cnts
            );
            return Some(true);
        }
    } else if vif.vif_disable_tx
        && vif.txring_bytes < lwm(max_bytes)
        && (vif.tx_skb_cnt as u32) < lwm(max_cnts)
    {
        vif.vif_disable_tx = false;
        log::info!(
            target: "uwifi::edrv::flow",
            "vif {} tx gate reopened: bytes {} cnt {}",
            vif_idx, vif.txring_bytes, vif.tx_skb_cnt
        );
        return Some(false);
    }
    None
}

impl<B: FwBus, N: NetIf> AsrHw<B, N> {
    /// 把闸门变化翻译成协议栈流控信号。
    pub(crate) fn apply_gate(&self, vif_idx: u8, gate: Option<bool>) {
        match gate {
            Some(true) => self.net.stop_all(vif_idx),
            Some(false) => self.net.wake_all(vif_idx),
            None => {}
        }
    }
}
