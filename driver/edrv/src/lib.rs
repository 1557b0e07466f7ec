//! ASR 系 WiFi 以太网数据面驱动 (EDRV)
//!
//! 对应 asr5505/asr5825 uwifi 驱动的 TX/RX 核心（`uwifi_tx.c` /
//! `uwifi_rx.c` / `uwifi_txq.c` 一族），剥掉了总线与 cfg80211 绑定。
//!
//! 功能包括:
//! - TXQ 竞技场 (txq) - 每 (站点, TID) 软件队列与硬件队列调度
//! - 发送路径 (tx) - 帧分类、描述符、确认回收与重传
//! - 省电协调 (ps) - 传统 / U-APSD 缓存指示与服务期
//! - 接收路径 (rx) - SDIO 聚合解包、AMSDU 重组拆分、AP 桥接折返
//! - 水位闸门 (flow) - 每接口配额的字节 / 帧数双轨流控
//! - 固件事件 (msg) - PS / 拉货 / 信用修正的闭合事件面
//!
//! 总线与协议栈经 [`FwBus`] / [`NetIf`] 注入；所有可失败操作返回
//! [`axerrno::AxResult`]。

#![no_std]

extern crate alloc;

mod cfg;
mod flow;
mod hw;
mod msg;
mod netdev;
mod ps;
mod rx;
mod tx;
mod txq;

#[cfg(test)]
pub(crate) mod test_support;

pub use cfg::{
    align_blksz_hi, ModParams, ASR_HWQ_BCMC, ASR_HWQ_BE, ASR_HWQ_BK, ASR_HWQ_VI, ASR_HWQ_VO,
    ASR_NDEV_FLOW_CTRL_RESTART, ASR_NDEV_FLOW_CTRL_STOP, ASR_TID2HWQ, ETH_ALEN, ETH_HLEN,
    INVALID_IDX, LEGACY_PS_ID, NDEV_NO_TXQ, NX_MGMT_TID, NX_NB_TID_PER_STA, NX_NB_TXQ_PER_STA,
    NX_TXQ_CNT, NX_TXQ_INITIAL_CREDITS, SDIO_BLOCK_ALIGN, TXQ_INACTIVE, UAPSD_ID,
};
pub use hw::{AggEnv, AsrHw, Sta, TxEnv, Vif, VifType};
pub use msg::FwEvent;
pub use netdev::{FwBus, FwBusStub, NetIf, NetIfStub, NetStats};
pub use ps::{StaPs, TrafficInd, TrafficStatus};
pub use rx::{HostRxDesc, HOST_RX_DESC_LEN, RX_DESC_ID_DATA};
pub use tx::{
    Hostdesc, TxCfmTag, TxStatus, HOSTDESC_LEN, TXU_CNTRL_AMSDU, TXU_CNTRL_DROP, TXU_CNTRL_EOSP,
    TXU_CNTRL_MGMT, TXU_CNTRL_MGMT_NO_CCK, TXU_CNTRL_MGMT_ROBUST, TXU_CNTRL_MORE_DATA,
    TXU_CNTRL_POSTPONE_PS, TXU_CNTRL_RETRY, TXU_CNTRL_USE_4ADDR,
};
pub use txq::{Hwq, Txq, TxqFlags, VifTxqType};
