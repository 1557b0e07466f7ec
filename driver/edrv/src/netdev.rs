//! 对外接口抽象 — 传输层与协议栈两条边界
//!
//! C 侧通过 `asr_sdio_send_data` / `netif_rx` 等直接函数调用耦合；这里收敛成
//! 两个 trait：[`FwBus`]（下行固件传输 + 控制面指示）与 [`NetIf`]（上行递交
//! 与协议栈流控信号）。实现方可能在 tx_lock 持有期间被调用，必须不阻塞。

use axerrno::AxResult;

use crate::tx::Hostdesc;

/// 固件传输边界，对应 SDIO 侧 `asr_sdio_send_data` 与 `asr_send_me_traffic_ind`。
pub trait FwBus {
    /// 推送一帧（描述符 + 载荷）给固件。失败时帧留在调用方手里重试。
    fn push_data(&self, desc: &Hostdesc, payload: &[u8]) -> AxResult<()>;

    /// 通知固件某省电站点是否有缓存流量，对应 `ME_TRAFFIC_IND_REQ`。
    fn send_traffic_ind(&self, sta_idx: u8, uapsd: bool, available: bool) -> AxResult<()>;
}

/// 协议栈边界，对应 `netif_rx` / `netif_stop_queue` 族。
pub trait NetIf {
    /// 递交一帧 802.3 数据给协议栈（借用视图，调用返回后缓冲回收）。
    fn deliver(&self, vif_idx: u8, frame: &[u8]);

    /// 递交一帧管理帧（上层 cfg80211 路径）。
    fn rx_mgmt(&self, vif_idx: u8, frame: &[u8]);

    /// 停止单个 ndev 发送环，对应 `netif_stop_subqueue`。
    fn stop_queue(&self, ndev_idx: u16);

    /// 唤醒单个 ndev 发送环，对应 `netif_wake_subqueue`。
    fn wake_queue(&self, ndev_idx: u16);

    /// 停止某接口全部发送环，对应 `netif_tx_stop_all_queues`。
    fn stop_all(&self, vif_idx: u8);

    /// 唤醒某接口全部发送环，对应 `netif_tx_wake_all_queues`。
    fn wake_all(&self, vif_idx: u8);
}

/// 每接口收发统计，对应 `struct net_device_stats`。
#[derive(Debug, Clone, Copy, Default)]
pub struct NetStats {
    pub rx_packets: u32,
    pub tx_packets: u32,
    pub rx_bytes: u32,
    pub tx_bytes: u32,
    pub rx_errors: u32,
    pub tx_errors: u32,
    pub rx_dropped: u32,
    pub tx_dropped: u32,
}

/// 占位固件传输：未接线时使用。
pub struct FwBusStub;

impl FwBus for FwBusStub {
    fn push_data(&self, _desc: &Hostdesc, _payload: &[u8]) -> AxResult<()> {
        // 未接 SDIO 传输层，占位
        Err(axerrno::AxError::Unsupported)
    }

    fn send_traffic_ind(&self, _sta_idx: u8, _uapsd: bool, _available: bool) -> AxResult<()> {
        Err(axerrno::AxError::Unsupported)
    }
}

/// 占位协议栈：丢弃上行帧、忽略流控信号。
pub struct NetIfStub;

impl NetIf for NetIfStub {
    fn deliver(&self, _vif_idx: u8, _frame: &[u8]) {}
    fn rx_mgmt(&self, _vif_idx: u8, _frame: &[u8]) {}
    fn stop_queue(&self, _ndev_idx: u16) {}
    fn wake_queue(&self, _ndev_idx: u16) {}
    fn stop_all(&self, _vif_idx: u8) {}
    fn wake_all(&self, _vif_idx: u8) {}
}
