//! 测试公共件：录制型总线 / 协议栈桩与常用构造器。

use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use axerrno::{AxError, AxResult};
use skb::SkBuff;
use spin::Mutex;

use crate::cfg::*;
use crate::hw::{AsrHw, VifType};
use crate::netdev::{FwBus, NetIf};
use crate::tx::{Hostdesc, HOSTDESC_LEN, TXU_CNTRL_RETRY};
use crate::txq::txq_sta_idx;

pub(crate) type TestHw = AsrHw<RecordBus, RecordNet>;

/// 录制每次下行推送与流量指示；可切换为推送即失败。
pub(crate) struct RecordBus {
    pushes: Mutex<Vec<(Hostdesc, Vec<u8>)>>,
    inds: Mutex<Vec<(u8, bool, bool)>>,
    fail: AtomicBool,
}

impl RecordBus {
    fn new() -> Self {
        RecordBus {
            pushes: Mutex::new(Vec::new()),
            inds: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub(crate) fn pushes(&self) -> Vec<(Hostdesc, Vec<u8>)> {
        self.pushes.lock().clone()
    }

    pub(crate) fn push_count(&self) -> usize {
        self.pushes.lock().len()
    }

    pub(crate) fn inds(&self) -> Vec<(u8, bool, bool)> {
        self.inds.lock().clone()
    }

    pub(crate) fn fail_pushes(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

impl FwBus for RecordBus {
    fn push_data(&self, desc: &Hostdesc, payload: &[u8]) -> AxResult<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(AxError::Io);
        }
        self.pushes.lock().push((*desc, payload.to_vec()));
        Ok(())
    }

    fn send_traffic_ind(&self, sta_idx: u8, uapsd: bool, available: bool) -> AxResult<()> {
        self.inds.lock().push((sta_idx, uapsd, available));
        Ok(())
    }
}

/// 录制上行递交与流控信号。
pub(crate) struct RecordNet {
    frames: Mutex<Vec<(u8, Vec<u8>)>>,
    mgmt: Mutex<Vec<(u8, Vec<u8>)>>,
    /// (是否唤醒, ndev 环号)
    queue_events: Mutex<Vec<(bool, u16)>>,
    /// (是否停止, 接口号)
    gate_events: Mutex<Vec<(bool, u8)>>,
}

impl RecordNet {
    fn new() -> Self {
        RecordNet {
            frames: Mutex::new(Vec::new()),
            mgmt: Mutex::new(Vec::new()),
            queue_events: Mutex::new(Vec::new()),
            gate_events: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn delivered(&self) -> Vec<(u8, Vec<u8>)> {
        self.frames.lock().clone()
    }

    pub(crate) fn mgmt(&self) -> Vec<(u8, Vec<u8>)> {
        self.mgmt.lock().clone()
    }

    /// 收到过唤醒信号的 ndev 环。
    pub(crate) fn woken(&self) -> Vec<u16> {
        self.queue_events
            .lock()
            .iter()
            .filter(|(wake, _)| *wake)
            .map(|(_, q)| *q)
            .collect()
    }

    /// 被整体停住过的接口。
    pub(crate) fn stopped_all(&self) -> Vec<u8> {
        self.gate_events
            .lock()
            .iter()
            .filter(|(stop, _)| *stop)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl NetIf for RecordNet {
    fn deliver(&self, vif_idx: u8, frame: &[u8]) {
        self.frames.lock().push((vif_idx, frame.to_vec()));
    }

    fn rx_mgmt(&self, vif_idx: u8, frame: &[u8]) {
        self.mgmt.lock().push((vif_idx, frame.to_vec()));
    }

    fn stop_queue(&self, ndev_idx: u16) {
        self.queue_events.lock().push((false, ndev_idx));
    }

    fn wake_queue(&self, ndev_idx: u16) {
        self.queue_events.lock().push((true, ndev_idx));
    }

    fn stop_all(&self, vif_idx: u8) {
        self.gate_events.lock().push((true, vif_idx));
    }

    fn wake_all(&self, vif_idx: u8) {
        self.gate_events.lock().push((false, vif_idx));
    }
}

pub(crate) fn make_hw() -> TestHw {
    AsrHw::new(ModParams::default(), RecordBus::new(), RecordNet::new())
}

/// 大号发送池，给一次囤几百帧的回压测试用。
pub(crate) fn make_big_hw() -> TestHw {
    let cfg = ModParams {
        tx_agg_buf_cnt: 512,
        ..ModParams::default()
    };
    AsrHw::new(cfg, RecordBus::new(), RecordNet::new())
}

pub(crate) fn sta_mac(idx: u8) -> [u8; 6] {
    [0x02, 0x33, 0x44, 0x55, 0x66, idx]
}

fn build_skb(hw: &TestHw, byte: u8, flags: u16) -> SkBuff {
    let mut skb = hw.tx_pool.alloc().unwrap();
    assert!(skb.put_slice(&[byte]));
    assert!(skb.push(HOSTDESC_LEN));
    let mut desc = Hostdesc::zeroed();
    desc.queue_idx = ASR_HWQ_BE;
    desc.txq_idx = txq_sta_idx(0, 0);
    desc.flags = flags;
    desc.sdio_tx_total_len = (HOSTDESC_LEN + 1) as u16;
    desc.sdio_tx_len = (align_blksz_hi(HOSTDESC_LEN + 1 + 4) - 2) as u16;
    desc.packet_len = 1;
    desc.packet_offset = HOSTDESC_LEN as u16;
    desc.write_to(&mut skb[..HOSTDESC_LEN]);
    skb
}

/// 站点 0 / TID 0 的单字节数据帧（已带描述符前缀）。
pub(crate) fn data_skb(hw: &TestHw, byte: u8) -> SkBuff {
    build_skb(hw, byte, 0)
}

/// 同上，但带 RETRY 标志。
pub(crate) fn retry_skb(hw: &TestHw, byte: u8) -> SkBuff {
    build_skb(hw, byte, TXU_CNTRL_RETRY)
}

/// 读回帧的单字节载荷。
pub(crate) fn payload_byte(skb: &SkBuff) -> u8 {
    skb[HOSTDESC_LEN]
}

impl TestHw {
    /// 一步拉起接口 + 站点（QoS、无 ACM、无 U-APSD）。
    pub(crate) fn attach_vif_sta(&self, vif_idx: u8, iftype: VifType, sta_idx: u8) {
        self.vif_attach(vif_idx, iftype, [2; 6]).unwrap();
        self.sta_attach(sta_idx, vif_idx, sta_mac(sta_idx), true, 0, 0)
            .unwrap();
    }
}
