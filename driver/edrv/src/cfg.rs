//! 驱动参数与固定常量 — 对应 `uwifi_defs.h` / `uwifi_txq.h` / `ipc_shared.h` 的编译期配置
//!
//! C 侧以宏把站点数、队列深度、聚合缓冲尺寸烧进二进制；这里收敛成
//! [`ModParams`] 一次性传入，常量保持 C 侧命名便于对照。

/// 硬件队列个数（BK/BE/VI/VO + BCMC）。
pub const NX_TXQ_CNT: usize = 5;

/// 硬件队列编号，对应 `enum asr_hwq_id`。
pub const ASR_HWQ_BK: u8 = 0;
pub const ASR_HWQ_BE: u8 = 1;
pub const ASR_HWQ_VI: u8 = 2;
pub const ASR_HWQ_VO: u8 = 3;
pub const ASR_HWQ_BCMC: u8 = 4;

/// 每站点软件队列数：TID 0..7 数据 + TID 8 管理帧。
pub const NX_NB_TXQ_PER_STA: usize = 9;
/// 每站点数据 TID 数。
pub const NX_NB_TID_PER_STA: usize = 8;
/// 管理帧伪 TID。
pub const NX_MGMT_TID: u8 = 8;

/// 非激活 TXQ 的 idx 哨兵值。
pub const TXQ_INACTIVE: u16 = 0xffff;
/// 无 ndev 环映射的哨兵值。
pub const NDEV_NO_TXQ: u16 = 0xffff;
/// TXQ 初始信用额度。
pub const NX_TXQ_INITIAL_CREDITS: i8 = 4;

/// ndev 环回压阈值：队长越过即停环。
pub const ASR_NDEV_FLOW_CTRL_STOP: usize = 200;
/// ndev 环恢复阈值：队长低于即唤醒。
pub const ASR_NDEV_FLOW_CTRL_RESTART: usize = 100;

/// 传统省电类别（PS-Poll / TIM 触发）。
pub const LEGACY_PS_ID: u8 = 0;
/// U-APSD 省电类别（QoS 触发帧）。
pub const UAPSD_ID: u8 = 1;

/// select_queue 未匹配站点时的优先级标记，对应 `PRIO_STA_NULL`。
pub const PRIO_STA_NULL: u8 = 0xAA;
/// 非 QoS 数据的优先级标记（TID 按 0 处理）。
pub const PRIO_NON_QOS: u8 = 0xFF;

/// 无效站点/接口下标（RX 描述符与 vif 字段共用）。
pub const INVALID_IDX: u8 = 0xFF;

/// TID → 硬件队列映射，对应 `asr_tid2hwq[]`（下标 8 为管理 TID，走 VO）。
pub const ASR_TID2HWQ: [u8; 16] = [
    ASR_HWQ_BE, ASR_HWQ_BK, ASR_HWQ_BK, ASR_HWQ_BE, ASR_HWQ_VI, ASR_HWQ_VI, ASR_HWQ_VO, ASR_HWQ_VO,
    ASR_HWQ_VO, ASR_HWQ_BE, ASR_HWQ_BE, ASR_HWQ_BE, ASR_HWQ_BE, ASR_HWQ_BE, ASR_HWQ_BE, ASR_HWQ_BE,
];

/// ACM 降级后每个目标 AC 选用的 TID，对应 `asr_down_hwq2tid[]`。
pub const ASR_DOWN_HWQ2TID: [u8; 3] = [2, 3, 5];

/// 以太头长度。
pub const ETH_HLEN: usize = 14;
pub const ETH_ALEN: usize = 6;

/// 以太类型，对应 `uwifi_tx.h` 的 ETH_P_* 组。
pub const ETH_P_IP: u16 = 0x0800;
pub const ETH_P_IPV6: u16 = 0x86DD;
pub const ETH_P_PAE: u16 = 0x888E;
pub const ETH_P_80221: u16 = 0x8917;
pub const ETH_P_AARP: u16 = 0x80F3;
pub const ETH_P_IPX: u16 = 0x8137;

/// DHCP 端口（AP 转发抑制判定用）。
pub const DHCP_PORT_CLIENT: u16 = 68;
pub const DHCP_PORT_SERVER: u16 = 67;

/// SDIO 块对齐粒度。
pub const SDIO_BLOCK_ALIGN: usize = 32;

/// 发送尾部结束标记，对应聚合缓冲里的 0xAECDBFCA。
pub const TX_AGG_END_TOKEN: u32 = 0xAECD_BFCA;

/// 发送缓冲前端预留，对应 `PKT_BUF_RESERVE_HEAD`。
pub const PKT_BUF_RESERVE_HEAD: usize = 64;

/// 多 vif 流控预算分母，对应 `MROLE_VIF_FC_DIV`。
pub const MROLE_VIF_FC_DIV: u32 = 128;
/// STATION 类 vif 的流控份额，对应 `TRAFFIC_VIF_FC_LEVEL`。
pub const TRAFFIC_VIF_FC_LEVEL: u32 = 64;

/// 向上对齐到 SDIO 块边界，对应 `ASR_ALIGN_BLKSZ_HI`。
#[inline]
pub const fn align_blksz_hi(len: usize) -> usize {
    (len + SDIO_BLOCK_ALIGN - 1) & !(SDIO_BLOCK_ALIGN - 1)
}

/// 运行参数，C 侧散落各头文件的宏在此集中。
#[derive(Clone, Debug)]
pub struct ModParams {
    /// 远端站点上限，对应 `NX_REMOTE_STA_MAX`。
    pub sta_max: u8,
    /// 虚拟接口上限，对应 `NX_VIRT_DEV_MAX`。
    pub vif_max: u8,
    /// 各硬件队列深度（即初始信用），对应 `nx_txdesc_cnt[]`。
    pub txdesc_cnt: [u8; NX_TXQ_CNT],
    /// 发送聚合缓冲单元数，对应 `TX_AGG_BUF_UNIT_CNT`。
    pub tx_agg_buf_cnt: usize,
    /// 发送聚合缓冲单元大小，对应 `TX_AGG_BUF_UNIT_SIZE` / `ASR_SDIO_DATA_MAX_LEN`。
    pub tx_agg_buf_unit: usize,
    /// 接收缓冲池个数，对应 `IPC_RXBUF_CNT_SDIO_DEAGG`。
    pub rx_pool_cnt: usize,
    /// 单个接收缓冲大小（可容纳一次 SDIO 聚合传输），对应 `IPC_RXBUF_SIZE`。
    pub rx_buf_size: usize,
    /// AMSDU 重组暂存区上限，对应 `WLAN_AMSDU_RX_LEN`。
    pub amsdu_rx_len: usize,
    /// 重组滞留超时（毫秒），超过即清弃半成品。
    pub reassembly_timeout_ms: u64,
    /// 多接口并存时按接口类型拆分流控预算。
    pub mrole: bool,
}

impl Default for ModParams {
    fn default() -> Self {
        ModParams {
            sta_max: 4,
            vif_max: 2,
            // BK / BE / VI / VO / BCMC
            txdesc_cnt: [8, 32, 16, 16, 8],
            tx_agg_buf_cnt: 30,
            tx_agg_buf_unit: 1696,
            rx_pool_cnt: 30,
            rx_buf_size: align_blksz_hi(1696) * 8,
            amsdu_rx_len: 8192,
            reassembly_timeout_ms: 100,
            mrole: true,
        }
    }
}

impl ModParams {
    /// TXQ 竞技场总槽数：单播 + 每 vif 的 BCMC/UNK + 离信道。
    #[inline]
    pub fn nb_txq(&self) -> usize {
        self.sta_max as usize * NX_NB_TXQ_PER_STA + self.vif_max as usize * 2 + 1
    }

    /// ndev 发送环个数：每站点 8 个数据环 + 1 个 BCMC 环。
    #[inline]
    pub fn nb_ndev_txq(&self) -> usize {
        self.sta_max as usize * NX_NB_TID_PER_STA + 1
    }

    /// BCMC ndev 环下标。
    #[inline]
    pub fn bcmc_ndev_idx(&self) -> u16 {
        (self.sta_max as usize * NX_NB_TID_PER_STA) as u16
    }

    /// 站点表总槽数：真实站点 + 每 vif 一个 BCMC 伪站点。
    #[inline]
    pub fn sta_slots(&self) -> usize {
        self.sta_max as usize + self.vif_max as usize
    }

    /// vif 的 BCMC 伪站点下标。
    #[inline]
    pub fn bcmc_sta_idx(&self, vif_idx: u8) -> u8 {
        self.sta_max + vif_idx
    }

    /// 聚合缓冲总字节数（字节水位的基数）。
    #[inline]
    pub fn agg_total_bytes(&self) -> u32 {
        (self.tx_agg_buf_cnt * self.tx_agg_buf_unit) as u32
    }
}
