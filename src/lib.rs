//! uwifi 无线数据面 crate
//!
//! 整合 ASR 系 SDIO WiFi 驱动 TX/RX 核心的移植：SKB + EDRV
//! - SKB: `sk_buff` 语义的包缓冲、FIFO 队列、固定容量回收池
//! - EDRV: TXQ 竞技场、发送 / 确认路径、省电协调、RX 解包分发、流控闸门

#![no_std]

pub use edrv;
pub use skb;

/// 数据面上下文：缓冲池 + 队列竞技场 + 收发状态机
///
/// 由平台初始化时创建，总线实现 ([`edrv::FwBus`]) 与协议栈实现
/// ([`edrv::NetIf`]) 作为类型参数注入，可交给 netdev/syscall 层使用。
pub type WifiDatapath<B, N> = edrv::AsrHw<B, N>;

/// 使用占位实现的数据面初始化（无 SDIO 总线 / 协议栈绑定时可用）
///
/// ## 对应 uwifi 驱动中的哪部分
///
/// 对应 **`asr_cfg80211_init()` 里创建 `struct asr_hw` 的那一步**：
/// 分配驱动主结构、建起 TX 聚合缓冲池与 RX 缓冲池、初始化 TXQ/HWQ
/// 竞技场，再把 wiphy 与 SDIO 函数表挂上去。
///
/// - 原始流程：SDIO probe → 固件下载与启动 → `asr_cfg80211_init()`
///   分配 `asr_hw` 并注册 wiphy → netdev open 后数据面开始收发。
/// - 本函数只做“创建数据面上下文”这一步，**不**做 SDIO 探测、固件
///   加载、wiphy 注册；总线用 [`edrv::FwBusStub`]、协议栈用
///   [`edrv::NetIfStub`] 占位。
///
/// ## 预期实现的功能
///
/// 1. **无硬件/平台未就绪时**：系统仍能启动，并持有一个有效的
///    [`WifiDatapath`]，上层可统一通过该句柄走接口/站点生命周期与
///    收发入口，避免空指针。
/// 2. **占位行为**：`push_data`/`send_traffic_ind` 返回 `Unsupported`，
///    协议栈侧投递全部丢弃，便于联调与接口对接。
/// 3. **后续替换**：平台实现 SDIO 传输层与 netdev 绑定后，改为
///    `edrv::AsrHw::new(cfg, RealBus, RealNetif)`，并在初始化链中先
///    执行固件下载、再创建该上下文。
pub fn wifi_datapath_init_stub() -> WifiDatapath<edrv::FwBusStub, edrv::NetIfStub> {
    log::info!(target: "uwifi", "uwifi: init stub datapath (FwBusStub/NetIfStub)");
    edrv::AsrHw::new(edrv::ModParams::default(), edrv::FwBusStub, edrv::NetIfStub)
}
