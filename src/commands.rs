//! Well-known command names of application messages.
//!
//! The server sends many more; these are the ones most clients care about.
//! Any string can be registered with the handler registry.

/// Danmaku (bullet chat) message.
pub const DANMU_MSG: &str = "DANMU_MSG";

/// A gift was sent.
pub const SEND_GIFT: &str = "SEND_GIFT";

/// Combo of repeated gifts.
pub const COMBO_SEND: &str = "COMBO_SEND";

/// A viewer entered or followed.
pub const INTERACT_WORD: &str = "INTERACT_WORD";

/// Entry effect of a privileged viewer.
pub const ENTRY_EFFECT: &str = "ENTRY_EFFECT";

/// Site-wide notice.
pub const NOTICE_MSG: &str = "NOTICE_MSG";
