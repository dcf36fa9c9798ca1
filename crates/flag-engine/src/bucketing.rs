//! 确定性百分比分桶
//!
//! 对 `seed ++ 实体 ID` 做 SHA-1，把 160 位摘要按 1000 取模映射到
//! 0.1% 粒度的桶号。结果只依赖输入，跨请求、跨进程、跨语言可复现。

use sha1::{Digest, Sha1};

/// 四个 40 位大端块的模乘系数：2^120、2^80、2^40、2^0 各自 mod 1000。
///
/// 跨语言校验依赖这组固定常量——它们用 64 位安全的算术实现了对
/// 160 位大数的取模归约，不得改动。
const CHUNK_MODS: [u64; 4] = [576, 176, 776, 1];

/// SHA-1 分桶哈希
pub struct BucketingHasher;

impl BucketingHasher {
    /// 计算 0..=999 的桶号
    pub fn bucket(seed: &str, entity_id: &str) -> u64 {
        let mut hasher = Sha1::new();
        hasher.update(seed.as_bytes());
        hasher.update(entity_id.as_bytes());
        let digest = hasher.finalize();

        // 摘要拆成 c3 c2 c1 c0 四个 40 位块（高位在前），
        // 则 H mod 1000 = (c3*576 + c2*176 + c1*776 + c0) mod 1000
        let mut acc = 0u64;
        for (chunk, modulus) in digest.chunks(5).zip(CHUNK_MODS) {
            let mut piece = 0u64;
            for byte in chunk {
                piece = (piece << 8) | u64::from(*byte);
            }
            acc += (piece % 1000) * modulus % 1000;
        }
        acc % 1000
    }

    /// 判断实体是否落入给定百分比（整数百分比，0.1% 分辨率）
    ///
    /// percentage 为 0 时对任何实体都返回 false。
    pub fn in_percentage(seed: &str, entity_id: &str, percentage: f64) -> bool {
        if percentage <= 0.0 {
            return false;
        }
        Self::bucket(seed, entity_id) as f64 <= 10.0 * percentage
    }
}
