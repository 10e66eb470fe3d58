use bitcoin::{
    hashes::Hash,
    opcodes::{all::OP_CHECKMULTISIG, Class, ClassifyContext},
    script::{Instruction, ScriptBuf},
    Amount, OutPoint,
};
use crate::error::AppError;

/// フェデレーションが管理するUTXO 1件
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub out_point: OutPoint,
    pub value: Amount,
}

impl Utxo {
    pub fn new(out_point: OutPoint, value: Amount) -> Self {
        Utxo { out_point, value }
    }

    /// 16進数表記と同じ並び (ビッグエンディアン) のtxidバイト列
    pub fn tx_hash_be_bytes(&self) -> [u8; 32] {
        let mut bytes = self.out_point.txid.to_byte_array();
        bytes.reverse();
        bytes
    }
}

/// 1回の見積もりの間は固定されるマルチシグの署名ポリシー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationConfig {
    pub signature_threshold: u32,
    pub redeem_script: ScriptBuf,
}

impl FederationConfig {
    pub fn new(signature_threshold: u32, redeem_script: ScriptBuf) -> Result<Self, AppError> {
        if signature_threshold == 0 {
            return Err(AppError::DataUnavailable(
                "フェデレーションの署名閾値が0です".to_string(),
            ));
        }
        Ok(FederationConfig { signature_threshold, redeem_script })
    }

    /// `M <pubkeys> N OP_CHECKMULTISIG` 形式のredeem scriptから閾値Mを読み取る。
    pub fn from_redeem_script(redeem_script: ScriptBuf) -> Result<Self, AppError> {
        let not_multisig = || {
            AppError::DataUnavailable(format!(
                "標準マルチシグではないredeem script: {}",
                redeem_script.to_hex_string()
            ))
        };

        if redeem_script.as_bytes().last() != Some(&OP_CHECKMULTISIG.to_u8()) {
            return Err(not_multisig());
        }

        let threshold = match redeem_script.instructions().next() {
            Some(Ok(Instruction::Op(op))) => match op.classify(ClassifyContext::Legacy) {
                Class::PushNum(n) if n >= 1 => n as u32,
                _ => return Err(not_multisig()),
            },
            _ => return Err(not_multisig()),
        };
        log::debug!("redeem scriptから署名閾値 {} を導出しました。", threshold);

        FederationConfig::new(threshold, redeem_script)
    }

    pub fn redeem_script_len(&self) -> usize {
        self.redeem_script.len()
    }
}

/// UTXO選択の結果。選択順を保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub selected: Vec<Utxo>,
    pub selected_value: Amount,
}

impl SelectionResult {
    pub fn input_count(&self) -> usize {
        self.selected.len()
    }
}

/// 手数料収束ループの不動点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeResolution {
    pub fee: Amount,
    pub tx_size_bytes: u64,
    pub selection: SelectionResult,
    pub iterations: usize,
}
