use solana_transaction_status::{
    option_serializer::OptionSerializer, EncodedConfirmedTransactionWithStatusMeta,
    EncodedTransaction, UiCompiledInstruction, UiInstruction, UiMessage, UiParsedInstruction,
    UiTransactionStatusMeta,
};
use tracing::warn;

/// One instruction as the extractor sees it. `data` is `None` when the RPC
/// node rendered the instruction in its own parsed form (system, token, ...),
/// which never happens for the program we index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstruction {
    pub program_id: String,
    pub accounts: Vec<String>,
    pub data: Option<Vec<u8>>,
}

impl RawInstruction {
    pub fn is_program(&self, program_id: &str) -> bool {
        self.program_id == program_id
    }
}

/// Instructions invoked from the top-level instruction at `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerInstructionGroup {
    pub index: u8,
    pub instructions: Vec<RawInstruction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub signature: String,
    pub slot: u64,
    pub block_time: i64,
    pub success: bool,
    pub instructions: Vec<RawInstruction>,
    pub inner_instructions: Vec<InnerInstructionGroup>,
}

/// Convert an RPC transaction into the extractor's model.
pub fn extract_transaction(
    signature: &str,
    tx_data: &EncodedConfirmedTransactionWithStatusMeta,
) -> Option<RawTransaction> {
    let slot = tx_data.slot;
    let block_time = tx_data.block_time.unwrap_or(0);

    let transaction = match &tx_data.transaction.transaction {
        EncodedTransaction::Json(tx) => tx,
        _ => {
            warn!("Unsupported transaction encoding for {}", signature);
            return None;
        }
    };

    let meta = match &tx_data.transaction.meta {
        Some(meta) => meta,
        None => {
            warn!("Transaction {} has no metadata", signature);
            return None;
        }
    };

    let success = meta.err.is_none();

    let (account_keys, top_level) = match &transaction.message {
        UiMessage::Parsed(message) => {
            let keys: Vec<String> = message
                .account_keys
                .iter()
                .map(|account| account.pubkey.clone())
                .collect();
            (keys, message.instructions.clone())
        }
        UiMessage::Raw(message) => {
            let mut keys = message.account_keys.clone();
            keys.extend(loaded_addresses(meta));
            let instructions = message
                .instructions
                .iter()
                .cloned()
                .map(UiInstruction::Compiled)
                .collect();
            (keys, instructions)
        }
    };

    let instructions = top_level
        .iter()
        .filter_map(|ix| convert_instruction(ix, &account_keys))
        .collect();

    let inner_instructions = match &meta.inner_instructions {
        OptionSerializer::Some(groups) => groups
            .iter()
            .map(|group| InnerInstructionGroup {
                index: group.index,
                instructions: group
                    .instructions
                    .iter()
                    .filter_map(|ix| convert_instruction(ix, &account_keys))
                    .collect(),
            })
            .collect(),
        _ => Vec::new(),
    };

    Some(RawTransaction {
        signature: signature.to_string(),
        slot,
        block_time,
        success,
        instructions,
        inner_instructions,
    })
}

fn loaded_addresses(meta: &UiTransactionStatusMeta) -> Vec<String> {
    match &meta.loaded_addresses {
        OptionSerializer::Some(loaded) => loaded
            .writable
            .iter()
            .chain(loaded.readonly.iter())
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

fn convert_instruction(ix: &UiInstruction, account_keys: &[String]) -> Option<RawInstruction> {
    match ix {
        UiInstruction::Compiled(compiled) => convert_compiled(compiled, account_keys),
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(partial)) => {
            Some(RawInstruction {
                program_id: partial.program_id.clone(),
                accounts: partial.accounts.clone(),
                data: bs58::decode(&partial.data).into_vec().ok(),
            })
        }
        UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) => Some(RawInstruction {
            program_id: parsed.program_id.clone(),
            accounts: Vec::new(),
            data: None,
        }),
    }
}

fn convert_compiled(
    compiled: &UiCompiledInstruction,
    account_keys: &[String],
) -> Option<RawInstruction> {
    let program_id = account_keys.get(compiled.program_id_index as usize)?.clone();
    let accounts = compiled
        .accounts
        .iter()
        .filter_map(|index| account_keys.get(*index as usize).cloned())
        .collect();

    Some(RawInstruction {
        program_id,
        accounts,
        data: bs58::decode(&compiled.data).into_vec().ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use solana_transaction_status::{
        EncodedTransactionWithStatusMeta, UiInnerInstructions, UiParsedMessage,
        UiPartiallyDecodedInstruction, UiTransaction,
    };

    fn partially_decoded(program_id: &str, accounts: &[&str], data: &[u8]) -> UiInstruction {
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(
            UiPartiallyDecodedInstruction {
                program_id: program_id.to_string(),
                accounts: accounts.iter().map(|a| a.to_string()).collect(),
                data: bs58::encode(data).into_string(),
                stack_height: None,
            },
        ))
    }

    fn encoded(
        instructions: Vec<UiInstruction>,
        inner: Vec<UiInnerInstructions>,
        failed: bool,
    ) -> EncodedConfirmedTransactionWithStatusMeta {
        let message = UiParsedMessage {
            account_keys: vec![],
            recent_blockhash: "11111111111111111111111111111111".to_string(),
            instructions,
            address_table_lookups: None,
        };
        let (err, status) = if failed {
            (json!("AccountInUse"), json!({ "Err": "AccountInUse" }))
        } else {
            (json!(null), json!({ "Ok": null }))
        };
        let mut meta: UiTransactionStatusMeta = serde_json::from_value(json!({
            "err": err,
            "status": status,
            "fee": 5000,
            "preBalances": [],
            "postBalances": [],
        }))
        .expect("meta json");
        meta.inner_instructions = OptionSerializer::Some(inner);

        EncodedConfirmedTransactionWithStatusMeta {
            slot: 777,
            transaction: EncodedTransactionWithStatusMeta {
                transaction: EncodedTransaction::Json(UiTransaction {
                    signatures: vec!["sig".to_string()],
                    message: UiMessage::Parsed(message),
                }),
                meta: Some(meta),
                version: None,
            },
            block_time: Some(1_700_000_000),
        }
    }

    #[test]
    fn converts_parsed_message_with_inner_groups() {
        let tx = encoded(
            vec![partially_decoded("Prog", &["a", "b"], &[1, 2, 3])],
            vec![UiInnerInstructions {
                index: 0,
                instructions: vec![partially_decoded("Prog", &["c"], &[4, 5])],
            }],
            false,
        );

        let raw = extract_transaction("sig", &tx).expect("raw transaction");
        assert_eq!(raw.slot, 777);
        assert_eq!(raw.block_time, 1_700_000_000);
        assert!(raw.success);
        assert_eq!(raw.instructions.len(), 1);
        assert_eq!(raw.instructions[0].accounts, vec!["a", "b"]);
        assert_eq!(raw.instructions[0].data.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(raw.inner_instructions.len(), 1);
        assert_eq!(raw.inner_instructions[0].index, 0);
        assert!(raw.inner_instructions[0].instructions[0].is_program("Prog"));
    }

    #[test]
    fn failed_transaction_is_marked_unsuccessful() {
        let tx = encoded(vec![], vec![], true);
        let raw = extract_transaction("sig", &tx).expect("raw transaction");
        assert!(!raw.success);
    }

    #[test]
    fn compiled_instruction_resolves_account_indices() {
        let keys = vec!["payer".to_string(), "Prog".to_string(), "pool".to_string()];
        let compiled = UiCompiledInstruction {
            program_id_index: 1,
            accounts: vec![0, 2],
            data: bs58::encode([7u8, 8]).into_string(),
            stack_height: None,
        };

        let ix = convert_compiled(&compiled, &keys).expect("instruction");
        assert_eq!(ix.program_id, "Prog");
        assert_eq!(ix.accounts, vec!["payer", "pool"]);
        assert_eq!(ix.data, Some(vec![7, 8]));
    }

    #[test]
    fn compiled_instruction_with_bad_program_index_is_dropped() {
        let compiled = UiCompiledInstruction {
            program_id_index: 9,
            accounts: vec![],
            data: String::new(),
            stack_height: None,
        };
        assert!(convert_compiled(&compiled, &[]).is_none());
    }
}
