//! Direct-mode signing with a secp256k1 key derived from a mnemonic.

use std::fmt;

use async_trait::async_trait;
use bip32::{DerivationPath, Language, Mnemonic, XPrv};
use cosmrs::cosmwasm::{MsgExecuteContract, MsgInstantiateContract, MsgMigrateContract, MsgStoreCode};
use cosmrs::crypto::PublicKey;
use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::tendermint::chain;
use cosmrs::tx::{self, Msg, SignDoc, SignerInfo};
use cosmrs::{AccountId, Any};

use crate::signer::KeyMaterial;

use super::types::{Coin, Fee, SignedTx, SignerData, TxMsg};
use super::{Wallet, WalletError};

/// Terra's BIP-44 path (coin type 330)
pub const TERRA_HD_PATH: &str = "m/44'/330'/0'/0/0";

pub struct MnemonicWallet {
    secret: [u8; 32],
    public_key: PublicKey,
    address: String,
    chain_id: chain::Id,
}

impl fmt::Debug for MnemonicWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MnemonicWallet")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id.as_str())
            .finish_non_exhaustive()
    }
}

impl MnemonicWallet {
    pub fn new(key: &KeyMaterial, address_prefix: &str, chain_id: &str) -> Result<Self, WalletError> {
        let secret = match key {
            KeyMaterial::Mnemonic(phrase) => derive_secret(phrase)?,
            KeyMaterial::PrivateKey(bytes) => *bytes,
        };

        let signing_key = signing_key(&secret)?;
        let public_key = signing_key.public_key();
        let address = public_key
            .account_id(address_prefix)
            .map_err(|e| WalletError::InvalidKey(e.to_string()))?
            .to_string();
        let chain_id = chain_id
            .parse::<chain::Id>()
            .map_err(|e| WalletError::InvalidKey(format!("chain id `{}`: {}", chain_id, e)))?;

        Ok(Self {
            secret,
            public_key,
            address,
            chain_id,
        })
    }

    fn sign_direct(
        &self,
        msgs: &[TxMsg],
        fee: &Fee,
        memo: &str,
        signer: SignerData,
    ) -> Result<SignedTx, WalletError> {
        let anys = msgs.iter().map(to_any).collect::<Result<Vec<_>, _>>()?;
        let body = tx::Body::new(anys, memo, 0u32);

        let fee = tx::Fee {
            amount: fee.amount.iter().map(to_cosmos_coin).collect::<Result<_, _>>()?,
            gas_limit: fee.gas_limit,
            payer: None,
            granter: None,
        };
        let auth_info = SignerInfo::single_direct(Some(self.public_key), signer.sequence).auth_info(fee);

        let sign_doc = SignDoc::new(&body, &auth_info, &self.chain_id, signer.account_number)
            .map_err(signing_error)?;
        let raw = sign_doc.sign(&signing_key(&self.secret)?).map_err(signing_error)?;
        let bytes = raw.to_bytes().map_err(signing_error)?;

        Ok(SignedTx { bytes })
    }
}

#[async_trait]
impl Wallet for MnemonicWallet {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(
        &self,
        msgs: &[TxMsg],
        fee: &Fee,
        memo: &str,
        signer: SignerData,
    ) -> Result<SignedTx, WalletError> {
        self.sign_direct(msgs, fee, memo, signer)
    }
}

fn derive_secret(phrase: &str) -> Result<[u8; 32], WalletError> {
    let mnemonic = Mnemonic::new(phrase.trim(), Language::English)
        .map_err(|e| WalletError::InvalidKey(format!("mnemonic: {}", e)))?;
    let seed = mnemonic.to_seed("");
    let path: DerivationPath = TERRA_HD_PATH
        .parse()
        .map_err(|e| WalletError::InvalidKey(format!("derivation path: {}", e)))?;
    let xprv = XPrv::derive_from_path(seed.as_bytes(), &path)
        .map_err(|e| WalletError::InvalidKey(format!("key derivation: {}", e)))?;
    Ok(xprv.to_bytes())
}

fn signing_key(secret: &[u8; 32]) -> Result<SigningKey, WalletError> {
    SigningKey::from_slice(secret).map_err(|e| WalletError::InvalidKey(e.to_string()))
}

fn signing_error(e: impl fmt::Display) -> WalletError {
    WalletError::Signing(e.to_string())
}

fn account_id(address: &str) -> Result<AccountId, WalletError> {
    address
        .parse()
        .map_err(|e| WalletError::Signing(format!("address `{}`: {}", address, e)))
}

fn to_cosmos_coin(coin: &Coin) -> Result<cosmrs::Coin, WalletError> {
    Ok(cosmrs::Coin {
        denom: coin.denom.parse().map_err(signing_error)?,
        amount: coin.amount,
    })
}

fn json_bytes(msg: &serde_json::Value) -> Result<Vec<u8>, WalletError> {
    serde_json::to_vec(msg).map_err(signing_error)
}

fn to_any(msg: &TxMsg) -> Result<Any, WalletError> {
    let any = match msg {
        TxMsg::StoreCode {
            sender,
            wasm_byte_code,
        } => MsgStoreCode {
            sender: account_id(sender)?,
            wasm_byte_code: wasm_byte_code.clone(),
            instantiate_permission: None,
        }
        .to_any(),
        TxMsg::InstantiateContract {
            sender,
            admin,
            code_id,
            msg,
            funds,
            label,
        } => MsgInstantiateContract {
            sender: account_id(sender)?,
            admin: admin.as_deref().map(account_id).transpose()?,
            code_id: *code_id,
            label: Some(label.clone()),
            msg: json_bytes(msg)?,
            funds: funds.iter().map(to_cosmos_coin).collect::<Result<_, _>>()?,
        }
        .to_any(),
        TxMsg::ExecuteContract {
            sender,
            contract,
            msg,
            funds,
        } => MsgExecuteContract {
            sender: account_id(sender)?,
            contract: account_id(contract)?,
            msg: json_bytes(msg)?,
            funds: funds.iter().map(to_cosmos_coin).collect::<Result<_, _>>()?,
        }
        .to_any(),
        TxMsg::MigrateContract {
            sender,
            contract,
            code_id,
            msg,
        } => MsgMigrateContract {
            sender: account_id(sender)?,
            contract: account_id(contract)?,
            code_id: *code_id,
            msg: json_bytes(msg)?,
        }
        .to_any(),
        // Only Terra Classic's wasm module had in-place code replacement
        TxMsg::MigrateCode { .. } => return Err(WalletError::UnsupportedMsg(msg.kind())),
    };
    any.map_err(signing_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::localterra_mnemonic;

    #[test]
    fn derives_localterra_test1_address() {
        let phrase = localterra_mnemonic("test1").unwrap();
        let wallet =
            MnemonicWallet::new(&KeyMaterial::mnemonic(phrase), "terra", "localterra").unwrap();

        assert_eq!(wallet.address(), "terra1x46rqay4d3cssq8gxxvqz8xt6nwlz4td20k38v");
    }

    #[test]
    fn rejects_garbage_mnemonic() {
        let err = MnemonicWallet::new(&KeyMaterial::mnemonic("not a mnemonic"), "terra", "localterra")
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidKey(_)));
    }

    #[test]
    fn migrate_code_is_unsupported() {
        let msg = TxMsg::MigrateCode {
            sender: "terra1x46rqay4d3cssq8gxxvqz8xt6nwlz4td20k38v".to_string(),
            code_id: 1,
            wasm_byte_code: vec![],
        };
        assert!(matches!(to_any(&msg), Err(WalletError::UnsupportedMsg("migrate_code"))));
    }
}
