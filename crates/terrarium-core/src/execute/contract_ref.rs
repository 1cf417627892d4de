use std::fmt;

/// A contract named either by on-chain address or by its refs name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractRef {
    Address(String),
    Name(String),
}

impl ContractRef {
    /// Anything starting with `<prefix>1` (the bech32 separator) is an address.
    pub fn parse(value: &str, address_prefix: &str) -> Self {
        let value = value.trim();
        let hrp_len = address_prefix.len() + 1;
        let is_address = value.len() > hrp_len
            && value.starts_with(address_prefix)
            && value.as_bytes()[address_prefix.len()] == b'1';

        if is_address {
            ContractRef::Address(value.to_string())
        } else {
            ContractRef::Name(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContractRef::Address(s) | ContractRef::Name(s) => s,
        }
    }
}

impl fmt::Display for ContractRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
