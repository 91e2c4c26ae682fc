use ethers::types::{Address, Bytes, H256, U256};
use gasless_client::{HashStrategy, Transport};
use gasless_primitives::{EntryPointVersion, UserOperationHash};
use std::{future::Future, str::FromStr, time::Duration};
use tracing::info;

/// Parses address from string
pub fn parse_address(s: &str) -> Result<Address, String> {
    Address::from_str(s).map_err(|_| format!("String {s} is not a valid address"))
}

/// Parses U256 from string
pub fn parse_u256(s: &str) -> Result<U256, String> {
    U256::from_dec_str(s).map_err(|_| format!("String {s} is not a valid U256"))
}

/// Parses hex encoded bytes from string
pub fn parse_bytes(s: &str) -> Result<Bytes, String> {
    Bytes::from_str(s).map_err(|_| format!("String {s} is not valid hex bytes"))
}

/// Parses a transaction hash from string
pub fn parse_h256(s: &str) -> Result<H256, String> {
    H256::from_str(s).map_err(|_| format!("String {s} is not a valid 32-byte hash"))
}

/// Parses a user operation hash from string
pub fn parse_user_operation_hash(s: &str) -> Result<UserOperationHash, String> {
    UserOperationHash::from_str(s)
        .map_err(|_| format!("String {s} is not a valid user operation hash"))
}

/// Parses Transport from string
pub fn parse_transport(s: &str) -> Result<Transport, String> {
    Transport::from_str(s).map_err(|_| format!("String {s} is not a valid Transport"))
}

/// Parses HashStrategy from string
pub fn parse_hash_strategy(s: &str) -> Result<HashStrategy, String> {
    HashStrategy::from_str(s).map_err(|_| format!("String {s} is not a valid HashStrategy"))
}

pub fn parse_entry_point_version(s: &str) -> Result<EntryPointVersion, String> {
    EntryPointVersion::from_str(s).map_err(|err| err.to_string())
}

pub fn parse_duration(duration: &str) -> Result<Duration, String> {
    let seconds: u64 = duration.parse().map_err(|_| format!("{duration} must be unsigned int"))?;
    Ok(Duration::from_secs(seconds))
}

pub fn validate_private_key(hex_string: &str) -> Result<String, String> {
    let key = hex_string.strip_prefix("0x").unwrap_or(hex_string);

    if key.chars().count() != 64 {
        return Err(String::from("private key must be 32 hex encoded bytes"));
    }

    if !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(String::from("private key is not a valid hexadecimal string"));
    }

    Ok(String::from(key))
}

/// Runs the future to completion or until:
/// - `ctrl-c` is received.
/// - `SIGTERM` is received (unix only).
pub async fn run_until_ctrl_c<F, E>(fut: F) -> Result<(), E>
where
    F: Future<Output = Result<(), E>>,
    E: Send + Sync + 'static + From<std::io::Error>,
{
    let ctrl_c = tokio::signal::ctrl_c();

    let mut stream = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let sigterm = stream.recv();
    tokio::pin!(sigterm, ctrl_c, fut);

    tokio::select! {
        _ = ctrl_c => {
            info!("Received ctrl-c signal.");
        },
        _ = sigterm => {
            info!("Received SIGTERM signal.");
        },
        res = fut => res?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numbers_and_hashes() {
        assert_eq!(parse_u256("100000000000000000").unwrap(), U256::exp10(17));
        assert!(parse_u256("0x10").is_err());
        assert!(parse_address("0x0000000071727De22E5E9d8BAf0edAc6f37da032").is_ok());
        assert!(parse_address("0x1234").is_err());
        assert_eq!(parse_bytes("0xdeadbeef").unwrap().to_vec(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(parse_h256("0x01").is_err());
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn parse_enums() {
        assert_eq!(parse_transport("direct").unwrap(), Transport::Direct);
        assert!(parse_transport("p2p").is_err());
        assert_eq!(parse_hash_strategy("local").unwrap(), HashStrategy::Local);
        assert_eq!(parse_entry_point_version("v0.7").unwrap(), EntryPointVersion::V0_7);
        assert!(parse_entry_point_version("0.6.0").is_err());
    }

    #[test]
    fn private_key_validation() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert_eq!(validate_private_key(key).unwrap(), key);
        assert_eq!(validate_private_key(&format!("0x{key}")).unwrap(), key);
        assert!(validate_private_key(&key[2..]).is_err());
        assert!(validate_private_key(&key.replace('a', "z")).is_err());
    }
}
