// src/signing.rs
//
// EIP-712 typed-data signing for the three authorized actions: login, order
// placement, and order cancellation. Field encoding is load-bearing here;
// the exchange recovers the signer from the signature, so any deviation in
// the domain or message schema makes the request unverifiable.
use crate::config::ADDRESS_ZERO;
use crate::domain::errors::{MetadataError, SigningError, SigningResult};
use crate::domain::models::{OrderSide, OrderType};
use crate::dto::{CancelOrderRequest, NewOrderRequest, OrderAmount};
use crate::metadata::{self, ExchangeMetadata};
use crate::nonce::generate_order_nonce;
use crate::precision;
use alloy_primitives::{hex, keccak256, Address, B256, I256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{sol, Eip712Domain, SolStruct};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use chrono::{SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

/// Exchange brand string used as the EIP-712 domain name.
const DOMAIN_NAME: &str = "ChainRing Labs";
/// Version string of the order/cancel signing domains.
const DOMAIN_VERSION: &str = "0.0.1";
/// Ownership assertion signed at login; proves wallet control, costs no gas.
const SIGN_IN_ASSERTION: &str = "[ChainRing Labs] Please sign this message to verify your \
     ownership of this wallet address. This action will not cost any gas fees.";

// The login message uses a non-standard domain (uint32 chain id, no
// verifying contract) and a primary type containing a space, so its digest
// is assembled by hand below instead of going through `sol!`.
const SIGN_IN_DOMAIN_TYPE: &str = "EIP712Domain(string name,uint32 chainId)";
const SIGN_IN_TYPE: &str =
    "Sign In(string message,string address,uint32 chainId,string timestamp)";

sol! {
    struct Order {
        address sender;
        uint256 baseChainId;
        address baseToken;
        uint256 quoteChainId;
        address quoteToken;
        int256 amount;
        uint256 price;
        int256 nonce;
    }

    struct CancelOrder {
        address sender;
        string marketId;
        int256 amount;
        int256 nonce;
    }
}

/// Login message body; its JSON encoding becomes the first segment of the
/// bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct SignInMessage {
    pub message: String,
    pub address: String,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    pub timestamp: String,
}

/// A private key and its derived address. The key never leaves the process;
/// only signatures are transmitted.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    address: Address,
}

impl Wallet {
    pub fn from_secret_key(secret_key: &str) -> SigningResult<Self> {
        let signer: PrivateKeySigner = secret_key
            .trim()
            .parse()
            .map_err(|_| SigningError::InvalidPrivateKey)?;
        let address = signer.address();
        Ok(Self { signer, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Lowercased 0x-prefixed address, as the login message expects.
    pub fn address_lowercase(&self) -> String {
        format!("{:#x}", self.address)
    }

    fn sign_digest(&self, digest: B256) -> SigningResult<String> {
        let signature = self
            .signer
            .sign_hash_sync(&digest)
            .map_err(|e| SigningError::Signer(e.to_string()))?;
        Ok(hex::encode_prefixed(signature.as_bytes()))
    }
}

/// Builds and signs the domain-separated messages the exchange verifies.
#[derive(Debug, Clone)]
pub struct SigningEngine {
    wallet: Wallet,
    default_chain_id: u64,
}

impl SigningEngine {
    pub fn new(wallet: Wallet, default_chain_id: u64) -> Self {
        Self {
            wallet,
            default_chain_id,
        }
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Produces a bearer token proving wallet ownership:
    /// base64url(JSON message) + "." + hex signature. The token is rebuilt
    /// for every authenticated request; it is not cached.
    pub fn login_token(&self) -> SigningResult<String> {
        let message = SignInMessage {
            message: SIGN_IN_ASSERTION.to_string(),
            address: self.wallet.address_lowercase(),
            chain_id: self.default_chain_id,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        };
        self.login_token_for(&message)
    }

    /// Token construction for an explicit message; split out so the
    /// signature can be verified against a fixed timestamp.
    pub fn login_token_for(&self, message: &SignInMessage) -> SigningResult<String> {
        let digest = login_digest(message);
        let signature = self.wallet.sign_digest(digest)?;
        let body = URL_SAFE.encode(serde_json::to_string(message)?);
        Ok(format!("{}.{}", body, signature))
    }

    /// Signs an order placement request. The amount is already expressed in
    /// base-asset token units; it is negated for sells. Market orders carry
    /// a zero price.
    pub fn sign_place_order(
        &self,
        request: &NewOrderRequest,
        metadata: &ExchangeMetadata,
    ) -> SigningResult<String> {
        let (base_symbol, quote_symbol) = metadata::split_market_id(&request.market_id)?;
        let base_chain_id = metadata::chain_id_of_symbol(base_symbol)?;
        let quote_chain_id = metadata::chain_id_of_symbol(quote_symbol)?;

        let base_token = resolve_token_address(metadata, base_chain_id, base_symbol)?;
        let quote_token = resolve_token_address(metadata, quote_chain_id, quote_symbol)?;

        let amount = signed_amount(&request.amount.value, &request.side)?;
        let price = if request.order_type == OrderType::Market.as_str() {
            U256::ZERO
        } else {
            let quote_decimals = metadata.symbol_decimals(quote_symbol)?;
            let raw = request
                .price
                .as_deref()
                .ok_or_else(|| SigningError::InvalidPrice("missing".to_string()))?;
            let price = Decimal::from_str(raw)
                .map_err(|_| SigningError::InvalidPrice(raw.to_string()))?;
            let units = precision::to_token_units(price, quote_decimals)?;
            U256::try_from(units).map_err(|_| SigningError::InvalidPrice(raw.to_string()))?
        };

        let message = Order {
            sender: self.wallet.address(),
            baseChainId: U256::from(base_chain_id),
            baseToken: base_token,
            quoteChainId: U256::from(quote_chain_id),
            quoteToken: quote_token,
            amount,
            price,
            nonce: parse_nonce(&request.nonce)?,
        };
        let domain = self.settlement_domain(metadata, base_chain_id)?;
        self.wallet.sign_digest(message.eip712_signing_hash(&domain))
    }

    /// Signs a cancellation request, keyed to the same settlement contract
    /// as order placement.
    pub fn sign_cancel_order(
        &self,
        request: &CancelOrderRequest,
        metadata: &ExchangeMetadata,
    ) -> SigningResult<String> {
        let (base_symbol, _) = metadata::split_market_id(&request.market_id)?;
        let base_chain_id = metadata::chain_id_of_symbol(base_symbol)?;

        let message = CancelOrder {
            sender: self.wallet.address(),
            marketId: request.market_id.clone(),
            amount: signed_amount(&request.amount, &request.side)?,
            nonce: parse_nonce(&request.nonce)?,
        };
        let domain = self.settlement_domain(metadata, base_chain_id)?;
        self.wallet.sign_digest(message.eip712_signing_hash(&domain))
    }

    /// Builds a complete, signed placement request from human-readable
    /// quantities. The amount is scaled by the base asset's decimals; limit
    /// orders must carry a price, market orders must not.
    pub fn prepare_place_order(
        &self,
        client_order_id: &str,
        market_id: &str,
        side: OrderSide,
        order_type: OrderType,
        amount: Decimal,
        price: Option<Decimal>,
        metadata: &ExchangeMetadata,
    ) -> SigningResult<NewOrderRequest> {
        let (base_symbol, _) = metadata::split_market_id(market_id)?;
        let base_decimals = metadata.symbol_decimals(base_symbol)?;
        let scaled_amount = precision::to_token_units(amount, base_decimals)?;

        let price = match (order_type, price) {
            (OrderType::Limit, Some(p)) => Some(p.to_string()),
            (OrderType::Limit, None) => {
                return Err(SigningError::InvalidPrice(
                    "limit order requires a price".to_string(),
                ))
            }
            (OrderType::Market, _) => None,
        };

        let mut request = NewOrderRequest {
            client_order_id: client_order_id.to_string(),
            market_id: market_id.to_string(),
            order_type: order_type.as_str().to_string(),
            side: side.as_str().to_string(),
            amount: OrderAmount::fixed(scaled_amount.to_string()),
            price,
            nonce: generate_order_nonce(),
            verifying_chain_id: self.default_chain_id,
            signature: String::new(),
        };
        request.signature = self.sign_place_order(&request, metadata)?;
        Ok(request)
    }

    /// Builds a complete, signed cancellation request for a tracked order.
    pub fn prepare_cancel_order(
        &self,
        exchange_order_id: &str,
        market_id: &str,
        side: OrderSide,
        amount: Decimal,
        metadata: &ExchangeMetadata,
    ) -> SigningResult<CancelOrderRequest> {
        let (base_symbol, _) = metadata::split_market_id(market_id)?;
        let base_decimals = metadata.symbol_decimals(base_symbol)?;
        let scaled_amount = precision::to_token_units(amount, base_decimals)?;

        let mut request = CancelOrderRequest {
            market_id: market_id.to_string(),
            order_id: exchange_order_id.to_string(),
            side: side.as_str().to_string(),
            amount: scaled_amount.to_string(),
            nonce: generate_order_nonce(),
            verifying_chain_id: self.default_chain_id,
            signature: String::new(),
        };
        request.signature = self.sign_cancel_order(&request, metadata)?;
        Ok(request)
    }

    fn settlement_domain(
        &self,
        metadata: &ExchangeMetadata,
        chain_id: u64,
    ) -> SigningResult<Eip712Domain> {
        let contract = metadata.exchange_contract_address(chain_id)?;
        let verifying_contract = parse_address(contract)?;
        Ok(Eip712Domain {
            name: Some(DOMAIN_NAME.into()),
            version: Some(DOMAIN_VERSION.into()),
            chain_id: Some(U256::from(chain_id)),
            verifying_contract: Some(verifying_contract),
            salt: None,
        })
    }
}

/// EIP-712 digest of the login message, hashed manually against the
/// exchange's non-standard sign-in domain.
pub fn login_digest(message: &SignInMessage) -> B256 {
    let mut enc = Vec::with_capacity(96);
    enc.extend_from_slice(keccak256(SIGN_IN_DOMAIN_TYPE).as_slice());
    enc.extend_from_slice(keccak256(DOMAIN_NAME).as_slice());
    enc.extend_from_slice(&U256::from(message.chain_id).to_be_bytes::<32>());
    let domain_separator = keccak256(&enc);

    let mut enc = Vec::with_capacity(160);
    enc.extend_from_slice(keccak256(SIGN_IN_TYPE).as_slice());
    enc.extend_from_slice(keccak256(message.message.as_bytes()).as_slice());
    enc.extend_from_slice(keccak256(message.address.as_bytes()).as_slice());
    enc.extend_from_slice(&U256::from(message.chain_id).to_be_bytes::<32>());
    enc.extend_from_slice(keccak256(message.timestamp.as_bytes()).as_slice());
    let struct_hash = keccak256(&enc);

    let mut preimage = Vec::with_capacity(66);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(domain_separator.as_slice());
    preimage.extend_from_slice(struct_hash.as_slice());
    keccak256(&preimage)
}

/// Parses the hex nonce carried on order requests into the signed integer
/// the typed message expects.
fn parse_nonce(nonce: &str) -> SigningResult<I256> {
    let raw = U256::from_str_radix(nonce.trim_start_matches("0x"), 16)
        .map_err(|_| SigningError::MalformedNonce(nonce.to_string()))?;
    I256::try_from(raw).map_err(|_| SigningError::MalformedNonce(nonce.to_string()))
}

/// Integer order amount with the side's sign convention: positive for buys,
/// negative for sells. The side literal is validated here; signing an
/// unrecognized side would commit the wallet to a wrong-signed amount.
fn signed_amount(value: &str, side: &str) -> SigningResult<I256> {
    let side =
        OrderSide::from_wire(side).ok_or_else(|| SigningError::InvalidSide(side.to_string()))?;
    let amount: I256 = value
        .trim()
        .parse()
        .map_err(|_| SigningError::InvalidAmount(value.to_string()))?;
    match side {
        OrderSide::Sell => amount
            .checked_neg()
            .ok_or_else(|| SigningError::InvalidAmount(value.to_string())),
        OrderSide::Buy => Ok(amount),
    }
}

fn parse_address(address: &str) -> SigningResult<Address> {
    Address::from_str(address)
        .map_err(|_| SigningError::SymbolResolution(MetadataError::InvalidAddress(address.to_string())))
}

/// Token contract address for a symbol; the zero address stands in for a
/// chain's native asset.
fn resolve_token_address(
    metadata: &ExchangeMetadata,
    chain_id: u64,
    symbol: &str,
) -> SigningResult<Address> {
    let address = metadata
        .token_address(chain_id, symbol)?
        .unwrap_or(ADDRESS_ZERO);
    parse_address(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ExchangeMetadata;
    use rust_decimal_macros::dec;

    // Well-known hardhat dev key; never holds funds.
    const TEST_SECRET_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn metadata() -> ExchangeMetadata {
        serde_json::from_value(serde_json::json!({
            "chains": [
                {
                    "id": 1337,
                    "name": "localhost",
                    "contracts": [
                        {"name": "Exchange", "address": "0x5fbdb2315678afecb367f032d93f642f64180aa3"}
                    ],
                    "symbols": [
                        {"name": "BTC:1337", "decimals": 18, "contractAddress": null},
                        {"name": "ETH:1337", "decimals": 18,
                         "contractAddress": "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512"}
                    ]
                }
            ],
            "markets": [
                {
                    "id": "BTC:1337/ETH:1337",
                    "baseSymbol": "BTC:1337",
                    "baseDecimals": 18,
                    "quoteSymbol": "ETH:1337",
                    "quoteDecimals": 18,
                    "tickSize": "0.05"
                }
            ],
            "feeRates": {"maker": 100, "taker": 200}
        }))
        .unwrap()
    }

    fn engine() -> SigningEngine {
        SigningEngine::new(Wallet::from_secret_key(TEST_SECRET_KEY).unwrap(), 1337)
    }

    fn recover(signature_hex: &str, digest: B256) -> Address {
        let bytes = hex::decode(signature_hex).unwrap();
        let signature = alloy_primitives::Signature::from_raw(&bytes).unwrap();
        signature.recover_address_from_prehash(&digest).unwrap()
    }

    #[test]
    fn wallet_derives_address() {
        let wallet = Wallet::from_secret_key(TEST_SECRET_KEY).unwrap();
        assert_eq!(wallet.address_lowercase(), TEST_ADDRESS);
        assert!(Wallet::from_secret_key("not-a-key").is_err());
    }

    #[test]
    fn login_token_recovers_signer() {
        let engine = engine();
        let message = SignInMessage {
            message: SIGN_IN_ASSERTION.to_string(),
            address: engine.wallet().address_lowercase(),
            chain_id: 1337,
            timestamp: "2024-05-01T10:00:00+00:00".to_string(),
        };
        let token = engine.login_token_for(&message).unwrap();

        let (body, signature) = token.split_once('.').unwrap();
        let decoded = URL_SAFE.decode(body).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(parsed["address"], TEST_ADDRESS);
        assert_eq!(parsed["chainId"], 1337);

        let recovered = recover(signature, login_digest(&message));
        assert_eq!(recovered, engine.wallet().address());
    }

    #[test]
    fn order_signature_recovers_signer() {
        let engine = engine();
        let metadata = metadata();
        let request = engine
            .prepare_place_order(
                "cid-1",
                "BTC:1337/ETH:1337",
                OrderSide::Sell,
                OrderType::Limit,
                dec!(0.5),
                Some(dec!(18.35)),
                &metadata,
            )
            .unwrap();

        assert_eq!(request.amount.value, "500000000000000000");
        assert_eq!(request.side, "Sell");
        assert_eq!(request.verifying_chain_id, 1337);

        // rebuild the typed message exactly as the signer did
        let message = Order {
            sender: engine.wallet().address(),
            baseChainId: U256::from(1337u64),
            baseToken: Address::ZERO,
            quoteToken: parse_address("0xe7f1725e7734ce288f8367e1bb143e90bb3f0512").unwrap(),
            quoteChainId: U256::from(1337u64),
            amount: -I256::try_from(500_000_000_000_000_000u128).unwrap(),
            price: U256::from(18_350_000_000_000_000_000u128),
            nonce: parse_nonce(&request.nonce).unwrap(),
        };
        let domain = engine.settlement_domain(&metadata, 1337).unwrap();
        let recovered = recover(&request.signature, message.eip712_signing_hash(&domain));
        assert_eq!(recovered, engine.wallet().address());
    }

    #[test]
    fn market_order_price_is_zero() {
        let engine = engine();
        let metadata = metadata();
        let request = engine
            .prepare_place_order(
                "cid-2",
                "BTC:1337/ETH:1337",
                OrderSide::Buy,
                OrderType::Market,
                dec!(1),
                None,
                &metadata,
            )
            .unwrap();
        assert!(request.price.is_none());

        let message = Order {
            sender: engine.wallet().address(),
            baseChainId: U256::from(1337u64),
            baseToken: Address::ZERO,
            quoteChainId: U256::from(1337u64),
            quoteToken: parse_address("0xe7f1725e7734ce288f8367e1bb143e90bb3f0512").unwrap(),
            amount: I256::try_from(1_000_000_000_000_000_000u128).unwrap(),
            price: U256::ZERO,
            nonce: parse_nonce(&request.nonce).unwrap(),
        };
        let domain = engine.settlement_domain(&metadata, 1337).unwrap();
        let recovered = recover(&request.signature, message.eip712_signing_hash(&domain));
        assert_eq!(recovered, engine.wallet().address());
    }

    #[test]
    fn cancel_signature_recovers_signer() {
        let engine = engine();
        let metadata = metadata();
        let request = engine
            .prepare_cancel_order("ord_7", "BTC:1337/ETH:1337", OrderSide::Buy, dec!(0.25), &metadata)
            .unwrap();

        let message = CancelOrder {
            sender: engine.wallet().address(),
            marketId: "BTC:1337/ETH:1337".to_string(),
            amount: I256::try_from(250_000_000_000_000_000u128).unwrap(),
            nonce: parse_nonce(&request.nonce).unwrap(),
        };
        let domain = engine.settlement_domain(&metadata, 1337).unwrap();
        let recovered = recover(&request.signature, message.eip712_signing_hash(&domain));
        assert_eq!(recovered, engine.wallet().address());
    }

    #[test]
    fn limit_order_without_price_is_rejected() {
        let engine = engine();
        let result = engine.prepare_place_order(
            "cid-3",
            "BTC:1337/ETH:1337",
            OrderSide::Buy,
            OrderType::Limit,
            dec!(1),
            None,
            &metadata(),
        );
        assert!(matches!(result, Err(SigningError::InvalidPrice(_))));
    }

    #[test]
    fn unknown_symbol_fails_resolution() {
        let engine = engine();
        let result = engine.prepare_place_order(
            "cid-4",
            "DOGE:1337/ETH:1337",
            OrderSide::Buy,
            OrderType::Market,
            dec!(1),
            None,
            &metadata(),
        );
        assert!(matches!(result, Err(SigningError::SymbolResolution(_))));
    }

    #[test]
    fn unrecognized_side_is_rejected() {
        let engine = engine();
        let request = NewOrderRequest {
            client_order_id: "cid-7".to_string(),
            market_id: "BTC:1337/ETH:1337".to_string(),
            order_type: "limit".to_string(),
            side: "Hold".to_string(),
            amount: OrderAmount::fixed("1000000000000000000".to_string()),
            price: Some("18.35".to_string()),
            nonce: "00112233445566778899aabbccddeeff".to_string(),
            verifying_chain_id: 1337,
            signature: String::new(),
        };
        assert!(matches!(
            engine.sign_place_order(&request, &metadata()),
            Err(SigningError::InvalidSide(_))
        ));
    }

    #[test]
    fn malformed_nonce_is_rejected() {
        assert!(parse_nonce("00112233445566778899aabbccddeeff").is_ok());
        assert!(matches!(
            parse_nonce("zz112233"),
            Err(SigningError::MalformedNonce(_))
        ));
    }

    #[test]
    fn nonces_differ_between_prepared_actions() {
        let engine = engine();
        let metadata = metadata();
        let order = engine
            .prepare_place_order(
                "cid-5",
                "BTC:1337/ETH:1337",
                OrderSide::Buy,
                OrderType::Market,
                dec!(1),
                None,
                &metadata,
            )
            .unwrap();
        let cancel = engine
            .prepare_cancel_order("ord_9", "BTC:1337/ETH:1337", OrderSide::Buy, dec!(1), &metadata)
            .unwrap();
        assert_ne!(order.nonce, cancel.nonce);
    }
}
